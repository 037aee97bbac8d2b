//! Domain logic for the uptrack monitoring core.
//!
//! Everything in this crate is pure: no database access, no I/O. The `db`
//! and `api` crates depend on it; it depends on nothing internal.

pub mod accounting;
pub mod api_keys;
pub mod device_id;
pub mod error;
pub mod hysteresis;
pub mod reconcile;
pub mod status;
pub mod types;
