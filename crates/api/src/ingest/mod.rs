//! Ingestion services.
//!
//! Handlers stay thin; the logic that spans repositories and transactions
//! lives here:
//!
//! - [`intake`] -- ping-sample batches: per-entity atomic state update,
//!   uptime accounting, and transition handling.
//! - [`correlator`] -- maps Down/Up transitions onto the one-active-incident
//!   invariant and talks to the ticketing collaborator.
//! - [`reconciler`] -- vendor alarm snapshots: full-set diff against the
//!   prior alarm state.

pub mod correlator;
pub mod intake;
pub mod reconciler;
