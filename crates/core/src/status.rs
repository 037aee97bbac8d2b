//! Raw sample classification, stable state, entity kinds, and severity rules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RawStatus
// ---------------------------------------------------------------------------

/// Raw per-sample status as reported by a probe.
///
/// `Online` and `Slow` are success-class; `Offline`, `Timeout`, and `Error`
/// are failure-class. The distinction drives the hysteresis machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawStatus {
    Online,
    Slow,
    Offline,
    Timeout,
    Error,
}

impl RawStatus {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RawStatus::Online => "ONLINE",
            RawStatus::Slow => "SLOW",
            RawStatus::Offline => "OFFLINE",
            RawStatus::Timeout => "TIMEOUT",
            RawStatus::Error => "ERROR",
        }
    }

    /// Parse from a stored string. Unknown values parse as `Error`, the
    /// most conservative failure-class status.
    pub fn from_str(s: &str) -> Self {
        match s {
            "ONLINE" => RawStatus::Online,
            "SLOW" => RawStatus::Slow,
            "OFFLINE" => RawStatus::Offline,
            "TIMEOUT" => RawStatus::Timeout,
            _ => RawStatus::Error,
        }
    }

    /// Whether this status counts toward recovery (success) or outage
    /// (failure) in the hysteresis machine.
    pub fn is_success(&self) -> bool {
        matches!(self, RawStatus::Online | RawStatus::Slow)
    }
}

// ---------------------------------------------------------------------------
// StableState
// ---------------------------------------------------------------------------

/// The debounced Up/Down classification, distinct from per-sample status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StableState {
    Up,
    Down,
}

impl StableState {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            StableState::Up => "UP",
            StableState::Down => "DOWN",
        }
    }

    /// Parse from a stored string. Unknown values parse as `Up`, the
    /// initial state.
    pub fn from_str(s: &str) -> Self {
        match s {
            "DOWN" => StableState::Down,
            _ => StableState::Up,
        }
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The kind of monitored endpoint. Severity and escalation rules differ per
/// variant, so this is a tagged enum rather than a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// A bank branch network link. An outage takes the whole site down.
    Branch,
    /// A single ATM device.
    Atm,
}

impl EntityKind {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Branch => "BRANCH",
            EntityKind::Atm => "ATM",
        }
    }

    /// Parse from a stored string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BRANCH" => Some(EntityKind::Branch),
            "ATM" => Some(EntityKind::Atm),
            _ => None,
        }
    }

    /// Base incident severity for an outage of this entity kind.
    pub fn base_severity(&self) -> Severity {
        match self {
            EntityKind::Branch => Severity::High,
            EntityKind::Atm => Severity::Medium,
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Incident severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Parse from a stored string, defaulting to `Low` for unknown values.
    pub fn from_str(s: &str) -> Self {
        match s {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// The next severity up, saturating at `Critical`.
    pub fn escalated(&self) -> Self {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        }
    }
}

/// Derive the severity for a new incident.
///
/// Starts from the entity kind's base severity and escalates one level when
/// the entity has a recent history of repeated incidents (the endpoint is
/// chronically unstable and deserves more attention, not less).
pub fn derive_severity(kind: EntityKind, recent_incidents: i64, escalation_threshold: i64) -> Severity {
    let base = kind.base_severity();
    if recent_incidents >= escalation_threshold {
        base.escalated()
    } else {
        base
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
