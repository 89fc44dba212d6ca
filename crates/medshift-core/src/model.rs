use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn weight(self) -> u32 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    /// Lenient decode of the stored priority string. Anything unrecognized
    /// maps to `None`, which weighs the same as Low.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Weight of a possibly-missing priority. Unset or unrecognized counts as 1.
pub fn priority_weight(p: Option<Priority>) -> u32 {
    p.map(Priority::weight).unwrap_or(1)
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Staff,
    Doctor,
    ClinicAdmin,
    SuperAdmin,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// Capacity fraction for one staff member during a redistribution run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Absent,
    HalfDay,
    Available,
}

impl Availability {
    pub fn fraction(self) -> f64 {
        match self {
            Availability::Absent => 0.0,
            Availability::HalfDay => 0.5,
            Availability::Available => 1.0,
        }
    }
}
