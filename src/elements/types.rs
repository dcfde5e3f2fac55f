use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A two-line element set for one catalog object, stamped with when it was
/// obtained from the remote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrbitalElementSet {
    pub catalog_id: u32,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub retrieved_at: DateTime<Utc>,
}

/// Raw element lines as delivered by a fetcher, before they are stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedElements {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

/// Time elapsed since an element set's epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementAge {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub total_seconds: i64,
}

impl ElementAge {
    pub fn from_seconds(total_seconds: i64) -> Self {
        let total_seconds = total_seconds.max(0);
        Self {
            days: total_seconds / 86_400,
            hours: (total_seconds % 86_400) / 3_600,
            minutes: (total_seconds % 3_600) / 60,
            total_seconds,
        }
    }

    /// Total age as `H:MM`, hours unbounded.
    pub fn hours_minutes(&self) -> String {
        format!(
            "{}:{:02}",
            self.total_seconds / 3_600,
            (self.total_seconds % 3_600) / 60
        )
    }
}
