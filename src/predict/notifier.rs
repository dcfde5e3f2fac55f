use chrono::{DateTime, Utc};

/// One-shot pre-pass alert: fires on the tick where the time to AOS equals
/// the lead time, at most once per AOS. A lead time of zero never fires.
#[derive(Debug, Clone, Default)]
pub struct LeadTimeNotifier {
    lead_s: i64,
    fired_for: Option<DateTime<Utc>>,
}

impl LeadTimeNotifier {
    pub fn new(lead_s: i64) -> Self {
        Self {
            lead_s,
            fired_for: None,
        }
    }

    pub fn lead_s(&self) -> i64 {
        self.lead_s
    }

    pub fn evaluate(&mut self, aos: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.lead_s == 0 || self.fired_for == Some(aos) {
            return false;
        }
        if (aos - now).num_seconds() == self.lead_s {
            self.fired_for = Some(aos);
            return true;
        }
        false
    }
}
