use chrono::{DateTime, FixedOffset, Utc};

use crate::elements::tle::parse_fields;
use crate::elements::{ElementAge, ElementError, OrbitalElementSet, TleFields};
use crate::predict::{PassEvent, SunPosition, TrackPoint, Visibility};

/// Everything the control loop knows about the tracked object at the
/// current tick. Owned by the loop, lent to each component in turn.
#[derive(Debug, Clone)]
pub struct TrackingContext {
    pub now: DateTime<Utc>,
    pub utc_offset: FixedOffset,
    pub elements: OrbitalElementSet,
    pub fields: TleFields,
    /// Bumped whenever `elements` is replaced.
    pub elements_revision: u64,
    pub track: Option<TrackPoint>,
    pub sun: Option<SunPosition>,
    pub orbit_number: Option<u64>,
    pub next_pass: Option<PassEvent>,
    pub visibility: Visibility,
}

impl TrackingContext {
    pub fn new(
        elements: OrbitalElementSet,
        now: DateTime<Utc>,
        utc_offset: FixedOffset,
    ) -> Result<Self, ElementError> {
        let fields = parse_fields(&elements.line1, &elements.line2)?;
        Ok(Self {
            now,
            utc_offset,
            elements,
            fields,
            elements_revision: 0,
            track: None,
            sun: None,
            orbit_number: None,
            next_pass: None,
            visibility: Visibility::BelowHorizon,
        })
    }

    /// Swaps in a new element set. Returns false if it is the one already held.
    pub fn replace_elements(&mut self, elements: &OrbitalElementSet) -> Result<bool, ElementError> {
        if *elements == self.elements {
            return Ok(false);
        }
        let fields = parse_fields(&elements.line1, &elements.line2)?;
        if fields.catalog_id != self.fields.catalog_id {
            self.orbit_number = None;
            self.next_pass = None;
        }
        self.elements = elements.clone();
        self.fields = fields;
        self.elements_revision += 1;
        Ok(true)
    }

    pub fn element_age(&self) -> ElementAge {
        ElementAge::from_seconds((self.now - self.fields.epoch).num_seconds())
    }

    pub fn local(&self, t: DateTime<Utc>) -> DateTime<FixedOffset> {
        t.with_timezone(&self.utc_offset)
    }

    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.local(self.now)
    }
}
