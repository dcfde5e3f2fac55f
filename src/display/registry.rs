use std::collections::HashMap;

use super::field::FieldRenderState;
use super::pages::PageId;

/// Identity of every incrementally rendered field on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Clock,
    Elevation,
    Azimuth,
    Altitude,
    Distance,
    OrbitNumber,
    Latitude,
    Longitude,
    ElementAge,
    AlertIcon,
    Banner,
    PassTableRow(usize),
}

impl FieldId {
    pub fn page(self) -> PageId {
        match self {
            FieldId::PassTableRow(_) => PageId::PassTable,
            _ => PageId::Main,
        }
    }

    /// Fields that follow the satellite's live position.
    pub fn is_live_tracking(self) -> bool {
        matches!(
            self,
            FieldId::Elevation
                | FieldId::Azimuth
                | FieldId::Altitude
                | FieldId::Distance
                | FieldId::Latitude
                | FieldId::Longitude
                | FieldId::Banner
        )
    }
}

/// Render state of every field, keyed by field identity.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    states: HashMap<FieldId, FieldRenderState>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&mut self, id: FieldId) -> &mut FieldRenderState {
        self.states.entry(id).or_default()
    }

    pub fn reset_page(&mut self, page: PageId) {
        self.reset_where(|id| id.page() == page);
    }

    pub fn reset_live_tracking(&mut self) {
        self.reset_where(FieldId::is_live_tracking);
    }

    fn reset_where(&mut self, mut predicate: impl FnMut(FieldId) -> bool) {
        let mut count = 0;
        for (id, state) in self.states.iter_mut() {
            if predicate(*id) {
                state.reset();
                count += 1;
            }
        }
        log::trace!("Reset {} field states", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::color::Color;
    use crate::display::draw::{Font, Point};
    use crate::display::field::{FieldLayout, IncrementalFieldRenderer};
    use crate::display::format::angle5;

    fn touch(registry: &mut FieldRegistry, id: FieldId) {
        let field: IncrementalFieldRenderer<f64> =
            IncrementalFieldRenderer::new(FieldLayout::new(Point::new(0, 0), 5, Font::Small), angle5);
        field.render(&1.0, Color::WHITE, registry.state(id), false);
    }

    #[test]
    fn live_tracking_reset_spares_other_fields() {
        let mut registry = FieldRegistry::new();
        touch(&mut registry, FieldId::Elevation);
        touch(&mut registry, FieldId::Clock);
        registry.reset_live_tracking();
        assert!(!registry.state(FieldId::Elevation).is_initialized());
        assert!(registry.state(FieldId::Clock).is_initialized());
    }

    #[test]
    fn page_reset_only_touches_that_page() {
        let mut registry = FieldRegistry::new();
        touch(&mut registry, FieldId::Clock);
        touch(&mut registry, FieldId::PassTableRow(3));
        registry.reset_page(PageId::PassTable);
        assert!(registry.state(FieldId::Clock).is_initialized());
        assert!(!registry.state(FieldId::PassTableRow(3)).is_initialized());
    }
}
