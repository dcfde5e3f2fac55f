use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;

use super::pages::PageId;
use crate::config::{DisplayConfig, PageConfig};

/// Discrete operator signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Advance,
    ToggleAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PageLifecycle {
    Entering,
    Active,
    Leaving,
}

/// Result of applying one input to the page cycle, before any debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advance { from: usize, to: usize },
    ToggleAlert,
    Ignored,
}

/// Pure page-cycle transition. The toggle zone only exists on the main page.
pub fn transition(active: usize, pages: &[PageId], event: InputEvent) -> Transition {
    if pages.is_empty() {
        return Transition::Ignored;
    }
    match event {
        InputEvent::Advance if pages.len() == 1 => Transition::Ignored,
        InputEvent::Advance => Transition::Advance {
            from: active,
            to: (active + 1) % pages.len(),
        },
        InputEvent::ToggleAlert if pages.get(active) == Some(&PageId::Main) => {
            Transition::ToggleAlert
        }
        InputEvent::ToggleAlert => Transition::Ignored,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerAction {
    PageChanged { from: PageId, to: PageId },
    AlertToggled(bool),
}

/// Instruction to render the active page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub page: PageId,
    pub full_redraw: bool,
}

#[derive(Debug, Clone)]
pub struct PageSlot {
    pub page: PageId,
    pub refresh_ms: Option<u64>,
    pub lifecycle: PageLifecycle,
    last_refresh_ms: Option<u64>,
}

impl PageSlot {
    fn new(config: &PageConfig) -> Self {
        Self {
            page: config.page,
            refresh_ms: config.refresh.map(|d| d.as_millis() as u64),
            lifecycle: PageLifecycle::Leaving,
            last_refresh_ms: None,
        }
    }
}

/// Cyclic page manager: debounced operator input, page lifecycles and per-page
/// refresh timers. Times are milliseconds on a monotonic scale.
#[derive(Debug)]
pub struct DisplayPageController {
    slots: Vec<PageSlot>,
    active: usize,
    force_full_redraw: bool,
    pending_refresh: bool,
    debounce_ms: u64,
    toggle_debounce_ms: u64,
    last_advance_ms: Option<u64>,
    last_toggle_ms: Option<u64>,
    alert_enabled: bool,
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

fn within(last: Option<u64>, now_ms: u64, window_ms: u64) -> bool {
    last.is_some_and(|last| now_ms.saturating_sub(last) <= window_ms)
}

impl DisplayPageController {
    /// Builds the cycle from the enabled pages; disabled pages get no slot.
    pub fn from_config(config: &DisplayConfig, alert_enabled: bool) -> Self {
        let mut slots: Vec<PageSlot> = config
            .pages
            .iter()
            .filter(|p| p.enabled)
            .map(PageSlot::new)
            .collect();
        if slots.is_empty() {
            log::warn!("No enabled pages configured, showing the main page only");
            slots.push(PageSlot::new(&PageConfig {
                page: PageId::Main,
                refresh: Some(Duration::from_secs(1)),
                enabled: true,
            }));
        }
        let active = slots
            .iter()
            .position(|s| s.page == PageId::Main)
            .unwrap_or(0);
        slots[active].lifecycle = PageLifecycle::Entering;

        log::debug!(
            "Page cycle: {}",
            slots
                .iter()
                .map(|s| s.page.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Self {
            slots,
            active,
            force_full_redraw: true,
            pending_refresh: false,
            debounce_ms: millis(config.debounce),
            toggle_debounce_ms: millis(config.toggle_debounce),
            last_advance_ms: None,
            last_toggle_ms: None,
            alert_enabled,
        }
    }

    pub fn active_page(&self) -> PageId {
        self.slots[self.active].page
    }

    #[cfg(test)]
    pub fn active_index(&self) -> usize {
        self.active
    }

    #[cfg(test)]
    pub fn slots(&self) -> &[PageSlot] {
        &self.slots
    }

    pub fn pages(&self) -> Vec<PageId> {
        self.slots.iter().map(|s| s.page).collect()
    }

    pub fn alert_enabled(&self) -> bool {
        self.alert_enabled
    }

    #[cfg(test)]
    pub fn force_full_redraw(&self) -> bool {
        self.force_full_redraw
    }

    /// Asks for a refresh of the active page at the next poll.
    pub fn request_refresh(&mut self) {
        self.pending_refresh = true;
    }

    /// Applies one operator signal. A signal is accepted only once its
    /// window has fully passed since the last accepted one, so a steady
    /// burst still advances at the window's pace.
    pub fn handle_input(&mut self, event: InputEvent, now_ms: u64) -> Option<ControllerAction> {
        let (last, window) = match event {
            InputEvent::Advance => (&mut self.last_advance_ms, self.debounce_ms),
            InputEvent::ToggleAlert => (&mut self.last_toggle_ms, self.toggle_debounce_ms),
        };
        if within(*last, now_ms, window) {
            log::trace!("Debounced {:?} at {} ms", event, now_ms);
            return None;
        }
        *last = Some(now_ms);

        match transition(self.active, &self.pages(), event) {
            Transition::Advance { from, to } => {
                self.slots[from].lifecycle = PageLifecycle::Leaving;
                self.slots[to].lifecycle = PageLifecycle::Entering;
                self.active = to;
                self.force_full_redraw = true;
                self.pending_refresh = false;
                let (from, to) = (self.slots[from].page, self.slots[to].page);
                log::info!("Page {} -> {}", from, to);
                Some(ControllerAction::PageChanged { from, to })
            }
            Transition::ToggleAlert => {
                self.alert_enabled = !self.alert_enabled;
                self.pending_refresh = true;
                log::info!(
                    "Pass alert {}",
                    if self.alert_enabled { "enabled" } else { "disabled" }
                );
                Some(ControllerAction::AlertToggled(self.alert_enabled))
            }
            Transition::Ignored => None,
        }
    }

    /// Decides whether the active page renders now.
    pub fn poll(&mut self, now_ms: u64) -> Option<RenderRequest> {
        let slot = &mut self.slots[self.active];
        let full_redraw = match slot.lifecycle {
            PageLifecycle::Entering => {
                slot.lifecycle = PageLifecycle::Active;
                true
            }
            PageLifecycle::Active => {
                let due = match (slot.refresh_ms, slot.last_refresh_ms) {
                    (Some(interval), Some(last)) => now_ms.saturating_sub(last) >= interval,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if !due && !self.pending_refresh {
                    return None;
                }
                false
            }
            PageLifecycle::Leaving => return None,
        };

        let full_redraw = full_redraw || self.force_full_redraw;
        self.force_full_redraw = false;
        self.pending_refresh = false;
        slot.last_refresh_ms = Some(now_ms);
        Some(RenderRequest {
            page: slot.page,
            full_redraw,
        })
    }
}
