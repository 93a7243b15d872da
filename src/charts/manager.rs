//! Owns one rendering instance per chart family for the lifetime of a view.
use nodenexus_common::model::TimeSeriesWindow;
use tracing::{debug, info, warn};

use crate::charts::backend::{ChartBackend, ChartInstance};
use crate::charts::{build_option, ChartFamily};
use crate::view::layout::ChartLayout;
use crate::viewport::Viewport;

/// Lifecycle of one chart slot. A slot never goes back to `Uninitialized`
/// while its view is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Bound,
    Updating,
}

struct Slot {
    family: ChartFamily,
    state: SlotState,
    instance: Option<Box<dyn ChartInstance>>,
}

/// What one render pass did, per family.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderReport {
    /// Slots that went from `Uninitialized` to `Bound`.
    pub bound: Vec<ChartFamily>,
    /// Bound slots that received a fresh option set, empty when their family
    /// has no data.
    pub updated: Vec<ChartFamily>,
    /// Unbound slots left alone: no data yet, or no surface in the layout.
    pub skipped: Vec<ChartFamily>,
    pub failed: Vec<(ChartFamily, String)>,
}

pub struct ChartSurfaceManager {
    node_id: String,
    backend: Box<dyn ChartBackend>,
    slots: Vec<Slot>,
    viewport: Viewport,
    banner: Option<&'static str>,
    last_generation: Option<u64>,
}

impl ChartSurfaceManager {
    pub fn new(
        node_id: impl Into<String>,
        backend: Box<dyn ChartBackend>,
        viewport: Viewport,
    ) -> Self {
        let slots = ChartFamily::ALL
            .iter()
            .map(|family| Slot {
                family: *family,
                state: SlotState::Uninitialized,
                instance: None,
            })
            .collect();
        Self {
            node_id: node_id.into(),
            backend,
            slots,
            viewport,
            banner: None,
            last_generation: None,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn slot_state(&self, family: ChartFamily) -> SlotState {
        self.slots
            .iter()
            .find(|slot| slot.family == family)
            .map_or(SlotState::Uninitialized, |slot| slot.state)
    }

    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.instance.is_some()).count()
    }

    /// Last window generation that was rendered.
    pub fn last_generation(&self) -> Option<u64> {
        self.last_generation
    }

    /// Pushes `window` to every chart.
    ///
    /// An unbound slot is bound once its family has data and the layout holds
    /// its surface; until then it is skipped and retried on the next call.
    /// Bound slots always get their full option set re-applied, an empty
    /// one when their family has no data left or their surface left the
    /// layout. A failing chart never prevents its siblings from rendering.
    pub fn render(&mut self, window: &TimeSeriesWindow, layout: &ChartLayout) -> RenderReport {
        let mut report = RenderReport::default();

        for slot in &mut self.slots {
            let family = slot.family;

            if slot.instance.is_none() {
                let Some(surface) = layout.surface(family) else {
                    report.skipped.push(family);
                    continue;
                };
                if !family.has_data(window) {
                    report.skipped.push(family);
                    continue;
                }
                match self.backend.init(&self.node_id, surface, self.viewport) {
                    Ok(mut instance) => {
                        if let Some(banner) = self.banner {
                            if let Err(e) = instance.set_banner(Some(banner)) {
                                warn!(
                                    node_id = %self.node_id,
                                    %family,
                                    error = %e,
                                    "Failed to show banner on new chart."
                                );
                            }
                        }
                        slot.instance = Some(instance);
                    }
                    Err(e) => {
                        warn!(
                            node_id = %self.node_id,
                            %family,
                            error = %e,
                            "Failed to bind chart; retrying on next update."
                        );
                        report.failed.push((family, e.to_string()));
                        continue;
                    }
                }
            }

            let Some(instance) = slot.instance.as_mut() else {
                continue;
            };
            let option = if layout.surface(family).is_some() {
                build_option(family, window)
            } else {
                debug!(
                    node_id = %self.node_id,
                    %family,
                    "Surface left the layout; clearing chart."
                );
                build_option(family, &TimeSeriesWindow::default())
            };
            match instance.set_option(&option) {
                Ok(()) => {
                    if slot.state == SlotState::Uninitialized {
                        slot.state = SlotState::Bound;
                        report.bound.push(family);
                    } else {
                        slot.state = SlotState::Updating;
                        report.updated.push(family);
                    }
                }
                Err(e) => {
                    warn!(
                        node_id = %self.node_id,
                        %family,
                        error = %e,
                        "Failed to apply chart option."
                    );
                    report.failed.push((family, e.to_string()));
                }
            }
        }

        self.last_generation = Some(window.generation);
        debug!(
            node_id = %self.node_id,
            generation = window.generation,
            bound = report.bound.len(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Charts rendered."
        );
        report
    }

    /// Shows `banner` on every bound chart and on charts bound later.
    /// `None` clears it. Returns how many charts took the change.
    pub fn set_banner(&mut self, banner: Option<&'static str>) -> usize {
        self.banner = banner;
        let mut shown = 0;
        for slot in &mut self.slots {
            let Some(instance) = slot.instance.as_mut() else {
                continue;
            };
            match instance.set_banner(banner) {
                Ok(()) => shown += 1,
                Err(e) => {
                    warn!(
                        node_id = %self.node_id,
                        family = %slot.family,
                        error = %e,
                        "Failed to update chart banner."
                    );
                }
            }
        }
        shown
    }

    /// Asks every bound chart to recompute its layout. Unbound slots are
    /// ignored. Returns how many charts were resized.
    pub fn resize(&mut self, viewport: Viewport) -> usize {
        self.viewport = viewport;
        let mut resized = 0;
        for slot in &mut self.slots {
            let Some(instance) = slot.instance.as_mut() else {
                continue;
            };
            match instance.resize(viewport) {
                Ok(()) => resized += 1,
                Err(e) => {
                    warn!(
                        node_id = %self.node_id,
                        family = %slot.family,
                        error = %e,
                        "Failed to resize chart."
                    );
                }
            }
        }
        debug!(node_id = %self.node_id, ?viewport, resized, "Charts resized.");
        resized
    }

    /// Disposes every instance. Called when the owning view unmounts.
    pub fn unmount(&mut self) {
        let mut disposed = 0;
        for slot in &mut self.slots {
            if let Some(mut instance) = slot.instance.take() {
                instance.dispose();
                disposed += 1;
            }
            slot.state = SlotState::Uninitialized;
        }
        info!(node_id = %self.node_id, disposed, "Chart surfaces released.");
    }
}

impl Drop for ChartSurfaceManager {
    fn drop(&mut self) {
        if self.bound_count() > 0 {
            self.unmount();
        }
    }
}
