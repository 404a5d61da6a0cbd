//! Per-dataset layer state.
//!
//! Each dataset has a points layer and a heatmap layer drawn from one
//! shared cache. Turning either layer on starts a fresh load unless one is
//! already in flight; turning a layer off only hides it, and an in-flight
//! load keeps filling the cache in the background.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use safety_map_geo_models::{HeatmapPoint, Located, ViewportBounds, Weighted};
use safety_map_stream_models::Dataset;
use safety_map_viewport::{decimate, heatmap_points};

use crate::cache::SharedCache;

/// Which of a dataset's two layers a toggle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Viewport-filtered, decimated markers.
    Points,
    /// Weighted heatmap over the whole cache.
    Heatmap,
}

/// Permission to run one load into a layer's cache.
///
/// Holding a ticket means the layer's in-flight latch is set; the latch is
/// released when the ticket is dropped.
#[derive(Debug)]
pub struct LoadTicket<T> {
    dataset: Dataset,
    cache: SharedCache<T>,
    in_flight: Arc<AtomicBool>,
}

impl<T> LoadTicket<T> {
    /// Dataset being loaded.
    #[must_use]
    pub const fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Cache to fill.
    #[must_use]
    pub const fn cache(&self) -> &SharedCache<T> {
        &self.cache
    }
}

impl<T> Drop for LoadTicket<T> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// State of one dataset's points and heatmap layers.
#[derive(Debug)]
pub struct DatasetLayer<T> {
    dataset: Dataset,
    cache: SharedCache<T>,
    in_flight: Arc<AtomicBool>,
    points_visible: bool,
    heatmap_visible: bool,
}

impl<T> DatasetLayer<T> {
    /// Creates a layer with both views hidden and an empty cache.
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            cache: SharedCache::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
            points_visible: false,
            heatmap_visible: false,
        }
    }

    /// Dataset this layer shows.
    #[must_use]
    pub const fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Shows or hides one of the layer's views.
    ///
    /// Returns a [`LoadTicket`] when the view goes from hidden to shown and
    /// no load is in flight. The cache is cleared before the ticket is
    /// handed out.
    pub fn set_visible(&mut self, kind: LayerKind, visible: bool) -> Option<LoadTicket<T>> {
        let slot = match kind {
            LayerKind::Points => &mut self.points_visible,
            LayerKind::Heatmap => &mut self.heatmap_visible,
        };
        let was_visible = std::mem::replace(slot, visible);

        if was_visible || !visible {
            return None;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            log::debug!("{} load already in flight", self.dataset);
            return None;
        }

        self.cache.write().clear();
        Some(LoadTicket {
            dataset: self.dataset,
            cache: self.cache.clone(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Whether the given view is shown.
    #[must_use]
    pub const fn is_visible(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Points => self.points_visible,
            LayerKind::Heatmap => self.heatmap_visible,
        }
    }

    /// Whether a load is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of cached records.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Handle to the cache.
    #[must_use]
    pub const fn cache(&self) -> &SharedCache<T> {
        &self.cache
    }
}

impl<T: Located + Clone> DatasetLayer<T> {
    /// Records to draw as markers for `bounds`. Empty while the points view
    /// is hidden.
    #[must_use]
    pub fn visible(&self, bounds: Option<&ViewportBounds>) -> Vec<T> {
        if !self.points_visible {
            return Vec::new();
        }
        let cache = self.cache.read();
        decimate(cache.as_slice(), bounds)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl<T: Weighted> DatasetLayer<T> {
    /// Heatmap points over the whole cache. Empty while the heatmap view is
    /// hidden.
    #[must_use]
    pub fn heatmap(&self) -> Vec<HeatmapPoint> {
        if !self.heatmap_visible {
            return Vec::new();
        }
        heatmap_points(self.cache.read().as_slice())
    }
}

#[cfg(test)]
mod tests {
    use safety_map_stream_models::EmergencyCall;

    use super::*;

    fn call(id: usize, latitude: f64) -> EmergencyCall {
        EmergencyCall {
            id: id.to_string(),
            event_id: String::new(),
            police_station: String::new(),
            call_type: String::new(),
            latitude,
            longitude: 73.8,
            received_at: String::new(),
        }
    }

    #[test]
    fn first_show_hands_out_ticket_and_sets_latch() {
        let mut layer = DatasetLayer::<EmergencyCall>::new(Dataset::Dial112);
        let ticket = layer.set_visible(LayerKind::Points, true).unwrap();
        assert_eq!(ticket.dataset(), Dataset::Dial112);
        assert!(layer.is_loading());
        drop(ticket);
        assert!(!layer.is_loading());
    }

    #[test]
    fn no_second_load_while_in_flight() {
        let mut layer = DatasetLayer::<EmergencyCall>::new(Dataset::Dial112);
        let _ticket = layer.set_visible(LayerKind::Points, true).unwrap();
        assert!(layer.set_visible(LayerKind::Heatmap, true).is_none());
        assert!(layer.set_visible(LayerKind::Points, false).is_none());
        assert!(layer.set_visible(LayerKind::Points, true).is_none());
    }

    #[test]
    fn staying_visible_does_not_reload() {
        let mut layer = DatasetLayer::<EmergencyCall>::new(Dataset::Dial112);
        drop(layer.set_visible(LayerKind::Points, true));
        assert!(layer.set_visible(LayerKind::Points, true).is_none());
    }

    #[test]
    fn hiding_keeps_cache_and_reshowing_clears_it() {
        let mut layer = DatasetLayer::<EmergencyCall>::new(Dataset::Dial112);
        let ticket = layer.set_visible(LayerKind::Points, true).unwrap();
        ticket.cache().write().extend(vec![call(1, 20.0)]);
        drop(ticket);

        assert!(layer.set_visible(LayerKind::Points, false).is_none());
        assert_eq!(layer.cached_len(), 1);

        let ticket = layer.set_visible(LayerKind::Points, true);
        assert!(ticket.is_some());
        assert_eq!(layer.cached_len(), 0);
    }

    #[test]
    fn views_respect_their_own_visibility() {
        let mut layer = DatasetLayer::<EmergencyCall>::new(Dataset::Dial112);
        let ticket = layer.set_visible(LayerKind::Heatmap, true).unwrap();
        ticket
            .cache()
            .write()
            .extend(vec![call(0, 20.0), call(1, 20.5)]);
        drop(ticket);

        let bounds = ViewportBounds::new(21.0, 19.0, 75.0, 73.0, 18.0);
        assert!(layer.visible(Some(&bounds)).is_empty());
        assert_eq!(layer.heatmap().len(), 2);

        drop(layer.set_visible(LayerKind::Heatmap, false));
        layer.points_visible = true;
        assert_eq!(layer.visible(Some(&bounds)).len(), 2);
        assert!(layer.heatmap().is_empty());
    }
}
