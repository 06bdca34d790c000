//! Odroczone przeliczanie liczby widocznych projektów.
//!
//! The renderer applies filters on its next frame, so sampling right after
//! `set_filter` undercounts. A request schedules a sample `delay` later; a
//! newer request replaces the pending one, so only the latest can publish.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{catalog::LAYER_PROJECTS, surface::MapSurface};

#[derive(Debug)]
pub struct CountEstimator {
    delay: Duration,
    /// (numer żądania, termin)
    pending: Option<(u64, Instant)>,
    requests: u64,
    published: Option<Published>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Published {
    pub request: u64,
    pub count: usize,
}

impl CountEstimator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            requests: 0,
            published: None,
        }
    }

    pub fn request(&mut self, now: Instant) -> u64 {
        self.requests += 1;
        if let Some((superseded, _)) = self.pending {
            trace!(superseded, request = self.requests, "count sample superseded");
        }
        self.pending = Some((self.requests, now + self.delay));
        self.requests
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Termin oczekującej próbki, do wyliczenia timeoutu pętli zdarzeń.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, due)| due)
    }

    /// Samples the surface if the pending request is due. Returns the
    /// published count when a sample was taken.
    pub fn poll(&mut self, now: Instant, surface: &dyn MapSurface) -> Option<usize> {
        let (request, due) = self.pending?;
        if now < due {
            return None;
        }
        self.pending = None;
        let count = surface.query_rendered_features(None, &[LAYER_PROJECTS]).len();
        self.publish(request, count);
        Some(count)
    }

    fn publish(&mut self, request: u64, count: usize) {
        if self.published.is_some_and(|p| p.request > request) {
            trace!(request, "stale count sample dropped");
            return;
        }
        debug!(request, count, "visible count published");
        self.published = Some(Published { request, count });
    }

    pub fn published(&self) -> Option<Published> {
        self.published
    }

    pub fn count(&self) -> Option<usize> {
        self.published.map(|p| p.count)
    }
}
