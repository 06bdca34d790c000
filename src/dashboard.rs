//! Operacje interfejsu: filtry, widoki, kliknięcia.
//!
//! `Dashboard` is shared as `Rc<Dashboard>` between the key handler and the
//! map handlers, so every operation takes `&self`. Until `install` runs the
//! session is not ready and every operation returns without touching the
//! renderer.

use geo::{BoundingRect, Coord, Rect};
use std::{
    cell::{OnceCell, RefCell},
    collections::HashMap,
    rc::Rc,
    sync::Arc,
    time::Instant,
};
use tracing::{debug, info, trace};

use crate::{
    bridge::EventBridge,
    catalog::{LAYER_PROJECTS, LAYER_REGIONS_HOVER, PROP_NAME},
    config::AtlasConfig,
    data::{ProjectPoint, RegionShape},
    estimator::CountEstimator,
    expr::Expr,
    predicate::{Predicate, compile_selection},
    selection::{Dimension, Selection},
    stats::{RegionPanel, RegionStore, normalize_region},
    surface::MapSurface,
    view::ViewMode,
};

/// Dane sesji dostępne po załadowaniu.
#[derive(Debug)]
pub struct SessionData {
    store: RegionStore,
    bounds: HashMap<String, Rect<f64>>,
    projects: HashMap<String, Arc<ProjectPoint>>,
}

impl SessionData {
    pub fn new(store: RegionStore, regions: &[RegionShape], projects: &[Arc<ProjectPoint>]) -> Self {
        let bounds = regions
            .iter()
            .filter_map(|r| r.geometry.bounding_rect().map(|b| (r.name.clone(), b)))
            .collect();
        let projects = projects
            .iter()
            .map(|p| (p.id.clone(), Arc::clone(p)))
            .collect();
        Self {
            store,
            bounds,
            projects,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PanelState {
    pub region: Option<RegionPanel>,
    pub project: Option<Arc<ProjectPoint>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub fit_padding: f64,
    pub home_center: Coord<f64>,
    pub home_zoom: f64,
}

impl From<&AtlasConfig> for Viewport {
    fn from(cfg: &AtlasConfig) -> Self {
        Self {
            fit_padding: cfg.fit_padding,
            home_center: Coord {
                x: cfg.home_center[0],
                y: cfg.home_center[1],
            },
            home_zoom: cfg.home_zoom,
        }
    }
}

pub struct Dashboard {
    bridge: EventBridge,
    session: OnceCell<SessionData>,
    panel: RefCell<PanelState>,
    estimator: RefCell<CountEstimator>,
    /// Tylko dla podświetlenia; nie należy do `Selection`
    hovered: RefCell<Option<String>>,
    viewport: Viewport,
}

impl Dashboard {
    pub fn new(config: &AtlasConfig) -> Self {
        Self {
            bridge: EventBridge::new(Selection::default()),
            session: OnceCell::new(),
            panel: RefCell::new(PanelState::default()),
            estimator: RefCell::new(CountEstimator::new(config.count_debounce())),
            hovered: RefCell::new(None),
            viewport: Viewport::from(config),
        }
    }

    /// Marks the session ready and pushes the initial style and filter.
    /// A second call is ignored.
    pub fn install(&self, data: SessionData, surface: &mut dyn MapSurface) -> bool {
        if self.session.set(data).is_err() {
            debug!("session data already installed");
            return false;
        }
        let sel = self.bridge.current();
        self.push_view(sel.view_mode, surface);
        self.push_filter(&sel, surface);
        info!(mode = ?sel.view_mode, "dashboard ready");
        true
    }

    pub fn is_ready(&self) -> bool {
        self.session.get().is_some()
    }

    fn ready(&self, op: &str) -> Option<&SessionData> {
        let session = self.session.get();
        if session.is_none() {
            trace!(op, "ignored before data load");
        }
        session
    }

    pub fn selection(&self) -> Rc<Selection> {
        self.bridge.current()
    }

    pub fn panel(&self) -> PanelState {
        self.panel.borrow().clone()
    }

    pub fn predicate(&self) -> Predicate {
        compile_selection(&self.bridge.current())
    }

    pub fn visible_count(&self) -> Option<usize> {
        self.estimator.borrow().count()
    }

    pub fn count_pending(&self) -> bool {
        self.estimator.borrow().is_pending()
    }

    pub fn count_deadline(&self) -> Option<Instant> {
        self.estimator.borrow().deadline()
    }

    pub fn poll_count(&self, surface: &dyn MapSurface) -> Option<usize> {
        self.poll_count_at(Instant::now(), surface)
    }

    pub fn poll_count_at(&self, now: Instant, surface: &dyn MapSurface) -> Option<usize> {
        self.estimator.borrow_mut().poll(now, surface)
    }

    pub fn toggle(&self, dim: Dimension, value: &str, surface: &mut dyn MapSurface) {
        if self.ready("toggle").is_none() {
            return;
        }
        let sel = self.bridge.update(|s| s.toggled(dim, value));
        debug!(dimension = ?dim, value, on = sel.is_selected(dim, value), "filter toggled");
        self.push_filter(&sel, surface);
    }

    /// Czyści filtry, region i panel. Tryb widoku zostaje.
    pub fn clear_all(&self, surface: &mut dyn MapSurface) {
        if self.ready("clear_all").is_none() {
            return;
        }
        let sel = self.bridge.update(Selection::cleared);
        *self.panel.borrow_mut() = PanelState::default();
        debug!("filters cleared");
        self.push_filter(&sel, surface);
    }

    pub fn select_view(&self, mode: ViewMode, surface: &mut dyn MapSurface) {
        if self.ready("select_view").is_none() {
            return;
        }
        if self.bridge.current().view_mode == mode {
            trace!(?mode, "view already active");
            return;
        }
        let sel = self.bridge.update(|s| s.with_view(mode));
        // statystyki regionu zależą od trybu, więc panel znika
        self.panel.borrow_mut().region = None;
        debug!(?mode, "view switched");
        self.push_view(mode, surface);
        self.push_filter(&sel, surface);
    }

    pub fn click_region(&self, name: &str, surface: &mut dyn MapSurface) {
        let Some(session) = self.ready("click_region") else {
            return;
        };
        let region = normalize_region(name);
        if region.is_empty() {
            debug!("click on unnamed region ignored");
            return;
        }
        let sel = self.bridge.update(|s| s.with_region(Some(region.clone())));
        let panel = RegionPanel::resolve(&session.store, &region);
        if let RegionPanel::NoData { .. } = panel {
            debug!(%region, "no aggregate stats for region");
        }
        {
            let mut state = self.panel.borrow_mut();
            state.region = Some(panel);
            state.project = None;
        }
        debug!(%region, "region selected");
        self.push_filter(&sel, surface);
        if let Some(bbox) = session.bounds.get(&region) {
            surface.fit_bounds(*bbox, self.viewport.fit_padding);
        }
    }

    pub fn click_empty(&self, surface: &mut dyn MapSurface) {
        if self.ready("click_empty").is_none() {
            return;
        }
        let sel = self.bridge.update(|s| s.with_region(None));
        *self.panel.borrow_mut() = PanelState::default();
        debug!("region cleared");
        self.push_filter(&sel, surface);
        surface.fly_to(self.viewport.home_center, self.viewport.home_zoom);
    }

    /// Shows project details; the selection is not touched.
    pub fn click_point(&self, id: &str) -> Option<Arc<ProjectPoint>> {
        let session = self.ready("click_point")?;
        let project = session.projects.get(id).cloned();
        match &project {
            Some(p) => debug!(id, title = %p.title, "project selected"),
            None => debug!(id, "clicked project not in dataset"),
        }
        self.panel.borrow_mut().project = project.clone();
        project
    }

    /// Highlight only. Repeating the same region issues nothing.
    pub fn hover_region(&self, name: Option<&str>, surface: &mut dyn MapSurface) {
        if self.ready("hover_region").is_none() {
            return;
        }
        let name = name.map(normalize_region);
        if *self.hovered.borrow() == name {
            return;
        }
        let highlight = match &name {
            Some(target) => Predicate::Where(Expr::equals(Expr::get(PROP_NAME), Expr::lit(target.as_str()))),
            None => Predicate::match_none(),
        };
        surface.set_filter(LAYER_REGIONS_HOVER, highlight);
        *self.hovered.borrow_mut() = name;
    }

    fn push_filter(&self, sel: &Selection, surface: &mut dyn MapSurface) {
        let predicate = compile_selection(sel);
        trace!(conjuncts = predicate.conjuncts(), filter = %predicate.to_json(), "projects filter");
        surface.set_filter(LAYER_PROJECTS, predicate);
        self.estimator.borrow_mut().request(Instant::now());
    }

    fn push_view(&self, mode: ViewMode, surface: &mut dyn MapSurface) {
        use crate::view::StyleInstruction;
        for instruction in mode.instructions() {
            match instruction {
                StyleInstruction::Layout { layer, visibility } => {
                    surface.set_layout_property(layer, visibility)
                }
                StyleInstruction::Paint {
                    layer,
                    property,
                    value,
                } => surface.set_paint_property(layer, property, value),
            }
        }
        self.estimator.borrow_mut().request(Instant::now());
    }
}
