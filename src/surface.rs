//! Granica z rendererem mapy.
//!
//! `MapSurface` takes style and filter changes and answers hit-test queries.
//! `EventSource` accepts handlers, once, for clicks and pointer motion. The
//! terminal canvas in `map_draw.rs` implements both; tests use a recorder.

use geo::{Coord, Rect};
use geojson::JsonObject;

use crate::{
    expr::Expr,
    predicate::Predicate,
    view::{PaintProperty, Visibility},
};

/// Obiekt zwrócony przez `query_rendered_features`.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedFeature {
    pub layer: String,
    pub properties: JsonObject,
}

pub trait MapSurface {
    fn set_filter(&mut self, layer: &str, filter: Predicate);
    fn set_paint_property(&mut self, layer: &str, property: PaintProperty, value: Expr);
    fn set_layout_property(&mut self, layer: &str, visibility: Visibility);
    /// `point == None` queries the whole viewport.
    fn query_rendered_features(&self, point: Option<Coord<f64>>, layers: &[&str]) -> Vec<RenderedFeature>;
    fn fit_bounds(&mut self, bbox: Rect<f64>, padding: f64);
    fn fly_to(&mut self, center: Coord<f64>, zoom: f64);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapEventKind {
    Click,
    MouseMove,
    MouseLeave,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapEvent {
    pub kind: MapEventKind,
    /// Współrzędne mapy (lon, lat)
    pub point: Coord<f64>,
    /// Obiekty z warstwy, na której zarejestrowano handler
    pub features: Vec<RenderedFeature>,
}

/// A handler receives the surface it was fired from, so it can push filters
/// without holding a reference to the renderer.
pub type Handler = Box<dyn FnMut(&MapEvent, &mut dyn MapSurface)>;

pub trait EventSource {
    /// `layer == None` fires for every event of that kind.
    fn on(&mut self, kind: MapEventKind, layer: Option<&str>, handler: Handler);
}
