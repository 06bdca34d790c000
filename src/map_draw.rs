use geo::{Area, BoundingRect, Contains, Coord, MultiPolygon, Point, Polygon, Rect};
use ratatui::layout::Rect as TuiRect;
use ratatui::{
    Frame,
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::canvas::{Canvas, Line, Points},
    widgets::{Block, Borders},
};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};
use tracing::{trace, warn};

use crate::{
    catalog::{
        COLOR_FALLBACK, COLOR_REGION_HOVER, COLOR_REGION_OUTLINE, LAYER_PROJECTS,
        LAYER_REGIONS_BASE, LAYER_REGIONS_FILL, LAYER_REGIONS_HOVER,
    },
    data::{ProjectPoint, RegionShape},
    expr::{Expr, parse_hex},
    predicate::Predicate,
    surface::{EventSource, Handler, MapEvent, MapEventKind, MapSurface, RenderedFeature},
    view::{PaintProperty, Visibility},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Regions,
    Projects,
}

struct Layer {
    id: &'static str,
    source: Source,
    visible: bool,
    filter: Predicate,
    paint: HashMap<PaintProperty, Expr>,
}

impl Layer {
    fn new(id: &'static str, source: Source, visible: bool) -> Self {
        Self {
            id,
            source,
            visible,
            filter: Predicate::MatchAll,
            paint: HashMap::new(),
        }
    }

    fn with_paint(mut self, property: PaintProperty, color: &str) -> Self {
        self.paint.insert(property, Expr::lit(color));
        self
    }

    fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    fn color(&self, property: PaintProperty, props: &geojson::JsonObject) -> Color {
        self.paint
            .get(&property)
            .and_then(|e| e.eval(props).as_str().and_then(parse_hex))
            .map(|(r, g, b)| Color::Rgb(r, g, b))
            .unwrap_or(Color::Gray)
    }
}

/// Zmiany stylu czekają na następną klatkę, jak w prawdziwym rendererze.
enum StyleOp {
    Filter(String, Predicate),
    Paint(String, PaintProperty, Expr),
    Layout(String, Visibility),
    Camera([f64; 2], [f64; 2]),
}

/// Przygotowanie geometrii i rysowanie mapy
pub struct MapView {
    regions: Vec<RegionShape>,
    /// Obrysy bez drobnych fragmentów, tylko do rysowania
    outlines: Vec<MultiPolygon<f64>>,
    projects: Vec<Arc<ProjectPoint>>,
    layers: Vec<Layer>,
    pending: Vec<StyleOp>,
    handlers: Vec<(MapEventKind, Option<String>, Handler)>,
    pointer_over: HashSet<String>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    last_area: Option<TuiRect>,
    frame: u64,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

impl MapView {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            outlines: Vec::new(),
            projects: Vec::new(),
            layers: vec![
                Layer::new(LAYER_REGIONS_FILL, Source::Regions, false)
                    .with_paint(PaintProperty::FillColor, COLOR_FALLBACK),
                Layer::new(LAYER_REGIONS_BASE, Source::Regions, true)
                    .with_paint(PaintProperty::LineColor, COLOR_REGION_OUTLINE),
                Layer::new(LAYER_REGIONS_HOVER, Source::Regions, true)
                    .with_paint(PaintProperty::LineColor, COLOR_REGION_HOVER)
                    .with_filter(Predicate::match_none()),
                Layer::new(LAYER_PROJECTS, Source::Projects, false)
                    .with_paint(PaintProperty::CircleColor, COLOR_FALLBACK),
            ],
            pending: Vec::new(),
            handlers: Vec::new(),
            pointer_over: HashSet::new(),
            x_bounds: [-180.0, 180.0],
            y_bounds: [-90.0, 90.0],
            last_area: None,
            frame: 0,
        }
    }

    /// Podpina dane po załadowaniu i ustawia zasięg na wszystkie regiony.
    pub fn set_sources(&mut self, regions: Vec<RegionShape>, projects: Vec<Arc<ProjectPoint>>) {
        self.outlines = regions.iter().map(|r| drop_slivers(&r.geometry)).collect();

        let (mut minx, mut miny, mut maxx, mut maxy) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for rect in regions.iter().filter_map(|r| r.geometry.bounding_rect()) {
            minx = minx.min(rect.min().x);
            miny = miny.min(rect.min().y);
            maxx = maxx.max(rect.max().x);
            maxy = maxy.max(rect.max().y);
        }
        if minx.is_finite() && maxx > minx && maxy > miny {
            self.x_bounds = [minx, maxx];
            self.y_bounds = [miny, maxy];
        }

        self.regions = regions;
        self.projects = projects;
    }

    pub fn feature_count(&self) -> usize {
        self.regions.len()
    }

    /// Stosuje zaległe zmiany stylu. Wołane raz na klatkę przed rysowaniem.
    pub fn advance_frame(&mut self) -> bool {
        self.frame += 1;
        if self.pending.is_empty() {
            return false;
        }
        for op in std::mem::take(&mut self.pending) {
            match op {
                StyleOp::Filter(id, filter) => {
                    if let Some(layer) = self.layer_mut(&id) {
                        layer.filter = filter;
                    }
                }
                StyleOp::Paint(id, property, value) => {
                    if let Some(layer) = self.layer_mut(&id) {
                        layer.paint.insert(property, value);
                    }
                }
                StyleOp::Layout(id, visibility) => {
                    if let Some(layer) = self.layer_mut(&id) {
                        layer.visible = visibility == Visibility::Visible;
                    }
                }
                StyleOp::Camera(x, y) => {
                    self.x_bounds = x;
                    self.y_bounds = y;
                }
            }
        }
        trace!(frame = self.frame, "style changes applied");
        true
    }

    fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    fn known_layer(&self, id: &str) -> bool {
        let known = self.layer(id).is_some();
        if !known {
            warn!(layer = id, "unknown map layer");
        }
        known
    }

    /// Ostatni filtr warstwy, łącznie z oczekującymi.
    fn latest_filter(&self, id: &str) -> Option<&Predicate> {
        self.pending
            .iter()
            .rev()
            .find_map(|op| match op {
                StyleOp::Filter(l, f) if l == id => Some(f),
                _ => None,
            })
            .or_else(|| self.layer(id).map(|l| &l.filter))
    }

    fn pick_radius(&self) -> (f64, f64) {
        let span = (self.x_bounds[1] - self.x_bounds[0], self.y_bounds[1] - self.y_bounds[0]);
        match self.last_area {
            Some(a) if a.width > 2 && a.height > 2 => (
                span.0 / f64::from(a.width - 2),
                span.1 / f64::from(a.height - 2),
            ),
            _ => (span.0 * 0.01, span.1 * 0.01),
        }
    }

    fn in_view(&self, c: Coord<f64>) -> bool {
        c.x >= self.x_bounds[0] && c.x <= self.x_bounds[1] && c.y >= self.y_bounds[0] && c.y <= self.y_bounds[1]
    }

    fn region_in_view(&self, r: &RegionShape) -> bool {
        r.geometry.bounding_rect().is_some_and(|b| {
            b.max().x >= self.x_bounds[0]
                && b.min().x <= self.x_bounds[1]
                && b.max().y >= self.y_bounds[0]
                && b.min().y <= self.y_bounds[1]
        })
    }

    fn layer_features(&self, layer: &Layer, point: Option<Coord<f64>>) -> Vec<RenderedFeature> {
        if !layer.visible {
            return Vec::new();
        }
        let hit = |props: &geojson::JsonObject| RenderedFeature {
            layer: layer.id.to_string(),
            properties: props.clone(),
        };
        match layer.source {
            Source::Regions => self
                .regions
                .iter()
                .filter(|r| layer.filter.matches(&r.properties))
                .filter(|r| match point {
                    Some(p) => r.geometry.contains(&Point::from(p)),
                    None => self.region_in_view(r),
                })
                .map(|r| hit(&r.properties))
                .collect(),
            Source::Projects => {
                let (rx, ry) = self.pick_radius();
                self.projects
                    .iter()
                    .filter(|p| layer.filter.matches(&p.properties))
                    .filter(|p| match point {
                        Some(at) => {
                            (p.coordinates.x - at.x).abs() <= rx && (p.coordinates.y - at.y).abs() <= ry
                        }
                        None => self.in_view(p.coordinates),
                    })
                    .map(|p| hit(&p.properties))
                    .collect()
            }
        }
    }

    /// Komórka terminala → współrzędne mapy, wg ostatnio narysowanego obszaru.
    pub fn cell_to_coord(&self, column: u16, row: u16) -> Option<Coord<f64>> {
        let area = self.last_area?;
        let inner = TuiRect {
            x: area.x + 1,
            y: area.y + 1,
            width: area.width.saturating_sub(2),
            height: area.height.saturating_sub(2),
        };
        if inner.width == 0 || inner.height == 0 || !inner.contains((column, row).into()) {
            return None;
        }
        let fx = (f64::from(column - inner.x) + 0.5) / f64::from(inner.width);
        let fy = (f64::from(row - inner.y) + 0.5) / f64::from(inner.height);
        Some(Coord {
            x: self.x_bounds[0] + fx * (self.x_bounds[1] - self.x_bounds[0]),
            y: self.y_bounds[1] - fy * (self.y_bounds[1] - self.y_bounds[0]),
        })
    }

    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.x_bounds[0] + self.x_bounds[1]) / 2.0,
            y: (self.y_bounds[0] + self.y_bounds[1]) / 2.0,
        }
    }

    /// Jeden krok kursora klawiatury: wielkość komórki terminala.
    pub fn cell_step(&self) -> (f64, f64) {
        self.pick_radius()
    }

    pub fn click(&mut self, point: Coord<f64>) {
        let ids: Vec<&'static str> = self.layers.iter().map(|l| l.id).collect();
        let mut handlers = std::mem::take(&mut self.handlers);
        for (kind, layer, handler) in handlers.iter_mut() {
            if *kind != MapEventKind::Click {
                continue;
            }
            let features = match layer.as_deref() {
                Some(l) => self.query_rendered_features(Some(point), &[l]),
                None => self.query_rendered_features(Some(point), &ids),
            };
            if layer.is_some() && features.is_empty() {
                continue;
            }
            let event = MapEvent {
                kind: MapEventKind::Click,
                point,
                features,
            };
            handler(&event, &mut *self);
        }
        handlers.append(&mut self.handlers);
        self.handlers = handlers;
    }

    pub fn pointer_moved(&mut self, point: Coord<f64>) {
        let mut handlers = std::mem::take(&mut self.handlers);
        let mut watched: Vec<String> = handlers
            .iter()
            .filter(|(k, _, _)| matches!(k, MapEventKind::MouseMove | MapEventKind::MouseLeave))
            .filter_map(|(_, l, _)| l.clone())
            .collect();
        watched.sort();
        watched.dedup();

        for layer in watched {
            let features = self.query_rendered_features(Some(point), &[layer.as_str()]);
            let kind = if !features.is_empty() {
                self.pointer_over.insert(layer.clone());
                MapEventKind::MouseMove
            } else if self.pointer_over.remove(&layer) {
                MapEventKind::MouseLeave
            } else {
                continue;
            };
            let event = MapEvent {
                kind,
                point,
                features,
            };
            for (k, l, handler) in handlers.iter_mut() {
                if *k == kind && l.as_deref() == Some(layer.as_str()) {
                    handler(&event, &mut *self);
                }
            }
        }
        handlers.append(&mut self.handlers);
        self.handlers = handlers;
    }

    /// Rysuje mapę: choroplet, granice, podświetlenie, punkty projektów
    pub fn render(&mut self, f: &mut Frame<'_>, area: TuiRect, title: &str, cursor: Option<Coord<f64>>) {
        self.last_area = Some(area);
        let (step_x, step_y) = self.pick_radius();

        let mut fills: Vec<(Color, Vec<(f64, f64)>)> = Vec::new();
        if let Some(fill) = self.layer(LAYER_REGIONS_FILL).filter(|l| l.visible) {
            for region in self.regions.iter().filter(|r| fill.filter.matches(&r.properties)) {
                let color = fill.color(PaintProperty::FillColor, &region.properties);
                fills.push((color, self.lattice(&region.geometry, step_x / 2.0, step_y / 4.0)));
            }
        }

        let mut outlines: Vec<(Color, &MultiPolygon<f64>)> = Vec::new();
        for id in [LAYER_REGIONS_BASE, LAYER_REGIONS_HOVER] {
            let Some(layer) = self.layer(id).filter(|l| l.visible) else { continue };
            for (region, shape) in self.regions.iter().zip(&self.outlines) {
                if layer.filter.matches(&region.properties) {
                    outlines.push((layer.color(PaintProperty::LineColor, &region.properties), shape));
                }
            }
        }

        let mut points: BTreeMap<String, (Color, Vec<(f64, f64)>)> = BTreeMap::new();
        if let Some(layer) = self.layer(LAYER_PROJECTS).filter(|l| l.visible) {
            for p in self.projects.iter().filter(|p| layer.filter.matches(&p.properties)) {
                let color = layer.color(PaintProperty::CircleColor, &p.properties);
                points
                    .entry(format!("{color:?}"))
                    .or_insert_with(|| (color, Vec::new()))
                    .1
                    .push((p.coordinates.x, p.coordinates.y));
            }
        }

        let canvas = Canvas::default()
            .block(Block::default().title(title.to_string()).borders(Borders::ALL))
            .marker(Marker::Braille)
            .x_bounds(self.x_bounds)
            .y_bounds(self.y_bounds)
            .paint(|ctx| {
                // 1) wypełnienie choropletu
                for (color, coords) in &fills {
                    ctx.draw(&Points { coords, color: *color });
                }
                ctx.layer();
                // 2) granice, potem podświetlenie
                for (color, mp) in &outlines {
                    for poly in &mp.0 {
                        let ring = &poly.exterior().0;
                        for window in ring.windows(2) {
                            let a = window[0];
                            let b = window[1];
                            ctx.draw(&Line { x1: a.x, y1: a.y, x2: b.x, y2: b.y, color: *color });
                        }
                    }
                }
                ctx.layer();
                // 3) projekty
                for (color, coords) in points.values() {
                    ctx.draw(&Points { coords, color: *color });
                }
                if let Some(c) = cursor {
                    ctx.print(c.x, c.y, Span::styled("+", Style::default().fg(Color::Red)));
                }
            });
        f.render_widget(canvas, area);
    }

    /// Siatka punktów wewnątrz wielokąta, do wypełnienia znakami Braille'a.
    fn lattice(&self, shape: &MultiPolygon<f64>, dx: f64, dy: f64) -> Vec<(f64, f64)> {
        let Some(b) = shape.bounding_rect() else {
            return Vec::new();
        };
        if dx <= 0.0 || dy <= 0.0 {
            return Vec::new();
        }
        let x0 = b.min().x.max(self.x_bounds[0]);
        let x1 = b.max().x.min(self.x_bounds[1]);
        let y0 = b.min().y.max(self.y_bounds[0]);
        let y1 = b.max().y.min(self.y_bounds[1]);
        let mut out = Vec::new();
        let mut y = y0;
        while y <= y1 {
            let mut x = x0;
            while x <= x1 {
                if shape.contains(&Point::new(x, y)) {
                    out.push((x, y));
                }
                x += dx;
            }
            y += dy;
        }
        out
    }
}

/// Drobne fragmenty (poniżej 20% największego) nie są rysowane.
fn drop_slivers(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if mp.0.len() <= 1 {
        return mp.clone();
    }
    let max_area = mp.0.iter().map(|p| p.unsigned_area()).fold(0.0, f64::max);
    let threshold = max_area * 0.20;
    let kept: Vec<Polygon<f64>> = mp
        .0
        .iter()
        .filter(|p| p.unsigned_area() >= threshold)
        .cloned()
        .collect();
    if kept.is_empty() { mp.clone() } else { MultiPolygon(kept) }
}

impl MapSurface for MapView {
    fn set_filter(&mut self, layer: &str, filter: Predicate) {
        if !self.known_layer(layer) {
            return;
        }
        if self.latest_filter(layer) == Some(&filter) {
            trace!(layer, "filter unchanged");
            return;
        }
        self.pending.push(StyleOp::Filter(layer.to_string(), filter));
    }

    fn set_paint_property(&mut self, layer: &str, property: PaintProperty, value: Expr) {
        if self.known_layer(layer) {
            trace!(layer, property = property.name(), "paint change queued");
            self.pending.push(StyleOp::Paint(layer.to_string(), property, value));
        }
    }

    fn set_layout_property(&mut self, layer: &str, visibility: Visibility) {
        if self.known_layer(layer) {
            self.pending.push(StyleOp::Layout(layer.to_string(), visibility));
        }
    }

    fn query_rendered_features(&self, point: Option<Coord<f64>>, layers: &[&str]) -> Vec<RenderedFeature> {
        // warstwy wyżej (później rysowane) pierwsze
        self.layers
            .iter()
            .rev()
            .filter(|l| layers.contains(&l.id))
            .flat_map(|l| self.layer_features(l, point))
            .collect()
    }

    fn fit_bounds(&mut self, bbox: Rect<f64>, padding: f64) {
        let pad_x = bbox.width().max(0.01) * padding;
        let pad_y = bbox.height().max(0.01) * padding;
        self.pending.push(StyleOp::Camera(
            [bbox.min().x - pad_x, bbox.max().x + pad_x],
            [bbox.min().y - pad_y, bbox.max().y + pad_y],
        ));
    }

    fn fly_to(&mut self, center: Coord<f64>, zoom: f64) {
        let half_w = 360.0 / 2f64.powf(zoom) / 2.0;
        let half_h = half_w * 0.8;
        self.pending.push(StyleOp::Camera(
            [center.x - half_w, center.x + half_w],
            [center.y - half_h, center.y + half_h],
        ));
    }
}

impl EventSource for MapView {
    fn on(&mut self, kind: MapEventKind, layer: Option<&str>, handler: Handler) {
        if let Some(l) = layer {
            self.known_layer(l);
        }
        self.handlers.push((kind, layer.map(str::to_string), handler));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{PROP_NAME, PROP_STATUS, STATUS_ONGOING},
        data::tests::fixture_data,
        view::ViewMode,
    };
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, rc::Rc};

    fn loaded() -> MapView {
        let data = fixture_data();
        let mut map = MapView::new();
        map.set_sources(data.regions, data.projects);
        map
    }

    fn show_points(map: &mut MapView) {
        for instruction in ViewMode::Performance.instructions() {
            if let crate::view::StyleInstruction::Layout { layer, visibility } = instruction {
                map.set_layout_property(layer, visibility);
            }
        }
    }

    fn ongoing() -> Predicate {
        Predicate::Where(Expr::equals(Expr::get(PROP_STATUS), Expr::lit(STATUS_ONGOING)))
    }

    #[test]
    fn filters_apply_on_the_next_frame() {
        let mut map = loaded();
        show_points(&mut map);
        map.advance_frame();
        assert_eq!(map.query_rendered_features(None, &[LAYER_PROJECTS]).len(), 3);

        map.set_filter(LAYER_PROJECTS, ongoing());
        // jeszcze stara klatka
        assert_eq!(map.query_rendered_features(None, &[LAYER_PROJECTS]).len(), 3);
        assert!(map.advance_frame());
        assert_eq!(map.query_rendered_features(None, &[LAYER_PROJECTS]).len(), 2);
    }

    #[test]
    fn repeated_filter_is_a_no_op() {
        let mut map = loaded();
        map.set_filter(LAYER_PROJECTS, ongoing());
        map.set_filter(LAYER_PROJECTS, ongoing());
        assert_eq!(map.pending.len(), 1);
        map.advance_frame();
        map.set_filter(LAYER_PROJECTS, ongoing());
        assert!(!map.advance_frame());
    }

    #[test]
    fn hidden_layers_are_not_queried() {
        let mut map = loaded();
        map.advance_frame();
        assert!(map.query_rendered_features(None, &[LAYER_PROJECTS]).is_empty());
        assert_eq!(map.query_rendered_features(None, &[LAYER_REGIONS_BASE]).len(), 3);
    }

    #[test]
    fn point_queries_hit_test_regions() {
        let map = loaded();
        let hits = map.query_rendered_features(Some(Coord { x: 8.0, y: 11.0 }), &[LAYER_REGIONS_BASE]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].properties.get(PROP_NAME).and_then(|v| v.as_str()), Some("KANO"));
        assert!(map.query_rendered_features(Some(Coord { x: 0.0, y: 0.0 }), &[LAYER_REGIONS_BASE]).is_empty());
    }

    #[test]
    fn camera_moves_wait_for_the_frame() {
        let mut map = loaded();
        let before = map.center();
        map.fit_bounds(Rect::new(Coord { x: 7.6, y: 10.6 }, Coord { x: 9.4, y: 12.6 }), 0.0);
        assert_eq!(map.center(), before);
        map.advance_frame();
        let c = map.center();
        assert!((c.x - 8.5).abs() < 1e-9 && (c.y - 11.6).abs() < 1e-9, "{c:?}");
    }

    #[test]
    fn click_dispatches_to_layer_and_generic_handlers() {
        let mut map = loaded();
        let seen: Rc<RefCell<Vec<(Option<String>, usize)>>> = Rc::default();
        for layer in [Some(LAYER_REGIONS_BASE), Some(LAYER_PROJECTS), None] {
            let seen = Rc::clone(&seen);
            map.on(
                MapEventKind::Click,
                layer,
                Box::new(move |ev, _| {
                    seen.borrow_mut().push((layer.map(str::to_string), ev.features.len()));
                }),
            );
        }
        map.click(Coord { x: 8.0, y: 11.0 });
        assert_eq!(
            *seen.borrow(),
            vec![(Some(LAYER_REGIONS_BASE.to_string()), 1), (None, 1)]
        );
    }

    #[test]
    fn pointer_leave_fires_once_after_move() {
        let mut map = loaded();
        let log: Rc<RefCell<Vec<MapEventKind>>> = Rc::default();
        for kind in [MapEventKind::MouseMove, MapEventKind::MouseLeave] {
            let log = Rc::clone(&log);
            map.on(kind, Some(LAYER_REGIONS_BASE), Box::new(move |ev, _| log.borrow_mut().push(ev.kind)));
        }
        map.pointer_moved(Coord { x: 8.0, y: 11.0 });
        map.pointer_moved(Coord { x: 0.0, y: 0.0 });
        map.pointer_moved(Coord { x: 0.5, y: 0.5 });
        assert_eq!(*log.borrow(), vec![MapEventKind::MouseMove, MapEventKind::MouseLeave]);
    }
}
