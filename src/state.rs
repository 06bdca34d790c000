use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use geo::Coord;
use std::rc::Rc;
use tracing::{info, warn};

use crate::{
    bridge::register_handlers,
    catalog::{STATUSES, TYPES, YEARS},
    config::AtlasConfig,
    dashboard::{Dashboard, SessionData},
    data::LoadedData,
    error::AtlasError,
    map_draw::MapView,
    selection::Dimension,
    view::ViewMode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel { Left, Center, Right }

pub struct AppState {
    pub dashboard: Rc<Dashboard>,
    pub map: MapView,
    /// Pozycje listy filtrów: wymiar + wartość
    pub entries: Vec<(Dimension, &'static str)>,
    pub selected: usize,
    pub active_panel: Panel,
    /// Kursor mapy sterowany klawiaturą
    pub cursor: Option<Coord<f64>>,
    pub loading: bool,
    pub load_error: Option<String>,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
Tab: zmiana panelu
↑/↓ + Spacja: filtr (lista)
Strzałki + Enter: kursor mapy
1/2/3: widok
c: wyczyść filtry
Esc: odznacz region
d: filtr do logu
q: wyjście";

    pub fn new(config: &AtlasConfig) -> Self {
        let dashboard = Rc::new(Dashboard::new(config));
        let mut map = MapView::new();
        // handlery rejestrowane raz, przed danymi
        register_handlers(&mut map, &dashboard);

        let entries = YEARS
            .iter()
            .map(|v| (Dimension::Year, *v))
            .chain(STATUSES.iter().map(|v| (Dimension::Status, *v)))
            .chain(TYPES.iter().map(|v| (Dimension::Type, *v)))
            .collect();

        Self {
            dashboard,
            map,
            entries,
            selected: 0,
            active_panel: Panel::Left,
            cursor: None,
            loading: true,
            load_error: None,
        }
    }

    /// Wynik wątku ładującego. Błąd zostaje na ekranie, mapa pozostaje pusta.
    pub fn on_loaded(&mut self, result: Result<LoadedData, AtlasError>) {
        self.loading = false;
        match result {
            Ok(data) => {
                let session = SessionData::new(data.store, &data.regions, &data.projects);
                self.map.set_sources(data.regions, data.projects);
                if self.dashboard.install(session, &mut self.map) {
                    info!(regions = self.map.feature_count(), "map sources installed");
                }
            }
            Err(e) => {
                warn!(error = %e, "data load failed");
                self.load_error = Some(e.to_string());
            }
        }
    }

    /// Jedna klatka: zaległe zmiany stylu, potem próbka licznika.
    pub fn tick(&mut self) {
        self.map.advance_frame();
        self.dashboard.poll_count(&self.map);
    }

    pub fn selected_entry(&self) -> Option<(Dimension, &'static str)> {
        self.entries.get(self.selected).copied()
    }

    /// Zwraca true, jeśli trzeba wyjść
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        use KeyCode::*;
        match key {
            Char('q') => return true,
            Tab => {
                self.active_panel = match self.active_panel {
                    Panel::Left   => Panel::Center,
                    Panel::Center => Panel::Right,
                    Panel::Right  => Panel::Left,
                };
                if self.active_panel == Panel::Center && self.cursor.is_none() {
                    self.cursor = Some(self.map.center());
                }
            }
            Char('c') => self.dashboard.clear_all(&mut self.map),
            Char(d @ '1'..='3') => {
                let idx = d as usize - '1' as usize;
                self.dashboard.select_view(ViewMode::ALL[idx], &mut self.map);
            }
            Esc => self.dashboard.click_empty(&mut self.map),
            Char('d') => {
                let filter = self.dashboard.predicate().to_json();
                info!(%filter, "current project filter");
            }
            _ if self.active_panel == Panel::Center => self.handle_map_key(key),
            Up => if self.selected > 0 { self.selected -= 1 },
            Down => if self.selected + 1 < self.entries.len() { self.selected += 1 },
            Char(' ') | Enter => {
                if let Some((dim, value)) = self.selected_entry() {
                    self.dashboard.toggle(dim, value, &mut self.map);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_map_key(&mut self, key: KeyCode) {
        let cursor = *self.cursor.get_or_insert_with(|| self.map.center());
        let (dx, dy) = self.map.cell_step();
        let moved = match key {
            KeyCode::Left => Coord { x: cursor.x - dx, ..cursor },
            KeyCode::Right => Coord { x: cursor.x + dx, ..cursor },
            KeyCode::Up => Coord { y: cursor.y + dy, ..cursor },
            KeyCode::Down => Coord { y: cursor.y - dy, ..cursor },
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.map.click(cursor);
                return;
            }
            _ => return,
        };
        self.cursor = Some(moved);
        self.map.pointer_moved(moved);
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        let Some(at) = self.map.cell_to_coord(event.column, event.row) else {
            return;
        };
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.active_panel = Panel::Center;
                self.cursor = Some(at);
                self.map.click(at);
            }
            MouseEventKind::Moved => self.map.pointer_moved(at),
            _ => {}
        }
    }
}
