//! Most między zdarzeniami renderera a bieżącym wyborem.
//!
//! Handlers are registered on the renderer exactly once, before any data is
//! loaded. None of them captures filter values: each one holds a handle to
//! the `Dashboard` and reads `EventBridge::current()` when it fires.

use std::{cell::RefCell, rc::Rc};

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    catalog::{LAYER_PROJECTS, LAYER_REGIONS_BASE, PROP_ID, PROP_NAME},
    dashboard::Dashboard,
    expr::as_text,
    selection::Selection,
    surface::{EventSource, MapEvent, MapEventKind},
};

/// Jedyny właściciel `Selection`. Klony dzielą tę samą komórkę.
#[derive(Clone, Debug, Default)]
pub struct EventBridge {
    cell: Rc<RefCell<Rc<Selection>>>,
}

impl EventBridge {
    pub fn new(initial: Selection) -> Self {
        Self {
            cell: Rc::new(RefCell::new(Rc::new(initial))),
        }
    }

    /// Snapshot at the moment of the call.
    pub fn current(&self) -> Rc<Selection> {
        Rc::clone(&self.cell.borrow())
    }

    pub fn commit(&self, next: Selection) -> Rc<Selection> {
        let next = Rc::new(next);
        *self.cell.borrow_mut() = Rc::clone(&next);
        next
    }

    /// Replaces the selection only if it is still `expected`; otherwise
    /// returns the value that won.
    pub fn compare_and_commit(
        &self,
        expected: &Rc<Selection>,
        next: Selection,
    ) -> Result<Rc<Selection>, Rc<Selection>> {
        let mut slot = self.cell.borrow_mut();
        if !Rc::ptr_eq(&slot, expected) {
            return Err(Rc::clone(&slot));
        }
        let next = Rc::new(next);
        *slot = Rc::clone(&next);
        Ok(next)
    }

    pub fn update<F>(&self, mut f: F) -> Rc<Selection>
    where
        F: FnMut(&Selection) -> Selection,
    {
        loop {
            let seen = self.current();
            match self.compare_and_commit(&seen, f(&seen)) {
                Ok(next) => return next,
                Err(_) => trace!("selection changed during update, retrying"),
            }
        }
    }
}

fn first_property(ev: &MapEvent, key: &str) -> Option<String> {
    ev.features
        .first()
        .and_then(|f| f.properties.get(key))
        .filter(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => as_text(other),
        })
        .filter(|s| !s.trim().is_empty())
}

/// Rejestruje wszystkie handlery mapy. Wołane raz na sesję.
pub fn register_handlers(source: &mut dyn EventSource, dashboard: &Rc<Dashboard>) {
    let d = Rc::clone(dashboard);
    source.on(
        MapEventKind::Click,
        Some(LAYER_REGIONS_BASE),
        Box::new(move |ev, surface| {
            // klik w znacznik projektu nie jest klikiem w region
            if !surface
                .query_rendered_features(Some(ev.point), &[LAYER_PROJECTS])
                .is_empty()
            {
                return;
            }
            if let Some(name) = first_property(ev, PROP_NAME) {
                d.click_region(&name, surface);
            }
        }),
    );

    let d = Rc::clone(dashboard);
    source.on(
        MapEventKind::Click,
        Some(LAYER_PROJECTS),
        Box::new(move |ev, _surface| {
            if let Some(id) = first_property(ev, PROP_ID) {
                d.click_point(&id);
            }
        }),
    );

    let d = Rc::clone(dashboard);
    source.on(
        MapEventKind::Click,
        None,
        Box::new(move |ev, surface| {
            let hits = surface.query_rendered_features(Some(ev.point), &[LAYER_REGIONS_BASE, LAYER_PROJECTS]);
            if hits.is_empty() {
                d.click_empty(surface);
            }
        }),
    );

    let d = Rc::clone(dashboard);
    source.on(
        MapEventKind::MouseMove,
        Some(LAYER_REGIONS_BASE),
        Box::new(move |ev, surface| {
            d.hover_region(first_property(ev, PROP_NAME).as_deref(), surface);
        }),
    );

    let d = Rc::clone(dashboard);
    source.on(
        MapEventKind::MouseLeave,
        Some(LAYER_REGIONS_BASE),
        Box::new(move |_ev, surface| d.hover_region(None, surface)),
    );

    debug!("map handlers registered");
}
