use std::collections::BTreeSet;

use crate::view::ViewMode;

/// Bieżący wybór użytkownika. Wartość niezmienna: każda operacja zwraca nowy
/// `Selection`, a `EventBridge` podmienia go w całości.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub years: BTreeSet<String>,
    pub statuses: BTreeSet<String>,
    pub types: BTreeSet<String>,
    /// Znormalizowana nazwa regionu (wielkie litery)
    pub active_region: Option<String>,
    pub view_mode: ViewMode,
}

/// Filter dimensions the user toggles from the side list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    Year,
    Status,
    Type,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Year => "Rok",
            Dimension::Status => "Status",
            Dimension::Type => "Typ",
        }
    }
}

impl Selection {
    pub fn values(&self, dim: Dimension) -> &BTreeSet<String> {
        match dim {
            Dimension::Year => &self.years,
            Dimension::Status => &self.statuses,
            Dimension::Type => &self.types,
        }
    }

    pub fn is_selected(&self, dim: Dimension, value: &str) -> bool {
        self.values(dim).contains(value)
    }

    pub fn toggled(&self, dim: Dimension, value: &str) -> Self {
        let mut next = self.clone();
        let set = match dim {
            Dimension::Year => &mut next.years,
            Dimension::Status => &mut next.statuses,
            Dimension::Type => &mut next.types,
        };
        if !set.remove(value) {
            set.insert(value.to_string());
        }
        next
    }

    pub fn with_region(&self, region: Option<String>) -> Self {
        Self {
            active_region: region,
            ..self.clone()
        }
    }

    /// Zmiana widoku zachowuje filtry kategorii, ale zeruje region.
    pub fn with_view(&self, mode: ViewMode) -> Self {
        Self {
            view_mode: mode,
            active_region: None,
            ..self.clone()
        }
    }

    /// Czyści filtry i region; tryb widoku zostaje.
    pub fn cleared(&self) -> Self {
        Self {
            view_mode: self.view_mode,
            ..Self::default()
        }
    }

    pub fn active_filter_count(&self) -> usize {
        self.years.len() + self.statuses.len() + self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn toggle_adds_then_removes() {
        let s = Selection::default().toggled(Dimension::Year, "2022");
        assert!(s.is_selected(Dimension::Year, "2022"));
        let s = s.toggled(Dimension::Year, "2022");
        assert!(s.years.is_empty());
    }

    #[test]
    fn toggle_leaves_the_source_value_untouched() {
        let before = Selection::default();
        let after = before.toggled(Dimension::Type, "GRID/SOLAR STREET LIGHT");
        assert!(before.types.is_empty());
        assert_eq!(after.types.len(), 1);
    }

    #[test]
    fn view_change_keeps_categories_and_drops_region() {
        let s = Selection::default()
            .toggled(Dimension::Status, "ONGOING")
            .with_region(Some("LAGOS".into()))
            .with_view(ViewMode::Technology);
        assert_eq!(s.active_region, None);
        assert!(s.is_selected(Dimension::Status, "ONGOING"));
        assert_eq!(s.view_mode, ViewMode::Technology);
    }

    #[test]
    fn clear_keeps_view_mode() {
        let s = Selection::default()
            .with_view(ViewMode::Performance)
            .toggled(Dimension::Year, "2020")
            .with_region(Some("KANO".into()))
            .cleared();
        assert_eq!(s, Selection::default().with_view(ViewMode::Performance));
    }
}
