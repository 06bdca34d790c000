//! Kompilacja wyboru do filtra warstwy punktów.

use std::collections::BTreeSet;

use geojson::JsonObject;
use serde_json::Value;

use crate::{
    catalog::{PROP_REGION, PROP_STATUS, PROP_TYPE, PROP_YEAR},
    expr::Expr,
    selection::Selection,
};

/// Filter handed to `MapSurface::set_filter`. `MatchAll` is the renderer's
/// `null` filter.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    MatchAll,
    Where(Expr),
}

impl Predicate {
    pub fn matches(&self, props: &JsonObject) -> bool {
        match self {
            Predicate::MatchAll => true,
            Predicate::Where(e) => e.test(props),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Predicate::MatchAll => Value::Null,
            Predicate::Where(e) => e.to_json(),
        }
    }

    /// Filtr, którego nie spełnia żaden obiekt: `["!", ["all"]]`.
    pub fn match_none() -> Self {
        Predicate::Where(Expr::not(Expr::All(Vec::new())))
    }

    /// Liczba koniunktów (0 dla `MatchAll`).
    pub fn conjuncts(&self) -> usize {
        match self {
            Predicate::MatchAll => 0,
            Predicate::Where(Expr::All(items)) => items.len(),
            Predicate::Where(_) => 1,
        }
    }
}

/// Empty sets add no condition: an empty `types` means every type passes.
pub fn compile(
    years: &BTreeSet<String>,
    statuses: &BTreeSet<String>,
    types: &BTreeSet<String>,
    active_region: Option<&str>,
) -> Predicate {
    let mut conjuncts = Vec::with_capacity(4);

    if let Some(region) = active_region {
        conjuncts.push(Expr::equals(Expr::get(PROP_REGION), Expr::lit(region)));
    }
    if !years.is_empty() {
        // lata bywają liczbami w GeoJSON
        conjuncts.push(Expr::is_in(
            Expr::to_text(Expr::get(PROP_YEAR)),
            Expr::string_list(years),
        ));
    }
    if !statuses.is_empty() {
        conjuncts.push(Expr::is_in(Expr::get(PROP_STATUS), Expr::string_list(statuses)));
    }
    if !types.is_empty() {
        conjuncts.push(Expr::is_in(Expr::get(PROP_TYPE), Expr::string_list(types)));
    }

    match conjuncts.len() {
        0 => Predicate::MatchAll,
        1 => Predicate::Where(conjuncts.remove(0)),
        _ => Predicate::Where(Expr::All(conjuncts)),
    }
}

pub fn compile_selection(sel: &Selection) -> Predicate {
    compile(&sel.years, &sel.statuses, &sel.types, sel.active_region.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn props(v: Value) -> JsonObject {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn empty_selection_matches_everything() {
        let p = compile(&set(&[]), &set(&[]), &set(&[]), None);
        assert_eq!(p, Predicate::MatchAll);
        assert_eq!(p.to_json(), Value::Null);
        assert!(p.matches(&props(json!({ "status": "ONGOING" }))));
        assert!(p.matches(&props(json!({}))));
    }

    #[test]
    fn single_dimension_is_not_wrapped() {
        let p = compile(&set(&[]), &set(&["ONGOING"]), &set(&[]), None);
        assert_eq!(p.conjuncts(), 1);
        assert_eq!(
            p.to_json(),
            json!(["in", ["get", "status"], ["literal", ["ONGOING"]]])
        );
    }

    #[test]
    fn conjunct_count_tracks_active_dimensions() {
        let y = set(&["2020"]);
        let s = set(&["COMPLETED"]);
        let t = set(&["SOLAR MINI GRID"]);
        assert_eq!(compile(&y, &s, &set(&[]), None).conjuncts(), 2);
        assert_eq!(compile(&y, &s, &t, None).conjuncts(), 3);
        assert_eq!(compile(&y, &s, &t, Some("KANO")).conjuncts(), 4);
        assert_eq!(compile(&set(&[]), &set(&[]), &set(&[]), Some("KANO")).conjuncts(), 1);
    }

    #[test]
    fn compilation_is_deterministic() {
        let a = compile(&set(&["2021", "2020"]), &set(&[]), &set(&["TRANSFORMER"]), None);
        let b = compile(&set(&["2020", "2021"]), &set(&[]), &set(&["TRANSFORMER"]), None);
        assert_eq!(a, b);
        let c = compile(&set(&["2020", "2021"]), &set(&[]), &set(&[]), None);
        assert_ne!(a, c);
    }

    #[test]
    fn region_conjunct_comes_first() {
        let p = compile(&set(&["2022"]), &set(&["ONGOING"]), &set(&[]), Some("LAGOS"));
        assert_eq!(
            p.to_json(),
            json!([
                "all",
                ["==", ["get", "region"], "LAGOS"],
                ["in", ["to-string", ["get", "year"]], ["literal", ["2022"]]],
                ["in", ["get", "status"], ["literal", ["ONGOING"]]]
            ])
        );
    }

    #[test]
    fn composite_type_tokens_match_only_themselves() {
        let p = compile(&set(&[]), &set(&[]), &set(&["GRID/SOLAR STREET LIGHT"]), None);
        assert!(p.matches(&props(json!({ "type": "GRID/SOLAR STREET LIGHT" }))));
        assert!(!p.matches(&props(json!({ "type": "SOLAR STREET LIGHT" }))));
    }

    #[test]
    fn predicate_filters_feature_properties() {
        let p = compile(&set(&["2022"]), &set(&["ONGOING"]), &set(&[]), Some("LAGOS"));
        assert!(p.matches(&props(json!({ "year": 2022, "status": "ONGOING", "region": "LAGOS" }))));
        assert!(!p.matches(&props(json!({ "year": "2022", "status": "ONGOING", "region": "KANO" }))));
        assert!(!p.matches(&props(json!({ "year": "2021", "status": "ONGOING", "region": "LAGOS" }))));
    }
}
