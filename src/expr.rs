//! Wyrażenia stylu i filtrów w formie drzewa.
//!
//! `Expr` is what the dashboard hands to a `MapSurface`: filters, paint rules
//! and the choropleth ramp are all built from it. `eval` runs it against one
//! feature's properties, `to_json` renders the Mapbox-style array form used in
//! logs.

use geojson::JsonObject;
use serde_json::{Value, json};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Get(String),
    Literal(Value),
    ToString(Box<Expr>),
    Downcase(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    /// Membership in an array, or substring of a string.
    In(Box<Expr>, Box<Expr>),
    All(Vec<Expr>),
    Not(Box<Expr>),
    Case {
        branches: Vec<(Expr, Expr)>,
        fallback: Box<Expr>,
    },
    Match {
        input: Box<Expr>,
        arms: Vec<(String, Expr)>,
        fallback: Box<Expr>,
    },
    /// Linear interpolation; stops must be sorted by input value.
    Interpolate {
        input: Box<Expr>,
        stops: Vec<(f64, Expr)>,
    },
}

impl Expr {
    pub fn get(key: &str) -> Self {
        Expr::Get(key.to_string())
    }

    pub fn lit<V: Into<Value>>(value: V) -> Self {
        Expr::Literal(value.into())
    }

    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Expr::Literal(Value::Array(
            items
                .into_iter()
                .map(|s| Value::String(s.as_ref().to_string()))
                .collect(),
        ))
    }

    pub fn equals(a: Expr, b: Expr) -> Self {
        Expr::Eq(Box::new(a), Box::new(b))
    }

    pub fn is_in(needle: Expr, haystack: Expr) -> Self {
        Expr::In(Box::new(needle), Box::new(haystack))
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    pub fn downcase(inner: Expr) -> Self {
        Expr::Downcase(Box::new(inner))
    }

    pub fn to_text(inner: Expr) -> Self {
        Expr::ToString(Box::new(inner))
    }

    pub fn eval(&self, props: &JsonObject) -> Value {
        match self {
            Expr::Get(key) => props.get(key).cloned().unwrap_or(Value::Null),
            Expr::Literal(v) => v.clone(),
            Expr::ToString(e) => Value::String(as_text(&e.eval(props))),
            Expr::Downcase(e) => Value::String(as_text(&e.eval(props)).to_lowercase()),
            Expr::Eq(a, b) => Value::Bool(a.eval(props) == b.eval(props)),
            Expr::In(needle, haystack) => {
                let needle = needle.eval(props);
                let hit = match haystack.eval(props) {
                    Value::Array(items) => items.contains(&needle),
                    Value::String(s) => s.contains(as_text(&needle).as_str()),
                    _ => false,
                };
                Value::Bool(hit)
            }
            Expr::All(items) => Value::Bool(items.iter().all(|e| truthy(&e.eval(props)))),
            Expr::Not(e) => Value::Bool(!truthy(&e.eval(props))),
            Expr::Case { branches, fallback } => branches
                .iter()
                .find(|(cond, _)| truthy(&cond.eval(props)))
                .map(|(_, out)| out.eval(props))
                .unwrap_or_else(|| fallback.eval(props)),
            Expr::Match {
                input,
                arms,
                fallback,
            } => {
                let label = as_text(&input.eval(props));
                arms.iter()
                    .find(|(l, _)| *l == label)
                    .map(|(_, out)| out.eval(props))
                    .unwrap_or_else(|| fallback.eval(props))
            }
            Expr::Interpolate { input, stops } => interpolate(&input.eval(props), stops, props),
        }
    }

    /// Filtr przepuszcza obiekt tylko dla `true`.
    pub fn test(&self, props: &JsonObject) -> bool {
        truthy(&self.eval(props))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Expr::Get(key) => json!(["get", key]),
            Expr::Literal(v @ (Value::Array(_) | Value::Object(_))) => json!(["literal", v]),
            Expr::Literal(v) => v.clone(),
            Expr::ToString(e) => json!(["to-string", e.to_json()]),
            Expr::Downcase(e) => json!(["downcase", e.to_json()]),
            Expr::Eq(a, b) => json!(["==", a.to_json(), b.to_json()]),
            Expr::In(a, b) => json!(["in", a.to_json(), b.to_json()]),
            Expr::All(items) => {
                let mut out = vec![json!("all")];
                out.extend(items.iter().map(Expr::to_json));
                Value::Array(out)
            }
            Expr::Not(e) => json!(["!", e.to_json()]),
            Expr::Case { branches, fallback } => {
                let mut out = vec![json!("case")];
                for (cond, value) in branches {
                    out.push(cond.to_json());
                    out.push(value.to_json());
                }
                out.push(fallback.to_json());
                Value::Array(out)
            }
            Expr::Match {
                input,
                arms,
                fallback,
            } => {
                let mut out = vec![json!("match"), input.to_json()];
                for (label, value) in arms {
                    out.push(json!(label));
                    out.push(value.to_json());
                }
                out.push(fallback.to_json());
                Value::Array(out)
            }
            Expr::Interpolate { input, stops } => {
                let mut out = vec![json!("interpolate"), json!(["linear"]), input.to_json()];
                for (at, value) in stops {
                    out.push(json!(at));
                    out.push(value.to_json());
                }
                Value::Array(out)
            }
        }
    }
}

fn truthy(v: &Value) -> bool {
    matches!(v, Value::Bool(true))
}

pub fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn interpolate(input: &Value, stops: &[(f64, Expr)], props: &JsonObject) -> Value {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Value::Null;
    };
    let x = match as_number(input) {
        Some(x) => x,
        None => return first.1.eval(props),
    };
    if x <= first.0 {
        return first.1.eval(props);
    }
    if x >= last.0 {
        return last.1.eval(props);
    }
    for pair in stops.windows(2) {
        let ((x0, lo), (x1, hi)) = (&pair[0], &pair[1]);
        if x >= *x0 && x <= *x1 {
            let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
            return blend(&lo.eval(props), &hi.eval(props), t);
        }
    }
    last.1.eval(props)
}

fn blend(lo: &Value, hi: &Value, t: f64) -> Value {
    if let (Some(a), Some(b)) = (lo.as_f64(), hi.as_f64()) {
        return json!(a + (b - a) * t);
    }
    match (lo.as_str().and_then(parse_hex), hi.as_str().and_then(parse_hex)) {
        (Some(a), Some(b)) => Value::String(to_hex(lerp_rgb(a, b, t))),
        _ => lo.clone(),
    }
}

/// `#rrggbb` → (r, g, b)
pub fn parse_hex(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

pub fn to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn props(v: Value) -> JsonObject {
        match v {
            Value::Object(map) => map,
            _ => panic!("test props must be an object"),
        }
    }

    #[test]
    fn in_checks_array_membership_and_substrings() {
        let p = props(json!({ "year": "2022", "type": "GRID/SOLAR STREET LIGHT" }));
        let years = Expr::is_in(Expr::get("year"), Expr::string_list(["2021", "2022"]));
        assert!(years.test(&p));
        let light = Expr::is_in(Expr::lit("street light"), Expr::downcase(Expr::get("type")));
        assert!(light.test(&p));
        let home = Expr::is_in(Expr::lit("home"), Expr::downcase(Expr::get("type")));
        assert!(!home.test(&p));
    }

    #[test]
    fn to_text_bridges_numeric_years() {
        let p = props(json!({ "year": 2022 }));
        let raw = Expr::is_in(Expr::get("year"), Expr::string_list(["2022"]));
        let coerced = Expr::is_in(Expr::to_text(Expr::get("year")), Expr::string_list(["2022"]));
        assert!(!raw.test(&p));
        assert!(coerced.test(&p));
    }

    #[test]
    fn missing_property_fails_equality_without_panicking() {
        let p = props(json!({}));
        assert!(!Expr::equals(Expr::get("region"), Expr::lit("LAGOS")).test(&p));
    }

    #[test]
    fn interpolate_blends_colours_between_stops() {
        let ramp = Expr::Interpolate {
            input: Box::new(Expr::get("total")),
            stops: vec![(0.0, Expr::lit("#000000")), (100.0, Expr::lit("#ffffff"))],
        };
        assert_eq!(ramp.eval(&props(json!({ "total": 50 }))), json!("#808080"));
        assert_eq!(ramp.eval(&props(json!({ "total": -5 }))), json!("#000000"));
        assert_eq!(ramp.eval(&props(json!({ "total": 900 }))), json!("#ffffff"));
        assert_eq!(ramp.eval(&props(json!({}))), json!("#000000"));
    }

    #[test]
    fn case_renders_mapbox_array_form() {
        let e = Expr::Case {
            branches: vec![(Expr::equals(Expr::get("status"), Expr::lit("ONGOING")), Expr::lit("#f59e0b"))],
            fallback: Box::new(Expr::lit("#9ca3af")),
        };
        assert_eq!(
            e.to_json(),
            json!(["case", ["==", ["get", "status"], "ONGOING"], "#f59e0b", "#9ca3af"])
        );
    }

    #[test]
    fn hex_round_trip_rejects_garbage() {
        assert_eq!(parse_hex("#1e3a8a"), Some((0x1e, 0x3a, 0x8a)));
        assert_eq!(parse_hex("1e3a8a"), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(to_hex((0x1e, 0x3a, 0x8a)), "#1e3a8a");
    }
}
