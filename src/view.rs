//! Tryby widoku i instrukcje stylu dla renderera.
//!
//! Each mode maps to a fixed list of `StyleInstruction`s. The dashboard pushes
//! the whole list on every switch, so the renderer never depends on which
//! mode it came from.

use crate::{
    catalog::{
        CHOROPLETH_STOPS, COLOR_COMPLETED, COLOR_FALLBACK, COLOR_GRID, COLOR_HOME_SYSTEM,
        COLOR_MINI_GRID, COLOR_ONGOING, COLOR_STREET_LIGHT, COLOR_YET_TO_MOBILIZE,
        LAYER_PROJECTS, LAYER_REGIONS_FILL, PROP_STATUS, PROP_TOTAL, PROP_TYPE,
        STATUS_COMPLETED, STATUS_ONGOING, STATUS_YET_TO_MOBILIZE,
    },
    expr::Expr,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewMode {
    #[default]
    Coverage,
    Performance,
    Technology,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Coverage, ViewMode::Performance, ViewMode::Technology];

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Coverage => "Zasięg",
            ViewMode::Performance => "Realizacja",
            ViewMode::Technology => "Technologia",
        }
    }

    pub fn shows_choropleth(self) -> bool {
        self == ViewMode::Coverage
    }

    pub fn shows_points(self) -> bool {
        !self.shows_choropleth()
    }

    pub fn instructions(self) -> Vec<StyleInstruction> {
        let shown = |on: bool| if on { Visibility::Visible } else { Visibility::None };
        let (fill, points) = (shown(self.shows_choropleth()), shown(self.shows_points()));
        let mut out = vec![
            StyleInstruction::Layout {
                layer: LAYER_REGIONS_FILL,
                visibility: fill,
            },
            StyleInstruction::Layout {
                layer: LAYER_PROJECTS,
                visibility: points,
            },
        ];
        match self {
            ViewMode::Coverage => out.push(StyleInstruction::Paint {
                layer: LAYER_REGIONS_FILL,
                property: PaintProperty::FillColor,
                value: choropleth_ramp(),
            }),
            ViewMode::Performance => out.push(StyleInstruction::Paint {
                layer: LAYER_PROJECTS,
                property: PaintProperty::CircleColor,
                value: status_colors(),
            }),
            ViewMode::Technology => out.push(StyleInstruction::Paint {
                layer: LAYER_PROJECTS,
                property: PaintProperty::CircleColor,
                value: technology_colors(),
            }),
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaintProperty {
    FillColor,
    LineColor,
    CircleColor,
}

impl PaintProperty {
    pub fn name(self) -> &'static str {
        match self {
            PaintProperty::FillColor => "fill-color",
            PaintProperty::LineColor => "line-color",
            PaintProperty::CircleColor => "circle-color",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StyleInstruction {
    Layout {
        layer: &'static str,
        visibility: Visibility,
    },
    Paint {
        layer: &'static str,
        property: PaintProperty,
        value: Expr,
    },
}

fn choropleth_ramp() -> Expr {
    Expr::Interpolate {
        input: Box::new(Expr::get(PROP_TOTAL)),
        stops: CHOROPLETH_STOPS
            .iter()
            .map(|(at, color)| (*at, Expr::lit(*color)))
            .collect(),
    }
}

fn status_colors() -> Expr {
    Expr::Match {
        input: Box::new(Expr::get(PROP_STATUS)),
        arms: vec![
            (STATUS_COMPLETED.to_string(), Expr::lit(COLOR_COMPLETED)),
            (STATUS_ONGOING.to_string(), Expr::lit(COLOR_ONGOING)),
            (STATUS_YET_TO_MOBILIZE.to_string(), Expr::lit(COLOR_YET_TO_MOBILIZE)),
        ],
        fallback: Box::new(Expr::lit(COLOR_FALLBACK)),
    }
}

fn technology_colors() -> Expr {
    let kind = || Expr::downcase(Expr::get(PROP_TYPE));
    let has = |needle: &str| Expr::is_in(Expr::lit(needle), kind());
    Expr::Case {
        branches: vec![
            (
                Expr::All(vec![has("street light"), Expr::not(has("mini grid"))]),
                Expr::lit(COLOR_STREET_LIGHT),
            ),
            (has("mini grid"), Expr::lit(COLOR_MINI_GRID)),
            (has("home"), Expr::lit(COLOR_HOME_SYSTEM)),
            (has("grid"), Expr::lit(COLOR_GRID)),
        ],
        fallback: Box::new(Expr::lit(COLOR_FALLBACK)),
    }
}

/// Technology class of a project type token, same precedence as the
/// `circle-color` rule of the Technology view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technology {
    StreetLight,
    MiniGrid,
    HomeSystem,
    Grid,
    Other,
}

impl Technology {
    pub fn classify(project_type: &str) -> Self {
        let t = project_type.to_lowercase();
        if t.contains("street light") && !t.contains("mini grid") {
            Technology::StreetLight
        } else if t.contains("mini grid") {
            Technology::MiniGrid
        } else if t.contains("home") {
            Technology::HomeSystem
        } else if t.contains("grid") {
            Technology::Grid
        } else {
            Technology::Other
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Technology::StreetLight => COLOR_STREET_LIGHT,
            Technology::MiniGrid => COLOR_MINI_GRID,
            Technology::HomeSystem => COLOR_HOME_SYSTEM,
            Technology::Grid => COLOR_GRID,
            Technology::Other => COLOR_FALLBACK,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Technology::StreetLight => "Oświetlenie uliczne",
            Technology::MiniGrid => "Mini sieci",
            Technology::HomeSystem => "Systemy domowe",
            Technology::Grid => "Sieć",
            Technology::Other => "Inne",
        }
    }
}

pub fn status_color(status: &str) -> &'static str {
    match status {
        STATUS_COMPLETED => COLOR_COMPLETED,
        STATUS_ONGOING => COLOR_ONGOING,
        STATUS_YET_TO_MOBILIZE => COLOR_YET_TO_MOBILIZE,
        _ => COLOR_FALLBACK,
    }
}
