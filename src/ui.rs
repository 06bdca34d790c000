use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::{
    dashboard::{Dashboard, PanelState},
    data::ProjectPoint,
    expr::parse_hex,
    selection::Selection,
    state::{AppState, Panel},
    stats::{RegionPanel, RegionStats},
    view::{status_color, ViewMode},
};
use crate::catalog::{STATUS_COMPLETED, STATUS_ONGOING, STATUS_YET_TO_MOBILIZE};

const BAR_WIDTH: usize = 12;

pub fn draw(f: &mut Frame<'_>, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(60),
            Constraint::Percentage(20),
        ].as_ref())
        .split(f.area());

    let selection = state.dashboard.selection();

    // Lewy panel: filtry
    let items: Vec<ListItem> = state.entries
        .iter()
        .enumerate()
        .map(|(i, (dim, value))| {
            let mark = if selection.is_selected(*dim, value) { "[x]" } else { "[ ]" };
            let header = state.entries[..i].last().is_none_or(|(prev, _)| prev != dim);
            let label = if header { dim.label() } else { "" };
            ListItem::new(format!("{label:<7}{mark} {value}"))
        })
        .collect();
    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));
    let list = List::new(items)
        .block(panel_block(
            format!("Filtry ({})", selection.active_filter_count()),
            state.active_panel == Panel::Left,
        ))
        .highlight_symbol(">> ")
        .highlight_style(Style::default().fg(Color::Red));
    f.render_stateful_widget(list, chunks[0], &mut list_state);

    // Środek: mapa
    if let Some(err) = &state.load_error {
        let txt = Paragraph::new(format!("Nie udało się wczytać danych:\n{err}"))
            .block(Block::default().borders(Borders::ALL).title("Mapa"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        f.render_widget(txt, chunks[1]);
    } else if state.loading {
        let txt = Paragraph::new("Ładowanie danych…")
            .block(Block::default().borders(Borders::ALL).title("Mapa"))
            .wrap(Wrap { trim: true });
        f.render_widget(txt, chunks[1]);
    } else {
        let title = match &selection.active_region {
            Some(region) => format!("Mapa: {} / {}", selection.view_mode.label(), region),
            None => format!("Mapa: {}", selection.view_mode.label()),
        };
        let cursor = (state.active_panel == Panel::Center).then_some(state.cursor).flatten();
        state.map.render(f, chunks[1], &title, cursor);
    }

    // Prawy panel: informacje + szczegóły
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(chunks[2]);

    let info = Paragraph::new(info_lines(&state.dashboard, &selection))
        .block(Block::default().borders(Borders::ALL).title("Informacje"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, right_chunks[0]);

    let details = Paragraph::new(detail_lines(&state.dashboard.panel(), selection.view_mode))
        .block(panel_block("Szczegóły".to_string(), state.active_panel == Panel::Right))
        .wrap(Wrap { trim: true });
    f.render_widget(details, right_chunks[1]);
}

fn panel_block(title: String, active: bool) -> Block<'static> {
    let style = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).title(title).border_style(style)
}

fn info_lines(dashboard: &Dashboard, selection: &Selection) -> Vec<Line<'static>> {
    let count = if !dashboard.is_ready() || dashboard.count_pending() {
        "…".to_string()
    } else {
        dashboard.visible_count().map_or_else(|| "-".to_string(), |n| n.to_string())
    };
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Widok: "),
            Span::styled(selection.view_mode.label(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(format!("Widoczne projekty: {count}")),
    ];
    if !selection.view_mode.shows_points() {
        lines.push(Line::from(Span::styled(
            "(punkty ukryte w tym widoku)",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(AppState::HELP_TEXT.lines().map(|l| Line::from(l.to_string())));
    lines
}

fn detail_lines(panel: &PanelState, mode: ViewMode) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(project) = &panel.project {
        lines.extend(project_lines(project));
        lines.push(Line::from(""));
    }
    match &panel.region {
        Some(region) => {
            let name = region.region().to_string();
            match region {
                RegionPanel::Stats { stats, .. } => {
                    lines.push(Line::from(Span::styled(name, Style::default().add_modifier(Modifier::BOLD))));
                    lines.extend(region_lines(stats, mode));
                }
                RegionPanel::NoData { .. } => lines.push(Line::from(format!("Brak danych dla {name}"))),
            }
        }
        None if panel.project.is_none() => {
            lines.push(Line::from("Kliknij region lub projekt na mapie"));
        }
        None => {}
    }
    lines
}

fn project_lines(p: &ProjectPoint) -> Vec<Line<'static>> {
    let title = if p.title.is_empty() { p.id.clone() } else { p.title.clone() };
    let mut lines = vec![
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::raw("Status: "),
            Span::styled(p.status.clone(), Style::default().fg(hex_color(status_color(&p.status)))),
        ]),
        Line::from(format!("Typ: {}", p.project_type)),
        Line::from(format!("Rok: {}", p.year)),
        Line::from(format!("Region: {}", p.region)),
    ];
    for (label, value) in [("Miejsce", &p.location), ("Wykonawca", &p.contractor), ("Lot", &p.lot)] {
        if !value.is_empty() {
            lines.push(Line::from(format!("{label}: {value}")));
        }
    }
    lines
}

fn region_lines(stats: &RegionStats, mode: ViewMode) -> Vec<Line<'static>> {
    match mode {
        ViewMode::Coverage => vec![
            Line::from(format!("Projekty: {}", stats.total)),
            Line::from(format!("Ukończone: {:.1}%", stats.pct_completed)),
        ],
        ViewMode::Performance => {
            let mut lines: Vec<Line<'static>> = [
                (STATUS_COMPLETED, stats.completed),
                (STATUS_ONGOING, stats.ongoing),
                (STATUS_YET_TO_MOBILIZE, stats.yet_to_mobilize),
            ]
            .into_iter()
            .map(|(status, n)| bar_line(status, n, stats.share_pct(n), hex_color(status_color(status))))
            .collect();
            if !stats.is_consistent() {
                lines.push(Line::from(Span::styled(
                    format!("Suma statusów różna od {}", stats.total),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines
        }
        ViewMode::Technology => {
            let shares = stats.technology_shares();
            if shares.is_empty() {
                return vec![Line::from("Brak podziału na technologie")];
            }
            shares
                .into_iter()
                .map(|(tech, n, pct)| bar_line(tech.label(), n, pct, hex_color(tech.color())))
                .collect()
        }
    }
}

fn bar_line(label: &str, count: u64, pct: f64, color: Color) -> Line<'static> {
    let filled = ((pct / 100.0) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    Line::from(vec![
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::raw("░".repeat(BAR_WIDTH - filled)),
        Span::raw(format!(" {label}: {count} ({pct:.0}%)")),
    ])
}

fn hex_color(hex: &str) -> Color {
    parse_hex(hex).map_or(Color::Gray, |(r, g, b)| Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn missing_region_stats_say_so() {
        let panel = PanelState {
            region: Some(RegionPanel::NoData { region: "KANO".into() }),
            project: None,
        };
        assert_eq!(text(&detail_lines(&panel, ViewMode::Coverage)), vec!["Brak danych dla KANO"]);
    }

    #[test]
    fn empty_region_draws_empty_bars() {
        let line = bar_line("Sieć", 0, RegionStats::default().share_pct(0), Color::Gray);
        assert_eq!(text(&[line]), vec![format!("{} Sieć: 0 (0%)", "░".repeat(BAR_WIDTH))]);
    }

    #[test]
    fn coverage_shows_totals() {
        let stats = RegionStats {
            total: 4,
            completed: 1,
            pct_completed: 25.0,
            ..RegionStats::default()
        };
        assert_eq!(
            text(&region_lines(&stats, ViewMode::Coverage)),
            vec!["Projekty: 4", "Ukończone: 25.0%"]
        );
    }
}
