use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState};
use timing_protocol::{GateKind, PenaltyValue, ResultStatus};

use super::app::AppState;
use super::theme::{Theme, ValueStyle};
use crate::state::RaceSnapshot;
use crate::view::{gate_cell, GridRow};

const HELP_LINES: &[(&str, &str)] = &[
    ("0 / 2", "clear gate / touch"),
    ("5 0, 5", "missed gate (50)"),
    ("Del, Bksp", "empty the cell"),
    ("Enter", "confirm, next competitor"),
    ("Esc", "drop staged value"),
    ("Arrows", "move"),
    ("PgUp/PgDn", "10 rows"),
    ("Home/End", "row start/end, +Ctrl first/last row"),
    ("F5", "finish impulse"),
    ("F9 F10 F11", "remove DNS / DNF / CAP"),
    ("Tab", "next race"),
    ("?", "toggle help"),
    ("Q Q", "quit"),
];

pub(crate) fn draw_ui(frame: &mut ratatui::Frame, app: &AppState) {
    let theme = Theme::dark();
    let snapshot = app.snapshot();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(chunks[1]);

    draw_header(frame, app, &snapshot, &theme, chunks[0]);
    draw_schedule(frame, app, &snapshot, &theme, body[0]);
    draw_grid(frame, app, &snapshot, &theme, body[1]);
    draw_footer(frame, app, &snapshot, &theme, chunks[2]);

    if app.show_help {
        draw_help(frame, &theme);
    }
}

fn draw_header(
    frame: &mut ratatui::Frame,
    app: &AppState,
    snapshot: &RaceSnapshot,
    theme: &Theme,
    area: Rect,
) {
    let mut spans = vec![
        Span::styled("Server: ", theme.key_style()),
        Span::styled(app.connection.label(), theme.connection_style(app.connection)),
    ];
    if let Some(info) = &snapshot.server_info {
        let upstream = info.upstream_host.as_deref().unwrap_or("unknown");
        let link = if info.upstream_timing_connected {
            theme.value_style(ValueStyle::Important)
        } else {
            theme.warn_style()
        };
        spans.extend([
            Span::styled("  Timing: ", theme.key_style()),
            Span::styled(upstream.to_string(), link),
            Span::styled("  Protocol: ", theme.key_style()),
            Span::styled(
                format!("v{}", info.protocol_version),
                theme.value_style(ValueStyle::Normal),
            ),
        ]);
    }
    let active = snapshot.active_races().count();
    spans.extend([
        Span::styled("  Active races: ", theme.key_style()),
        Span::styled(active.to_string(), theme.value_style(ValueStyle::Normal)),
    ]);
    let pending = app.queue.pending_operations();
    spans.extend([
        Span::styled("  Pending: ", theme.key_style()),
        Span::styled(
            pending.to_string(),
            if pending > 0 {
                theme.warn_style()
            } else {
                theme.value_style(ValueStyle::Dim)
            },
        ),
    ]);
    let header = Paragraph::new(Line::from(spans))
        .block(theme.block("Gate Console"))
        .style(theme.value_style(ValueStyle::Normal));
    frame.render_widget(header, area);
}

fn draw_schedule(
    frame: &mut ratatui::Frame,
    app: &AppState,
    snapshot: &RaceSnapshot,
    theme: &Theme,
    area: Rect,
) {
    let items = if snapshot.schedule.is_empty() {
        vec![ListItem::new(Line::styled(
            "waiting for schedule",
            theme.value_style(ValueStyle::Dim),
        ))]
    } else {
        snapshot
            .schedule
            .iter()
            .map(|race| {
                let marker = if race.status == timing_protocol::RaceStatus::Running {
                    "▶ "
                } else {
                    "  "
                };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, theme.race_status_style(race.status)),
                    Span::styled(race.main_title.clone(), theme.value_style(ValueStyle::Normal)),
                    Span::styled(
                        format!(" {}", race.status.label()),
                        theme.race_status_style(race.status),
                    ),
                ]))
            })
            .collect()
    };
    let selected = app.selected_race.as_deref().and_then(|race_id| {
        snapshot
            .schedule
            .iter()
            .position(|race| race.race_id == race_id)
    });
    let mut state = ListState::default().with_selected(selected);
    let list = List::new(items)
        .block(theme.block("Races"))
        .highlight_style(theme.highlight_style());
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_grid(
    frame: &mut ratatui::Frame,
    app: &AppState,
    snapshot: &RaceSnapshot,
    theme: &Theme,
    area: Rect,
) {
    let Some(race_id) = app.selected_race.as_deref() else {
        let empty = Paragraph::new("no race selected")
            .block(theme.block("Gates"))
            .style(theme.value_style(ValueStyle::Dim));
        frame.render_widget(empty, area);
        return;
    };

    let kinds = snapshot.gate_kinds(race_id);
    let gate_count = snapshot.gate_count(race_id) as usize;
    let mut header_cells = vec![
        Cell::from(Span::styled("Bib", theme.key_style())),
        Cell::from(Span::styled("Name", theme.key_style())),
        Cell::from(Span::styled("Time", theme.key_style())),
    ];
    header_cells.extend((0..gate_count).map(|index| {
        let kind = kinds.get(index).copied().unwrap_or(GateKind::Normal);
        Cell::from(Span::styled(
            format!("{}{}", index + 1, kind.code()),
            theme.key_style(),
        ))
    }));

    let (focus_row, _) = app.focus.position();
    let rows = app.rows.iter().enumerate().map(|(row_index, row)| {
        let mut cells = vec![
            Cell::from(Span::styled(
                row.bib.clone(),
                if row.on_course {
                    theme.value_style(ValueStyle::Important)
                } else {
                    theme.value_style(ValueStyle::Normal)
                },
            )),
            Cell::from(row.name.clone()),
            Cell::from(Span::styled(row_time(row), theme.value_style(ValueStyle::Dim))),
        ];
        cells.extend((0..gate_count).map(|column| {
            let focused = app.focus.is_focused(row_index, column);
            let preview = if focused { app.preview() } else { None };
            let cell = gate_cell(
                snapshot,
                &app.queue,
                race_id,
                &row.bib,
                column as u32 + 1,
                preview,
            );
            Cell::from(Span::styled(
                format_penalty(cell.value),
                theme.cell_style(cell.source, focused),
            ))
        }));
        Row::new(cells)
    });

    let mut widths = vec![
        Constraint::Length(5),
        Constraint::Length(18),
        Constraint::Length(8),
    ];
    widths.extend(std::iter::repeat(Constraint::Length(3)).take(gate_count));

    let title = snapshot
        .schedule
        .iter()
        .find(|race| race.race_id == race_id)
        .map(|race| match &race.sub_title {
            Some(sub_title) => format!("{} {}", race.main_title, sub_title),
            None => race.main_title.clone(),
        })
        .unwrap_or_else(|| race_id.to_string());
    let (competitors, gates) = app.focus.dimensions();
    let title = format!("{title} · {competitors} competitors · {gates} gates");
    let table = Table::new(rows, widths)
        .header(Row::new(header_cells))
        .block(theme.block(&title))
        .column_spacing(1);
    let mut state = TableState::default().with_selected((!app.rows.is_empty()).then_some(focus_row));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_footer(
    frame: &mut ratatui::Frame,
    app: &AppState,
    snapshot: &RaceSnapshot,
    theme: &Theme,
    area: Rect,
) {
    let mut spans = vec![Span::styled(
        "0/2/5=penalty  Del=clear  Enter=next  F5=finish  F9-F11=remove  Tab=race  ?=help  Q=quit  ",
        theme.help_style(),
    )];
    if app.confirm_quit {
        spans.push(Span::styled(
            "press Q again to quit / Esc to stay  ",
            theme.warn_style(),
        ));
    }
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(notice.clone(), theme.error_style()));
    } else if let Some(error) = &snapshot.last_server_error {
        spans.push(Span::styled(format!("server: {error}"), theme.warn_style()));
    }
    let footer = Paragraph::new(Line::from(spans)).block(theme.block("Controls"));
    frame.render_widget(footer, area);
}

fn draw_help(frame: &mut ratatui::Frame, theme: &Theme) {
    let area = centered(frame.area(), 56, HELP_LINES.len() as u16 + 2);
    let lines: Vec<Line> = HELP_LINES
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{keys:<12}"), theme.value_style(ValueStyle::Important)),
                Span::styled(*action, theme.value_style(ValueStyle::Normal)),
            ])
        })
        .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(theme.block("Keys")), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn row_time(row: &GridRow) -> String {
    match (row.status, &row.time) {
        (Some(ResultStatus::Dns), _) => "DNS".to_string(),
        (Some(ResultStatus::Dnf), _) => "DNF".to_string(),
        (Some(ResultStatus::Dsq), _) => "DSQ".to_string(),
        (None, Some(time)) => time.clone(),
        (None, None) if row.on_course => "on course".to_string(),
        (None, None) => String::new(),
    }
}

pub(crate) fn format_penalty(value: Option<PenaltyValue>) -> String {
    match value {
        Some(value) => value.seconds().to_string(),
        None => "·".to_string(),
    }
}
