use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Popup, Section};
use crate::odm::TaskStatus;

// Catppuccin-inspired palette
const ACCENT: Color = Color::Rgb(250, 179, 135);
const ACCENT_BRIGHT: Color = Color::Rgb(245, 194, 231);
const DANGER: Color = Color::Rgb(243, 139, 168);
const SUCCESS: Color = Color::Rgb(166, 218, 149);
const WARNING: Color = Color::Rgb(249, 226, 175);
const TEXT: Color = Color::Rgb(205, 214, 244);
const TEXT_DIM: Color = Color::Rgb(147, 153, 178);
const BG_SELECTED: Color = Color::Rgb(69, 71, 90);
const INACTIVE: Color = Color::Rgb(88, 91, 112);
const HEADER: Color = Color::Rgb(243, 139, 168);

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let tasks_height = if area.height < 25 {
        Constraint::Min(4)
    } else {
        Constraint::Ratio(1, 2)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            tasks_height,          // Tasks box
            Constraint::Length(4), // Status box (line + gauge)
            Constraint::Min(4),    // Log box
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_tasks_box(f, app, chunks[1]);
    draw_status_box(f, app, chunks[2]);
    draw_log_box(f, app, chunks[3]);
    draw_footer(f, app, chunks[4]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::Help => draw_help_popup(f),
        Popup::Confirm => draw_confirm_popup(f, app),
    }
}

fn section_block(title: &str, is_active: bool) -> Block<'_> {
    let border_color = if is_active { ACCENT } else { INACTIVE };
    let title_style = if is_active {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(INACTIVE)
    };

    Block::default()
        .title(Span::styled(title, title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Queued => TEXT_DIM,
        TaskStatus::Running => ACCENT_BRIGHT,
        TaskStatus::Completed => SUCCESS,
        TaskStatus::Failed => DANGER,
        TaskStatus::Canceled => WARNING,
        TaskStatus::Unknown(_) => TEXT_DIM,
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: status message > connection + preset summary
    let line = if let Some(ref status) = app.status_message {
        Line::from(vec![Span::styled(status, Style::default().fg(WARNING))])
    } else {
        let (icon, server_color) = if app.connected { ("●", SUCCESS) } else { ("○", DANGER) };
        Line::from(vec![
            Span::styled(format!("{} ", icon), Style::default().fg(server_color)),
            Span::styled(&app.config.base_url, Style::default().fg(TEXT)),
            Span::styled(" │ ", Style::default().fg(TEXT_DIM)),
            Span::styled("Preset: ", Style::default().fg(TEXT_DIM)),
            Span::styled(app.preset.name(), Style::default().fg(ACCENT)),
            Span::styled(" │ ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!(
                    "{} cm/px, {} quality",
                    app.options.resolution,
                    app.options.feature_extraction.as_str()
                ),
                Style::default().fg(TEXT_DIM),
            ),
        ])
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_tasks_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Tasks;
    let block = section_block(" Tasks ", is_active);

    // Responsive columns based on width
    let show_uuid = area.width > 70;

    let header = if show_uuid {
        Row::new(vec![
            Span::styled("", Style::default().fg(HEADER)),
            Span::styled("Name", Style::default().fg(HEADER)),
            Span::styled("ID", Style::default().fg(HEADER)),
            Span::styled("Status", Style::default().fg(HEADER)),
        ])
    } else {
        Row::new(vec![
            Span::styled("", Style::default().fg(HEADER)),
            Span::styled("Name", Style::default().fg(HEADER)),
            Span::styled("Status", Style::default().fg(HEADER)),
        ])
    };

    let rows: Vec<Row> = if app.tasks.is_empty() {
        let hint = if app.connected { "  No tasks on this node" } else { "  Not connected" };
        vec![Row::new(vec![Span::styled(hint, Style::default().fg(TEXT_DIM))])]
    } else {
        app.tasks
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let watched = app.current_task.as_deref() == Some(task.uuid.as_str());
                let marker = if watched { "●" } else { " " };
                let color = status_color(task.status);

                let row_style = if i == app.selected_task && is_active {
                    Style::default().bg(BG_SELECTED).fg(TEXT)
                } else {
                    Style::default()
                };

                let mut cells = vec![
                    Span::styled(marker, Style::default().fg(ACCENT)),
                    Span::styled(task.display_name(), Style::default().fg(TEXT)),
                ];
                if show_uuid {
                    cells.push(Span::styled(&task.uuid, Style::default().fg(TEXT_DIM)));
                }
                cells.push(Span::styled(task.status.label(), Style::default().fg(color)));
                Row::new(cells).style(row_style)
            })
            .collect()
    };

    let widths = if show_uuid {
        vec![
            Constraint::Length(2),
            Constraint::Percentage(30),
            Constraint::Percentage(45),
            Constraint::Percentage(20),
        ]
    } else {
        vec![
            Constraint::Length(2),
            Constraint::Percentage(60),
            Constraint::Percentage(35),
        ]
    };

    let table = Table::new(rows, widths)
        .header(header.style(Style::default()))
        .block(block);

    f.render_widget(table, area);
}

fn draw_status_box(f: &mut Frame, app: &App, area: Rect) {
    let title = if app.is_watching() { " Status (polling) " } else { " Status " };
    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(INACTIVE)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(INACTIVE));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let text = match (&app.current_task, &app.status_line) {
        (_, Some(line)) => Span::styled(line.as_str(), Style::default().fg(TEXT)),
        (Some(uuid), None) => Span::styled(format!("Waiting for {}...", uuid), Style::default().fg(TEXT_DIM)),
        (None, None) => Span::styled("No task selected (Enter to watch)", Style::default().fg(TEXT_DIM)),
    };
    f.render_widget(Paragraph::new(Line::from(text)), rows[0]);

    // The bar is only shown while the task is running
    if let Some(percent) = app.progress {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(ACCENT).bg(BG_SELECTED))
            .percent(percent.min(100))
            .label(format!("{}%", percent));
        f.render_widget(gauge, rows[1]);
    }
}

fn draw_log_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Log;
    let block = section_block(" Log ", is_active);

    let visible = area.height.saturating_sub(2) as usize;
    let end = app.log_lines.len().saturating_sub(app.log_scroll);
    let start = end.saturating_sub(visible);

    let lines: Vec<Line> = app.log_lines[start..end]
        .iter()
        .map(|line| {
            let color = if line.starts_with('✓') {
                SUCCESS
            } else if line.starts_with('✗') {
                DANGER
            } else {
                TEXT
            };
            Line::styled(line.as_str(), Style::default().fg(color))
        })
        .collect();

    let log = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(log, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.section {
        Section::Tasks => vec![
            ("↑↓", "Nav"),
            ("Enter", "Watch"),
            ("s", "Stop"),
            ("d", "Del"),
            ("o", "Download"),
            ("p", "Preset"),
            ("R", "Refresh"),
            ("h", "Help"),
        ],
        Section::Log => vec![
            ("↑↓", "Scroll"),
            ("Tab", "Tasks"),
            ("h", "Help"),
            ("q", "Quit"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else if area.width < 80 { 6 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(ACCENT)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(TEXT_DIM)),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn help_entry(key: &'static str, text: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), Style::default().fg(ACCENT)),
        Span::raw(text),
    ])
}

fn help_heading(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(HEADER).add_modifier(Modifier::BOLD)))
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 40 { 95 } else { 75 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        help_heading("═══ Navigation ═══"),
        help_entry("Tab", "Switch sections (Tasks → Log)"),
        help_entry("↑/↓ j/k", "Move in task list / scroll log"),
        Line::from(""),
        help_heading("═══ Task Actions ═══"),
        help_entry("Enter", "Watch selected task (polls every 3s)"),
        help_entry("s", "Stop (cancel) selected task"),
        help_entry("d", "Delete selected task and its data"),
        help_entry("o", "Download all.zip to <uuid>.zip"),
        help_entry("R", "Refresh task list"),
        help_entry("c", "Test server connection"),
        Line::from(""),
        help_heading("═══ Processing ═══"),
        help_entry("p", "Cycle preset and apply its options"),
        Line::from(""),
        help_heading("═══ Command Line ═══"),
        Line::from(Span::styled("  odm-frontend connect <url> --token <t>", Style::default().fg(TEXT_DIM))),
        Line::from(Span::styled("  odm-frontend submit --preset \"Fast Orthophoto\" *.jpg", Style::default().fg(TEXT_DIM))),
        Line::from(Span::styled("  odm-frontend import <uuid> --out ./results", Style::default().fg(TEXT_DIM))),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(TEXT_DIM)),
            Span::styled("h", Style::default().fg(ACCENT)),
            Span::styled("/", Style::default().fg(TEXT_DIM)),
            Span::styled("?", Style::default().fg(ACCENT)),
            Span::styled("/", Style::default().fg(TEXT_DIM)),
            Span::styled("Esc", Style::default().fg(ACCENT)),
            Span::styled(" to close", Style::default().fg(TEXT_DIM)),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" odm-frontend Help ", Style::default().fg(ACCENT)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(50, 20, f.area());

    f.render_widget(Clear, popup_area);

    let message = app.status_message.as_deref().unwrap_or("Confirm?");

    let confirm = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(WARNING))),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y", Style::default().fg(SUCCESS).add_modifier(Modifier::BOLD)),
            Span::raw(" Yes   "),
            Span::styled("n", Style::default().fg(DANGER).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Confirm ", Style::default().fg(WARNING)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(WARNING)),
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    f.render_widget(confirm, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
