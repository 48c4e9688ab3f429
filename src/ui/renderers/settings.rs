use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::types::{App, SettingsOption};

/// Render the settings mode
pub fn render(f: &mut Frame, app: &App) {
    // Main layout: Title + Settings Content + Notification (if any)
    let main_chunks = if app.notification.is_some() {
        Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title header
                Constraint::Min(0),    // Settings content
                Constraint::Length(3), // Notification
            ])
            .split(f.size())
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title header
                Constraint::Min(0),    // Settings content
            ])
            .split(f.size())
    };

    render_title(f, main_chunks[0]);
    render_settings_content(f, app, main_chunks[1]);

    if app.notification.is_some() && main_chunks.len() > 2 {
        render_notification(f, app, main_chunks[2]);
    }
}

fn render_title(f: &mut Frame, area: Rect) {
    let block = Block::default().title("Settings").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let nav_text = "q: quit | Tab/Esc: back | ↑/↓: select | ←/→: adjust | s: save | r: remove";
    f.render_widget(Paragraph::new(nav_text), inner);
}

fn render_settings_content(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50), // Current settings
            Constraint::Percentage(50), // Available actions
        ])
        .split(area);

    render_current_settings(f, app, chunks[0]);
    render_available_actions(f, app, chunks[1]);
}

fn render_current_settings(f: &mut Frame, app: &App, area: Rect) {
    let label = Style::default().fg(Color::Cyan);
    let mut lines = vec![
        Line::from(vec![Span::styled("🌐 Endpoint: ", label), Span::raw(app.endpoint.clone())]),
        Line::from(vec![
            Span::styled("🏢 Company: ", label),
            Span::raw(app.query.comp_slug.clone().unwrap_or_else(|| "(none)".to_string())),
        ]),
        Line::from(vec![
            Span::styled("🗳️  Event: ", label),
            Span::raw(app.query.event_slug.clone()),
        ]),
        Line::from(vec![
            Span::styled("❓ Question: ", label),
            Span::raw(app.query.question_no.to_string()),
        ]),
        Line::from(""),
        Line::from("Adjustable:"),
    ];

    for (i, option) in SettingsOption::ALL.iter().enumerate() {
        let style = if app.settings_selected == i {
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let text = match option {
            SettingsOption::Interval => format!("  Refresh interval: {}s", app.interval.as_secs()),
            SettingsOption::Quorum => format!("  Quorum: {}%", app.board.quorum().percent()),
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    let saved = if app.config_path.as_deref().is_some_and(|p| p.exists()) {
        Span::styled(
            "Changes are saved to the configuration file",
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled(
            "No saved configuration: changes last for this session",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )
    };
    lines.push(Line::from(""));
    lines.push(Line::from(saved));

    let widget = Paragraph::new(lines)
        .block(Block::default().title("Current Settings").borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(widget, area);
}

fn render_available_actions(f: &mut Frame, app: &App, area: Rect) {
    let key = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
    let mut actions = vec![
        Line::from(vec![Span::styled("↑/↓", key), Span::raw(" - Navigate settings")]),
        Line::from(vec![Span::styled("←/→", key), Span::raw(" - Adjust selected setting")]),
        Line::from(""),
        Line::from(vec![Span::styled("s", key), Span::raw(" - Save this session's settings")]),
        Line::from(vec![Span::styled("r", key), Span::raw(" - Remove saved configuration")]),
        Line::from("    Exit and restart to run the guided setup"),
        Line::from(""),
        Line::from(vec![
            Span::styled("Tab", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
            Span::raw(" - Back to the results"),
        ]),
        Line::from(""),
    ];
    let hint = match app.selected_setting() {
        SettingsOption::Interval => "Auto-refresh restarts with the new interval",
        SettingsOption::Quorum => "Progress bars turn green above the quorum",
    };
    let tip = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    actions.push(Line::from(Span::styled("Tip:", tip)));
    actions.push(Line::from(hint));

    let widget = Paragraph::new(actions)
        .block(Block::default().title("Available Actions").borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(widget, area);
}

fn render_notification(f: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = &app.notification {
        let style = if msg.starts_with("✅") {
            Style::default().fg(Color::Green)
        } else if msg.starts_with("❌") {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Yellow)
        };

        let notification = Paragraph::new(msg.as_str())
            .style(style)
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(notification, area);
    }
}
