use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, ProfileConnect};
use crate::ui::constants::{APP_TITLE, HELP_TEXT};
use crate::ui::helpers::{detail_line, yes_no};

fn profile_style(connect: &ProfileConnect) -> Style {
    if connect.busy() || connect.dialog_open() {
        Style::default().fg(Color::Yellow)
    } else if connect.connected() {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}

pub(crate) fn draw_profile_list(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let header_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let list_height = area.height.saturating_sub(3) as usize;
    let (start, end) = if app.profiles.is_empty() || list_height == 0 {
        (0, 0)
    } else if app.selected + 1 > list_height {
        let start = app.selected + 1 - list_height;
        (start, (start + list_height).min(app.profiles.len()))
    } else {
        (0, app.profiles.len().min(list_height))
    };

    let items: Vec<ListItem> = if app.profiles.is_empty() {
        vec![ListItem::new("No profiles found")]
    } else {
        app.profiles[start..end]
            .iter()
            .map(|connect| {
                let prefix = if connect.busy() { "~ " } else { "  " };
                ListItem::new(Line::from(Span::styled(
                    format!("{prefix}{}", connect.profile.formatted_name()),
                    profile_style(connect),
                )))
            })
            .collect()
    };

    let block = Block::default()
        .title(Line::from(Span::styled("Profiles", header_style)))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let list = List::new(items)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol(Span::styled(
            ">",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
    let list_area = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width,
        height: inner.height.saturating_sub(1),
    };

    let mut state = ListState::default();
    if !app.profiles.is_empty() {
        state.select(Some(app.selected.saturating_sub(start)));
    }
    frame.render_stateful_widget(list, list_area, &mut state);

    let commands = if app.selected_profile().is_some_and(ProfileConnect::connected) {
        "(c) disconnect | (r)eload"
    } else {
        "(c)onnect | (r)eload"
    };
    let commands = Paragraph::new(commands)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    let commands_area = Rect {
        x: inner.x,
        y: inner.y + inner.height.saturating_sub(1),
        width: inner.width,
        height: 1,
    };
    frame.render_widget(commands, commands_area);
}

pub(crate) fn draw_app_header(frame: &mut Frame<'_>, area: Rect) {
    let title = Paragraph::new(APP_TITLE)
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

pub(crate) fn draw_help_header(frame: &mut Frame<'_>, area: Rect) {
    let help = Paragraph::new(HELP_TEXT)
        .block(
            Block::default()
                .title(Line::from(Span::styled(
                    "Help",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(help, area);
}

pub(crate) fn draw_details(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let header_style = Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::BOLD);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(Span::styled("Profile details", header_style)));
    let Some(connect) = app.selected_profile() else {
        let empty = Paragraph::new("No profile selected")
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    };
    let profile = &connect.profile;
    let mut lines = vec![
        detail_line("Name", profile.formatted_name()),
        detail_line("Server", profile.server.clone()),
        detail_line("Organization", profile.organization.clone()),
        Line::from(vec![
            Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(profile.status_label().to_string(), profile_style(connect)),
        ]),
        detail_line("System", yes_no(profile.system)),
        detail_line("Password", yes_no(profile.password_mode)),
        detail_line("Request", connect.phase().label()),
    ];
    if !profile.pre_connect_msg.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Pre-connect message:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", profile.pre_connect_msg)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        app.status.clone(),
        Style::default().fg(Color::Gray),
    )));

    let details = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(details, area);
}

pub(crate) fn draw_logs(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let log_lines = app
        .log_lines
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .cloned()
        .collect::<Vec<_>>();
    let logs = Paragraph::new(log_lines.join("\n"))
        .block(
            Block::default()
                .title(Line::from(Span::styled(
                    "Logs",
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                )))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });
    frame.render_widget(logs, area);
}
