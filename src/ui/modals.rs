use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::app::ProfileConnect;
use crate::ui::constants::{DIALOG_WIDTH, LABEL_WIDTH, MODAL_MIN_WIDTH};
use crate::ui::helpers::{centered_rect_abs, draw_popup_frame, field_line, modal_height, truncate_text};

/// Password prompt shown while a profile's sequence waits for input.
pub(crate) fn draw_password_dialog(frame: &mut Frame<'_>, connect: &ProfileConnect) {
    let area_width = DIALOG_WIDTH
        .min(frame.area().width.saturating_sub(2))
        .max(MODAL_MIN_WIDTH);
    let pad = 1u16;
    let content_width = area_width.saturating_sub(2 + pad * 2);
    let value_width = content_width.saturating_sub(2 + LABEL_WIDTH as u16 + 2) as usize;
    let profile = &connect.profile;

    let mut lines = vec![Line::from(vec![
        Span::raw("Connecting to "),
        Span::styled(
            truncate_text(&profile.formatted_name(), content_width.saturating_sub(14) as usize),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ])];
    if !profile.pre_connect_msg.is_empty() {
        lines.push(Line::from(""));
        for text in profile.pre_connect_msg.lines() {
            lines.push(Line::from(Span::styled(
                text.to_string(),
                Style::default().fg(Color::Yellow),
            )));
        }
    }
    lines.push(Line::from(""));
    let password_row = lines.len();
    lines.push(field_line(
        "Password",
        connect.password(),
        true,
        true,
        LABEL_WIDTH,
        value_width,
    ));

    let mut footer_lines = vec![Line::from(vec![
        Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to connect, "),
        Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to cancel"),
    ])];
    if !connect.can_confirm() {
        footer_lines.push(Line::from(Span::styled(
            "Type a password to enable connect",
            Style::default().fg(Color::Gray),
        )));
    }

    let height = modal_height(lines.len(), footer_lines.len() + 1);
    let area = centered_rect_abs(area_width, height, frame.area());
    let style = Style::default().fg(Color::Cyan);
    let content = draw_popup_frame(frame, area, "Profile Connect", style);
    let footer_height = footer_lines.len() as u16;
    let body = Rect {
        height: content.height.saturating_sub(footer_height + 1),
        ..content
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), body);
    let footer = Rect {
        y: content.y + content.height.saturating_sub(footer_height),
        height: footer_height,
        ..content
    };
    frame.render_widget(Paragraph::new(footer_lines), footer);

    // Cursor sits after the masked value.
    let typed = connect.password().chars().count().min(value_width) as u16;
    let cursor_x = body.x + 2 + LABEL_WIDTH as u16 + 2 + typed;
    let cursor_y = body.y + password_row as u16;
    if cursor_y < body.y + body.height && cursor_x < body.x + body.width {
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}
