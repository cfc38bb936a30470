use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::app::{App, HeaderMode};
use crate::ui::constants::{HEADER_HEIGHT, compact_columns, help_columns};
use crate::ui::modals::draw_password_dialog;
use crate::ui::panels::{
    draw_app_header, draw_details, draw_help_header, draw_logs, draw_profile_list,
};

pub(crate) mod constants;
mod helpers;
mod modals;
mod panels;

pub(crate) fn draw_ui(frame: &mut Frame<'_>, app: &App) {
    draw_main_ui(frame, app, frame.area());
    if let Some(connect) = app.dialog_profile() {
        draw_password_dialog(frame, connect);
    }
}

fn draw_main_ui(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let body = match app.header_mode {
        HeaderMode::Help => Layout::default()
            .direction(Direction::Horizontal)
            .constraints(help_columns().as_ref())
            .split(area),
        HeaderMode::Logs | HeaderMode::Off => Layout::default()
            .direction(Direction::Horizontal)
            .constraints(compact_columns().as_ref())
            .split(area),
    };

    if app.header_mode == HeaderMode::Off {
        draw_profile_list(frame, app, body[0]);
        draw_details(frame, app, body[1]);
        return;
    }

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(HEADER_HEIGHT), Constraint::Min(1)].as_ref())
        .split(body[0]);
    draw_app_header(frame, left[0]);
    draw_profile_list(frame, app, left[1]);

    if app.header_mode == HeaderMode::Help {
        let help_header = Rect {
            x: body[1].x,
            y: body[1].y,
            width: body[1].width.saturating_add(body[2].width),
            height: HEADER_HEIGHT,
        };
        draw_help_header(frame, help_header);
        let details = Rect {
            y: body[1].y + HEADER_HEIGHT,
            height: body[1].height.saturating_sub(HEADER_HEIGHT),
            ..body[1]
        };
        let logs = Rect {
            y: body[2].y + HEADER_HEIGHT,
            height: body[2].height.saturating_sub(HEADER_HEIGHT),
            ..body[2]
        };
        draw_details(frame, app, details);
        draw_logs(frame, app, logs);
    } else {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
            .split(body[1]);
        draw_details(frame, app, right[0]);
        draw_logs(frame, app, right[1]);
    }
}
