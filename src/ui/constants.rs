use ratatui::layout::Constraint;

pub(crate) const APP_TITLE: &str = "PROFILE CONNECT 0.1.0";
pub(crate) const HELP_TEXT: &str = "(c)onnect/disconnect | (r)eload | (v)iew | (q)uit";

pub(crate) const LABEL_WIDTH: usize = 9;

pub(crate) const HEADER_HEIGHT: u16 = 3;

pub(crate) const HELP_COLUMN_PERCENTAGES: [u16; 3] = [33, 33, 34];
pub(crate) const COMPACT_COLUMN_PERCENTAGES: [u16; 2] = [50, 50];

pub(crate) const DIALOG_WIDTH: u16 = 48;
pub(crate) const MODAL_MIN_WIDTH: u16 = 30;

pub(crate) const POPUP_MIN_WIDTH: u16 = 10;
pub(crate) const POPUP_MIN_HEIGHT: u16 = 5;

pub(crate) fn help_columns() -> [Constraint; 3] {
    HELP_COLUMN_PERCENTAGES.map(Constraint::Percentage)
}

pub(crate) fn compact_columns() -> [Constraint; 2] {
    COMPACT_COLUMN_PERCENTAGES.map(Constraint::Percentage)
}
