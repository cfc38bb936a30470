use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::connections::PasswordEdit;
use crate::app::{App, HeaderMode};

impl App {
    /// Returns `true` when the app should exit.
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.dialog_index().is_some() {
            return self.handle_dialog_key(key);
        }
        self.handle_normal_key(key)
    }

    fn cycle_header_mode(&mut self) {
        self.header_mode = match self.header_mode {
            HeaderMode::Help => HeaderMode::Logs,
            HeaderMode::Logs => HeaderMode::Off,
            HeaderMode::Off => HeaderMode::Help,
        };
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('c') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('r') => {
                if self.reload_profiles() == 0 {
                    let count = self.profiles.len();
                    self.set_status(format!("Loaded {count} profile(s)"));
                }
            }
            KeyCode::Char('v') => self.cycle_header_mode(),
            KeyCode::Tab | KeyCode::Down => {
                if self.selected + 1 < self.profiles.len() {
                    self.selected += 1;
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => self.cancel_dialog(),
            KeyCode::Enter => self.confirm_dialog(),
            KeyCode::Backspace => self.edit_dialog_password(PasswordEdit::Backspace),
            KeyCode::Char(ch) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(false);
                }
                self.edit_dialog_password(PasswordEdit::Insert(ch));
            }
            _ => {}
        }
        Ok(false)
    }
}
