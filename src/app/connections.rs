use std::time::Instant;

use crate::app::constants::{BUSY_MESSAGE, EMPTY_PASSWORD_MESSAGE, NO_PROFILE_MESSAGE};
use crate::app::{App, ProfileConnect};
use crate::profile::ProfileListing;
use crate::toggle::{Outcome, Phase, Rejection};

impl App {
    pub(crate) fn toggle_selected(&mut self) {
        let Some(connect) = self.profiles.get(self.selected) else {
            self.set_status(NO_PROFILE_MESSAGE);
            return;
        };
        // A connect may end in the password dialog, and only one can be shown.
        if !connect.connected() && !connect.busy() {
            if let Some(other) = self.profiles.iter().enumerate().find_map(|(index, other)| {
                (index != self.selected && *other.phase() == Phase::Syncing)
                    .then(|| other.profile.formatted_name())
            }) {
                self.set_status(format!("Wait for {other} to finish syncing"));
                return;
            }
        }
        let connect = &mut self.profiles[self.selected];
        let name = connect.profile.formatted_name();
        if let Some(outcome) = connect.toggle_connection() {
            self.report(&name, outcome);
        }
    }

    pub(crate) fn confirm_dialog(&mut self) {
        let Some(index) = self.dialog_index() else {
            return;
        };
        let connect = &mut self.profiles[index];
        let name = connect.profile.formatted_name();
        match connect.confirm() {
            Some(outcome) => self.report(&name, outcome),
            None => self.set_status(format!("Connecting {name}")),
        }
    }

    pub(crate) fn cancel_dialog(&mut self) {
        let Some(index) = self.dialog_index() else {
            return;
        };
        let connect = &mut self.profiles[index];
        let name = connect.profile.formatted_name();
        if let Some(outcome) = connect.cancel() {
            self.report(&name, outcome);
        }
    }

    pub(crate) fn edit_dialog_password(&mut self, edit: PasswordEdit) {
        let Some(index) = self.dialog_index() else {
            return;
        };
        let connect = &mut self.profiles[index];
        match edit {
            PasswordEdit::Insert(ch) => connect.push_password_char(ch),
            PasswordEdit::Backspace => connect.pop_password_char(),
        }
    }

    /// Collects settled steps from every running sequence.
    pub(crate) fn poll_profiles(&mut self) {
        let mut settled = Vec::new();
        for connect in &mut self.profiles {
            if let Some(outcome) = connect.poll() {
                settled.push((connect.profile.formatted_name(), outcome));
            }
        }
        for (name, outcome) in settled {
            self.report(&name, outcome);
        }
    }

    /// Returns how many profile files were skipped as unreadable.
    pub(crate) fn reload_profiles(&mut self) -> usize {
        let listing = match self.source.list() {
            Ok(listing) => listing,
            Err(err) => {
                self.set_status(format!("Failed to load profiles: {err:#}"));
                return 0;
            }
        };
        let ProfileListing {
            profiles: listed,
            skipped,
        } = listing;
        for path in &skipped {
            self.set_status(format!("Skipped unreadable profile {}", path.display()));
        }
        let selected_id = self
            .selected_profile()
            .map(|connect| connect.profile.id.clone());
        let mut previous = std::mem::take(&mut self.profiles);
        let mut profiles = Vec::with_capacity(listed.len());
        for profile in listed {
            if let Some(index) = previous
                .iter()
                .position(|connect| connect.profile.id == profile.id)
            {
                let mut connect = previous.swap_remove(index);
                connect.refresh(profile);
                profiles.push(connect);
            } else {
                profiles.push(ProfileConnect::new(
                    profile,
                    self.source.clone(),
                    self.service.clone(),
                ));
            }
        }
        // A profile removed from disk mid-sequence stays until it settles.
        profiles.extend(
            previous
                .into_iter()
                .filter(|connect| connect.busy() || connect.dialog_open()),
        );
        self.profiles = profiles;
        self.selected = selected_id
            .and_then(|id| self.profiles.iter().position(|c| c.profile.id == id))
            .unwrap_or(0)
            .min(self.profiles.len().saturating_sub(1));
        self.last_refresh = Instant::now();
        skipped.len()
    }

    /// Periodic status refresh so idle profiles follow the daemon.
    pub(crate) fn refresh_statuses(&mut self) {
        if self.last_refresh.elapsed() < self.status_refresh {
            return;
        }
        self.last_refresh = Instant::now();
        let Ok(listing) = self.source.list() else {
            return;
        };
        for profile in listing.profiles {
            if let Some(connect) = self
                .profiles
                .iter_mut()
                .find(|connect| connect.profile.id == profile.id)
            {
                connect.refresh(profile);
            }
        }
    }

    fn report(&mut self, name: &str, outcome: Outcome) {
        let message = match outcome {
            Outcome::Rejected(Rejection::Busy) => BUSY_MESSAGE.to_string(),
            Outcome::Rejected(Rejection::DialogOpen) => {
                format!("Finish the open dialog for {name} first")
            }
            Outcome::Rejected(Rejection::DialogClosed) => return,
            Outcome::Rejected(Rejection::EmptyPassword) => EMPTY_PASSWORD_MESSAGE.to_string(),
            Outcome::Syncing => format!("Syncing {name}"),
            Outcome::Disconnecting => format!("Disconnecting {name}"),
            Outcome::Prompting => format!("Password required for {name}"),
            Outcome::Cancelled => format!("Connect to {name} cancelled"),
            Outcome::ConnectSubmitted => format!("Connect request sent for {name}"),
            Outcome::DisconnectSubmitted => format!("Disconnect request sent for {name}"),
            Outcome::DataUnavailable => format!("No connection data for {name}"),
            Outcome::Failed { step, error } => {
                format!("{name}: {} failed: {error}", step.label())
            }
        };
        self.set_status(message);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PasswordEdit {
    Insert(char),
    Backspace,
}
