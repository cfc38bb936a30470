use std::sync::Arc;
use std::sync::mpsc;

use anyhow::Result;

use crate::model::{Profile, is_connected};
use crate::profile::ProfileSource;
use crate::service::ConnectionService;
use crate::toggle::{Command, Event, Outcome, Phase, ToggleState, Transition};

enum StepResult {
    Synced(Result<Profile>),
    DataRead(Result<Option<String>>),
    ConnectDone(Result<()>),
    DisconnectDone(Result<()>),
}

/// Drives one profile's toggle sequence. Each command runs on its own worker
/// thread; its result comes back through `poll`, so only one step of a
/// sequence is ever outstanding.
pub(crate) struct ProfileConnect {
    pub(crate) profile: Profile,
    state: ToggleState,
    source: Arc<dyn ProfileSource>,
    service: Arc<dyn ConnectionService>,
    pending: Option<mpsc::Receiver<StepResult>>,
}

impl ProfileConnect {
    pub(crate) fn new(
        profile: Profile,
        source: Arc<dyn ProfileSource>,
        service: Arc<dyn ConnectionService>,
    ) -> Self {
        Self {
            profile,
            state: ToggleState::default(),
            source,
            service,
            pending: None,
        }
    }

    pub(crate) fn busy(&self) -> bool {
        self.state.busy()
    }

    pub(crate) fn phase(&self) -> &Phase {
        self.state.phase()
    }

    pub(crate) fn dialog_open(&self) -> bool {
        self.state.dialog_open()
    }

    pub(crate) fn password(&self) -> &str {
        self.state.password()
    }

    pub(crate) fn can_confirm(&self) -> bool {
        self.state.can_confirm()
    }

    pub(crate) fn connected(&self) -> bool {
        is_connected(&self.profile)
    }

    pub(crate) fn toggle_connection(&mut self) -> Option<Outcome> {
        let profile = self.profile.clone();
        self.advance(|state| state.toggle(&profile))
    }

    pub(crate) fn confirm(&mut self) -> Option<Outcome> {
        let profile = self.profile.clone();
        self.advance(|state| state.confirm(&profile))
    }

    pub(crate) fn cancel(&mut self) -> Option<Outcome> {
        self.advance(ToggleState::cancel)
    }

    pub(crate) fn set_password(&mut self, text: impl Into<String>) {
        let state = std::mem::take(&mut self.state);
        self.state = state.set_password(text);
    }

    pub(crate) fn push_password_char(&mut self, ch: char) {
        let mut text = self.state.password().to_string();
        text.push(ch);
        self.set_password(text);
    }

    pub(crate) fn pop_password_char(&mut self) {
        let mut text = self.state.password().to_string();
        text.pop();
        self.set_password(text);
    }

    /// Replaces the profile snapshot with a fresh listing, unless a sequence
    /// is running against the current one.
    pub(crate) fn refresh(&mut self, profile: Profile) {
        if !self.busy() && !self.dialog_open() {
            self.profile = profile;
        }
    }

    /// Applies the pending step's result if it has settled.
    pub(crate) fn poll(&mut self) -> Option<Outcome> {
        let rx = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.pending = None;
                self.apply(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.pending = None;
                let err = anyhow::anyhow!("worker exited before reporting");
                self.advance(|state| state.abort(&err))
            }
        }
    }

    fn apply(&mut self, result: StepResult) -> Option<Outcome> {
        let event = match result {
            StepResult::Synced(Ok(profile)) => {
                self.profile = profile;
                Event::Synced(Ok(()))
            }
            StepResult::Synced(Err(err)) => Event::Synced(Err(err)),
            StepResult::DataRead(result) => Event::DataRead(result),
            StepResult::ConnectDone(result) => Event::ConnectDone(result),
            StepResult::DisconnectDone(result) => Event::DisconnectDone(result),
        };
        let profile = self.profile.clone();
        self.advance(|state| state.on_event(event, &profile))
    }

    fn advance(&mut self, step: impl FnOnce(ToggleState) -> Transition) -> Option<Outcome> {
        let state = std::mem::take(&mut self.state);
        let Transition {
            state,
            command,
            outcome,
        } = step(state);
        self.state = state;
        if let Some(command) = command {
            self.dispatch(command);
        }
        outcome
    }

    fn dispatch(&mut self, command: Command) {
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let service = Arc::clone(&self.service);
        let profile = self.profile.clone();
        std::thread::spawn(move || {
            let result = match command {
                Command::Sync => StepResult::Synced(source.sync(&profile)),
                Command::ReadData => StepResult::DataRead(source.read_data(&profile)),
                Command::Connect(request) => StepResult::ConnectDone(service.connect(&request)),
                Command::Disconnect(request) => {
                    StepResult::DisconnectDone(service.disconnect(&request))
                }
            };
            let _ = tx.send(result);
        });
        self.pending = Some(rx);
    }

    /// Blocks until the running sequence stops at idle or at the dialog.
    #[cfg(test)]
    pub(crate) fn settle(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(rx) = self.pending.take() {
            let outcome = match rx.recv_timeout(std::time::Duration::from_secs(5)) {
                Ok(result) => self.apply(result),
                Err(err) => {
                    let err = anyhow::anyhow!("step did not settle: {err}");
                    self.advance(|state| state.abort(&err))
                }
            };
            outcomes.extend(outcome);
        }
        outcomes
    }

    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnectMode;
    use crate::profile::MockProfileSource;
    use crate::service::MockConnectionService;
    use crate::toggle::{Rejection, Step};

    fn profile() -> Profile {
        Profile {
            id: "p1".to_string(),
            name: "Office".to_string(),
            server_public_key: vec!["pub".to_string()],
            server_box_public_key: "box".to_string(),
            ..Profile::default()
        }
    }

    fn controller(
        profile: Profile,
        source: MockProfileSource,
    ) -> (ProfileConnect, Arc<MockProfileSource>, Arc<MockConnectionService>) {
        let source = Arc::new(source);
        let service = Arc::new(MockConnectionService::default());
        let connect = ProfileConnect::new(profile, source.clone(), service.clone());
        (connect, source, service)
    }

    fn wait_for(connect: &mut ProfileConnect) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while connect.has_pending() && std::time::Instant::now() < deadline {
            outcomes.extend(connect.poll());
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        outcomes
    }

    #[test]
    fn plain_profile_syncs_then_connects_without_dialog() {
        let (mut connect, source, service) =
            controller(profile(), MockProfileSource::with_data("client"));
        assert_eq!(connect.toggle_connection(), Some(Outcome::Syncing));
        assert!(connect.busy());
        let outcomes = connect.settle();

        assert_eq!(source.calls(), vec!["sync", "read_data"]);
        let connects = service.connects();
        assert_eq!(connects.len(), 1);
        assert_eq!(connects[0].mode, ConnectMode::Ovpn);
        assert_eq!(connects[0].password, "");
        assert!(connects[0].server_public_key.is_none());
        assert!(!connect.dialog_open());
        assert!(!connect.busy());
        assert_eq!(outcomes, vec![Outcome::ConnectSubmitted]);
    }

    #[test]
    fn password_profile_prompts_then_connects_with_typed_password() {
        let mut password_profile = profile();
        password_profile.password_mode = true;
        let (mut connect, _source, service) =
            controller(password_profile, MockProfileSource::with_data("client"));
        connect.toggle_connection();
        assert_eq!(connect.settle(), vec![Outcome::Prompting]);
        assert!(connect.dialog_open());
        assert!(!connect.busy());
        assert!(service.connects().is_empty());

        for ch in "hunter2".chars() {
            connect.push_password_char(ch);
        }
        assert!(connect.can_confirm());
        assert_eq!(connect.confirm(), None);
        assert!(!connect.dialog_open());
        assert_eq!(connect.password(), "");
        connect.settle();

        let connects = service.connects();
        assert_eq!(connects.len(), 1);
        assert_eq!(connects[0].password, "hunter2");
        assert_eq!(connects[0].server_public_key.as_deref(), Some("pub"));
        assert!(!connect.busy());
    }

    #[test]
    fn synced_profile_replaces_snapshot_before_deciding() {
        let mut updated = profile();
        updated.pre_connect_msg = "Read the policy".to_string();
        let source = MockProfileSource::with_data("client");
        source.set_synced(updated);
        let (mut connect, _source, service) = controller(profile(), source);
        connect.toggle_connection();
        connect.settle();
        assert!(connect.dialog_open());
        assert_eq!(connect.profile.pre_connect_msg, "Read the policy");
        assert!(service.connects().is_empty());
    }

    #[test]
    fn cancel_never_reaches_service() {
        let mut password_profile = profile();
        password_profile.password_mode = true;
        let (mut connect, _source, service) =
            controller(password_profile, MockProfileSource::with_data("client"));
        connect.toggle_connection();
        connect.settle();
        connect.set_password("abc");
        assert_eq!(connect.cancel(), Some(Outcome::Cancelled));
        assert!(!connect.has_pending());
        assert!(!connect.dialog_open());
        assert_eq!(connect.password(), "abc");
        assert!(service.connects().is_empty());
        assert!(service.disconnects().is_empty());
    }

    #[test]
    fn connected_profile_disconnects_by_id() {
        let mut connected = profile();
        connected.status = "connected".to_string();
        let (mut connect, source, service) =
            controller(connected, MockProfileSource::with_data("client"));
        assert!(connect.connected());
        assert_eq!(connect.toggle_connection(), Some(Outcome::Disconnecting));
        assert_eq!(connect.settle(), vec![Outcome::DisconnectSubmitted]);
        assert!(source.calls().is_empty());
        assert_eq!(service.disconnects().len(), 1);
        assert_eq!(service.disconnects()[0].id, "p1");
        assert!(service.connects().is_empty());
    }

    #[test]
    fn disconnect_in_flight_keeps_busy_until_service_settles() {
        let mut connected = profile();
        connected.status = "connected".to_string();
        let (mut connect, _source, service) =
            controller(connected, MockProfileSource::with_data("client"));
        let release = service.gate();
        connect.toggle_connection();
        assert_eq!(connect.poll(), None);
        assert!(connect.busy());
        assert_eq!(
            connect.toggle_connection(),
            Some(Outcome::Rejected(Rejection::Busy))
        );
        release.send(()).unwrap();
        assert_eq!(connect.settle(), vec![Outcome::DisconnectSubmitted]);
        assert!(!connect.busy());
        assert_eq!(service.disconnects().len(), 1);
    }

    #[test]
    fn empty_data_sends_nothing() {
        let (mut connect, _source, service) =
            controller(profile(), MockProfileSource::with_data(""));
        connect.toggle_connection();
        assert_eq!(connect.settle(), vec![Outcome::DataUnavailable]);
        assert!(service.connects().is_empty());
        assert!(!connect.busy());
    }

    #[test]
    fn every_failure_clears_busy() {
        let failing_sync = MockProfileSource::with_data("client");
        failing_sync.fail_sync("authority unreachable");
        let (mut connect, _source, _service) = controller(profile(), failing_sync);
        connect.toggle_connection();
        let outcomes = connect.settle();
        assert!(matches!(
            outcomes.as_slice(),
            [Outcome::Failed {
                step: Step::Sync,
                ..
            }]
        ));
        assert!(!connect.busy());

        let failing_read = MockProfileSource::with_data("client");
        failing_read.fail_read("permission denied");
        let (mut connect, _source, service) = controller(profile(), failing_read);
        connect.toggle_connection();
        connect.settle();
        assert!(!connect.busy());
        assert!(service.connects().is_empty());

        let (mut connect, _source, service) =
            controller(profile(), MockProfileSource::with_data("client"));
        service.fail_with("daemon not running");
        connect.toggle_connection();
        let outcomes = connect.settle();
        assert!(matches!(
            outcomes.as_slice(),
            [Outcome::Failed {
                step: Step::Connect,
                ..
            }]
        ));
        assert!(!connect.busy());

        let mut connected = profile();
        connected.status = "connecting".to_string();
        let (mut connect, _source, service) =
            controller(connected, MockProfileSource::with_data("client"));
        service.fail_with("daemon not running");
        connect.toggle_connection();
        connect.settle();
        assert!(!connect.busy());
    }

    #[test]
    fn second_toggle_is_refused_until_step_settles() {
        let source = MockProfileSource::with_data("client");
        let release = source.gate();
        let (mut connect, source, service) = controller(profile(), source);
        connect.toggle_connection();
        assert_eq!(
            connect.toggle_connection(),
            Some(Outcome::Rejected(Rejection::Busy))
        );
        assert_eq!(connect.poll(), None);
        assert!(connect.busy());

        release.send(()).unwrap();
        let outcomes = wait_for(&mut connect);
        assert_eq!(outcomes, vec![Outcome::ConnectSubmitted]);
        assert_eq!(source.calls(), vec!["sync", "read_data"]);
        assert_eq!(service.connects().len(), 1);
        assert!(!connect.busy());
    }

    #[test]
    fn refresh_is_ignored_while_busy() {
        let source = MockProfileSource::with_data("client");
        let release = source.gate();
        let (mut connect, _source, _service) = controller(profile(), source);
        connect.toggle_connection();
        let mut changed = profile();
        changed.name = "Renamed".to_string();
        connect.refresh(changed.clone());
        assert_eq!(connect.profile.name, "Office");
        drop(release);
        connect.settle();
        connect.refresh(changed);
        assert_eq!(connect.profile.name, "Renamed");
    }
}
