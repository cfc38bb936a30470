//! Connect/disconnect toggle as an explicit state record.
//!
//! Every transition consumes the current [`ToggleState`] and returns a
//! [`Transition`] holding the next state, the collaborator call to issue
//! next (if any) and an [`Outcome`] worth reporting. Nothing here performs
//! IO; the driver in `app::controller` runs commands and feeds their
//! settled results back through [`ToggleState::on_event`].

use anyhow::Result;

use crate::model::{ConnectMode, ConnectionRequest, DisconnectRequest, Profile, ServerKeys, is_connected};
use crate::request::{assemble_request, server_keys};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum Phase {
    #[default]
    Idle,
    Syncing,
    Prompting,
    ReadingData {
        mode: ConnectMode,
        password: String,
        keys: Option<ServerKeys>,
    },
    Connecting,
    Disconnecting,
}

impl Phase {
    pub(crate) fn label(&self) -> String {
        match self {
            Phase::Idle => "idle".to_string(),
            Phase::Syncing => "syncing".to_string(),
            Phase::Prompting => "waiting for password".to_string(),
            Phase::ReadingData { mode, .. } => format!("reading {} data", mode.as_str()),
            Phase::Connecting => "connecting".to_string(),
            Phase::Disconnecting => "disconnecting".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ToggleState {
    phase: Phase,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Sync,
    ReadData,
    Connect(ConnectionRequest),
    Disconnect(DisconnectRequest),
}

#[derive(Debug)]
pub(crate) enum Event {
    Synced(Result<()>),
    DataRead(Result<Option<String>>),
    ConnectDone(Result<()>),
    DisconnectDone(Result<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Sync,
    ReadData,
    Connect,
    Disconnect,
}

impl Step {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Step::Sync => "sync",
            Step::ReadData => "read data",
            Step::Connect => "connect",
            Step::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    Busy,
    DialogOpen,
    DialogClosed,
    EmptyPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Rejected(Rejection),
    Syncing,
    Disconnecting,
    Prompting,
    Cancelled,
    ConnectSubmitted,
    DisconnectSubmitted,
    DataUnavailable,
    Failed { step: Step, error: String },
}

#[derive(Debug)]
pub(crate) struct Transition {
    pub(crate) state: ToggleState,
    pub(crate) command: Option<Command>,
    pub(crate) outcome: Option<Outcome>,
}

impl Transition {
    fn stay(state: ToggleState) -> Self {
        Self {
            state,
            command: None,
            outcome: None,
        }
    }

    fn reject(state: ToggleState, reason: Rejection) -> Self {
        Self {
            state,
            command: None,
            outcome: Some(Outcome::Rejected(reason)),
        }
    }
}

impl ToggleState {
    pub(crate) fn phase(&self) -> &Phase {
        &self.phase
    }

    pub(crate) fn busy(&self) -> bool {
        matches!(
            self.phase,
            Phase::Syncing | Phase::ReadingData { .. } | Phase::Connecting | Phase::Disconnecting
        )
    }

    pub(crate) fn dialog_open(&self) -> bool {
        self.phase == Phase::Prompting
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub(crate) fn can_confirm(&self) -> bool {
        self.dialog_open() && !self.password.is_empty()
    }

    /// User intent on the connect/disconnect button. Busy is entered before
    /// any command is handed out, so a second toggle is refused until the
    /// sequence settles.
    pub(crate) fn toggle(self, profile: &Profile) -> Transition {
        if self.busy() {
            return Transition::reject(self, Rejection::Busy);
        }
        if self.dialog_open() {
            return Transition::reject(self, Rejection::DialogOpen);
        }
        if is_connected(profile) {
            Transition {
                state: Self {
                    phase: Phase::Disconnecting,
                    ..self
                },
                command: Some(Command::Disconnect(DisconnectRequest::for_profile(profile))),
                outcome: Some(Outcome::Disconnecting),
            }
        } else {
            Transition {
                state: Self {
                    phase: Phase::Syncing,
                    ..self
                },
                command: Some(Command::Sync),
                outcome: Some(Outcome::Syncing),
            }
        }
    }

    /// Settled result of the command issued by the previous transition.
    /// `profile` is the freshest snapshot the driver holds.
    pub(crate) fn on_event(self, event: Event, profile: &Profile) -> Transition {
        match (self.phase.clone(), event) {
            (Phase::Syncing, Event::Synced(Ok(()))) => {
                if profile.needs_prompt() {
                    Transition {
                        state: Self {
                            phase: Phase::Prompting,
                            ..self
                        },
                        command: None,
                        outcome: Some(Outcome::Prompting),
                    }
                } else {
                    self.begin_connect(ConnectMode::Ovpn, String::new(), profile)
                }
            }
            (Phase::Syncing, Event::Synced(Err(err))) => self.settle_failed(Step::Sync, &err),
            (Phase::ReadingData { mode, password, keys }, Event::DataRead(Ok(Some(data))))
                if !data.is_empty() =>
            {
                let request = assemble_request(profile, mode, password, keys, data);
                Transition {
                    state: Self {
                        phase: Phase::Connecting,
                        ..self
                    },
                    command: Some(Command::Connect(request)),
                    outcome: None,
                }
            }
            (Phase::ReadingData { .. }, Event::DataRead(Ok(_))) => Transition {
                state: self.idle(),
                command: None,
                outcome: Some(Outcome::DataUnavailable),
            },
            (Phase::ReadingData { .. }, Event::DataRead(Err(err))) => {
                self.settle_failed(Step::ReadData, &err)
            }
            (Phase::Connecting, Event::ConnectDone(Ok(()))) => Transition {
                state: self.idle(),
                command: None,
                outcome: Some(Outcome::ConnectSubmitted),
            },
            (Phase::Connecting, Event::ConnectDone(Err(err))) => {
                self.settle_failed(Step::Connect, &err)
            }
            (Phase::Disconnecting, Event::DisconnectDone(Ok(()))) => Transition {
                state: self.idle(),
                command: None,
                outcome: Some(Outcome::DisconnectSubmitted),
            },
            (Phase::Disconnecting, Event::DisconnectDone(Err(err))) => {
                self.settle_failed(Step::Disconnect, &err)
            }
            _ => Transition::stay(self),
        }
    }

    pub(crate) fn set_password(self, text: impl Into<String>) -> Self {
        Self {
            password: text.into(),
            ..self
        }
    }

    pub(crate) fn cancel(self) -> Transition {
        if !self.dialog_open() {
            return Transition::reject(self, Rejection::DialogClosed);
        }
        Transition {
            state: Self {
                phase: Phase::Idle,
                ..self
            },
            command: None,
            outcome: Some(Outcome::Cancelled),
        }
    }

    /// The buffer moves into the connect sequence and is left empty, so
    /// later edits cannot reach the request in flight.
    pub(crate) fn confirm(self, profile: &Profile) -> Transition {
        if !self.dialog_open() {
            return Transition::reject(self, Rejection::DialogClosed);
        }
        if self.password.is_empty() {
            return Transition::reject(self, Rejection::EmptyPassword);
        }
        let mut state = self;
        let password = std::mem::take(&mut state.password);
        state.begin_connect(ConnectMode::Ovpn, password, profile)
    }

    /// Forces the sequence back to idle when its pending step can no longer
    /// report, e.g. a worker that died before sending its result.
    pub(crate) fn abort(self, error: &anyhow::Error) -> Transition {
        let step = match &self.phase {
            Phase::Syncing => Step::Sync,
            Phase::ReadingData { .. } => Step::ReadData,
            Phase::Connecting => Step::Connect,
            Phase::Disconnecting => Step::Disconnect,
            Phase::Idle | Phase::Prompting => return Transition::stay(self),
        };
        self.settle_failed(step, error)
    }

    fn begin_connect(self, mode: ConnectMode, password: String, profile: &Profile) -> Transition {
        let keys = server_keys(profile, mode, &password);
        Transition {
            state: Self {
                phase: Phase::ReadingData {
                    mode,
                    password,
                    keys,
                },
                ..self
            },
            command: Some(Command::ReadData),
            outcome: None,
        }
    }

    fn settle_failed(self, step: Step, error: &anyhow::Error) -> Transition {
        Transition {
            state: self.idle(),
            command: None,
            outcome: Some(Outcome::Failed {
                step,
                error: format!("{error:#}"),
            }),
        }
    }

    fn idle(self) -> Self {
        Self {
            phase: Phase::Idle,
            ..self
        }
    }
}
