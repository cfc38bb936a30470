use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::app::constants::STATUS_READY;
use crate::app::logging::prune_log_file;
use crate::profile::{FileProfileSource, ProfileSource};
use crate::service::{ConnectionService, SpoolService, StatusBoard};
use crate::storage::{
    app_dir, config_path, load_or_create_key, load_or_init_settings, log_path, profiles_dir,
    spool_dir,
};

pub(crate) use controller::ProfileConnect;

mod connections;
mod constants;
mod controller;
mod handlers;
mod logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderMode {
    Help,
    Logs,
    Off,
}

pub(crate) struct App {
    pub(crate) log_path: Option<PathBuf>,
    pub(crate) log_lines: VecDeque<String>,
    pub(crate) source: Arc<dyn ProfileSource>,
    pub(crate) service: Arc<dyn ConnectionService>,
    pub(crate) profiles: Vec<ProfileConnect>,
    pub(crate) selected: usize,
    pub(crate) status: String,
    pub(crate) header_mode: HeaderMode,
    pub(crate) status_refresh: Duration,
    pub(crate) last_refresh: Instant,
}

impl App {
    pub(crate) fn load() -> Result<Self> {
        let config_path = config_path()?;
        let settings = load_or_init_settings(&config_path)?;
        let base = app_dir()?;
        let spool = spool_dir(&settings, &base);
        let key = load_or_create_key(&spool).context("load spool key")?;
        let status = StatusBoard::new(spool.join("status.json"));
        let source = FileProfileSource::new(profiles_dir(&settings, &base), status.clone());
        let service = SpoolService::new(&spool, key, status);
        let log_path = log_path()?;
        prune_log_file(&log_path);

        let mut app = Self::with_collaborators(Arc::new(source), Arc::new(service));
        app.log_path = Some(log_path);
        app.status_refresh = Duration::from_secs(settings.status_refresh_secs.max(1));
        app.set_status(STATUS_READY);
        app.reload_profiles();
        Ok(app)
    }

    pub(crate) fn with_collaborators(
        source: Arc<dyn ProfileSource>,
        service: Arc<dyn ConnectionService>,
    ) -> Self {
        Self {
            log_path: None,
            log_lines: VecDeque::new(),
            source,
            service,
            profiles: vec![],
            selected: 0,
            status: STATUS_READY.to_string(),
            header_mode: HeaderMode::Help,
            status_refresh: Duration::from_secs(2),
            last_refresh: Instant::now(),
        }
    }

    pub(crate) fn selected_profile(&self) -> Option<&ProfileConnect> {
        self.profiles.get(self.selected)
    }

    /// Index of the profile whose password dialog is showing. A connect is
    /// refused while another profile is still syncing, so at most one
    /// dialog is open at a time.
    pub(crate) fn dialog_index(&self) -> Option<usize> {
        self.profiles.iter().position(ProfileConnect::dialog_open)
    }

    pub(crate) fn dialog_profile(&self) -> Option<&ProfileConnect> {
        self.dialog_index().and_then(|index| self.profiles.get(index))
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::with_collaborators(
            Arc::new(crate::profile::MockProfileSource::default()),
            Arc::new(crate::service::MockConnectionService::default()),
        )
    }
}
