use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::Profile;
use crate::service::StatusBoard;

const PROFILE_CONF_EXT: &str = "conf";
const PROFILE_DATA_EXT: &str = "ovpn";

/// Profiles that loaded, plus the files that could not be read or parsed.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProfileListing {
    pub(crate) profiles: Vec<Profile>,
    pub(crate) skipped: Vec<PathBuf>,
}

pub(crate) trait ProfileSource: Send + Sync {
    fn list(&self) -> Result<ProfileListing>;
    /// Refreshes the profile from its authority and returns the new snapshot.
    fn sync(&self, profile: &Profile) -> Result<Profile>;
    /// Connection payload, or `None` when there is nothing to connect with.
    fn read_data(&self, profile: &Profile) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub(crate) struct FileProfileSource {
    dir: PathBuf,
    status: StatusBoard,
}

impl FileProfileSource {
    pub(crate) fn new(dir: PathBuf, status: StatusBoard) -> Self {
        Self { dir, status }
    }

    fn conf_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{PROFILE_CONF_EXT}"))
    }

    fn data_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{PROFILE_DATA_EXT}"))
    }

    fn load(&self, path: &Path) -> Result<Profile> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read profile {}", path.display()))?;
        let mut profile: Profile = serde_json::from_str(&content)
            .with_context(|| format!("parse profile {}", path.display()))?;
        if profile.id.is_empty() {
            if let Some(stem) = path.file_stem() {
                profile.id = stem.to_string_lossy().into_owned();
            }
        }
        Ok(profile)
    }

    fn apply_status(&self, profile: &mut Profile) -> Result<()> {
        let entries = self.status.load()?;
        if let Some(entry) = entries.get(&profile.id) {
            profile.status = entry.status.clone();
            profile.state = entry.state;
        } else {
            profile.status.clear();
            profile.state = false;
        }
        Ok(())
    }
}

impl ProfileSource for FileProfileSource {
    fn list(&self) -> Result<ProfileListing> {
        let mut listing = ProfileListing::default();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(listing),
            Err(err) => return Err(err).context("read profiles dir"),
        };
        let statuses = self.status.load()?;
        for entry in entries {
            let entry = entry.context("read profiles dir entry")?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PROFILE_CONF_EXT) {
                continue;
            }
            let Ok(mut profile) = self.load(&path) else {
                listing.skipped.push(path);
                continue;
            };
            if let Some(live) = statuses.get(&profile.id) {
                profile.status = live.status.clone();
                profile.state = live.state;
            }
            listing.profiles.push(profile);
        }
        listing.profiles.sort_by(|a, b| {
            a.formatted_name()
                .to_lowercase()
                .cmp(&b.formatted_name().to_lowercase())
        });
        listing.skipped.sort();
        Ok(listing)
    }

    fn sync(&self, profile: &Profile) -> Result<Profile> {
        let mut fresh = self.load(&self.conf_path(&profile.id))?;
        self.apply_status(&mut fresh)?;
        Ok(fresh)
    }

    fn read_data(&self, profile: &Profile) -> Result<Option<String>> {
        let path = self.data_path(&profile.id);
        match fs::read_to_string(&path) {
            Ok(data) if data.trim().is_empty() => Ok(None),
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read profile data {}", path.display())),
        }
    }
}

#[cfg(test)]
pub(crate) use mock::MockProfileSource;

#[cfg(test)]
mod mock {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::mpsc;

    use anyhow::Result;

    use super::{ProfileListing, ProfileSource};
    use crate::model::Profile;

    /// Scripted profile source. Each call is recorded; a gate, when set,
    /// holds the call until the test releases it.
    #[derive(Default)]
    pub(crate) struct MockProfileSource {
        pub(crate) profiles: Mutex<Vec<Profile>>,
        pub(crate) synced: Mutex<Option<Profile>>,
        pub(crate) sync_error: Mutex<Option<String>>,
        pub(crate) data: Mutex<Option<String>>,
        pub(crate) data_error: Mutex<Option<String>>,
        pub(crate) calls: Mutex<Vec<&'static str>>,
        pub(crate) gate: Mutex<Option<mpsc::Receiver<()>>>,
        pub(crate) skipped: Mutex<Vec<PathBuf>>,
    }

    impl MockProfileSource {
        pub(crate) fn with_data(data: &str) -> Self {
            let source = Self::default();
            *source.data.lock().unwrap() = Some(data.to_string());
            source
        }

        pub(crate) fn set_synced(&self, profile: Profile) {
            *self.synced.lock().unwrap() = Some(profile);
        }

        pub(crate) fn fail_sync(&self, message: &str) {
            *self.sync_error.lock().unwrap() = Some(message.to_string());
        }

        pub(crate) fn fail_read(&self, message: &str) {
            *self.data_error.lock().unwrap() = Some(message.to_string());
        }

        pub(crate) fn gate(&self) -> mpsc::Sender<()> {
            let (tx, rx) = mpsc::channel();
            *self.gate.lock().unwrap() = Some(rx);
            tx
        }

        pub(crate) fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn enter(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
        }
    }

    impl ProfileSource for MockProfileSource {
        fn list(&self) -> Result<ProfileListing> {
            Ok(ProfileListing {
                profiles: self.profiles.lock().unwrap().clone(),
                skipped: self.skipped.lock().unwrap().clone(),
            })
        }

        fn sync(&self, profile: &Profile) -> Result<Profile> {
            self.enter("sync");
            if let Some(err) = self.sync_error.lock().unwrap().as_ref() {
                anyhow::bail!(err.clone());
            }
            Ok(self
                .synced
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| profile.clone()))
        }

        fn read_data(&self, _profile: &Profile) -> Result<Option<String>> {
            self.enter("read_data");
            if let Some(err) = self.data_error.lock().unwrap().as_ref() {
                anyhow::bail!(err.clone());
            }
            Ok(self.data.lock().unwrap().clone())
        }
    }
}
