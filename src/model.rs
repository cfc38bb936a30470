use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub(crate) const STATUS_DISCONNECTED: &str = "disconnected";
pub(crate) const STATUS_CONNECTING: &str = "connecting";
pub(crate) const STATUS_DISCONNECTING: &str = "disconnecting";

pub(crate) const CONNECT_USERNAME: &str = "pritunl";
pub(crate) const UNKNOWN_PROFILE_NAME: &str = "Unknown Profile";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct Profile {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) organization_id: String,
    pub(crate) organization: String,
    pub(crate) user_id: String,
    pub(crate) user: String,
    pub(crate) server_id: String,
    pub(crate) server: String,
    pub(crate) sync_hosts: Vec<String>,
    pub(crate) sync_token: String,
    pub(crate) sync_secret: String,
    pub(crate) dynamic_firewall: bool,
    pub(crate) token_ttl: u64,
    pub(crate) server_public_key: Vec<String>,
    pub(crate) server_box_public_key: String,
    pub(crate) token: bool,
    pub(crate) system: bool,
    pub(crate) password_mode: bool,
    pub(crate) pre_connect_msg: String,
    #[serde(skip)]
    pub(crate) state: bool,
    #[serde(skip)]
    pub(crate) status: String,
}

impl Profile {
    pub(crate) fn formatted_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        if !self.user.is_empty() {
            let mut name = self
                .user
                .split_once('@')
                .map(|(local, _)| local.to_string())
                .unwrap_or_else(|| self.user.clone());
            if !self.organization.is_empty() {
                name.push('@');
                name.push_str(&self.organization);
            }
            if !self.server.is_empty() {
                name.push_str(&format!(" ({})", self.server));
            }
            return name;
        }
        if !self.server.is_empty() {
            return self.server.clone();
        }
        UNKNOWN_PROFILE_NAME.to_string()
    }

    pub(crate) fn needs_prompt(&self) -> bool {
        self.password_mode || !self.pre_connect_msg.is_empty()
    }

    pub(crate) fn status_label(&self) -> &str {
        if self.system {
            if self.state { "active" } else { "inactive" }
        } else if self.status.is_empty() {
            STATUS_DISCONNECTED
        } else {
            &self.status
        }
    }
}

/// Whether the profile currently holds a connection. System profiles report
/// through `state`, user profiles through the `status` word.
pub(crate) fn is_connected(profile: &Profile) -> bool {
    if profile.system {
        profile.state
    } else {
        !profile.status.is_empty() && profile.status != STATUS_DISCONNECTED
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConnectMode {
    #[default]
    Ovpn,
    Wg,
}

impl ConnectMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ConnectMode::Ovpn => "ovpn",
            ConnectMode::Wg => "wg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerKeys {
    pub(crate) public_key: String,
    pub(crate) box_public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct ConnectionRequest {
    pub(crate) id: String,
    pub(crate) mode: ConnectMode,
    pub(crate) org_id: String,
    pub(crate) user_id: String,
    pub(crate) server_id: String,
    pub(crate) sync_hosts: Vec<String>,
    pub(crate) sync_token: String,
    pub(crate) sync_secret: String,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) dynamic_firewall: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) server_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) server_box_public_key: Option<String>,
    pub(crate) token_ttl: u64,
    pub(crate) timeout: bool,
    pub(crate) data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct DisconnectRequest {
    pub(crate) id: String,
}

impl DisconnectRequest {
    pub(crate) fn for_profile(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct EncryptedBlob {
    pub(crate) nonce: String,
    pub(crate) ciphertext: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Settings {
    #[serde(default)]
    pub(crate) profiles_dir: Option<String>,
    #[serde(default)]
    pub(crate) spool_dir: Option<String>,
    #[serde(default = "default_status_refresh_secs")]
    pub(crate) status_refresh_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profiles_dir: None,
            spool_dir: None,
            status_refresh_secs: default_status_refresh_secs(),
        }
    }
}

fn default_status_refresh_secs() -> u64 {
    2
}

pub(crate) fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
