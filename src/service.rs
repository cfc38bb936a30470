use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{
    ConnectMode, ConnectionRequest, DisconnectRequest, EncryptedBlob, STATUS_CONNECTING,
    STATUS_DISCONNECTING, now_epoch,
};
use crate::storage::encrypt_string;

const REQUEST_STAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

pub(crate) trait ConnectionService: Send + Sync {
    /// Resolves once the request has been handed over, not when the tunnel is up.
    fn connect(&self, request: &ConnectionRequest) -> Result<()>;
    fn disconnect(&self, request: &DisconnectRequest) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct StatusEntry {
    #[serde(default)]
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) state: bool,
}

/// Live per-profile status shared between the client and the daemon.
/// Clones share one write lock; the file is always replaced whole.
#[derive(Debug, Clone)]
pub(crate) struct StatusBoard {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl StatusBoard {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn load(&self) -> Result<BTreeMap<String, StatusEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err).context("read status file"),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).context("parse status file")
    }

    pub(crate) fn update(&self, id: &str, entry: StatusEntry) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("status board lock poisoned"))?;
        let mut entries = self.load()?;
        entries.insert(id.to_string(), entry);
        let staging = self.path.with_extension("json.tmp");
        write_json(&staging, &entries)?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RequestKind {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct SpooledConnect {
    pub(crate) kind: RequestKind,
    pub(crate) id: String,
    pub(crate) mode: ConnectMode,
    pub(crate) org_id: String,
    pub(crate) user_id: String,
    pub(crate) server_id: String,
    pub(crate) sync_hosts: Vec<String>,
    pub(crate) sync_token: String,
    pub(crate) sync_secret: String,
    pub(crate) username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) password: Option<EncryptedBlob>,
    pub(crate) dynamic_firewall: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) server_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) server_box_public_key: Option<String>,
    pub(crate) token_ttl: u64,
    pub(crate) timeout: bool,
    pub(crate) data: String,
    pub(crate) submitted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct SpooledDisconnect {
    pub(crate) kind: RequestKind,
    pub(crate) id: String,
    pub(crate) submitted: u64,
}

/// Hands requests to the system daemon by dropping them into its spool
/// directory. Passwords are sealed with the spool key.
pub(crate) struct SpoolService {
    requests_dir: PathBuf,
    key: Vec<u8>,
    status: StatusBoard,
}

impl SpoolService {
    pub(crate) fn new(spool_dir: &Path, key: Vec<u8>, status: StatusBoard) -> Self {
        Self {
            requests_dir: spool_dir.join("requests"),
            key,
            status,
        }
    }

    fn request_path(&self, id: &str, kind: RequestKind) -> PathBuf {
        let stamp = chrono::Local::now().format(REQUEST_STAMP_FORMAT);
        let kind = match kind {
            RequestKind::Connect => "connect",
            RequestKind::Disconnect => "disconnect",
        };
        self.requests_dir.join(format!("{stamp}-{id}-{kind}.json"))
    }

    fn seal(&self, request: &ConnectionRequest) -> Result<SpooledConnect> {
        let password = if request.password.is_empty() {
            None
        } else {
            Some(encrypt_string(&request.password, &self.key)?)
        };
        Ok(SpooledConnect {
            kind: RequestKind::Connect,
            id: request.id.clone(),
            mode: request.mode,
            org_id: request.org_id.clone(),
            user_id: request.user_id.clone(),
            server_id: request.server_id.clone(),
            sync_hosts: request.sync_hosts.clone(),
            sync_token: request.sync_token.clone(),
            sync_secret: request.sync_secret.clone(),
            username: request.username.clone(),
            password,
            dynamic_firewall: request.dynamic_firewall,
            server_public_key: request.server_public_key.clone(),
            server_box_public_key: request.server_box_public_key.clone(),
            token_ttl: request.token_ttl,
            timeout: request.timeout,
            data: request.data.clone(),
            submitted: now_epoch(),
        })
    }
}

impl ConnectionService for SpoolService {
    fn connect(&self, request: &ConnectionRequest) -> Result<()> {
        let spooled = self.seal(request)?;
        write_json(&self.request_path(&request.id, RequestKind::Connect), &spooled)?;
        self.status.update(
            &request.id,
            StatusEntry {
                status: STATUS_CONNECTING.to_string(),
                state: true,
            },
        )
    }

    fn disconnect(&self, request: &DisconnectRequest) -> Result<()> {
        let spooled = SpooledDisconnect {
            kind: RequestKind::Disconnect,
            id: request.id.clone(),
            submitted: now_epoch(),
        };
        write_json(
            &self.request_path(&request.id, RequestKind::Disconnect),
            &spooled,
        )?;
        self.status.update(
            &request.id,
            StatusEntry {
                status: STATUS_DISCONNECTING.to_string(),
                state: false,
            },
        )
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create spool dir")?;
    }
    let content = serde_json::to_string_pretty(value).context("serialize spool entry")?;
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) use mock::MockConnectionService;


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CONNECT_USERNAME;
    use crate::storage::{decrypt_string, generate_key};

    fn temp_dir() -> PathBuf {
        let mut base = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        base.push(format!("profile-connect-spool-{nanos}"));
        base
    }

    fn request(password: &str) -> ConnectionRequest {
        ConnectionRequest {
            id: "p1".to_string(),
            mode: ConnectMode::Ovpn,
            org_id: "org".to_string(),
            user_id: "usr".to_string(),
            server_id: "srv".to_string(),
            sync_hosts: vec![],
            sync_token: String::new(),
            sync_secret: String::new(),
            username: CONNECT_USERNAME.to_string(),
            password: password.to_string(),
            dynamic_firewall: false,
            server_public_key: None,
            server_box_public_key: None,
            token_ttl: 0,
            timeout: true,
            data: "client".to_string(),
        }
    }

    fn spooled_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir.join("requests"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn status_board_starts_empty_and_updates() {
        let dir = temp_dir();
        let board = StatusBoard::new(dir.join("status.json"));
        assert!(board.load().unwrap().is_empty());
        board
            .update(
                "p1",
                StatusEntry {
                    status: "connected".to_string(),
                    state: true,
                },
            )
            .unwrap();
        board.update("p2", StatusEntry::default()).unwrap();
        let entries = board.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["p1"].status, "connected");
    }

    #[test]
    fn concurrent_updates_keep_every_entry() {
        let dir = temp_dir();
        let board = StatusBoard::new(dir.join("status.json"));
        for round in 0..20 {
            let handles: Vec<_> = (0..8)
                .map(|index| {
                    let board = board.clone();
                    std::thread::spawn(move || {
                        board.update(
                            &format!("p{round}-{index}"),
                            StatusEntry {
                                status: "connecting".to_string(),
                                state: true,
                            },
                        )
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        }
        let entries = board.load().unwrap();
        assert_eq!(entries.len(), 160);
        assert!(entries.values().all(|entry| entry.state));
        assert!(!dir.join("status.json.tmp").exists());
    }

    #[test]
    fn connect_spools_sealed_password_and_marks_connecting() {
        let dir = temp_dir();
        let key = generate_key().unwrap();
        let board = StatusBoard::new(dir.join("status.json"));
        let service = SpoolService::new(&dir, key.clone(), board.clone());
        service.connect(&request("hunter2")).unwrap();

        let files = spooled_files(&dir);
        assert_eq!(files.len(), 1);
        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(!content.contains("hunter2"));
        let spooled: SpooledConnect = serde_json::from_str(&content).unwrap();
        assert_eq!(spooled.kind, RequestKind::Connect);
        let sealed = spooled.password.unwrap();
        assert_eq!(decrypt_string(&sealed, &key).unwrap(), "hunter2");

        let entry = &board.load().unwrap()["p1"];
        assert_eq!(entry.status, STATUS_CONNECTING);
        assert!(entry.state);
    }

    #[test]
    fn connect_without_password_writes_none() {
        let dir = temp_dir();
        let service = SpoolService::new(
            &dir,
            generate_key().unwrap(),
            StatusBoard::new(dir.join("status.json")),
        );
        service.connect(&request("")).unwrap();
        let content = fs::read_to_string(&spooled_files(&dir)[0]).unwrap();
        let spooled: SpooledConnect = serde_json::from_str(&content).unwrap();
        assert!(spooled.password.is_none());
    }

    #[test]
    fn disconnect_spools_id_and_marks_disconnecting() {
        let dir = temp_dir();
        let board = StatusBoard::new(dir.join("status.json"));
        let service = SpoolService::new(&dir, generate_key().unwrap(), board.clone());
        service
            .disconnect(&DisconnectRequest {
                id: "p1".to_string(),
            })
            .unwrap();
        let files = spooled_files(&dir);
        assert!(files[0].to_string_lossy().ends_with("-p1-disconnect.json"));
        let spooled: SpooledDisconnect =
            serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(spooled.id, "p1");
        assert!(spooled.submitted > 0);
        let entry = &board.load().unwrap()["p1"];
        assert_eq!(entry.status, STATUS_DISCONNECTING);
        assert!(!entry.state);
    }
}
