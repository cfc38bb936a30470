use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use rand_core::OsRng;
use rand_core::TryRngCore;

use crate::model::{EncryptedBlob, Settings};

const APP_DIR: &str = "profile-connect";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

pub(crate) fn app_dir() -> Result<PathBuf> {
    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_DIR);
        return Ok(dir);
    }
    let mut fallback = std::env::current_dir().context("current dir")?;
    fallback.push(APP_DIR);
    Ok(fallback)
}

pub(crate) fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("config.json"))
}

pub(crate) fn log_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("profile-connect.log"))
}

pub(crate) fn load_or_init_settings(path: &Path) -> Result<Settings> {
    if path.exists() {
        let content = fs::read_to_string(path).context("read config file")?;
        let settings = serde_json::from_str(&content).context("parse config file")?;
        return Ok(settings);
    }
    let settings = Settings::default();
    save_settings(path, &settings)?;
    Ok(settings)
}

pub(crate) fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create config dir")?;
    }
    let content = serde_json::to_string_pretty(settings).context("serialize config")?;
    fs::write(path, content).context("write config file")?;
    Ok(())
}

pub(crate) fn profiles_dir(settings: &Settings, base: &Path) -> PathBuf {
    match &settings.profiles_dir {
        Some(dir) if !dir.trim().is_empty() => expand_tilde(dir),
        _ => base.join("profiles"),
    }
}

pub(crate) fn spool_dir(settings: &Settings, base: &Path) -> PathBuf {
    match &settings.spool_dir {
        Some(dir) if !dir.trim().is_empty() => expand_tilde(dir),
        _ => base.join("spool"),
    }
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Reads the spool key, creating a fresh one on first use.
pub(crate) fn load_or_create_key(spool_dir: &Path) -> Result<Vec<u8>> {
    let path = spool_dir.join("spool.key");
    if path.exists() {
        let encoded = fs::read_to_string(&path).context("read spool key")?;
        let key = Base64.decode(encoded.trim()).context("decode spool key")?;
        if key.len() != KEY_LEN {
            anyhow::bail!("spool key must be {KEY_LEN} bytes, found {}", key.len());
        }
        return Ok(key);
    }
    let key = generate_key()?;
    fs::create_dir_all(spool_dir).context("create spool dir")?;
    fs::write(&path, Base64.encode(&key)).context("write spool key")?;
    Ok(key)
}

pub(crate) fn generate_key() -> Result<Vec<u8>> {
    let mut key = vec![0u8; KEY_LEN];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut key)
        .map_err(|err| anyhow::anyhow!("random key failed: {err:?}"))?;
    Ok(key)
}

pub(crate) fn encrypt_string(plaintext: &str, key: &[u8]) -> Result<EncryptedBlob> {
    let cipher = cipher(key)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut nonce_bytes)
        .map_err(|err| anyhow::anyhow!("random nonce failed: {err:?}"))?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|err| anyhow::anyhow!("encrypt failed: {err:?}"))?;
    Ok(EncryptedBlob {
        nonce: Base64.encode(nonce_bytes),
        ciphertext: Base64.encode(ciphertext),
    })
}

pub(crate) fn decrypt_string(blob: &EncryptedBlob, key: &[u8]) -> Result<String> {
    let cipher = cipher(key)?;
    let nonce_bytes = Base64.decode(&blob.nonce).context("decode nonce")?;
    if nonce_bytes.len() != NONCE_LEN {
        anyhow::bail!("invalid nonce length");
    }
    let ciphertext = Base64
        .decode(&blob.ciphertext)
        .context("decode ciphertext")?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|err| anyhow::anyhow!("decrypt failed: {err:?}"))?;
    let text = String::from_utf8(plaintext).context("decode utf8")?;
    Ok(text)
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != KEY_LEN {
        anyhow::bail!("key must be {KEY_LEN} bytes");
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
}
