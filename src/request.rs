use crate::model::{CONNECT_USERNAME, ConnectMode, ConnectionRequest, Profile, ServerKeys};

/// Key material is only attached when the handshake will use it: a
/// WireGuard connect, a token profile, or a password login.
pub(crate) fn include_server_keys(profile: &Profile, mode: ConnectMode, password: &str) -> bool {
    !profile.server_public_key.is_empty()
        && (mode == ConnectMode::Wg || profile.token || !password.is_empty())
}

pub(crate) fn server_keys(profile: &Profile, mode: ConnectMode, password: &str) -> Option<ServerKeys> {
    if !include_server_keys(profile, mode, password) {
        return None;
    }
    Some(ServerKeys {
        public_key: profile.server_public_key.join("\n"),
        box_public_key: profile.server_box_public_key.clone(),
    })
}

pub(crate) fn assemble_request(
    profile: &Profile,
    mode: ConnectMode,
    password: String,
    keys: Option<ServerKeys>,
    data: String,
) -> ConnectionRequest {
    let (server_public_key, server_box_public_key) = match keys {
        Some(keys) => (Some(keys.public_key), Some(keys.box_public_key)),
        None => (None, None),
    };
    ConnectionRequest {
        id: profile.id.clone(),
        mode,
        org_id: profile.organization_id.clone(),
        user_id: profile.user_id.clone(),
        server_id: profile.server_id.clone(),
        sync_hosts: profile.sync_hosts.clone(),
        sync_token: profile.sync_token.clone(),
        sync_secret: profile.sync_secret.clone(),
        username: CONNECT_USERNAME.to_string(),
        password,
        dynamic_firewall: profile.dynamic_firewall,
        server_public_key,
        server_box_public_key,
        token_ttl: profile.token_ttl,
        timeout: true,
        data,
    }
}
