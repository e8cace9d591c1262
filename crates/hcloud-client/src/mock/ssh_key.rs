//! SSH key operations for MockHcloudClient

use super::MockHcloudClient;
use crate::error::HcloudError;
use crate::fingerprint::ssh_key_fingerprint;
use crate::models::*;

pub async fn get_ssh_key_by_fingerprint(client: &MockHcloudClient, fingerprint: &str) -> Result<Option<SshKey>, HcloudError> {
    client.enter("get_ssh_key_by_fingerprint").await?;
    Ok(client
        .ssh_keys
        .lock()
        .unwrap()
        .values()
        .find(|k| k.fingerprint == fingerprint)
        .cloned())
}

pub async fn get_ssh_key(client: &MockHcloudClient, id: i64) -> Result<Option<SshKey>, HcloudError> {
    client.enter("get_ssh_key").await?;
    Ok(client.ssh_keys.lock().unwrap().get(&id).cloned())
}

/// Equal keys collide the way they do on the real API.
pub async fn create_ssh_key(client: &MockHcloudClient, request: CreateSshKeyRequest) -> Result<SshKey, HcloudError> {
    client.enter("create_ssh_key").await?;
    let fingerprint = ssh_key_fingerprint(&request.public_key)?;
    let mut keys = client.ssh_keys.lock().unwrap();
    if keys.values().any(|k| k.name == request.name || k.fingerprint == fingerprint) {
        return Err(HcloudError::Api {
            code: "uniqueness_error".to_string(),
            message: "SSH key with the same fingerprint or name already exists".to_string(),
        });
    }

    let key = SshKey {
        id: client.next_id(),
        name: request.name,
        fingerprint,
        public_key: request.public_key,
        labels: request.labels,
    };
    keys.insert(key.id, key.clone());
    Ok(key)
}

pub async fn delete_ssh_key(client: &MockHcloudClient, id: i64) -> Result<(), HcloudError> {
    client.enter("delete_ssh_key").await?;
    client
        .ssh_keys
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| HcloudError::NotFound(format!("ssh key {} not found", id)))
}

