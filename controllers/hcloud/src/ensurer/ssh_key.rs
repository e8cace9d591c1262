//! Infrastructure SSH key

use super::{role_labels, Ensurer, ROLE_INFRASTRUCTURE_SSH};
use crate::error::ControllerError;
use hcloud_client::{ssh_key_fingerprint, CreateSshKeyRequest};
use tracing::{debug, info};

impl Ensurer<'_> {
    /// Ensure `public_key` is registered, under `name` if it has to be
    /// created. Returns the key's fingerprint.
    pub async fn ensure_ssh_key(&self, name: &str, public_key: &str) -> Result<String, ControllerError> {
        let fingerprint = ssh_key_fingerprint(public_key)
            .map_err(|e| ControllerError::InvalidConfig(format!("SSH public key of {}: {}", name, e)))?;

        if let Some(key) = self
            .ctx
            .call("ssh key", name, self.client.get_ssh_key_by_fingerprint(&fingerprint))
            .await?
        {
            debug!(key = %key.name, %fingerprint, "ssh key exists");
            return Ok(key.fingerprint);
        }

        let request = CreateSshKeyRequest {
            name: name.to_string(),
            public_key: public_key.trim().to_string(),
            labels: role_labels(ROLE_INFRASTRUCTURE_SSH),
        };
        let key = self
            .ctx
            .call("ssh key", name, self.client.create_ssh_key(request))
            .await?;
        info!(key = %name, id = key.id, fingerprint = %key.fingerprint, "created ssh key");
        Ok(key.fingerprint)
    }

    /// Delete the SSH key with the recorded fingerprint, if it still exists.
    pub async fn ensure_ssh_key_deleted(&self, fingerprint: &str) -> Result<(), ControllerError> {
        if fingerprint.is_empty() {
            return Ok(());
        }

        let Some(key) = self
            .ctx
            .call("ssh key", fingerprint, self.client.get_ssh_key_by_fingerprint(fingerprint))
            .await?
        else {
            debug!(%fingerprint, "ssh key already gone");
            return Ok(());
        };

        match self
            .ctx
            .run(async { Ok(self.client.delete_ssh_key(key.id).await) })
            .await?
        {
            Ok(()) => {
                info!(id = key.id, %fingerprint, "deleted ssh key");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ControllerError::cloud("ssh key", fingerprint)(e)),
        }
    }
}
