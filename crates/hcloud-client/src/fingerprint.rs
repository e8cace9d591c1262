//! SSH public key fingerprints
//!
//! The API identifies SSH keys by the legacy OpenSSH fingerprint: the MD5
//! digest of the decoded key blob as colon-separated hex pairs.

use crate::error::HcloudError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};

/// Fingerprint of an OpenSSH public key line (`<type> <base64> [comment]`).
pub fn ssh_key_fingerprint(public_key: &str) -> Result<String, HcloudError> {
    let mut fields = public_key.split_whitespace();
    let (Some(_key_type), Some(blob)) = (fields.next(), fields.next()) else {
        return Err(HcloudError::InvalidRequest(
            "SSH public key must have the form '<type> <base64 key> [comment]'".to_string(),
        ));
    };
    let blob = STANDARD
        .decode(blob)
        .map_err(|e| HcloudError::InvalidRequest(format!("SSH public key is not valid base64: {}", e)))?;

    let digest = Md5::digest(&blob);
    Ok(digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":"))
}
