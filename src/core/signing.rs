//! OpenPGP public key loading for provider download documents.
//!
//! Signatures are never verified here; clients verify the SHASUMS signature
//! with the published key.

use pgp::types::PublicKeyTrait;
use pgp::{Deserializable, SignedPublicKey};
use std::path::Path;

use crate::core::model::{GpgPublicKey, SigningKeys};
use crate::error::{AppError, AppResult};

/// The single key that signs a provider's releases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    /// Long key ID, 16 upper case hex digits
    pub key_id: String,
    /// Key file contents, published verbatim
    pub ascii_armor: String,
}

impl SigningKey {
    /// Read a key file that must contain exactly one public key
    pub fn load(path: &Path) -> AppResult<Self> {
        let armor = std::fs::read_to_string(path).map_err(|e| {
            AppError::signing_key(format!(
                "unable to read public key file {:?}: {}",
                path.display().to_string(),
                e
            ))
        })?;

        Self::from_armor(&armor).map_err(|e| match e {
            AppError::SigningKey { message } => {
                AppError::signing_key(format!("{:?}: {}", path.display().to_string(), message))
            }
            other => other,
        })
    }

    pub fn from_armor(armor: &str) -> AppResult<Self> {
        let key_ids = read_armored_key_ids(armor)?;
        let [key_id] = key_ids.as_slice() else {
            return Err(AppError::signing_key(format!(
                "expected 1 key, got {}",
                key_ids.len()
            )));
        };

        Ok(Self {
            key_id: key_id.clone(),
            ascii_armor: armor.to_string(),
        })
    }

    /// The `signing_keys` object of a download document
    pub fn to_signing_keys(&self) -> SigningKeys {
        SigningKeys {
            gpg_public_keys: vec![GpgPublicKey {
                key_id: self.key_id.clone(),
                ascii_armor: self.ascii_armor.clone(),
                // only the public Terraform registry issues trust signatures
                trust_signature: String::new(),
                source: String::new(),
                source_url: String::new(),
            }],
        }
    }
}

/// Key IDs of every primary key in an armored key ring, in order.
///
/// Subkeys belong to their primary key and are not listed.
pub fn read_armored_key_ids(armor: &str) -> AppResult<Vec<String>> {
    let invalid = |e: pgp::errors::Error| AppError::signing_key(format!("invalid key ring: {e}"));

    let (keys, _headers) = SignedPublicKey::from_armor_many(armor.as_bytes()).map_err(invalid)?;
    keys.map(|key| {
        let key = key.map_err(invalid)?;
        Ok(hex::encode_upper(key.key_id()))
    })
    .collect()
}
