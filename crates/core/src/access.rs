//! Room locator decoding
//!
//! A room key is an opaque, base64-encoded byte string: the first
//! [`IDENTIFIER_LEN`] bytes identify the store, the rest is secret material.
//! The canonical text form is URL-safe base64 without padding; the standard
//! alphabet and padded input are accepted as well.

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Length of the store identifier segment of a locator.
pub const IDENTIFIER_LEN: usize = 32;

const DISCOVERY_DOMAIN: &[u8] = b"roomq/discovery/v1";
const CAPABILITY_DOMAIN: &[u8] = b"roomq/capability/v1";

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn decode_bytes(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::decode("empty key"));
    }
    URL_SAFE_LENIENT
        .decode(trimmed)
        .or_else(|_| STANDARD_LENIENT.decode(trimmed))
        .map_err(|e| Error::decode(format!("not valid base64: {}", e)))
}

/// Lowercase hex rendering used for directory and file names.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Store identifier and secret decoded from a room key.
///
/// Created once per invocation and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessDescriptor {
    identifier: [u8; IDENTIFIER_LEN],
    secret: Vec<u8>,
}

impl AccessDescriptor {
    /// Build a descriptor from its parts.
    pub fn new(identifier: [u8; IDENTIFIER_LEN], secret: Vec<u8>) -> Self {
        Self { identifier, secret }
    }

    /// Decode a room key into identifier and secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the key is not valid base64 or decodes
    /// to fewer than [`IDENTIFIER_LEN`] bytes.
    pub fn decode(locator: &str) -> Result<Self> {
        let bytes = decode_bytes(locator)?;
        if bytes.len() < IDENTIFIER_LEN {
            return Err(Error::decode(format!(
                "key decodes to {} bytes, need at least {}",
                bytes.len(),
                IDENTIFIER_LEN
            )));
        }
        let mut identifier = [0u8; IDENTIFIER_LEN];
        identifier.copy_from_slice(&bytes[..IDENTIFIER_LEN]);
        Ok(Self {
            identifier,
            secret: bytes[IDENTIFIER_LEN..].to_vec(),
        })
    }

    /// Canonical text form (URL-safe base64, no padding).
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(IDENTIFIER_LEN + self.secret.len());
        bytes.extend_from_slice(&self.identifier);
        bytes.extend_from_slice(&self.secret);
        URL_SAFE_LENIENT.encode(bytes)
    }

    /// The store identifier.
    pub fn identifier(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.identifier
    }

    /// The secret material.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Topic under which sessions for this store announce themselves.
    pub fn discovery_key(&self) -> DiscoveryKey {
        let mut hasher = Sha256::new();
        hasher.update(DISCOVERY_DOMAIN);
        hasher.update(self.identifier);
        DiscoveryKey(hasher.finalize().into())
    }

    /// Token replication peers must present; derived from identifier and secret.
    pub fn capability(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(CAPABILITY_DOMAIN);
        hasher.update(self.identifier);
        hasher.update(&self.secret);
        hasher.finalize().into()
    }
}

impl fmt::Debug for AccessDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessDescriptor")
            .field("identifier", &to_hex(&self.identifier))
            .field("secret", &format_args!("<{} bytes>", self.secret.len()))
            .finish()
    }
}

/// Discovery topic derived from a store identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveryKey(pub [u8; 32]);

impl DiscoveryKey {
    /// Hex form, used as the announcement directory name.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

/// Identifier of a known mirror peer (`-b/--blind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlindPeer(pub [u8; 32]);

impl BlindPeer {
    /// Decode a blind peer key; it must be exactly 32 bytes.
    pub fn decode(key: &str) -> Result<Self> {
        let bytes = decode_bytes(key)?;
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            Error::decode(format!(
                "blind peer key decodes to {} bytes, expected 32",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Hex form, used as the announcement directory name.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}
