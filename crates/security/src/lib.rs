//! Per-field PII encryption for the Ledgerdesk document
//!
//! Sensitive fields (phone, email, address) are stored as self-describing
//! tagged ciphertext: `enc:` + base64(nonce ‖ ciphertext ‖ auth tag), using
//! ChaCha20-Poly1305 with a fresh random nonce per call.
//!
//! The codec is deliberately forgiving:
//! - empty input and already-tagged input pass through [`PiiCodec::encrypt`]
//!   unchanged (no double encryption from careless call sites)
//! - untagged input passes through [`PiiCodec::decrypt`] unchanged (legacy
//!   plaintext documents keep working)
//! - any decryption failure returns the opaque tagged value unchanged rather
//!   than raising; decryption failures are non-fatal by contract
//!
//! Which fields are sensitive is a declarative per-entity mapping consumed by
//! [`PiiCodec::encrypt_pii`] / [`PiiCodec::decrypt_pii`], which wrap every
//! load/save cycle that touches PII-bearing collections.

#![warn(missing_docs)]
#![warn(clippy::all)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use tracing::warn;

use ledgerdesk_core::{Document, Record, Result, StoreError};

/// Marker prefix distinguishing ciphertext from plaintext.
pub const CIPHERTEXT_TAG: &str = "enc:";

const NONCE_LEN: usize = 12;
const AUTH_TAG_LEN: usize = 16;

/// Which fields of an entity's records carry PII.
struct EntityPii {
    fields: &'static [&'static str],
    /// Nested sub-record arrays inside each record, with their own field sets.
    nested: &'static [(&'static str, &'static [&'static str])],
}

/// Declarative map: collection name → PII field sets.
static PII_MAP: Lazy<Vec<(&'static str, EntityPii)>> = Lazy::new(|| {
    vec![
        (
            "customers",
            EntityPii {
                fields: &["phone", "email", "address"],
                nested: &[("branches", &["phone", "address"])],
            },
        ),
        (
            "employees",
            EntityPii {
                fields: &["phone", "email"],
                nested: &[],
            },
        ),
    ]
});

/// Collections whose records carry encrypted fields.
pub fn pii_collections() -> Vec<&'static str> {
    PII_MAP.iter().map(|(name, _)| *name).collect()
}

/// Stateless authenticated codec over a fixed 32-byte key.
///
/// Pure and synchronous; safe to share and call from any number of requests
/// without locking.
#[derive(Clone)]
pub struct PiiCodec {
    cipher: ChaCha20Poly1305,
}

impl PiiCodec {
    /// Codec from raw key bytes.
    pub fn new(key: [u8; 32]) -> Self {
        PiiCodec {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    /// Codec from a base64url (unpadded) encoded 32-byte key, the format
    /// used for key material in the environment/config.
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| StoreError::Validation(format!("PII key is not valid base64: {e}")))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StoreError::Validation("PII key must decode to 32 bytes".to_string()))?;
        Ok(Self::new(key))
    }

    /// Encrypt one value into tagged ciphertext.
    ///
    /// Empty input and already-tagged input are returned unchanged, so the
    /// operation is idempotent. A fresh random nonce makes every other call
    /// produce a distinct ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.is_empty() || plaintext.starts_with(CIPHERTEXT_TAG) {
            return plaintext.to_string();
        }
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        match self.cipher.encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes()) {
            Ok(ciphertext) => {
                let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
                envelope.extend_from_slice(&nonce);
                envelope.extend_from_slice(&ciphertext);
                format!("{CIPHERTEXT_TAG}{}", URL_SAFE_NO_PAD.encode(envelope))
            }
            Err(_) => {
                warn!(target: "ledgerdesk::pii", "encryption failed; value left as plaintext");
                plaintext.to_string()
            }
        }
    }

    /// Decrypt one tagged value back to plaintext.
    ///
    /// Values without the tag pass through unchanged (legacy plaintext). Any
    /// failure — bad base64, truncated payload, authentication mismatch —
    /// returns the input unchanged rather than raising.
    pub fn decrypt(&self, value: &str) -> String {
        let Some(encoded) = value.strip_prefix(CIPHERTEXT_TAG) else {
            return value.to_string();
        };
        let Ok(envelope) = URL_SAFE_NO_PAD.decode(encoded) else {
            return value.to_string();
        };
        if envelope.len() < NONCE_LEN + AUTH_TAG_LEN {
            return value.to_string();
        }
        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
        match self.cipher.decrypt(Nonce::from_slice(nonce), ciphertext) {
            Ok(plaintext) => match String::from_utf8(plaintext) {
                Ok(text) => text,
                Err(_) => value.to_string(),
            },
            Err(_) => value.to_string(),
        }
    }

    /// Encrypt the named string fields of one record in place.
    ///
    /// Missing, empty and non-string fields pass through untouched.
    pub fn encrypt_fields(&self, record: &mut Record, fields: &[&str]) {
        apply_fields(record, fields, |v| self.encrypt(v));
    }

    /// Decrypt the named string fields of one record in place.
    pub fn decrypt_fields(&self, record: &mut Record, fields: &[&str]) {
        apply_fields(record, fields, |v| self.decrypt(v));
    }

    /// Encrypt every PII field across all PII-bearing collections, including
    /// nested sub-records, in one pass. Call before `save()`.
    pub fn encrypt_pii(&self, doc: &mut Document) {
        self.apply_pii(doc, true);
    }

    /// Inverse of [`PiiCodec::encrypt_pii`]. Call right after `load()`.
    pub fn decrypt_pii(&self, doc: &mut Document) {
        self.apply_pii(doc, false);
    }

    fn apply_pii(&self, doc: &mut Document, encrypting: bool) {
        for (entity, pii) in PII_MAP.iter() {
            let Some(records) = doc.records_mut(entity) else {
                continue;
            };
            for record in records.iter_mut().filter_map(Value::as_object_mut) {
                self.apply_record(record, pii, encrypting);
            }
        }
    }

    fn apply_record(&self, record: &mut Record, pii: &EntityPii, encrypting: bool) {
        let op = |v: &str| {
            if encrypting {
                self.encrypt(v)
            } else {
                self.decrypt(v)
            }
        };
        apply_fields(record, pii.fields, op);
        for (key, sub_fields) in pii.nested {
            let Some(subs) = record.get_mut(*key).and_then(Value::as_array_mut) else {
                continue;
            };
            for sub in subs.iter_mut().filter_map(Value::as_object_mut) {
                apply_fields(sub, sub_fields, op);
            }
        }
    }
}

impl std::fmt::Debug for PiiCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never reveal key material
        f.debug_struct("PiiCodec").finish_non_exhaustive()
    }
}

fn apply_fields(record: &mut Record, fields: &[&str], op: impl Fn(&str) -> String) {
    for field in fields {
        let Some(Value::String(current)) = record.get(*field) else {
            continue;
        };
        if current.is_empty() {
            continue;
        }
        let replaced = op(current);
        record.insert((*field).to_string(), Value::String(replaced));
    }
}
