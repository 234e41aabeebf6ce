//! Request authentication and payload encryption
//!
//! Every API request carries a timestamp and an HMAC-SHA256 signature over
//! `"{timestamp}.{body}"`, where body is the exact bytes put on the wire.
//! When payload encryption is enabled the body is first sealed with
//! XChaCha20-Poly1305 under a key derived from the same shared secret.

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use ring::{digest, hmac};
use serde::{Deserialize, Serialize};

/// Header carrying the Unix timestamp (seconds) the signature was made at
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

/// Header carrying the hex-encoded HMAC signature
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Largest accepted distance between a request timestamp and now
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

const PAYLOAD_KEY_CONTEXT: &[u8] = b"chatdesk-payload-v1";

/// Encrypted message envelope containing ciphertext and nonce
///
/// The 16-byte Poly1305 authentication tag is appended to the ciphertext
/// by the AEAD cipher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// 24-byte nonce for XChaCha20-Poly1305
    pub nonce: [u8; 24],
    /// Encrypted data + 16-byte Poly1305 authentication tag (appended)
    pub ciphertext: Vec<u8>,
}

/// JSON body shape of a sealed request or response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedBody {
    /// Base64 nonce
    pub nonce: String,
    /// Base64 ciphertext with tag
    pub ciphertext: String,
}

impl From<&EncryptedEnvelope> for SealedBody {
    fn from(envelope: &EncryptedEnvelope) -> Self {
        Self {
            nonce: STANDARD.encode(envelope.nonce),
            ciphertext: STANDARD.encode(&envelope.ciphertext),
        }
    }
}

impl TryFrom<&SealedBody> for EncryptedEnvelope {
    type Error = Error;

    fn try_from(body: &SealedBody) -> Result<Self> {
        let nonce_bytes = STANDARD
            .decode(&body.nonce)
            .map_err(|e| Error::Crypto(format!("Invalid nonce encoding: {}", e)))?;
        let nonce: [u8; 24] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Crypto("Invalid nonce length".to_string()))?;
        let ciphertext = STANDARD
            .decode(&body.ciphertext)
            .map_err(|e| Error::Crypto(format!("Invalid ciphertext encoding: {}", e)))?;
        Ok(Self { nonce, ciphertext })
    }
}

/// Body and authentication headers of one outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Bytes to send
    pub body: Vec<u8>,
    /// Value of the timestamp header
    pub timestamp: i64,
    /// Value of the signature header
    pub signature: String,
}

/// Signs requests and optionally seals their bodies with a shared secret
#[derive(Clone)]
pub struct RequestSigner {
    mac_key: hmac::Key,
    payload_key: Option<[u8; 32]>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("encrypt_payloads", &self.payload_key.is_some())
            .finish()
    }
}

impl RequestSigner {
    /// Create a signer; `encrypt_payloads` enables body sealing
    pub fn new(secret: &str, encrypt_payloads: bool) -> Self {
        Self {
            mac_key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            payload_key: encrypt_payloads.then(|| derive_payload_key(secret)),
        }
    }

    /// Whether request bodies are encrypted
    pub fn encrypts_payloads(&self) -> bool {
        self.payload_key.is_some()
    }

    /// Hex HMAC-SHA256 over `"{timestamp}.{body}"`
    pub fn sign(&self, body: &[u8], timestamp: i64) -> String {
        let tag = hmac::sign(&self.mac_key, &signing_input(body, timestamp));
        hex::encode(tag.as_ref())
    }

    /// Check a signature and that its timestamp is within the allowed skew
    pub fn verify(&self, body: &[u8], timestamp: i64, signature: &str, now: i64) -> Result<()> {
        if (now - timestamp).abs() > MAX_CLOCK_SKEW_SECS {
            return Err(Error::Crypto(format!(
                "Request timestamp {} outside allowed window",
                timestamp
            )));
        }

        let tag = hex::decode(signature)
            .map_err(|e| Error::Crypto(format!("Invalid signature encoding: {}", e)))?;

        hmac::verify(&self.mac_key, &signing_input(body, timestamp), &tag)
            .map_err(|_| Error::Crypto("Signature mismatch".to_string()))
    }

    /// Seal a plaintext body if encryption is enabled
    pub fn seal_body(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match &self.payload_key {
            Some(key) => {
                let envelope = encrypt_message(key, plaintext)?;
                Ok(serde_json::to_vec(&SealedBody::from(&envelope))?)
            }
            None => Ok(plaintext.to_vec()),
        }
    }

    /// Open a response body; plain bodies pass through unchanged
    pub fn open_body(&self, body: &[u8]) -> Result<Vec<u8>> {
        let Some(key) = &self.payload_key else {
            return Ok(body.to_vec());
        };

        match serde_json::from_slice::<SealedBody>(body) {
            Ok(sealed) => {
                let envelope = EncryptedEnvelope::try_from(&sealed)?;
                decrypt_message(key, &envelope)
            }
            Err(_) => Ok(body.to_vec()),
        }
    }

    /// Seal and sign a request body at the given time
    pub fn sign_request(&self, plaintext: &[u8], timestamp: i64) -> Result<SignedRequest> {
        let body = self.seal_body(plaintext)?;
        let signature = self.sign(&body, timestamp);
        Ok(SignedRequest {
            body,
            timestamp,
            signature,
        })
    }
}

fn signing_input(body: &[u8], timestamp: i64) -> Vec<u8> {
    let mut input = format!("{}.", timestamp).into_bytes();
    input.extend_from_slice(body);
    input
}

/// Derive the 32-byte payload key from the shared secret
pub fn derive_payload_key(secret: &str) -> [u8; 32] {
    let mut context = digest::Context::new(&digest::SHA256);
    context.update(PAYLOAD_KEY_CONTEXT);
    context.update(secret.as_bytes());
    let digest = context.finish();

    let mut key = [0u8; 32];
    key.copy_from_slice(digest.as_ref());
    key
}

/// Encrypt a message using XChaCha20-Poly1305 AEAD
///
/// A fresh random 24-byte nonce is drawn for every call.
pub fn encrypt_message(secret: &[u8; 32], plaintext: &[u8]) -> Result<EncryptedEnvelope> {
    use rand::RngCore;

    let cipher = XChaCha20Poly1305::new(secret.into());

    let mut nonce_bytes = [0u8; 24];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedEnvelope {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt a message using XChaCha20-Poly1305 AEAD
///
/// Fails when the authentication tag does not verify.
pub fn decrypt_message(secret: &[u8; 32], envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(secret.into());
    let nonce = XNonce::from(envelope.nonce);

    cipher
        .decrypt(&nonce, envelope.ciphertext.as_ref())
        .map_err(|e| Error::Crypto(format!("Decryption failed (auth tag mismatch or corrupted data): {}", e)))
}
