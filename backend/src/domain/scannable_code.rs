//! Scannable codes that stand in for a car on a public placard.
//!
//! A code is `v1.` followed by unpadded URL-safe base64 of `nonce || sealed`,
//! where `sealed` is the plate encrypted with ChaCha20-Poly1305. The nonce is
//! an HMAC-SHA256 of the plate, which makes encoding deterministic (printed
//! codes stay valid) without revealing the plate to whoever holds the code.
//! Codes carry no owner identity or contact.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::{CarRegistry, Error, PlateNumber};

type HmacSha256 = Hmac<Sha256>;

const CODE_VERSION_PREFIX: &str = "v1.";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const SUBKEY_LEN: usize = 32;
const ENCRYPTION_CONTEXT: &[u8] = b"nomcar-code-enc";
const NONCE_CONTEXT: &[u8] = b"nomcar-code-nonce";

/// Minimum accepted length of the code secret in bytes.
pub const CODE_SECRET_MIN_LEN: usize = 32;

/// Secret material for sealing codes. Zeroed on drop.
pub struct CodeSecret(Zeroizing<Vec<u8>>);

/// Code secret was shorter than [`CODE_SECRET_MIN_LEN`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code secret too short: need >= {min_len} bytes, got {length}")]
pub struct CodeSecretTooShort {
    pub length: usize,
    pub min_len: usize,
}

impl CodeSecret {
    /// Wrap existing key material.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodeSecretTooShort> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() < CODE_SECRET_MIN_LEN {
            return Err(CodeSecretTooShort {
                length: bytes.len(),
                min_len: CODE_SECRET_MIN_LEN,
            });
        }
        Ok(Self(bytes))
    }

    /// Generate a random secret. Codes sealed with it die with the process.
    pub fn generate() -> Self {
        use rand::RngCore as _;

        let mut bytes = Zeroizing::new(vec![0_u8; CODE_SECRET_MIN_LEN]);
        rand::rngs::OsRng.fill_bytes(bytes.as_mut_slice());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::fmt::Debug for CodeSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CodeSecret(..)")
    }
}

/// Maps plates to scannable codes and back.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use nomcar::domain::{CarRegistry, CodeResolver, CodeSecret, ErrorCode, OwnerIdentity, PlateNumber};
/// use nomcar::outbound::persistence::InMemoryCarRepository;
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let registry = Arc::new(CarRegistry::new(Arc::new(InMemoryCarRepository::default())));
/// let secret = CodeSecret::from_bytes(vec![7_u8; 32]).expect("long enough");
/// let resolver = CodeResolver::new(&secret, Arc::clone(&registry));
///
/// let plate = PlateNumber::parse("粤A12345").expect("valid plate");
/// let code = resolver.encode(&plate).expect("sealed");
/// assert!(code.starts_with("v1."));
/// assert_eq!(resolver.encode(&plate).expect("sealed"), code);
///
/// // Codes only resolve while the car is registered.
/// let err = resolver.decode(&code).await.expect_err("not registered yet");
/// assert_eq!(err.code(), ErrorCode::NotFound);
///
/// let owner = OwnerIdentity::new("u1").expect("owner");
/// registry.register("粤A12345", owner, None).await.expect("registered");
/// assert_eq!(resolver.decode(&code).await.expect("resolves"), plate);
///
/// let err = resolver.decode("v1.AAAA").await.expect_err("garbage");
/// assert_eq!(err.code(), ErrorCode::InvalidCode);
/// # });
/// ```
pub struct CodeResolver {
    cipher: ChaCha20Poly1305,
    nonce_key: Zeroizing<[u8; SUBKEY_LEN]>,
    registry: Arc<CarRegistry>,
}

impl CodeResolver {
    pub fn new(secret: &CodeSecret, registry: Arc<CarRegistry>) -> Self {
        let encryption_key = derive_subkey(secret.as_bytes(), ENCRYPTION_CONTEXT);
        let nonce_key = derive_subkey(secret.as_bytes(), NONCE_CONTEXT);
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(encryption_key.as_slice())),
            nonce_key,
            registry,
        }
    }

    /// Produce the stable code for `plate`.
    pub fn encode(&self, plate: &PlateNumber) -> Result<String, Error> {
        let nonce_bytes = self.nonce_for(plate);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plate.as_ref().as_bytes())
            .map_err(|_| Error::internal("failed to seal scannable code"))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);
        Ok(format!("{CODE_VERSION_PREFIX}{}", URL_SAFE_NO_PAD.encode(payload)))
    }

    /// Recover the plate from `code` without consulting the registry.
    pub fn open(&self, code: &str) -> Result<PlateNumber, Error> {
        let encoded = code
            .trim()
            .strip_prefix(CODE_VERSION_PREFIX)
            .ok_or_else(|| invalid_code("unsupported code version"))?;
        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| invalid_code("code is not valid base64"))?;
        if payload.len() <= NONCE_LEN + TAG_LEN {
            return Err(invalid_code("code is truncated"));
        }

        let (nonce_bytes, sealed) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| invalid_code("code signature check failed"))?;
        let plate = String::from_utf8(plaintext)
            .ok()
            .and_then(|raw| PlateNumber::normalise(raw).ok())
            .ok_or_else(|| invalid_code("code payload is malformed"))?;

        // A valid tag under a nonce we would not have chosen means the code
        // was not produced by `encode`.
        if self.nonce_for(&plate).as_slice() != nonce_bytes {
            return Err(invalid_code("code nonce mismatch"));
        }
        Ok(plate)
    }

    /// Resolve `code` to a currently registered plate.
    pub async fn decode(&self, code: &str) -> Result<PlateNumber, Error> {
        let plate = self.open(code)?;
        let car = self.registry.find(&plate).await?;
        debug!(plate = %car.plate(), "scannable code resolved");
        Ok(plate)
    }

    fn nonce_for(&self, plate: &PlateNumber) -> [u8; NONCE_LEN] {
        let digest = hmac_sha256(self.nonce_key.as_slice(), plate.as_ref().as_bytes());
        let mut nonce = [0_u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        nonce
    }
}

fn invalid_code(message: &str) -> Error {
    Error::invalid_code(message)
}

fn derive_subkey(secret: &[u8], context: &[u8]) -> Zeroizing<[u8; SUBKEY_LEN]> {
    Zeroizing::new(hmac_sha256(secret, context))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; SUBKEY_LEN] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|error| panic!("HMAC-SHA256 accepts keys of any length: {error}"));
    mac.update(message);
    let mut out = [0_u8; SUBKEY_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}
