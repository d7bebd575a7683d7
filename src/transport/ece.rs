//! Web Push message encryption (RFC 8291, `aes128gcm` content coding of RFC 8188).
//!
//! Output layout: `salt(16) | rs(4, BE) | idlen(1) | keyid(65) | ciphertext`,
//! where keyid is the sender's ephemeral P-256 public key and the
//! ciphertext is a single record `plaintext | 0x02 | tag(16)`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM};
use ring::agreement::{self, EphemeralPrivateKey, UnparsedPublicKey, ECDH_P256};
use ring::hkdf::{self, Salt, HKDF_SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

/// Record size advertised in the header
pub const RECORD_SIZE: u32 = 4096;

pub(crate) const SALT_LEN: usize = 16;
pub(crate) const PUBLIC_KEY_LEN: usize = 65;
pub(crate) const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;
const AUTH_SECRET_LEN: usize = 16;
const TAG_LEN: usize = 16;
const CEK_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Last-record padding delimiter
const PADDING_DELIMITER: u8 = 0x02;

/// Largest payload whose encrypted body (header, delimiter and tag included)
/// stays within the 4096 bytes push services are required to accept
pub const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - HEADER_LEN - 1 - TAG_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EceError {
    #[error("invalid subscriber public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid auth secret: {0}")]
    InvalidAuthSecret(String),

    #[error("payload of {0} bytes exceeds the {MAX_PLAINTEXT_LEN} byte limit")]
    PayloadTooLarge(usize),

    #[error("encryption failed")]
    Crypto,
}

/// `hkdf::KeyType` for arbitrary output lengths
struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}

fn hkdf_expand(prk: &hkdf::Prk, info: &[&[u8]], out: &mut [u8]) -> Result<(), EceError> {
    prk.expand(info, OkmLen(out.len()))
        .and_then(|okm| okm.fill(out))
        .map_err(|_| EceError::Crypto)
}

/// Decode base64url key material; tolerates padding and the standard alphabet
pub(crate) fn decode_base64url(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = value
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD.decode(normalized)
}

/// Derive the content encryption key and nonce from the ECDH secret.
pub(crate) fn derive_key_and_nonce(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<([u8; CEK_LEN], [u8; NONCE_LEN]), EceError> {
    let prk_key = Salt::new(HKDF_SHA256, auth_secret).extract(ecdh_secret);
    let mut ikm = [0u8; 32];
    hkdf_expand(&prk_key, &[b"WebPush: info\0", ua_public, as_public], &mut ikm)?;

    let prk = Salt::new(HKDF_SHA256, salt).extract(&ikm);
    let mut cek = [0u8; CEK_LEN];
    hkdf_expand(&prk, &[b"Content-Encoding: aes128gcm\0"], &mut cek)?;
    let mut nonce = [0u8; NONCE_LEN];
    hkdf_expand(&prk, &[b"Content-Encoding: nonce\0"], &mut nonce)?;

    Ok((cek, nonce))
}

/// Encrypt `plaintext` for a subscriber identified by its base64url
/// `p256dh` public key and `auth` secret.
pub fn encrypt_payload(p256dh: &str, auth: &str, plaintext: &[u8]) -> Result<Vec<u8>, EceError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(EceError::PayloadTooLarge(plaintext.len()));
    }

    let ua_public = decode_base64url(p256dh).map_err(|e| EceError::InvalidPublicKey(e.to_string()))?;
    if ua_public.len() != PUBLIC_KEY_LEN || ua_public[0] != 0x04 {
        return Err(EceError::InvalidPublicKey(format!(
            "expected {} byte uncompressed point, got {} bytes",
            PUBLIC_KEY_LEN,
            ua_public.len()
        )));
    }
    let auth_secret = decode_base64url(auth).map_err(|e| EceError::InvalidAuthSecret(e.to_string()))?;
    if auth_secret.len() != AUTH_SECRET_LEN {
        return Err(EceError::InvalidAuthSecret(format!(
            "expected {} bytes, got {}",
            AUTH_SECRET_LEN,
            auth_secret.len()
        )));
    }

    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| EceError::Crypto)?;

    let as_private = EphemeralPrivateKey::generate(&ECDH_P256, &rng).map_err(|_| EceError::Crypto)?;
    let as_public = as_private.compute_public_key().map_err(|_| EceError::Crypto)?;

    let peer = UnparsedPublicKey::new(&ECDH_P256, &ua_public);
    let (cek, nonce) = agreement::agree_ephemeral(as_private, &peer, |shared| {
        derive_key_and_nonce(shared, &auth_secret, &ua_public, as_public.as_ref(), &salt)
    })
    .map_err(|_| EceError::InvalidPublicKey("point is not on the P-256 curve".to_string()))??;

    let key = UnboundKey::new(&AES_128_GCM, &cek).map_err(|_| EceError::Crypto)?;
    let key = LessSafeKey::new(key);

    let mut record = Vec::with_capacity(plaintext.len() + 1 + TAG_LEN);
    record.extend_from_slice(plaintext);
    record.push(PADDING_DELIMITER);
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut record)
        .map_err(|_| EceError::Crypto)?;

    let mut body = Vec::with_capacity(HEADER_LEN + record.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(PUBLIC_KEY_LEN as u8);
    body.extend_from_slice(as_public.as_ref());
    body.extend_from_slice(&record);

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Subscriber side: key pair plus auth secret, able to decrypt
    struct Subscriber {
        private: EphemeralPrivateKey,
        public: Vec<u8>,
        auth: [u8; AUTH_SECRET_LEN],
    }

    impl Subscriber {
        fn new() -> Self {
            let rng = SystemRandom::new();
            let private = EphemeralPrivateKey::generate(&ECDH_P256, &rng).unwrap();
            let public = private.compute_public_key().unwrap().as_ref().to_vec();
            let mut auth = [0u8; AUTH_SECRET_LEN];
            rng.fill(&mut auth).unwrap();
            Self { private, public, auth }
        }

        fn p256dh(&self) -> String {
            URL_SAFE_NO_PAD.encode(&self.public)
        }

        fn auth(&self) -> String {
            URL_SAFE_NO_PAD.encode(self.auth)
        }

        fn decrypt(self, body: &[u8]) -> Vec<u8> {
            let salt = &body[..SALT_LEN];
            let as_public = &body[SALT_LEN + 5..HEADER_LEN];
            let peer = UnparsedPublicKey::new(&ECDH_P256, as_public);

            let (cek, nonce) = agreement::agree_ephemeral(self.private, &peer, |shared| {
                derive_key_and_nonce(shared, &self.auth, &self.public, as_public, salt)
            })
            .unwrap()
            .unwrap();

            let key = LessSafeKey::new(UnboundKey::new(&AES_128_GCM, &cek).unwrap());
            let mut record = body[HEADER_LEN..].to_vec();
            let plaintext = key
                .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut record)
                .unwrap();

            assert_eq!(plaintext.last(), Some(&PADDING_DELIMITER));
            plaintext[..plaintext.len() - 1].to_vec()
        }
    }

    #[test]
    fn test_header_layout_and_length() {
        let subscriber = Subscriber::new();
        let payload = br#"{"title":"Hi","body":"There"}"#;

        let body = encrypt_payload(&subscriber.p256dh(), &subscriber.auth(), payload).unwrap();

        assert_eq!(body.len(), HEADER_LEN + payload.len() + 1 + TAG_LEN);
        assert_eq!(&body[16..20], &4096u32.to_be_bytes());
        assert_eq!(body[20], 65);
        assert_eq!(body[21], 0x04);
    }

    #[test]
    fn test_subscriber_can_decrypt() {
        let subscriber = Subscriber::new();
        let payload = br#"{"title":"BTC","body":"BUY at 42000"}"#.to_vec();

        let body = encrypt_payload(&subscriber.p256dh(), &subscriber.auth(), &payload).unwrap();
        assert_eq!(subscriber.decrypt(&body), payload);
    }

    #[test]
    fn test_each_message_uses_fresh_salt_and_key() {
        let subscriber = Subscriber::new();
        let a = encrypt_payload(&subscriber.p256dh(), &subscriber.auth(), b"same").unwrap();
        let b = encrypt_payload(&subscriber.p256dh(), &subscriber.auth(), b"same").unwrap();
        assert_ne!(a[..HEADER_LEN], b[..HEADER_LEN]);
    }

    #[test]
    fn test_rejects_bad_key_material() {
        let subscriber = Subscriber::new();

        let err = encrypt_payload("not-a-key", &subscriber.auth(), b"x").unwrap_err();
        assert!(matches!(err, EceError::InvalidPublicKey(_)));

        let err = encrypt_payload(&subscriber.p256dh(), "c2hvcnQ", b"x").unwrap_err();
        assert!(matches!(err, EceError::InvalidAuthSecret(_)));
    }

    #[test]
    fn test_payload_limit() {
        assert_eq!(MAX_PLAINTEXT_LEN, 3993);

        let subscriber = Subscriber::new();
        let max = vec![b'a'; 3993];
        let body = encrypt_payload(&subscriber.p256dh(), &subscriber.auth(), &max).unwrap();
        assert_eq!(body.len(), 4096);

        let over = vec![b'a'; 3994];
        assert_eq!(
            encrypt_payload(&subscriber.p256dh(), &subscriber.auth(), &over),
            Err(EceError::PayloadTooLarge(3994))
        );
    }

    #[test]
    fn test_decode_tolerates_padding() {
        assert_eq!(decode_base64url("YWJj").unwrap(), b"abc");
        assert_eq!(decode_base64url("YWI=").unwrap(), b"ab");
        assert_eq!(decode_base64url("-_8").unwrap(), decode_base64url("+/8=").unwrap());
    }
}
