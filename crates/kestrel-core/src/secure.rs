use crate::{Error, Result};
use aws_lc_rs::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

const KEY_LEN: usize = 32;

/// Encrypts and decrypts small secrets (API keys, tokens) at rest.
///
/// AES-256-GCM with a random nonce per encryption; tokens are
/// `base64(nonce || ciphertext || tag)`. Constructed explicitly and passed by
/// reference to whichever component needs it; there is no process-wide
/// instance or hidden key state.
pub struct SecureStore {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl SecureStore {
    /// Build a store around an existing 32-byte key.
    pub fn new(key_bytes: &[u8; KEY_LEN]) -> Result<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, key_bytes)
            .map_err(|_| Error::Crypto("failed to build AES-256-GCM key".into()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Build a store around a freshly generated random key.
    ///
    /// Secrets encrypted by this store cannot outlive it; use [`new`] with a
    /// persisted key for values that must survive the process.
    ///
    /// [`new`]: SecureStore::new
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let mut key_bytes = [0u8; KEY_LEN];
        rng.fill(&mut key_bytes)
            .map_err(|_| Error::Crypto("failed to generate key material".into()))?;
        Self::new(&key_bytes)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| Error::Crypto("failed to generate nonce".into()))?;

        let mut buffer = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut buffer,
            )
            .map_err(|_| Error::Crypto("encryption failed".into()))?;

        let mut token = Vec::with_capacity(NONCE_LEN + buffer.len());
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&buffer);
        Ok(BASE64.encode(token))
    }

    pub fn decrypt(&self, token: &str) -> Result<String> {
        let raw = BASE64
            .decode(token)
            .map_err(|e| Error::Crypto(format!("token is not valid base64: {e}")))?;
        if raw.len() <= NONCE_LEN {
            return Err(Error::Crypto("token too short".into()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| Error::Crypto("invalid nonce".into()))?;

        let mut buffer = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut buffer)
            .map_err(|_| Error::Crypto("decryption failed; token invalid or tampered".into()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| Error::Crypto("decrypted payload is not UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let store = SecureStore::generate().unwrap();
        let token = store.encrypt("AKIA-SECRET-VALUE").unwrap();

        assert_ne!(token, "AKIA-SECRET-VALUE");
        assert_eq!(store.decrypt(&token).unwrap(), "AKIA-SECRET-VALUE");
    }

    #[test]
    fn test_same_plaintext_yields_distinct_tokens() {
        let store = SecureStore::generate().unwrap();
        let a = store.encrypt("value").unwrap();
        let b = store.encrypt("value").unwrap();

        // Nonces are random, so tokens must differ.
        assert_ne!(a, b);
    }

    #[test]
    fn test_tampered_token_fails() {
        let store = SecureStore::generate().unwrap();
        let token = store.encrypt("value").unwrap();

        let mut raw = BASE64.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(raw);

        assert!(store.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_garbage_token_is_error_not_panic() {
        let store = SecureStore::generate().unwrap();
        assert!(store.decrypt("not base64 at all!").is_err());
        assert!(store.decrypt("").is_err());
    }

    #[test]
    fn test_keys_do_not_cross_decrypt() {
        let a = SecureStore::generate().unwrap();
        let b = SecureStore::generate().unwrap();

        let token = a.encrypt("value").unwrap();
        assert!(b.decrypt(&token).is_err());
    }
}
