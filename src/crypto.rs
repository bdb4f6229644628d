//! At-rest encryption for the stored card digits.
//! AES-256-GCM with a random nonce per value; stored as
//! `hex(nonce):hex(ciphertext)` so a row is self-contained.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption key must be exactly 32 bytes")]
    InvalidKey,
    #[error("encryption failed")]
    Encrypt,
    #[error("invalid encrypted value format")]
    InvalidFormat,
    #[error("decryption failed")]
    Decrypt,
}

#[derive(Clone)]
pub struct CardCipher {
    cipher: Aes256Gcm,
}

impl CardCipher {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKey);
        }
        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(format!(
            "{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, value: &str) -> Result<String, CryptoError> {
        let (nonce_hex, ciphertext_hex) =
            value.split_once(':').ok_or(CryptoError::InvalidFormat)?;

        let nonce_bytes = hex::decode(nonce_hex).map_err(|_| CryptoError::InvalidFormat)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::InvalidFormat);
        }
        let ciphertext = hex::decode(ciphertext_hex).map_err(|_| CryptoError::InvalidFormat)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> CardCipher {
        CardCipher::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn rejects_short_key() {
        assert!(matches!(
            CardCipher::new(&[0u8; 16]),
            Err(CryptoError::InvalidKey)
        ));
    }

    #[test]
    fn round_trips() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt("1111").unwrap();
        assert_ne!(encrypted, "1111");
        assert!(encrypted.contains(':'));
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "1111");
    }

    #[test]
    fn fresh_nonce_per_value() {
        let cipher = test_cipher();
        let a = cipher.encrypt("1111").unwrap();
        let b = cipher.encrypt("1111").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_values() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt("not-hex-at-all"),
            Err(CryptoError::InvalidFormat)
        ));
        assert!(matches!(
            cipher.decrypt("abcd:zzzz"),
            Err(CryptoError::InvalidFormat)
        ));
    }

    #[test]
    fn rejects_wrong_key() {
        let encrypted = test_cipher().encrypt("4242").unwrap();
        let other = CardCipher::new(&[9u8; 32]).unwrap();
        assert!(matches!(other.decrypt(&encrypted), Err(CryptoError::Decrypt)));
    }
}
