// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential encryption. The scheme is a black box to the rest of the
//! system — any failure here is fatal for the affected credential.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("decrypt failed: corrupt or tampered ciphertext")]
    Corrupt,
}

pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, plain: &str) -> Vec<u8>;
    fn decrypt(&self, cipher: &[u8]) -> Result<String, CipherError>;
}

/// XOR-with-fixed-key placeholder. Not a real encryption scheme — a
/// production deployment supplies its own `CredentialCipher`.
pub struct FixedKeyCipher {
    key: Vec<u8>,
}

impl FixedKeyCipher {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        assert!(!key.is_empty(), "cipher key must be non-empty");
        Self { key }
    }

    fn xor(&self, data: &[u8]) -> Vec<u8> {
        data.iter().enumerate().map(|(i, b)| b ^ self.key[i % self.key.len()]).collect()
    }
}

impl CredentialCipher for FixedKeyCipher {
    fn encrypt(&self, plain: &str) -> Vec<u8> {
        self.xor(plain.as_bytes())
    }

    fn decrypt(&self, cipher: &[u8]) -> Result<String, CipherError> {
        let bytes = self.xor(cipher);
        String::from_utf8(bytes).map_err(|_| CipherError::Corrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let cipher = FixedKeyCipher::new(b"a-sixteen-byte-k".to_vec());
        let cipher_text = cipher.encrypt("hunter2");
        assert_eq!(cipher.decrypt(&cipher_text).unwrap(), "hunter2");
    }

    #[test]
    fn garbage_ciphertext_is_rejected() {
        let cipher = FixedKeyCipher::new(b"a-sixteen-byte-k".to_vec());
        let garbage = vec![0xffu8; 4];
        assert!(cipher.decrypt(&garbage).is_err());
    }
}
