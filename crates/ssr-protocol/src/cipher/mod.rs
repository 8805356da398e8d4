//! Cipher registry (`spec.md` §4.2): a named table of stream and AEAD
//! ciphers, each exposing key/IV(salt)/nonce/tag sizes and a factory for
//! per-session state.
//!
//! Grounded on `examples/original_source/common/ciphers/aead/aes_gcm.go`
//! (`registerAEADCiphers`) and `common/ciphers/stream/cipher_conn.go`
//! (`streamCiphers`); realized as a plain `CipherKind` enum with
//! match-based dispatch (`from_name`, `category`, `key_len`, etc.)
//! instead of Go's `init()`-populated map — the method set is fixed at
//! compile time, so there is no lazily-built global table to maintain.

pub mod aead;
pub mod stream;

use crate::error::{CryptoError, Result};

/// Which family a [`CipherKind`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherCategory {
    Stream,
    Aead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    Aes128Cfb,
    Aes192Cfb,
    Aes256Cfb,
    Aes128Ctr,
    Aes192Ctr,
    Aes256Ctr,
    Chacha20,
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
}

impl CipherKind {
    /// All method names this registry supports, for capability discovery.
    pub fn supported_methods() -> &'static [&'static str] {
        &[
            "aes-128-cfb",
            "aes-192-cfb",
            "aes-256-cfb",
            "aes-128-ctr",
            "aes-192-ctr",
            "aes-256-ctr",
            "chacha20",
            "aes-128-gcm",
            "aes-192-gcm",
            "aes-256-gcm",
        ]
    }

    pub fn from_name(name: &str) -> Result<CipherKind> {
        Ok(match name {
            "aes-128-cfb" => CipherKind::Aes128Cfb,
            "aes-192-cfb" => CipherKind::Aes192Cfb,
            "aes-256-cfb" => CipherKind::Aes256Cfb,
            "aes-128-ctr" => CipherKind::Aes128Ctr,
            "aes-192-ctr" => CipherKind::Aes192Ctr,
            "aes-256-ctr" => CipherKind::Aes256Ctr,
            "chacha20" => CipherKind::Chacha20,
            "aes-128-gcm" => CipherKind::Aes128Gcm,
            "aes-192-gcm" => CipherKind::Aes192Gcm,
            "aes-256-gcm" => CipherKind::Aes256Gcm,
            other => return Err(CryptoError::UnsupportedCipher(other.to_owned())),
        })
    }

    pub fn category(&self) -> CipherCategory {
        match self {
            CipherKind::Aes128Gcm | CipherKind::Aes192Gcm | CipherKind::Aes256Gcm => CipherCategory::Aead,
            _ => CipherCategory::Stream,
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            CipherKind::Aes128Cfb | CipherKind::Aes128Ctr | CipherKind::Aes128Gcm => 16,
            CipherKind::Aes192Cfb | CipherKind::Aes192Ctr | CipherKind::Aes192Gcm => 24,
            CipherKind::Aes256Cfb | CipherKind::Aes256Ctr | CipherKind::Aes256Gcm | CipherKind::Chacha20 => 32,
        }
    }

    /// IV length (stream ciphers) or salt length (AEAD ciphers).
    pub fn iv_or_salt_len(&self) -> usize {
        match self {
            CipherKind::Aes128Cfb | CipherKind::Aes128Ctr => 16,
            CipherKind::Aes192Cfb | CipherKind::Aes192Ctr => 16,
            CipherKind::Aes256Cfb | CipherKind::Aes256Ctr => 16,
            CipherKind::Chacha20 => 8,
            // AEAD salt length equals key length, per the Shadowsocks AEAD spec.
            CipherKind::Aes128Gcm => 16,
            CipherKind::Aes192Gcm => 24,
            CipherKind::Aes256Gcm => 32,
        }
    }

    pub fn nonce_len(&self) -> usize {
        match self.category() {
            CipherCategory::Aead => 12,
            CipherCategory::Stream => 0,
        }
    }

    pub fn tag_len(&self) -> usize {
        match self.category() {
            CipherCategory::Aead => 16,
            CipherCategory::Stream => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_is_rejected() {
        assert!(matches!(
            CipherKind::from_name("rot13"),
            Err(CryptoError::UnsupportedCipher(_))
        ));
    }

    #[test]
    fn every_supported_method_name_parses() {
        for name in CipherKind::supported_methods() {
            assert!(CipherKind::from_name(name).is_ok(), "{name} should parse");
        }
    }

    #[test]
    fn aead_methods_have_tag_and_nonce() {
        for kind in [CipherKind::Aes128Gcm, CipherKind::Aes192Gcm, CipherKind::Aes256Gcm] {
            assert_eq!(kind.category(), CipherCategory::Aead);
            assert_eq!(kind.tag_len(), 16);
            assert_eq!(kind.nonce_len(), 12);
        }
    }
}
