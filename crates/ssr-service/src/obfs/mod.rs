//! Obfuscation plugin (`spec.md` §4.6): a pluggable pre/post transform
//! that can demand a synchronous reply before any plaintext surfaces.
//!
//! Grounded on `examples/original_source/common/network/decorate.go`'s use
//! of `obfs.Plain` (`ServerDecode`/`ServerEncode`/`GetOverhead`). Per
//! Design Notes "Plugin polymorphism", this is modeled as a tagged
//! `ObfsKind` enum rather than a boxed trait object hierarchy — there are
//! only a handful of variants and each owns small, variant-specific state.

pub mod http_simple;
pub mod plain;

use crate::error::Result;
use crate::server_info::ServerInfo;

/// Result of decoding one inbound chunk through the obfuscation layer.
pub struct ObfsDecodeResult {
    pub data: Vec<u8>,
    /// `false` means `data` is a handshake artifact that bypasses encryption.
    pub need_decrypt: bool,
    /// Caller must synchronously emit `server_encode(&[])` before any plaintext.
    pub need_send_back: bool,
}

pub enum ObfsKind {
    Plain(plain::PlainObfs),
    HttpSimple(http_simple::HttpSimpleObfs),
}

impl ObfsKind {
    pub fn new(method: &str, server_info: ServerInfo) -> Result<ObfsKind> {
        Ok(match method {
            "plain" | "origin" => ObfsKind::Plain(plain::PlainObfs::new(server_info)),
            "http_simple" => ObfsKind::HttpSimple(http_simple::HttpSimpleObfs::new(server_info)),
            other => {
                return Err(crate::error::DecorateError::ObfsHandshakeFailure(format!(
                    "unknown obfuscation method: {other}"
                )))
            }
        })
    }

    pub fn server_decode(&mut self, data: &[u8]) -> Result<ObfsDecodeResult> {
        match self {
            ObfsKind::Plain(p) => p.server_decode(data),
            ObfsKind::HttpSimple(p) => p.server_decode(data),
        }
    }

    pub fn server_encode(&mut self, data: &[u8]) -> Vec<u8> {
        match self {
            ObfsKind::Plain(p) => p.server_encode(data),
            ObfsKind::HttpSimple(p) => p.server_encode(data),
        }
    }

    pub fn get_overhead(&self, is_local: bool) -> usize {
        match self {
            ObfsKind::Plain(p) => p.get_overhead(is_local),
            ObfsKind::HttpSimple(p) => p.get_overhead(is_local),
        }
    }
}
