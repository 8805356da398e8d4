//! Sub-protocol plugin (`spec.md` §4.7): a pre/post transform layered
//! *inside* encryption, carrying the per-user UID.
//!
//! Grounded on `examples/original_source/common/network/decorate.go`'s use
//! of `obfs.Plain` for `ssrd.protocol` (`ServerPreEncrypt`/
//! `ServerPostDecrypt`/`ServerUDPPreEncrypt`/`ServerUDPPostDecrypt`).
//! Tagged-variant dispatch, same rationale as `crate::obfs`.

pub mod auth_chain_a;
pub mod origin;

use crate::error::Result;
use crate::server_info::ServerInfo;

pub enum ProtocolKind {
    Origin(origin::OriginProtocol),
    AuthChainA(auth_chain_a::AuthChainA),
}

impl ProtocolKind {
    pub fn new(method: &str, server_info: ServerInfo) -> Result<ProtocolKind> {
        Ok(match method {
            "origin" => ProtocolKind::Origin(origin::OriginProtocol::new(server_info)),
            "auth_chain_a" => ProtocolKind::AuthChainA(auth_chain_a::AuthChainA::new(server_info)),
            other => {
                return Err(crate::error::DecorateError::ProtocolHandshakeFailure(format!(
                    "unknown sub-protocol method: {other}"
                )))
            }
        })
    }

    pub fn server_pre_encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        match self {
            ProtocolKind::Origin(p) => p.server_pre_encrypt(data),
            ProtocolKind::AuthChainA(p) => p.server_pre_encrypt(data),
        }
    }

    /// Returns `(plaintext, send_back)`.
    pub fn server_post_decrypt(&mut self, data: &[u8]) -> Result<(Vec<u8>, bool)> {
        match self {
            ProtocolKind::Origin(p) => p.server_post_decrypt(data),
            ProtocolKind::AuthChainA(p) => p.server_post_decrypt(data),
        }
    }

    pub fn server_udp_pre_encrypt(&mut self, data: &[u8], uid: u32) -> Vec<u8> {
        match self {
            ProtocolKind::Origin(p) => p.server_udp_pre_encrypt(data, uid),
            ProtocolKind::AuthChainA(p) => p.server_udp_pre_encrypt(data, uid),
        }
    }

    /// Returns `(plaintext, uid)`.
    pub fn server_udp_post_decrypt(&mut self, data: &[u8]) -> Result<(Vec<u8>, u32)> {
        match self {
            ProtocolKind::Origin(p) => p.server_udp_post_decrypt(data),
            ProtocolKind::AuthChainA(p) => p.server_udp_post_decrypt(data),
        }
    }
}
