//! `origin` sub-protocol: identity transform, no UID framing. Grounded on
//! the Go original's plain `obfs.Plain` case used when no auth chain is
//! configured.

use crate::error::Result;
use crate::server_info::ServerInfo;

pub struct OriginProtocol {
    #[allow(dead_code)]
    server_info: ServerInfo,
}

impl OriginProtocol {
    pub fn new(server_info: ServerInfo) -> OriginProtocol {
        OriginProtocol { server_info }
    }

    pub fn server_pre_encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    pub fn server_post_decrypt(&mut self, data: &[u8]) -> Result<(Vec<u8>, bool)> {
        Ok((data.to_vec(), false))
    }

    pub fn server_udp_pre_encrypt(&mut self, data: &[u8], _uid: u32) -> Vec<u8> {
        data.to_vec()
    }

    pub fn server_udp_post_decrypt(&mut self, data: &[u8]) -> Result<(Vec<u8>, u32)> {
        Ok((data.to_vec(), 0))
    }
}
