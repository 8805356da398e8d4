//! `plain`/`origin` obfuscation: identity transform, zero overhead.
//! Grounded on the Go original's `obfs.Plain` registry, the no-op case.

use crate::error::Result;
use crate::obfs::ObfsDecodeResult;
use crate::server_info::ServerInfo;

pub struct PlainObfs {
    #[allow(dead_code)]
    server_info: ServerInfo,
}

impl PlainObfs {
    pub fn new(server_info: ServerInfo) -> PlainObfs {
        PlainObfs { server_info }
    }

    pub fn server_decode(&mut self, data: &[u8]) -> Result<ObfsDecodeResult> {
        Ok(ObfsDecodeResult {
            data: data.to_vec(),
            need_decrypt: true,
            need_send_back: false,
        })
    }

    pub fn server_encode(&mut self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    pub fn get_overhead(&self, _is_local: bool) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_info::ServerInfoInner;

    #[test]
    fn decode_passes_bytes_through_and_always_needs_decrypt() {
        let mut obfs = PlainObfs::new(ServerInfo::new(ServerInfoInner::default()));
        let result = obfs.server_decode(b"raw bytes").unwrap();
        assert_eq!(result.data, b"raw bytes");
        assert!(result.need_decrypt);
        assert!(!result.need_send_back);
    }

    #[test]
    fn encode_is_identity() {
        let mut obfs = PlainObfs::new(ServerInfo::new(ServerInfoInner::default()));
        assert_eq!(obfs.server_encode(b"abc"), b"abc");
    }
}
