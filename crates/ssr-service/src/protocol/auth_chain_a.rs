//! `auth_chain_a` sub-protocol (`spec.md` §4.7, §8 scenario 4): carries a
//! 4-byte little-endian UID ahead of the plaintext and reports it back to
//! the decorator exactly once via `ServerInfo::fire_update_user`.
//!
//! Simplification (recorded in `DESIGN.md`): the real `auth_chain_a`
//! additionally HMAC-chains each packet against a per-connection random
//! salt and variable padding to resist traffic analysis. This
//! implementation carries the load-bearing part of the wire contract —
//! the UID framing and single-fire UID-learned callback — without the
//! HMAC chain, which is out of scope for the cryptographic transport core
//! as distilled.

use crate::error::{DecorateError, Result};
use crate::server_info::ServerInfo;
use ssr_protocol::CryptoError;

pub struct AuthChainA {
    server_info: ServerInfo,
    uid_learned: bool,
}

impl AuthChainA {
    pub fn new(server_info: ServerInfo) -> AuthChainA {
        AuthChainA {
            server_info,
            uid_learned: false,
        }
    }

    pub fn server_pre_encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    pub fn server_post_decrypt(&mut self, data: &[u8]) -> Result<(Vec<u8>, bool)> {
        if data.len() < 4 {
            return Err(DecorateError::Crypto(CryptoError::NeedsMoreInput));
        }

        let uid = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let payload = data[4..].to_vec();

        if !self.uid_learned {
            self.uid_learned = true;
            self.server_info.fire_update_user(uid);
        }

        Ok((payload, false))
    }

    pub fn server_udp_pre_encrypt(&mut self, data: &[u8], uid: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 4);
        out.extend_from_slice(&uid.to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    pub fn server_udp_post_decrypt(&mut self, data: &[u8]) -> Result<(Vec<u8>, u32)> {
        if data.len() < 4 {
            return Err(DecorateError::Crypto(CryptoError::ShortPacket { need: 4, got: data.len() }));
        }
        let uid = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        Ok((data[4..].to_vec(), uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_info::ServerInfoInner;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn learns_uid_from_first_decrypted_packet_and_fires_callback_once() {
        let info = ServerInfo::new(ServerInfoInner::default());
        let seen_count = Arc::new(AtomicU32::new(0));
        let seen_uid = Arc::new(AtomicU32::new(0));
        {
            let seen_count = seen_count.clone();
            let seen_uid = seen_uid.clone();
            info.set_update_user(move |uid| {
                seen_count.fetch_add(1, Ordering::SeqCst);
                seen_uid.store(uid, Ordering::SeqCst);
            });
        }

        let mut protocol = AuthChainA::new(info);
        let mut packet = 42u32.to_le_bytes().to_vec();
        packet.extend_from_slice(b"hello");
        let (plaintext, send_back) = protocol.server_post_decrypt(&packet).unwrap();

        assert_eq!(plaintext, b"hello");
        assert!(!send_back);
        assert_eq!(seen_uid.load(Ordering::SeqCst), 42);
        assert_eq!(seen_count.load(Ordering::SeqCst), 1);

        // A second packet must not fire the callback again.
        let mut packet2 = 99u32.to_le_bytes().to_vec();
        packet2.extend_from_slice(b"again");
        protocol.server_post_decrypt(&packet2).unwrap();
        assert_eq!(seen_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn short_packet_needs_more_input() {
        let mut protocol = AuthChainA::new(ServerInfo::new(ServerInfoInner::default()));
        assert!(matches!(
            protocol.server_post_decrypt(&[1, 2]),
            Err(DecorateError::Crypto(CryptoError::NeedsMoreInput))
        ));
    }

    #[test]
    fn udp_framing_roundtrips_uid() {
        let mut protocol = AuthChainA::new(ServerInfo::new(ServerInfoInner::default()));
        let wire = protocol.server_udp_pre_encrypt(b"dns", 7);
        let (payload, uid) = protocol.server_udp_post_decrypt(&wire).unwrap();
        assert_eq!(payload, b"dns");
        assert_eq!(uid, 7);
    }
}
