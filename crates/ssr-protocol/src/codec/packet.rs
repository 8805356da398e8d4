//! Packet codec (`spec.md` §4.5): UDP is stateless beyond the master key.
//! Every datagram carries its own salt/IV in the clear. AEAD nonce is
//! pinned at all-zero — this is the existing SSR wire rule (see Design
//! Notes / SPEC_FULL.md Open Questions) and must not be "fixed".

use rand::RngCore;

use crate::cipher::aead::AeadCipherState;
use crate::cipher::stream::{Direction, StreamCipherState};
use crate::cipher::CipherKind;
use crate::error::{CryptoError, Result};
use crate::kdf::derive_aead_subkey;

/// Encrypt one UDP datagram: `salt || seal(zero_nonce, plaintext)` for AEAD,
/// `iv || xor_keystream(plaintext)` for stream ciphers.
pub fn encrypt_packet(kind: CipherKind, master_key: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let mut prefix = vec![0u8; kind.iv_or_salt_len()];
    rand::thread_rng().fill_bytes(&mut prefix);

    let mut out = prefix.clone();

    match kind.category() {
        crate::cipher::CipherCategory::Stream => {
            let mut ks = StreamCipherState::new(kind, master_key, &prefix, Direction::Encrypt);
            let mut ciphertext = plaintext.to_vec();
            ks.apply_keystream(&mut ciphertext);
            out.extend_from_slice(&ciphertext);
        }
        crate::cipher::CipherCategory::Aead => {
            let subkey = derive_aead_subkey(master_key, &prefix, kind.key_len());
            let mut state = AeadCipherState::new(kind, &subkey);
            let mut sealed = plaintext.to_vec();
            state.seal(&mut sealed);
            out.extend_from_slice(&sealed);
        }
    }

    out
}

/// Decrypt one UDP datagram. Malformed/undersized datagrams return
/// `ShortPacket`; AEAD tag mismatches return `DecryptFailure`. Neither is
/// fatal to the listener — the caller logs and drops the packet.
pub fn decrypt_packet(kind: CipherKind, master_key: &[u8], datagram: &[u8]) -> Result<Vec<u8>> {
    let prefix_len = kind.iv_or_salt_len();
    if datagram.len() < prefix_len {
        return Err(CryptoError::ShortPacket { need: prefix_len, got: datagram.len() });
    }

    let prefix = &datagram[..prefix_len];
    let body = &datagram[prefix_len..];

    match kind.category() {
        crate::cipher::CipherCategory::Stream => {
            let mut ks = StreamCipherState::new(kind, master_key, prefix, Direction::Decrypt);
            let mut plaintext = body.to_vec();
            ks.apply_keystream(&mut plaintext);
            Ok(plaintext)
        }
        crate::cipher::CipherCategory::Aead => {
            if body.len() < kind.tag_len() {
                return Err(CryptoError::ShortPacket { need: kind.tag_len(), got: body.len() });
            }
            let subkey = derive_aead_subkey(master_key, prefix, kind.key_len());
            let mut state = AeadCipherState::new(kind, &subkey);
            let mut sealed = body.to_vec();
            state.open(&mut sealed)?;
            Ok(sealed)
        }
    }
}
