//! AEAD codec (`spec.md` §4.4): length-framed sealed chunks over TCP.
//! Wire layout per direction: `[salt][ seal(n, len_be16) || seal(n+1, chunk) ]*`,
//! nonce advancing by 2 per fragment, fragments bounded by
//! [`MAX_CHUNK_SIZE`]. Partial socket reads accumulate in an internal
//! buffer until a full frame is available.

use rand::RngCore;

use crate::cipher::aead::AeadCipherState;
use crate::cipher::CipherKind;
use crate::error::{CryptoError, Result};
use crate::kdf::derive_aead_subkey;

/// 16 KiB minus AEAD tag overhead, per `spec.md` §4.4.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024;

struct Side {
    state: AeadCipherState,
}

pub struct AeadCodec {
    kind: CipherKind,
    master_key: Vec<u8>,
    encryptor: Option<Side>,
    decryptor: Option<Side>,
    recv_buf: Vec<u8>,
    peer_salt: Option<Vec<u8>>,
}

impl AeadCodec {
    pub fn new(kind: CipherKind, master_key: Vec<u8>) -> AeadCodec {
        AeadCodec {
            kind,
            master_key,
            encryptor: None,
            decryptor: None,
            recv_buf: Vec::new(),
            peer_salt: None,
        }
    }

    /// The peer's salt, once the first `decrypt` call has consumed it.
    pub fn peer_salt(&self) -> Option<&[u8]> {
        self.peer_salt.as_deref()
    }

    fn max_payload_per_chunk(&self) -> usize {
        MAX_CHUNK_SIZE - self.kind.tag_len()
    }

    /// Encrypt `plaintext`, prepending a fresh random salt on the first call.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(plaintext.len() + plaintext.len() / MAX_CHUNK_SIZE + 64);

        if self.encryptor.is_none() {
            let mut salt = vec![0u8; self.kind.iv_or_salt_len()];
            rand::thread_rng().fill_bytes(&mut salt);
            let subkey = derive_aead_subkey(&self.master_key, &salt, self.kind.key_len());
            self.encryptor = Some(Side {
                state: AeadCipherState::new(self.kind, &subkey),
            });
            out.extend_from_slice(&salt);
        }

        let side = self.encryptor.as_mut().unwrap();
        let max_payload = self.max_payload_per_chunk();

        for chunk in plaintext.chunks(max_payload.max(1)) {
            let mut len_buf = vec![(chunk.len() >> 8) as u8, chunk.len() as u8];
            side.state.seal(&mut len_buf);
            side.state.increment_nonce(1);
            out.extend_from_slice(&len_buf);

            let mut payload = chunk.to_vec();
            side.state.seal(&mut payload);
            side.state.increment_nonce(1);
            out.extend_from_slice(&payload);
        }

        out
    }

    /// Feed newly-read bytes in; returns the plaintext assembled from every
    /// complete frame seen so far. `Err(NeedsMoreInput)` when no frame
    /// completed and nothing could be decoded from this call.
    pub fn decrypt(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.recv_buf.extend_from_slice(input);

        if self.decryptor.is_none() {
            let salt_len = self.kind.iv_or_salt_len();
            if self.recv_buf.len() < salt_len {
                return Err(CryptoError::NeedsMoreInput);
            }
            let salt: Vec<u8> = self.recv_buf.drain(..salt_len).collect();
            let subkey = derive_aead_subkey(&self.master_key, &salt, self.kind.key_len());
            self.decryptor = Some(Side {
                state: AeadCipherState::new(self.kind, &subkey),
            });
            self.peer_salt = Some(salt);
        }

        let side = self.decryptor.as_mut().unwrap();
        let tag_len = self.kind.tag_len();
        let mut out = Vec::new();

        loop {
            let len_frame_size = 2 + tag_len;
            if self.recv_buf.len() < len_frame_size {
                break;
            }

            // Peeking the length does not mutate persistent nonce state (the
            // AEAD state only advances via explicit `increment_nonce`), so
            // it is safe to repeat this on the next call if the chunk body
            // has not fully arrived yet.
            let mut len_sealed = self.recv_buf[..len_frame_size].to_vec();
            side.state.open(&mut len_sealed)?;
            let chunk_len = ((len_sealed[0] as usize) << 8) | len_sealed[1] as usize;

            let frame_total = len_frame_size + chunk_len + tag_len;
            if self.recv_buf.len() < frame_total {
                break;
            }

            self.recv_buf.drain(..len_frame_size);
            side.state.increment_nonce(1);

            let mut chunk_sealed: Vec<u8> = self.recv_buf.drain(..chunk_len + tag_len).collect();
            side.state.open(&mut chunk_sealed)?;
            side.state.increment_nonce(1);

            out.extend_from_slice(&chunk_sealed);
        }

        if out.is_empty() {
            return Err(CryptoError::NeedsMoreInput);
        }
        Ok(out)
    }
}
