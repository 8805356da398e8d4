//! Stream cipher keystream factory (`spec.md` §4.2, §4.3).
//!
//! `aes-*-cfb` is implemented directly against the `aes` crate's block
//! cipher (CFB-128, full-block feedback, matching OpenSSL's `aes-*-cfb`
//! used by the legacy Shadowsocks wire format) rather than through the
//! `cfb-mode` crate, since the encrypt/decrypt feedback registers differ
//! and the core needs both directions driven explicitly. `aes-*-ctr` and
//! `chacha20` reuse the `ctr` and `chacha20` crates' `StreamCipher` impls
//! directly, as `examples/other_examples` shows other Rust shadowsocks
//! ports doing for AEAD (`aes_gcm::Aes256Gcm::new_from_slice`, here the
//! stream-cipher analogue).

use aes::cipher::{BlockEncrypt, KeyInit};
use chacha20::ChaCha20Legacy;
use cipher::{KeyIvInit, StreamCipher as RcStreamCipher};
use ctr::{Ctr128BE, Ctr192BE, Ctr256BE};

use crate::cipher::CipherKind;

/// Which direction a keystream was constructed for. CFB's feedback
/// register is fed from the ciphertext either produced (encrypt) or
/// consumed (decrypt), so the two directions are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

enum AesBlock {
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
}

impl AesBlock {
    fn new(kind: CipherKind, key: &[u8]) -> AesBlock {
        match kind {
            CipherKind::Aes128Cfb => AesBlock::Aes128(aes::Aes128::new_from_slice(key).expect("key length checked by registry")),
            CipherKind::Aes192Cfb => AesBlock::Aes192(aes::Aes192::new_from_slice(key).expect("key length checked by registry")),
            CipherKind::Aes256Cfb => AesBlock::Aes256(aes::Aes256::new_from_slice(key).expect("key length checked by registry")),
            _ => unreachable!("AesBlock is only constructed for CFB variants"),
        }
    }

    fn encrypt_block(&self, block: &mut [u8; 16]) {
        use aes::cipher::generic_array::GenericArray;
        let ga = GenericArray::from_mut_slice(block);
        match self {
            AesBlock::Aes128(c) => c.encrypt_block(ga),
            AesBlock::Aes192(c) => c.encrypt_block(ga),
            AesBlock::Aes256(c) => c.encrypt_block(ga),
        }
    }
}

struct AesCfb {
    block: AesBlock,
    /// The register AES is run over to derive the keystream for the
    /// *current* block: the previous block's true ciphertext, or the IV
    /// for the first block. Only advances once `pos` reaches 16.
    feedback: [u8; 16],
    /// Keystream for the in-progress block, derived from `feedback` when
    /// `pos` was last 0. Stays valid across calls that stop mid-block.
    keystream: [u8; 16],
    /// Ciphertext bytes produced/consumed so far for the in-progress block.
    block_buf: [u8; 16],
    /// Position within the in-progress block, 0..=16.
    pos: usize,
    direction: Direction,
}

impl AesCfb {
    fn new(kind: CipherKind, key: &[u8], iv: &[u8], direction: Direction) -> AesCfb {
        let mut feedback = [0u8; 16];
        feedback.copy_from_slice(&iv[..16]);
        AesCfb {
            block: AesBlock::new(kind, key),
            feedback,
            keystream: [0u8; 16],
            block_buf: [0u8; 16],
            pos: 0,
            direction,
        }
    }

    /// CFB-128, one byte at a time so a call that stops mid-block leaves
    /// correct state for the next call: the keystream for a block is
    /// derived from `feedback` exactly once, when `pos` is 0, and
    /// `feedback` only advances to the true ciphertext block once all 16
    /// of its bytes have actually been produced/consumed.
    fn apply(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            if self.pos == 0 {
                self.keystream = self.feedback;
                self.block.encrypt_block(&mut self.keystream);
            }

            let ciphertext_byte = match self.direction {
                Direction::Encrypt => {
                    let ct = *byte ^ self.keystream[self.pos];
                    *byte = ct;
                    ct
                }
                Direction::Decrypt => {
                    let ct = *byte;
                    *byte ^= self.keystream[self.pos];
                    ct
                }
            };

            self.block_buf[self.pos] = ciphertext_byte;
            self.pos += 1;

            if self.pos == 16 {
                self.feedback = self.block_buf;
                self.pos = 0;
            }
        }
    }
}

enum CtrVariant {
    Aes128(Ctr128BE<aes::Aes128>),
    Aes192(Ctr192BE<aes::Aes192>),
    Aes256(Ctr256BE<aes::Aes256>),
}

/// Per-session stream-cipher keystream state, one per direction per connection.
pub enum StreamCipherState {
    Cfb(AesCfb),
    Ctr(CtrVariant),
    Chacha20(ChaCha20Legacy),
}

impl StreamCipherState {
    pub fn new(kind: CipherKind, key: &[u8], iv: &[u8], direction: Direction) -> StreamCipherState {
        match kind {
            CipherKind::Aes128Cfb | CipherKind::Aes192Cfb | CipherKind::Aes256Cfb => {
                StreamCipherState::Cfb(AesCfb::new(kind, key, iv, direction))
            }
            CipherKind::Aes128Ctr => {
                StreamCipherState::Ctr(CtrVariant::Aes128(Ctr128BE::new(key.into(), iv.into())))
            }
            CipherKind::Aes192Ctr => {
                StreamCipherState::Ctr(CtrVariant::Aes192(Ctr192BE::new(key.into(), iv.into())))
            }
            CipherKind::Aes256Ctr => {
                StreamCipherState::Ctr(CtrVariant::Aes256(Ctr256BE::new(key.into(), iv.into())))
            }
            CipherKind::Chacha20 => StreamCipherState::Chacha20(ChaCha20Legacy::new(key.into(), iv.into())),
            CipherKind::Aes128Gcm | CipherKind::Aes192Gcm | CipherKind::Aes256Gcm => {
                unreachable!("AEAD kinds never construct a StreamCipherState")
            }
        }
    }

    /// XOR `buf` in place with the next `buf.len()` keystream bytes.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        match self {
            StreamCipherState::Cfb(c) => c.apply(buf),
            StreamCipherState::Ctr(CtrVariant::Aes128(c)) => c.apply_keystream(buf),
            StreamCipherState::Ctr(CtrVariant::Aes192(c)) => c.apply_keystream(buf),
            StreamCipherState::Ctr(CtrVariant::Aes256(c)) => c.apply_keystream(buf),
            StreamCipherState::Chacha20(c) => c.apply_keystream(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::derive_master_key;

    fn roundtrip(kind: CipherKind) {
        let key = derive_master_key("roundtrip-pw", kind.key_len());
        let mut iv = vec![0u8; kind.iv_or_salt_len()];
        for (i, b) in iv.iter_mut().enumerate() {
            *b = i as u8;
        }

        let plaintext = b"the quick brown fox jumps over the lazy dog, 1234567890!!".to_vec();

        let mut enc = StreamCipherState::new(kind, &key, &iv, Direction::Encrypt);
        let mut ciphertext = plaintext.clone();
        enc.apply_keystream(&mut ciphertext);
        assert_ne!(ciphertext, plaintext);

        let mut dec = StreamCipherState::new(kind, &key, &iv, Direction::Decrypt);
        let mut recovered = ciphertext.clone();
        dec.apply_keystream(&mut recovered);
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn cfb_roundtrips() {
        roundtrip(CipherKind::Aes128Cfb);
        roundtrip(CipherKind::Aes192Cfb);
        roundtrip(CipherKind::Aes256Cfb);
    }

    #[test]
    fn ctr_roundtrips() {
        roundtrip(CipherKind::Aes128Ctr);
        roundtrip(CipherKind::Aes192Ctr);
        roundtrip(CipherKind::Aes256Ctr);
    }

    #[test]
    fn chacha20_roundtrips() {
        roundtrip(CipherKind::Chacha20);
    }

    #[test]
    fn cfb_handles_partial_final_block_across_calls() {
        let key = derive_master_key("split-pw", 16);
        let iv = vec![7u8; 16];
        let plaintext = b"exactly seventeen".to_vec(); // 17 bytes: one full block + 1 byte

        let mut enc = StreamCipherState::new(CipherKind::Aes128Cfb, &key, &iv, Direction::Encrypt);
        let mut whole = plaintext.clone();
        enc.apply_keystream(&mut whole);

        // Encrypt the same plaintext split across two calls and check it matches.
        let mut enc2 = StreamCipherState::new(CipherKind::Aes128Cfb, &key, &iv, Direction::Encrypt);
        let mut split = plaintext.clone();
        let (a, b) = split.split_at_mut(16);
        enc2.apply_keystream(a);
        enc2.apply_keystream(b);

        assert_eq!(whole, split);
    }

    #[test]
    fn cfb_matches_single_call_when_split_at_non_block_aligned_offsets() {
        let key = derive_master_key("split-pw-2", 16);
        let iv = vec![3u8; 16];
        let plaintext = b"0123456789a".to_vec(); // 11 bytes, both splits land mid-block

        let mut enc = StreamCipherState::new(CipherKind::Aes128Cfb, &key, &iv, Direction::Encrypt);
        let mut whole = plaintext.clone();
        enc.apply_keystream(&mut whole);

        let mut enc2 = StreamCipherState::new(CipherKind::Aes128Cfb, &key, &iv, Direction::Encrypt);
        let mut split = plaintext.clone();
        let (a, b) = split.split_at_mut(5);
        enc2.apply_keystream(a);
        enc2.apply_keystream(b);

        assert_eq!(whole, split, "5+6-byte split must produce the same ciphertext as one 11-byte call");

        // And the split ciphertext must still decrypt correctly when fed
        // to a decryptor in the same two uneven chunks.
        let mut dec = StreamCipherState::new(CipherKind::Aes128Cfb, &key, &iv, Direction::Decrypt);
        let mut recovered = split;
        let (a, b) = recovered.split_at_mut(5);
        dec.apply_keystream(a);
        dec.apply_keystream(b);
        assert_eq!(recovered.to_vec(), plaintext);
    }
}
