//! SSR decorator (`spec.md` §4.8): the ordered composition of
//! obfuscation, encryption, and sub-protocol plugins, plus buffering,
//! accounting, and the optional rate limiter.
//!
//! Grounded on `examples/original_source/common/network/decorate.go`
//! (`ShadowsocksRDecorate.Read`/`Write`/`ReadFrom`/`WriteTo`), realized as
//! buffer-transform calls driven by an async read/write loop rather than
//! Go's blocking `net.Conn`, matching the teacher's `CryptoStream`
//! suspend-on-`Poll::Pending` pattern (`crates/ssr-protocol` codecs are
//! pure data transforms; this module is where the socket I/O lives).

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use ssr_protocol::codec::aead::AeadCodec;
use ssr_protocol::codec::stream::StreamCodec;
use ssr_protocol::{CipherCategory, CipherKind, CryptoError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;

use crate::copy::{AsyncCopyRead, AsyncCopyWrite, BoxFuture};
use crate::error::{DecorateError, Result};
use crate::obfs::ObfsKind;
use crate::protocol::ProtocolKind;
use crate::server_info::ServerInfo;
use crate::traffic::TrafficReporter;

const READ_CHUNK_SIZE: usize = 4 * 1024;

pub enum EncryptionCodec {
    Stream(StreamCodec),
    Aead(AeadCodec),
}

impl EncryptionCodec {
    pub fn new(kind: CipherKind, key: Vec<u8>) -> EncryptionCodec {
        match kind.category() {
            CipherCategory::Stream => EncryptionCodec::Stream(StreamCodec::new(kind, key)),
            CipherCategory::Aead => EncryptionCodec::Aead(AeadCodec::new(kind, key)),
        }
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        match self {
            EncryptionCodec::Stream(c) => c.encrypt(plaintext),
            EncryptionCodec::Aead(c) => c.encrypt(plaintext),
        }
    }

    fn decrypt(&mut self, input: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
        match self {
            EncryptionCodec::Stream(c) => c.decrypt(input),
            EncryptionCodec::Aead(c) => c.decrypt(input),
        }
    }

    /// The peer's IV/salt, once observed — fed into `ServerInfo::set_recv_iv_if_unset`.
    fn peer_iv(&self) -> Option<&[u8]> {
        match self {
            EncryptionCodec::Stream(c) => c.peer_iv(),
            EncryptionCodec::Aead(c) => c.peer_salt(),
        }
    }
}

/// Per-connection composition of obfuscation + encryption + sub-protocol,
/// driving one underlying socket. One decorator exclusively owns its
/// plugins and codec, per `spec.md` §3 "Ownership".
pub struct Decorator<S> {
    stream: S,
    obfs: ObfsKind,
    protocol: ProtocolKind,
    encryption: EncryptionCodec,
    server_info: ServerInfo,
    recv_spill: Vec<u8>,
    upload: AtomicU64,
    download: AtomicU64,
    uid: Arc<AtomicU32>,
    reporter: Arc<dyn TrafficReporter>,
}

impl<S> Decorator<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `single`: single-user mode wires the sub-protocol plugin's learned
    /// UID (fired through `ServerInfo::fire_update_user`, see
    /// `protocol::auth_chain_a`) straight into this decorator's UID,
    /// mirroring the Go original's `serverInfo.SetUpdateUserFunc(ssrd.UpdateUser)`.
    /// Multi-user mode instead fixes the UID at construction (the port
    /// the user connected on, in the Go original).
    pub fn new(
        stream: S,
        obfs: ObfsKind,
        protocol: ProtocolKind,
        encryption: EncryptionCodec,
        server_info: ServerInfo,
        single: bool,
        initial_uid: u32,
        reporter: Arc<dyn TrafficReporter>,
    ) -> Decorator<S> {
        let uid = Arc::new(AtomicU32::new(initial_uid));

        if single {
            let uid_handle = uid.clone();
            server_info.set_update_user(move |learned| uid_handle.store(learned, Ordering::Relaxed));
        }

        Decorator {
            stream,
            obfs,
            protocol,
            encryption,
            server_info,
            recv_spill: Vec::new(),
            upload: AtomicU64::new(0),
            download: AtomicU64::new(0),
            uid,
            reporter,
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid.load(Ordering::Relaxed)
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.download.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn flush_upload_if_uid_known(&self) {
        let uid = self.uid.load(Ordering::Relaxed);
        if uid == 0 {
            return;
        }
        let pending = self.upload.swap(0, Ordering::AcqRel);
        if pending != 0 {
            self.reporter.upload(uid, pending);
        }
    }

    fn flush_download_if_uid_known(&self) {
        let uid = self.uid.load(Ordering::Relaxed);
        if uid == 0 {
            return;
        }
        let pending = self.download.swap(0, Ordering::AcqRel);
        if pending != 0 {
            self.reporter.download(uid, pending);
        }
    }

    /// Read pipeline (`spec.md` §4.8 steps 1-10). Loops in place of the Go
    /// original's recursion: both "send-back" and "needs more input"
    /// outcomes go back to step 1 without returning to the caller.
    pub async fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        loop {
            if !self.recv_spill.is_empty() {
                return Ok(self.drain_spill_into(out));
            }

            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(0);
            }
            self.upload.fetch_add(n as u64, Ordering::Relaxed);
            let chunk = &buf[..n];

            let decoded = self.obfs.server_decode(chunk)?;

            if decoded.need_send_back {
                let reply = self.obfs.server_encode(&[]);
                self.write_raw(&reply).await?;
                continue;
            }

            let data = if decoded.need_decrypt {
                match self.encryption.decrypt(&decoded.data) {
                    Ok(plaintext) => {
                        if let Some(iv) = self.encryption.peer_iv() {
                            self.server_info.set_recv_iv_if_unset(iv);
                        }
                        plaintext
                    }
                    Err(CryptoError::NeedsMoreInput) => continue,
                    Err(e) => return Err(DecorateError::Crypto(e)),
                }
            } else {
                decoded.data
            };

            let (data, send_back) = match self.protocol.server_post_decrypt(&data) {
                Ok(v) => v,
                Err(DecorateError::Crypto(CryptoError::NeedsMoreInput)) => continue,
                Err(e) => return Err(e),
            };

            if send_back {
                let pre = self.protocol.server_pre_encrypt(&[]);
                let encrypted = self.encryption.encrypt(&pre);
                let encoded = self.obfs.server_encode(&encrypted);
                self.write_raw(&encoded).await?;
            }

            self.flush_upload_if_uid_known();

            if data.is_empty() && self.recv_spill.is_empty() {
                return Ok(0);
            }

            self.recv_spill.extend_from_slice(&data);
            return Ok(self.drain_spill_into(out));
        }
    }

    fn drain_spill_into(&mut self, out: &mut [u8]) -> usize {
        let take = out.len().min(self.recv_spill.len());
        out[..take].copy_from_slice(&self.recv_spill[..take]);
        self.recv_spill.drain(..take);
        take
    }

    /// Write pipeline (`spec.md` §4.8 "Write pipeline").
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let data = self.protocol.server_pre_encrypt(buf);
        let data = self.encryption.encrypt(&data);
        let data = self.obfs.server_encode(&data);
        self.stream.write_all(&data).await?;
        self.download.fetch_add(data.len() as u64, Ordering::Relaxed);
        self.flush_download_if_uid_known();
        Ok(buf.len())
    }
}

/// Split a decorator into read/write halves sharing one instance behind
/// a mutex, so [`crate::copy::duplex_copy`] can drive the two directions
/// from separate tasks. `Decorator` owns its socket exclusively
/// (`spec.md` §3 "Ownership") and was never meant to support truly
/// concurrent reads and writes; the mutex means whichever direction gets
/// there first runs to its next yield point while the other waits its
/// turn, rather than the two running in parallel.
pub fn split_decorator<S>(decorator: Decorator<S>) -> (DecoratorReadHalf<S>, DecoratorWriteHalf<S>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let shared = Arc::new(AsyncMutex::new(decorator));
    (DecoratorReadHalf { shared: shared.clone() }, DecoratorWriteHalf { shared })
}

pub struct DecoratorReadHalf<S> {
    shared: Arc<AsyncMutex<Decorator<S>>>,
}

pub struct DecoratorWriteHalf<S> {
    shared: Arc<AsyncMutex<Decorator<S>>>,
}

fn decorate_err_to_io(e: DecorateError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e)
}

impl<S> AsyncCopyRead for DecoratorReadHalf<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> BoxFuture<'a, std::io::Result<usize>> {
        Box::pin(async move {
            let mut guard = self.shared.lock().await;
            guard.read(buf).await.map_err(decorate_err_to_io)
        })
    }
}

impl<S> AsyncCopyWrite for DecoratorWriteHalf<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, std::io::Result<()>> {
        Box::pin(async move {
            let mut guard = self.shared.lock().await;
            guard.write(buf).await.map(|_| ()).map_err(decorate_err_to_io)
        })
    }

    fn flush<'a>(&'a mut self) -> BoxFuture<'a, std::io::Result<()>> {
        Box::pin(async move { Ok(()) })
    }
}
