//! `ServerInfo` (`spec.md` §3, Design Notes "Cyclic references"): an
//! immutable-after-construction record shared between the decorator and
//! each plugin instance. The Go original passes plugins an interface that
//! both reads and writes back (`SetRecvIv`), which in Go is a second
//! aliasing pointer into the same struct; here that is realized as a
//! plain `Arc<Mutex<ServerInfoInner>>` clone handed to each plugin at
//! construction, with getters/setters instead of shared mutable access.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

pub const DEFAULT_HEAD_LEN: usize = 30;
pub const TCP_MSS: usize = 1460;
pub const BUF_SIZE: usize = 32 * 1024;

#[derive(Clone, Default)]
pub struct ServerInfoInner {
    pub host: String,
    pub port: u16,
    pub client: Option<IpAddr>,
    pub client_port: u16,
    pub iv: Vec<u8>,
    pub recv_iv: Vec<u8>,
    pub key: Vec<u8>,
    pub key_str: String,
    pub head_len: usize,
    pub tcp_mss: usize,
    pub buffer_size: usize,
    pub overhead: usize,
    pub obfs_param: String,
    pub protocol_param: String,
    pub users: HashMap<String, String>,
    /// Fired by a sub-protocol plugin once it learns the session's UID
    /// (single-user mode: from the first decrypted packet). Mirrors the
    /// Go original's `SetUpdateUserFunc(ssrd.UpdateUser)`.
    pub update_user: Option<Arc<dyn Fn(u32) + Send + Sync>>,
}

impl fmt::Debug for ServerInfoInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerInfoInner")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("head_len", &self.head_len)
            .field("overhead", &self.overhead)
            .finish_non_exhaustive()
    }
}

/// Cheaply-cloneable handle shared between the decorator and its plugins.
#[derive(Clone)]
pub struct ServerInfo(Arc<Mutex<ServerInfoInner>>);

impl ServerInfo {
    pub fn new(inner: ServerInfoInner) -> ServerInfo {
        ServerInfo(Arc::new(Mutex::new(inner)))
    }

    pub fn recv_iv(&self) -> Vec<u8> {
        self.0.lock().unwrap().recv_iv.clone()
    }

    /// Only sets the recv IV the first time it's observed, mirroring the Go
    /// original's `if RecvIv == nil || len(RecvIv) == 0` guard.
    pub fn set_recv_iv_if_unset(&self, iv: &[u8]) {
        let mut inner = self.0.lock().unwrap();
        if inner.recv_iv.is_empty() {
            inner.recv_iv = iv.to_vec();
        }
    }

    pub fn set_iv(&self, iv: Vec<u8>) {
        self.0.lock().unwrap().iv = iv;
    }

    pub fn key(&self) -> Vec<u8> {
        self.0.lock().unwrap().key.clone()
    }

    pub fn overhead(&self) -> usize {
        self.0.lock().unwrap().overhead
    }

    pub fn set_overhead(&self, overhead: usize) {
        self.0.lock().unwrap().overhead = overhead;
    }

    pub fn buffer_size(&self) -> usize {
        self.0.lock().unwrap().buffer_size
    }

    pub fn users(&self) -> HashMap<String, String> {
        self.0.lock().unwrap().users.clone()
    }

    pub fn obfs_param(&self) -> String {
        self.0.lock().unwrap().obfs_param.clone()
    }

    pub fn protocol_param(&self) -> String {
        self.0.lock().unwrap().protocol_param.clone()
    }

    pub fn set_update_user(&self, f: impl Fn(u32) + Send + Sync + 'static) {
        self.0.lock().unwrap().update_user = Some(Arc::new(f));
    }

    pub fn fire_update_user(&self, uid: u32) {
        let callback = self.0.lock().unwrap().update_user.clone();
        if let Some(callback) = callback {
            callback(uid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_iv_is_sticky_once_set() {
        let info = ServerInfo::new(ServerInfoInner::default());
        info.set_recv_iv_if_unset(&[1, 2, 3]);
        info.set_recv_iv_if_unset(&[9, 9, 9]);
        assert_eq!(info.recv_iv(), vec![1, 2, 3]);
    }

    #[test]
    fn clones_share_the_same_backing_state() {
        let info = ServerInfo::new(ServerInfoInner::default());
        let clone = info.clone();
        clone.set_overhead(42);
        assert_eq!(info.overhead(), 42);
    }

    #[test]
    fn update_user_callback_fires_with_the_learned_uid() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let info = ServerInfo::new(ServerInfoInner::default());
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();
        info.set_update_user(move |uid| seen_clone.store(uid, Ordering::SeqCst));
        info.fire_update_user(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }
}
