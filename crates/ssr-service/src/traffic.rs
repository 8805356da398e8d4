//! Traffic reporting and user-store refresh (`SPEC_FULL.md` §6
//! supplement). The Go original's `common.TrafficReport` interface is
//! consulted from the decorator whenever an upload/download counter is
//! flushed; its HTTP-backed implementation is out of scope per
//! `spec.md` §1, so this module only defines the trait surface plus
//! in-memory reference implementations used by tests.

use std::collections::HashMap;
use std::sync::Mutex;

pub trait TrafficReporter: Send + Sync {
    fn upload(&self, uid: u32, bytes: u64);
    fn download(&self, uid: u32, bytes: u64);
}

pub struct NullReporter;

impl TrafficReporter for NullReporter {
    fn upload(&self, _uid: u32, _bytes: u64) {}
    fn download(&self, _uid: u32, _bytes: u64) {}
}

#[derive(Default)]
pub struct InMemoryReporter {
    uploaded: Mutex<HashMap<u32, u64>>,
    downloaded: Mutex<HashMap<u32, u64>>,
}

impl InMemoryReporter {
    pub fn new() -> InMemoryReporter {
        InMemoryReporter::default()
    }

    pub fn uploaded_bytes(&self, uid: u32) -> u64 {
        *self.uploaded.lock().unwrap().get(&uid).unwrap_or(&0)
    }

    pub fn downloaded_bytes(&self, uid: u32) -> u64 {
        *self.downloaded.lock().unwrap().get(&uid).unwrap_or(&0)
    }
}

impl TrafficReporter for InMemoryReporter {
    fn upload(&self, uid: u32, bytes: u64) {
        *self.uploaded.lock().unwrap().entry(uid).or_insert(0) += bytes;
    }

    fn download(&self, uid: u32, bytes: u64) {
        *self.downloaded.lock().unwrap().entry(uid).or_insert(0) += bytes;
    }
}

/// Multi-user password lookup, refreshed out-of-band by an external
/// collaborator (e.g. a periodic HTTP poll); the core only reads it.
pub trait UserStore: Send + Sync {
    fn password_for(&self, user_key: &str) -> Option<String>;
}

#[derive(Default)]
pub struct StaticUserStore {
    users: HashMap<String, String>,
}

impl StaticUserStore {
    pub fn new(users: HashMap<String, String>) -> StaticUserStore {
        StaticUserStore { users }
    }
}

impl UserStore for StaticUserStore {
    fn password_for(&self, user_key: &str) -> Option<String> {
        self.users.get(user_key).cloned()
    }
}
