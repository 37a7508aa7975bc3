//! Share-once memoisation of pending results.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use ds_core::Result;

use crate::Results;

pub(crate) type SharedResults = Shared<BoxFuture<'static, Result<Results>>>;

/// Pending or finished results keyed by request. Every caller of a key
/// awaits the same future; a future that fails is forgotten.
pub(crate) struct Memo<K> {
    entries: Mutex<HashMap<K, SharedResults>>,
}

impl<K: Eq + Hash + Copy + Debug> Memo<K> {
    pub(crate) fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// The stored future for `key`, building and storing one with `make` on
    /// a miss. `make` runs under the lock, so concurrent callers for one key
    /// never both build; it must not touch this memo.
    pub(crate) fn get_or_insert_with(
        &self,
        key: K,
        make: impl FnOnce() -> BoxFuture<'static, Result<Results>>,
    ) -> SharedResults {
        self.entries.lock().expect("memo mutex poisoned").entry(key).or_insert_with(|| make().shared()).clone()
    }

    /// Await `future` (stored under `key`), evicting it if it failed.
    pub(crate) async fn resolve(&self, key: K, future: SharedResults) -> Result<Results> {
        let out = future.clone().await;
        if let Err(e) = &out {
            let mut entries = self.entries.lock().expect("memo mutex poisoned");
            if entries.get(&key).is_some_and(|f| f.ptr_eq(&future)) {
                entries.remove(&key);
                tracing::debug!(?key, error = %e, "evicted failed result");
            }
        }
        out
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("memo mutex poisoned").len()
    }
}
