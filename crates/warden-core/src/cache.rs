//! Cache-class markers and the memo cache.
//!
//! Every response type declares a cache class through `CachePolicy`.
//! `MemoCache` only accepts values whose class implements `Cacheable`, so a
//! cache cannot be attached to an execution or mutation result:
//!
//! ```compile_fail
//! use warden_core::cache::{CachePolicy, MemoCache, NoCache};
//!
//! #[derive(Clone)]
//! struct ExecutionOutcome;
//! impl CachePolicy for ExecutionOutcome {
//!     type Class = NoCache;
//! }
//!
//! // NoCache is not Cacheable: this does not compile.
//! let _cache: MemoCache<String, ExecutionOutcome> = MemoCache::new();
//! ```

use std::{
    collections::HashMap,
    hash::Hash,
    sync::Mutex,
};

mod sealed {
    pub trait Sealed {}
}

/// A cache class. Sealed: only the three markers below exist.
pub trait CacheClass: sealed::Sealed {
    const NAME: &'static str;
}

/// Never cached. Executions and mutations.
#[derive(Debug, Clone, Copy)]
pub struct NoCache;

/// May be cached by a read-model layer. Paginated timeline and agent reads.
#[derive(Debug, Clone, Copy)]
pub struct ReadModelOnly;

/// Static metadata. Policy and view listings, version resolution.
#[derive(Debug, Clone, Copy)]
pub struct MetadataOnly;

impl sealed::Sealed for NoCache {}
impl sealed::Sealed for ReadModelOnly {}
impl sealed::Sealed for MetadataOnly {}

impl CacheClass for NoCache {
    const NAME: &'static str = "NONE";
}
impl CacheClass for ReadModelOnly {
    const NAME: &'static str = "READ_MODEL_ONLY";
}
impl CacheClass for MetadataOnly {
    const NAME: &'static str = "METADATA_ONLY";
}

/// Classes a cache may be attached to.
pub trait Cacheable: CacheClass {}

impl Cacheable for ReadModelOnly {}
impl Cacheable for MetadataOnly {}

/// Declares the cache class of a response type.
pub trait CachePolicy {
    type Class: CacheClass;
}

/// Name of the cache class of `T`, for logs and metric labels.
pub fn cache_class_name<T: CachePolicy>() -> &'static str {
    <T::Class as CacheClass>::NAME
}

/// Process-local memoization of cacheable values.
pub struct MemoCache<K, V>
where
    V: CachePolicy,
    V::Class: Cacheable,
{
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: CachePolicy + Clone,
    V::Class: Cacheable,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the memoized value for `key`, computing it with `f` on a miss.
    pub fn get_or_insert_with(&self, key: K, f: impl FnOnce() -> V) -> V {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.entry(key).or_insert_with(f).clone()
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with), but `f` may
    /// find nothing. Misses are not stored, so the cache only ever holds
    /// keys that produced a value.
    pub fn get_or_try_insert_with(&self, key: K, f: impl FnOnce() -> Option<V>) -> Option<V> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(value) = entries.get(&key) {
            return Some(value.clone());
        }
        let value = f()?;
        entries.insert(key, value.clone());
        Some(value)
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash,
    V: CachePolicy + Clone,
    V::Class: Cacheable,
{
    fn default() -> Self {
        Self::new()
    }
}
