//! Fingerprint cache of compiled handler descriptors.
//!
//! Maps the fingerprint of a source program to the descriptor compiled from
//! it. Concurrent callers with the same source converge on one descriptor:
//! compilation happens outside any map lock and the first insert wins.

use crate::compiler::{CompiledHandler, GlueCompiler, HandlerCompiler};
use crate::error::GlueResult;
use crate::fingerprint::Fingerprint;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct CacheEntry {
    handler: Arc<CompiledHandler>,
    last_used: AtomicU64,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful compilations, including ones that lost an insert race.
    pub compilations: u64,
    /// Descriptors dropped because another caller inserted first.
    pub discarded: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
    discarded: AtomicU64,
    evictions: AtomicU64,
}

/// Shared fingerprint cache. Cheap to share behind an `Arc`.
pub struct HandlerCache {
    compiler: Arc<dyn HandlerCompiler>,
    entries: DashMap<Fingerprint, CacheEntry>,
    /// Maximum number of descriptors before LRU eviction; `None` is unbounded.
    max_entries: Option<usize>,
    clock: AtomicU64,
    counters: Counters,
}

impl HandlerCache {
    /// Unbounded cache over the glue compiler.
    pub fn new() -> Self {
        Self::with_compiler(Arc::new(GlueCompiler::new()))
    }

    pub fn with_compiler(compiler: Arc<dyn HandlerCompiler>) -> Self {
        Self {
            compiler,
            entries: DashMap::new(),
            max_entries: None,
            clock: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    /// Bound the cache to `max_entries` descriptors. Zero means unbounded.
    pub fn with_capacity_limit(mut self, max_entries: usize) -> Self {
        self.max_entries = (max_entries > 0).then_some(max_entries);
        self
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Return the descriptor for `source`, compiling it on first use.
    ///
    /// Compile failures are returned and never cached.
    pub fn get_or_compile(&self, source: &str) -> GlueResult<Arc<CompiledHandler>> {
        let fingerprint = Fingerprint::of(source);

        if let Some(entry) = self.entries.get(&fingerprint) {
            entry.last_used.store(self.tick(), Ordering::Relaxed);
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("handler cache hit {}", fingerprint.short());
            return Ok(Arc::clone(&entry.handler));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(self.compiler.compile(source)?);
        self.counters.compilations.fetch_add(1, Ordering::Relaxed);

        let (handler, inserted) = match self.entries.entry(fingerprint) {
            Entry::Occupied(existing) => {
                self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "handler {} compiled concurrently, keeping the first",
                    fingerprint.short()
                );
                (Arc::clone(&existing.get().handler), false)
            }
            Entry::Vacant(slot) => {
                slot.insert(CacheEntry {
                    handler: Arc::clone(&compiled),
                    last_used: AtomicU64::new(self.tick()),
                });
                (compiled, true)
            }
        };

        if inserted {
            self.evict_overflow(fingerprint);
        }
        Ok(handler)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(&Fingerprint::of(source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            compilations: self.counters.compilations.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Evict least-recently-used descriptors until the bound holds.
    /// `keep` (the entry just inserted) is never chosen.
    fn evict_overflow(&self, keep: Fingerprint) {
        let Some(max) = self.max_entries else {
            return;
        };
        while self.entries.len() > max {
            let victim = self
                .entries
                .iter()
                .filter(|e| *e.key() != keep)
                .min_by_key(|e| e.value().last_used.load(Ordering::Relaxed))
                .map(|e| *e.key());
            let Some(victim) = victim else {
                break;
            };
            if self.entries.remove(&victim).is_some() {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("evicting LRU handler {}", victim.short());
            }
        }
    }
}

impl Default for HandlerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCache")
            .field("len", &self.len())
            .field("max_entries", &self.max_entries)
            .field("stats", &self.stats())
            .finish()
    }
}
