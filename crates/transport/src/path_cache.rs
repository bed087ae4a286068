//! Bounded memo of recent path queries.
//!
//! Entries remember the topology version they were computed against. A
//! network rebuild bumps the cache's version, which invalidates every entry
//! at once without sweeping them; stale entries are dropped lazily when
//! looked up or evicted.

use std::collections::HashMap;

use crate::grid::TilePos;
use crate::pathfinding_sys::Path;

#[derive(Debug, Clone)]
struct CacheEntry {
    path: Path,
    inserted_tick: u64,
    topology_version: u64,
    /// Insertion order, breaks ties between entries from the same tick.
    seq: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone)]
pub struct PathCache {
    entries: HashMap<(TilePos, TilePos), CacheEntry>,
    capacity: usize,
    max_age_ticks: u64,
    topology_version: u64,
    next_seq: u64,
    stats: PathCacheStats,
}

impl PathCache {
    pub fn new(capacity: usize, max_age_ticks: u64) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            max_age_ticks,
            topology_version: 0,
            next_seq: 0,
            stats: PathCacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    pub fn stats(&self) -> PathCacheStats {
        self.stats
    }

    /// Apply new limits. Shrinking evicts oldest entries down to the new size.
    pub fn configure(&mut self, capacity: usize, max_age_ticks: u64) {
        self.capacity = capacity.max(1);
        self.max_age_ticks = max_age_ticks;
        while self.entries.len() > self.capacity {
            self.evict_oldest();
        }
    }

    /// Invalidate every entry computed against an older topology.
    pub fn bump_topology_version(&mut self) {
        self.topology_version = self.topology_version.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn is_valid(&self, entry: &CacheEntry, current_tick: u64) -> bool {
        entry.topology_version == self.topology_version
            && current_tick.saturating_sub(entry.inserted_tick) <= self.max_age_ticks
    }

    /// Look up a cached path. Expired or outdated entries count as misses
    /// and are dropped.
    pub fn get(&mut self, start: TilePos, goal: TilePos, current_tick: u64) -> Option<Path> {
        let key = (start, goal);
        let valid = match self.entries.get(&key) {
            Some(entry) => self.is_valid(entry, current_tick),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };
        if !valid {
            self.entries.remove(&key);
            self.stats.misses += 1;
            return None;
        }
        self.stats.hits += 1;
        self.entries.get(&key).map(|e| e.path.clone())
    }

    pub fn insert(&mut self, start: TilePos, goal: TilePos, path: Path, current_tick: u64) {
        let key = (start, goal);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.next_seq += 1;
        self.entries.insert(
            key,
            CacheEntry {
                path,
                inserted_tick: current_tick,
                topology_version: self.topology_version,
                seq: self.next_seq,
            },
        );
    }

    /// Drop entries from older topologies if there are any, otherwise the
    /// oldest entry.
    fn evict_oldest(&mut self) {
        let version = self.topology_version;
        let before = self.entries.len();
        self.entries.retain(|_, e| e.topology_version == version);
        let stale = before - self.entries.len();
        if stale > 0 {
            self.stats.evictions += stale as u64;
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.inserted_tick, e.seq))
            .map(|(k, _)| *k);
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}
