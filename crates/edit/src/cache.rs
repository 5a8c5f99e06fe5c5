use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::segment::ClipId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct WaveformKey {
    clip: ClipId,
    track: usize,
}

/// Rendered audio peaks for one clip on one track.
///
/// Peaks are sized for the track they were rendered on, which is why a
/// clip moving to another track invalidates its entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub levels: Arc<[f32]>,
}

/// LRU cache of waveform peaks keyed by clip and track.
///
/// Waveform generation happens outside this crate; the edit engine only
/// stores results and evicts them when a move makes them wrong-sized.
///
/// # Example
/// ```
/// use std::sync::Arc;
///
/// use edit::cache::{Waveform, WaveformCache};
///
/// let mut cache = WaveformCache::new(64);
/// cache.insert(7, 1, Waveform { levels: Arc::from(vec![0.0; 16]) });
///
/// assert!(cache.get(7, 1).is_some());
/// cache.evict_clips(&[7], 1);
/// assert!(cache.get(7, 1).is_none());
/// ```
#[derive(Debug)]
pub struct WaveformCache {
    capacity: usize,
    entries: HashMap<WaveformKey, Waveform>,
    lru_order: VecDeque<WaveformKey>,
}

impl WaveformCache {
    /// Creates a cache. `capacity` must be positive.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "waveform cache capacity must be positive");
        Self {
            capacity,
            entries: HashMap::new(),
            lru_order: VecDeque::new(),
        }
    }

    /// Clears all cached waveforms.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns one cached waveform and marks it as recently used.
    pub fn get(&mut self, clip: ClipId, track: usize) -> Option<Waveform> {
        let key = WaveformKey { clip, track };
        let waveform = self.entries.get(&key)?.clone();
        self.touch(key);
        Some(waveform)
    }

    /// Inserts or updates one cached waveform.
    pub fn insert(&mut self, clip: ClipId, track: usize, waveform: Waveform) {
        let key = WaveformKey { clip, track };
        self.entries.insert(key, waveform);
        self.touch(key);
        self.evict_if_needed();
    }

    /// Drops entries for the given clips on `track`. Used when clips land
    /// on a different track and their peaks no longer match.
    pub fn evict_clips(&mut self, clips: &[ClipId], track: usize) {
        for clip in clips {
            let key = WaveformKey { clip: *clip, track };
            if self.entries.remove(&key).is_some() {
                if let Some(index) = self.lru_order.iter().position(|existing| *existing == key) {
                    let _ = self.lru_order.remove(index);
                }
            }
        }
    }

    /// Drops every entry for one clip, on any track.
    pub fn evict_clip(&mut self, clip: ClipId) {
        self.entries.retain(|key, _| key.clip != clip);
        self.lru_order.retain(|key| key.clip != clip);
    }

    fn touch(&mut self, key: WaveformKey) {
        if let Some(index) = self.lru_order.iter().position(|existing| *existing == key) {
            let _ = self.lru_order.remove(index);
        }
        self.lru_order.push_back(key);
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.lru_order.pop_front() else {
                break;
            };
            let _ = self.entries.remove(&oldest);
        }
    }
}
