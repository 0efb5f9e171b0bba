// Active-scan layout classification
// Finds the Latin layout group by counting where the letters a-z live

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::LayoutClassifier;
use crate::keymap::{KeycodeEntry, KeymapQuery};
use crate::{KeyEvent, Keysym};

/// Per-group tally of Latin letters bound in the keymap.
///
/// Built once per layout change and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatinGroupTable {
    /// Index is the layout group
    counts: SmallVec<[u32; 4]>,
}

impl LatinGroupTable {
    /// Scan the keymap for every letter `a` to `z`.
    ///
    /// Letters the keymap cannot place are skipped. Entries with a negative
    /// group are ignored.
    pub fn scan(keymap: &dyn KeymapQuery) -> Self {
        let mut counts: SmallVec<[u32; 4]> = SmallVec::new();

        for letter in Keysym::latin_letters() {
            let keys = match keymap.entries_for_keyval(letter) {
                Ok(keys) => keys,
                Err(e) => {
                    log::trace!("skipping {}: {}", letter, e);
                    continue;
                }
            };
            for key in keys.iter() {
                let Ok(group) = usize::try_from(key.group) else {
                    continue;
                };
                if group >= counts.len() {
                    counts.resize(group + 1, 0);
                }
                counts[group] += 1;
            }
        }

        Self { counts }
    }

    /// Number of Latin letter bindings found in `group`
    pub fn count(&self, group: usize) -> u32 {
        self.counts.get(group).copied().unwrap_or(0)
    }

    /// Number of groups seen during the scan
    pub fn group_count(&self) -> usize {
        self.counts.len()
    }

    /// Iterate over (group, count) pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.counts.iter().copied().enumerate()
    }

    /// The group holding the most Latin letters.
    ///
    /// Ties go to the lowest group index; group 0 when no letter is bound
    /// anywhere.
    pub fn latin_group(&self) -> i32 {
        let mut result = 0;
        let mut max_count = 0;
        for (group, count) in self.iter() {
            if count > max_count {
                result = group;
                max_count = count;
            }
        }
        i32::try_from(result).unwrap_or(0)
    }
}

/// Classifier that treats the Latin group as the one reference layout.
///
/// The group is computed lazily on the first key event. That first
/// computation also subscribes to the keymap's keys-changed notification;
/// each notification marks the cached group stale so the next key event
/// recomputes it exactly once.
#[derive(Debug, Default)]
pub struct ActiveScan {
    table: Mutex<Option<LatinGroupTable>>,
    stale: Arc<AtomicBool>,
    subscribed: AtomicBool,
    recomputations: AtomicUsize,
}

impl ActiveScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latin group for the current layout, computing it if needed
    pub fn latin_group(&self, keymap: &dyn KeymapQuery) -> i32 {
        let mut table = self.table.lock();
        if self.stale.swap(false, Ordering::AcqRel) {
            *table = None;
        }
        if let Some(cached) = table.as_ref() {
            return cached.latin_group();
        }

        let scanned = LatinGroupTable::scan(keymap);
        for (group, count) in scanned.iter() {
            log::debug!("group {} has {} Latin keys", group, count);
        }
        let group = scanned.latin_group();
        log::debug!("Latin key group is {}", group);
        *table = Some(scanned);
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        drop(table);

        if !self.subscribed.swap(true, Ordering::AcqRel) {
            self.subscribe(keymap);
        }
        group
    }

    /// Latin group from the last scan, if one is cached and still valid
    pub fn cached_group(&self) -> Option<i32> {
        if self.stale.load(Ordering::Acquire) {
            return None;
        }
        self.table.lock().as_ref().map(LatinGroupTable::latin_group)
    }

    /// Drop the cached group; the next key event rescans
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// How many times the Latin group has been computed
    pub fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::Relaxed)
    }

    fn subscribe(&self, keymap: &dyn KeymapQuery) {
        let stale = Arc::clone(&self.stale);
        let listener = Box::new(move || {
            log::debug!("keys changed, Latin key group invalidated");
            stale.store(true, Ordering::Release);
        });
        // A failed subscription is not retried; the cached group then lives
        // until the process exits.
        if let Err(e) = keymap.on_keys_changed(listener) {
            log::warn!("layout changes will not be tracked: {}", e);
        }
    }
}

impl LayoutClassifier for ActiveScan {
    fn name(&self) -> &'static str {
        "active-scan"
    }

    fn prepare(&self, keymap: &dyn KeymapQuery) {
        self.latin_group(keymap);
    }

    fn is_latin_event(&self, event: &KeyEvent) -> bool {
        // Without a known group there is nothing to remap towards
        self.cached_group()
            .map_or(true, |latin| i32::from(event.group) == latin)
    }

    fn is_latin_entry(&self, _event: &KeyEvent, entry: &KeycodeEntry, level: i32) -> bool {
        self.cached_group()
            .is_some_and(|latin| entry.group == latin && entry.level == level)
    }
}
