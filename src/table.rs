use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;

use ahash::RandomState;
use glob::Pattern;
use tracing::{error, trace};
use walkdir::WalkDir;

use crate::entry::{is_definitely_equal, Entry, FileResult, GroupTag};
use crate::ordering::{compare_entries, Tier};
use crate::resolve::{self, FieldValue, TaskOutcome};

/// Incremental duplicate-detection index.
///
/// Owns every record, keeps them in one total order (size, then partial
/// checksum, then full checksum, then path), and schedules the background
/// work needed to resolve unknown parts of that order as a by-product of
/// the comparisons performed while inserting.
///
/// The consumer drives it from a single coordinating thread: `insert`
/// paths, call `tick()` once per poll/render iteration to fold completed
/// background work back in, and read rows out between ticks.
pub struct EqualityTable {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<TableState>,
    ignore_patterns: Vec<Pattern>,
}

struct TableState {
    entries: Vec<Entry>,
    paths: HashSet<String>,
    duplicate_count: usize,
    pending_tasks: usize,
    closing: bool,
    next_id: u64,
    outcome_tx: Sender<TaskOutcome>,
    outcome_rx: Receiver<TaskOutcome>,
    tag_state: RandomState,
    cursor: RowCache,
}

impl EqualityTable {
    pub fn new() -> Self {
        Self::with_ignore_patterns(&[])
    }

    /// Build a table whose directory expansion skips paths matching any of
    /// the given glob patterns. Invalid patterns are logged and dropped.
    pub fn with_ignore_patterns(ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    error!("Invalid glob pattern '{}': {}", glob, err);
                    None
                }
            })
            .collect();

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TableState::new()),
                ignore_patterns,
            }),
        }
    }

    /// Schedule asynchronous addition of a file, or of every regular file
    /// under a directory. The caller is never blocked on filesystem
    /// traversal; files appear incrementally as enumeration proceeds.
    /// Inserting an already-present canonical path is a no-op.
    pub fn insert(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let shared = Arc::clone(&self.shared);

        self.lock().pending_tasks += 1;
        thread::spawn(move || {
            expand_and_insert(&shared, &path);
            shared.state.lock().unwrap().pending_tasks -= 1;
        });
    }

    /// Synchronous removal by canonical path. Returns whether a record was
    /// removed. Any in-flight resolution for the record finishes on its
    /// worker and is discarded at the next `tick()`.
    pub fn remove(&self, path: &str) -> bool {
        let mut state = self.lock();
        match state.entries.iter().position(|entry| entry.path == path) {
            Some(pos) => {
                state.remove_at(pos);
                true
            }
            None => false,
        }
    }

    /// Harvest completed background work. Non-blocking; call once per
    /// consumer iteration.
    ///
    /// Each completed field result is applied with its record taken out of
    /// the ordered structure first — mutating an ordering key in place
    /// would corrupt the structure's invariant. Re-insertion re-runs the
    /// comparison cascade and may schedule the next tier.
    pub fn tick(&self) {
        let mut state = self.lock();
        let mut updated = Vec::new();

        loop {
            let outcome = match state.outcome_rx.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            state.pending_tasks -= 1;

            let Some(pos) = state
                .entries
                .iter()
                .position(|entry| entry.id == outcome.entry_id)
            else {
                // record was removed while the task was in flight
                trace!("discarding result for removed record");
                continue;
            };

            let mut entry = state.remove_at(pos);
            match outcome.value {
                FieldValue::Size(value) => entry.size = value,
                FieldValue::PartialChecksum(value) => entry.partial_checksum = value,
                FieldValue::FullChecksum(value) => entry.full_checksum = value,
            }
            updated.push(entry);
        }

        for entry in updated {
            state.insert_entry(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Number of adjacent definitely-equal pairs in the current order.
    pub fn duplicate_count(&self) -> usize {
        self.lock().duplicate_count
    }

    /// Outstanding background tasks: field resolutions plus directory
    /// expansions not yet finished.
    pub fn pending_task_count(&self) -> usize {
        self.lock().pending_tasks
    }

    /// The record at `index` in the current order, via the cursor cache: a
    /// repeated request for the same index between mutations is served
    /// from the cache.
    pub fn row(&self, index: usize) -> Option<Entry> {
        self.lock().row(index)
    }

    /// All records in their current order.
    pub fn snapshot(&self) -> Vec<Entry> {
        self.lock().entries.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableState> {
        self.shared.state.lock().unwrap()
    }
}

impl Default for EqualityTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EqualityTable {
    fn drop(&mut self) {
        // Best effort: expansion loops stop at the next file; in-flight
        // field resolutions run to completion and go unharvested.
        if let Ok(mut state) = self.shared.state.lock() {
            state.closing = true;
        }
    }
}

fn expand_and_insert(shared: &Shared, path: &Path) {
    if path.is_dir() {
        let walker = WalkDir::new(path)
            .into_iter()
            .filter_entry(|dent| !is_ignored(&shared.ignore_patterns, dent.path()));
        for dent in walker {
            let dent = match dent {
                Ok(dent) => dent,
                Err(err) => {
                    error!("Error walking {}: {}", path.display(), err);
                    continue;
                }
            };
            if !dent.file_type().is_file() {
                continue;
            }
            let Some(canonical) = canonicalize_for_index(dent.path()) else {
                continue;
            };
            let mut state = shared.state.lock().unwrap();
            if state.closing {
                break;
            }
            state.insert_new_file(canonical);
        }
    } else {
        if is_ignored(&shared.ignore_patterns, path) {
            return;
        }
        let Some(canonical) = canonicalize_for_index(path) else {
            return;
        };
        shared.state.lock().unwrap().insert_new_file(canonical);
    }
}

fn is_ignored(patterns: &[Pattern], path: &Path) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(path))
}

fn canonicalize_for_index(path: &Path) -> Option<String> {
    match fs::canonicalize(path) {
        Ok(canonical) => Some(canonical.to_string_lossy().replace('\\', "/")),
        Err(err) => {
            error!("Error canonicalizing {}: {}", path.display(), err);
            None
        }
    }
}

impl TableState {
    fn new() -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self {
            entries: Vec::new(),
            paths: HashSet::new(),
            duplicate_count: 0,
            pending_tasks: 0,
            closing: false,
            next_id: 0,
            outcome_tx,
            outcome_rx,
            tag_state: RandomState::new(),
            cursor: RowCache::default(),
        }
    }

    fn insert_new_file(&mut self, path: String) {
        if self.paths.contains(&path) {
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        let group_tag = self.make_tag(&path);
        trace!("indexing {}", path);
        self.insert_entry(Entry::new(id, path, group_tag));
    }

    // Tag colours are hashed from the path through a per-process random
    // state, so runs differ but a single run is stable.
    fn make_tag(&self, path: &str) -> GroupTag {
        let hash = self.tag_state.hash_one(path);
        GroupTag {
            r: (hash >> 16) as u8,
            g: (hash >> 8) as u8,
            b: hash as u8,
        }
    }

    /// Insert a record at its ordered position, schedule resolution for
    /// every (record, tier) pair flagged by the comparisons made along the
    /// way, then update duplicate adjacency bookkeeping.
    ///
    /// This is the only place comparison flags turn into scheduled work.
    fn insert_entry(&mut self, entry: Entry) {
        if !self.paths.insert(entry.path.clone()) {
            return;
        }
        self.cursor.invalidate();

        let mut wants: Vec<(u64, Tier)> = Vec::new();
        let mut lo = 0;
        let mut hi = self.entries.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let cmp = compare_entries(&entry, &self.entries[mid]);
            if let Some(tier) = cmp.lhs_needs {
                wants.push((entry.id, tier));
            }
            if let Some(tier) = cmp.rhs_needs {
                wants.push((self.entries[mid].id, tier));
            }
            if cmp.ordering == Ordering::Less {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        let pos = lo;
        self.entries.insert(pos, entry);

        for (id, tier) in wants {
            self.schedule(id, tier);
        }

        // The counter tracks adjacent definitely-equal pairs exactly: one
        // increment per equal neighbour, minus one if this insert split a
        // previously-adjacent equal pair.
        let pred_eq = pos > 0 && is_definitely_equal(&self.entries[pos - 1], &self.entries[pos]);
        let succ_eq = pos + 1 < self.entries.len()
            && is_definitely_equal(&self.entries[pos], &self.entries[pos + 1]);
        if pred_eq {
            self.duplicate_count += 1;
            let tag = self.entries[pos - 1].group_tag;
            self.entries[pos].group_tag = tag;
        }
        if succ_eq {
            self.duplicate_count += 1;
        }
        if pred_eq && succ_eq {
            self.duplicate_count -= 1;
        }

        // One tag for the whole equal run.
        let tag = self.entries[pos].group_tag;
        for i in pos + 1..self.entries.len() {
            if !is_definitely_equal(&self.entries[pos], &self.entries[i]) {
                break;
            }
            self.entries[i].group_tag = tag;
        }
    }

    fn remove_at(&mut self, pos: usize) -> Entry {
        self.cursor.invalidate();

        let pred_eq = pos > 0 && is_definitely_equal(&self.entries[pos - 1], &self.entries[pos]);
        let succ_eq = pos + 1 < self.entries.len()
            && is_definitely_equal(&self.entries[pos], &self.entries[pos + 1]);
        if pred_eq {
            self.duplicate_count -= 1;
        }
        if succ_eq {
            self.duplicate_count -= 1;
        }
        if pred_eq && succ_eq {
            // the neighbours become adjacent and are equal to each other
            self.duplicate_count += 1;
        }

        let entry = self.entries.remove(pos);
        self.paths.remove(&entry.path);
        entry
    }

    /// Spawn one worker for the record's flagged tier, unless that field
    /// already left `Unresolved`. Marking the field `InProgress` here,
    /// under the lock, is what makes scheduling idempotent.
    fn schedule(&mut self, id: u64, tier: Tier) {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return;
        };
        let path = entry.path.clone();
        let tx = self.outcome_tx.clone();

        match tier {
            Tier::Size => {
                if !matches!(entry.size, FileResult::Unresolved) {
                    return;
                }
                entry.size = FileResult::InProgress;
                trace!("resolving size of {}", path);
                self.pending_tasks += 1;
                thread::spawn(move || {
                    let value = resolve::compute_size(&path);
                    let _ = tx.send(TaskOutcome {
                        entry_id: id,
                        value: FieldValue::Size(value),
                    });
                });
            }
            Tier::PartialChecksum => {
                if !matches!(entry.partial_checksum, FileResult::Unresolved) {
                    return;
                }
                // reached only through an equal resolved size tier
                let FileResult::Resolved(size) = entry.size else {
                    return;
                };
                entry.partial_checksum = FileResult::InProgress;
                trace!("resolving partial checksum of {}", path);
                self.pending_tasks += 1;
                thread::spawn(move || {
                    let value = resolve::compute_partial_checksum(&path, size);
                    let _ = tx.send(TaskOutcome {
                        entry_id: id,
                        value: FieldValue::PartialChecksum(value),
                    });
                });
            }
            Tier::FullChecksum => {
                if !matches!(entry.full_checksum, FileResult::Unresolved) {
                    return;
                }
                let (FileResult::Resolved(size), FileResult::Resolved(partial)) =
                    (&entry.size, &entry.partial_checksum)
                else {
                    return;
                };
                let (size, partial) = (*size, *partial);
                entry.full_checksum = FileResult::InProgress;
                trace!("resolving full checksum of {}", path);
                self.pending_tasks += 1;
                thread::spawn(move || {
                    let value = resolve::compute_full_checksum(&path, size, partial);
                    let _ = tx.send(TaskOutcome {
                        entry_id: id,
                        value: FieldValue::FullChecksum(value),
                    });
                });
            }
        }
    }

    fn row(&mut self, index: usize) -> Option<Entry> {
        if self.cursor.valid && self.cursor.index == index {
            return self.cursor.row.clone();
        }
        let row = self.entries.get(index).cloned();
        self.cursor = RowCache {
            valid: true,
            index,
            row: row.clone(),
        };
        row
    }
}

/// Amortizes the position lookup for a consumer that polls the same row
/// index every frame. Any mutation invalidates it.
#[derive(Default)]
struct RowCache {
    valid: bool,
    index: usize,
    row: Option<Entry>,
}

impl RowCache {
    fn invalidate(&mut self) {
        self.valid = false;
        self.row = None;
    }
}
