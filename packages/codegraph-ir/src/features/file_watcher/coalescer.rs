//! Two-map change coalescer (spec §4.7): a pending-modified map keyed by
//! path -> last-seen instant, and a pending-deleted set. A modification
//! always clears a pending delete for that path and vice versa, so a path
//! never appears in both pending sets at once.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::ports::ChangeBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Deleted,
}

pub struct Coalescer {
    quiet_interval: Duration,
    max_batch_size: usize,
    pending_modified: HashMap<PathBuf, Instant>,
    pending_deleted: HashSet<PathBuf>,
}

impl Coalescer {
    pub fn new(quiet_interval: Duration, max_batch_size: usize) -> Self {
        Self {
            quiet_interval,
            max_batch_size,
            pending_modified: HashMap::new(),
            pending_deleted: HashSet::new(),
        }
    }

    pub fn add_change(&mut self, path: PathBuf, event_type: ChangeKind) {
        match event_type {
            ChangeKind::Modified => {
                self.pending_deleted.remove(&path);
                self.pending_modified.insert(path, Instant::now());
            }
            ChangeKind::Deleted => {
                self.pending_modified.remove(&path);
                self.pending_deleted.insert(path);
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending_modified.len() + self.pending_deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    /// Whether a batch should be emitted right now: the pending set has
    /// crossed `max_batch_size`, or every pending-modified path has sat
    /// quietly for at least `quiet_interval` (deletes carry no timestamp
    /// and never block emission on their own).
    fn should_emit(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.pending_count() >= self.max_batch_size {
            return true;
        }
        let now = Instant::now();
        self.pending_modified
            .values()
            .all(|last_seen| now.duration_since(*last_seen) >= self.quiet_interval)
    }

    /// Returns a batch and clears pending state if emission is due, per
    /// `should_emit`'s quiet-interval/max-batch triggers (spec §4.7).
    pub fn ready_batch(&mut self) -> Option<ChangeBatch> {
        if self.should_emit() {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Unconditionally drains pending state into one batch, regardless of
    /// quiet interval — used on stop to guarantee a final flush (spec
    /// §4.7: "On stop, all pending events are flushed exactly once").
    pub fn flush(&mut self) -> ChangeBatch {
        let modified_files: Vec<PathBuf> = self.pending_modified.drain().map(|(path, _)| path).collect();
        let deleted_files: Vec<PathBuf> = self.pending_deleted.drain().collect();
        ChangeBatch {
            modified_files,
            deleted_files,
            emitted_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_clears_pending_modification() {
        let mut coalescer = Coalescer::new(Duration::from_secs(60), 100);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Modified);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Deleted);
        let batch = coalescer.flush();
        assert!(batch.modified_files.is_empty());
        assert_eq!(batch.deleted_files, vec![PathBuf::from("a.py")]);
    }

    #[test]
    fn test_modification_clears_pending_delete() {
        let mut coalescer = Coalescer::new(Duration::from_secs(60), 100);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Deleted);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Modified);
        let batch = coalescer.flush();
        assert!(batch.deleted_files.is_empty());
        assert_eq!(batch.modified_files, vec![PathBuf::from("a.py")]);
    }

    #[test]
    fn test_no_batch_before_quiet_interval_elapses() {
        let mut coalescer = Coalescer::new(Duration::from_secs(60), 100);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Modified);
        assert!(coalescer.ready_batch().is_none());
    }

    #[test]
    fn test_batch_emitted_once_quiet_interval_elapses() {
        let mut coalescer = Coalescer::new(Duration::from_millis(10), 100);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Modified);
        std::thread::sleep(Duration::from_millis(20));
        let batch = coalescer.ready_batch();
        assert!(batch.is_some());
        assert!(coalescer.is_empty());
    }

    #[test]
    fn test_max_batch_threshold_triggers_immediate_emission() {
        let mut coalescer = Coalescer::new(Duration::from_secs(60), 3);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Modified);
        coalescer.add_change(PathBuf::from("b.py"), ChangeKind::Modified);
        coalescer.add_change(PathBuf::from("c.py"), ChangeKind::Modified);
        let batch = coalescer.ready_batch();
        assert!(batch.is_some());
        assert_eq!(batch.unwrap().modified_files.len(), 3);
    }

    #[test]
    fn test_flush_on_stop_drains_mixed_pending_state() {
        let mut coalescer = Coalescer::new(Duration::from_secs(60), 100);
        coalescer.add_change(PathBuf::from("a.py"), ChangeKind::Modified);
        coalescer.add_change(PathBuf::from("b.py"), ChangeKind::Deleted);
        let batch = coalescer.flush();
        assert_eq!(batch.modified_files, vec![PathBuf::from("a.py")]);
        assert_eq!(batch.deleted_files, vec![PathBuf::from("b.py")]);
        assert!(coalescer.is_empty());
    }
}
