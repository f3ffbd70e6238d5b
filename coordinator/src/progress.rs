use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use shared::{dtos::progress_dto::ProgressDto, graphics::color::DisplayColor, models::tile::Tile};

/// A tile that is in flight on one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub worker_name: String,
    pub tile: Tile,
    pub started_at: DateTime<Utc>,
    pub color: DisplayColor,
}

impl ProgressEntry {
    pub fn to_dto(&self) -> ProgressDto {
        ProgressDto {
            worker_name: self.worker_name.clone(),
            tile: self.tile,
            started_at: self.started_at,
            color: self.color,
        }
    }
}

/// Which tile each worker is rendering right now, for status displays.
///
/// Entries are replaced whole under the write lock, so a snapshot never
/// observes a half-written entry. Snapshots may be stale.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    entries: RwLock<HashMap<String, ProgressEntry>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, worker_name: &str, tile: Tile, color: DisplayColor) {
        let entry = ProgressEntry {
            worker_name: worker_name.to_owned(),
            tile,
            started_at: Utc::now(),
            color,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(worker_name.to_owned(), entry);
    }

    pub fn unset(&self, worker_name: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(worker_name);
    }

    /// Point-in-time copy of every entry, ordered by worker name.
    pub fn snapshot(&self) -> Vec<ProgressEntry> {
        let mut entries: Vec<ProgressEntry> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.worker_name.cmp(&b.worker_name));
        entries
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    const RED: DisplayColor = DisplayColor::new(255, 0, 0);

    #[test]
    fn set_replaces_and_unset_removes() {
        let progress = ProgressTracker::new();
        progress.set("alpha", Tile::new(0, 0, 8), RED);
        progress.set("beta", Tile::new(8, 0, 8), RED);
        progress.set("alpha", Tile::new(16, 0, 8), RED);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].worker_name, "alpha");
        assert_eq!(snapshot[0].tile, Tile::new(16, 0, 8));

        progress.unset("alpha");
        progress.unset("missing");
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].worker_name, "beta");
    }

    #[test]
    fn snapshots_taken_during_writes_hold_whole_entries() {
        let progress = Arc::new(ProgressTracker::new());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let progress = Arc::clone(&progress);
                thread::spawn(move || {
                    let name = format!("worker-{w}");
                    for i in 0..500u32 {
                        // x and y always agree, so a torn entry would show.
                        progress.set(&name, Tile::new(i, i, w + 1), RED);
                        if i % 3 == 0 {
                            progress.unset(&name);
                        }
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            for entry in progress.snapshot() {
                assert_eq!(entry.tile.x, entry.tile.y);
                let w: u32 = entry.worker_name["worker-".len()..].parse().unwrap();
                assert_eq!(entry.tile.size, w + 1);
            }
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }
}
