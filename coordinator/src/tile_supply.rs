use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::warn;
use shared::models::tile::Tile;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct SupplyState {
    pending: VecDeque<Tile>,
    in_flight: usize,
    attempts: HashMap<Tile, u32>,
    lost: Vec<Tile>,
}

/// Tiles waiting to be rendered, shared by every worker loop.
///
/// A pulled tile stays accounted for until its [`TileLease`] is either
/// completed or failed. Failed tiles go back to the end of the queue until
/// they have been attempted `max_attempts` times, after which they are lost.
/// [`TileSupply::pull`] only reports exhaustion once nothing is queued and
/// nothing is in flight, so a requeued tile always finds a taker while any
/// loop is still running.
#[derive(Debug)]
pub struct TileSupply {
    state: Mutex<SupplyState>,
    changed: Notify,
    max_attempts: u32,
}

impl TileSupply {
    pub fn new(tiles: Vec<Tile>, max_attempts: u32) -> Self {
        Self {
            state: Mutex::new(SupplyState {
                pending: tiles.into(),
                ..SupplyState::default()
            }),
            changed: Notify::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SupplyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The next tile, or `None` once every tile is completed or lost.
    pub async fn pull(&self) -> Option<TileLease<'_>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(tile) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(TileLease {
                        supply: self,
                        tile,
                        settled: false,
                    });
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            notified.await;
        }
    }

    fn complete(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.changed.notify_waiters();
    }

    fn fail(&self, tile: Tile) -> bool {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        let attempts = {
            let attempts = state.attempts.entry(tile).or_insert(0);
            *attempts += 1;
            *attempts
        };
        let requeued = attempts < self.max_attempts;
        if requeued {
            state.pending.push_back(tile);
        } else {
            warn!("Giving up on tile {:?} after {} attempts", tile, attempts);
            state.lost.push(tile);
        }

        drop(state);
        self.changed.notify_waiters();
        requeued
    }

    /// Marks everything still queued as lost. Called once no loop is left
    /// to pull.
    pub fn abandon(&self) -> usize {
        let mut state = self.lock();
        let abandoned: Vec<Tile> = state.pending.drain(..).collect();
        let count = abandoned.len();
        state.lost.extend(abandoned);
        drop(state);
        self.changed.notify_waiters();
        count
    }

    pub fn lost(&self) -> Vec<Tile> {
        self.lock().lost.clone()
    }

    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }
}

/// A tile checked out of a [`TileSupply`]. Dropping a lease without
/// settling it counts as a failed attempt.
#[derive(Debug)]
pub struct TileLease<'a> {
    supply: &'a TileSupply,
    tile: Tile,
    settled: bool,
}

impl TileLease<'_> {
    pub fn tile(&self) -> Tile {
        self.tile
    }

    pub fn complete(mut self) {
        self.settled = true;
        self.supply.complete();
    }

    /// Hands the tile back. `true` if it was queued for another attempt.
    pub fn fail(mut self) -> bool {
        self.settled = true;
        self.supply.fail(self.tile)
    }
}

impl Drop for TileLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.supply.fail(self.tile);
        }
    }
}
