//! UI-side tile bookkeeping.
//!
//! The cache never blocks: a missing tile is requested from the worker and the map
//! paints the graticule in its place until the tile arrives. Each tile is requested
//! once; tiles that fail to load are remembered and not retried.

use std::collections::{HashMap, HashSet};

use super::TileId;

/// Anything that can queue a tile download.
pub trait TileRequester {
    /// Queue a download for `id`. Returns `false` if the request could not be queued
    /// right now (the tile will be asked for again on a later frame).
    fn request(&mut self, id: TileId) -> bool;
}

enum TileSlot<T> {
    Pending,
    Ready(T),
    Failed,
}

/// Tile store keyed by [`TileId`]; `T` is the loaded tile (a texture in the UI).
pub struct TileCache<T> {
    slots: HashMap<TileId, TileSlot<T>>,
    capacity: usize,
}

impl<T> TileCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            capacity,
        }
    }

    /// Return the tile if it is loaded, requesting it if it was never seen.
    pub fn get_or_request(&mut self, id: TileId, requester: &mut dyn TileRequester) -> Option<&T> {
        if !self.slots.contains_key(&id) {
            if requester.request(id) {
                self.slots.insert(id, TileSlot::Pending);
            }
            return None;
        }

        match self.slots.get(&id) {
            Some(TileSlot::Ready(tile)) => Some(tile),
            _ => None,
        }
    }

    /// Record the worker's answer for a pending tile.
    ///
    /// `None` marks the tile as failed. Answers for tiles that are no longer pending
    /// (evicted meanwhile) are dropped; returns whether the answer was stored.
    pub fn complete(&mut self, id: TileId, tile: Option<T>) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) if matches!(slot, TileSlot::Pending) => {
                *slot = match tile {
                    Some(tile) => TileSlot::Ready(tile),
                    None => TileSlot::Failed,
                };
                true
            }
            _ => false,
        }
    }

    pub fn is_failed(&self, id: TileId) -> bool {
        matches!(self.slots.get(&id), Some(TileSlot::Failed))
    }

    pub fn pending_count(&self) -> usize {
        self.slots.values().filter(|s| matches!(s, TileSlot::Pending)).count()
    }

    /// Once the cache grows past its capacity, drop every tile not in `visible`.
    ///
    /// This covers both other zoom levels and tiles panned out of view. Visible tiles
    /// are always kept, so a view needing more tiles than `capacity` stays intact.
    pub fn evict_invisible(&mut self, visible: &HashSet<TileId>) {
        if self.slots.len() <= self.capacity {
            return;
        }
        let before = self.slots.len();
        self.slots.retain(|id, _| visible.contains(id));
        log::debug!("Evicted {} tiles outside the view", before - self.slots.len());
    }
}
