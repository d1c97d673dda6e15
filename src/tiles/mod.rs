//! Slippy-map tile loading for the sample map.
//!
//! - `cache`: per-tile bookkeeping on the UI side (pending / ready / failed)
//! - `task`: background Embassy task downloading and decoding tiles

pub mod cache;
pub mod task;

pub use crate::common::geo::TileId;
pub use cache::{TileCache, TileRequester};
pub use task::{TileFetcher, tile_task};

/// Commands from the UI to the tile worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileCommand {
    Fetch(TileId),
}

impl TileRequester for crate::TileCommandQueueSender {
    fn request(&mut self, id: TileId) -> bool {
        self.try_send(TileCommand::Fetch(id)).is_ok()
    }
}
