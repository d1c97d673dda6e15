//! Background task downloading map tiles.

use eframe::egui;
use reqwest::blocking::Client;
use std::time::Duration;

use super::{TileCommand, TileId};
use crate::common::geo::tile_url;
use crate::ui::UIRefreshState;
use crate::{TileCommandQueueReceiver, UIRefreshQueueSender};

/// Tile servers reject requests without an identifying user agent.
const TILE_USER_AGENT: &str = concat!("ecoscan-dashboard/", env!("CARGO_PKG_VERSION"));
const TILE_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads and decodes tiles from a URL template.
pub struct TileFetcher {
    client: Client,
    url_template: String,
}

impl TileFetcher {
    pub fn new(url_template: &str) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent(TILE_USER_AGENT)
            .timeout(TILE_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create tile HTTP client: {}", e))?;
        Ok(Self::with_client(client, url_template))
    }

    pub fn with_client(client: Client, url_template: &str) -> Self {
        Self {
            client,
            url_template: url_template.to_string(),
        }
    }

    /// Fetch one tile and decode it into an egui image.
    pub fn fetch(&self, id: TileId) -> Result<egui::ColorImage, String> {
        let url = tile_url(&self.url_template, id);
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("Failed to download {}: {}", url, e))?;
        let bytes = response.bytes().map_err(|e| format!("Failed to read {}: {}", url, e))?;

        let rgba = image::load_from_memory(&bytes).map_err(|e| format!("Failed to decode {}: {}", url, e))?.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice()))
    }
}

/// Main tile task.
///
/// Serves one `TileCommand::Fetch` at a time and answers every request with a
/// `UIRefreshState::TileLoaded`, failed downloads included, so the UI can stop
/// waiting for them.
#[embassy_executor::task]
pub async fn tile_task(fetcher: TileFetcher, tile_command_rx: TileCommandQueueReceiver, ui_refresh_tx: UIRefreshQueueSender) {
    log::info!("Tile task started");

    loop {
        match tile_command_rx.receive().await {
            TileCommand::Fetch(id) => {
                let result = fetcher.fetch(id);
                if let Err(e) = &result {
                    log::warn!("{}", e);
                }
                ui_refresh_tx.send(UIRefreshState::TileLoaded(id, result)).await;
            }
        }
    }
}
