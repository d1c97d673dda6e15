//! EcoScan dashboard: upload eDNA sample files to the analysis service and explore
//! the returned samples on a PCA scatter plot, a world map and a results table.
//!
//! Threads:
//! - main thread: eframe/egui UI (`ui::AppState`)
//! - `analysis-executor`: Embassy executor running `analysis::analysis_task`
//! - `tile-executor`: Embassy executor running `tiles::tile_task`
//!
//! The UI and the workers talk only through the bounded channels declared below.

use eframe::egui;
use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use env_logger::Builder;
use log::LevelFilter;
use std::path::Path;
use std::thread;

mod analysis;
mod common;
mod tiles;
mod ui;

use analysis::AnalysisClient;
use common::DashboardConfig;
use common::config::CONFIG_FILE_NAME;
use tiles::{TileCommand, TileFetcher};
use ui::{AppState, UICommand, UIRefreshState};

const UI_REFRESH_QUEUE_SIZE: usize = 64;
type UIRefreshQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
type UIRefreshQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
type UIRefreshQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;

// At most one analysis is outstanding, a single slot is enough.
const UI_COMMAND_QUEUE_SIZE: usize = 1;
type UICommandQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
type UICommandQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
type UICommandQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;

const TILE_COMMAND_QUEUE_SIZE: usize = 128;
type TileCommandQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, TileCommand, TILE_COMMAND_QUEUE_SIZE>;
type TileCommandQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, TileCommand, TILE_COMMAND_QUEUE_SIZE>;
type TileCommandQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, TileCommand, TILE_COMMAND_QUEUE_SIZE>;

fn analysis_init(spawner: Spawner, client: AnalysisClient, ui_command_rx: UICommandQueueReceiver, ui_refresh_tx: UIRefreshQueueSender) {
    if let Err(e) = spawner.spawn(analysis::analysis_task(client, ui_command_rx, ui_refresh_tx)) {
        log::error!("Failed to spawn analysis task: {:?}", e);
    }
}

fn tile_init(spawner: Spawner, fetcher: TileFetcher, tile_command_rx: TileCommandQueueReceiver, ui_refresh_tx: UIRefreshQueueSender) {
    if let Err(e) = spawner.spawn(tiles::tile_task(fetcher, tile_command_rx, ui_refresh_tx)) {
        log::error!("Failed to spawn tile task: {:?}", e);
    }
}

fn main() -> Result<(), eframe::Error> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("ecoscan_dashboard"), LevelFilter::Debug)
        .init();

    log::info!("Starting up");

    let config = DashboardConfig::load_or_default(Path::new(CONFIG_FILE_NAME));

    let ui_refresh_queue: &'static UIRefreshQueue = Box::leak(Box::new(UIRefreshQueue::new()));
    let ui_command_queue: &'static UICommandQueue = Box::leak(Box::new(UICommandQueue::new()));
    let tile_command_queue: &'static TileCommandQueue = Box::leak(Box::new(TileCommandQueue::new()));

    let ui_refresh_tx = ui_refresh_queue.sender();
    let ui_refresh_rx = ui_refresh_queue.receiver();
    let ui_command_tx = ui_command_queue.sender();
    let ui_command_rx = ui_command_queue.receiver();
    let tile_command_tx = tile_command_queue.sender();
    let tile_command_rx = tile_command_queue.receiver();

    // Without a worker every submission would hang in the submitting state
    let client = match AnalysisClient::new(&config.backend_url, config.request_timeout()) {
        Ok(client) => client,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let analysis_thread = thread::Builder::new().name("analysis-executor".to_string()).spawn(move || {
        // Leak the executor to satisfy the 'static lifetime required by run()
        let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
        executor.run(|spawner| analysis_init(spawner, client, ui_command_rx, ui_refresh_tx));
    });
    if let Err(e) = analysis_thread {
        log::error!("Failed to spawn analysis thread: {}", e);
        std::process::exit(1);
    }

    let mut map_config = config.map.clone();
    if map_config.tiles_enabled {
        match TileFetcher::new(&map_config.tile_url) {
            Ok(fetcher) => {
                let tile_thread = thread::Builder::new().name("tile-executor".to_string()).spawn(move || {
                    let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
                    executor.run(|spawner| tile_init(spawner, fetcher, tile_command_rx, ui_refresh_tx));
                });
                if let Err(e) = tile_thread {
                    log::warn!("Failed to spawn tile thread, map tiles disabled: {}", e);
                    map_config.tiles_enabled = false;
                }
            }
            Err(e) => {
                log::warn!("{}, map tiles disabled", e);
                map_config.tiles_enabled = false;
            }
        }
    }

    // Start the GUI on the main thread (required on macOS)
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("EcoScan Dashboard")
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "EcoScan Dashboard",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(AppState::new(
                ui_refresh_rx,
                ui_command_tx,
                tile_command_tx,
                map_config,
                &cc.egui_ctx,
                cc.storage,
            )))
        }),
    )
}
