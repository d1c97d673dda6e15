//! Web-Mercator math for the sample map.
//!
//! Contains helpers for:
//! - Projecting latitude/longitude to Mercator pixel space at a (fractional) zoom
//! - Converting between geographic points and offsets from the view center
//! - Panning and zooming a viewport
//! - Enumerating the slippy-map tiles that cover a view
//!
//! All pixel values are "world pixels": at zoom `z` the whole world is a square of
//! `256 * 2^z` pixels with the origin in the north-west corner.

use serde::{Deserialize, Serialize};

/// Edge length of one map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 18.0;
/// Latitude at which the Mercator square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Subdomains rotated through for the `{s}` placeholder.
const TILE_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Address of one slippy-map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// A tile that intersects the view and where to paint it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTile {
    pub id: TileId,
    /// Top-left corner relative to the view center, in screen pixels.
    pub offset: [f64; 2],
    /// Edge length on screen (differs from 256 at fractional zoom).
    pub size: f64,
}

/// World size in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project a geographic point to world pixels.
///
/// Latitudes beyond the Mercator limit are clamped.
pub fn project(point: GeoPoint, zoom: f64) -> [f64; 2] {
    let size = world_size(zoom);
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    [x, y]
}

/// Inverse of [`project`].
pub fn unproject(world: [f64; 2], zoom: f64) -> GeoPoint {
    let size = world_size(zoom);
    let lon = world[0] / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * world[1] / size);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint { lat, lon }
}

/// Wrap a longitude into `[-180, 180)`.
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Fill a tile URL template.
///
/// Supported placeholders: `{s}` (subdomain), `{z}`, `{x}`, `{y}` and `{r}` (retina
/// suffix, always empty).
pub fn tile_url(template: &str, id: TileId) -> String {
    let subdomain = TILE_SUBDOMAINS[((id.x + id.y) % TILE_SUBDOMAINS.len() as u32) as usize];
    template
        .replace("{s}", subdomain)
        .replace("{z}", &id.z.to_string())
        .replace("{x}", &id.x.to_string())
        .replace("{y}", &id.y.to_string())
        .replace("{r}", "")
}

/// The part of the world currently shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    pub center: GeoPoint,
    pub zoom: f64,
}

impl MapViewport {
    pub fn new(center: GeoPoint, zoom: f64) -> Self {
        Self {
            center: GeoPoint::new(center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), normalize_longitude(center.lon)),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Offset of `point` from the view center in screen pixels (x right, y down).
    pub fn to_screen_offset(&self, point: GeoPoint) -> [f64; 2] {
        let c = project(self.center, self.zoom);
        let p = project(point, self.zoom);
        [p[0] - c[0], p[1] - c[1]]
    }

    /// Geographic point shown at `offset` from the view center.
    pub fn from_screen_offset(&self, offset: [f64; 2]) -> GeoPoint {
        let c = project(self.center, self.zoom);
        unproject([c[0] + offset[0], c[1] + offset[1]], self.zoom)
    }

    /// Move the view as if the map content were dragged by `delta` pixels.
    pub fn pan_by_pixels(&mut self, delta: [f64; 2]) {
        let size = world_size(self.zoom);
        let c = project(self.center, self.zoom);
        let moved = [c[0] - delta[0], (c[1] - delta[1]).clamp(0.0, size)];
        let center = unproject(moved, self.zoom);
        self.center = GeoPoint::new(center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), normalize_longitude(center.lon));
    }

    /// Change zoom by `delta` levels keeping the point under `anchor` fixed on screen.
    ///
    /// # Parameters
    ///
    /// * `delta` - Zoom change in levels (positive zooms in)
    /// * `anchor` - Screen offset from the view center that should stay in place
    pub fn zoom_around(&mut self, delta: f64, anchor: [f64; 2]) {
        let new_zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        if new_zoom == self.zoom {
            return;
        }

        let anchored = self.from_screen_offset(anchor);
        self.zoom = new_zoom;
        // Re-center so `anchored` projects back onto `anchor`.
        let p = project(anchored, self.zoom);
        let center = unproject([p[0] - anchor[0], p[1] - anchor[1]], self.zoom);
        self.center = GeoPoint::new(center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), normalize_longitude(center.lon));
    }

    /// Integer zoom level tiles are fetched at.
    pub fn tile_zoom(&self) -> u8 {
        self.zoom.round().clamp(MIN_ZOOM, MAX_ZOOM) as u8
    }

    /// Tiles needed to cover a `width` x `height` view.
    ///
    /// Columns wrap around the antimeridian; rows outside the world are skipped.
    pub fn visible_tiles(&self, width: f64, height: f64) -> Vec<VisibleTile> {
        let z = self.tile_zoom();
        let scale = 2f64.powf(self.zoom - z as f64);
        let tile_px = TILE_SIZE * scale;
        let tiles_per_side = 1i64 << z;
        let c = project(self.center, z as f64);

        let left = c[0] - width / 2.0 / scale;
        let right = c[0] + width / 2.0 / scale;
        let top = c[1] - height / 2.0 / scale;
        let bottom = c[1] + height / 2.0 / scale;

        let x_start = (left / TILE_SIZE).floor() as i64;
        let x_end = (right / TILE_SIZE).ceil() as i64;
        let y_start = ((top / TILE_SIZE).floor() as i64).max(0);
        let y_end = ((bottom / TILE_SIZE).ceil() as i64).min(tiles_per_side);

        let mut tiles = Vec::new();
        for ty in y_start..y_end {
            for tx in x_start..x_end {
                tiles.push(VisibleTile {
                    id: TileId {
                        z,
                        x: tx.rem_euclid(tiles_per_side) as u32,
                        y: ty as u32,
                    },
                    offset: [(tx as f64 * TILE_SIZE - c[0]) * scale, (ty as f64 * TILE_SIZE - c[1]) * scale],
                    size: tile_px,
                });
            }
        }
        tiles
    }
}
