// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Basemap tiles: disk-cached CARTO dark raster tiles.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use egui::{ColorImage, Rect, TextureHandle, Vec2};
use log::{debug, warn};
use sha2::{Digest, Sha256};

use super::projection::{Viewport, WebMercator, TILE_SIZE};

const CACHE_DURATION_DAYS: u64 = 7;
const TILE_PIXELS: usize = 256;
const RETRY_BASE: Duration = Duration::from_secs(5);
const RETRY_MAX: Duration = Duration::from_secs(300);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Tile URL on the CARTO CDN
    pub fn url(&self) -> String {
        let subdomain = ['a', 'b', 'c', 'd'][((self.x + self.y) % 4) as usize];
        format!(
            "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
            subdomain, self.zoom, self.x, self.y
        )
    }

    fn cache_filename(&self) -> String {
        let hash = Sha256::digest(self.url().as_bytes());
        format!("{hash:x}.png")
    }
}

/// Tiles covering `rect` for `viewport`, with their screen rectangles.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "tile indices are bounded by 2^19"
)]
pub fn visible_tiles(viewport: &Viewport, rect: Rect) -> Vec<(TileCoord, Rect)> {
    let zoom = viewport.tile_zoom();
    let z = f64::from(zoom);
    // Screen size of one tile at the fractional zoom
    let size = TILE_SIZE * (viewport.zoom - z).exp2();

    let center_x = WebMercator::lon_to_x(viewport.center.lon, z);
    let center_y = WebMercator::lat_to_y(viewport.center.lat, z);

    let half_w = f64::from(rect.width()) / 2.0 / size;
    let half_h = f64::from(rect.height()) / 2.0 / size;
    let max_tile = 1_i64 << zoom;

    let mut tiles = Vec::new();
    for tile_y in (center_y - half_h).floor() as i64..=(center_y + half_h).floor() as i64 {
        if tile_y < 0 || tile_y >= max_tile {
            continue;
        }
        for tile_x in (center_x - half_w).floor() as i64..=(center_x + half_w).floor() as i64 {
            // Longitude wraps around
            let wrapped_x = tile_x.rem_euclid(max_tile);
            let min = rect.center()
                + Vec2::new(
                    ((tile_x as f64 - center_x) * size) as f32,
                    ((tile_y as f64 - center_y) * size) as f32,
                );
            let screen = Rect::from_min_size(min, Vec2::splat(size as f32));
            tiles.push((
                TileCoord::new(wrapped_x as u32, tile_y as u32, zoom),
                screen,
            ));
        }
    }
    tiles
}

enum TileState {
    Loading,
    Loaded(TextureHandle),
    /// Download or decode failed; retried once the backoff has elapsed.
    Failed { at: Instant, attempts: u32 },
}

/// Wait before retrying a tile that has failed `attempts` times.
fn retry_delay(attempts: u32) -> Duration {
    let factor = 1_u32 << attempts.saturating_sub(1).min(6);
    (RETRY_BASE * factor).min(RETRY_MAX)
}

fn retry_ready(failed_at: Instant, attempts: u32, now: Instant) -> bool {
    now.saturating_duration_since(failed_at) >= retry_delay(attempts)
}

type TileTable = Arc<Mutex<HashMap<TileCoord, TileState>>>;

pub struct TileManager {
    cache_dir: PathBuf,
    tiles: TileTable,
    queued: Arc<Mutex<HashSet<TileCoord>>>,
}

impl std::fmt::Debug for TileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileManager")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl Default for TileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TileManager {
    pub fn new() -> Self {
        let cache_dir = Self::cache_dir();

        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!("Failed to create tile cache directory: {}", e);
        }
        Self::cleanup_old_tiles(&cache_dir);

        Self {
            cache_dir,
            tiles: Arc::new(Mutex::new(HashMap::new())),
            queued: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn cache_dir() -> PathBuf {
        let mut path = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        path.push("meshmap-desktop");
        path.push("tiles");
        path
    }

    fn cleanup_old_tiles(cache_dir: &Path) {
        let now = SystemTime::now();
        let max_age = Duration::from_secs(CACHE_DURATION_DAYS * 24 * 60 * 60);

        let Ok(entries) = fs::read_dir(cache_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > max_age);
            if expired && fs::remove_file(entry.path()).is_ok() {
                debug!("Removed old tile cache: {:?}", entry.path());
            }
        }
    }

    /// Texture for `coord`, loading it from disk or queueing a download.
    pub fn get_tile(&self, coord: TileCoord, ctx: &egui::Context) -> Option<TextureHandle> {
        let Ok(mut tiles) = self.tiles.lock() else {
            return None;
        };

        match tiles.get(&coord) {
            Some(TileState::Loaded(texture)) => Some(texture.clone()),
            Some(TileState::Loading) => None,
            Some(&TileState::Failed { at, attempts }) => {
                if retry_ready(at, attempts, Instant::now()) {
                    debug!("Retrying tile {} after {} failures", coord.url(), attempts);
                    tiles.insert(coord, TileState::Loading);
                    drop(tiles);
                    self.queue_download(coord, attempts, ctx.clone());
                }
                None
            }
            None => {
                let cache_path = self.cache_dir.join(coord.cache_filename());
                if let Some(texture) = fs::read(&cache_path)
                    .ok()
                    .and_then(|bytes| decode_tile(&bytes, coord, ctx))
                {
                    tiles.insert(coord, TileState::Loaded(texture.clone()));
                    return Some(texture);
                }
                tiles.insert(coord, TileState::Loading);
                drop(tiles);
                self.queue_download(coord, 0, ctx.clone());
                None
            }
        }
    }

    fn queue_download(&self, coord: TileCoord, previous_failures: u32, ctx: egui::Context) {
        let Ok(mut queued) = self.queued.lock() else {
            return;
        };
        if !queued.insert(coord) {
            return;
        }
        drop(queued);

        let tiles = Arc::clone(&self.tiles);
        let queued = Arc::clone(&self.queued);
        let cache_dir = self.cache_dir.clone();
        std::thread::spawn(move || {
            let failed = || TileState::Failed {
                at: Instant::now(),
                attempts: previous_failures + 1,
            };
            let state = match download_tile(coord, &cache_dir) {
                Ok(bytes) => {
                    decode_tile(&bytes, coord, &ctx).map_or_else(failed, TileState::Loaded)
                }
                Err(e) => {
                    warn!("Failed to fetch tile {}: {}", coord.url(), e);
                    failed()
                }
            };
            if let Ok(mut tiles) = tiles.lock() {
                tiles.insert(coord, state);
            }
            if let Ok(mut queued) = queued.lock() {
                queued.remove(&coord);
            }
            ctx.request_repaint();
        });
    }

    pub fn has_loading_tiles(&self) -> bool {
        self.tiles
            .lock()
            .is_ok_and(|tiles| tiles.values().any(|s| matches!(s, TileState::Loading)))
    }
}

fn download_tile(coord: TileCoord, cache_dir: &Path) -> Result<Vec<u8>, reqwest::Error> {
    let url = coord.url();
    debug!("Downloading tile: {}", url);
    let bytes = reqwest::blocking::get(&url)?.error_for_status()?.bytes()?;

    if let Err(e) = fs::write(cache_dir.join(coord.cache_filename()), &bytes) {
        warn!("Failed to save tile to cache: {}", e);
    }
    Ok(bytes.to_vec())
}

fn decode_tile(bytes: &[u8], coord: TileCoord, ctx: &egui::Context) -> Option<TextureHandle> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            warn!("Failed to decode tile image: {}", e);
            return None;
        }
    };
    if img.width() as usize != TILE_PIXELS || img.height() as usize != TILE_PIXELS {
        return None;
    }

    let color_image =
        ColorImage::from_rgba_unmultiplied([TILE_PIXELS, TILE_PIXELS], &img.into_raw());
    Some(ctx.load_texture(
        format!("tile_{}_{}/{}", coord.zoom, coord.x, coord.y),
        color_image,
        egui::TextureOptions::default(),
    ))
}
