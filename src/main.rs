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

mod app;
mod config;
mod map;
mod network;
mod ui;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info, warn};
use mesh_overlay::{ApiClient, Dashboard, Outcome};

use app::MeshMapApp;
use config::AppConfig;
use network::NetworkWorker;

/// Desktop map of a mesh radio network with live traceroute overlays.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Backend base URL (e.g. http://localhost:8080)
    #[arg(long)]
    backend_url: Option<String>,

    /// Node id to center the map on at startup
    #[arg(long)]
    center_node: Option<String>,

    /// Seconds between refresh ticks
    #[arg(long)]
    interval: Option<u64>,

    /// Maximum traceroutes fetched per tick
    #[arg(long)]
    route_limit: Option<u32>,

    /// Run without a window, logging overlay updates
    #[arg(long)]
    headless: bool,

    /// Persist the effective configuration
    #[arg(long)]
    save_config: bool,
}

impl Args {
    /// Override persisted settings with the flags given on the command line.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.backend_url {
            config.backend_url.clone_from(url);
        }
        if let Some(node) = &self.center_node {
            config.center_node_id = Some(node.clone());
        }
        if let Some(interval) = self.interval {
            config.poll_interval_secs = interval;
        }
        if let Some(limit) = self.route_limit {
            config.route_limit = limit;
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("meshmap_desktop=info,mesh_overlay=info"),
    )
    .init();

    let args = Args::parse();
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    args.apply(&mut config);

    if args.save_config {
        match config.save() {
            Ok(()) => {
                let path = AppConfig::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                info!("Configuration saved to {}", path);
            }
            Err(e) => warn!("Failed to save configuration: {}", e),
        }
    }

    let client = match ApiClient::with_timeout(&config.backend_url, config.request_timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot create HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using backend {}", client.base_url());

    if args.headless {
        if let Err(e) = run_headless(&config, client) {
            error!("Headless mode failed: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_title("MeshMap Desktop"),
        ..Default::default()
    };

    eframe::run_native(
        "MeshMap Desktop",
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let worker = NetworkWorker::spawn(client, Arc::new(move || ctx.request_repaint()))?;
            Ok(Box::new(MeshMapApp::new(&config, worker)))
        }),
    )
}

/// Drive the dashboard from the main thread and log each completed tick.
fn run_headless(config: &AppConfig, client: ApiClient) -> std::io::Result<()> {
    let worker = NetworkWorker::spawn(client, Arc::new(|| {}))?;
    let mut dashboard = Dashboard::new(config.dashboard_config());
    info!(
        "Headless mode, polling every {}s",
        dashboard.scheduler().interval().as_secs()
    );

    loop {
        if let Some(command) = dashboard.poll(Instant::now()) {
            worker.send(command);
        }

        let wait = dashboard
            .scheduler()
            .time_until_due(Instant::now())
            .max(Duration::from_millis(50));
        let Some(outcome) = worker.recv_timeout(wait) else {
            continue;
        };

        let tick_done = matches!(outcome, Outcome::Routes { .. });
        if let Some(command) = dashboard.handle(outcome) {
            worker.send(command);
        }
        if let Some(request) = dashboard.take_viewport_request() {
            info!(
                "Initial view: ({:.5}, {:.5}) zoom {}",
                request.center.lat, request.center.lon, request.zoom
            );
        }
        if tick_done {
            let overlay = dashboard.overlay();
            info!(
                "Tick #{}: {} nodes, {} routes on map ({} fetched)",
                dashboard.scheduler().generation(),
                dashboard.nodes().len(),
                overlay.visible_routes().len(),
                dashboard.routes().fetched().len()
            );
            if let Some(error) = dashboard.last_error() {
                warn!("Last error: {}", error);
            }
        }
    }
}
