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

//! Background network worker.
//!
//! The GUI thread owns the [`Dashboard`](mesh_overlay::Dashboard) and never
//! blocks on I/O. Commands are sent to a dedicated thread running a tokio
//! runtime; every command executes in its own task, so a slow tick can
//! overlap the next one. Outcomes come back over a std channel and the
//! `notify` callback wakes the UI.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};
use mesh_overlay::{ApiClient, Command, Outcome};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Wake-up hook invoked after each outcome is queued.
pub type Notify = Arc<dyn Fn() + Send + Sync + 'static>;

pub struct NetworkWorker {
    commands: mpsc::UnboundedSender<Command>,
    outcomes: std_mpsc::Receiver<Outcome>,
    cancel_token: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for NetworkWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkWorker")
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl NetworkWorker {
    /// Start the worker thread for `client`.
    pub fn spawn(client: ApiClient, notify: Notify) -> std::io::Result<Self> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = std_mpsc::channel();
        let cancel_token = CancellationToken::new();

        let token = cancel_token.clone();
        let thread = std::thread::Builder::new()
            .name("meshmap-network".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to start network runtime: {}", e);
                        return;
                    }
                };
                runtime.block_on(run(client, command_rx, outcome_tx, notify, token));
            })?;

        info!("Network worker started");
        Ok(Self {
            commands: command_tx,
            outcomes: outcome_rx,
            cancel_token,
            thread: Some(thread),
        })
    }

    /// Queue a command for execution.
    pub fn send(&self, command: Command) {
        debug!("Dispatching {:?}", command);
        if self.commands.send(command).is_err() {
            warn!("Network worker is not running, command dropped");
        }
    }

    /// All outcomes received so far, without blocking.
    pub fn drain(&self) -> Vec<Outcome> {
        self.outcomes.try_iter().collect()
    }

    /// Wait up to `timeout` for the next outcome.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Outcome> {
        self.outcomes.recv_timeout(timeout).ok()
    }

    /// Stop the worker and wait for its thread.
    pub fn shutdown(&mut self) {
        self.cancel_token.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Network worker thread panicked");
            }
            info!("Network worker stopped");
        }
    }
}

impl Drop for NetworkWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run(
    client: ApiClient,
    mut commands: mpsc::UnboundedReceiver<Command>,
    outcomes: std_mpsc::Sender<Outcome>,
    notify: Notify,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                let client = client.clone();
                let outcomes = outcomes.clone();
                let notify = Arc::clone(&notify);
                let token = cancel_token.clone();
                // Superseded requests run to completion; the dashboard
                // discards their results by generation.
                tokio::spawn(async move {
                    let outcome = tokio::select! {
                        outcome = execute(&client, command) => outcome,
                        () = token.cancelled() => return,
                    };
                    if outcomes.send(outcome).is_ok() {
                        notify();
                    }
                });
            }
            () = cancel_token.cancelled() => {
                debug!("Network worker cancelled");
                break;
            }
        }
    }
}

async fn execute(client: &ApiClient, command: Command) -> Outcome {
    match command {
        Command::FetchNodes { generation } => Outcome::Nodes {
            generation,
            result: client.fetch_nodes().await,
        },
        Command::FetchRoutes { generation, limit } => Outcome::Routes {
            generation,
            result: client.fetch_traceroutes(limit).await,
        },
        Command::ClearRoutes => Outcome::Cleared(client.clear_traceroutes().await),
    }
}
