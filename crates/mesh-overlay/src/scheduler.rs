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

//! Poll cadence and tick generations.
//!
//! Every tick (and every out-of-band route refresh) gets a fresh generation
//! number. Results tagged with an older generation are stale and must be
//! dropped: superseded requests are left to finish, never cancelled.

use std::time::{Duration, Instant};

use log::debug;

/// Default refresh period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    last_tick: Option<Instant>,
    generation: u64,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl PollScheduler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a tick should start at `now`. The first call is always due.
    #[must_use]
    pub fn due(&self, now: Instant) -> bool {
        self.last_tick
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Time left until the next tick is due.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.last_tick.map_or(Duration::ZERO, |last| {
            self.interval
                .saturating_sub(now.saturating_duration_since(last))
        })
    }

    /// Start a full tick and return its generation.
    pub fn begin_tick(&mut self, now: Instant) -> u64 {
        self.last_tick = Some(now);
        self.generation += 1;
        debug!("Poll tick, generation {}", self.generation);
        self.generation
    }

    /// Start a route-only refresh outside the regular cadence.
    ///
    /// Supersedes any in-flight tick, so its late results are discarded.
    pub fn begin_route_refresh(&mut self) -> u64 {
        self.generation += 1;
        debug!("Route refresh, generation {}", self.generation);
        self.generation
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_is_due() {
        let scheduler = PollScheduler::default();
        assert!(scheduler.due(Instant::now()));
        assert_eq!(scheduler.generation(), 0);
    }

    #[test]
    fn test_due_after_interval() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        let start = Instant::now();
        scheduler.begin_tick(start);

        assert!(!scheduler.due(start + Duration::from_secs(9)));
        assert!(scheduler.due(start + Duration::from_secs(10)));
        assert_eq!(
            scheduler.time_until_due(start + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
    }

    #[test]
    fn test_newer_generation_supersedes() {
        let mut scheduler = PollScheduler::default();
        let first = scheduler.begin_tick(Instant::now());
        let second = scheduler.begin_tick(Instant::now());

        assert!(second > first);
        assert!(!scheduler.is_current(first));
        assert!(scheduler.is_current(second));

        let refresh = scheduler.begin_route_refresh();
        assert!(!scheduler.is_current(second));
        assert!(scheduler.is_current(refresh));
    }

    #[test]
    fn test_route_refresh_keeps_cadence() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        let start = Instant::now();
        scheduler.begin_tick(start);
        scheduler.begin_route_refresh();

        assert!(!scheduler.due(start + Duration::from_secs(5)));
    }
}
