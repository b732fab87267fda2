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

//! Single-route focus state machine.
//!
//! The controller only tracks which route is focused and decides what a click
//! means. Applying the result to visuals is the overlay renderer's job.

use std::fmt;

/// Opaque handle to a route currently rendered on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteHandle(pub(crate) u64);

impl fmt::Display for RouteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightState {
    #[default]
    Idle,
    Focused(RouteHandle),
}

/// What the renderer must do in response to a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Routes are hidden; nothing changes.
    Ignored,
    /// Highlight `target`, hide everything else. `previous` is the route that
    /// was focused before, if any.
    Focus {
        previous: Option<RouteHandle>,
        target: RouteHandle,
    },
    /// Restore every route to its own style and close the popup.
    Release { previous: RouteHandle },
}

#[derive(Debug, Default)]
pub struct HighlightController {
    state: HighlightState,
}

impl HighlightController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> HighlightState {
        self.state
    }

    #[must_use]
    pub fn focused(&self) -> Option<RouteHandle> {
        match self.state {
            HighlightState::Idle => None,
            HighlightState::Focused(handle) => Some(handle),
        }
    }

    /// Handle a click on a rendered route.
    pub fn click(&mut self, handle: RouteHandle, routes_visible: bool) -> Transition {
        if !routes_visible {
            return Transition::Ignored;
        }

        match self.state {
            HighlightState::Focused(current) if current == handle => {
                self.state = HighlightState::Idle;
                Transition::Release { previous: current }
            }
            HighlightState::Focused(current) => {
                self.state = HighlightState::Focused(handle);
                Transition::Focus {
                    previous: Some(current),
                    target: handle,
                }
            }
            HighlightState::Idle => {
                self.state = HighlightState::Focused(handle);
                Transition::Focus {
                    previous: None,
                    target: handle,
                }
            }
        }
    }

    /// Enter `Focused` directly, e.g. when re-applying focus after a rebuild.
    pub fn focus(&mut self, handle: RouteHandle) {
        self.state = HighlightState::Focused(handle);
    }

    /// Force `Idle`. Returns the route that was focused.
    pub fn reset(&mut self) -> Option<RouteHandle> {
        let previous = self.focused();
        self.state = HighlightState::Idle;
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R1: RouteHandle = RouteHandle(1);
    const R2: RouteHandle = RouteHandle(2);

    #[test]
    fn test_starts_idle() {
        assert_eq!(HighlightController::new().state(), HighlightState::Idle);
    }

    #[test]
    fn test_click_focuses_then_releases() {
        let mut controller = HighlightController::new();

        assert_eq!(
            controller.click(R1, true),
            Transition::Focus { previous: None, target: R1 }
        );
        assert_eq!(controller.state(), HighlightState::Focused(R1));

        assert_eq!(controller.click(R1, true), Transition::Release { previous: R1 });
        assert_eq!(controller.state(), HighlightState::Idle);
    }

    #[test]
    fn test_switching_focus_skips_idle() {
        let mut controller = HighlightController::new();
        controller.click(R1, true);

        assert_eq!(
            controller.click(R2, true),
            Transition::Focus { previous: Some(R1), target: R2 }
        );
        assert_eq!(controller.focused(), Some(R2));
    }

    #[test]
    fn test_clicks_ignored_while_hidden() {
        let mut controller = HighlightController::new();
        assert_eq!(controller.click(R1, false), Transition::Ignored);
        assert_eq!(controller.state(), HighlightState::Idle);

        controller.click(R1, true);
        assert_eq!(controller.click(R2, false), Transition::Ignored);
        assert_eq!(controller.focused(), Some(R1));
    }

    #[test]
    fn test_reset_returns_previous() {
        let mut controller = HighlightController::new();
        controller.click(R2, true);
        assert_eq!(controller.reset(), Some(R2));
        assert_eq!(controller.reset(), None);
    }
}
