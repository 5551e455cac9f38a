//! Minimum on-screen time per stage.

use std::time::Duration;

use crate::app_config::PacingConfig;
use crate::config::{MIN_DISPLAY_TIME, POEM_POST_DISPLAY_TIME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min_display: Duration,
    pub poem_post_display: Duration,
}

impl Pacing {
    /// `max(0, min_display - elapsed)`.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.min_display.saturating_sub(elapsed)
    }

    /// The last stage holds for at least `poem_post_display`.
    pub fn final_delay(&self, elapsed: Duration) -> Duration {
        self.remaining(elapsed).max(self.poem_post_display)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_display: MIN_DISPLAY_TIME,
            poem_post_display: POEM_POST_DISPLAY_TIME,
        }
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        Self {
            min_display: config.min_display(),
            poem_post_display: config.poem_post_display(),
        }
    }
}
