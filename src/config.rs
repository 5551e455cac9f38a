use std::time::Duration;

/// Minimum time a stage stays on screen before the next one may start.
pub const MIN_DISPLAY_TIME: Duration = Duration::from_millis(5000);
/// Floor on how long the generated poem stays visible before handoff.
pub const POEM_POST_DISPLAY_TIME: Duration = Duration::from_millis(6000);
/// Pause between completing a step and auto-activating the next one.
pub const ADVANCE_DELAY: Duration = Duration::from_millis(2000);

pub const PRIMARY_CHAR_DELAY: Duration = Duration::from_millis(80);
pub const SECONDARY_CHAR_DELAY: Duration = Duration::from_millis(40);

pub const TYPING_START_DELAY: Duration = Duration::from_millis(140);
pub const TYPING_MIN_STEP_MS: u64 = 45;
pub const TYPING_MAX_EXTRA_MS: u64 = 90;
pub const THINKING_DOT_INTERVAL: Duration = Duration::from_millis(500);

/// Tracks holding this many steps or fewer are rendered centered.
pub const CENTERED_TRACK_MAX: usize = 3;

pub const MAX_UPLOAD_MB: u64 = 5;
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const GLYPH_IMAGE_DIR: &str = "/static/nvshu_images";
/// Time each guessed character stays on screen before the next one.
pub const GUESS_FRAME_DELAY: Duration = Duration::from_millis(1100);
/// Extra hold on the last guess before the answer appears.
pub const GUESS_FINAL_HOLD: Duration = Duration::from_millis(1000);
