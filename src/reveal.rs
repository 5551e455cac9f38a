//! Typewriter reveal of text into display targets.
//!
//! Streams run cooperatively on the calling task: `reveal_pair` polls both
//! streams with `tokio::join!`, so each target is only ever touched by its
//! own stream and no extra task is spawned.

use std::time::Duration;

use crate::app_config::RevealConfig;
use crate::config::{PRIMARY_CHAR_DELAY, SECONDARY_CHAR_DELAY};

/// A surface that text is typed into one character at a time.
pub trait RevealTarget {
    fn clear(&mut self);
    fn push_char(&mut self, ch: char);
    fn line_break(&mut self);
}

/// In-memory target, used for console rendering and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl RevealTarget for TextBuffer {
    fn clear(&mut self) {
        self.text.clear();
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
    }

    fn line_break(&mut self) {
        self.text.push('\n');
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealSpeeds {
    pub primary: Duration,
    pub secondary: Duration,
}

impl Default for RevealSpeeds {
    fn default() -> Self {
        Self {
            primary: PRIMARY_CHAR_DELAY,
            secondary: SECONDARY_CHAR_DELAY,
        }
    }
}

impl From<&RevealConfig> for RevealSpeeds {
    fn from(config: &RevealConfig) -> Self {
        Self {
            primary: Duration::from_millis(config.primary_char_ms),
            secondary: Duration::from_millis(config.secondary_char_ms),
        }
    }
}

/// Clear both targets and type `text_a`/`text_b` into them concurrently.
///
/// Resolves once both streams finish, i.e. after
/// `max(len_a * primary, len_b * secondary)`.
pub async fn reveal_pair<A, B>(
    target_a: &mut A,
    target_b: &mut B,
    text_a: &str,
    text_b: &str,
    speeds: RevealSpeeds,
) where
    A: RevealTarget + ?Sized,
    B: RevealTarget + ?Sized,
{
    target_a.clear();
    target_b.clear();

    tokio::join!(
        type_stream(target_a, text_a, speeds.primary),
        type_stream(target_b, text_b, speeds.secondary),
    );
}

async fn type_stream<T: RevealTarget + ?Sized>(target: &mut T, text: &str, delay: Duration) {
    for ch in text.chars() {
        if ch == '\n' {
            target.line_break();
        } else {
            target.push_char(ch);
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
