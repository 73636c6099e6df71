//! # CAPTCHA Provider
//!
//! Rendering puzzles is someone else's job. The gate only needs an answer
//! and a 128 x 128 map image to show, and asks a [`CaptchaProvider`] for
//! one whenever a session reaches the CAPTCHA stage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bastion_protocol::packets::MapData;
use bastion_protocol::ProtocolVersion;

/// Map id every CAPTCHA is drawn on.
pub const MAP_ID: i32 = 0;

const PIXELS: usize = MapData::SIZE * MapData::SIZE;

/// A rendered puzzle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Captcha {
    answer: String,
    colors: Vec<u8>,
}

impl Captcha {
    /// Creates a puzzle; `colors` are map palette indices, row major,
    /// padded or cut to 128 x 128.
    #[must_use]
    pub fn new(answer: impl Into<String>, mut colors: Vec<u8>) -> Self {
        colors.resize(PIXELS, 0);
        Self { answer: answer.into().to_lowercase(), colors }
    }

    /// Expected answer, lowercase.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Whether `input` solves the puzzle, ignoring case.
    #[must_use]
    pub fn is_solved_by(&self, input: &str) -> bool {
        input.to_lowercase() == self.answer
    }

    /// Map packets drawing the image.
    ///
    /// 1.7 clients only accept one column per packet.
    #[must_use]
    pub fn map_packets(&self, version: ProtocolVersion) -> Vec<MapData> {
        if version.greater_or_equal(ProtocolVersion::V1_8) {
            return vec![MapData { map_id: MAP_ID, x: 0, y: 0, colors: self.colors.clone() }];
        }
        (0..MapData::SIZE)
            .map(|column| {
                let colors = (0..MapData::SIZE).map(|row| self.colors[row * MapData::SIZE + column]).collect();
                // columns are below 128
                #[allow(clippy::cast_possible_truncation)]
                let x = column as u8;
                MapData { map_id: MAP_ID, x, y: 0, colors }
            })
            .collect()
    }
}

/// Source of puzzles.
pub trait CaptchaProvider: Send + Sync {
    /// Next puzzle, or `None` while none are ready.
    fn next_captcha(&self) -> Option<Arc<Captcha>>;
}

/// Hands out a fixed set of puzzles round-robin.
#[derive(Debug, Default)]
pub struct StaticCaptchaProvider {
    captchas: Vec<Arc<Captcha>>,
    cursor: AtomicUsize,
}

impl StaticCaptchaProvider {
    /// Creates a provider; an empty set behaves like "still preparing".
    #[must_use]
    pub fn new(captchas: Vec<Captcha>) -> Self {
        Self { captchas: captchas.into_iter().map(Arc::new).collect(), cursor: AtomicUsize::new(0) }
    }
}

impl CaptchaProvider for StaticCaptchaProvider {
    fn next_captcha(&self) -> Option<Arc<Captcha>> {
        if self.captchas.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.captchas.len();
        Some(Arc::clone(&self.captchas[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_ignore_case() {
        let captcha = Captcha::new("Xk7Q", Vec::new());
        assert_eq!(captcha.answer(), "xk7q");
        assert!(captcha.is_solved_by("XK7q"));
        assert!(!captcha.is_solved_by("xk7"));
    }

    #[test]
    fn test_legacy_maps_are_sent_by_column() {
        let mut colors = vec![0; PIXELS];
        colors[MapData::SIZE + 5] = 42; // row 1, column 5
        let captcha = Captcha::new("a", colors);

        assert_eq!(captcha.map_packets(ProtocolVersion::V1_8).len(), 1);
        let columns = captcha.map_packets(ProtocolVersion::V1_7_6);
        assert_eq!(columns.len(), MapData::SIZE);
        assert_eq!(columns[5].x, 5);
        assert_eq!(columns[5].colors[1], 42);
        assert_eq!(columns[4].colors[1], 0);
    }

    #[test]
    fn test_static_provider_round_robin() {
        let provider = StaticCaptchaProvider::new(vec![Captcha::new("one", Vec::new()), Captcha::new("two", Vec::new())]);
        let answers: Vec<String> =
            (0..3).filter_map(|_| provider.next_captcha()).map(|captcha| captcha.answer().to_owned()).collect();
        assert_eq!(answers, ["one", "two", "one"]);

        assert!(StaticCaptchaProvider::default().next_captcha().is_none());
    }
}
