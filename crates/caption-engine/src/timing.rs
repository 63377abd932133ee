//! Word timing to frame ranges
//!
//! Frames are numbered from 1, matching the decoder's `1.jpeg, 2.jpeg, ...`
//! naming. A word spoken over `[start, end)` seconds covers frames
//! `max(1, ⌊start·fps⌋) .. ⌊end·fps⌋`.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// One recognized word with its timestamps in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionWord {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionWord {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Frames this word is drawn on (end exclusive)
    pub fn frame_range(&self, framerate: f64) -> Range<u32> {
        let begin = frame_index(self.start * framerate).max(1);
        let end = frame_index(self.end * framerate);
        begin..end
    }
}

/// Floor to a frame index; negative and NaN clamp to 0
fn frame_index(t: f64) -> u32 {
    t.floor() as u32
}

/// A word paired with the frames it will be drawn on
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledWord<'a> {
    pub word: &'a CaptionWord,
    pub frames: Range<u32>,
}

/// Map words to frame ranges for a video of `total_frames` frames.
///
/// Words are taken in order; the walk stops at the first word whose end
/// frame is not below `total_frames`, and no later word is scheduled.
pub fn schedule(words: &[CaptionWord], framerate: f64, total_frames: u32) -> Vec<ScheduledWord<'_>> {
    let mut scheduled = Vec::with_capacity(words.len());
    for word in words {
        let frames = word.frame_range(framerate);
        if frames.end >= total_frames {
            tracing::debug!(
                "Stopping schedule at {:?}: end frame {} of {}",
                word.text,
                frames.end,
                total_frames
            );
            break;
        }
        scheduled.push(ScheduledWord { word, frames });
    }
    scheduled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_range_floors() {
        let word = CaptionWord::new(1.02, 1.51, "hi");
        assert_eq!(word.frame_range(30.0), 30..45);
    }

    #[test]
    fn test_frame_range_starts_at_one() {
        assert_eq!(CaptionWord::new(0.0, 0.5, "a").frame_range(30.0), 1..15);
        assert_eq!(CaptionWord::new(-2.0, 0.1, "a").frame_range(30.0), 1..3);
    }

    #[test]
    fn test_frame_range_can_be_empty() {
        let range = CaptionWord::new(0.50, 0.51, "a").frame_range(30.0);
        assert_eq!(range, 15..15);
        assert!(range.is_empty());
    }

    #[test]
    fn test_schedule_stops_at_first_late_word() {
        let words = vec![
            CaptionWord::new(0.0, 1.0, "one"),
            CaptionWord::new(1.0, 2.0, "two"),
            CaptionWord::new(2.0, 3.4, "three"),
            CaptionWord::new(0.0, 0.5, "early"),
        ];
        let scheduled = schedule(&words, 10.0, 30);
        let texts: Vec<_> = scheduled.iter().map(|s| s.word.text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(scheduled[1].frames, 10..20);
    }

    #[test]
    fn test_schedule_end_equal_to_total_is_excluded() {
        let words = vec![CaptionWord::new(0.0, 3.0, "edge")];
        assert!(schedule(&words, 10.0, 30).is_empty());
        assert_eq!(schedule(&words, 10.0, 31).len(), 1);
    }

    #[test]
    fn test_words_from_json() {
        let words: Vec<CaptionWord> =
            serde_json::from_str(r#"[{"start": 0.25, "end": 0.75, "text": "hello"}]"#).unwrap();
        assert_eq!(words[0], CaptionWord::new(0.25, 0.75, "hello"));
    }
}
