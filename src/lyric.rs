//! Timestamped-lyric ("LRC") handling.
//!
//! Lyrics arrive as lines of the form `[mm:ss.cc]text`. Each line is
//! tokenized and its token ids written into a pad-filled sequence of
//! `max_frames` entries, starting at the frame that corresponds to the
//! line's timestamp. The CFM reads this frame-aligned sequence so that
//! sung words land at the right time in the generated song.

use crate::model::LyricTokenizer;
use crate::{Error, Result};

/// Padding token id for frames with no lyric.
pub const PAD_TOKEN: u32 = 0;

/// One parsed lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Offset of the line from the start of the song, in seconds.
    pub start_s: f32,
    pub text: String,
}

/// Parse `[mm:ss.cc]` timestamped lyrics.
///
/// Blank lines and timestamped lines with no text are skipped. A non-blank
/// line without a leading timestamp marker is invalid input.
pub fn parse_lrc(lyric: &str) -> Result<Vec<LyricLine>> {
    let mut lines = Vec::new();
    for raw in lyric.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_timestamp(trimmed) {
            Some((start_s, text)) => {
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(LyricLine {
                        start_s,
                        text: text.to_string(),
                    });
                }
            }
            None => {
                return Err(Error::InvalidInput(format!(
                    "lyric line missing [mm:ss.cc] timestamp: {trimmed:?}"
                )))
            }
        }
    }
    Ok(lines)
}

/// Parse a leading `[mm:ss.cc]` marker, returning (seconds, rest of line).
fn parse_timestamp(line: &str) -> Option<(f32, &str)> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    let (stamp, text) = (&rest[..end], &rest[end + 1..]);

    let (minutes, seconds) = stamp.split_once(':')?;
    let minutes: u32 = minutes.parse().ok()?;
    let (whole, frac) = seconds.split_once('.')?;
    let whole: u32 = whole.parse().ok()?;
    if whole >= 60 {
        return None;
    }
    let frac: f32 = format!("0.{frac}").parse().ok()?;

    Some((minutes as f32 * 60.0 + whole as f32 + frac, text))
}

/// Tokenize timestamped lyrics into a frame-aligned token sequence.
///
/// Returns the `max_frames`-long token sequence and the normalized start
/// time of the first lyric line in `[0, 1]` (0.0 for empty lyrics).
pub fn tokenize_lyrics(
    lyric: &str,
    tokenizer: &dyn LyricTokenizer,
    audio_length_s: u32,
    max_frames: usize,
) -> Result<(Vec<u32>, f32)> {
    let lines = parse_lrc(lyric)?;

    let start_time = lines
        .first()
        .map(|line| (line.start_s / audio_length_s as f32).clamp(0.0, 1.0))
        .unwrap_or(0.0);

    let frames_per_second = max_frames as f32 / audio_length_s as f32;
    let mut placed = Vec::with_capacity(lines.len());
    for line in &lines {
        let frame = (line.start_s * frames_per_second) as usize;
        placed.push((frame, tokenizer.encode(&line.text)?));
    }

    Ok((place_tokens(&placed, max_frames), start_time))
}

/// Write each line's token ids at its frame offset.
///
/// Lines overlapping a previous line are pushed to start right after it;
/// tokens past `max_frames` are dropped.
fn place_tokens(lines: &[(usize, Vec<u32>)], max_frames: usize) -> Vec<u32> {
    let mut out = vec![PAD_TOKEN; max_frames];
    let mut cursor = 0usize;
    for (frame, ids) in lines {
        let start = (*frame).max(cursor);
        if start >= max_frames {
            break;
        }
        let len = ids.len().min(max_frames - start);
        out[start..start + len].copy_from_slice(&ids[..len]);
        cursor = start + len;
    }
    out
}
