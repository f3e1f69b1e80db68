use std::fmt;
use std::fmt::Write as _;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;

// @module: SRT document model, parsing and serialization

// @const: SRT timing line, optional position hints after the end time
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})(?:\s+.*)?$")
        .expect("timing regex is valid")
});

const BOM: char = '\u{feff}';

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, lines joined with '\n'
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: impl Into<String>) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: text.into(),
        }
    }

    /// Copy of this entry with the same identity and timing but different text
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        SubtitleEntry {
            seq_num: self.seq_num,
            start_time_ms: self.start_time_ms,
            end_time_ms: self.end_time_ms,
            text: text.into(),
        }
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm`, `.` also accepted) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, String> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();
        if parts.len() != 4 {
            return Err(format!("invalid timestamp format: {}", timestamp));
        }

        let mut values = [0u64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("non-numeric timestamp component '{}' in {}", part, timestamp))?;
        }
        let [hours, minutes, seconds, millis] = values;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(format!("time component out of range in timestamp: {}", timestamp));
        }

        hours
            .checked_mul(3_600_000)
            .and_then(|ms| ms.checked_add(minutes * 60_000 + seconds * 1_000 + millis))
            .ok_or_else(|| format!("timestamp out of range: {}", timestamp))
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        // A blank line would end the block early on re-read
        for line in self.text.split('\n').filter(|line| !line.trim().is_empty()) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Where the parser is inside the current block
enum ParseState {
    ExpectIndex,
    ExpectTiming { seq_num: usize, index_line: usize },
    Text { entry: SubtitleEntry },
}

/// Ordered, immutable list of subtitle entries
///
/// Documents are never edited in place. Translation produces a new document
/// through [`SubtitleDocument::with_translations`], leaving the source entries
/// available for retries and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    entries: Vec<SubtitleEntry>,
}

impl SubtitleDocument {
    pub fn new(entries: Vec<SubtitleEntry>) -> Self {
        SubtitleDocument { entries }
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry texts in document order
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.text.clone()).collect()
    }

    /// Parse raw SRT bytes
    ///
    /// Accepts a UTF-8 byte-order mark, any mix of CRLF and LF endings,
    /// blank lines around blocks and multi-line text. Text lines are kept
    /// verbatim apart from the line terminator.
    pub fn parse(bytes: &[u8]) -> Result<Self, SubtitleError> {
        let content = std::str::from_utf8(bytes).map_err(|e| {
            let line = bytes[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1;
            SubtitleError::parse(line, "invalid UTF-8")
        })?;
        Self::parse_str(content)
    }

    /// Parse SRT content that is already decoded
    pub fn parse_str(content: &str) -> Result<Self, SubtitleError> {
        let content = content.strip_prefix(BOM).unwrap_or(content);
        let mut entries = Vec::new();
        let mut state = ParseState::ExpectIndex;

        for (idx, raw_line) in content.split('\n').enumerate() {
            let line_no = idx + 1;
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            let blank = line.trim().is_empty();

            state = match state {
                ParseState::ExpectIndex if blank => ParseState::ExpectIndex,
                ParseState::ExpectIndex => {
                    let seq_num = line.trim().parse::<usize>().map_err(|_| {
                        SubtitleError::parse(line_no, format!("expected a numeric index, found '{}'", line.trim()))
                    })?;
                    ParseState::ExpectTiming { seq_num, index_line: line_no }
                }
                ParseState::ExpectTiming { .. } if blank => {
                    return Err(SubtitleError::parse(line_no, "missing timing line"));
                }
                ParseState::ExpectTiming { seq_num, .. } => {
                    let (start_time_ms, end_time_ms) = Self::parse_timing(line, line_no)?;
                    ParseState::Text {
                        entry: SubtitleEntry::new(seq_num, start_time_ms, end_time_ms, String::new()),
                    }
                }
                ParseState::Text { entry } if blank => {
                    entries.push(entry);
                    ParseState::ExpectIndex
                }
                ParseState::Text { mut entry } => {
                    if !entry.text.is_empty() {
                        entry.text.push('\n');
                    }
                    entry.text.push_str(line);
                    ParseState::Text { entry }
                }
            };
        }

        match state {
            ParseState::ExpectIndex => {}
            ParseState::ExpectTiming { index_line, .. } => {
                return Err(SubtitleError::parse(index_line, "missing timing line after index"));
            }
            ParseState::Text { entry } => entries.push(entry),
        }

        debug!("Parsed {} subtitle entries", entries.len());
        Ok(SubtitleDocument { entries })
    }

    fn parse_timing(line: &str, line_no: usize) -> Result<(u64, u64), SubtitleError> {
        let caps = TIMING_REGEX
            .captures(line)
            .ok_or_else(|| SubtitleError::parse(line_no, format!("malformed timing line '{}'", line.trim())))?;

        let to_ms = |first: usize| -> Result<u64, SubtitleError> {
            let stamp = format!("{}:{}:{},{}", &caps[first], &caps[first + 1], &caps[first + 2], &caps[first + 3]);
            SubtitleEntry::parse_timestamp(&stamp).map_err(|reason| SubtitleError::parse(line_no, reason))
        };

        let start = to_ms(1)?;
        let end = to_ms(5)?;
        if end < start {
            return Err(SubtitleError::parse(
                line_no,
                format!("end time {} is before start time {}", end, start),
            ));
        }
        Ok((start, end))
    }

    /// Serialize to SRT text, renumbering entries from 1 in document order
    pub fn to_srt_string(&self) -> String {
        let mut out = String::new();
        for (position, entry) in self.entries.iter().enumerate() {
            let numbered = SubtitleEntry {
                seq_num: position + 1,
                ..entry.clone()
            };
            // Writing into a String cannot fail
            let _ = write!(out, "{}", numbered);
        }
        out
    }

    /// Serialize to SRT bytes (UTF-8, LF endings, no BOM)
    pub fn to_srt_bytes(&self) -> Vec<u8> {
        self.to_srt_string().into_bytes()
    }

    /// New document with each entry's text replaced, timing and order kept
    pub fn with_translations(&self, texts: Vec<String>) -> Result<Self, SubtitleError> {
        if texts.len() != self.entries.len() {
            return Err(SubtitleError::LengthMismatch {
                expected: self.entries.len(),
                actual: texts.len(),
            });
        }

        let entries = self
            .entries
            .iter()
            .zip(texts)
            .map(|(entry, text)| entry.with_text(text))
            .collect();
        Ok(SubtitleDocument { entries })
    }
}
