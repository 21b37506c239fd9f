/*!
 * Timed-line script parsing and validation.
 *
 * The upstream content pipeline hands over an ordered JSON array of records,
 * each shaped `[speaker, row1_text, row2_text, ..., duration_seconds]`. The
 * last element is always the duration; the number of text rows varies with
 * the configured caption row count.
 */

use log::warn;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::app_config::SpeakerNames;
use crate::errors::PipelineError;

/// Who speaks a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// Voice-over narration
    Narrator,
    /// First conversation partner
    SpeakerA,
    /// Second conversation partner
    SpeakerB,
}

impl Speaker {
    /// Resolve a raw speaker tag against the built-in tags and the configured display names
    pub fn from_tag(tag: &str, names: &SpeakerNames) -> Option<Self> {
        let tag = tag.trim();
        let matches = |candidates: &[&str]| candidates.iter().any(|c| c.eq_ignore_ascii_case(tag));

        if matches(&["N", "Narrator", names.narrator.as_str()]) {
            Some(Self::Narrator)
        } else if matches(&["A", "SpeakerA", names.speaker_a.as_str()]) {
            Some(Self::SpeakerA)
        } else if matches(&["B", "SpeakerB", names.speaker_b.as_str()]) {
            Some(Self::SpeakerB)
        } else {
            None
        }
    }

    /// Display name used in the caption label
    pub fn display_name<'a>(&self, names: &'a SpeakerNames) -> &'a str {
        match self {
            Self::Narrator => &names.narrator,
            Self::SpeakerA => &names.speaker_a,
            Self::SpeakerB => &names.speaker_b,
        }
    }

    /// Whether the caption carries a `"Name: "` prefix.
    /// Conversation partners are always labeled.
    pub fn is_labeled(&self, show_narrator_label: bool) -> bool {
        match self {
            Self::Narrator => show_narrator_label,
            Self::SpeakerA | Self::SpeakerB => true,
        }
    }

    /// Whether captions of this speaker ignore the horizontal offset
    pub fn is_centered(&self, center_narrator_text: bool) -> bool {
        matches!(self, Self::Narrator) && center_narrator_text
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narrator => write!(f, "narrator"),
            Self::SpeakerA => write!(f, "speaker-a"),
            Self::SpeakerB => write!(f, "speaker-b"),
        }
    }
}

/// One spoken line with its caption rows
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub speaker: Speaker,
    /// One entry per caption row, primary language first
    pub text_rows: Vec<String>,
    pub duration_seconds: f64,
}

impl Line {
    pub fn new(speaker: Speaker, text_rows: Vec<String>, duration_seconds: f64) -> Self {
        let text_rows = if text_rows.is_empty() { vec![String::new()] } else { text_rows };
        Self {
            speaker,
            text_rows,
            duration_seconds,
        }
    }

    /// Text of a caption row, if the record carries it
    pub fn row(&self, row_index: usize) -> Option<&str> {
        self.text_rows.get(row_index).map(String::as_str)
    }
}

/// Read and parse a script file
pub fn load_script(path: &Path, names: &SpeakerNames) -> Result<Vec<Line>, PipelineError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::Io(format!("Failed to read script {}: {}", path.display(), e)))?;
    parse_script(&content, names)
}

/// Parse the JSON line format into validated lines
pub fn parse_script(content: &str, names: &SpeakerNames) -> Result<Vec<Line>, PipelineError> {
    let value: Value = serde_json::from_str(content).map_err(|e| PipelineError::InvalidInput {
        index: 0,
        reason: format!("script is not valid JSON: {}", e),
    })?;

    let records = value
        .as_array()
        .ok_or_else(|| PipelineError::invalid_input(0, "script must be a JSON array of line records"))?;

    let lines = records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_record(index, record, names))
        .collect::<Result<Vec<_>, _>>()?;

    validate_lines(&lines)?;
    Ok(lines)
}

fn parse_record(index: usize, record: &Value, names: &SpeakerNames) -> Result<Line, PipelineError> {
    let fields = record
        .as_array()
        .ok_or_else(|| PipelineError::invalid_input(index, "record is not an array"))?;

    if fields.len() < 2 {
        return Err(PipelineError::invalid_input(
            index,
            format!("record needs at least a speaker and a duration, got {} element(s)", fields.len()),
        ));
    }

    let tag = fields[0]
        .as_str()
        .ok_or_else(|| PipelineError::invalid_input(index, format!("speaker tag is not a string: {}", fields[0])))?;
    let speaker = Speaker::from_tag(tag, names)
        .ok_or_else(|| PipelineError::invalid_input(index, format!("unknown speaker tag '{}'", tag)))?;

    let last = &fields[fields.len() - 1];
    let duration = last
        .as_f64()
        .ok_or_else(|| PipelineError::invalid_input(index, format!("duration is not a number: {}", last)))?;

    let text_rows = fields[1..fields.len() - 1]
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            other => Err(PipelineError::invalid_input(
                index,
                format!("caption row {} is not a string: {}", row + 1, other),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Line::new(speaker, text_rows, duration))
}

/// Check the structural soundness of a line sequence.
///
/// Fails on an empty sequence, on a duration that is negative or not finite,
/// and when no line has a positive duration.
pub fn validate_lines(lines: &[Line]) -> Result<(), PipelineError> {
    if lines.is_empty() {
        return Err(PipelineError::invalid_input(0, "script contains no lines"));
    }

    for (index, line) in lines.iter().enumerate() {
        if !line.duration_seconds.is_finite() {
            return Err(PipelineError::invalid_input(
                index,
                format!("duration {} is not a finite number", line.duration_seconds),
            ));
        }
        if line.duration_seconds < 0.0 {
            return Err(PipelineError::invalid_input(
                index,
                format!("duration {} is negative", line.duration_seconds),
            ));
        }
    }

    let total: f64 = lines.iter().map(|line| line.duration_seconds).sum();
    if !total.is_finite() {
        return Err(PipelineError::invalid_input(
            lines.len() - 1,
            "durations add up to more than a representable length",
        ));
    }

    if !lines.iter().any(|line| line.duration_seconds > 0.0) {
        return Err(PipelineError::invalid_input(
            lines.len() - 1,
            "every line has zero duration, the narration would be empty",
        ));
    }

    let missing_rows = lines.iter().filter(|line| line.text_rows.iter().all(|t| t.trim().is_empty())).count();
    if missing_rows > 0 {
        warn!("{} line(s) carry no caption text", missing_rows);
    }

    Ok(())
}
