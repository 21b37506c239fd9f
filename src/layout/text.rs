use once_cell::sync::Lazy;
use regex::Regex;

use super::Script;

// @module: Caption text sanitizing, script detection and advance-width metrics

// @const: Whitespace runs
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Advance of full-width glyphs (CJK, Hangul, fullwidth forms) in em
pub const WIDE_ADVANCE: f64 = 1.0;
/// Advance of every other glyph in em
pub const NARROW_ADVANCE: f64 = 0.56;
/// Advance of a space in em
pub const SPACE_ADVANCE: f64 = 0.3;

/// Strip control and invisible format characters and collapse whitespace.
///
/// Line breaks and tabs become spaces; wrapping decides where lines break.
pub fn sanitize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' | '\u{2028}' | '\u{2029}' => Some(' '),
            '\u{200B}'..='\u{200F}' | '\u{FEFF}' | '\u{202A}'..='\u{202E}' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    WHITESPACE_REGEX.replace_all(cleaned.trim(), " ").into_owned()
}

pub fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{1100}'..='\u{11FF}'
        | '\u{3130}'..='\u{318F}'
        | '\u{A960}'..='\u{A97F}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{D7B0}'..='\u{D7FF}')
}

/// Han ideographs, kana and CJK punctuation
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'
        | '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{31F0}'..='\u{31FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF65}'..='\u{FF9F}'
        | '\u{20000}'..='\u{2FA1F}')
}

fn is_fullwidth_form(c: char) -> bool {
    matches!(c, '\u{FF01}'..='\u{FF60}' | '\u{FFE0}'..='\u{FFE6}')
}

/// Whether a glyph occupies a full em
pub fn is_wide(c: char) -> bool {
    is_cjk(c) || is_hangul(c) || is_fullwidth_form(c)
}

/// Dominant script of a text.
///
/// Counts Hangul and CJK code points; the larger count wins, a tie goes to
/// whichever appears first. Text with neither is Latin.
pub fn classify(text: &str) -> Script {
    let mut hangul = 0usize;
    let mut cjk = 0usize;
    let mut first = None;

    for c in text.chars() {
        if is_hangul(c) {
            hangul += 1;
            first.get_or_insert(Script::Hangul);
        } else if is_cjk(c) {
            cjk += 1;
            first.get_or_insert(Script::Cjk);
        }
    }

    match hangul.cmp(&cjk) {
        std::cmp::Ordering::Greater => Script::Hangul,
        std::cmp::Ordering::Less => Script::Cjk,
        std::cmp::Ordering::Equal => first.unwrap_or(Script::Latin),
    }
}

/// Advance of one glyph in em
pub fn char_advance(c: char) -> f64 {
    if c == ' ' {
        SPACE_ADVANCE
    } else if is_wide(c) {
        WIDE_ADVANCE
    } else {
        NARROW_ADVANCE
    }
}

/// Estimated rendered width of a single line in pixels
pub fn line_width_px(line: &str, font_size: u32) -> u32 {
    let em: f64 = line.chars().map(char_advance).sum();
    (em * font_size as f64).ceil() as u32
}
