//! Tolerant JSON repair for model output.
//!
//! The model is asked for bare JSON but regularly wraps it in code fences,
//! adds commentary around it, types smart quotes or leaves a trailing comma.
//! `repair_json` runs an ordered pipeline of small cleanup steps and then
//! parses. It never returns a partial structure: either the whole object
//! parses or the caller gets a `MalformedAiOutput` holding the cleaned text.
//!
//! Steps, in order:
//! 1. `strip_fences`          leading/trailing ``` fences (optionally `json`)
//! 2. `strip_separator_lines` lines made only of `---` / `===`
//! 3. `slice_object`          first `{` through last `}`
//! 4. `normalize_characters`  smart quotes, zero-width characters, BOM
//! 5. `strip_trailing_commas` `,` directly before `}` or `]`
//! 6. `check_balance` + parse

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

#[derive(Debug, Error)]
pub enum MalformedAiOutput {
    #[error("AI output is empty")]
    Empty,

    #[error("AI output contains no JSON object")]
    NoObject { cleaned: String },

    #[error("AI output has unbalanced braces ({opens} opening, {closes} closing)")]
    Unbalanced {
        opens: usize,
        closes: usize,
        cleaned: String,
    },

    #[error("AI output is not valid JSON: {source}")]
    Invalid {
        source: serde_json::Error,
        cleaned: String,
    },

    #[error("AI output is JSON but not an object")]
    NotAnObject { cleaned: String },

    #[error("AI output does not match the expected shape: {source}")]
    Shape {
        source: serde_json::Error,
        cleaned: String,
    },
}

impl MalformedAiOutput {
    /// The text as it looked after cleanup, for diagnostics.
    pub fn cleaned(&self) -> &str {
        match self {
            MalformedAiOutput::Empty => "",
            MalformedAiOutput::NoObject { cleaned }
            | MalformedAiOutput::Unbalanced { cleaned, .. }
            | MalformedAiOutput::Invalid { cleaned, .. }
            | MalformedAiOutput::NotAnObject { cleaned }
            | MalformedAiOutput::Shape { cleaned, .. } => cleaned,
        }
    }
}

/// Repairs `raw` and parses it as a JSON object.
pub fn repair_json(raw: &str) -> Result<Map<String, Value>, MalformedAiOutput> {
    let cleaned = clean(raw)?;
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(MalformedAiOutput::NotAnObject { cleaned }),
        Err(source) => Err(MalformedAiOutput::Invalid { source, cleaned }),
    }
}

/// Repairs `raw` and deserializes it straight into `T`.
pub fn repair_into<T: DeserializeOwned>(raw: &str) -> Result<T, MalformedAiOutput> {
    let map = repair_json(raw)?;
    let value = Value::Object(map);
    serde_json::from_value(value.clone()).map_err(|source| MalformedAiOutput::Shape {
        source,
        cleaned: value.to_string(),
    })
}

fn clean(raw: &str) -> Result<String, MalformedAiOutput> {
    if raw.trim().is_empty() {
        return Err(MalformedAiOutput::Empty);
    }

    let unfenced = strip_fences(raw);
    let unseparated = strip_separator_lines(unfenced);
    let sliced = slice_object(&unseparated).ok_or_else(|| MalformedAiOutput::NoObject {
        cleaned: unseparated.clone(),
    })?;
    let normalized = normalize_characters(sliced);
    let cleaned = strip_trailing_commas(&normalized);

    let (opens, closes) = count_braces(&cleaned);
    if !check_balance(&cleaned) {
        return Err(MalformedAiOutput::Unbalanced {
            opens,
            closes,
            cleaned,
        });
    }

    Ok(cleaned)
}

/// Removes a leading ``` / ```json fence and a trailing ``` fence.
pub fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// Drops lines consisting solely of three or more `-` or `=` characters.
pub fn strip_separator_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !is_separator(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_separator(line: &str) -> bool {
    line.len() >= 3 && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '='))
}

/// Returns the text from the first `{` to the last `}`, inclusive.
pub fn slice_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Straightens typographic quotes and removes invisible characters.
///
/// A curly double quote that appears inside a string opened with a straight
/// `"` is content, so it is escaped (`\"`) rather than closing the string.
pub fn normalize_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lexer = Lexer::default();
    let mut opened_by_curly = false;

    for c in text.chars().filter(|c| !ZERO_WIDTH.contains(c)) {
        match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => {
                if lexer.in_string && !lexer.escaped && !opened_by_curly {
                    out.push_str("\\\"");
                    continue;
                }
                lexer.step('"');
                out.push('"');
                opened_by_curly = lexer.in_string;
            }
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => {
                lexer.step('\'');
                out.push('\'');
            }
            other => {
                let was_in_string = lexer.in_string;
                lexer.step(other);
                if other == '"' && !was_in_string {
                    opened_by_curly = false;
                }
                out.push(other);
            }
        }
    }
    out
}

/// Removes a comma that is followed (after optional whitespace) by `}` or `]`.
/// Commas inside string literals are left alone.
pub fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lexer = Lexer::default();
    // A structural comma and the whitespace seen after it, not yet emitted.
    let mut pending: Option<String> = None;

    for c in text.chars() {
        let structural = lexer.step(c);

        if let Some(mut held) = pending.take() {
            if c.is_whitespace() {
                held.push(c);
                pending = Some(held);
                continue;
            }
            if structural && (c == '}' || c == ']') {
                out.push_str(&held[1..]);
            } else {
                out.push_str(&held);
            }
        }

        if structural && c == ',' {
            pending = Some(String::from(","));
            continue;
        }
        out.push(c);
    }

    if let Some(held) = pending {
        out.push_str(&held);
    }
    out
}

/// True when every `{` outside string literals is closed, in order.
pub fn check_balance(text: &str) -> bool {
    let mut lexer = Lexer::default();
    let mut depth: i64 = 0;
    for c in text.chars() {
        if !lexer.step(c) {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !lexer.in_string
}

fn count_braces(text: &str) -> (usize, usize) {
    let mut lexer = Lexer::default();
    let (mut opens, mut closes) = (0, 0);
    for c in text.chars() {
        if lexer.step(c) {
            match c {
                '{' => opens += 1,
                '}' => closes += 1,
                _ => {}
            }
        }
    }
    (opens, closes)
}

/// Tracks whether the scan is inside a JSON string literal.
#[derive(Default)]
struct Lexer {
    in_string: bool,
    escaped: bool,
}

impl Lexer {
    /// Feeds one character; returns true if it is outside any string literal
    /// (opening and closing quotes count as inside).
    fn step(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return false;
        }
        if c == '"' {
            self.in_string = true;
            return false;
        }
        true
    }
}
