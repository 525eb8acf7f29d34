//! Parser for the trace stream written by an instrumented program.
//!
//! The stream is a bracket-delimited sequence of fixed-arity tuples:
//!
//! ```text
//! [(1, 'for_3', 10),(0, 'for_3', 0.0021),(2, 0.0105)]
//! ```
//!
//! - `(0, tag, seconds)` - loop timer, one per loop invocation
//! - `(1, tag, count)`   - loop iteration counter, one per loop invocation
//! - `(2, seconds)`      - program timer (a tag field is tolerated)
//!
//! Tags may be single- or double-quoted and trailing commas are allowed.
//! Any event that does not fit this shape fails the whole parse.

use crate::utils::config::{
    KIND_LOOP_COUNTER, KIND_LOOP_TIMER, KIND_PROGRAM_TIMER, TRACE_CLOSE_MARKER, TRACE_OPEN_MARKER,
};
use crate::utils::error::TraceError;
use log::debug;
use serde::Serialize;
use std::fmt;

/// Kind of a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LoopTimer,
    LoopCounter,
    ProgramTimer,
}

impl EventKind {
    pub fn code(&self) -> i64 {
        match self {
            Self::LoopTimer => KIND_LOOP_TIMER,
            Self::LoopCounter => KIND_LOOP_COUNTER,
            Self::ProgramTimer => KIND_PROGRAM_TIMER,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            KIND_LOOP_TIMER => Some(Self::LoopTimer),
            KIND_LOOP_COUNTER => Some(Self::LoopCounter),
            KIND_PROGRAM_TIMER => Some(Self::ProgramTimer),
            _ => None,
        }
    }
}

/// One `(kind, tag, value)` record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub kind: EventKind,
    /// Loop tag; `None` for the program timer
    pub tag: Option<String>,
    pub value: f64,
    /// Exact iteration count; 0 for timer events
    pub count: u64,
}

impl TraceEvent {
    pub fn loop_timer(tag: impl Into<String>, seconds: f64) -> Self {
        Self {
            kind: EventKind::LoopTimer,
            tag: Some(tag.into()),
            value: seconds,
            count: 0,
        }
    }

    pub fn loop_counter(tag: impl Into<String>, count: u64) -> Self {
        Self {
            kind: EventKind::LoopCounter,
            tag: Some(tag.into()),
            value: count as f64,
            count,
        }
    }

    pub fn program_timer(seconds: f64) -> Self {
        Self {
            kind: EventKind::ProgramTimer,
            tag: None,
            value: seconds,
            count: 0,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self
            .tag
            .as_deref()
            .unwrap_or_default()
            .replace('\\', "\\\\")
            .replace('\'', "\\'");
        match self.kind {
            EventKind::LoopTimer => {
                write!(f, "({}, '{}', {:?})", self.kind.code(), tag, self.value)
            }
            EventKind::LoopCounter => {
                write!(f, "({}, '{}', {})", self.kind.code(), tag, self.count)
            }
            EventKind::ProgramTimer => write!(f, "({}, {:?})", self.kind.code(), self.value),
        }
    }
}

/// Event counts per kind, for validation output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub loop_timers: usize,
    pub loop_counters: usize,
    pub program_timers: usize,
}

impl KindCounts {
    pub fn total(&self) -> usize {
        self.loop_timers + self.loop_counters + self.program_timers
    }
}

pub fn count_kinds(events: &[TraceEvent]) -> KindCounts {
    let mut counts = KindCounts::default();
    for event in events {
        match event.kind {
            EventKind::LoopTimer => counts.loop_timers += 1,
            EventKind::LoopCounter => counts.loop_counters += 1,
            EventKind::ProgramTimer => counts.program_timers += 1,
        }
    }
    counts
}

/// Parse a complete trace stream
///
/// **Public** - main entry point for parsing
///
/// # Arguments
/// * `input` - Raw trace text, from the opening `[` to the closing `]`
///
/// # Returns
/// Events in emission order
///
/// # Errors
/// * `TraceError::Empty` - Nothing but whitespace
/// * `TraceError::Truncated` - Stream ends before the closing marker
/// * Any other `TraceError` - An event does not fit `(kind, tag, value)`
pub fn parse_trace(input: &str) -> Result<Vec<TraceEvent>, TraceError> {
    let mut cursor = Cursor::new(input);

    cursor.skip_whitespace();
    if cursor.at_end() {
        return Err(TraceError::Empty);
    }
    if !cursor.eat(TRACE_OPEN_MARKER) {
        return Err(TraceError::MissingOpenMarker);
    }

    let mut events = Vec::new();
    loop {
        cursor.skip_separators();
        match cursor.peek() {
            None => return Err(TraceError::Truncated(cursor.pos)),
            Some(c) if c == TRACE_CLOSE_MARKER => {
                cursor.bump();
                break;
            }
            Some('(') => events.push(parse_event(&mut cursor)?),
            Some(found) => {
                return Err(TraceError::UnexpectedChar {
                    found,
                    offset: cursor.pos,
                })
            }
        }
    }

    cursor.skip_whitespace();
    if let Some(found) = cursor.peek() {
        return Err(TraceError::UnexpectedChar {
            found,
            offset: cursor.pos,
        });
    }

    debug!("Parsed {} trace events", events.len());
    Ok(events)
}

/// A raw tuple field before it is checked against the event shape
#[derive(Debug, Clone, PartialEq)]
enum Field {
    Number { value: f64, text: String },
    Text(String),
}

fn parse_event(cursor: &mut Cursor<'_>) -> Result<TraceEvent, TraceError> {
    let offset = cursor.pos;
    cursor.bump(); // '('

    let mut fields = Vec::new();
    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => return Err(TraceError::Truncated(cursor.pos)),
            Some(')') => {
                cursor.bump();
                break;
            }
            Some('\'') | Some('"') => fields.push(Field::Text(parse_quoted(cursor)?)),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                fields.push(parse_number(cursor)?)
            }
            Some(found) => {
                return Err(TraceError::UnexpectedChar {
                    found,
                    offset: cursor.pos,
                })
            }
        }

        cursor.skip_whitespace();
        match cursor.peek() {
            Some(',') => cursor.bump(),
            Some(')') => {}
            None => return Err(TraceError::Truncated(cursor.pos)),
            Some(found) => {
                return Err(TraceError::UnexpectedChar {
                    found,
                    offset: cursor.pos,
                })
            }
        }
    }

    build_event(fields, offset)
}

fn build_event(fields: Vec<Field>, offset: usize) -> Result<TraceEvent, TraceError> {
    let code = match fields.first() {
        Some(Field::Number { value, text }) if is_integer_text(text) => *value as i64,
        Some(Field::Number { text, .. }) => {
            return Err(TraceError::InvalidNumber {
                text: text.clone(),
                offset,
            })
        }
        _ => {
            return Err(TraceError::WrongArity {
                offset,
                found: fields.len(),
                expected: 3,
            })
        }
    };
    let kind = EventKind::from_code(code).ok_or(TraceError::UnknownKind { kind: code, offset })?;

    match kind {
        EventKind::ProgramTimer => {
            let value_field = match fields.len() {
                2 => &fields[1],
                3 => &fields[2],
                found => {
                    return Err(TraceError::WrongArity {
                        offset,
                        found,
                        expected: 2,
                    })
                }
            };
            Ok(TraceEvent::program_timer(number(value_field, offset)?))
        }
        EventKind::LoopTimer | EventKind::LoopCounter => {
            if fields.len() != 3 {
                return Err(TraceError::WrongArity {
                    offset,
                    found: fields.len(),
                    expected: 3,
                });
            }
            let tag = match &fields[1] {
                Field::Text(tag) if !tag.is_empty() => tag.clone(),
                _ => return Err(TraceError::MissingTag(offset)),
            };
            if kind == EventKind::LoopCounter {
                Ok(TraceEvent::loop_counter(tag, counter(&fields[2], offset)?))
            } else {
                Ok(TraceEvent::loop_timer(tag, number(&fields[2], offset)?))
            }
        }
    }
}

fn number(field: &Field, offset: usize) -> Result<f64, TraceError> {
    match field {
        Field::Number { value, .. } => Ok(*value),
        Field::Text(text) => Err(TraceError::InvalidNumber {
            text: text.clone(),
            offset,
        }),
    }
}

/// Counters are parsed from their text so values above 2^53 stay exact
fn counter(field: &Field, offset: usize) -> Result<u64, TraceError> {
    match field {
        Field::Number { text, .. } => text.parse::<u64>().map_err(|_| TraceError::InvalidNumber {
            text: text.clone(),
            offset,
        }),
        Field::Text(text) => Err(TraceError::InvalidNumber {
            text: text.clone(),
            offset,
        }),
    }
}

fn is_integer_text(text: &str) -> bool {
    !text.contains(['.', 'e', 'E'])
}

fn parse_quoted(cursor: &mut Cursor<'_>) -> Result<String, TraceError> {
    let quote = cursor.peek().unwrap_or('\'');
    cursor.bump();

    let mut out = String::new();
    loop {
        match cursor.peek() {
            None => return Err(TraceError::Truncated(cursor.pos)),
            Some('\\') => {
                cursor.bump();
                match cursor.peek() {
                    Some(escaped) => {
                        out.push(escaped);
                        cursor.bump();
                    }
                    None => return Err(TraceError::Truncated(cursor.pos)),
                }
            }
            Some(c) if c == quote => {
                cursor.bump();
                return Ok(out);
            }
            Some(c) => {
                out.push(c);
                cursor.bump();
            }
        }
    }
}

fn parse_number(cursor: &mut Cursor<'_>) -> Result<Field, TraceError> {
    let offset = cursor.pos;
    let mut text = String::new();

    while let Some(c) = cursor.peek() {
        if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
            text.push(c);
            cursor.bump();
        } else {
            break;
        }
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Field::Number { value, text }),
        _ => Err(TraceError::InvalidNumber { text, offset }),
    }
}

/// Byte-offset cursor over the raw trace
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace() || c == ',') {
            self.bump();
        }
    }
}
