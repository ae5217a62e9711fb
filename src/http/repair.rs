//! Best-effort repair of malformed JSON payloads.
//!
//! The API occasionally returns JSON that does not parse. A small scanner
//! finds the first structural defect, one named rule fixes it, and the
//! payload is scanned again, at most [`MAX_REPAIR_ATTEMPTS`] times. Defects
//! without a rule abort the repair: no value is ever invented.
//!
//! The result is a diagnostic aid. It is not guaranteed to match what the
//! server meant to send.

use log::debug;
use serde_json::Value;

use crate::error::DecodeError;

/// Maximum number of rules applied to one payload.
pub const MAX_REPAIR_ATTEMPTS: usize = 50;

/// Deepest nesting the scanner walks into, the same limit as `serde_json`.
const MAX_DEPTH: usize = 128;

/// A payload that parsed, possibly after repairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub value: Value,
    /// Number of rules applied. Zero for valid input.
    pub repairs: usize,
}

/// Structural defects recognised by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Defect {
    /// A `,` `:` `]` or `}` is missing at the position.
    MissingDelimiter(char),
    /// An object key is not quoted; it ends at `end`.
    UnquotedKey { end: usize },
    /// A string runs into a line break or the end of input.
    UnterminatedString,
    /// Bytes follow the first complete value.
    TrailingGarbage,
    /// Anything else; no rule applies.
    Unexpected(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fault {
    position: usize,
    defect: Defect,
}

/// Parses `input`, repairing it first if needed.
///
/// # Errors
///
/// * [`DecodeError::Unrepairable`] - a defect with no rule was found
/// * [`DecodeError::RepairExhausted`] - still invalid after the maximum number of repairs
/// * [`DecodeError::Json`] - structurally sound but rejected by `serde_json`
///   (bad escape, bad number...)
///
/// # Examples
///
/// ```
/// use battlemetrics::http::repair;
///
/// let repaired = repair(r#"{"name": "Alice" "id": 7}"#).unwrap();
/// assert_eq!(repaired.value["id"], 7);
/// assert_eq!(repaired.repairs, 1);
/// ```
pub fn repair(input: &str) -> Result<Repaired, DecodeError> {
    let mut text = input.to_owned();
    let mut repairs = 0;

    loop {
        let Some(fault) = Scanner::new(&text).scan() else {
            let value = serde_json::from_str(&text)?;
            return Ok(Repaired { value, repairs });
        };

        if repairs == MAX_REPAIR_ATTEMPTS {
            return Err(DecodeError::RepairExhausted(repairs));
        }

        debug!("repair {} of malformed JSON: {:?}", repairs + 1, fault);
        apply(&mut text, fault)?;
        repairs += 1;
    }
}

fn apply(text: &mut String, fault: Fault) -> Result<(), DecodeError> {
    let Fault { position, defect } = fault;
    match defect {
        Defect::MissingDelimiter(delimiter) => text.insert(position, delimiter),
        Defect::UnquotedKey { end } => {
            text.insert(end, '"');
            text.insert(position, '"');
        }
        Defect::UnterminatedString => text.insert(position, '"'),
        Defect::TrailingGarbage => text.truncate(position),
        Defect::Unexpected(reason) => {
            return Err(DecodeError::Unrepairable {
                position,
                reason: reason.to_owned(),
            });
        }
    }
    Ok(())
}

/// Minimal recursive-descent walker over the payload bytes.
///
/// It only checks structure; scalars are validated by `serde_json` once the
/// structure is sound.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

type Scan = Result<(), Fault>;

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Scanner {
            bytes: text.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn scan(mut self) -> Option<Fault> {
        self.document().err()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn fault(&self, defect: Defect) -> Fault {
        Fault {
            position: self.pos.min(self.bytes.len()),
            defect,
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn document(&mut self) -> Scan {
        self.skip_whitespace();
        self.value()?;
        self.skip_whitespace();
        if self.pos < self.bytes.len() {
            return Err(self.fault(Defect::TrailingGarbage));
        }
        Ok(())
    }

    fn value(&mut self) -> Scan {
        match self.peek() {
            Some(b'{') => self.nested(Self::object),
            Some(b'[') => self.nested(Self::array),
            Some(b'"') => self.string(),
            Some(b'-' | b'0'..=b'9') => {
                self.number();
                Ok(())
            }
            Some(b't') => self.literal(b"true"),
            Some(b'f') => self.literal(b"false"),
            Some(b'n') => self.literal(b"null"),
            _ => Err(self.fault(Defect::Unexpected("expected a value"))),
        }
    }

    fn nested(&mut self, walk: fn(&mut Self) -> Scan) -> Scan {
        if self.depth == MAX_DEPTH {
            return Err(self.fault(Defect::Unexpected("nesting too deep")));
        }
        self.depth += 1;
        let result = walk(self);
        self.depth -= 1;
        result
    }

    fn object(&mut self) -> Scan {
        self.pos += 1;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(());
        }

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'"') => self.string()?,
                Some(b) if is_identifier_start(b) => {
                    let end = self.identifier_end();
                    return Err(self.fault(Defect::UnquotedKey { end }));
                }
                _ => return Err(self.fault(Defect::Unexpected("expected a property name"))),
            }

            self.skip_whitespace();
            if self.peek() != Some(b':') {
                return Err(self.fault(Defect::MissingDelimiter(':')));
            }
            self.pos += 1;

            self.skip_whitespace();
            self.value()?;
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                None => return Err(self.fault(Defect::MissingDelimiter('}'))),
                Some(_) => return Err(self.fault(Defect::MissingDelimiter(','))),
            }
        }
    }

    fn array(&mut self) -> Scan {
        self.pos += 1;
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(());
        }

        loop {
            self.skip_whitespace();
            self.value()?;
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(());
                }
                None => return Err(self.fault(Defect::MissingDelimiter(']'))),
                Some(_) => return Err(self.fault(Defect::MissingDelimiter(','))),
            }
        }
    }

    fn string(&mut self) -> Scan {
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'"' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'\\' => self.pos += 2,
                b'\n' | b'\r' => return Err(self.fault(Defect::UnterminatedString)),
                _ => self.pos += 1,
            }
        }
        Err(self.fault(Defect::UnterminatedString))
    }

    fn number(&mut self) {
        while matches!(
            self.peek(),
            Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
        ) {
            self.pos += 1;
        }
    }

    fn literal(&mut self, literal: &[u8]) -> Scan {
        if self.bytes[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.fault(Defect::Unexpected("invalid literal")))
        }
    }

    fn identifier_end(&self) -> usize {
        let mut end = self.pos;
        while self
            .bytes
            .get(end)
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'-'))
        {
            end += 1;
        }
        end
    }
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}
