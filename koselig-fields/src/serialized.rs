//! Decoding of PHP `serialize()` blobs stored in meta values.
//!
//! Supported: `N;`, `b:`, `i:`, `d:`, `s:`, `a:` and `O:` (objects decode to
//! their property map, the class name is dropped). String lengths are byte
//! lengths, as written by PHP. Nesting is capped at [`MAX_DEPTH`] levels.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use thiserror::Error;

static SERIALIZED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:N;|[aOsbid]:.*[;}])$").expect("serialized-blob pattern is valid")
});

/// Why a blob could not be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SerializedError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),

    #[error("expected {expected} at byte {pos}")]
    Unexpected { pos: usize, expected: &'static str },

    #[error("invalid number at byte {0}")]
    InvalidNumber(usize),

    #[error("string at byte {0} is not valid UTF-8")]
    InvalidUtf8(usize),

    #[error("trailing data at byte {0}")]
    TrailingData(usize),

    #[error("nesting deeper than {max} levels at byte {0}", max = MAX_DEPTH)]
    TooDeep(usize),
}

/// Deepest array/object nesting the decoder accepts.
pub const MAX_DEPTH: usize = 128;

/// Returns true if `value` looks like a serialized blob.
///
/// Matches the usual heuristic: after trimming, `N;` or a type letter
/// followed by `:` and ending in `;` or `}`.
pub fn is_serialized(value: &str) -> bool {
    SERIALIZED.is_match(value.trim())
}

/// Decode a serialized blob into JSON.
pub fn unserialize(input: &str) -> Result<Value, SerializedError> {
    let mut parser = Parser {
        bytes: input.trim().as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    if parser.pos != parser.bytes.len() {
        return Err(SerializedError::TrailingData(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Result<u8, SerializedError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or(SerializedError::UnexpectedEnd(self.pos))
    }

    fn eat(&mut self, byte: u8, expected: &'static str) -> Result<(), SerializedError> {
        if self.peek()? != byte {
            return Err(SerializedError::Unexpected {
                pos: self.pos,
                expected,
            });
        }
        self.pos += 1;
        Ok(())
    }

    /// Bytes up to (not including) `terminator`, consuming the terminator.
    fn until(&mut self, terminator: u8) -> Result<&'a str, SerializedError> {
        let start = self.pos;
        let len = self.bytes[start..]
            .iter()
            .position(|b| *b == terminator)
            .ok_or(SerializedError::UnexpectedEnd(self.bytes.len()))?;
        self.pos = start + len + 1;
        std::str::from_utf8(&self.bytes[start..start + len])
            .map_err(|_| SerializedError::InvalidUtf8(start))
    }

    fn length(&mut self) -> Result<usize, SerializedError> {
        let start = self.pos;
        self.until(b':')?
            .parse()
            .map_err(|_| SerializedError::InvalidNumber(start))
    }

    fn value(&mut self) -> Result<Value, SerializedError> {
        let tag = self.peek()?;
        self.pos += 1;
        match tag {
            b'N' => {
                self.eat(b';', "';'")?;
                Ok(Value::Null)
            }
            b'b' => {
                self.eat(b':', "':'")?;
                let start = self.pos;
                match self.until(b';')? {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    _ => Err(SerializedError::InvalidNumber(start)),
                }
            }
            b'i' => {
                self.eat(b':', "':'")?;
                let start = self.pos;
                let n: i64 = self
                    .until(b';')?
                    .parse()
                    .map_err(|_| SerializedError::InvalidNumber(start))?;
                Ok(Value::Number(n.into()))
            }
            b'd' => {
                self.eat(b':', "':'")?;
                let start = self.pos;
                let n: f64 = self
                    .until(b';')?
                    .parse()
                    .map_err(|_| SerializedError::InvalidNumber(start))?;
                Ok(Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null))
            }
            b's' => {
                self.eat(b':', "':'")?;
                Ok(Value::String(self.string_body()?))
            }
            b'a' => {
                self.eat(b':', "':'")?;
                let count = self.length()?;
                self.entries(count)
            }
            b'O' => {
                self.eat(b':', "':'")?;
                let _class = self.string_body_with(b':')?;
                let count = self.length()?;
                self.entries(count)
            }
            _ => Err(SerializedError::Unexpected {
                pos: self.pos - 1,
                expected: "type tag",
            }),
        }
    }

    fn string_body(&mut self) -> Result<String, SerializedError> {
        self.string_body_with(b';')
    }

    /// `<len>:"<bytes>"` followed by `terminator`.
    fn string_body_with(&mut self, terminator: u8) -> Result<String, SerializedError> {
        let len = self.length()?;
        self.eat(b'"', "'\"'")?;
        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(SerializedError::UnexpectedEnd(self.bytes.len()))?;
        let s = std::str::from_utf8(&self.bytes[start..end])
            .map_err(|_| SerializedError::InvalidUtf8(start))?
            .to_string();
        self.pos = end;
        self.eat(b'"', "'\"'")?;
        self.eat(terminator, "terminator")?;
        Ok(s)
    }

    /// `{<key><value>...}` with `count` pairs. Sequential integer keys from 0
    /// become an array, anything else an object.
    fn entries(&mut self, count: usize) -> Result<Value, SerializedError> {
        if self.depth >= MAX_DEPTH {
            return Err(SerializedError::TooDeep(self.pos));
        }
        self.depth += 1;
        let value = self.entries_body(count);
        self.depth -= 1;
        value
    }

    fn entries_body(&mut self, count: usize) -> Result<Value, SerializedError> {
        self.eat(b'{', "'{'")?;
        let mut pairs = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => {
                    return Err(SerializedError::Unexpected {
                        pos: self.pos,
                        expected: "integer or string key",
                    })
                }
            };
            let value = self.value()?;
            pairs.push((key, value));
        }
        self.eat(b'}', "'}'")?;

        let sequential = pairs
            .iter()
            .enumerate()
            .all(|(i, (k, _))| *k == i.to_string());
        if sequential {
            Ok(Value::Array(pairs.into_iter().map(|(_, v)| v).collect()))
        } else {
            Ok(Value::Object(pairs.into_iter().collect::<Map<_, _>>()))
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Arbitrary input never panics the decoder.
        #[test]
        fn prop_unserialize_total(input in ".{0,64}") {
            let _ = unserialize(&input);
        }

        /// Length prefixes anywhere in the `usize` range are rejected, not
        /// trusted.
        #[test]
        fn prop_huge_length_prefix(
            len in prop_oneof![
                (usize::MAX - 4096)..=usize::MAX,
                64usize..(1 << 20),
            ],
            body in "[a-z]{0,8}",
            tag in prop_oneof![Just("s"), Just("O")],
        ) {
            let blob = if tag == "s" {
                format!("s:{len}:\"{body}\";")
            } else {
                format!("O:{len}:\"{body}\":0:{{}}")
            };
            prop_assert!(unserialize(&blob).is_err());
        }

        #[test]
        fn prop_strings_decode(s in "[a-zA-Z0-9 \u{e9}\u{4e2d}]{0,32}") {
            let blob = format!("s:{}:\"{}\";", s.len(), s);
            prop_assert!(is_serialized(&blob));
            prop_assert_eq!(unserialize(&blob).unwrap(), Value::String(s));
        }
    }
}
