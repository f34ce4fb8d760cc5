//! Length models used to price encoded text
//!
//! The optimizer only compares lengths, so any monotone cost works. Two models
//! are provided: raw byte length and the token count of the `cl100k_base`
//! vocabulary. If the vocabulary cannot be loaded, tokens are approximated
//! with a regex pre-tokenizer instead.

use crate::common::error::{SchemaPressError, SchemaPressResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// How the length of a text fragment is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthModel {
    /// UTF-8 byte length
    #[default]
    Chars,
    /// LLM token count
    Tokens,
}

fn encoder() -> Option<&'static CoreBPE> {
    static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();
    ENCODER
        .get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(err) => {
                warn!(error = %err, "cl100k_base unavailable, approximating token counts");
                None
            }
        })
        .as_ref()
}

fn pretokenizer() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z]+|[0-9]+|\s+|[^A-Za-z0-9\s]").expect("static pattern is valid")
    })
}

impl LengthModel {
    /// Returns the length of `text` under this model
    pub fn measure(&self, text: &str) -> usize {
        match self {
            LengthModel::Chars => text.len(),
            LengthModel::Tokens => match encoder() {
                Some(bpe) => bpe.encode_ordinary(text).len(),
                None => approximate_tokens(text),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LengthModel::Chars => "chars",
            LengthModel::Tokens => "tokens",
        }
    }
}

/// Counts tokens the way common BPE vocabularies split schema text: letter runs
/// cost one token per four characters, digit runs one per three, every other
/// symbol one token. Whitespace is absorbed by the following word.
fn approximate_tokens(text: &str) -> usize {
    pretokenizer()
        .find_iter(text)
        .map(|piece| {
            let s = piece.as_str();
            let first = s.chars().next().unwrap_or(' ');
            if first.is_whitespace() {
                0
            } else if first.is_ascii_alphabetic() {
                s.len().div_ceil(4)
            } else if first.is_ascii_digit() {
                s.len().div_ceil(3)
            } else {
                1
            }
        })
        .sum()
}

impl fmt::Display for LengthModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LengthModel {
    type Err = SchemaPressError;

    fn from_str(s: &str) -> SchemaPressResult<Self> {
        match s.to_lowercase().as_str() {
            "chars" | "bytes" => Ok(LengthModel::Chars),
            "tokens" => Ok(LengthModel::Tokens),
            other => Err(SchemaPressError::InvalidArgument(format!(
                "unknown length model '{}', expected chars or tokens",
                other
            ))),
        }
    }
}
