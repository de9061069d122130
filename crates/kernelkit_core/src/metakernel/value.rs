//! Typed metakernel values and scalar classification.
//!
//! # Invariants
//! - A single-quoted token is always a string, whatever it contains.
//! - Arrays hold scalars only; they never nest.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Full-token numeric literal. `d`/`D` exponents are the toolkit's
/// Fortran-style notation.
static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eEdD][+-]?[0-9]+)?$")
        .expect("numeric literal pattern is valid")
});

/// Field name to value, last assignment wins.
pub type FieldTable = BTreeMap<String, FieldValue>;

/// One array element or standalone value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::String(_) => None,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

/// Right-hand side of one `NAME = VALUE` assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    String(String),
    Array(Vec<Scalar>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Scalar]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Array elements, or the scalar as a one-element list.
    pub fn to_scalars(&self) -> Vec<Scalar> {
        match self {
            Self::Array(items) => items.clone(),
            Self::String(value) => vec![Scalar::String(value.clone())],
            Self::Number(value) => vec![Scalar::Number(*value)],
        }
    }

    /// Appends `other` for `NAME += VALUE`, promoting scalars to arrays.
    pub(crate) fn append(self, other: FieldValue) -> FieldValue {
        let mut items = self.to_scalars();
        items.extend(other.to_scalars());
        FieldValue::Array(items)
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::String(value) => Self::String(value),
            Scalar::Number(value) => Self::Number(value),
        }
    }
}

/// Classifies one raw token.
///
/// `'...'` yields the interior verbatim, a full numeric literal yields a
/// number, anything else (including the empty token) is a bare symbol string.
pub fn parse_scalar(token: &str) -> Scalar {
    if let Some(inner) = unquote(token) {
        return Scalar::String(inner.to_string());
    }
    match parse_number(token) {
        Some(number) => Scalar::Number(number),
        None => Scalar::String(token.to_string()),
    }
}

fn unquote(token: &str) -> Option<&str> {
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

fn parse_number(token: &str) -> Option<f64> {
    if !NUMERIC_LITERAL.is_match(token) {
        return None;
    }
    token.replace(['d', 'D'], "e").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_scalar, FieldValue, Scalar};

    #[test]
    fn quoted_digits_stay_strings() {
        assert_eq!(parse_scalar("'3'"), Scalar::String("3".to_string()));
        assert_eq!(parse_scalar("''"), Scalar::String(String::new()));
    }

    #[test]
    fn numeric_forms_are_numbers() {
        assert_eq!(parse_scalar("42"), Scalar::Number(42.0));
        assert_eq!(parse_scalar("-1.5"), Scalar::Number(-1.5));
        assert_eq!(parse_scalar(".25"), Scalar::Number(0.25));
        assert_eq!(parse_scalar("3."), Scalar::Number(3.0));
        assert_eq!(parse_scalar("1e3"), Scalar::Number(1000.0));
        assert_eq!(parse_scalar("2.5D-1"), Scalar::Number(0.25));
    }

    #[test]
    fn edge_tokens_are_bare_symbols() {
        for token in ["", "'", "'open", "1.2.3", "NaN", "Infinity", "0x10", "e5", "+"] {
            assert_eq!(
                parse_scalar(token),
                Scalar::String(token.to_string()),
                "token `{token}`"
            );
        }
    }

    #[test]
    fn append_promotes_scalars() {
        let base = FieldValue::String("a".to_string());
        let merged = base.append(FieldValue::Array(vec![Scalar::Number(1.0)]));
        assert_eq!(
            merged,
            FieldValue::Array(vec![Scalar::String("a".to_string()), Scalar::Number(1.0)])
        );
    }

    #[test]
    fn number_display_drops_trailing_zero() {
        assert_eq!(Scalar::Number(42.0).to_string(), "42");
        assert_eq!(Scalar::Number(0.5).to_string(), "0.5");
    }
}
