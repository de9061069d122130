//! Structural metakernel parse: data section, assignments and kernel paths.
//!
//! # Invariants
//! - Text without a `\begindata` section is "not a metakernel" (`Ok(None)`),
//!   never an error.
//! - `paths` preserves `KERNELS_TO_LOAD` order.

use crate::metakernel::lexer::{array_elements, logical_lines, normalize};
use crate::metakernel::value::{parse_scalar, FieldTable, FieldValue, Scalar};
use log::debug;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DATA_MARKER: &str = "\\begindata";
const KERNELS_TO_LOAD: &str = "KERNELS_TO_LOAD";
const PATH_SYMBOLS: &str = "PATH_SYMBOLS";
const PATH_VALUES: &str = "PATH_VALUES";

pub type MetakernelResult<T> = Result<T, MetakernelError>;

/// Parsed data section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetakernel {
    /// Symbol-resolved `KERNELS_TO_LOAD`, or `None` when that field is absent.
    pub paths: Option<Vec<String>>,
    pub fields: FieldTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetakernelError {
    /// A logical line inside the data section has no `=`.
    MissingAssignment { line_number: usize, line: String },
}

impl Display for MetakernelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAssignment { line_number, line } => write!(
                f,
                "metakernel line {line_number} is not an assignment: `{line}`"
            ),
        }
    }
}

impl Error for MetakernelError {}

/// Parses metakernel text.
///
/// Returns `Ok(None)` when no `\begindata ... \` section exists, so callers
/// can fall back to treating the input as a binary kernel.
///
/// # Errors
/// - [`MetakernelError::MissingAssignment`] for a data line without `=`.
pub fn parse_metakernel(text: &str) -> MetakernelResult<Option<ParsedMetakernel>> {
    let Some(section) = data_section(text) else {
        return Ok(None);
    };

    let normalized = normalize(section);
    let mut fields = FieldTable::new();
    for (index, line) in logical_lines(&normalized).enumerate() {
        let (name, value, append) = parse_assignment(line, index + 1)?;
        let value = match fields.remove(&name) {
            Some(existing) if append => existing.append(value),
            _ => value,
        };
        fields.insert(name, value);
    }

    let paths = resolve_paths(&fields);
    debug!(
        "event=metakernel_parse module=metakernel status=ok fields={} paths={}",
        fields.len(),
        paths.as_ref().map_or(0, Vec::len)
    );
    Ok(Some(ParsedMetakernel { paths, fields }))
}

/// Parses raw bytes, decoding them as UTF-8 (invalid sequences replaced).
pub fn parse_metakernel_bytes(bytes: &[u8]) -> MetakernelResult<Option<ParsedMetakernel>> {
    parse_metakernel(&String::from_utf8_lossy(bytes))
}

fn data_section(text: &str) -> Option<&str> {
    let start = text.find(DATA_MARKER)? + DATA_MARKER.len();
    let rest = &text[start..];
    let end = rest.find('\\')?;
    Some(&rest[..end])
}

fn parse_assignment(line: &str, line_number: usize) -> MetakernelResult<(String, FieldValue, bool)> {
    let Some((lhs, rhs)) = line.split_once('=') else {
        return Err(MetakernelError::MissingAssignment {
            line_number,
            line: line.trim().to_string(),
        });
    };

    let lhs = lhs.trim();
    let (name, append) = match lhs.strip_suffix('+') {
        Some(name) => (name.trim_end(), true),
        None => (lhs, false),
    };
    Ok((name.to_string(), parse_value(rhs.trim()), append))
}

fn parse_value(token: &str) -> FieldValue {
    let Some(body) = token.strip_prefix('(') else {
        return parse_scalar(token).into();
    };
    let inner = body.strip_suffix(')').unwrap_or(body);
    FieldValue::Array(array_elements(inner).into_iter().map(parse_scalar).collect())
}

fn resolve_paths(fields: &FieldTable) -> Option<Vec<String>> {
    let kernels = fields.get(KERNELS_TO_LOAD)?;
    let mut paths: Vec<String> = kernels
        .to_scalars()
        .iter()
        .map(Scalar::to_string)
        .collect();

    if let (Some(symbols), Some(values)) = (fields.get(PATH_SYMBOLS), fields.get(PATH_VALUES)) {
        let substitutions: Vec<(String, String)> = symbols
            .to_scalars()
            .iter()
            .zip(values.to_scalars().iter())
            .map(|(symbol, value)| (format!("${symbol}"), value.to_string()))
            .collect();
        for path in &mut paths {
            for (placeholder, value) in &substitutions {
                *path = path.replace(placeholder.as_str(), value);
            }
        }
    }
    Some(paths)
}
