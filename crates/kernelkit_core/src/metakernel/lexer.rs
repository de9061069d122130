//! Line normalization and array tokenization for metakernel data sections.
//!
//! Grammar handled here:
//! - `NAME = VALUE` assignments, one per logical line;
//! - `( ... )` array literals, possibly spanning several physical lines;
//! - `'...'` strings, inside which `=`, `(`, `)`, `,` and whitespace are literal.

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// A quote starts a string only at the head of a token; `O'NEIL` is bare.
fn opens_token(previous: Option<char>) -> bool {
    match previous {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '(' | ',' | '='),
    }
}

/// Joins every assignment onto one logical line.
///
/// Whitespace (line breaks included) after an `=` collapses to one space, and
/// line breaks inside an array literal become spaces. Running the pass on its
/// own output changes nothing.
pub fn normalize(section: &str) -> String {
    let mut out = String::with_capacity(section.len());
    let mut chars = section.chars().peekable();
    let mut depth = 0usize;
    let mut in_quote = false;

    while let Some(c) = chars.next() {
        if in_quote {
            match c {
                '\'' => {
                    in_quote = false;
                    out.push(c);
                }
                c if is_line_break(c) && depth > 0 => out.push(' '),
                c if is_line_break(c) => {
                    // Strings never span lines outside an array.
                    in_quote = false;
                    out.push(c);
                }
                c => out.push(c),
            }
            continue;
        }

        match c {
            '\'' if opens_token(out.chars().last()) => {
                in_quote = true;
                out.push(c);
            }
            '(' => {
                depth += 1;
                out.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                out.push(c);
            }
            '=' => {
                out.push('=');
                let mut skipped = false;
                while chars.next_if(|next| next.is_whitespace()).is_some() {
                    skipped = true;
                }
                if skipped {
                    out.push(' ');
                }
            }
            c if is_line_break(c) && depth > 0 => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Non-blank logical lines of normalized text.
pub fn logical_lines(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(is_line_break)
        .filter(|line| !line.trim().is_empty())
}

/// Splits the inside of an array literal into raw element tokens.
///
/// Elements are separated by whitespace or commas. A token opening with `'`
/// extends to the matching `'` and keeps its quotes; an unterminated quote
/// falls back to ordinary bare-token splitting.
pub fn array_elements(inner: &str) -> Vec<&str> {
    let is_separator = |c: char| c.is_whitespace() || c == ',';
    let mut tokens = Vec::new();
    let mut rest = inner;

    loop {
        rest = rest.trim_start_matches(is_separator);
        if rest.is_empty() {
            break;
        }

        let quoted_end = rest
            .strip_prefix('\'')
            .and_then(|tail| tail.find('\''))
            .map(|close| close + 2);
        let end = quoted_end
            .unwrap_or_else(|| rest.find(is_separator).unwrap_or(rest.len()));

        tokens.push(&rest[..end]);
        rest = &rest[end..];
    }
    tokens
}
