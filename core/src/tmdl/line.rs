//! Single-line lexing: indentation, names and the shape of a structural line.

use super::grammar;

/// Leading indentation of `line` as `(columns, bytes)`.
pub(crate) fn measure_indent(line: &str, tab_width: usize) -> (usize, usize) {
    let mut columns = 0usize;
    let mut bytes = 0usize;
    for ch in line.chars() {
        match ch {
            ' ' => columns += 1,
            '\t' => columns = (columns / tab_width + 1) * tab_width,
            _ => break,
        }
        bytes += ch.len_utf8();
    }
    (columns, bytes)
}

/// Removes up to `columns` columns of leading whitespace.
pub(crate) fn strip_columns(line: &str, columns: usize, tab_width: usize) -> &str {
    let mut seen = 0usize;
    let mut bytes = 0usize;
    for ch in line.chars() {
        if seen >= columns {
            break;
        }
        match ch {
            ' ' => seen += 1,
            '\t' => seen = (seen / tab_width + 1) * tab_width,
            _ => break,
        }
        bytes += ch.len_utf8();
    }
    &line[bytes..]
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// How the value of a block or property is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ValueSpec {
    None,
    /// `key: text`
    Text(String),
    /// `= text` on the same line.
    Inline(String),
    /// `=` at end of line; the value is the following deeper lines.
    Content,
    /// `= ```` opening a fenced block.
    Fenced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineForm<'a> {
    Description(&'a str),
    Comment,
    Block {
        keyword: &'a str,
        object_type: Option<&'a str>,
        name: Option<String>,
        value: ValueSpec,
    },
    Property {
        key: &'a str,
        value: ValueSpec,
    },
    Flag {
        key: &'a str,
    },
}

/// Classifies one line (indentation already removed) in the context of the
/// enclosing block's keyword.
pub(crate) fn classify<'a>(body: &'a str, context: &str) -> Result<LineForm<'a>, String> {
    if let Some(text) = body.strip_prefix("///") {
        return Ok(LineForm::Description(text.strip_prefix(' ').unwrap_or(text)));
    }
    if body.starts_with("//") {
        return Ok(LineForm::Comment);
    }

    let (keyword, rest) = split_identifier(body)
        .ok_or_else(|| format!("expected a keyword or property name, found '{}'", preview(body)))?;
    let rest_trimmed = rest.trim_start();

    if let Some(value) = rest_trimmed.strip_prefix(':') {
        return Ok(LineForm::Property {
            key: keyword,
            value: ValueSpec::Text(value.trim().to_string()),
        });
    }
    if let Some(value) = rest_trimmed.strip_prefix('=') {
        return Ok(LineForm::Property {
            key: keyword,
            value: value_after_equals(value),
        });
    }

    if rest_trimmed.is_empty() {
        if grammar::is_unnamed_block(context, keyword) {
            return Ok(LineForm::Block {
                keyword,
                object_type: None,
                name: None,
                value: ValueSpec::None,
            });
        }
        if grammar::is_block(context, keyword) {
            return Err(format!("'{keyword}' is missing a name"));
        }
        return Ok(LineForm::Flag { key: keyword });
    }

    if !grammar::is_block(context, keyword) {
        return Err(format!("unknown keyword '{keyword}' in {context}"));
    }

    let (object_type, rest) = if keyword == "ref" {
        let (object_type, rest) = split_identifier(rest_trimmed)
            .ok_or_else(|| "'ref' must be followed by an object type".to_string())?;
        (Some(object_type), rest)
    } else {
        (None, rest_trimmed)
    };

    let (name, rest) = parse_name(rest)?;
    let rest = rest.trim_start();
    let value = if rest.is_empty() {
        ValueSpec::None
    } else if let Some(value) = rest.strip_prefix('=') {
        value_after_equals(value)
    } else {
        return Err(format!("unexpected text after name '{name}': '{}'", preview(rest)));
    };

    Ok(LineForm::Block {
        keyword,
        object_type,
        name: Some(name),
        value,
    })
}

fn value_after_equals(value: &str) -> ValueSpec {
    let value = value.trim();
    if value.is_empty() {
        return ValueSpec::Content;
    }
    if value == "```" {
        return ValueSpec::Fenced;
    }
    if value.len() >= 6 && value.starts_with("```") && value.ends_with("```") {
        return ValueSpec::Inline(value[3..value.len() - 3].trim().to_string());
    }
    ValueSpec::Inline(value.to_string())
}

fn split_identifier(input: &str) -> Option<(&str, &str)> {
    let end = input
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(idx, _)| idx)
        .unwrap_or(input.len());
    if end == 0 || input.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    Some((&input[..end], &input[end..]))
}

/// Parses an object name: either `'quoted ''name'''` or an unquoted run up to
/// `=` or end of line. Returns the unquoted name and the remaining text.
pub(crate) fn parse_name(input: &str) -> Result<(String, &str), String> {
    let input = input.trim_start();
    if let Some(quoted) = input.strip_prefix('\'') {
        let (name, consumed) = read_quoted(quoted)?;
        return Ok((name, &quoted[consumed..]));
    }

    let end = input.find('=').unwrap_or(input.len());
    let name = input[..end].trim_end();
    if name.is_empty() {
        return Err("missing name".to_string());
    }
    Ok((name.to_string(), &input[end..]))
}

/// Reads a single-quoted name body (opening quote already consumed) where
/// `''` is an escaped quote. Returns the name and the bytes consumed,
/// including the closing quote.
fn read_quoted(input: &str) -> Result<(String, usize), String> {
    let mut name = String::new();
    let mut chars = input.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\'' {
            if let Some((_, '\'')) = chars.peek() {
                chars.next();
                name.push('\'');
                continue;
            }
            return Ok((name, idx + 1));
        }
        name.push(ch);
    }
    Err(format!("unterminated quoted name '{}'", preview(input)))
}

/// Splits a qualified column reference such as `Sales.Amount`,
/// `'Sales Table'.'Order Date'` or `Sales[Amount]` into table and column.
pub(crate) fn split_column_ref(reference: &str) -> Option<(String, String)> {
    let reference = reference.trim();
    let (table, rest) = if let Some(quoted) = reference.strip_prefix('\'') {
        let (name, consumed) = read_quoted(quoted).ok()?;
        (name, &quoted[consumed..])
    } else {
        let end = reference.find(['.', '['])?;
        (reference[..end].trim().to_string(), &reference[end..])
    };

    let column = if let Some(column) = rest.strip_prefix('.') {
        let column = column.trim();
        match column.strip_prefix('\'') {
            Some(quoted) => read_quoted(quoted).ok()?.0,
            None => column.to_string(),
        }
    } else {
        rest.strip_prefix('[')?.strip_suffix(']')?.to_string()
    };

    if table.is_empty() || column.is_empty() {
        return None;
    }
    Some((table, column))
}

/// Quotes a name for writing when it is not a plain identifier.
pub(crate) fn quote_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !name.as_bytes()[0].is_ascii_digit();
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 40;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
