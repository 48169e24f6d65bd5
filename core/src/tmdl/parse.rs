//! Indentation-structured block parser.
//!
//! Nesting is tracked with an explicit stack of open frames rather than
//! recursion, so a pathological file cannot exhaust the call stack.

use serde::Serialize;

use super::grammar;
use super::line::{self, LineForm, ValueSpec};
use crate::error::ExtractError;

/// One parsed definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdlDocument {
    pub path: String,
    pub nodes: Vec<TmdlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdlNode {
    pub keyword: String,
    /// Object type of a `ref` block (`ref table Sales`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Text after `=` on the block line, or its multi-line content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TmdlProperty>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TmdlNode>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdlProperty {
    pub key: String,
    pub value: PropertyValue,
    /// Deeper property lines owned by this one (`dataAccessOptions` flags,
    /// `contentType` under `linguisticMetadata`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TmdlProperty>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "form", content = "text")]
pub enum PropertyValue {
    /// `key: value`
    Text(String),
    /// `key = value`, possibly multi-line.
    Expression(String),
    /// Bare `key`.
    Flag,
}

impl TmdlNode {
    fn new(keyword: &str, line: usize) -> Self {
        Self {
            keyword: keyword.to_string(),
            object_type: None,
            name: None,
            value: None,
            description: None,
            properties: Vec::new(),
            children: Vec::new(),
            line,
        }
    }

    pub fn property(&self, key: &str) -> Option<&TmdlProperty> {
        self.properties.iter().find(|p| p.key == key)
    }

    /// Text of a `key: value` or `key = value` property.
    pub fn text(&self, key: &str) -> Option<&str> {
        match &self.property(key)?.value {
            PropertyValue::Text(text) | PropertyValue::Expression(text) => Some(text.as_str()),
            PropertyValue::Flag => None,
        }
    }

    /// Boolean property: a bare flag is `true`, `key: false` is `false`.
    pub fn boolean(&self, key: &str) -> Option<bool> {
        match &self.property(key)?.value {
            PropertyValue::Flag => Some(true),
            PropertyValue::Text(text) | PropertyValue::Expression(text) => {
                Some(!text.trim().eq_ignore_ascii_case("false"))
            }
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.boolean(key).unwrap_or(false)
    }

    pub fn children_of<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a TmdlNode> {
        self.children.iter().filter(move |c| c.keyword == keyword)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.keyword)
    }
}

struct Frame {
    /// Indentation of the block line; `None` for the document root.
    depth: Option<usize>,
    /// Indentation shared by all direct children, fixed by the first one.
    child_depth: Option<usize>,
    node: TmdlNode,
    /// Set when the frame is an open property rather than a block. The node
    /// then only collects nested properties.
    property: Option<PropertyValue>,
}

impl Frame {
    fn block(depth: usize, node: TmdlNode) -> Self {
        Self {
            depth: Some(depth),
            child_depth: None,
            node,
            property: None,
        }
    }

    fn property(depth: usize, key: &str, value: PropertyValue, line: usize) -> Self {
        let mut node = TmdlNode::new(grammar::PROPERTY, line);
        node.name = Some(key.to_string());
        Self {
            depth: Some(depth),
            child_depth: None,
            node,
            property: Some(value),
        }
    }
}

/// Parses the text of one definition file.
pub fn parse_document(path: &str, text: &str, tab_width: usize) -> Result<TmdlDocument, ExtractError> {
    let tab_width = tab_width.max(1);
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text.lines().collect();
    let malformed = |line: usize, detail: String| ExtractError::malformed(path, line, detail);

    let mut stack: Vec<Frame> = vec![Frame {
        depth: None,
        child_depth: None,
        node: TmdlNode::new(grammar::DOCUMENT, 0),
        property: None,
    }];
    let mut description = PendingDescription::default();
    let mut idx = 0usize;

    while idx < lines.len() {
        let raw = lines[idx];
        let line_no = idx + 1;
        idx += 1;

        if line::is_blank(raw) {
            description.clear();
            continue;
        }

        let (cols, bytes) = line::measure_indent(raw, tab_width);
        let body = raw[bytes..].trim_end();

        if let Some(text) = body.strip_prefix("///") {
            description.doc.push(comment_text(text));
            continue;
        }
        if let Some(text) = body.strip_prefix("//") {
            description.plain.push(comment_text(text));
            continue;
        }

        while stack.len() > 1 && stack.last().and_then(|f| f.depth).is_some_and(|d| d >= cols) {
            close_frame(&mut stack);
        }

        let Some(top) = stack.last_mut() else {
            break;
        };
        match top.child_depth {
            Some(expected) if expected != cols => {
                return Err(malformed(
                    line_no,
                    format!(
                        "misaligned indentation: {cols} columns where siblings in '{}' use {expected}",
                        top.node.display_name()
                    ),
                ));
            }
            Some(_) => {}
            None => top.child_depth = Some(cols),
        }

        let context = top.node.keyword.clone();
        let form = line::classify(body, &context).map_err(|detail| malformed(line_no, detail))?;

        match form {
            LineForm::Description(_) | LineForm::Comment => {}
            LineForm::Block {
                keyword,
                object_type,
                name,
                value,
            } => {
                let (value, next) = resolve_value(&lines, idx, cols, value, tab_width)
                    .map_err(|detail| malformed(line_no, detail))?;
                idx = next;

                let mut node = TmdlNode::new(keyword, line_no);
                node.object_type = object_type.map(str::to_string);
                node.name = name;
                node.value = value;
                node.description = description.take();
                stack.push(Frame::block(cols, node));
            }
            LineForm::Property { key, value } => {
                description.clear();
                if stack.len() == 1 {
                    return Err(malformed(
                        line_no,
                        format!("property '{key}' outside of any object"),
                    ));
                }
                let (text, next) = resolve_value(&lines, idx, cols, value.clone(), tab_width)
                    .map_err(|detail| malformed(line_no, detail))?;
                idx = next;
                let value = match (value, text) {
                    (ValueSpec::Text(_), Some(text)) => PropertyValue::Text(text),
                    (_, Some(text)) => PropertyValue::Expression(text),
                    (_, None) => PropertyValue::Flag,
                };
                stack.push(Frame::property(cols, key, value, line_no));
            }
            LineForm::Flag { key } => {
                description.clear();
                if stack.len() == 1 {
                    return Err(malformed(
                        line_no,
                        format!("property '{key}' outside of any object"),
                    ));
                }
                stack.push(Frame::property(cols, key, PropertyValue::Flag, line_no));
            }
        }
    }

    while stack.len() > 1 {
        close_frame(&mut stack);
    }
    let nodes = stack.pop().map(|root| root.node.children).unwrap_or_default();

    Ok(TmdlDocument {
        path: path.to_string(),
        nodes,
    })
}

fn close_frame(stack: &mut Vec<Frame>) {
    let Some(frame) = stack.pop() else {
        return;
    };
    let Some(parent) = stack.last_mut() else {
        return;
    };
    match frame.property {
        Some(value) => parent.node.properties.push(TmdlProperty {
            key: frame.node.name.unwrap_or_default(),
            value,
            properties: frame.node.properties,
            line: frame.node.line,
        }),
        None => parent.node.children.push(frame.node),
    }
}

/// Comment lines seen since the last structural line. `///` lines win over
/// plain `//` lines when both precede a block.
#[derive(Default)]
struct PendingDescription {
    doc: Vec<String>,
    plain: Vec<String>,
}

impl PendingDescription {
    fn take(&mut self) -> Option<String> {
        let lines = if self.doc.is_empty() {
            &self.plain
        } else {
            &self.doc
        };
        let text = (!lines.is_empty()).then(|| lines.join("\n"));
        self.clear();
        text
    }

    fn clear(&mut self) {
        self.doc.clear();
        self.plain.clear();
    }
}

fn comment_text(text: &str) -> String {
    text.strip_prefix(' ').unwrap_or(text).to_string()
}

/// Turns a [`ValueSpec`] into its text, consuming content lines that follow
/// `start`. Returns the value and the index of the next unconsumed line.
fn resolve_value(
    lines: &[&str],
    start: usize,
    owner_cols: usize,
    value: ValueSpec,
    tab_width: usize,
) -> Result<(Option<String>, usize), String> {
    match value {
        ValueSpec::None => Ok((None, start)),
        ValueSpec::Text(text) | ValueSpec::Inline(text) => Ok((Some(text), start)),
        ValueSpec::Content => {
            let (text, next) = capture_content(lines, start, owner_cols, tab_width)?;
            Ok((Some(text), next))
        }
        ValueSpec::Fenced => {
            let (text, next) = capture_fence(lines, start, tab_width)?;
            Ok((Some(text), next))
        }
    }
}

/// Captures the indented content below an owner line ending in `=`.
///
/// The first non-blank line fixes the content indentation, which must be
/// deeper than the owner. Every following line at least that deep (or blank)
/// belongs to the content; that indentation is stripped and the rest kept
/// verbatim. Trailing blank lines are left for the structural pass.
fn capture_content(
    lines: &[&str],
    start: usize,
    owner_cols: usize,
    tab_width: usize,
) -> Result<(String, usize), String> {
    let first = lines[start.min(lines.len())..]
        .iter()
        .find(|l| !line::is_blank(l))
        .map(|l| line::measure_indent(l, tab_width).0);
    let base = match first {
        Some(cols) if cols > owner_cols => cols,
        _ => return Err("expected indented content after '='".to_string()),
    };

    let mut end = start;
    let mut last_content = start;
    while end < lines.len() {
        let raw = lines[end];
        if !line::is_blank(raw) {
            if line::measure_indent(raw, tab_width).0 < base {
                break;
            }
            last_content = end + 1;
        }
        end += 1;
    }

    let text = lines[start..last_content]
        .iter()
        .map(|l| line::strip_columns(l, base, tab_width).trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    Ok((text, last_content))
}

/// Captures everything up to a closing ```` ``` ```` line, dedented by the
/// indentation of that closing line.
fn capture_fence(lines: &[&str], start: usize, tab_width: usize) -> Result<(String, usize), String> {
    let close = lines[start.min(lines.len())..]
        .iter()
        .position(|l| l.trim() == "```")
        .map(|offset| start + offset)
        .ok_or_else(|| "unterminated ``` block".to_string())?;

    let body = &lines[start..close];
    let base = line::measure_indent(lines[close], tab_width).0;
    let text = body
        .iter()
        .map(|l| line::strip_columns(l, base, tab_width).trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    Ok((text.trim_end_matches('\n').to_string(), close + 1))
}
