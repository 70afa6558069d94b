//! # Configuration Parser
//!
//! Reads back the HCL subset produced by [`ConfigDocument`]: `resource` blocks,
//! nested blocks, and string / integer / boolean attributes where a string may
//! be a single whole-value `${type.name.attr}` interpolation.

use super::document::{AttrValue, Body, BodyItem, ConfigDocument, Reference, ResourceBlock};
use crate::model::ResourceAddress;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static RESOURCE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^resource\s+"([A-Za-z0-9_]+)"\s+"([A-Za-z0-9_-]+)"\s*\{$"#)
        .expect("resource header pattern is valid")
});

static BLOCK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\{$").expect("block header pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.+)$").expect("attribute pattern is valid")
});

static INTERPOLATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([A-Za-z0-9_]+)\.([A-Za-z0-9_-]+)\.([A-Za-z0-9_]+)\}$")
        .expect("interpolation pattern is valid")
});

/// Configuration text outside the supported subset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration line {line}: {message}")]
pub struct ConfigParseError {
    pub line: usize,
    pub message: String,
}

impl ConfigParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Parse configuration text into a document
pub fn parse_config(text: &str) -> Result<ConfigDocument, ConfigParseError> {
    let mut resources = Vec::new();
    // Open resource, then a stack of open nested blocks
    let mut current: Option<(ResourceAddress, usize)> = None;
    let mut stack: Vec<(String, Body)> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if current.is_none() {
            let caps = RESOURCE_HEADER
                .captures(line)
                .ok_or_else(|| ConfigParseError::new(line_no, format!("expected resource block, found '{line}'")))?;
            let address = ResourceAddress::new(&caps[1], &caps[2]);
            if resources.iter().any(|r: &ResourceBlock| r.address == address) {
                return Err(ConfigParseError::new(
                    line_no,
                    format!("duplicate resource '{address}'"),
                ));
            }
            current = Some((address, line_no));
            stack.push((String::new(), Body::new()));
            continue;
        }

        if line == "}" {
            let (name, body) = stack
                .pop()
                .ok_or_else(|| ConfigParseError::new(line_no, "unbalanced '}'"))?;
            match stack.last_mut() {
                Some((_, parent)) => parent.items.push(BodyItem::Block { name, body }),
                None => {
                    let (address, _) = current
                        .take()
                        .ok_or_else(|| ConfigParseError::new(line_no, "unbalanced '}'"))?;
                    resources.push(ResourceBlock::new(address, body));
                }
            }
            continue;
        }

        if let Some(caps) = BLOCK_HEADER.captures(line) {
            stack.push((caps[1].to_string(), Body::new()));
            continue;
        }

        if let Some(caps) = ATTRIBUTE.captures(line) {
            let value = parse_value(caps[2].trim()).map_err(|m| ConfigParseError::new(line_no, m))?;
            let (_, body) = stack
                .last_mut()
                .ok_or_else(|| ConfigParseError::new(line_no, "attribute outside of a block"))?;
            body.items.push(BodyItem::Attribute {
                name: caps[1].to_string(),
                value,
            });
            continue;
        }

        return Err(ConfigParseError::new(
            line_no,
            format!("unsupported syntax '{line}'"),
        ));
    }

    if let Some((address, opened_at)) = current {
        return Err(ConfigParseError::new(
            opened_at,
            format!("resource '{address}' is never closed"),
        ));
    }

    Ok(ConfigDocument::new(resources))
}

fn parse_value(raw: &str) -> Result<AttrValue, String> {
    match raw {
        "true" => return Ok(AttrValue::Bool(true)),
        "false" => return Ok(AttrValue::Bool(false)),
        _ => {}
    }

    if let Some(rest) = raw.strip_prefix('"') {
        let literal = parse_string_literal(rest)?;
        if literal.contains("${") {
            let caps = INTERPOLATION
                .captures(&literal)
                .ok_or_else(|| format!("unsupported interpolation \"{literal}\""))?;
            return Ok(AttrValue::Reference(Reference {
                address: ResourceAddress::new(&caps[1], &caps[2]),
                attribute: caps[3].to_string(),
            }));
        }
        return Ok(AttrValue::String(literal));
    }

    raw.parse::<i64>()
        .map(AttrValue::Int)
        .map_err(|_| format!("unsupported value '{raw}'"))
}

/// Unescape a string literal; `rest` starts just after the opening quote
fn parse_string_literal(rest: &str) -> Result<String, String> {
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let trailing = chars.as_str().trim();
                if !trailing.is_empty() {
                    return Err(format!("unexpected text after string: '{trailing}'"));
                }
                return Ok(out);
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some(escaped @ ('"' | '\\')) => out.push(escaped),
                Some(other) => return Err(format!("unsupported escape '\\{other}'")),
                None => break,
            },
            _ => out.push(c),
        }
    }
    Err("unterminated string".to_string())
}

/// Drop `#` and `//` comments that are not inside a string
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'#' => return &line[..i],
            b'/' if bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            _ => {}
        }
    }
    line
}
