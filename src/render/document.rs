//! # Configuration Document
//!
//! Typed representation of the declarative configuration the harness applies.
//! Serializes to HCL with `terraform fmt` style alignment.

use crate::model::ResourceAddress;
use std::fmt::{self, Write};

/// Attribute value in a resource body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    String(String),
    Int(i64),
    Bool(bool),
    /// Interpolated attribute of another resource, rendered as `"${type.name.attr}"`
    Reference(Reference),
}

impl AttrValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn reference(address: &ResourceAddress, attribute: impl Into<String>) -> Self {
        Self::Reference(Reference {
            address: address.clone(),
            attribute: attribute.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub address: ResourceAddress,
    pub attribute: String,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.attribute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    Attribute { name: String, value: AttrValue },
    Block { name: String, body: Body },
}

/// Ordered attributes and nested blocks of a resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub items: Vec<BodyItem>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.items.push(BodyItem::Attribute {
            name: name.into(),
            value,
        });
        self
    }

    #[must_use]
    pub fn opt_attr(self, name: impl Into<String>, value: Option<AttrValue>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    #[must_use]
    pub fn block(mut self, name: impl Into<String>, body: Body) -> Self {
        self.items.push(BodyItem::Block {
            name: name.into(),
            body,
        });
        self
    }

    /// First attribute with the given name
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.items.iter().find_map(|item| match item {
            BodyItem::Attribute { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }

    /// Nested blocks with the given name, in declaration order
    pub fn blocks<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Body> {
        self.items.iter().filter_map(move |item| match item {
            BodyItem::Block { name: n, body } if n == name => Some(body),
            _ => None,
        })
    }

    fn write_to(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let mut i = 0;
        while i < self.items.len() {
            if i > 0 {
                f.write_char('\n')?;
            }
            match &self.items[i] {
                BodyItem::Attribute { .. } => {
                    // Align `=` across a run of consecutive attributes
                    let run: Vec<(&String, &AttrValue)> = self.items[i..]
                        .iter()
                        .map_while(|item| match item {
                            BodyItem::Attribute { name, value } => Some((name, value)),
                            BodyItem::Block { .. } => None,
                        })
                        .collect();
                    let width = run.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
                    for (name, value) in &run {
                        writeln!(f, "{indent}{name:<width$} = {}", render_value(value))?;
                    }
                    i += run.len();
                }
                BodyItem::Block { name, body } => {
                    writeln!(f, "{indent}{name} {{")?;
                    body.write_to(f, depth + 1)?;
                    writeln!(f, "{indent}}}")?;
                    i += 1;
                }
            }
        }
        Ok(())
    }
}

/// One `resource "type" "name" { ... }` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    pub address: ResourceAddress,
    pub body: Body,
}

impl ResourceBlock {
    pub fn new(address: ResourceAddress, body: Body) -> Self {
        Self { address, body }
    }
}

/// A complete configuration: resource blocks in dependency order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    pub resources: Vec<ResourceBlock>,
}

impl ConfigDocument {
    pub fn new(resources: Vec<ResourceBlock>) -> Self {
        Self { resources }
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceBlock> {
        self.resources.iter().find(|r| &r.address == address)
    }

    /// HCL text for this document
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, resource) in self.resources.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            writeln!(
                f,
                "resource \"{}\" \"{}\" {{",
                resource.address.resource_type, resource.address.name
            )?;
            resource.body.write_to(f, 1)?;
            f.write_str("}\n")?;
        }
        Ok(())
    }
}

fn render_value(value: &AttrValue) -> String {
    match value {
        AttrValue::String(s) => format!("\"{}\"", escape(s)),
        AttrValue::Int(n) => n.to_string(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Reference(r) => format!("\"${{{r}}}\""),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
