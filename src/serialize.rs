//! XHTML serialization.
//!
//! One serializer is shared by the primary output and every section file so
//! that all artifacts agree on encoding, layout, and escaping. Beyond the
//! XML metacharacters, a configured set of character codes is always
//! emitted as numeric character references; some reader engines render
//! those characters wrong when they arrive raw in the target encoding.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::config::{self, Config};
use crate::dom::{Dom, NodeData, NodeId};
use crate::error::{Error, Result};

const INDENT: &str = "  ";

/// Resolved serialization settings.
#[derive(Clone)]
pub struct WriteOptions {
    pub encoding: &'static Encoding,
    pub pretty: bool,
    /// Character codes always escaped as numeric character references.
    escape_set: Vec<u32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            encoding: UTF_8,
            pretty: false,
            escape_set: Vec::new(),
        }
    }
}

impl WriteOptions {
    /// Resolve settings from `output.encoding`, `output.format`, and
    /// `escaped.chars`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let encoding = match config.get(config::PROP_OUTPUT_ENCODING) {
            Some(label) => Encoding::for_label(label.as_bytes())
                .ok_or_else(|| Error::UnsupportedEncoding(label.to_string()))?,
            None => UTF_8,
        };
        let pretty = config.get(config::PROP_OUTPUT_FORMAT) == Some(config::OUTPUT_FORMAT_PRETTY);

        let mut escape_set = Vec::new();
        if let Some(codes) = config.get(config::PROP_ESCAPED_CHARS) {
            for token in codes.split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                let code = parse_char_code(token).ok_or_else(|| {
                    Error::InvalidConfig(format!("invalid escaped.chars entry: {token}"))
                })?;
                escape_set.push(code);
            }
        }

        Ok(Self {
            encoding,
            pretty,
            escape_set,
        })
    }

    fn force_escape(&self, ch: char) -> bool {
        self.escape_set.contains(&(ch as u32))
    }
}

fn parse_char_code(token: &str) -> Option<u32> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

/// Serialize the tree to markup text.
pub fn serialize(dom: &Dom, opts: &WriteOptions) -> String {
    let mut out = String::new();
    for child in dom.children(dom.document()) {
        serialize_node(dom, child, opts, 0, &mut out);
        if opts.pretty && !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Serialize one subtree as a document of its own. Section files are
/// skeleton clones living detached in the source arena.
pub fn serialize_subtree(dom: &Dom, id: NodeId, opts: &WriteOptions) -> String {
    let mut out = String::new();
    serialize_node(dom, id, opts, 0, &mut out);
    if opts.pretty && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Serialize and encode the tree, then write it to `path`, creating parent
/// directories as needed.
pub fn write_document(dom: &Dom, opts: &WriteOptions, path: &Path) -> Result<()> {
    write_text(&serialize(dom, opts), opts, path)
}

/// [`write_document`] for a single subtree.
pub fn write_subtree(dom: &Dom, id: NodeId, opts: &WriteOptions, path: &Path) -> Result<()> {
    write_text(&serialize_subtree(dom, id, opts), opts, path)
}

fn write_text(text: &str, opts: &WriteOptions, path: &Path) -> Result<()> {
    let bytes = encode(text, opts);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Encode serialized text for the configured output encoding. Characters
/// the encoding cannot represent become numeric character references.
pub fn encode(text: &str, opts: &WriteOptions) -> Vec<u8> {
    if opts.encoding == UTF_8 {
        return text.as_bytes().to_vec();
    }
    let (bytes, _, _) = opts.encoding.encode(text);
    bytes.into_owned()
}

fn serialize_node(dom: &Dom, id: NodeId, opts: &WriteOptions, depth: usize, out: &mut String) {
    match dom.get(id).map(|n| &n.data) {
        Some(NodeData::Element { name, attrs }) => {
            if opts.pretty {
                indent(depth, out);
            }
            out.push('<');
            out.push_str(name);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_into(&attr.value, true, opts, out);
                out.push('"');
            }

            let content: Vec<NodeId> = dom
                .children(id)
                .filter(|&c| !is_blank_text(dom, c))
                .collect();

            if content.is_empty() {
                out.push_str(" />");
                if opts.pretty {
                    out.push('\n');
                }
                return;
            }

            out.push('>');

            if !opts.pretty || has_inline_content(dom, &content) {
                serialize_inline(dom, &content, opts, out);
            } else {
                out.push('\n');
                for child in &content {
                    serialize_node(dom, *child, opts, depth + 1, out);
                }
                indent(depth, out);
            }

            out.push_str("</");
            out.push_str(name);
            out.push('>');
            if opts.pretty {
                out.push('\n');
            }
        }
        Some(NodeData::Text(text)) => {
            let collapsed = collapse_whitespace(text);
            escape_into(&collapsed, false, opts, out);
        }
        Some(NodeData::Comment(text)) => {
            if opts.pretty {
                indent(depth, out);
            }
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
            if opts.pretty {
                out.push('\n');
            }
        }
        Some(NodeData::Doctype(name)) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
            if opts.pretty {
                out.push('\n');
            }
        }
        Some(NodeData::Document) | None => {}
    }
}

/// Serialize mixed content on one line, trimming outer whitespace of the
/// run so that layout choices never grow the document on a re-run.
fn serialize_inline(dom: &Dom, content: &[NodeId], opts: &WriteOptions, out: &mut String) {
    for (i, &child) in content.iter().enumerate() {
        match dom.get(child).map(|n| &n.data) {
            Some(NodeData::Text(text)) => {
                let mut collapsed = collapse_whitespace(text);
                if i == 0 {
                    collapsed = collapsed.trim_start().to_string();
                }
                if i == content.len() - 1 {
                    collapsed = collapsed.trim_end().to_string();
                }
                escape_into(&collapsed, false, opts, out);
            }
            Some(NodeData::Element { .. }) => {
                let inline_opts = WriteOptions {
                    pretty: false,
                    ..opts.clone()
                };
                serialize_node(dom, child, &inline_opts, 0, out);
            }
            Some(NodeData::Comment(text)) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            _ => {}
        }
    }
}

fn is_blank_text(dom: &Dom, id: NodeId) -> bool {
    dom.text(id).is_some_and(|t| t.trim().is_empty())
}

fn has_inline_content(dom: &Dom, content: &[NodeId]) -> bool {
    content.iter().any(|&id| dom.is_text(id))
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

fn escape_into(text: &str, attribute: bool, opts: &WriteOptions, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ if opts.force_escape(ch) => {
                out.push_str(&format!("&#{};", ch as u32));
            }
            _ => out.push(ch),
        }
    }
}
