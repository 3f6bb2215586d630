//! html5ever TreeSink adapter building the arena [`Dom`].
//!
//! The word-export input is lenient HTML; parse errors are ignored the way
//! browsers do. Element and attribute names are lowered to plain local
//! names, which is all the downstream passes match on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName};

use crate::error::{Error, Result};

use super::{Attr, Dom, NodeId};

/// Handle used by TreeSink to reference nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

impl Default for NodeHandle {
    fn default() -> Self {
        NodeHandle(NodeId::NONE)
    }
}

/// TreeSink implementation that builds a [`Dom`].
///
/// Uses interior mutability (RefCell) because html5ever's TreeSink trait
/// takes `&self` while we mutate the tree. Qualified names are kept in a
/// side table only for the duration of the parse; the arena itself stores
/// plain lowercase names.
struct DomSink {
    dom: RefCell<Dom>,
    names: RefCell<HashMap<NodeId, Box<QualName>>>,
    quirks_mode: RefCell<QuirksMode>,
}

impl DomSink {
    fn new() -> Self {
        Self {
            dom: RefCell::new(Dom::new()),
            names: RefCell::new(HashMap::new()),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }

    fn into_dom(self) -> Dom {
        self.dom.into_inner()
    }
}

impl TreeSink for DomSink {
    type Handle = NodeHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: std::borrow::Cow<'static, str>) {
        // Ignore parse errors - be lenient like browsers
    }

    fn get_document(&self) -> Self::Handle {
        NodeHandle(self.dom.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        static EMPTY: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };

        let names = self.names.borrow();
        match names.get(&target.0) {
            Some(name) => {
                // SAFETY: the side table lives as long as self, entries are
                // never removed during a parse, and each name is boxed so
                // its address survives map growth. The borrow checker
                // cannot see through the RefCell, so the lifetime is
                // extended manually, matching the trait's contract that the
                // reference is used immediately.
                unsafe { std::mem::transmute::<&QualName, &'a QualName>(name) }
            }
            None => &EMPTY,
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let converted: Vec<Attr> = attrs
            .into_iter()
            .map(|a| Attr::new(a.name.local.as_ref().to_ascii_lowercase(), a.value.to_string()))
            .collect();

        let id = self
            .dom
            .borrow_mut()
            .create_element(name.local.as_ref(), converted);
        self.names.borrow_mut().insert(id, Box::new(name));
        NodeHandle(id)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        let id = self.dom.borrow_mut().create_comment(text.to_string());
        NodeHandle(id)
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        NodeHandle(self.dom.borrow_mut().create_comment(""))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => dom.append(parent.0, node.0),
            NodeOrText::AppendText(text) => dom.append_text(parent.0, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let parent = self.dom.borrow().get(element.0).map(|n| n.parent);
        if let Some(parent) = parent {
            if parent.is_some() {
                let mut dom = self.dom.borrow_mut();
                match child {
                    NodeOrText::AppendNode(node) => dom.append(parent, node.0),
                    NodeOrText::AppendText(text) => dom.append_text(parent, &text),
                }
                return;
            }
        }
        self.append(prev_element, child);
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let mut dom = self.dom.borrow_mut();
        let doc = dom.document();
        let doctype = dom.create_doctype(name.to_string());
        dom.append(doc, doctype);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.0 == y.0
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => dom.insert_before(sibling.0, node.0),
            NodeOrText::AppendText(text) => {
                let text_node = dom.create_text(text.to_string());
                dom.insert_before(sibling.0, text_node);
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        let mut dom = self.dom.borrow_mut();
        for attr in attrs {
            let name = attr.name.local.to_ascii_lowercase();
            if dom.attr(target.0, &name).is_none() {
                dom.set_attr(target.0, &name, &attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.dom.borrow_mut().detach(target.0);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let children: Vec<_> = self.dom.borrow().children(node.0).collect();
        let mut dom = self.dom.borrow_mut();
        for child in children {
            dom.detach(child);
            dom.append(new_parent.0, child);
        }
    }
}

/// Parse HTML text into a [`Dom`].
pub fn parse_str(html: &str) -> Dom {
    let sink = DomSink::new();
    let result = parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());
    result.into_dom()
}

/// Read and parse an input file, decoding with the given charset label
/// (default UTF-8).
pub fn parse_file(path: &Path, charset: Option<&str>) -> Result<Dom> {
    let bytes = std::fs::read(path)?;
    let label = charset.unwrap_or("UTF-8");
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| Error::UnsupportedEncoding(label.to_string()))?;
    let (text, _, _) = encoding.decode(&bytes);
    Ok(parse_str(&text))
}
