//! Arena-based document tree.
//!
//! All nodes live in one contiguous arena for the duration of a run.
//! Parent/child/sibling links are indices, so node ids stay stable across
//! restructuring: detaching a subtree unlinks it but never deallocates,
//! and a pass that needs a previously detached node can still resolve it.

mod sink;

pub use sink::{parse_file, parse_str};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// An element attribute. Names are unique within one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with lowercase name and ordered attributes.
    Element { name: String, attrs: Vec<Attr> },
    /// Text content.
    Text(String),
    /// Comment, preserved verbatim (word exports carry conditional comments).
    Comment(String),
    /// Document type declaration.
    Doctype(String),
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena document tree.
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Dom {
    /// Create a new empty tree with a document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// The document root id.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// The root element (first element child of the document).
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.document).find(|&id| self.is_element(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: &str, attrs: Vec<Attr>) -> NodeId {
        self.alloc(Node::new(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text.into())))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype(name.into())))
    }

    /// Append a child to a parent node. The child must be detached; a node
    /// still linked elsewhere would leave its old siblings pointing at it.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.get(child).is_none_or(|n| n.parent.is_none()),
            "append of an attached node"
        );
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if last_child.is_some() {
            if let Some(last) = self.get_mut(last_child) {
                last.next_sibling = child;
            }
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Unlink a node from its parent. The node and its subtree stay
    /// allocated and can be re-inserted elsewhere.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.first_child = next;
            }
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.last_child = prev;
            }
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Detach every child of a node.
    pub fn clear_children(&mut self, id: NodeId) {
        while let Some(child) = self.get(id).map(|n| n.first_child) {
            if child.is_none() {
                break;
            }
            self.detach(child);
        }
    }

    /// Append text to a parent, merging into an existing trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child) {
            if let NodeData::Text(ref mut existing) = last.data {
                existing.push_str(text);
                return;
            }
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        Children {
            dom: self,
            current: first,
        }
    }

    /// Child elements only.
    pub fn child_elements(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent).filter(|&id| self.is_element(id))
    }

    /// Find the first node under `start` (inclusive) matching a predicate,
    /// in document order.
    pub fn find<F>(&self, start: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if predicate(self, id) {
                return Some(id);
            }
            let mut children: Vec<_> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        None
    }

    /// Collect every node under `start` (inclusive) matching a predicate,
    /// in document order.
    pub fn find_all<F>(&self, start: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if predicate(self, id) {
                result.push(id);
            }
            let mut children: Vec<_> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        result
    }

    /// First element named `name` under `start`, document order.
    pub fn find_element(&self, start: NodeId, name: &str) -> Option<NodeId> {
        self.find(start, |dom, id| dom.is_named(id, name))
    }

    /// First element named `name` carrying `attr`=`value` under `start`.
    pub fn find_element_with_attr(
        &self,
        start: NodeId,
        name: &str,
        attr: &str,
        value: &str,
    ) -> Option<NodeId> {
        self.find(start, |dom, id| {
            dom.is_named(id, name) && dom.attr(id, attr) == Some(value)
        })
    }

    /// Deep-copy a subtree into fresh nodes. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let data = match self.get(id) {
            Some(n) => n.data.clone(),
            None => return NodeId::NONE,
        };
        let copy = self.alloc(Node::new(data));
        let children: Vec<_> = self.children(id).collect();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.append(copy, child_copy);
        }
        copy
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// True for an element with the given (lowercase) name.
    pub fn is_named(&self, id: NodeId, name: &str) -> bool {
        self.element_name(id) == Some(name)
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    pub fn attrs(&self, id: NodeId) -> &[Attr] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, value: &str) {
        if let Some(node) = self.get_mut(id) {
            if let NodeData::Element { attrs, .. } = &mut node.data {
                if let Some(attr) = attrs.iter_mut().find(|a| a.name == attr_name) {
                    attr.value = value.to_string();
                } else {
                    attrs.push(Attr::new(attr_name, value));
                }
            }
        }
    }

    /// Remove an attribute. Returns true if it was present.
    pub fn remove_attr(&mut self, id: NodeId, attr_name: &str) -> bool {
        if let Some(node) = self.get_mut(id) {
            if let NodeData::Element { attrs, .. } = &mut node.data {
                let before = attrs.len();
                attrs.retain(|a| a.name != attr_name);
                return attrs.len() != before;
            }
        }
        false
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of all text nodes under `id`, document order.
    pub fn collect_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text_into(id, &mut out);
        out
    }

    fn collect_text_into(&self, id: NodeId, out: &mut String) {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(s)) => out.push_str(s),
            Some(_) => {
                for child in self.children(id).collect::<Vec<_>>() {
                    self.collect_text_into(child, out);
                }
            }
            None => {}
        }
    }

    /// Direct text of an element (concatenated text children), or, when
    /// that is all whitespace, the text of the first child element,
    /// descending until something non-empty turns up.
    pub fn first_text(&self, id: NodeId) -> Option<String> {
        let mut direct = String::new();
        for child in self.children(id) {
            if let Some(t) = self.text(child) {
                direct.push_str(t);
            }
        }
        let trimmed = direct.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
        let first = self.child_elements(id).next()?;
        self.first_text(first)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct Children<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}
