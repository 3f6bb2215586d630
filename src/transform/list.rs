//! List reconstruction.
//!
//! Word flattens bullet and numbered lists into sibling
//! `<p class="MsoListParagraph">` paragraphs whose first token is the
//! rendered marker ("·", "1.", "a)" ...), usually buried in font spans.
//! This pass rebuilds real lists: each maximal contiguous run of such
//! paragraphs becomes one `<ol>` or `<ul>` in place. The run is ordered
//! when the first item's marker token ends with a period; that single
//! classification governs the whole list.

use crate::dom::{Attr, Dom, NodeData, NodeId};
use crate::error::Result;

use super::{Context, Pass};

const LIST_CLASS: &str = "MsoListParagraph";

pub struct ListParagraphPass;

impl Pass for ListParagraphPass {
    fn name(&self) -> &'static str {
        "list-paragraph"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let root = match ctx.dom.root_element() {
            Some(root) => root,
            None => return Ok(()),
        };

        // Parents with at least one list paragraph child, document order.
        let parents = ctx.dom.find_all(root, |dom, id| {
            dom.is_element(id) && dom.children(id).any(|c| is_list_item(dom, c))
        });

        for parent in parents {
            process_runs(&mut ctx.dom, parent);
        }
        Ok(())
    }
}

fn is_list_item(dom: &Dom, id: NodeId) -> bool {
    dom.is_named(id, "p") && dom.attr(id, "class") == Some(LIST_CLASS)
}

/// Group the parent's children into maximal contiguous runs and replace
/// each run with a generated list. Whitespace-only text between items does
/// not break a run; any other sibling does.
fn process_runs(dom: &mut Dom, parent: NodeId) {
    let children: Vec<NodeId> = dom.children(parent).collect();

    let mut runs: Vec<Vec<NodeId>> = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    for child in children {
        if is_list_item(dom, child) {
            current.push(child);
        } else if dom.text(child).is_some_and(|t| t.trim().is_empty()) {
            // blank text, ignore
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    for run in runs {
        build_list(dom, &run);
    }
}

fn build_list(dom: &mut Dom, run: &[NodeId]) {
    let mut items: Vec<(NodeId, Option<String>)> = Vec::new();
    for &item in run {
        flatten_spans(dom, item);
        normalize_texts(dom, item);
        let marker = strip_marker(dom, item);
        items.push((item, marker));
    }

    // Only the first item's marker shape decides the list kind.
    let ordered = items
        .first()
        .and_then(|(_, marker)| marker.as_deref())
        .is_some_and(|m| m.ends_with('.'));

    let list = dom.create_element(if ordered { "ol" } else { "ul" }, vec![]);
    dom.insert_before(run[0], list);

    for (item, _) in items {
        let li = dom.create_element("li", vec![Attr::new("class", LIST_CLASS)]);
        let content: Vec<NodeId> = dom.children(item).collect();
        for node in content {
            dom.detach(node);
            dom.append(li, node);
        }
        dom.detach(item);
        dom.append(list, li);
    }
}

/// Splice away nested `<span>` wrappers, keeping their content in place.
fn flatten_spans(dom: &mut Dom, el: NodeId) {
    let children: Vec<NodeId> = dom.children(el).collect();
    for child in children {
        if !dom.is_element(child) {
            continue;
        }
        flatten_spans(dom, child);
        if dom.is_named(child, "span") {
            let grandchildren: Vec<NodeId> = dom.children(child).collect();
            for node in grandchildren {
                dom.detach(node);
                dom.insert_before(child, node);
            }
            dom.detach(child);
        }
    }
}

/// Trim every text node in the subtree and append exactly one trailing
/// space; drop nodes that end up empty (marker padding collapses away).
fn normalize_texts(dom: &mut Dom, el: NodeId) {
    let texts = dom.find_all(el, |dom, id| dom.is_text(id));
    for id in texts {
        let trimmed = dom.text(id).unwrap_or_default().trim().to_string();
        if trimmed.is_empty() {
            dom.detach(id);
        } else if let Some(node) = dom.get_mut(id) {
            node.data = NodeData::Text(format!("{trimmed} "));
        }
    }
}

/// Remove the leading marker token from the item's first text node and
/// return it. The token is the first whitespace-delimited word; when
/// nothing follows it, the whole node goes.
fn strip_marker(dom: &mut Dom, el: NodeId) -> Option<String> {
    let first_text = dom.find(el, |dom, id| dom.is_text(id))?;
    let text = dom.text(first_text)?.to_string();

    let mut parts = text.trim_start().splitn(2, char::is_whitespace);
    let marker = parts.next()?.to_string();
    if marker.is_empty() {
        return None;
    }
    let rest = parts.next().unwrap_or("").trim_start().to_string();

    if rest.is_empty() {
        dom.detach(first_text);
    } else if let Some(node) = dom.get_mut(first_text) {
        node.data = NodeData::Text(rest);
    }
    Some(marker)
}
