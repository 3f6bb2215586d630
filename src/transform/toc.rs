//! Table-of-contents rewriting.
//!
//! Word renders a TOC as flat `MsoToc1` paragraphs with leader dots and
//! page numbers. Phase one turns each entry into a real link: the entry
//! label is matched against the `<h1>` headings, and the link target is
//! qualified with the file that heading will live in once the section
//! pass has split the document, so the anchor survives the split. Phase
//! two wraps the contiguous entry run into the `<nav>` list structure
//! reader engines expect.

use crate::dom::{Attr, Dom, NodeId};
use crate::error::{Error, Result};

use super::{section::section_class_name, Context, Pass};

const TOC_CLASS: &str = "MsoToc1";
const LEADER_DOTS: &str = "...";

pub struct TocPass;

impl Pass for TocPass {
    fn name(&self) -> &'static str {
        "toc"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let root = match ctx.dom.root_element() {
            Some(root) => root,
            None => return Ok(()),
        };

        link_entries(ctx, root)?;
        wrap_entries(&mut ctx.dom, root);
        Ok(())
    }
}

fn is_toc_entry(dom: &Dom, id: NodeId) -> bool {
    dom.is_named(id, "p") && dom.attr(id, "class") == Some(TOC_CLASS)
}

/// Phase one: each entry paragraph becomes a single anchor to its heading.
fn link_entries(ctx: &mut Context, root: NodeId) -> Result<()> {
    let entries = ctx.dom.find_all(root, |dom, id| is_toc_entry(dom, id));

    for entry in entries {
        let label = match ctx.dom.first_text(entry) {
            Some(text) => truncate_label(&text),
            None => continue,
        };
        if label.is_empty() {
            continue;
        }

        let heading = find_heading(&ctx.dom, root, &label).ok_or_else(|| {
            Error::UnresolvedReference(format!("no heading matches TOC entry: {label}"))
        })?;

        let anchor_name = match find_anchor_name(&ctx.dom, heading) {
            Some(name) => name,
            // A heading without its own anchor cannot be linked; leave the
            // entry for phase two to wrap as plain text.
            None => {
                log::debug!("TOC heading has no anchor: {label}");
                continue;
            }
        };

        let file = heading_file(ctx, heading);
        let href = format!("{file}#{anchor_name}");

        ctx.dom.clear_children(entry);
        let anchor = ctx.dom.create_element("a", vec![Attr::new("href", href)]);
        let text = ctx.dom.create_text(label);
        ctx.dom.append(anchor, text);
        ctx.dom.append(entry, anchor);
    }
    Ok(())
}

/// Cut the label at the leader-dot run and trim what remains.
fn truncate_label(text: &str) -> String {
    match text.find(LEADER_DOTS) {
        Some(idx) if idx > 0 => text[..idx].trim().to_string(),
        _ => text.trim().to_string(),
    }
}

fn normalized(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The unique `<h1>` whose normalized subtree text equals the label.
fn find_heading(dom: &Dom, root: NodeId, label: &str) -> Option<NodeId> {
    dom.find(root, |dom, id| {
        dom.is_named(id, "h1") && normalized(&dom.collect_text(id)) == label
    })
}

/// First named anchor inside the heading subtree.
fn find_anchor_name(dom: &Dom, heading: NodeId) -> Option<String> {
    let anchor = dom.find(heading, |dom, id| {
        dom.is_named(id, "a") && dom.attr(id, "name").is_some()
    })?;
    dom.attr(anchor, "name").map(str::to_string)
}

/// Book-root-relative file the heading will end up in: its owning
/// section's future output file, or the primary target for headings
/// outside any section (those stay in the main document).
fn heading_file(ctx: &Context, heading: NodeId) -> String {
    let mut current = heading;
    while let Some(node) = ctx.dom.get(current) {
        if let Some(name) = section_class_name(&ctx.dom, current) {
            return format!("{name}.xhtml");
        }
        if node.parent.is_none() {
            break;
        }
        current = node.parent;
    }
    ctx.target()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Phase two: wrap the first contiguous entry run into
/// `<nav epub:type="toc"><ol class="Toc">...</ol></nav>`.
fn wrap_entries(dom: &mut Dom, root: NodeId) {
    let first = match dom.find(root, |dom, id| is_toc_entry(dom, id)) {
        Some(first) => first,
        None => return,
    };

    // Maximal contiguous sibling run starting at the first entry; blank
    // text between entries is skipped, anything else ends the run.
    let mut run = vec![first];
    let mut current = first;
    loop {
        let next = match dom.get(current).map(|n| n.next_sibling) {
            Some(next) if next.is_some() => next,
            _ => break,
        };
        current = next;
        if is_toc_entry(dom, current) {
            run.push(current);
        } else if dom.text(current).is_some_and(|t| t.trim().is_empty()) {
            continue;
        } else {
            break;
        }
    }

    let nav = dom.create_element("nav", vec![Attr::new("epub:type", "toc")]);
    let ol = dom.create_element("ol", vec![Attr::new("class", "Toc")]);
    dom.append(nav, ol);
    dom.insert_before(first, nav);

    for entry in run {
        let li = dom.create_element("li", vec![Attr::new("class", TOC_CLASS)]);
        let content: Vec<NodeId> = dom.children(entry).collect();
        for node in content {
            dom.detach(node);
            dom.append(li, node);
        }
        dom.detach(entry);
        dom.append(ol, li);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::Config;
    use crate::dom::parse_str;
    use crate::transform::Options;

    use super::*;

    const DOC: &str = r#"<html><body>
        <div class="WordSection1">
        <p class="MsoToc1"><span>Chapter One<span>... 3</span></span></p>
        <p class="MsoToc1"><span>Chapter Two<span>... 9</span></span></p>
        </div>
        <div class="WordSection2">
        <h1><a name="_Toc101">Chapter One</a></h1>
        <p>Body one</p>
        <h1><a name="_Toc102">Chapter Two</a></h1>
        <p>Body two</p>
        </div>
        </body></html>"#;

    fn run(html: &str) -> Result<String> {
        let config = Config::new();
        let options = Options::default();
        let mut ctx = Context::new(
            &config,
            &options,
            PathBuf::from("WebPage02.html"),
            parse_str(html),
        );
        TocPass.run(&mut ctx)?;
        Ok(crate::serialize::serialize(&ctx.dom, &Default::default()))
    }

    #[test]
    fn entries_link_to_section_qualified_anchors() {
        let out = run(DOC).unwrap();
        assert!(
            out.contains(r##"<a href="WordSection2.xhtml#_Toc101">Chapter One</a>"##),
            "{out}"
        );
        assert!(
            out.contains(r##"<a href="WordSection2.xhtml#_Toc102">Chapter Two</a>"##),
            "{out}"
        );
    }

    #[test]
    fn entries_wrapped_in_nav_list() {
        let out = run(DOC).unwrap();
        assert!(out.contains(r#"<nav epub:type="toc">"#), "{out}");
        assert!(out.contains(r#"<ol class="Toc">"#), "{out}");
        assert_eq!(out.matches(r#"<li class="MsoToc1">"#).count(), 2, "{out}");
        assert!(!out.contains(r#"<p class="MsoToc1">"#), "{out}");
    }

    #[test]
    fn heading_outside_section_links_to_main_target() {
        let html = r#"<html><body>
            <p class="MsoToc1">Intro... 1</p>
            <h1><a name="_Toc1">Intro</a></h1>
            </body></html>"#;
        let out = run(html).unwrap();
        assert!(
            out.contains(r##"<a href="WebPage02.html#_Toc1">Intro</a>"##),
            "{out}"
        );
    }

    #[test]
    fn unmatched_entry_is_fatal() {
        let html = r#"<html><body>
            <p class="MsoToc1">Ghost Chapter... 5</p>
            <h1><a name="_Toc1">Real Chapter</a></h1>
            </body></html>"#;
        assert!(matches!(
            run(html),
            Err(Error::UnresolvedReference(_))
        ));
    }

    #[test]
    fn run_breaks_at_non_entry() {
        let html = r#"<html><body>
            <p class="MsoToc1">One... 1</p>
            <p class="MsoNormal">gap</p>
            <p class="MsoToc1">Two... 2</p>
            <h1><a name="_a">One</a></h1>
            <h1><a name="_b">Two</a></h1>
            </body></html>"#;
        let out = run(html).unwrap();
        // Only the first contiguous run is wrapped.
        assert_eq!(out.matches("<nav").count(), 1, "{out}");
        assert_eq!(out.matches(r#"<li class="MsoToc1">"#).count(), 1, "{out}");
        assert_eq!(out.matches(r#"<p class="MsoToc1">"#).count(), 1, "{out}");
    }
}
