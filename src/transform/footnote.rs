//! Footnote reference rewriting.
//!
//! Word marks footnote references as anchors whose target carries the
//! reserved `_ftn` prefix, with the visible marker nested in font spans.
//! Each reference is replaced in place by a
//! `<span class="MsoFootnoteReference">` wrapping a stripped clone of the
//! anchor that carries only the marker text, which is what reader engines
//! style correctly. References are collected once per footnote id in
//! discovery order; a reference without its companion definition anchor is
//! left as it was.

use crate::dom::{Attr, Dom, NodeId};
use crate::error::Result;

use super::{Context, Pass};

const FOOTNOTE_PREFIX: &str = "#_ftn";
const REFERENCE_CLASS: &str = "MsoFootnoteReference";

pub struct FootnotePass;

impl Pass for FootnotePass {
    fn name(&self) -> &'static str {
        "footnote"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let root = match ctx.dom.root_element() {
            Some(root) => root,
            None => return Ok(()),
        };

        // One entry per footnote id, first reference wins.
        let refs = ctx.dom.find_all(root, |dom, id| is_footnote_ref(dom, id));
        let mut recorded: Vec<(String, NodeId)> = Vec::new();
        for anchor in refs {
            let target = match ctx.dom.attr(anchor, "href") {
                Some(href) => href.trim_start_matches('#').to_string(),
                None => continue,
            };
            if recorded.iter().any(|(id, _)| *id == target) {
                continue;
            }
            recorded.push((target, anchor));
        }

        for (target, anchor) in recorded {
            // The definition anchor carries the target as its name.
            if ctx
                .dom
                .find_element_with_attr(root, "a", "name", &target)
                .is_none()
            {
                log::warn!("No footnote definition anchor named: {target}");
                continue;
            }

            let marker = ctx.dom.first_text(anchor).unwrap_or_default();
            replace_with_reference_span(&mut ctx.dom, anchor, &marker);
        }
        Ok(())
    }
}

fn is_footnote_ref(dom: &Dom, id: NodeId) -> bool {
    dom.is_named(id, "a")
        && dom
            .attr(id, "href")
            .is_some_and(|href| href.starts_with(FOOTNOTE_PREFIX))
}

/// Swap the anchor for a reference span holding a stripped clone: same
/// attributes, marker text as the only content.
fn replace_with_reference_span(dom: &mut Dom, anchor: NodeId, marker: &str) {
    let span = dom.create_element("span", vec![Attr::new("class", REFERENCE_CLASS)]);
    let attrs = dom.attrs(anchor).to_vec();
    let clone = dom.create_element("a", attrs);
    let text = dom.create_text(marker);
    dom.append(clone, text);
    dom.append(span, clone);

    dom.insert_before(anchor, span);
    dom.detach(anchor);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::Config;
    use crate::dom::parse_str;
    use crate::transform::Options;

    use super::*;

    fn ctx_for<'a>(
        config: &'a Config,
        options: &'a Options,
        html: &str,
    ) -> Context<'a> {
        Context::new(config, options, PathBuf::from("in.html"), parse_str(html))
    }

    const DOC: &str = r##"<html><body>
        <p>Some claim<a href="#_ftn1" name="_ftnref1"><span><span>[1]</span></span></a> here.</p>
        <div><p><a href="#_ftnref1" name="_ftn1"><span>[1]</span></a> The fine print.</p></div>
        </body></html>"##;

    #[test]
    fn reference_becomes_marker_span() {
        let config = Config::new();
        let options = Options::default();
        let mut ctx = ctx_for(&config, &options, DOC);
        FootnotePass.run(&mut ctx).unwrap();
        let out = crate::serialize::serialize(&ctx.dom, &Default::default());
        assert!(
            out.contains(
                r##"<span class="MsoFootnoteReference"><a href="#_ftn1" name="_ftnref1">[1]</a></span>"##
            ),
            "{out}"
        );
    }

    #[test]
    fn backlink_is_rewritten_too() {
        // The definition's backlink targets `#_ftnref1`, which shares the
        // reserved prefix and resolves against the original reference.
        let config = Config::new();
        let options = Options::default();
        let mut ctx = ctx_for(&config, &options, DOC);
        FootnotePass.run(&mut ctx).unwrap();
        let out = crate::serialize::serialize(&ctx.dom, &Default::default());
        assert_eq!(out.matches("MsoFootnoteReference").count(), 2, "{out}");
    }

    #[test]
    fn duplicate_references_deduplicated() {
        let html = r##"<html><body>
            <p><a href="#_ftn1">[1]</a> and again <a href="#_ftn1">[1]</a></p>
            <p><a name="_ftn1">def</a></p>
            </body></html>"##;
        let config = Config::new();
        let options = Options::default();
        let mut ctx = ctx_for(&config, &options, html);
        FootnotePass.run(&mut ctx).unwrap();
        let out = crate::serialize::serialize(&ctx.dom, &Default::default());
        assert_eq!(out.matches("MsoFootnoteReference").count(), 1, "{out}");
        // The second reference stays as it was.
        assert_eq!(out.matches(r##"<a href="#_ftn1">"##).count(), 2, "{out}");
    }

    #[test]
    fn missing_definition_leaves_reference_untouched() {
        let html = r##"<html><body>
            <p><a href="#_ftn9">[9]</a> and <a href="#_ftn1">[1]</a></p>
            <p><a name="_ftn1">def</a></p>
            </body></html>"##;
        let config = Config::new();
        let options = Options::default();
        let mut ctx = ctx_for(&config, &options, html);
        FootnotePass.run(&mut ctx).unwrap();
        let out = crate::serialize::serialize(&ctx.dom, &Default::default());
        // The dangling reference survives as-is; the resolved one is rewritten.
        assert!(out.contains(r##"<a href="#_ftn9">[9]</a>"##), "{out}");
        assert!(
            out.contains(r##"<span class="MsoFootnoteReference"><a href="#_ftn1">[1]</a></span>"##),
            "{out}"
        );
    }

    #[test]
    fn ordinary_anchors_untouched() {
        let html = r##"<html><body><p><a href="#chapter1">Chapter 1</a></p>
            <h1><a name="chapter1">Chapter 1</a></h1></body></html>"##;
        let config = Config::new();
        let options = Options::default();
        let mut ctx = ctx_for(&config, &options, html);
        FootnotePass.run(&mut ctx).unwrap();
        let out = crate::serialize::serialize(&ctx.dom, &Default::default());
        assert!(!out.contains("MsoFootnoteReference"), "{out}");
        assert!(out.contains(r##"<a href="#chapter1">"##), "{out}");
    }
}
