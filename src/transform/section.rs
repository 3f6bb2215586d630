//! Section splitting.
//!
//! Word wraps each document section in a `<div class="WordSectionN">`.
//! This pass records every such div on the context for the OPF pass and
//! exports each one into its own file: the section div is detached from
//! the source tree and re-homed inside a skeleton clone of the document
//! whose `<body>` holds nothing else. The export loop stops retaining
//! records after the first section carrying the TOC nav list; that
//! truncation matches long-standing output and is pinned by tests, so it
//! must not be "fixed" casually.

use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::serialize;

use super::{Context, Pass, Section};

const SECTION_CLASS_PREFIX: &str = "WordSection";
const NAV_ITEM_CLASS: &str = "MsoToc1";

pub struct SectionPass;

impl Pass for SectionPass {
    fn name(&self) -> &'static str {
        "section"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let root = match ctx.dom.root_element() {
            Some(root) => root,
            None => return Ok(()),
        };

        let sections = discover(ctx, root);
        let write_opts = ctx.write_options()?;

        let mut retained = Vec::new();
        let mut navfound = false;
        for section in sections {
            if navfound {
                continue;
            }
            navfound = section.is_nav;

            export(ctx, root, &section, &write_opts)?;
            retained.push(section);
        }

        ctx.sections = retained;
        Ok(())
    }
}

/// The `WordSection*` class of a section div, if this node is one.
pub(crate) fn section_class_name(dom: &Dom, id: NodeId) -> Option<String> {
    if !dom.is_named(id, "div") {
        return None;
    }
    dom.attr(id, "class")
        .filter(|class| class.starts_with(SECTION_CLASS_PREFIX))
        .map(str::to_string)
}

/// Top-level section divs in document order. Word never nests sections;
/// a div inside another section div is not recorded separately.
fn discover(ctx: &Context, root: NodeId) -> Vec<Section> {
    let divs = ctx
        .dom
        .find_all(root, |dom, id| section_class_name(dom, id).is_some());

    divs.into_iter()
        .filter(|&id| !has_section_ancestor(&ctx.dom, id))
        .filter_map(|id| {
            let name = section_class_name(&ctx.dom, id)?;
            let target = ctx.options.bookdir.join(format!("{name}.xhtml"));
            let is_nav = ctx
                .dom
                .find_element_with_attr(id, "li", "class", NAV_ITEM_CLASS)
                .is_some();
            Some(Section {
                name,
                element: id,
                target,
                is_nav,
            })
        })
        .collect()
}

fn has_section_ancestor(dom: &Dom, id: NodeId) -> bool {
    let mut current = match dom.get(id) {
        Some(node) => node.parent,
        None => return false,
    };
    while current.is_some() {
        if section_class_name(dom, current).is_some() {
            return true;
        }
        current = match dom.get(current) {
            Some(node) => node.parent,
            None => break,
        };
    }
    false
}

/// Detach the section from the source tree, then write it out inside a
/// skeleton document clone: same `<html>` and `<head>`, a `<body>` holding
/// only the section. Detach-before-clone keeps the section out of its own
/// skeleton.
fn export(ctx: &mut Context, root: NodeId, section: &Section, opts: &serialize::WriteOptions) -> Result<()> {
    ctx.dom.detach(section.element);

    let skeleton = ctx.dom.clone_subtree(root);
    let body = ctx.dom.find_element(skeleton, "body").ok_or_else(|| {
        Error::InvalidDocument("document has no body element".to_string())
    })?;
    ctx.dom.clear_children(body);
    let content = ctx.dom.clone_subtree(section.element);
    ctx.dom.append(body, content);

    log::debug!("Writing section: {}", section.target.display());
    serialize::write_subtree(&ctx.dom, skeleton, opts, &section.target)?;

    ctx.dom.detach(skeleton);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::config::Config;
    use crate::dom::parse_str;
    use crate::transform::Options;

    use super::*;

    const DOC: &str = r#"<html><head><title>T</title></head><body>
        <div class="WordSection1">
        <nav epub:type="toc"><ol class="Toc"><li class="MsoToc1">entry</li></ol></nav>
        </div>
        <div class="WordSection2"><h1>Chapter</h1><p>Body</p></div>
        </body></html>"#;

    fn run(html: &str) -> (Context<'static>, TempDir) {
        let tmp = TempDir::new().unwrap();
        let config = Box::leak(Box::new(Config::new()));
        let options = Box::leak(Box::new(Options {
            bookdir: tmp.path().join("book"),
            ..Options::default()
        }));
        let mut ctx = Context::new(
            config,
            options,
            tmp.path().join("in.html"),
            parse_str(html),
        );
        SectionPass.run(&mut ctx).unwrap();
        (ctx, tmp)
    }

    #[test]
    fn sections_recorded_in_document_order() {
        let (ctx, _tmp) = run(
            r#"<html><head></head><body>
            <div class="WordSection1"><p>a</p></div>
            <div class="WordSection2"><p>b</p></div>
            </body></html>"#,
        );
        let names: Vec<&str> = ctx.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["WordSection1", "WordSection2"]);
        assert!(!ctx.sections[0].is_nav);
    }

    #[test]
    fn section_file_is_skeleton_with_single_section_body() {
        let (ctx, _tmp) = run(
            r#"<html><head><title>T</title></head><body>
            <div class="WordSection1"><h1>One</h1></div>
            <div class="WordSection2"><h1>Two</h1></div>
            </body></html>"#,
        );
        let text = std::fs::read_to_string(&ctx.sections[1].target).unwrap();
        assert!(text.contains("<title>T</title>"), "{text}");
        assert!(text.contains(r#"<div class="WordSection2">"#), "{text}");
        assert!(!text.contains("WordSection1"), "{text}");
        assert!(text.contains("<h1>Two</h1>"), "{text}");
    }

    #[test]
    fn exported_sections_removed_from_source() {
        let (ctx, _tmp) = run(
            r#"<html><head></head><body>
            <div class="WordSection1"><p>a</p></div>
            <div class="WordSection2"><p>b</p></div>
            </body></html>"#,
        );
        let out = crate::serialize::serialize(&ctx.dom, &Default::default());
        assert!(!out.contains("WordSection"), "{out}");
        assert!(out.contains("<body />"), "{out}");
    }

    #[test]
    fn nav_detection_marks_toc_section() {
        let (ctx, _tmp) = run(DOC);
        assert!(ctx.sections[0].is_nav);
    }

    #[test]
    fn nav_truncates_export() {
        // Sections after the first nav section are neither retained nor
        // written. Long-standing behavior; keep it.
        let (ctx, _tmp) = run(DOC);
        assert_eq!(ctx.sections.len(), 1);
        assert_eq!(ctx.sections[0].name, "WordSection1");
        assert!(ctx.sections[0].target.is_file());
        assert!(!ctx.options.bookdir.join("WordSection2.xhtml").exists());
        // The truncated section stays in the source document.
        let out = crate::serialize::serialize(&ctx.dom, &Default::default());
        assert!(out.contains("WordSection2"), "{out}");
    }

    #[test]
    fn no_sections_is_a_noop() {
        let (ctx, _tmp) = run("<html><head></head><body><p>plain</p></body></html>");
        assert!(ctx.sections.is_empty());
        assert!(!ctx.options.bookdir.exists());
    }
}
