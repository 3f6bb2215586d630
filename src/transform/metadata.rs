//! Tags the word processor's `Generator` meta element so processed output
//! is distinguishable from a raw export.

use crate::error::Result;

use super::{Context, Pass};

const GENERATOR_SUFFIX: &str = " - wordbook";

pub struct MetadataPass;

impl Pass for MetadataPass {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let root = match ctx.dom.root_element() {
            Some(root) => root,
            None => return Ok(()),
        };
        let metas = ctx.dom.find_all(root, |dom, id| {
            dom.is_named(id, "meta") && dom.attr(id, "name") == Some("Generator")
        });
        for meta in metas {
            if let Some(content) = ctx.dom.attr(meta, "content") {
                if content.ends_with(GENERATOR_SUFFIX) {
                    continue;
                }
                let tagged = format!("{content}{GENERATOR_SUFFIX}");
                ctx.dom.set_attr(meta, "content", &tagged);
            }
        }
        Ok(())
    }
}
