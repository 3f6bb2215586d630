//! Stylesheet injection and class rewriting.
//!
//! Only runs when an external stylesheet is configured. The inline
//! `<style>` block the word processor emitted is dropped, the external
//! sheet is copied into the book directory and linked from `<head>`, and
//! every `class` attribute is rewritten through the configured
//! `style.replace.<name> = regex,replacement` rules: whitelisted values
//! pass through untouched, the first fully matching regex substitutes its
//! replacement wholesale, and anything else loses its class attribute.

use regex::Regex;

use crate::config::{self, Config};
use crate::dom::Attr;
use crate::error::{Error, Result};

use super::{Context, Pass};

pub struct StylePass;

struct Replacement {
    pattern: Regex,
    value: String,
}

fn parse_replacements(config: &Config) -> Result<Vec<Replacement>> {
    let mut result = Vec::new();
    for key in config.keys_with_prefix(config::PROP_STYLE_REPLACE) {
        if key == config::PROP_STYLE_REPLACE_WHITELIST {
            continue;
        }
        let value = config.get(key).unwrap_or_default();
        let tokens: Vec<&str> = value.split(',').collect();
        if tokens.len() != 2 {
            return Err(Error::InvalidConfig(format!(
                "invalid style replace spec: {key}={value}"
            )));
        }
        let raw = tokens[0].trim();
        // Full-value match: the rule replaces the class wholesale.
        let anchored = format!("^(?:{raw})$");
        let pattern = Regex::new(&anchored).map_err(|source| Error::InvalidPattern {
            key: key.to_string(),
            source,
        })?;
        result.push(Replacement {
            pattern,
            value: tokens[1].trim().to_string(),
        });
    }
    Ok(result)
}

fn parse_whitelist(config: &Config) -> Vec<String> {
    config
        .get(config::PROP_STYLE_REPLACE_WHITELIST)
        .map(|list| {
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Pass for StylePass {
    fn name(&self) -> &'static str {
        "style"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let css_path = match &ctx.options.external_css {
            Some(path) => path.clone(),
            None => return Ok(()),
        };

        let replacements = parse_replacements(ctx.config)?;
        let whitelist = parse_whitelist(ctx.config);

        let root = match ctx.dom.root_element() {
            Some(root) => root,
            None => return Ok(()),
        };

        // Drop the inline style block the export carries.
        match ctx.dom.find_element(root, "style") {
            Some(style) => ctx.dom.detach(style),
            None => log::debug!("No inline style block to remove"),
        }

        // Copy the stylesheet into the book directory.
        let css_name = css_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "styles.css".to_string());
        let css_source = if css_path.is_absolute() {
            css_path.clone()
        } else {
            ctx.basedir.join(&css_path)
        };
        if css_source.is_file() {
            std::fs::create_dir_all(&ctx.options.bookdir)?;
            std::fs::copy(&css_source, ctx.options.bookdir.join(&css_name))?;
        } else {
            log::warn!("Cannot find external CSS: {}", css_source.display());
        }

        // Link the external sheet from <head>.
        if let Some(head) = ctx.dom.find_element(root, "head") {
            let link = ctx.dom.create_element(
                "link",
                vec![
                    Attr::new("rel", "stylesheet"),
                    Attr::new("type", "text/css"),
                    Attr::new("href", css_name),
                ],
            );
            ctx.dom.append(head, link);

            rewrite_classes(ctx, root, &replacements, &whitelist);
        }

        Ok(())
    }
}

fn rewrite_classes(
    ctx: &mut Context,
    root: crate::dom::NodeId,
    replacements: &[Replacement],
    whitelist: &[String],
) {
    let classed = ctx
        .dom
        .find_all(root, |dom, id| dom.attr(id, "class").is_some());

    for el in classed {
        let current = ctx.dom.attr(el, "class").unwrap_or_default().to_string();

        if whitelist.iter().any(|substr| current.contains(substr)) {
            continue;
        }

        match replacements
            .iter()
            .find(|rep| rep.pattern.is_match(&current))
        {
            Some(rep) => ctx.dom.set_attr(el, "class", &rep.value),
            None => {
                ctx.dom.remove_attr(el, "class");
            }
        }
    }
}
