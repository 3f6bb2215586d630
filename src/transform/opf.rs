//! OPF package generation.
//!
//! Streams the OPF template through an XML reader/writer pair and injects
//! generated children just before the closing tags of `metadata`,
//! `manifest`, and `spine`. The template supplies the package root with
//! its namespace declarations; this pass only contributes the entries
//! that depend on the run: book metadata from configuration, one manifest
//! item per exported section plus the cover image and the primary
//! content, and a spine mirroring the manifest order.

use std::path::PathBuf;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::config;
use crate::error::{Error, Result};

use super::{Context, Pass};

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

pub struct OpfPass;

impl Pass for OpfPass {
    fn name(&self) -> &'static str {
        "opf"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let template = ctx.basedir.join(&ctx.options.opf_template);
        if !template.is_file() {
            log::warn!("Cannot find OPF template: {}", template.display());
            return Ok(());
        }
        log::debug!("OPF template: {}", template.display());

        let text = std::fs::read_to_string(&template)?;
        let filled = fill_template(ctx, &text)?;

        let target = opf_target(ctx);
        log::info!("Writing OPF: {}", target.display());
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, filled)?;
        Ok(())
    }
}

fn opf_target(ctx: &Context) -> PathBuf {
    let path = match &ctx.options.opf_target {
        Some(path) => path.clone(),
        None => {
            let stem = ctx
                .source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            ctx.options.bookdir.join(format!("{stem}.opf"))
        }
    };
    ctx.basedir.join(path)
}

fn fill_template(ctx: &Context, template: &str) -> Result<String> {
    let mut reader = Reader::from_str(template);
    reader.config_mut().trim_text(true);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut wrote_decl = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Decl(decl) => {
                writer.write_event(Event::Decl(decl))?;
                wrote_decl = true;
            }
            Event::End(end) if end.name().as_ref() == b"metadata" => {
                write_metadata(ctx, &mut writer)?;
                writer.write_event(Event::End(end))?;
            }
            Event::End(end) if end.name().as_ref() == b"manifest" => {
                write_manifest(ctx, &mut writer)?;
                writer.write_event(Event::End(end))?;
            }
            Event::End(end) if end.name().as_ref() == b"spine" => {
                write_spine(ctx, &mut writer)?;
                writer.write_event(Event::End(end))?;
            }
            event => {
                if !wrote_decl {
                    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
                    wrote_decl = true;
                }
                writer.write_event(event)?;
            }
        }
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn required<'a>(ctx: &'a Context, key: &str) -> Result<&'a str> {
    ctx.config
        .get(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::MissingProperty(key.to_string()))
}

fn write_metadata(ctx: &Context, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    let title = required(ctx, config::PROP_OPF_METADATA_TITLE)?;
    write_text_element(writer, "dc:title", &[], title)?;

    let author = required(ctx, config::PROP_OPF_METADATA_AUTHOR)?;
    write_text_element(writer, "dc:creator", &[("opf:role", "aut")], author)?;

    if let Some(language) = ctx
        .config
        .get(config::PROP_OPF_METADATA_LANGUAGE)
        .filter(|value| !value.is_empty())
    {
        write_text_element(writer, "dc:language", &[], language)?;
    }
    Ok(())
}

fn write_manifest(ctx: &Context, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    let image = required(ctx, config::PROP_OPF_COVER_IMAGE)?;
    let media_type = required(ctx, config::PROP_OPF_COVER_IMAGE_TYPE)?;
    let mut item = BytesStart::new("item");
    item.push_attribute(("id", "CoverImage"));
    item.push_attribute(("href", image));
    item.push_attribute(("properties", "cover-image"));
    item.push_attribute(("media-type", media_type));
    writer.write_event(Event::Empty(item))?;

    for section in &ctx.sections {
        let href = ctx.book_relative(&section.target);
        let href = href.to_string_lossy();
        let mut item = BytesStart::new("item");
        item.push_attribute(("id", section.name.as_str()));
        item.push_attribute(("href", href.as_ref()));
        if section.is_nav {
            item.push_attribute(("properties", "nav"));
        }
        item.push_attribute(("media-type", XHTML_MEDIA_TYPE));
        writer.write_event(Event::Empty(item))?;
    }

    let target = ctx.target();
    let href = ctx.book_relative(&target);
    let href = href.to_string_lossy();
    let mut item = BytesStart::new("item");
    item.push_attribute(("id", "Content"));
    item.push_attribute(("href", href.as_ref()));
    item.push_attribute(("media-type", XHTML_MEDIA_TYPE));
    writer.write_event(Event::Empty(item))?;
    Ok(())
}

fn write_spine(ctx: &Context, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    write_itemref(writer, "CoverImage")?;
    for section in &ctx.sections {
        write_itemref(writer, &section.name)?;
    }
    write_itemref(writer, "Content")
}

fn write_itemref(writer: &mut Writer<Vec<u8>>, idref: &str) -> Result<()> {
    let mut itemref = BytesStart::new("itemref");
    itemref.push_attribute(("idref", idref));
    writer.write_event(Event::Empty(itemref))?;
    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    for (key, value) in attrs {
        start.push_attribute((*key, *value));
    }
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
