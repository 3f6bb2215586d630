//! The transformation pipeline.
//!
//! A run is an ordered chain of passes over one shared [`Dom`]. Every pass
//! mutates the tree in place and may leave signals for later passes on the
//! [`Context`]. Pass order is configured, not inferred, and it matters:
//! attribute and metadata cleanup must precede style evaluation, list
//! grouping must precede TOC linking, and section splitting must precede
//! OPF generation. A failing pass aborts the rest of the chain; side files
//! already written stay on disk.

mod attribute;
mod footnote;
mod list;
mod metadata;
mod opf;
mod section;
mod style;
mod toc;

pub use attribute::AttributePass;
pub use footnote::FootnotePass;
pub use list::ListParagraphPass;
pub use metadata::MetadataPass;
pub use opf::OpfPass;
pub use section::SectionPass;
pub use style::StylePass;
pub use toc::TocPass;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::serialize::WriteOptions;

/// Caller-supplied paths for one run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Output book directory; section files, the stylesheet copy, and the
    /// OPF land here.
    pub bookdir: PathBuf,
    /// Primary output path. Derived from the source name when absent.
    pub output: Option<PathBuf>,
    /// Generated OPF path. Derived from the source name when absent.
    pub opf_target: Option<PathBuf>,
    /// OPF template, resolved against the input's basedir.
    pub opf_template: PathBuf,
    /// External stylesheet to inject.
    pub external_css: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bookdir: PathBuf::from("book"),
            output: None,
            opf_target: None,
            opf_template: PathBuf::from("opf-template.xml"),
            external_css: None,
        }
    }
}

/// A section of the source document discovered by the section pass and
/// consumed by the OPF pass.
#[derive(Debug, Clone)]
pub struct Section {
    /// The `WordSectionN` family class name.
    pub name: String,
    /// The section's `<div>`. Valid to re-resolve even after the section
    /// pass detaches it; later passes must not assume it is still linked.
    pub element: NodeId,
    /// Derived output file: bookdir + name + ".xhtml".
    pub target: PathBuf,
    /// True when the subtree contains a TOC-entry list item.
    pub is_nav: bool,
}

/// Shared per-run state. One context per input file; nothing outlives the
/// run.
pub struct Context<'a> {
    pub config: &'a Config,
    pub options: &'a Options,
    pub basedir: PathBuf,
    pub source: PathBuf,
    pub dom: Dom,
    /// Cross-pass signal: sections in first-discovery (document) order,
    /// written by [`SectionPass`], read by [`OpfPass`].
    pub sections: Vec<Section>,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a Config, options: &'a Options, source: PathBuf, dom: Dom) -> Self {
        let basedir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            config,
            options,
            basedir,
            source,
            dom,
            sections: Vec::new(),
        }
    }

    /// The primary output path, relative to the bookdir unless configured
    /// absolute: the configured output, else the source stem + ".html".
    pub fn target(&self) -> PathBuf {
        if let Some(output) = &self.options.output {
            return output.clone();
        }
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        PathBuf::from(format!("{stem}.html"))
    }

    /// Strip the bookdir prefix so hrefs in the manifest and TOC stay
    /// book-root relative.
    pub fn book_relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.options.bookdir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Serializer settings for this run, shared by all file writes.
    pub fn write_options(&self) -> Result<WriteOptions> {
        WriteOptions::from_config(self.config)
    }
}

/// One tree-rewriting pass.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut Context) -> Result<()>;
}

/// Static registry of the available passes. Configuration refers to these
/// by identifier (`transformer.<NN> = <id>`); unknown identifiers are a
/// configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Metadata,
    Attribute,
    Style,
    ListParagraph,
    Footnote,
    Toc,
    Section,
    Opf,
}

impl PassKind {
    pub fn from_name(name: &str) -> Result<PassKind> {
        match name {
            "metadata" => Ok(PassKind::Metadata),
            "attribute" => Ok(PassKind::Attribute),
            "style" => Ok(PassKind::Style),
            "list-paragraph" => Ok(PassKind::ListParagraph),
            "footnote" => Ok(PassKind::Footnote),
            "toc" => Ok(PassKind::Toc),
            "section" => Ok(PassKind::Section),
            "opf" => Ok(PassKind::Opf),
            other => Err(Error::UnknownTransformer(other.to_string())),
        }
    }

    pub fn instantiate(&self) -> Box<dyn Pass> {
        match self {
            PassKind::Metadata => Box::new(MetadataPass),
            PassKind::Attribute => Box::new(AttributePass),
            PassKind::Style => Box::new(StylePass),
            PassKind::ListParagraph => Box::new(ListParagraphPass),
            PassKind::Footnote => Box::new(FootnotePass),
            PassKind::Toc => Box::new(TocPass),
            PassKind::Section => Box::new(SectionPass),
            PassKind::Opf => Box::new(OpfPass),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_all_passes() {
        for name in [
            "metadata",
            "attribute",
            "style",
            "list-paragraph",
            "footnote",
            "toc",
            "section",
            "opf",
        ] {
            let kind = PassKind::from_name(name).unwrap();
            assert_eq!(kind.instantiate().name(), name);
        }
    }

    #[test]
    fn unknown_pass_is_fatal() {
        assert!(matches!(
            PassKind::from_name("org.kdp.word.transformer.StyleTransformer"),
            Err(Error::UnknownTransformer(_))
        ));
    }

    #[test]
    fn target_derived_from_source() {
        let config = Config::new();
        let options = Options::default();
        let ctx = Context::new(
            &config,
            &options,
            PathBuf::from("/tmp/input/WebPage01.html"),
            Dom::new(),
        );
        assert_eq!(ctx.target(), PathBuf::from("WebPage01.html"));
        assert_eq!(ctx.basedir, PathBuf::from("/tmp/input"));
    }

    #[test]
    fn book_relative_strips_prefix() {
        let config = Config::new();
        let options = Options {
            bookdir: PathBuf::from("/tmp/book"),
            ..Options::default()
        };
        let ctx = Context::new(&config, &options, PathBuf::from("in.html"), Dom::new());
        assert_eq!(
            ctx.book_relative(Path::new("/tmp/book/WordSection1.xhtml")),
            PathBuf::from("WordSection1.xhtml")
        );
        assert_eq!(
            ctx.book_relative(Path::new("elsewhere/file.xhtml")),
            PathBuf::from("elsewhere/file.xhtml")
        );
    }
}
