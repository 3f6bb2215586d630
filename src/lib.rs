//! # wordbook
//!
//! Turns word-processor HTML exports into clean e-book content: a
//! normalized XHTML document, per-section XHTML files, an injected
//! stylesheet, and a generated OPF package manifest.
//!
//! Processing is a configurable chain of tree-rewriting passes over one
//! parsed document. Which passes run, and most of what they do, is driven
//! by a properties file discovered beside the input (`wordbook.properties`)
//! merged with values registered on the builder.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wordbook::{PassKind, Processor};
//!
//! let processor = Processor::builder()
//!     .bookdir("book")
//!     .pretty()
//!     .pass(PassKind::Attribute)
//!     .pass(PassKind::ListParagraph)
//!     .pass(PassKind::Section)
//!     .build();
//!
//! let xhtml = processor.process("export.html".as_ref()).unwrap();
//! println!("{xhtml}");
//! ```
//!
//! ## Configuration
//!
//! Everything is a flat `key = value` property. The important families:
//!
//! - `transformer.<NN> = <pass-id>` selects and orders the passes
//! - `attribute.remove.*` / `attribute.replace.*` clean up attributes
//! - `style.replace.*` rewrites class names against an external stylesheet
//! - `opf.metadata.*` / `opf.manifest.*` fill the OPF template
//! - `output.format`, `output.encoding`, `escaped.chars` shape serialization

pub mod config;
pub mod dom;
pub mod error;
pub mod processor;
pub mod serialize;
pub mod transform;

pub use config::Config;
pub use error::{Error, Result};
pub use processor::{Processor, ProcessorBuilder};
pub use transform::PassKind;
