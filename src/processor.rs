//! Pipeline assembly and the one-call entry point.
//!
//! A [`Processor`] is built once and can process any number of input
//! documents. Configuration comes from two places: a
//! `wordbook.properties` file discovered beside each input, and values
//! registered on the builder. Registered values win on key collision, so
//! a caller can pin settings regardless of what ships next to the
//! document.

use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::dom;
use crate::error::Result;
use crate::serialize;
use crate::transform::{Context, Options, PassKind};

pub struct ProcessorBuilder {
    config: Config,
    options: Options,
    passes: Vec<PassKind>,
}

impl Default for ProcessorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
            options: Options::default(),
            passes: Vec::new(),
        }
    }

    /// Register a property; registered values override the discovered
    /// configuration file.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.set(key, value);
        self
    }

    pub fn compact(self) -> Self {
        self.property(config::PROP_OUTPUT_FORMAT, config::OUTPUT_FORMAT_COMPACT)
    }

    pub fn pretty(self) -> Self {
        self.property(config::PROP_OUTPUT_FORMAT, config::OUTPUT_FORMAT_PRETTY)
    }

    pub fn bookdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.bookdir = path.into();
        self
    }

    /// Primary output path; relative paths land in the book directory.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.output = Some(self.bookdir_resolved(path.into()));
        self
    }

    /// Generated OPF path; relative paths land in the book directory.
    pub fn opf_target(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.opf_target = Some(self.bookdir_resolved(path.into()));
        self
    }

    pub fn opf_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.opf_template = path.into();
        self
    }

    pub fn css(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.external_css = Some(path.into());
        self
    }

    /// Append a pass ahead of any configured via `transformer.*` keys.
    pub fn pass(mut self, kind: PassKind) -> Self {
        self.passes.push(kind);
        self
    }

    fn bookdir_resolved(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.options.bookdir.join(path)
        }
    }

    pub fn build(self) -> Processor {
        Processor {
            config: self.config,
            options: self.options,
            passes: self.passes,
        }
    }
}

pub struct Processor {
    config: Config,
    options: Options,
    passes: Vec<PassKind>,
}

impl Processor {
    pub fn builder() -> ProcessorBuilder {
        ProcessorBuilder::new()
    }

    /// Run the configured pipeline over one input document. Writes the
    /// primary output (and whatever side files the passes produce) under
    /// the book directory and returns the primary output text.
    pub fn process(&self, input: &Path) -> Result<String> {
        log::info!("Process: {}", input.display());

        let discovered = Config::load_beside(input)?;
        let config = discovered.merged(&self.config);

        log::debug!("Using properties:");
        for key in config.sorted_keys() {
            log::debug!("  {key} = {}", config.get(key).unwrap_or_default());
        }

        let charset = config.get(config::PROP_INPUT_CHARSET);
        let tree = dom::parse_file(input, charset)?;
        let mut ctx = Context::new(&config, &self.options, input.to_path_buf(), tree);

        for kind in self.resolve_passes(&config)? {
            let pass = kind.instantiate();
            log::debug!("Transforming with: {}", pass.name());
            pass.run(&mut ctx)?;
        }

        let write_opts = ctx.write_options()?;
        let result = serialize::serialize(&ctx.dom, &write_opts);

        let outfile = self.options.bookdir.join(ctx.target());
        log::debug!("Writing output to: {}", outfile.display());
        if let Some(parent) = outfile.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&outfile, serialize::encode(&result, &write_opts))?;

        Ok(result)
    }

    /// Builder-registered passes first, then `transformer.<NN>` keys in
    /// sorted order.
    fn resolve_passes(&self, config: &Config) -> Result<Vec<PassKind>> {
        let mut passes = self.passes.clone();
        for key in config.keys_with_prefix(config::PROP_TRANSFORMER) {
            let name = config.get(key).unwrap_or_default();
            passes.push(PassKind::from_name(name)?);
        }
        Ok(passes)
    }
}
