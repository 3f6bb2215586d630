//! wordbook - Word HTML export to e-book content converter

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use wordbook::Processor;

#[derive(Parser)]
#[command(name = "wordbook")]
#[command(version, about = "Convert word-processor HTML exports to e-book content", long_about = None)]
#[command(after_help = "EXAMPLES:
    wordbook MyBook.html                 Process with wordbook.properties beside the input
    wordbook --opf my-book.opf In.html   Also generate the OPF package file
    wordbook --css book.css In.html      Inject an external stylesheet")]
struct Cli {
    /// Input HTML files
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Book output directory
    #[arg(long, default_value = "book")]
    bookdir: PathBuf,

    /// Path of the processed output, relative to the book directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path of the generated OPF file, relative to the book directory
    #[arg(long)]
    opf: Option<PathBuf>,

    /// Path of the OPF template, relative to the input directory
    #[arg(long)]
    opf_template: Option<PathBuf>,

    /// External CSS file to inject
    #[arg(long)]
    css: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,

    /// Set a property, overriding the discovered configuration
    #[arg(short = 'P', long = "property", value_name = "KEY=VALUE")]
    properties: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut builder = Processor::builder().bookdir(cli.bookdir);
    if cli.pretty {
        builder = builder.pretty();
    }
    for spec in &cli.properties {
        match spec.split_once('=') {
            Some((key, value)) => builder = builder.property(key.trim(), value.trim()),
            None => {
                eprintln!("error: invalid property: {spec} (expected KEY=VALUE)");
                return ExitCode::FAILURE;
            }
        }
    }
    if let Some(output) = cli.output {
        builder = builder.output(output);
    }
    if let Some(opf) = cli.opf {
        builder = builder.opf_target(opf);
    }
    if let Some(template) = cli.opf_template {
        builder = builder.opf_template(template);
    }
    if let Some(css) = cli.css {
        builder = builder.css(css);
    }
    let processor = builder.build();

    for input in &cli.inputs {
        match processor.process(input) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
