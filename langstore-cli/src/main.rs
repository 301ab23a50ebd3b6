use std::path::PathBuf;

use clap::{Parser, Subcommand};
use langstore::{DuplicateStyle, Error, FormatRegistry, FormatType};
use langstore_cli::{
    Outcome, ToPoRequest,
    convert::read_store,
    formats::{parse_format, parse_language, resolve_format},
    run_from_po, run_merge, run_to_po,
    view::print_view,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log merge decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a native document to a PO catalog.
    ToPo {
        /// The native document to read translations from
        #[arg(short, long)]
        input: PathBuf,
        /// Template document deciding which units are emitted, in which order
        #[arg(short, long)]
        template: Option<PathBuf>,
        /// The PO file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Native format, inferred from the extension when omitted
        #[arg(long, value_parser = parse_format)]
        format: Option<FormatType>,
        /// How to keep entries with the same source text apart: msgctxt or merge
        #[arg(long, default_value = "msgctxt", value_parser = |s: &str| s.parse::<DuplicateStyle>())]
        duplicates: DuplicateStyle,
        /// Leave every msgstr empty
        #[arg(long)]
        pot: bool,
        /// Target language recorded in the PO header
        #[arg(short, long, value_parser = parse_language)]
        lang: Option<String>,
    },

    /// Merge a PO catalog into a native template.
    FromPo {
        /// The PO file to read
        #[arg(short, long)]
        input: PathBuf,
        /// The native template
        #[arg(short, long)]
        template: Option<PathBuf>,
        /// The native document to write
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_parser = parse_format)]
        format: Option<FormatType>,
        /// Accept fuzzy entries as translations
        #[arg(long)]
        fuzzy: bool,
        /// Target language, used for plural categories
        #[arg(short, long, value_parser = parse_language)]
        lang: Option<String>,
    },

    /// Merge a translated document into a template of the same format.
    Merge {
        #[arg(short, long)]
        template: Option<PathBuf>,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_parser = parse_format)]
        format: Option<FormatType>,
        #[arg(short, long, value_parser = parse_language)]
        lang: Option<String>,
    },

    /// Print the units of a native document.
    View {
        /// The input file to view
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, value_parser = parse_format)]
        format: Option<FormatType>,
        /// Display full value without truncation
        #[arg(long)]
        full: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(commands: Commands, registry: &FormatRegistry) -> Result<Option<Outcome>, Error> {
    let outcome = match commands {
        Commands::ToPo {
            input,
            template,
            output,
            format,
            duplicates,
            pot,
            lang,
        } => run_to_po(
            registry,
            ToPoRequest {
                input: &input,
                template: template.as_deref(),
                output: &output,
                format,
                duplicates,
                pot,
                lang,
            },
        )?,
        Commands::FromPo {
            input,
            template,
            output,
            format,
            fuzzy,
            lang,
        } => run_from_po(
            registry,
            &input,
            template.as_deref(),
            &output,
            format,
            fuzzy,
            lang,
        )?,
        Commands::Merge {
            template,
            input,
            output,
            format,
            lang,
        } => run_merge(registry, template.as_deref(), &input, &output, format, lang)?,
        Commands::View {
            input,
            format,
            full,
        } => {
            let format = resolve_format(&input, format)?;
            let store = read_store(registry, format, &input, &Default::default())?;
            print_view(&store, full);
            return Ok(None);
        }
    };
    Ok(Some(outcome))
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let registry = FormatRegistry::with_defaults();
    match run(args.commands, &registry) {
        Ok(Some(Outcome::Written { path, units })) => {
            eprintln!("Wrote {} unit(s) to {}", units, path);
        }
        Ok(Some(Outcome::Empty)) => {
            eprintln!("No translatable units found; output not written");
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
