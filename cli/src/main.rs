mod browse;
mod config;
mod error;
mod terminal;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use cardmark::query::{collect_diagnostics, section_links};
use cardmark::{Document, parse};
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use navigator::{Event, Navigator, NavigatorConfig};

use crate::error::{CliError, read_source};

const SUBCOMMANDS: &[&str] = &["render", "browse", "sections", "check", "test", "help"];

#[derive(Parser)]
#[command(name = "cardmark", version, about = "Card-by-card reader for cardmark documents")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one card
    Render(RenderArgs),

    /// Read a document interactively, following links by number
    Browse(BrowseArgs),

    /// List the sections of a document
    Sections(SectionsArgs),

    /// Report parse diagnostics (exit 1 if any)
    Check(CheckArgs),

    /// Run .test.md scenario files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Document to read
    file: PathBuf,

    /// Section to show instead of the default one
    #[arg(short, long)]
    section: Option<String>,

    /// Config file (defaults to cardmark.toml beside the document)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wrap width in columns (defaults to the configured line width)
    #[arg(short, long)]
    width: Option<usize>,
}

#[derive(clap::Args)]
struct BrowseArgs {
    /// Document to read
    file: PathBuf,

    /// Config file (defaults to cardmark.toml beside the document)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wrap width in columns (defaults to the configured line width)
    #[arg(short, long)]
    width: Option<usize>,
}

#[derive(clap::Args)]
struct SectionsArgs {
    /// Document to read
    file: PathBuf,

    /// Also list each section's link targets
    #[arg(long)]
    links: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Document to check
    file: PathBuf,

    /// Dump the parsed document
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse_from(with_default_subcommand(std::env::args().collect()));
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let result = match cli.command {
        Command::Render(args) => do_render(args, color_choice),
        Command::Browse(args) => do_browse(args, color_choice),
        Command::Sections(args) => do_sections(args),
        Command::Check(args) => do_check(args, color_choice),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                Ok(0)
            } else {
                test_runner::run_tests(&args.path, cli.no_color, &args.category)
                    .map_err(CliError::from)
            }
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// `cardmark story.md` is shorthand for `cardmark render story.md`.
fn with_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        if !SUBCOMMANDS.contains(&args[pos + 1].as_str()) {
            args.insert(pos + 1, "render".to_string());
        }
    }
    args
}

fn load_config(explicit: Option<&Path>, document: &Path) -> Result<NavigatorConfig, CliError> {
    Ok(config::resolve(explicit, document)?)
}

fn width_or_default(width: Option<usize>, config: &NavigatorConfig) -> usize {
    width.unwrap_or_else(|| terminal::cells(config.format.line_width))
}

fn do_render(args: RenderArgs, color_choice: ColorChoice) -> Result<i32, CliError> {
    let config = load_config(args.config.as_deref(), &args.file)?;
    let width = width_or_default(args.width, &config);
    let source = read_source(&args.file)?;

    let mut navigator = Navigator::from_source(source, config);
    if let Some(label) = args.section {
        navigator.dispatch(Event::Navigate(label));
    }

    let stdout = StandardStream::stdout(color_choice);
    terminal::paint(&mut stdout.lock(), &navigator.render(), width)?;
    Ok(0)
}

fn do_browse(args: BrowseArgs, color_choice: ColorChoice) -> Result<i32, CliError> {
    let config = load_config(args.config.as_deref(), &args.file)?;
    let width = width_or_default(args.width, &config);

    let mut session = browse::Session::open(&args.file, config, width)?;
    let stdout = StandardStream::stdout(color_choice);
    session.run(std::io::stdin().lock(), &mut stdout.lock())?;
    Ok(0)
}

fn do_sections(args: SectionsArgs) -> Result<i32, CliError> {
    let config = load_config(None, &args.file)?;
    let document = parse(&config.parse, &read_source(&args.file)?);
    print!("{}", section_listing(&document, args.links));
    Ok(0)
}

/// One line per section: heading marks, then the display title. With
/// `links`, each link target follows on an indented line.
fn section_listing(document: &Document, links: bool) -> String {
    let mut out = String::new();
    for section in &document.sections {
        out.push_str(&format!(
            "{} {}\n",
            "#".repeat(usize::from(section.level)),
            section.label.display_title()
        ));
        if links {
            for target in section_links(section) {
                out.push_str(&format!("    -> {}\n", target));
            }
        }
    }
    out
}

fn do_check(args: CheckArgs, color_choice: ColorChoice) -> Result<i32, CliError> {
    let config = load_config(None, &args.file)?;
    let source = read_source(&args.file)?;
    let document = parse(&config.parse, &source);

    if args.ast {
        println!("{:#?}", document);
    }

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.display().to_string(), source);

    let diagnostics = collect_diagnostics(&document);
    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();
    for found in &diagnostics {
        let diagnostic = found.to_diagnostic(file_id);
        let _ = term::emit_to_write_style(&mut writer.lock(), &term_config, &files, &diagnostic);
    }

    if diagnostics.is_empty() {
        eprintln!("ok: {} parsed cleanly", args.file.display());
        Ok(0)
    } else {
        Ok(1)
    }
}
