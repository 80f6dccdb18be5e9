use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use plume_editor_core::{CommandParams, EditorSession, LogCapture, PluginCatalog};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod config;

#[derive(Parser)]
#[command(version, about = "Plume - run rich-text editor commands over a markup fragment", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor config file (TOML). Defaults apply to anything it leaves out.
    #[arg(long, global = true, env = "PLUME_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run commands in order and print the resulting markup
    Apply {
        #[command(flatten)]
        target: Target,

        /// Named argument passed to every command, as key=value
        #[arg(long = "set", value_parser = parse_pair)]
        options: Vec<(String, String)>,

        /// Commands to run, as `name` or `name=value`
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// List registered commands by category
    List {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the commands whose state is on at the selection
    Active {
        #[command(flatten)]
        target: Target,
    },
    /// Print footnotes and any broken reference/content pairs
    Footnotes {
        /// Markup file, `-` or nothing for stdin
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Target {
    /// Markup file, `-` or nothing for stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Select text by character offsets, as START:END
    #[arg(long, value_parser = parse_span, conflicts_with = "caret")]
    select: Option<(usize, usize)>,

    /// Collapse the selection at a character offset
    #[arg(long)]
    caret: Option<usize>,
}

fn main() -> Result<()> {
    init_miette()?;
    let capture = LogCapture::new(50, Level::DEBUG);
    init_tracing(&capture);

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    let catalog = PluginCatalog::with_builtins(&config);

    match cli.command {
        Commands::Apply {
            target,
            options,
            commands,
        } => {
            for command in &commands {
                catalog.require(parse_command(command).0)?;
            }
            let mut session = open(&target, &config)?;
            let mut failed = 0;
            for command in &commands {
                let (name, value) = parse_command(command);
                let mut params = match value {
                    Some(value) => CommandParams::value(value),
                    None => CommandParams::none(),
                };
                for (key, value) in &options {
                    params = params.with(key.as_str(), value.as_str());
                }
                if !catalog.execute(name, &mut session, &params) {
                    failed += 1;
                    eprintln!("plume: '{name}' made no change");
                }
            }
            println!("{}", session.markup());
            if failed > 0 {
                let recent = capture.dump();
                if !recent.is_empty() {
                    eprintln!("{recent}");
                }
            }
        }
        Commands::List { category } => {
            print!("{}", render_list(&catalog, category.as_deref()));
        }
        Commands::Active { target } => {
            let session = open(&target, &config)?;
            for name in catalog.active_plugins(&session) {
                println!("{name}");
            }
        }
        Commands::Footnotes { input } => {
            let src = read_input(input.as_deref())?;
            let session = EditorSession::from_markup(&src, &config)?;
            print!("{}", render_footnotes(&session));
            let issues = session
                .footnotes()
                .integrity_report(session.document(), session.root());
            if !issues.is_empty() {
                for issue in &issues {
                    eprintln!("plume: {issue:?}");
                }
                miette::bail!("{} broken footnote pair(s)", issues.len());
            }
        }
    }

    Ok(())
}

/// Load the target's markup and apply its selection. Without one the caret
/// goes to the start of the document.
fn open(target: &Target, config: &plume_editor_core::EditorConfig) -> Result<EditorSession> {
    let src = read_input(target.input.as_deref())?;
    let mut session = EditorSession::from_markup(&src, config)?;
    match (target.select, target.caret) {
        (Some((start, end)), _) => session.select_text(start, end),
        (None, Some(at)) => session.place_caret(at),
        (None, None) => session.place_caret(0),
    }
    Ok(session)
}

/// Commands grouped by category, one per line with title and shortcut.
fn render_list(catalog: &PluginCatalog, category: Option<&str>) -> String {
    let mut out = String::new();
    for (cat, count) in catalog.category_stats() {
        if category.is_some_and(|c| c != cat.as_str()) {
            continue;
        }
        let _ = writeln!(out, "{cat} ({count})");
        for record in catalog.by_category(cat) {
            let d = record.descriptor();
            let line = format!(
                "  {:<16} {:<18} {}",
                d.name.as_str(),
                d.title,
                d.shortcut.as_deref().unwrap_or("")
            );
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }
    out
}

fn render_footnotes(session: &EditorSession) -> String {
    let mut out = String::new();
    for record in session.footnotes().records() {
        let _ = writeln!(out, "{}  {}  {}", record.number, record.id, record.text);
    }
    out
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .into_diagnostic()
            .map_err(|e| e.wrap_err(format!("reading {}", path.display()))),
        _ => {
            let mut src = String::new();
            std::io::stdin().read_to_string(&mut src).into_diagnostic()?;
            Ok(src)
        }
    }
}

fn parse_command(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value)),
        None => (raw.trim(), None),
    }
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_owned(), v.to_owned()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn parse_span(raw: &str) -> std::result::Result<(usize, usize), String> {
    let (start, end) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{raw}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|e| format!("bad offset '{s}': {e}"))
    };
    Ok((parse(start)?, parse(end)?))
}

fn init_tracing(capture: &LogCapture) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .with(capture.layer())
        .try_init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(3)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()
}
