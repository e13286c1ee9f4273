//! CLI entry point: parses flags by hand (no `clap` — the core analysis
//! crate this tool is modeled on does its own flag parsing too), wires up
//! tracing for `--debug`, runs the pipeline, and writes DOT output to a
//! file or stdout.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use modcycle::config::{Config, Resolution};
use modcycle::pipeline::CancellationToken;

const VERSION: &str = env!("CARGO_PKG_VERSION");

struct ParsedArgs {
    path: PathBuf,
    dot_out: Option<PathBuf>,
    resolution: Resolution,
    palette: Option<PathBuf>,
    debug: bool,
}

impl Default for ParsedArgs {
    fn default() -> Self {
        ParsedArgs {
            path: PathBuf::from("."),
            dot_out: None,
            resolution: Resolution::File,
            palette: None,
            debug: false,
        }
    }
}

fn parse_args() -> Result<Option<ParsedArgs>> {
    let mut parsed = ParsedArgs::default();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("modcycle {VERSION}");
                return Ok(None);
            }
            "--path" => {
                i += 1;
                let value = args.get(i).context("--path requires a value")?;
                parsed.path = PathBuf::from(value);
            }
            "--dot" => {
                i += 1;
                let value = args.get(i).context("--dot requires a value")?;
                parsed.dot_out = Some(PathBuf::from(value));
            }
            "--resolution" => {
                i += 1;
                let value = args.get(i).context("--resolution requires a value")?;
                parsed.resolution = value
                    .parse()
                    .map_err(|e: modcycle::Error| anyhow::anyhow!(e.to_string()))?;
            }
            "--palette" => {
                i += 1;
                let value = args.get(i).context("--palette requires a value")?;
                parsed.palette = Some(PathBuf::from(value));
            }
            "--debug" => parsed.debug = true,
            other => bail!("unrecognized argument: {other}"),
        }
        i += 1;
    }
    Ok(Some(parsed))
}

fn print_help() {
    println!(
        "modcycle {VERSION}\n\
         File-granularity import cycle analysis and DOT rendering for Go modules.\n\n\
         USAGE:\n    modcycle [OPTIONS]\n\n\
         OPTIONS:\n\
         \x20   --path <DIR>          Directory inside the module to analyze (default: .)\n\
         \x20   --dot <FILE>          Write DOT output to FILE instead of stdout\n\
         \x20   --resolution <MODE>   \"file\" (default) or \"package\"\n\
         \x20   --palette <FILE>      TOML file overriding the default color palette\n\
         \x20   --debug               Enable verbose tracing output on stderr\n\
         \x20   -V, --version         Print the version and exit\n\
         \x20   -h, --help            Print this help and exit"
    );
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        EnvFilter::new("modcycle=debug")
    } else {
        EnvFilter::new("modcycle=warn")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Exit quietly instead of panicking when stdout is a closed pipe
/// (e.g. `modcycle | head`).
fn install_broken_pipe_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(s) = info.payload().downcast_ref::<String>() {
            if s.contains("Broken pipe") {
                std::process::exit(0);
            }
        }
        default_hook(info);
    }));
}

fn main() -> ExitCode {
    install_broken_pipe_handler();

    let parsed = match parse_args() {
        Ok(Some(p)) => p,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(parsed.debug);

    match run(parsed) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: ParsedArgs) -> Result<()> {
    let mut config = Config {
        resolution: args.resolution,
        debug: args.debug,
        ..Config::default()
    };
    if let Some(palette_path) = &args.palette {
        config
            .load_palette_file(palette_path)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }

    let cancel = CancellationToken::new();
    let (model, module_path) = modcycle::analyze(&args.path, &cancel)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("analyzing module under {}", args.path.display()))?;

    tracing::info!(module = %module_path, packages = model.packages().len(), "analysis complete");

    let dot = modcycle::render(&model, &config);

    match args.dot_out {
        Some(path) => {
            std::fs::write(&path, dot)
                .with_context(|| format!("writing DOT output to {}", path.display()))?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(dot.as_bytes())?;
        }
    }
    Ok(())
}
