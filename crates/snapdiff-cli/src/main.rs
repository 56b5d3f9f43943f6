use serde::Serialize;
use snapdiff::{CompareOptions, DEFAULT_THRESHOLD, RunConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Run(snapdiff::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Run(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<snapdiff::Error> for CliError {
    fn from(value: snapdiff::Error) -> Self {
        Self::Run(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug)]
struct Args {
    root: Option<PathBuf>,
    threshold: f64,
    json: bool,
    pretty: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            root: None,
            threshold: DEFAULT_THRESHOLD,
            json: false,
            pretty: false,
        }
    }
}

fn usage() -> &'static str {
    "snapdiff-cli\n\
\n\
USAGE:\n\
  snapdiff-cli [--root <dir>] [--threshold <0..1>] [--json] [--pretty]\n\
\n\
NOTES:\n\
  - <dir> defaults to the current directory and must contain `imageSnapshots-master/`\n\
    (baseline) and `imageSnapshots/` (candidate) with PNG screenshots.\n\
  - Diff images go to `<dir>/imageDiffSnapshots/`, the report to\n\
    `<dir>/visual-regression-report.md`.\n\
  - --threshold is the per-pixel color tolerance (default 0.1).\n\
  - --json prints the run summary as JSON to stdout; --pretty indents it.\n\
  - Log verbosity follows RUST_LOG (default: info).\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--json" => args.json = true,
            "--pretty" => args.pretty = true,
            "--root" => {
                let Some(root) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.root = Some(PathBuf::from(root));
            }
            "--threshold" => {
                let Some(threshold) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.threshold = threshold
                    .parse::<f64>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if !(0.0..=1.0).contains(&args.threshold) {
                    return Err(CliError::Usage(usage()));
                }
            }
            _ => return Err(CliError::Usage(usage())),
        }
    }

    Ok(args)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let root = args.root.unwrap_or_else(|| PathBuf::from("."));
    let config = RunConfig {
        compare: CompareOptions::default().with_threshold(args.threshold),
        ..RunConfig::from_root(&root)
    };

    let summary = snapdiff::run(&config)?;
    if args.json {
        write_json(&summary, args.pretty)?;
    }
    Ok(())
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing();

    if let Err(err) = run(args) {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}
