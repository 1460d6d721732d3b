use cartogram::document::run_document;
use cartogram::{CartogramDocument, NoProgress, ProgressSink};
use serde::Serialize;
use std::io::Read;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Cartogram(cartogram::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Cartogram(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<cartogram::Error> for CliError {
    fn from(value: cartogram::Error) -> Self {
        Self::Cartogram(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Run,
    Defaults,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    out: Option<String>,
    pretty: bool,
    progress: bool,
    grid_layer: bool,
    grid_layer_size: Option<usize>,
    deformation: Option<u8>,
    iterations: Option<usize>,
    max_seconds: Option<u64>,
    log_level: Option<Level>,
}

fn usage() -> &'static str {
    "cartogram\n\
\n\
USAGE:\n\
  cartogram [run] [--pretty] [--progress] [--grid-layer] [--grid-layer-size <n>] [--deformation <0-100>] [--iterations <1-4>] [--max-seconds <n>] [--log-level <level>] [--out <path>] [<path>|-]\n\
  cartogram defaults [--pretty]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the input document is read from stdin.\n\
  - run prints the output document (projected layers, optional grid, report) to stdout by default.\n\
  - Command-line options override the document's options.\n\
  - defaults prints an empty input document carrying the default options.\n\
  - --progress reports milestones (0-1000) on stderr; --log-level is one of trace|debug|info|warn|error.\n\
"
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    fn value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
        it.next().ok_or(CliError::Usage(usage()))
    }
    fn number<T: std::str::FromStr>(raw: &str) -> Result<T, CliError> {
        raw.parse::<T>().map_err(|_| CliError::Usage(usage()))
    }

    let mut args = Args::default();
    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "run" => args.command = Command::Run,
            "defaults" => args.command = Command::Defaults,
            "--pretty" => args.pretty = true,
            "--progress" => args.progress = true,
            "--grid-layer" => args.grid_layer = true,
            "--grid-layer-size" => {
                let size = number::<usize>(value(&mut it)?)?;
                if size == 0 {
                    return Err(CliError::Usage(usage()));
                }
                args.grid_layer_size = Some(size);
            }
            "--deformation" => {
                let dial = number::<u8>(value(&mut it)?)?;
                if dial > 100 {
                    return Err(CliError::Usage(usage()));
                }
                args.deformation = Some(dial);
            }
            "--iterations" => {
                let passes = number::<usize>(value(&mut it)?)?;
                if !(1..=4).contains(&passes) {
                    return Err(CliError::Usage(usage()));
                }
                args.iterations = Some(passes);
            }
            "--max-seconds" => args.max_seconds = Some(number::<u64>(value(&mut it)?)?),
            "--log-level" => {
                let level = parse_level(value(&mut it)?).ok_or(CliError::Usage(usage()))?;
                args.log_level = Some(level);
            }
            "--out" => args.out = Some(value(&mut it)?.clone()),
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    // Fails only when a subscriber is already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None | Some("-") => {
            let stdout = std::io::stdout().lock();
            if pretty {
                serde_json::to_writer_pretty(stdout, value)?;
            } else {
                serde_json::to_writer(stdout, value)?;
            }
            println!();
        }
        Some(path) => {
            let text = if pretty {
                serde_json::to_string_pretty(value)?
            } else {
                serde_json::to_string(value)?
            };
            std::fs::write(path, text)?;
        }
    }
    Ok(())
}

/// Prints progress milestones to stderr.
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&mut self, progress: u16, status: &str) {
        eprintln!("[{progress:>4}/1000] {status}");
    }
}

fn apply_overrides(doc: &mut CartogramDocument, args: &Args) {
    let options = &mut doc.options;
    if args.grid_layer {
        options.create_grid_layer = true;
    }
    if let Some(size) = args.grid_layer_size {
        options.grid_layer_size = size;
    }
    if let Some(dial) = args.deformation {
        options.amount_of_deformation = dial;
    }
    if let Some(passes) = args.iterations {
        options.diffusion_iterations = Some(passes);
    }
    if let Some(secs) = args.max_seconds {
        options.maximum_running_time_secs = Some(secs);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Defaults => write_json(&CartogramDocument::default(), args.pretty, None),
        Command::Run => {
            let text = read_input(args.input.as_deref())?;
            let mut doc = CartogramDocument::from_json(&text)?;
            apply_overrides(&mut doc, &args);

            let mut quiet = NoProgress;
            let mut verbose = StderrProgress;
            let sink: &mut dyn ProgressSink = if args.progress {
                &mut verbose
            } else {
                &mut quiet
            };
            let output = run_document(&doc, sink)?;
            write_json(&output, args.pretty, args.out.as_deref())
        }
    }
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
    init_logging(args.log_level.unwrap_or(Level::WARN));

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
