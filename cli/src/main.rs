use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rangeslider::config::SliderConfig;
use rangeslider::engine::{Action, SliderCore};
use rangeslider::error::ConfigError;
use rangeslider::input::PointerEvent;
use rangeslider::range::RangeModel;
use rangeslider::render::TextRenderer;
use serde_json::json;
use tracing_subscriber::fmt::MakeWriter;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid event on line {line}: {source}")]
    Event { line: usize, source: serde_json::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("failed to install logger: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),
}

#[derive(Parser, Debug)]
#[command(name = "rangeslider", about = "Drive a range slider from recorded pointer events")]
struct Cli {
    /// Number of cells in the rendered text gauge.
    #[arg(long, env = "RANGESLIDER_GAUGE_WIDTH", default_value_t = 40)]
    gauge_width: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a pointer-event script through a slider and print every value change.
    Replay {
        /// Slider options as JSON.
        #[arg(long, env = "RANGESLIDER_CONFIG")]
        config: PathBuf,
        /// Pointer events, one JSON object per line or a single JSON array.
        #[arg(long)]
        script: PathBuf,
        /// Override the track width carried by every move event.
        #[arg(long, env = "RANGESLIDER_TRACK_WIDTH")]
        track_width: Option<f64>,
    },
    /// Snap a raw value onto a step grid.
    Snap {
        #[arg(long)]
        min: f64,
        #[arg(long)]
        max: f64,
        #[arg(long, default_value_t = 1.0)]
        step: f64,
        #[arg(allow_hyphen_values = true)]
        raw: f64,
    },
    /// Print the initial rendering of a slider.
    Render {
        #[arg(long, env = "RANGESLIDER_CONFIG")]
        config: PathBuf,
    },
}

fn main() -> Result<(), CliError> {
    tracing::subscriber::set_global_default(log_subscriber(std::io::stderr))?;
    let cli = Cli::parse();
    let renderer = TextRenderer::new(cli.gauge_width);

    match cli.command {
        Command::Replay { config, script, track_width } => {
            let mut core = SliderCore::new(load_config(&config)?)?;
            let events = parse_script(&read(&script)?)?;
            for line in replay(&mut core, &events, track_width) {
                println!("{line}");
            }
            println!("{}", core.render(&renderer));
        }
        Command::Snap { min, max, step, raw } => {
            let model = RangeModel::new(min, max, step)?;
            println!("{}", model.snap_to_step(raw));
        }
        Command::Render { config } => {
            let core = SliderCore::new(load_config(&config)?)?;
            println!("{}", core.render(&renderer));
        }
    }
    Ok(())
}

/// Log formatter writing to `writer`. stdout is reserved for command output.
fn log_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt().with_writer(writer).finish()
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_owned(), source })
}

fn load_config(path: &Path) -> Result<SliderConfig, CliError> {
    Ok(SliderConfig::from_json(&read(path)?)?)
}

/// Parse a script: a JSON array of events, or one event per non-empty line.
fn parse_script(text: &str) -> Result<Vec<PointerEvent>, CliError> {
    if text.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line.trim()).map_err(|source| CliError::Event { line: n + 1, source })
        })
        .collect()
}

/// Run `events` through `core`, returning one JSON line per value change.
fn replay(core: &mut SliderCore, events: &[PointerEvent], track_width: Option<f64>) -> Vec<String> {
    let mut out = Vec::new();
    for (index, event) in events.iter().enumerate() {
        let event = match (*event, track_width) {
            (PointerEvent::Move { x, .. }, Some(width)) => PointerEvent::Move { x, track_width: width },
            (event, _) => event,
        };
        tracing::debug!(index, ?event, "replaying");
        for action in core.handle(event) {
            if let Action::ValueChanged(value) = action {
                out.push(json!({ "event": index, "value": value }).to_string());
            }
        }
    }
    out
}
