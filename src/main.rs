use anyhow::{Context, Result};
use chorus_delay::{
    cli::{Cli, Command, OutputFormat},
    compiler::EventCompiler,
    config::PipelineConfig,
    ephemeris::{self, ProbeEphemeris},
    flatten::{self, AnalysisData, Component, PsdSelection},
    injection,
    models::{EventPasses, QuietTimeEvent},
    plotting::{self, DecayFit, PlotData},
    source::JsonDaySource,
    stats::AveragingMethod,
    store::ChorusStore,
};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise RUST_LOG or info
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", what, path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}: {}", what, path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to encode {}", what))?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}: {}", what, path.display()))
}

fn run_detect(config: &PipelineConfig, index: &Path, out: &Path) -> Result<()> {
    let (times, values) = injection::load_index_csv(index)?;
    info!(samples = values.len(), "loaded index series");
    let events = injection::detect(&values, &times, &config.injection)?;
    write_json(out, &events, "quiet-time events")?;
    println!("{} quiet-time events written to {}", events.len(), out.display());
    Ok(())
}

fn run_match(config: &PipelineConfig, events: &Path, ephemeris: &Path, out: &Path) -> Result<()> {
    let events: Vec<QuietTimeEvent> = read_json(events, "quiet-time events")?;
    let tracks: Vec<ProbeEphemeris> = read_json(ephemeris, "ephemerides")?;
    let matched = ephemeris::match_passes(&events, &tracks, &config.ephemeris)
        .context("Malformed ephemeris")?;
    write_json(out, &matched, "matched passes")?;
    println!(
        "{} of {} events matched to probe passes, written to {}",
        matched.len(),
        events.len(),
        out.display()
    );
    Ok(())
}

fn run_compile(
    config: &PipelineConfig,
    passes: &Path,
    data_dir: &Path,
    store_path: &Path,
    append: bool,
) -> Result<()> {
    let events: Vec<EventPasses> = read_json(passes, "matched passes")?;
    let source = JsonDaySource::new(data_dir, config.source.clone());
    let mut store = if append {
        ChorusStore::open(store_path)
    } else {
        ChorusStore::create(store_path)
    }
    .with_context(|| format!("Failed to open store: {}", store_path.display()))?;
    info!(groups = store.group_count(), append, "store ready");

    let compiler = EventCompiler::new(&source)
        .with_extraction(config.extraction)
        .with_density_gate(config.density.clone())
        .with_config(config.compile.clone());
    let summary = compiler.run(&events, &mut store);

    println!(
        "{} events written ({} measurements), {} without data, {} failed writes; store holds {} events",
        summary.events_written,
        summary.measurements,
        summary.events_empty,
        summary.write_failures,
        store.group_count()
    );
    Ok(())
}

fn run_flatten(store: &Path, out: &Path, psd: PsdSelection) -> Result<()> {
    let data = flatten::flatten_store(store, psd)?;
    data.save(out)?;
    println!("{} samples ({}) written to {}", data.len(), psd, out.display());
    Ok(())
}

#[derive(Serialize)]
struct BinReport {
    method: AveragingMethod,
    bin_size_minutes: u32,
    plot: PlotData,
    #[serde(skip_serializing_if = "Option::is_none")]
    decay: Option<DecayFit>,
}

#[allow(clippy::too_many_arguments)]
fn run_bin(
    config: &PipelineConfig,
    analysis: &Path,
    component: Component,
    method: Option<AveragingMethod>,
    bin_size: Option<u32>,
    min_samples: Option<usize>,
    slope_samples: usize,
    format: OutputFormat,
) -> Result<()> {
    let mut binning = config.binning.clone();
    if let Some(method) = method {
        binning.method = method;
    }
    if let Some(bin_size) = bin_size {
        binning.bin_size_minutes = bin_size;
    }
    if let Some(min_samples) = min_samples {
        binning.min_samples = min_samples;
    }
    binning
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid binning options: {}", e))?;

    let data = AnalysisData::load(analysis)?;
    let good_time = config.selection.mask(&data);
    let plot = plotting::plotting_data(&data, component, &good_time, &binning)
        .context("Failed to bin analysis data")?;

    let decay = if slope_samples > 0 {
        plotting::decay_fit(&plot.chorus, slope_samples).context("Failed to fit decay")?
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let report = BinReport {
                method: binning.method,
                bin_size_minutes: binning.bin_size_minutes,
                plot,
                decay,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "method: {}, bin size: {} min, samples: {}",
                binning.method,
                binning.bin_size_minutes,
                data.len()
            );
            print!("{}", plot.to_table());
            if let Some(fit) = decay {
                println!(
                    "decay: {:.4e} decades/min +/- {:.1e} over {} bins",
                    fit.slope, fit.slope_error, fit.bins
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = PipelineConfig::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Detect { index, out } => run_detect(&config, &index, &out),
        Command::Match {
            events,
            ephemeris,
            out,
        } => run_match(&config, &events, &ephemeris, &out),
        Command::Compile {
            passes,
            data_dir,
            store,
            append,
        } => run_compile(&config, &passes, &data_dir, &store, append),
        Command::Flatten { store, out, psd } => run_flatten(&store, &out, psd),
        Command::Bin {
            analysis,
            component,
            method,
            bin_size,
            min_samples,
            slope_samples,
            format,
        } => run_bin(
            &config,
            &analysis,
            component,
            method,
            bin_size,
            min_samples,
            slope_samples,
            format,
        ),
    }
}
