use anyhow::Result;
use clap::Parser;
use lectograph::analysis::DeepAnalyzer;
use lectograph::audio::{ActivitySignal, Waveform};
use lectograph::cli::{Cli, Commands};
use lectograph::config::Config;
use lectograph::markers::MarkerCatalog;
use lectograph::model::RelationType;
use lectograph::pipeline::Pipeline;
use lectograph::relations::Reconstructor;
use lectograph::resegment::Resegmenter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Some(Commands::Markers) => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            print_markers(&config.marker_catalog()?);
        }
        Some(Commands::CheckConfig) => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            println!("{config:#?}");
        }
        None => {
            run_pipeline(cli).await?;
        }
    }

    Ok(())
}

fn init_logging(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lectograph={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_pipeline(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(language) = cli.language {
        config.transcription.language_hint = language;
    }

    let (waveform, source_ref) = match &cli.input {
        Some(path) => (Waveform::load(path)?, path.display().to_string()),
        None => (
            Waveform::from_reader(Box::new(std::io::stdin()))?,
            "stdin".to_string(),
        ),
    };
    let activity = ActivitySignal::from_rms(
        &waveform.samples,
        config.audio.frame_samples,
        config.audio.activity_threshold,
    );

    let stt = config.transcriber()?;
    let resegmenter = Resegmenter::with_config(config.marker_catalog()?, config.resegmenter_config());
    let reconstructor = if cli.no_oracle {
        Reconstructor::<Box<dyn DeepAnalyzer>>::without_oracle()
    } else {
        match config.oracle_client()? {
            Some(oracle) => Reconstructor::new(oracle),
            None => Reconstructor::without_oracle(),
        }
    }
    .with_config(config.reconstructor_config());

    let pipeline =
        Pipeline::new(stt, resegmenter, reconstructor).with_config(config.pipeline_config());
    let document = pipeline
        .run(&source_ref, &waveform.samples, waveform.sample_rate, &activity)
        .await?;

    let json = serde_json::to_string_pretty(&document)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn print_markers(catalog: &MarkerCatalog) {
    for category in RelationType::ALL {
        let keywords: Vec<&str> = catalog.keywords(category).collect();
        if keywords.is_empty() {
            continue;
        }
        println!("{category}: {}", keywords.join(" "));
    }
}
