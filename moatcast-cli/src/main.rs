//! MoatCast CLI: forecast, validate and init-config commands.
//!
//! Commands:
//! - `forecast`: load the two CSV tables, run both stages and export artifacts
//! - `validate`: parse and check a TOML pipeline config
//! - `init-config`: write the default config as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use moatcast_runner::{load_tables, run_pipeline, write_artifacts, PipelineConfig, PipelineOutput};

#[derive(Parser)]
#[command(
    name = "moatcast",
    about = "MoatCast: two-stage fundamentals-driven price forecaster"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on a fundamentals table and a market table.
    Forecast {
        /// Quarterly fundamentals CSV (Year, Quarter, indicator columns).
        #[arg(long)]
        fundamentals: PathBuf,

        /// Daily market CSV (date, price and volume columns).
        #[arg(long)]
        market: PathBuf,

        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory receiving the exported artifacts.
        #[arg(long, default_value = "forecast")]
        output_dir: PathBuf,
    },
    /// Parse and validate a TOML config, printing its run id.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
    /// Write the default config as TOML.
    InitConfig {
        /// Destination file. Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Forecast {
            fundamentals,
            market,
            config,
            output_dir,
        } => run_forecast(&fundamentals, &market, config.as_deref(), &output_dir),
        Commands::Validate { config } => run_validate(&config),
        Commands::InitConfig { output, force } => run_init_config(output.as_deref(), force),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn run_forecast(
    fundamentals: &Path,
    market: &Path,
    config_path: Option<&Path>,
    output_dir: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let tables = load_tables(fundamentals, market, &config.data)?;
    if tables.fundamentals_dropped > 0 || tables.market_dropped > 0 {
        tracing::warn!(
            fundamentals = tables.fundamentals_dropped,
            market = tables.market_dropped,
            "rows without a usable date were dropped"
        );
    }

    let output = run_pipeline(&tables.fundamentals, &tables.market, &config)?;
    print_summary(&output);

    let written = write_artifacts(output_dir, &output, &config)?;
    println!(
        "Artifacts saved to: {} ({} files)",
        output_dir.display(),
        written.len()
    );
    Ok(())
}

fn run_validate(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    println!("Config OK: {}", path.display());
    println!("  Run id:     {}", config.run_id()?);
    println!("  Indicators: {}", config.data.indicators.join(", "));
    println!("  Horizon:    {} quarters", config.forecast.horizon);
    Ok(())
}

fn run_init_config(output: Option<&Path>, force: bool) -> Result<()> {
    let text = PipelineConfig::default().to_toml()?;
    match output {
        None => print!("{text}"),
        Some(path) => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (pass --force to overwrite)", path.display());
            }
            std::fs::write(path, text)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Default config written to: {}", path.display());
        }
    }
    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    println!();
    println!("=== Forecast ===");
    println!("  Run id:             {}", output.run_id);
    println!(
        "  Rows:               {} fundamentals, {} market, {} aligned, {} feature",
        output.counts.fundamentals,
        output.counts.market,
        output.counts.aligned,
        output.counts.feature_rows
    );
    if !output.excluded_indicators.is_empty() {
        println!(
            "  Excluded:           {}",
            output.excluded_indicators.join(", ")
        );
    }

    let kpi = &output.indicator_forecasts;
    for step in &kpi.steps {
        let values: Vec<String> = kpi
            .indicators
            .iter()
            .zip(&step.values)
            .map(|(name, v)| match v {
                Some(v) => format!("{name}={v:.2}"),
                None => format!("{name}=n/a"),
            })
            .collect();
        println!("  Q+{} {}:      {}", step.step, step.date, values.join(", "));
    }

    println!("  Last realized:      {:.2}", output.last_realized_price);
    println!(
        "  Predicted price:    {:.2} on {}",
        output.price_forecast.predicted_price, output.price_forecast.date
    );

    if let Some(b) = &output.baseline {
        println!();
        println!(
            "=== Baseline ({} train / {} test) ===",
            b.train_rows, b.test_rows
        );
        for s in &b.scores {
            let r2 = s
                .r_squared
                .map(|r| format!("{r:.4}"))
                .unwrap_or_else(|| "n/a".into());
            println!(
                "  {:<20} MAE {:>10.4}  R² {}",
                s.model_name, s.mean_absolute_error, r2
            );
        }
        println!(
            "  Reference forecast: {:.2} on {}",
            b.reference_forecast.predicted_price, b.reference_forecast.date
        );
    }
    println!();
}
