//! Race form CLI
//!
//! Predicts finishing order from driver and constructor form and reports
//! season statistics over a collected results dataset.

use clap::{Parser, Subcommand};
use raceform::{Config, Result};

#[derive(Parser)]
#[command(name = "raceform")]
#[command(about = "Motorsport race-form prediction and season insights", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Predict the finishing order of a stored race
    Predict {
        /// Season (defaults to the current year)
        #[arg(long)]
        year: Option<u16>,
        /// Round number (defaults to the season's latest race)
        #[arg(long)]
        round: Option<u32>,
        /// Rank by grid position instead of the trained model
        #[arg(long)]
        baseline: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Season statistics: champions, pole-to-win, reliability, weather
    Insights {
        /// Season (defaults to the current year)
        year: Option<u16>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Summary statistics for every stored season
    InsightsAll {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Compare predictions with recorded results for a season
    Evaluate {
        /// Season (defaults to the current year)
        #[arg(long)]
        year: Option<u16>,
        /// Rank by grid position instead of the trained model
        #[arg(long)]
        baseline: bool,
    },
    /// Export labelled feature vectors for the offline trainer
    ExportTraining {
        /// Output CSV path
        #[arg(long)]
        output: String,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Show dataset status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Predict {
            year,
            round,
            baseline,
            format,
        } => commands::predict(&config, year, round, baseline, format),
        Commands::Insights { year, format } => commands::insights(&config, year, format),
        Commands::InsightsAll { format } => commands::insights_all(&config, format),
        Commands::Evaluate { year, baseline } => commands::evaluate(&config, year, baseline),
        Commands::ExportTraining { output } => commands::export_training(&config, &output),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::sync::Arc;

    use chrono::Datelike;
    use raceform::data::{CsvEntrySource, IngestReport, TrainingSet};
    use raceform::insights::{all_seasons, SeasonInsights};
    use raceform::predict::{
        format_prediction, load_model, GridOrderModel, PositionModel, RaceContext, RacePredictor,
    };

    fn current_year() -> u16 {
        chrono::Local::now().year() as u16
    }

    fn load_context(config: &Config) -> Result<(RaceContext, IngestReport)> {
        let source = CsvEntrySource::new(&config.data.dataset_path);
        RaceContext::load(&source, config)
    }

    fn load_predictor(
        config: &Config,
        context: RaceContext,
        baseline: bool,
    ) -> Result<RacePredictor> {
        let model: Arc<dyn PositionModel> = if baseline {
            Arc::new(GridOrderModel)
        } else {
            Arc::new(load_model(&config.data.model_path)?)
        };
        Ok(RacePredictor::new(context, model))
    }

    fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn show(value: Option<f64>, suffix: &str) -> String {
        value.map_or("n/a".to_string(), |v| format!("{:.1}{}", v, suffix))
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Place the results CSV at {}", config.data.dataset_path);
        println!("  3. Run 'raceform data status' to check the dataset");
        println!("  4. Run 'raceform predict --year 2024' to rank the latest race");

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let (context, report) = load_context(config)?;
        let store = &context.store;
        let form = context.form.config();

        println!("Dataset Status");
        println!("───────────────────────────────");
        println!("  Path:       {}", config.data.dataset_path);
        println!("  Entries:    {}", store.len());
        println!("  Replaced:   {}", report.replaced);
        println!("  Duplicates: {}", report.duplicates_skipped);
        println!("  Malformed:  {}", report.malformed.len());
        println!(
            "  Form:       window {}, min {} ({} series)",
            form.window,
            form.min_periods,
            context.form.len()
        );

        let seasons = store.seasons();
        if let (Some(first), Some(last)) = (seasons.first(), seasons.last()) {
            println!("  Seasons:    {} to {}", first, last);
        }
        for year in &seasons {
            println!(
                "    {}: {} races, {} entries",
                year,
                store.rounds(*year).len(),
                store.season(*year).len()
            );
        }
        for row in report.malformed.iter().take(5) {
            println!("  Skipped line {}: {}", row.line, row.reason);
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        year: Option<u16>,
        round: Option<u32>,
        baseline: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let year = year.unwrap_or_else(current_year);
        let (context, _) = load_context(config)?;
        let predictor = load_predictor(config, context, baseline)?;

        let race = match round {
            Some(round) => predictor.predict_race(year, round)?,
            None => predictor.predict_latest(year)?,
        };

        match format {
            OutputFormat::Table => print!("{}", format_prediction(&race)),
            OutputFormat::Json => print_json(&race)?,
        }
        Ok(())
    }

    fn print_insights(insights: &SeasonInsights) {
        println!("\n{} Season Insights", insights.year);
        println!("───────────────────────────────────────────");
        println!(
            "  Races:                {} ({} entries)",
            insights.races, insights.entries
        );
        println!(
            "  Champion:             {} ({}) {} pts",
            insights.champion.driver, insights.champion.constructor, insights.champion.points
        );
        println!(
            "  Constructor champion: {} {} pts",
            insights.constructor_champion.constructor, insights.constructor_champion.points
        );
        println!(
            "  Pole-to-win:          {:.1}% of {} won races",
            insights.pole_to_win_rate, insights.races_with_winner
        );
        println!("  DNF rate:             {:.1}%", insights.dnf_rate);
        if let Some(leader) = &insights.overtaking_leader {
            println!(
                "  Overtaking leader:    {} ({:+} places)",
                leader.driver, leader.positions_gained
            );
        }
        if let Some(leader) = &insights.consistency_leader {
            println!(
                "  Most top-10 finishes: {} ({})",
                leader.driver, leader.top_ten_finishes
            );
        }
        println!(
            "  Avg track temp:       {}",
            show(insights.weather.average_track_temp, "°C")
        );
        println!("  Rainy races:          {}", insights.weather.rainy_races);
        println!(
            "  DNF rate dry / wet:   {} / {}",
            show(insights.rain_impact.dry_dnf_rate, "%"),
            show(insights.rain_impact.wet_dnf_rate, "%")
        );

        if !insights.winning_grid_positions.is_empty() {
            println!("\n  Wins by grid slot:");
            for slot in &insights.winning_grid_positions {
                let grid = slot
                    .grid_position
                    .map_or("pit lane".to_string(), |g| format!("P{}", g));
                println!("    {:<9} {}", grid, slot.wins);
            }
        }

        println!("\n  Standings:");
        for (i, standing) in insights.driver_standings.iter().take(10).enumerate() {
            println!(
                "    {:>2}. {:<6} {:<24} {:>6}",
                i + 1,
                standing.driver.as_str(),
                standing.constructor.as_str(),
                standing.points
            );
        }
    }

    pub fn insights(config: &Config, year: Option<u16>, format: OutputFormat) -> Result<()> {
        let year = year.unwrap_or_else(current_year);
        let (context, _) = load_context(config)?;
        let insights = SeasonInsights::for_season(&context.store, year)?;

        match format {
            OutputFormat::Table => print_insights(&insights),
            OutputFormat::Json => print_json(&insights)?,
        }
        Ok(())
    }

    pub fn insights_all(config: &Config, format: OutputFormat) -> Result<()> {
        let (context, _) = load_context(config)?;
        let seasons = all_seasons(&context.store);

        match format {
            OutputFormat::Table => {
                println!(
                    "\n{:<6} {:>5} {:<8} {:>7} {:<24} {:>7} {:>6} {:>5}",
                    "Year", "Races", "Champion", "Points", "Constructor", "Pole%", "DNF%", "Wet"
                );
                println!("{}", "─".repeat(76));
                for s in &seasons {
                    println!(
                        "{:<6} {:>5} {:<8} {:>7} {:<24} {:>7.1} {:>6.1} {:>5}",
                        s.year,
                        s.races,
                        s.champion.driver.as_str(),
                        s.champion.points,
                        s.constructor_champion.constructor.as_str(),
                        s.pole_to_win_rate,
                        s.dnf_rate,
                        s.weather.rainy_races
                    );
                }
            }
            OutputFormat::Json => print_json(&seasons)?,
        }
        Ok(())
    }

    pub fn evaluate(config: &Config, year: Option<u16>, baseline: bool) -> Result<()> {
        let year = year.unwrap_or_else(current_year);
        let (context, _) = load_context(config)?;
        let predictor = load_predictor(config, context, baseline)?;

        let quality = predictor.evaluate_season(year)?;

        println!("\n{} Prediction Quality", year);
        println!("───────────────────────────────");
        println!("  Classified entrants: {}", quality.samples);
        println!("  Score MAE:           {}", show(quality.mae, ""));
        println!(
            "  Score R²:            {}",
            quality.r2.map_or("n/a".to_string(), |v| format!("{:.3}", v))
        );
        println!("  Rank MAE:            {}", show(quality.rank_mae, ""));
        println!("  Exact ranks:         {}", quality.exact_hits);
        Ok(())
    }

    pub fn export_training(config: &Config, output: &str) -> Result<()> {
        let (context, _) = load_context(config)?;
        let set = TrainingSet::from_store(&context.store, &context.form, context.features);
        let (train, test, kind) = set.split(&config.training);

        set.write_csv(output)?;
        println!("Exported {} samples to {}", set.len(), output);
        println!(
            "  Split {:?}: train={}, test={}",
            kind,
            train.len(),
            test.len()
        );
        Ok(())
    }
}
