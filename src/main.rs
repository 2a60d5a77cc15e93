use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};

mod error;
mod features;
mod linalg;
mod models;
mod predictor;
mod report;
mod request;
mod sight;
mod store;

use models::{Season, Units};
use predictor::{FitOptions, Predictor};
use report::Grouping;
use request::{NewScoreRequest, PredictionRequest};
use store::RecordStore;

#[derive(Parser)]
#[command(name = "archery-tracker")]
#[command(about = "Archery score log with trend summaries and score prediction", long_about = None)]
struct Cli {
    /// Directory holding the season score files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Year whose season files are read and written
    #[arg(long, global = true)]
    year: Option<i32>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the average arrow score and gold percentage on a future date
    Predict {
        #[arg(long, value_enum, default_value = "outdoors")]
        season: Season,
        #[arg(long)]
        distance: u32,
        #[arg(long, value_enum, default_value = "yds")]
        units: Units,
        /// Date of the session to predict (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        comp: bool,
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
        #[arg(long, default_value_t = 864)]
        seed: u64,
        /// Fail when a training or test split has no competition sessions
        #[arg(long)]
        require_comp_data: bool,
        #[arg(long)]
        json: bool,
    },
    /// Append a new session to a season file
    AddScore {
        #[arg(long, value_enum, default_value = "outdoors")]
        season: Season,
        #[arg(long)]
        arrow_average: f64,
        #[arg(long)]
        distance: u32,
        #[arg(long, value_enum, default_value = "yds")]
        units: Units,
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        golds: u32,
        #[arg(long)]
        total_arrows: u32,
        #[arg(long)]
        comp: bool,
        /// Create the data directory if it does not exist
        #[arg(long)]
        create_dirs: bool,
    },
    /// List a season's sessions by distance, best average first
    Results {
        #[arg(value_enum)]
        season: Season,
    },
    /// Print one grouped summary
    Summarize {
        #[arg(long, value_enum, default_value = "outdoors")]
        season: Season,
        #[arg(long, value_enum)]
        by: Grouping,
    },
    /// Generate a markdown report of every grouping
    Report {
        #[arg(long, value_enum, default_value = "outdoors")]
        season: Season,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Estimate sight marks for standard distances
    SightMarks {
        /// Defaults to sight_marks.csv in the data directory
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let today = Utc::now().date_naive();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => std::env::var("ARCHERY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static")),
    };
    let store = RecordStore::new(&data_dir, cli.year.unwrap_or(today.year()));

    match cli.command {
        Commands::Predict {
            season,
            distance,
            units,
            date,
            comp,
            test_fraction,
            seed,
            require_comp_data,
            json,
        } => {
            let records = store
                .load(season)
                .with_context(|| format!("failed to load {season} scores for {}", store.year()))?;
            let set = features::derive(&records)?;
            let options = FitOptions {
                test_fraction,
                seed,
                require_comp_data,
            };
            let predictor =
                Predictor::build(&set, &options).context("failed to fit the score model")?;
            let fit = predictor.report();
            log::debug!(
                "coefficients {:?}, intercept {:?}",
                predictor.model().coefficients(),
                predictor.model().intercept()
            );
            println!(
                "Model fitted on {} sessions (train score {}, test score {} on {} held out).",
                fit.train_len,
                predictor::format_score(fit.train_score),
                predictor::format_score(fit.test_score),
                fit.test_len
            );
            println!("Most recent entry: {}", predictor.last_entry().format("%Y-%m-%d"));

            let prediction = PredictionRequest {
                season,
                distance,
                units,
                target_date: date.unwrap_or(today),
                is_comp: comp,
            };
            let response = request::handle_prediction(&predictor, &prediction)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{response}");
            }
        }
        Commands::AddScore {
            season,
            arrow_average,
            distance,
            units,
            date,
            golds,
            total_arrows,
            comp,
            create_dirs,
        } => {
            let submission = NewScoreRequest {
                season,
                arrow_average,
                distance,
                units,
                date: date.unwrap_or(today),
                golds,
                total_arrows,
                is_comp: comp,
            };
            let path = request::handle_new_score(&store, &submission, create_dirs)
                .context("failed to record the new score")?;
            println!("Score added to {}.", path.display());
        }
        Commands::Results { season } => {
            let records = store
                .load(season)
                .with_context(|| format!("failed to load {season} scores for {}", store.year()))?;
            if records.is_empty() {
                println!("No {season} sessions recorded for {}.", store.year());
                return Ok(());
            }

            println!("{} results for {}:", season.title(), store.year());
            for record in store::sorted_for_display(&records) {
                println!(
                    "- {:.2} yds on {}: avg {:.2}, {}/{} golds{}",
                    record.distance,
                    record.date,
                    record.arrow_average,
                    record.golds,
                    record.arrows,
                    if record.is_comp { " (competition)" } else { "" }
                );
            }
        }
        Commands::Summarize { season, by } => {
            let records = store
                .load(season)
                .with_context(|| format!("failed to load {season} scores for {}", store.year()))?;
            let summaries = report::summarize(&records, by)?;

            println!("Score data grouped by {}:", by.title());
            for summary in summaries {
                println!(
                    "- {}: avg {:.3}, {:.1} arrows, {:.2}% golds across {} sessions",
                    summary.key,
                    summary.mean_arrow_average,
                    summary.mean_arrows,
                    summary.mean_golds_pct,
                    summary.count
                );
            }
        }
        Commands::Report { season, out } => {
            let records = store
                .load(season)
                .with_context(|| format!("failed to load {season} scores for {}", store.year()))?;
            let report = report::build_report(season, store.year(), &records)?;
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::SightMarks { csv } => {
            let path = csv.unwrap_or_else(|| data_dir.join("sight_marks.csv"));
            let marks = sight::load_marks(&path)?;
            let model = sight::SightModel::fit(&marks)?;
            print!("{}", sight::render_ladders(&model));
        }
    }

    Ok(())
}
