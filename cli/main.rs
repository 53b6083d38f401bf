#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use env_logger::Env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use genorisk::PredictionResult;
use genorisk::catalog::{self, DiseaseInfo};
use genorisk::config::ServiceConfig;
use genorisk::data::load_observations;
use genorisk::observation::FormData;
use genorisk::pipeline::Predictor;
use genorisk::store::{JsonLinesStore, PredictionStore, save_prediction};

#[derive(Parser)]
#[command(
    name = "genorisk",
    about = "Genetic disease risk prediction from routine clinical measurements",
    long_about = "Predicts the most likely of five genetic diseases from twelve clinical \
                 measurements, flags implausible entries, and grades the result into a \
                 five-level clinical risk tier."
)]
struct Cli {
    /// Optional TOML configuration file (model_path, store_path, recent_limit)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict one observation given as field=value pairs
    #[command(about = "Predict a disease and risk tier for one observation")]
    Predict(PredictArgs),

    /// Predict every row of a tab-separated file
    #[command(about = "Predict a batch of observations (outputs: predictions.tsv)")]
    Infer(InferArgs),

    /// List a user's most recent stored predictions
    #[command(about = "Show recent predictions for a user")]
    Recent(RecentArgs),

    /// List the disease catalog
    #[command(about = "List the predictable diseases")]
    Diseases,

    /// Show one catalog entry
    #[command(about = "Show details for one disease")]
    Disease {
        /// Numeric disease id, as listed by `genorisk diseases`
        id: String,
    },
}

#[derive(Args)]
struct PredictArgs {
    /// Measurements as field=value, e.g. age=45 gender=0 hemoglobin=7.2
    #[arg(value_name = "FIELD=VALUE", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,

    /// Path to the model artifact (.toml); overrides the configuration file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Prediction history file; overrides the configuration file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Store the prediction under this user id
    #[arg(long)]
    user: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InferArgs {
    /// Path to a TSV with one column per field and an optional sample_id column
    input: PathBuf,

    /// Path to the model artifact (.toml); overrides the configuration file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Where to write the predictions
    #[arg(long, default_value = "predictions.tsv")]
    output: PathBuf,
}

#[derive(Args)]
struct RecentArgs {
    #[arg(long)]
    user: String,

    /// Prediction history file; overrides the configuration file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Maximum number of predictions to list
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got '{raw}'")),
    }
}

fn load_predictor(model_path: &Path) -> Predictor {
    log::info!("Loading model from: {}", model_path.display());
    match Predictor::load(model_path) {
        Ok(predictor) => predictor,
        Err(e) => {
            // Nothing can be predicted without the model.
            eprintln!("Error: could not load model '{}': {e}", model_path.display());
            process::exit(1);
        }
    }
}

fn run_predict(args: PredictArgs, config: &ServiceConfig) -> Result<(), Box<dyn Error>> {
    let model_path = args.model.unwrap_or_else(|| config.model_path.clone());
    let predictor = load_predictor(&model_path);

    let form: FormData = args.fields.into_iter().collect();
    let result = predictor.predict_form(&form)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    let store_path = args.store.or_else(|| config.store_path.clone());
    match (store_path, args.user.as_deref()) {
        (Some(path), Some(user)) => {
            let store = JsonLinesStore::new(path);
            match save_prediction(&store, user, form, &result) {
                Ok(()) => log::info!("Prediction saved to: {}", store.path().display()),
                Err(e) => eprintln!("Could not save prediction: {e}"),
            }
        }
        (None, Some(_)) => {
            log::warn!("--user given but no prediction store configured; result not saved")
        }
        _ => {}
    }
    Ok(())
}

fn print_result(result: &PredictionResult) {
    for warning in &result.warnings {
        println!("Warning: {warning}");
    }
    for label in &result.suppressed {
        println!("Note: {label} was excluded for this subject.");
    }

    println!("Predicted disease: {}", result.label);
    println!("Probability: {:.1}%", result.probability * 100.0);
    println!(
        "Risk level: {} ({})",
        result.risk_level,
        result.risk_level.description()
    );
    if result.disease_specific_risk {
        println!("Disease-specific clinical indicators are present.");
    }

    println!("Class probabilities:");
    for (label, p) in result.probabilities.iter() {
        println!("  {:<20} {:>6.1}%", label.name(), p * 100.0);
    }

    let info = catalog::disease_info(result.label);
    println!();
    println!("About {}: {}", info.label, info.description);
}

fn run_infer(args: InferArgs, config: &ServiceConfig) -> Result<(), Box<dyn Error>> {
    let model_path = args.model.unwrap_or_else(|| config.model_path.clone());
    let predictor = load_predictor(&model_path);

    println!("Loading observations from: {}", args.input.display());
    let batch = load_observations(&args.input)?;
    println!("Loaded {} samples for prediction", batch.observations.len());

    let results = predictor.predict_samples(&batch.sample_ids, &batch.observations)?;

    save_predictions(&batch.sample_ids, &results, &args.output)?;
    println!("Predictions saved to: {}", args.output.display());
    Ok(())
}

fn save_predictions(
    sample_ids: &[String],
    results: &[PredictionResult],
    output_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(output_path)?;
    writer.write_record([
        "sample_id",
        "disease",
        "probability",
        "risk_level",
        "warnings",
    ])?;
    for (id, result) in sample_ids.iter().zip(results) {
        let probability = format!("{:.6}", result.probability);
        let warnings = result.warnings.join("; ");
        writer.write_record([
            id.as_str(),
            result.label.name(),
            probability.as_str(),
            result.risk_level.name(),
            warnings.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn run_recent(args: RecentArgs, config: &ServiceConfig) -> Result<(), Box<dyn Error>> {
    let store_path = args
        .store
        .or_else(|| config.store_path.clone())
        .ok_or("No prediction store configured. Pass --store or set store_path.")?;
    let limit = args.limit.unwrap_or(config.recent_limit);

    let store = JsonLinesStore::new(store_path);
    let records = store.recent(&args.user, limit)?;
    if records.is_empty() {
        println!("No predictions recorded for user '{}'.", args.user);
        return Ok(());
    }
    for record in records {
        println!(
            "{}\t{}\t{:.1}%\t{}",
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.disease,
            record.probability * 100.0,
            record.risk_level
        );
    }
    Ok(())
}

fn run_diseases() {
    for info in &catalog::CATALOG {
        println!(
            "{}: {} ({})",
            info.id(),
            info.label,
            info.inheritance_pattern
        );
    }
}

fn run_disease(id: &str) {
    match id.trim().parse::<usize>().ok().and_then(catalog::find) {
        Some(info) => print_disease(info),
        None => println!("Disease not found."),
    }
}

fn print_disease(info: &DiseaseInfo) {
    println!("{}", info.label);
    println!("{}", info.description);
    println!("Inheritance: {}", info.inheritance_pattern);
    println!("Genes involved: {}", info.genes_involved.join(", "));
    println!("Prevalence: {}", info.prevalence);
    println!("Symptoms: {}", info.symptoms.join(", "));
    println!("Risk factors: {}", info.risk_factors.join(", "));
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let Cli { config, command } = Cli::parse();

    let config = match ServiceConfig::load_or_default(config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let result = match command {
        Some(Commands::Predict(args)) => run_predict(args, &config),
        Some(Commands::Infer(args)) => run_infer(args, &config),
        Some(Commands::Recent(args)) => run_recent(args, &config),
        Some(Commands::Diseases) => {
            run_diseases();
            Ok(())
        }
        Some(Commands::Disease { id }) => {
            run_disease(&id);
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
