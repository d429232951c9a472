//! Admission risk CLI Module
//!
//! Command-line interface for serving, offline scoring and inspecting the
//! feature transform of an admission export.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::preprocessing::{schema, FeatureTransformer};
use crate::service::PredictionService;
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "admit-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Admission risk scoring service")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the prediction server
    Serve {
        /// Server port (overrides API_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// XGBoost JSON model (overrides MODEL_PATH)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Frozen feature parameters (overrides FEATURE_PARAMS_PATH)
        #[arg(long)]
        feature_params: Option<PathBuf>,
    },

    /// Score a file offline and write the annotated workbook
    Predict {
        /// XGBoost JSON model
        #[arg(short, long)]
        model: PathBuf,

        /// Input data file (CSV, XLSX or XLS)
        #[arg(short, long)]
        data: PathBuf,

        /// Output workbook
        #[arg(short, long, default_value = "predictions.xlsx")]
        output: PathBuf,

        /// Frozen feature parameters
        #[arg(long)]
        feature_params: Option<PathBuf>,
    },

    /// Show the feature table and the encoder/scaler fitted on a file
    Inspect {
        /// Input data file (CSV, XLSX or XLS)
        #[arg(short, long)]
        data: PathBuf,

        /// Write the fitted parameters as a frozen parameter file
        #[arg(long)]
        params_out: Option<PathBuf>,
    },
}

// ─── Predict ───────────────────────────────────────────────────────────────────

pub fn cmd_predict(
    model_path: &Path,
    data_path: &Path,
    output: &Path,
    params_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let service = PredictionService::load(model_path, params_path)?;
    step_done(&format!(
        "{} trees, {}",
        service.model().n_trees(),
        service.model().objective().as_str()
    ));

    step_run("Loading data");
    let df = service.loader().load_path(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Scoring");
    let start = Instant::now();
    let result = service.run_frame(df)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output.display()));
    std::fs::write(output, &result.workbook)?;
    step_done(&format!("{} bytes", result.workbook.len()));

    println!();
    step_ok(&format!(
        "{} of {} rows predicted positive",
        result.positives.to_string().white().bold(),
        result.rows
    ));
    println!();
    Ok(())
}

// ─── Inspect ───────────────────────────────────────────────────────────────────

pub fn cmd_inspect(data_path: &Path, params_out: Option<&Path>) -> anyhow::Result<()> {
    section("Inspect");

    step_run("Loading data");
    let df = DataLoader::new().load_path(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Building features");
    let (features, params) = FeatureTransformer::per_batch().transform_with_params(&df)?;
    step_done(&format!("{} rows × {} cols", features.height(), features.width()));

    section("Features");
    println!("  {:<22} {:<10} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(40)));
    for col in features.get_columns() {
        println!(
            "  {:<22} {:<10} {:>6}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
        );
    }

    section("Label encoder");
    for column in schema::CATEGORICAL_COLUMNS {
        let classes = params.encoder.classes(column).unwrap_or_default();
        println!("  {:<22} {}", muted(column), classes.join(", "));
    }

    section("Min-max scaler");
    for column in schema::SCALED_COLUMNS {
        if let Some(p) = params.scaler.params(column) {
            println!("  {:<22} min {:<12} max {}", muted(column), p.min, p.max);
        }
    }

    if let Some(path) = params_out {
        println!();
        step_run(&format!("Saving → {}", path.display()));
        std::fs::write(path, params.to_json()?)?;
        step_done("frozen feature parameters");
    }

    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    model: Option<PathBuf>,
    feature_params: Option<PathBuf>,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(model) = model {
        config.model_path = model;
    }
    if feature_params.is_some() {
        config.feature_params_path = feature_params;
    }

    let base = format!("http://{}:{}", config.host, config.port);

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Admission Risk".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Predict", &format!("{}/predict/", base)));
    line_box(&kv("Health ", &format!("{}/health", base)));
    line_box(&kv("Model  ", &config.model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["admit-risk"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_predict_default_output() {
        let cli = Cli::try_parse_from(["admit-risk", "predict", "-m", "model.json", "-d", "in.csv"]).unwrap();
        match cli.command {
            Some(Commands::Predict { output, feature_params, .. }) => {
                assert_eq!(output, PathBuf::from("predictions.xlsx"));
                assert!(feature_params.is_none());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }
}
