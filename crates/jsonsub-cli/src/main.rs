use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use jsonsub_engine::{check_subsumption, CheckOptions, SubsumptionResult};

const EXIT_COMPATIBLE: u8 = 0;
const EXIT_INCOMPATIBLE: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "jsonsub")]
#[command(about = "Decide JSON Schema subsumption: is every producer value accepted by the consumer?")]
#[command(version)]
struct Cli {
    /// Path to the producer JSON schema file
    producer_file: PathBuf,

    /// Path to the consumer JSON schema file
    consumer_file: PathBuf,

    /// Bound on array reasoning
    #[arg(long, default_value_t = 8)]
    max_array_length: i64,

    /// Bound on subschema nesting during compilation
    #[arg(long, default_value_t = 32)]
    max_recursion_depth: usize,

    /// Solver budget in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Strategy for $ref: only `unfold` (acyclic schemas) is supported
    #[arg(long, default_value = "unfold")]
    ref_resolution: String,

    /// Output format: pretty | json | minimal
    #[arg(long, default_value = "pretty")]
    output_format: String,

    /// Save the counterexample to a file
    #[arg(long)]
    counterexample_file: Option<PathBuf>,

    /// Skip the labeled evaluation and minimization pass
    #[arg(long, default_value_t = false)]
    no_explanations: bool,

    /// Verbose progress output
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
    Minimal,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(report) => {
            eprintln!("Error: {report:?}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: &Cli) -> miette::Result<u8> {
    let format = parse_output_format(&cli.output_format)?;
    if cli.ref_resolution != "unfold" {
        return Err(miette::miette!(
            "unsupported --ref-resolution `{}`; only `unfold` is available",
            cli.ref_resolution
        ));
    }

    let producer = load_schema(&cli.producer_file)?;
    let consumer = load_schema(&cli.consumer_file)?;
    if cli.verbose {
        eprintln!("Loaded producer schema from {}", cli.producer_file.display());
        eprintln!("Loaded consumer schema from {}", cli.consumer_file.display());
    }

    let options = CheckOptions {
        max_array_len: cli.max_array_length,
        max_recursion_depth: cli.max_recursion_depth,
        timeout_secs: cli.timeout,
        explanations: !cli.no_explanations,
        ..CheckOptions::default()
    };
    let result = check_subsumption(&producer, &consumer, &options);

    if let Some(error) = &result.error {
        // Errors go to stderr regardless of output format; no verdict is
        // claimed.
        eprintln!("Error: {error}");
        if result.requires_simulation {
            eprintln!("Hint: recursive schemas need a simulation-based resolution strategy.");
        }
        return Ok(EXIT_ERROR);
    }

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Minimal => print_minimal(&result),
        OutputFormat::Pretty => print_pretty(&result, cli.verbose),
    }

    if let (Some(path), Some(witness)) = (&cli.counterexample_file, &result.counterexample) {
        fs::write(path, serde_json::to_string_pretty(witness).into_diagnostic()?)
            .into_diagnostic()?;
        if cli.verbose {
            eprintln!("Counterexample saved to {}", path.display());
        }
    }

    Ok(if result.compatible {
        EXIT_COMPATIBLE
    } else {
        EXIT_INCOMPATIBLE
    })
}

fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "pretty" => Ok(OutputFormat::Pretty),
        "json" => Ok(OutputFormat::Json),
        "minimal" => Ok(OutputFormat::Minimal),
        other => Err(miette::miette!(
            "unknown --output-format `{other}`; expected pretty, json, or minimal"
        )),
    }
}

fn load_schema(path: &PathBuf) -> miette::Result<Value> {
    let raw = fs::read_to_string(path)
        .map_err(|e| miette::miette!("cannot read schema file {}: {e}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| miette::miette!("invalid JSON in schema file {}: {e}", path.display()))
}

fn print_json(result: &SubsumptionResult) {
    let mut out = json!({
        "compatible": result.compatible,
        "counterexample": result.counterexample.clone().unwrap_or(Value::Null),
        "solver_time": result.solver_time_seconds,
    });
    let object = out.as_object_mut().expect("output is an object");
    if let Some(explanation) = &result.explanation {
        object.insert("explanation".to_string(), json!(explanation));
    }
    if !result.failed_constraints.is_empty() {
        object.insert(
            "failed_constraints".to_string(),
            json!(result.failed_constraints),
        );
    }
    if !result.recommendations.is_empty() {
        object.insert(
            "recommendations".to_string(),
            json!(result.recommendations),
        );
    }
    println!("{}", serde_json::to_string_pretty(&out).expect("serializable output"));
}

fn print_minimal(result: &SubsumptionResult) {
    if result.compatible {
        println!("compatible");
    } else {
        println!("incompatible");
        if let Some(witness) = &result.counterexample {
            println!("{witness}");
        }
    }
}

fn print_pretty(result: &SubsumptionResult, verbose: bool) {
    if result.compatible {
        println!("✓ Schemas are compatible");
        println!("Producer schema ⊆ Consumer schema");
    } else {
        println!("✗ Schemas are incompatible");
        if let Some(witness) = &result.counterexample {
            println!("Counterexample (accepted by producer, rejected by consumer):");
            println!(
                "{}",
                serde_json::to_string_pretty(witness).expect("serializable witness")
            );
        }
        if let Some(explanation) = &result.explanation {
            println!();
            println!("Explanation: {explanation}");
        }
        if !result.failed_constraints.is_empty() {
            println!();
            println!("Failed consumer constraints:");
            for constraint in &result.failed_constraints {
                println!("  - {constraint}");
            }
        }
        if !result.recommendations.is_empty() {
            println!();
            println!("Recommendations:");
            for rec in &result.recommendations {
                println!("  - {rec}");
            }
        }
    }
    if verbose {
        println!();
        println!("Solver time: {:.3}s", result.solver_time_seconds);
    }
}
