//! Design-by-contract CLI.
//!
//! Provides the `deal` binary for working with contract manifests:
//! - `lint` parses every contract and checks the variables it references;
//! - `contracts` prints the merged contract sets of a method;
//! - `verify` replays a recorded invocation through the contract checkers.
//!
//! Uses the same `Weaver` as library callers, so a replayed invocation is
//! checked exactly as a live one would be.

mod lint;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use deal_check::contracts::fetch::{fetch_all_contracts, fetch_class_invariants, fetch_contract_levels};
use deal_check::{CheckerConfig, ContractError, ContractViolation, MethodError, Reporting, Weaver};
use deal_core::value::CLASS_KEY;
use deal_core::{ClassRegistry, ContractDecl, ContractKind, Manifest, MetadataReader, Value};

/// Design-by-contract checking for class hierarchies.
#[derive(Parser)]
#[command(name = "deal", about = "Design-by-contract checking for class hierarchies")]
struct Cli {
    /// Log contract resolution at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Parse and check every contract in a manifest.
    Lint {
        /// Path to the JSON manifest.
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Print the merged contracts of a method as JSON.
    Contracts {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Class the method is called on.
        #[arg(short, long)]
        class: String,

        /// Method name.
        #[arg(short = 'M', long)]
        method: String,
    },

    /// Replay a recorded invocation and check its contracts.
    Verify {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to the recorded invocation (JSON).
        #[arg(short, long)]
        invocation: PathBuf,

        /// Stop at the first violation or report all of them.
        #[arg(short, long, value_enum, default_value = "first")]
        report: ReportMode,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportMode {
    First,
    All,
}

impl From<ReportMode> for Reporting {
    fn from(mode: ReportMode) -> Self {
        match mode {
            ReportMode::First => Reporting::FirstFailure,
            ReportMode::All => Reporting::AllFailures,
        }
    }
}

/// A method call captured from a running program.
///
/// `this` is the receiver before the call and `after` the receiver once it
/// returned. Objects name their class with an `@class` key. A recorded
/// `error` replays as a failure of the method itself.
#[derive(Debug, Deserialize)]
struct RecordedInvocation {
    class: String,
    method: String,
    #[serde(default)]
    this: Option<serde_json::Value>,
    #[serde(default)]
    after: Option<serde_json::Value>,
    #[serde(default)]
    arguments: Vec<serde_json::Value>,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Lint { manifest } => run_lint(&manifest),
        Commands::Contracts {
            manifest,
            class,
            method,
        } => run_contracts(&manifest, &class, &method),
        Commands::Verify {
            manifest,
            invocation,
            report,
        } => run_verify(&manifest, &invocation, report.into()),
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Loads a manifest and builds its registry; on failure prints the error and
/// returns exit code 3.
fn load_registry(path: &Path) -> Result<ClassRegistry, i32> {
    Manifest::from_path(path)
        .and_then(|manifest| manifest.build_registry())
        .map_err(|e| {
            eprintln!("Error: failed to load manifest '{}': {}", path.display(), e);
            3
        })
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize report: {}\"}}", e));
    println!("{}", json);
}

/// Execute the lint subcommand.
///
/// Returns exit code: 0 = clean, 2 = diagnostics found, 3 = I/O or manifest
/// error.
fn run_lint(manifest: &Path) -> i32 {
    let registry = match load_registry(manifest) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let summary = match lint::lint_registry(&registry) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };

    if summary.diagnostics.is_empty() {
        println!(
            "ok: {} contract(s) in {} class(es)",
            summary.contracts, summary.classes
        );
        return 0;
    }
    for diagnostic in &summary.diagnostics {
        println!("{}", diagnostic);
    }
    eprintln!(
        "{} problem(s) in {} contract(s)",
        summary.diagnostics.len(),
        summary.contracts
    );
    2
}

fn decl_json(decl: &ContractDecl) -> serde_json::Value {
    json!({
        "expression": decl.expression,
        "declared_in": decl.location(),
    })
}

/// Execute the contracts subcommand.
///
/// Returns exit code: 0 = success, 3 = I/O, manifest or metadata error.
fn run_contracts(manifest: &Path, class: &str, method: &str) -> i32 {
    let registry = match load_registry(manifest) {
        Ok(r) => r,
        Err(code) => return code,
    };
    match contracts_report(&registry, class, method) {
        Ok(report) => {
            print_json(&report);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            3
        }
    }
}

fn contracts_report(
    registry: &ClassRegistry,
    class: &str,
    method: &str,
) -> Result<serde_json::Value, deal_core::CoreError> {
    let class_id = registry.resolve_class(class)?;
    let def = registry
        .find_method(class_id, method)?
        .ok_or_else(|| deal_core::CoreError::UnknownMethod {
            class: class.to_string(),
            method: method.to_string(),
        })?;
    let declaring = registry.class(def.class)?;

    let mut precondition_groups = Vec::new();
    for level in fetch_contract_levels(registry, class_id, method, ContractKind::Precondition)? {
        if level.contracts.is_empty() {
            continue;
        }
        precondition_groups.push(json!({
            "declared_in": registry.class(level.class)?.name,
            "contracts": level.contracts.iter().map(decl_json).collect::<Vec<_>>(),
        }));
    }
    let postconditions = fetch_all_contracts(registry, class_id, method, ContractKind::Postcondition)?;
    let invariants = if def.is_static {
        Vec::new()
    } else {
        fetch_class_invariants(registry, class_id)?
    };

    Ok(json!({
        "method": format!("{}::{}", class, method),
        "declared_in": declaring.name,
        "static": def.is_static,
        "cloneable": declaring.cloneable,
        "params": def.params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "precondition_groups": precondition_groups,
        "postconditions": postconditions.iter().map(decl_json).collect::<Vec<_>>(),
        "invariants": invariants.iter().map(decl_json).collect::<Vec<_>>(),
    }))
}

fn violation_json(violation: &ContractViolation) -> serde_json::Value {
    json!({
        "kind": violation.kind,
        "expression": violation.contract.expression,
        "declared_in": violation.contract.location(),
        "method": violation.method,
        "message": violation.message,
        "cause": violation.cause,
        "context": violation.context.to_json(),
        "actual_return": violation.actual_return.as_ref().map(Value::to_json),
    })
}

/// Rejects recordings that could not have come from a call to the named
/// method: too many arguments, or a receiver outside the class's hierarchy.
fn check_recording(registry: &ClassRegistry, recorded: &RecordedInvocation) -> Result<(), String> {
    let class = registry.resolve_class(&recorded.class).map_err(|e| e.to_string())?;
    let method = registry
        .find_method(class, &recorded.method)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown method: {}::{}", recorded.class, recorded.method))?;

    if recorded.arguments.len() > method.arity() {
        return Err(format!(
            "{}::{} takes {} argument(s), recording passes {}",
            recorded.class,
            recorded.method,
            method.arity(),
            recorded.arguments.len()
        ));
    }

    let receiver_class = recorded
        .this
        .as_ref()
        .and_then(|this| this.get(CLASS_KEY))
        .and_then(serde_json::Value::as_str);
    if let Some(name) = receiver_class {
        let runtime = registry.resolve_class(name).map_err(|e| e.to_string())?;
        if !registry.is_subtype_of(runtime, class) {
            return Err(format!(
                "receiver is a {}, which is not a subtype of {}",
                name, recorded.class
            ));
        }
    }
    Ok(())
}

/// Execute the verify subcommand.
///
/// Returns exit code: 0 = contracts hold (or the method itself failed),
/// 1 = contract violation, 3 = I/O, manifest, metadata or recording error.
fn run_verify(manifest: &Path, invocation: &Path, reporting: Reporting) -> i32 {
    let registry = match load_registry(manifest) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let recorded: RecordedInvocation = match std::fs::read_to_string(invocation)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!(
                "Error: failed to read invocation '{}': {}",
                invocation.display(),
                e
            );
            return 3;
        }
    };

    if let Err(message) = check_recording(&registry, &recorded) {
        eprintln!("Error: invalid invocation '{}': {}", invocation.display(), message);
        return 3;
    }

    let weaver = Weaver::new(&registry, CheckerConfig::default().with_reporting(reporting));
    let mut receiver = recorded.this.as_ref().map(Value::from_json);
    let arguments: Vec<Value> = recorded.arguments.iter().map(Value::from_json).collect();
    let after = recorded.after.as_ref().map(Value::from_json);
    let result = Value::from_json(&recorded.result);
    let error = recorded.error.clone();

    let replay = move |this: Option<&mut Value>, _: &[Value]| -> Result<Value, MethodError> {
        if let Some(message) = &error {
            return Err(message.clone().into());
        }
        if let (Some(this), Some(after)) = (this, &after) {
            *this = after.clone();
        }
        Ok(result.clone())
    };

    let site = format!("{}::{}", recorded.class, recorded.method);
    tracing::debug!(method = %site, replay_error = recorded.error.is_some(), "replaying recorded invocation");
    let outcome = weaver.call(
        &recorded.class,
        &recorded.method,
        receiver.as_mut(),
        arguments,
        replay,
    );
    match outcome {
        Ok(value) => {
            print_json(&json!({
                "method": site,
                "status": "ok",
                "result": value.to_json(),
                "violations": [],
            }));
            0
        }
        Err(ContractError::Violated(report)) => {
            print_json(&json!({
                "method": site,
                "status": "violated",
                "violations": report.violations.iter().map(violation_json).collect::<Vec<_>>(),
            }));
            1
        }
        Err(ContractError::MethodFailed { source, .. }) => {
            print_json(&json!({
                "method": site,
                "status": "method_failed",
                "error": source.to_string(),
                "violations": [],
            }));
            0
        }
        Err(e @ ContractError::Metadata(_)) => {
            eprintln!("Error: {}", e);
            3
        }
    }
}
