// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand, ValueEnum};
use rvx_config::{
    parse_key_escapes, BoardConfig, TestAssertion, TestLimits, TestScript, Variant,
};
use rvx_sim::transaction::OrderingViolation;
use rvx_sim::Machine;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "RVX interrupt demo simulator",
    long_about = None
)]
struct Cli {
    /// Path to the board config (YAML). Built-in SPI demo board when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the board's service routine
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Console input, with \n, \r, \t, \\ and \xNN escapes
    #[arg(short, long, default_value = "")]
    input: String,

    /// Idle-loop steps to run after the input has been typed
    #[arg(long, default_value = "0")]
    idle_steps: u64,

    /// Print a JSON summary instead of streaming console output
    #[arg(long)]
    json: bool,

    /// Write a machine snapshot (JSON) after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug-level tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner mode driven by a test script (YAML).
    Test(TestArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the test script (YAML)
    #[arg(short = 's', long)]
    script: PathBuf,

    /// Board config, takes precedence over the script's
    #[arg(short = 'b', long)]
    board: Option<PathBuf>,

    /// Override the interrupt limit
    #[arg(long)]
    max_interrupts: Option<u64>,

    /// Disable console stdout echo (still captured for assertions/artifacts)
    #[arg(long)]
    no_uart_stdout: bool,

    /// Directory to write test artifacts (result.json, uart.log)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Identify,
    Echo,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Identify => Variant::Identify,
            VariantArg::Echo => Variant::Echo,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum StopReason {
    InputExhausted,
    MaxInterrupts,
    ConfigError,
    RuntimeError,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    status: &'static str,
    board: String,
    interrupts: u64,
    reports: u64,
    dispatch_failures: u64,
    bus_transactions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bus_violation: Option<String>,
    uart: String,
}

#[derive(Debug, Serialize, Clone)]
struct AssertionResult {
    assertion: TestAssertion,
    passed: bool,
}

#[derive(Debug, Serialize)]
struct TestConfig {
    board: Option<PathBuf>,
    script: PathBuf,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    interrupts: u64,
    reports: u64,
    dispatch_failures: u64,
    stop_reason: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<TestLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    assertions: Vec<AssertionResult>,
    config: TestConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Some(Commands::Test(ref args)) => run_test(args),
        None => run_interactive(&cli),
    }
}

fn load_board(path: Option<&Path>, variant: Option<VariantArg>) -> anyhow::Result<BoardConfig> {
    let mut board = match path {
        Some(path) => {
            info!("Loading board config: {:?}", path);
            BoardConfig::from_file(path)?
        }
        None => BoardConfig::default(),
    };
    if let Some(variant) = variant {
        board.variant = variant.into();
        board.validate()?;
    }
    Ok(board)
}

fn run_interactive(cli: &Cli) -> ExitCode {
    info!("Starting RVX simulator");

    let keys = match parse_key_escapes(&cli.input) {
        Ok(keys) => keys,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let board = match load_board(cli.config.as_deref(), cli.variant) {
        Ok(board) => board,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut machine = match Machine::new(board) {
        Ok(machine) => machine,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    machine.echo_console(!cli.json);

    let run = machine
        .boot()
        .and_then(|_| machine.type_keys(&keys))
        .and_then(|_| machine.idle(cli.idle_steps));
    if let Err(e) = run {
        error!("Simulation error: {}", e);
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }

    if let Some(path) = &cli.snapshot {
        if let Err(e) = write_json(path, &machine.snapshot()) {
            error!("Failed to write snapshot {:?}: {:#}", path, e);
        }
    }

    let bus = machine.bus_transactions();
    if let Err(violation) = &bus {
        error!("Bus ordering violation: {}", violation);
    }

    if cli.json {
        let summary = summarize(&machine, bus);
        match serde_json::to_string(&summary) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                error!("Failed to serialize summary: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    } else {
        println!();
        info!(
            "Serviced {} interrupts ({} reports, {} dispatch failures)",
            machine.interrupts(),
            machine.reports(),
            machine.dispatch_failures()
        );
    }

    if bus.is_err() {
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }
    ExitCode::from(EXIT_PASS)
}

fn summarize(machine: &Machine, bus: Result<usize, OrderingViolation>) -> RunSummary {
    let (status, bus_transactions, bus_violation) = bus_report(bus);
    RunSummary {
        status,
        board: machine.config().name.clone(),
        interrupts: machine.interrupts(),
        reports: machine.reports(),
        dispatch_failures: machine.dispatch_failures(),
        bus_transactions,
        bus_violation,
        uart: String::from_utf8_lossy(&machine.console_output()).into_owned(),
    }
}

fn bus_report(bus: Result<usize, OrderingViolation>) -> (&'static str, usize, Option<String>) {
    match bus {
        Ok(n) => ("finished", n, None),
        Err(violation) => ("bus_violation", 0, Some(violation.to_string())),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let f = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(f, value)?;
    Ok(())
}

fn resolve_script_dir(script_path: &Path) -> &Path {
    script_path.parent().unwrap_or_else(|| Path::new("."))
}

fn run_test(args: &TestArgs) -> ExitCode {
    let fail = |reason: StopReason, limits: Option<TestLimits>, msg: String, code: u8| {
        error!("{}", msg);
        write_outputs(
            args,
            TestResult {
                result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
                status: "error".to_string(),
                interrupts: 0,
                reports: 0,
                dispatch_failures: 0,
                stop_reason: reason,
                limits,
                message: Some(msg),
                assertions: Vec::new(),
                config: TestConfig {
                    board: args.board.clone(),
                    script: args.script.clone(),
                },
            },
            &[],
        );
        ExitCode::from(code)
    };

    let script = match TestScript::from_file(&args.script) {
        Ok(s) => s,
        Err(e) => {
            return fail(
                StopReason::ConfigError,
                None,
                format!("{:#}", e),
                EXIT_CONFIG_ERROR,
            )
        }
    };

    let limits = TestLimits {
        max_interrupts: args.max_interrupts.unwrap_or(script.limits.max_interrupts),
    };

    let board = match &args.board {
        Some(path) => BoardConfig::from_file(path),
        None => script.load_board(resolve_script_dir(&args.script)),
    };
    let machine = board.and_then(Machine::new);
    let mut machine = match machine {
        Ok(m) => m,
        Err(e) => {
            return fail(
                StopReason::ConfigError,
                Some(limits),
                format!("{:#}", e),
                EXIT_CONFIG_ERROR,
            )
        }
    };
    machine.echo_console(!args.no_uart_stdout);

    // Script keys were validated on load.
    let keys = parse_key_escapes(&script.inputs.keys).unwrap_or_default();

    if let Err(e) = machine.boot() {
        return fail(
            StopReason::RuntimeError,
            Some(limits),
            format!("Simulation error: {}", e),
            EXIT_RUNTIME_ERROR,
        );
    }

    let mut stop_reason = StopReason::InputExhausted;
    for &key in &keys {
        if machine.interrupts() >= limits.max_interrupts {
            stop_reason = StopReason::MaxInterrupts;
            break;
        }
        if let Err(e) = machine.press(key) {
            return fail(
                StopReason::RuntimeError,
                Some(limits),
                format!("Simulation error: {}", e),
                EXIT_RUNTIME_ERROR,
            );
        }
    }
    info!("Test run stopped: {:?}", stop_reason);

    let uart = machine.console_output();
    let uart_text = String::from_utf8_lossy(&uart);
    let assertions: Vec<AssertionResult> = script
        .assertions
        .iter()
        .map(|assertion| {
            let passed = match assertion {
                TestAssertion::UartContains(a) => uart_text.contains(&a.uart_contains),
                TestAssertion::ReportCount(a) => machine.reports() == a.reports,
                TestAssertion::FailureCount(a) => {
                    machine.dispatch_failures() == a.dispatch_failures
                }
            };
            if !passed {
                error!("Assertion failed: {:?}", assertion);
            }
            AssertionResult {
                assertion: assertion.clone(),
                passed,
            }
        })
        .collect();

    let all_passed = assertions.iter().all(|a| a.passed);
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: if all_passed { "pass" } else { "fail" }.to_string(),
        interrupts: machine.interrupts(),
        reports: machine.reports(),
        dispatch_failures: machine.dispatch_failures(),
        stop_reason,
        limits: Some(limits),
        message: None,
        assertions,
        config: TestConfig {
            board: args.board.clone(),
            script: args.script.clone(),
        },
    };
    write_outputs(args, result, &uart);

    if all_passed {
        ExitCode::from(EXIT_PASS)
    } else {
        ExitCode::from(EXIT_ASSERT_FAIL)
    }
}

fn write_outputs(args: &TestArgs, result: TestResult, uart: &[u8]) {
    let Some(output_dir) = &args.output_dir else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!("Failed to create output directory {:?}: {}", output_dir, e);
        return;
    }

    if let Err(e) = write_json(&output_dir.join("result.json"), &result) {
        error!("Failed to write result.json: {:#}", e);
    }

    if let Err(e) = std::fs::write(output_dir.join("uart.log"), uart) {
        error!("Failed to write uart.log: {}", e);
    }
}
