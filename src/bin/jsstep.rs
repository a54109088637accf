//! Command line host for the stepping interpreter
//!
//! Usage: jsstep [options] <program.json>
//!
//! The program is an ESTree JSON document, as printed by acorn or espree.
//!
//! Options:
//!   --speed <ms>       Delay between auto steps (default: 300)
//!   --auto             Step in real time instead of running to completion
//!   --max-steps <n>    Step budget when running to completion (default: 1000000)
//!   --config <file>    Load a DebuggerConfig JSON document
//!   --trace            Print every evaluation event to stderr

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use jsstep::flow::{Evaluation, FlowModel};
use jsstep::platform::{ObserverError, StdConsoleProvider};
use jsstep::value::inspect;
use jsstep::{Debugger, DebuggerConfig, EstreeJsonParser, JsValue, Observer, Status};

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log output is opt-in through `RUST_LOG`
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// CLI configuration
struct Config {
    program_path: PathBuf,
    config_path: Option<PathBuf>,
    speed_ms: Option<u64>,
    auto: bool,
    max_steps: usize,
    trace: bool,
}

fn parse_args() -> Result<Config, String> {
    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map_or("jsstep", |s| s.as_str());

    let mut config = Config {
        program_path: PathBuf::new(),
        config_path: None,
        speed_ms: None,
        auto: false,
        max_steps: 1_000_000,
        trace: false,
    };
    let mut program_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        let Some(arg) = args.get(i) else {
            break;
        };
        match arg.as_str() {
            "--speed" => {
                i += 1;
                config.speed_ms = Some(
                    args.get(i)
                        .ok_or_else(|| "--speed requires a value".to_string())?
                        .parse::<u64>()
                        .map_err(|_| "--speed must be a positive integer".to_string())?,
                );
            }
            "--max-steps" => {
                i += 1;
                config.max_steps = args
                    .get(i)
                    .ok_or_else(|| "--max-steps requires a value".to_string())?
                    .parse::<usize>()
                    .map_err(|_| "--max-steps must be a positive integer".to_string())?;
            }
            "--config" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| "--config requires a file".to_string())?;
                config.config_path = Some(PathBuf::from(path));
            }
            "--auto" => config.auto = true,
            "--trace" => config.trace = true,
            other if other.starts_with('-') => return Err(format!("Unknown option: {}", other)),
            other => program_arg = Some(other),
        }
        i += 1;
    }

    let program_arg = program_arg.ok_or_else(|| {
        format!(
            "Usage: {} [--speed <ms>] [--auto] [--max-steps <n>] [--config <file>] [--trace] <program.json>",
            program_name
        )
    })?;
    config.program_path = PathBuf::from(program_arg);
    Ok(config)
}

/// Prints evaluation events as they happen
struct TracePrinter;

impl Observer for TracePrinter {
    fn on_evaluation(
        &mut self,
        evaluation: &Evaluation,
        flow: &FlowModel,
    ) -> Result<(), ObserverError> {
        let frame = evaluation
            .frame
            .and_then(|id| flow.frame(id))
            .map_or("-", |frame| frame.name.as_str());
        let position = match evaluation.node.line_column() {
            Some((line, column)) => format!("{}:{}", line, column),
            None => format!("@{}", evaluation.node.start),
        };
        let value = evaluation
            .value
            .as_ref()
            .map(|value| format!(" = {}", inspect(value)))
            .unwrap_or_default();
        eprintln!(
            "{:>3} {:<20} {:<8} {:<24} {}{}",
            flow.depth(),
            frame,
            evaluation.phase.to_string(),
            evaluation.node.node_type().to_string(),
            position,
            value
        );
        Ok(())
    }

    fn on_update(&mut self, status: Status, _flow: &FlowModel) -> Result<(), ObserverError> {
        if status == Status::SuspendedAsync {
            eprintln!("    -- waiting for timers");
        }
        Ok(())
    }
}

fn run() -> Result<(), String> {
    let config = parse_args()?;

    let mut debugger_config = match &config.config_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            DebuggerConfig::from_json(&text)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?
        }
        None => DebuggerConfig::default(),
    };
    if let Some(speed) = config.speed_ms {
        debugger_config.step_delay_ms = speed;
    }
    debugger_config.auto_step |= config.auto;
    let auto = debugger_config.auto_step;

    let source = fs::read_to_string(&config.program_path)
        .map_err(|e| format!("Failed to read {}: {}", config.program_path.display(), e))?;

    let mut debugger = Debugger::new(Box::new(EstreeJsonParser), debugger_config)
        .with_console(Box::new(StdConsoleProvider::new()));
    if config.trace {
        debugger = debugger.with_observer(Box::new(TracePrinter));
    }

    debugger.start(&source).map_err(|e| e.to_string())?;
    let status = if auto {
        run_realtime(&mut debugger)?
    } else {
        debugger
            .run_to_completion(config.max_steps)
            .map_err(|e| e.to_string())?
    };

    if status != Status::Ended {
        return Err(format!("Stopped after {} steps ({})", config.max_steps, status));
    }
    match debugger.result() {
        Some(JsValue::Undefined) | None => {}
        Some(value) => println!("{}", inspect(value)),
    }
    Ok(())
}

/// Sleep until each host deadline and let it fire
fn run_realtime(debugger: &mut Debugger) -> Result<Status, String> {
    loop {
        let status = debugger.status();
        if !status.is_live() {
            return Ok(status);
        }
        let Some(due) = debugger.next_deadline() else {
            // Live but nothing scheduled: a step is owed right now
            debugger.step().map_err(|e| e.to_string())?;
            continue;
        };
        let wait = due.saturating_sub(debugger.now());
        std::thread::sleep(Duration::from_millis(wait));
        debugger.advance(wait).map_err(|e| e.to_string())?;
    }
}
