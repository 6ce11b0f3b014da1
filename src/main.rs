//! CLI entry point for armscript
//!
//! Dry-runs scripts against simulated collaborators and checks them for load errors.

use armscript::cli::{check, run};
use armscript::logging::DebugLogger;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

fn main() {
    let _ = DebugLogger::default().init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "run" => {
            let options = parse_run_options(&args[2..]).unwrap_or_else(|message| fail(&message));
            if let Err(err) = run::run_script(&options) {
                eprintln!("Error: Run failed");
                eprintln!("Reason: {err:#}");
                process::exit(1);
            }
        }
        "check" => {
            let Some(path) = args.get(2) else {
                fail("Missing script file path");
            };
            match check::run_check(&PathBuf::from(path)) {
                Ok(true) => {}
                Ok(false) => process::exit(2),
                Err(err) => {
                    eprintln!("Error: Check failed");
                    eprintln!("Reason: {err:#}");
                    process::exit(1);
                }
            }
        }
        "--help" | "-h" => print_usage(),
        other => fail(&format!("Unknown command '{other}'")),
    }
}

fn parse_run_options(args: &[String]) -> Result<run::RunOptions, String> {
    let mut options = run::RunOptions::default();
    let mut script = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a file path")?;
                options.config = Some(PathBuf::from(path));
            }
            "--duration" => {
                let value = iter.next().ok_or("--duration needs a number of seconds")?;
                let seconds: f64 = value
                    .parse()
                    .map_err(|_| format!("Invalid duration '{value}'"))?;
                let duration = Duration::try_from_secs_f64(seconds)
                    .map_err(|_| format!("Invalid duration '{value}'"))?;
                options.duration = Some(duration);
            }
            path if script.is_none() => script = Some(PathBuf::from(path)),
            other => return Err(format!("Unexpected argument '{other}'")),
        }
    }

    options.script = script.ok_or("Missing script file path")?;
    Ok(options)
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    eprintln!();
    print_usage();
    process::exit(1);
}

fn print_usage() {
    println!("armscript - Event-driven robot arm script interpreter");
    println!();
    println!("USAGE:");
    println!("    armscript run <script.json> [--config <file>] [--duration <secs>]");
    println!("    armscript check <script.json>");
    println!();
    println!("COMMANDS:");
    println!("    run <file>      Run a script against the simulated robot");
    println!("    check <file>    Load a script and report load errors");
    println!("    --help, -h      Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    ARMSCRIPT_LOG         Log level (trace, debug, info, warn, error)");
    println!("    ARMSCRIPT_TICK_RATE   Ticks per second, overrides the config file");
}
