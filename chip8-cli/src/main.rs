//! Entrypoint for CLI
mod config;
mod error;
mod term;

use std::{env, fs, time::Instant};

use chip8::{prelude::*, IMPL_VERSION};
use log::{error, info};

use self::{config::CliConfig, error::CliError, term::TermDevices};

static USAGE: &str = r#"
usage: chip8 run ROM [CONFIG]

commands:
    run     Run the target ROM file, optionally with a YAML config

examples:
    chip8 run breakout.rom
    chip8 run breakout.rom breakout.yaml
"#;

fn run_rom(filepath: &str, config: Option<&str>) -> Result<(), CliError> {
    let config = match config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    info!("load rom: {filepath}");
    let bytecode = fs::read(filepath)?;

    let mut vm = Chip8Vm::new(config.vm_conf());
    vm.load_program(&bytecode)?;

    let mut devices = TermDevices::new(config.key_state());
    let max_steps = config.max_steps.unwrap_or(usize::MAX);

    // Clear the terminal once, frames then redraw in place.
    print!("\x1B[2J");

    let start = Instant::now();
    let mut steps = 0;
    while steps < max_steps {
        vm.step(&mut devices)?;
        steps += 1;
    }

    info!(
        "executed {steps} steps in {}ms",
        start.elapsed().as_nanos() as f64 / 1000000.0
    );

    Ok(())
}

fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Run { filepath, config }) => {
            if let Err(err) = run_rom(&filepath, config.as_deref()) {
                error!("{err}");
                std::process::exit(1);
            }
        }
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => Some(Cmd::Run {
            filepath: args.next()?,
            config: args.next(),
        }),
        _ => None,
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        config: Option<String>,
    },
}
