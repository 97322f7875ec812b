mod config;
mod script;
mod sim;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use matrix_scan::{DebugMode, Event, KeyPosition, Matrix};

use script::Action;
use sim::{EventLog, SimBoard, SimDelay};

#[derive(Parser)]
#[command(name = "matrix-cli")]
#[command(about = "Keyboard matrix scan and debounce simulator")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the dimensions and timing of a matrix description
    Info {
        /// Path to the JSON matrix description
        config: PathBuf,
    },
    /// Replay a raw switch script through the scanner
    Replay {
        /// Path to the JSON matrix description
        config: PathBuf,
        /// Path to the switch script
        script: PathBuf,
        /// Log key state changes while scanning
        #[arg(long, value_enum, default_value_t = DebugArg::Off)]
        debug: DebugArg,
        /// Print the key state table after the scan at this time (ms)
        #[arg(long = "state-table", value_name = "MS")]
        state_tables: Vec<u32>,
        /// Override the minimum time between transitions
        #[arg(long)]
        debounce_ms: Option<u8>,
        /// Override the strobe settle delay
        #[arg(long)]
        strobe_delay_us: Option<u8>,
        /// Override the number of strobes scanned per step
        #[arg(long)]
        strobes_per_step: Option<u8>,
        /// Print every key state each cycle, not only Press and Release
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DebugArg {
    Off,
    Presses,
    Transitions,
    Verbose,
}

impl From<DebugArg> for DebugMode {
    fn from(arg: DebugArg) -> Self {
        match arg {
            DebugArg::Off => DebugMode::Off,
            DebugArg::Presses => DebugMode::Presses,
            DebugArg::Transitions => DebugMode::Transitions,
            DebugArg::Verbose => DebugMode::Verbose,
        }
    }
}

fn init_logging(verbose: u8, debug: DebugArg) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Debug modes report through info!.
    let level = if debug == DebugArg::Off {
        level
    } else {
        level.max(LevelFilter::Info)
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Info { config } => {
            init_logging(cli.verbose, DebugArg::Off);
            let file = config::load(&config)?;
            let table = file.code_table();
            let matrix_config = file.matrix_config(&table);
            matrix_config
                .validate()
                .map_err(|e| anyhow!("invalid matrix configuration: {}", e))?;

            println!("{}", file.info());
            let timing = matrix_config.timing;
            println!("Debounce: {} ms", timing.debounce_ms);
            println!("Strobe delay: {} us", timing.strobe_delay_us);
            println!("Strobes per step: {}", timing.strobes_per_step);
            println!("Wiring: {:?}", file.wiring);
        }
        Command::Replay {
            config,
            script,
            debug,
            state_tables,
            debounce_ms,
            strobe_delay_us,
            strobes_per_step,
            all,
        } => {
            init_logging(cli.verbose, debug);
            let file = config::load(&config)?;
            let script = script::load(&script)?;
            script.check_bounds(file.rows, file.cols)?;

            let table = file.code_table();
            let board = SimBoard::new(file.wiring == config::Wiring::Diodes);
            let mut matrix: sim::SimMatrix =
                Matrix::new(board, SimDelay, file.matrix_config(&table))
                    .map_err(|e| anyhow!("invalid matrix configuration: {}", e))?;

            if let Some(ms) = debounce_ms {
                matrix.set_debounce_ms(ms);
            }
            if let Some(us) = strobe_delay_us {
                matrix.set_strobe_delay_us(us);
            }
            if let Some(n) = strobes_per_step {
                matrix.set_strobes_per_step(n);
            }
            matrix.set_debug_mode(debug.into());

            let mut sink = EventLog::default();
            let mut steps = script.steps.iter().peekable();

            for now in 0..=script.end_ms {
                let mut bounced = Vec::new();
                while let Some(step) = steps.next_if(|s| s.at_ms == now) {
                    let board = matrix.gpio_mut();
                    match step.action {
                        Action::Press => board.set(step.row, step.col, true),
                        Action::Release => board.set(step.row, step.col, false),
                        Action::Bounce => {
                            board.toggle(step.row, step.col);
                            bounced.push((step.row, step.col));
                        }
                    }
                }

                sink.events.clear();
                matrix.scan_cycle(&move || now, &mut sink);

                for (row, col) in bounced {
                    matrix.gpio_mut().toggle(row, col);
                }

                for event in &sink.events {
                    match *event {
                        Event::Key { code, state } => {
                            let edge = matches!(state, KeyPosition::Press | KeyPosition::Release);
                            if all || edge {
                                println!("{:>6} ms  key 0x{:02x} {}", now, code, state);
                            }
                        }
                        Event::Activity(kind) => {
                            println!("{:>6} ms  activity {:?}", now, kind);
                        }
                    }
                }

                if state_tables.contains(&now) {
                    println!("state table at {} ms:", now);
                    println!("{}", matrix.state_table());
                }
            }

            let diagnostics = matrix.diagnostics();
            println!(
                "{} cycles, {} invalid states",
                diagnostics.cycles, diagnostics.invalid_states
            );
        }
    }

    Ok(())
}
