//! Groovebox CLI - The `groovebox` command.
//!
//! A headless driver for the playback engine. It plays the built-in demo
//! groove against a wall-clock trigger service and manages the
//! configuration file.

mod demo;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use groovebox_core::{
    EngineConfig, EngineEvent, Role, Runtime, RuntimeHandle, StateMessage,
    WallClockTriggerService, MAX_CHANNELS,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Groovebox - Step sequencer playback engine
#[derive(Parser, Debug)]
#[command(name = "groovebox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Step sequencer with musically synchronized fills and endings", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.config/groovebox/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the built-in demo groove
    Demo {
        /// Tempo in BPM (overrides the config file)
        #[arg(short, long)]
        tempo: Option<f64>,

        /// Main cycles to play before each transition
        #[arg(long, default_value = "2")]
        cycles: u32,

        /// Keep playing instead of ending after the rhythm change
        #[arg(long)]
        no_end: bool,

        /// Loop the main pattern without transitions
        #[arg(long)]
        audition: bool,

        /// Print the playhead on every step
        #[arg(short, long)]
        steps: bool,
    },

    /// Create a default configuration file
    Init,

    /// Show the configuration file path
    ConfigPath,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Commands::Demo {
            tempo,
            cycles,
            no_end,
            audition,
            steps,
        } => {
            let mut config = load_config(args.config)?;
            if let Some(bpm) = tempo {
                config.transport.tempo = bpm;
            }
            let options = DemoOptions {
                cycles: cycles.max(1),
                end: !no_end,
                audition,
                print_steps: steps,
            };
            run_demo(&config, &options)
        }
        Commands::Init => {
            let path = EngineConfig::create_default_config_file()
                .context("Failed to create config file")?;
            println!("Created default config at: {}", path.display());
            Ok(())
        }
        Commands::ConfigPath => {
            let path = EngineConfig::config_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from(&path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(EngineConfig::load_or_default()),
    }
}

struct DemoOptions {
    cycles: u32,
    end: bool,
    audition: bool,
    print_steps: bool,
}

fn run_demo(config: &EngineConfig, options: &DemoOptions) -> Result<()> {
    // Ctrl-C only raises a flag; the loop below stops the runtime cleanly
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted))
        .context("Failed to register Ctrl-C handler")?;

    let runtime = Runtime::start(WallClockTriggerService::new(), config)
        .context("Failed to start runtime")?;
    let handle = runtime.handle().clone();

    for msg in demo::setup_messages() {
        handle.send(msg)?;
    }
    handle.send(StateMessage::SetAudition {
        enabled: options.audition,
    })?;
    handle.send(StateMessage::Play)?;

    println!("Groovebox demo at {:.0} BPM (Ctrl+C to stop)", config.tempo());

    let mut main_cycles = 0u32;
    loop {
        if interrupted.load(Ordering::Relaxed) {
            log::info!("Interrupted by user (Ctrl+C)");
            handle.send(StateMessage::Stop)?;
            break;
        }

        let event = match handle.events().recv_timeout(Duration::from_millis(100)) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match event {
            EngineEvent::PatternChanged(role) => println!("--> {}", role),
            EngineEvent::Stopped => {
                println!("Ending complete");
                break;
            }
            EngineEvent::StepAdvanced { role, step, .. } => {
                if options.print_steps {
                    println!("{}", playhead_line(&handle, role, step));
                }
                if role == Role::Main && step == 0 {
                    main_cycles += 1;
                    log::info!("Main cycle {}", main_cycles);
                    if main_cycles == options.cycles {
                        handle.send(StateMessage::FillToNextRhythm { target: None })?;
                    } else if options.end && main_cycles == options.cycles * 2 {
                        handle.send(StateMessage::ArmEnd)?;
                    }
                }
            }
        }
    }

    runtime.shutdown();
    Ok(())
}

/// One line per step: role, step number and the channels that sound.
fn playhead_line(handle: &RuntimeHandle, role: Role, step: usize) -> String {
    let cells: String = handle.with_state(|s| {
        let pattern = s.live(role).pattern();
        (0..MAX_CHANNELS)
            .map(|channel| {
                if pattern.is_on(channel, step) {
                    demo::channel_label(channel)
                } else {
                    '.'
                }
            })
            .collect()
    });
    format!("{:>5} {:02} {}", role, step, cells)
}
