mod console;
mod logger;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use gdrom::service::DriveService;
use gdrom::sim::{SimConfig, SimController, SimDisc};
use gdrom::{Cdrom, Clock, DriveConfig, SystemClock, VirtualClock};

#[derive(Parser)]
#[command(version, about = "Drive a simulated GD-ROM from the command line", long_about = None)]
struct Args {
    /// CUE sheet of the disc to start with.
    #[arg(short, long)]
    cue: Option<PathBuf>,

    /// Start with an empty tray.
    #[arg(short, long)]
    empty: bool,

    /// Ticks each command takes to complete.
    #[arg(short, long, default_value_t = 4)]
    latency: u32,

    /// Time budget of each INIT while reinitialising, in ms.
    #[arg(short, long, default_value_t = 10000)]
    timeout: u32,

    /// More logging. Repeat for trace output.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Read console commands from a file instead of stdin.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Run on a virtual clock that moves this many ms on every yield.
    #[arg(long)]
    virtual_ms: Option<u64>,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if let Err(e) = logger::init(level) {
        eprintln!("could not set up logging: {}", e);
    }

    let disc = if args.empty {
        None
    } else if let Some(path) = &args.cue {
        match SimDisc::from_cue_file(path) {
            Ok(disc) => Some(disc),
            Err(e) => {
                eprintln!("could not load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        Some(SimDisc::dreamcast_cdr())
    };

    let sim_config = SimConfig { latency: args.latency };
    let sim = match disc {
        Some(disc) => SimController::with_disc(sim_config, disc),
        None => SimController::new(sim_config),
    };
    let config = DriveConfig {
        reinit_timeout_ms: args.timeout,
        ..Default::default()
    };

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("could not open {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Box::new(std::io::stdin().lock()),
    };
    let interactive = args.script.is_none();

    match args.virtual_ms {
        Some(step) => run(Cdrom::with_config(sim, VirtualClock::new(step), config), input, interactive),
        None => run(Cdrom::with_config(sim, SystemClock::new(), config), input, interactive),
    }
}

/// Hand the drive to a service thread and run the console against it.
fn run<C: Clock + Send + 'static>(cdrom: Cdrom<SimController, C>, input: Box<dyn BufRead>, interactive: bool) {
    let tray = cdrom.gate().lock().tray();
    let (client, service) = DriveService::spawn(cdrom);

    console::run(&client, &tray, input, interactive);

    drop(client);
    match service.join() {
        Ok(cdrom) => {
            let stats = cdrom.into_inner().stats();
            println!("{} commands ({} submits, {} refused, {} aborted), {} INITs, {} mode sets, {} ticks",
                stats.commands, stats.submits, stats.refused, stats.aborts,
                stats.inits, stats.mode_sets, stats.ticks);
        },
        Err(_) => log::error!("drive service panicked"),
    }
}
