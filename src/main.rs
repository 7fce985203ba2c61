mod io;
mod kernel;
mod logger;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use io::loader::PROGRAM_FILE_PATH;
use kernel::{Driver, KernelConfig, ScheduleKind};

#[derive(Clone, Copy, ValueEnum)]
enum Schedule {
    /// Round robin
    Rr,
    /// First come, first served
    Fcfs,
    Priority,
}

impl From<Schedule> for ScheduleKind {
    fn from(schedule: Schedule) -> ScheduleKind {
        match schedule {
            Schedule::Rr => ScheduleKind::RoundRobin,
            Schedule::Fcfs => ScheduleKind::FirstComeFirstServed,
            Schedule::Priority => ScheduleKind::Priority,
        }
    }
}

/// Simulates a small multiprogrammed OS on an 8-bit accumulator machine.
#[derive(Parser)]
struct Args {
    /// Program file of `// JOB` cards, hex lines and `// END` cards
    #[arg(default_value = PROGRAM_FILE_PATH)]
    program_file: PathBuf,

    /// Round robin quantum in ticks
    #[arg(long)]
    quantum: Option<usize>,

    /// Scheduling algorithm, round robin when omitted
    #[arg(long, value_enum)]
    schedule: Option<Schedule>,

    /// Keystrokes to deliver to the keyboard driver
    #[arg(long, default_value = "")]
    keys: String,

    /// Stop pulsing the clock after this many ticks
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,

    #[arg(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,

    /// Leave the disk unformatted at boot
    #[arg(long)]
    no_format: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(err) = logger::init(args.log_level) {
        eprintln!("Could not install logger: {}", err);
    }

    let config = KernelConfig {
        format_disk: !args.no_format,
        ..KernelConfig::default()
    };

    let mut driver = Driver::new(config, args.program_file, args.max_ticks).with_keystrokes(&args.keys);
    if let Some(schedule) = args.schedule {
        driver = driver.with_schedule(schedule.into());
    }
    if let Some(quantum) = args.quantum {
        driver = driver.with_quantum(quantum);
    }
    driver.start();
}
