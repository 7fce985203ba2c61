use std::path::PathBuf;

use super::config::KernelConfig;
use super::interrupt::Interrupt;
use super::os::Kernel;
use super::process_control_block::DEFAULT_PRIORITY;
use super::schedule::ScheduleKind;

use crate::io::{loader, BufferedConsole, Console, LogMonitor, Program};

/// The host wall clock: boots a kernel, feeds it the jobs of a program file
/// and pulses it until every process has finished.
pub struct Driver {
    config: KernelConfig,
    program_file: PathBuf,
    max_ticks: u64,
    schedule: Option<ScheduleKind>,
    quantum: Option<usize>,
    keystrokes: String,
}

impl Driver {
    pub fn new(config: KernelConfig, program_file: PathBuf, max_ticks: u64) -> Driver {
        Driver {
            config,
            program_file,
            max_ticks,
            schedule: None,
            quantum: None,
            keystrokes: String::new(),
        }
    }

    /// Switches the running kernel to `kind` once it has booted.
    pub fn with_schedule(mut self, kind: ScheduleKind) -> Driver {
        self.schedule = Some(kind);
        self
    }

    pub fn with_quantum(mut self, quantum: usize) -> Driver {
        self.quantum = Some(quantum);
        self
    }

    /// Characters delivered as keyboard interrupts before the jobs load.
    pub fn with_keystrokes(mut self, keystrokes: &str) -> Driver {
        self.keystrokes = keystrokes.to_string();
        self
    }

    pub fn start(&self) {
        println!("Starting the driver.");
        if let Err(err) = self.config.validate() {
            println!("Invalid configuration: {}", err);
            return;
        }

        println!("Loading programs from {}.", self.program_file.display());
        let programs = loader::load_program_file(&self.program_file).unwrap_or_else(|err| {
            println!("Failed to load programs: {}", err);
            Vec::new()
        });

        if programs.is_empty() {
            println!("No programs to run.");
            return;
        }

        println!("Running {} programs:", programs.len());
        let mut kernel = self.execute(&programs, BufferedConsole::echoing());
        println!(
            "Ran {} ticks with {} scheduling, quantum {}.",
            kernel.clock(),
            kernel.schedule(),
            kernel.quantum()
        );

        if !kernel.is_idle() {
            println!("Stopped with work still pending:");
            for pcb in kernel.processes() {
                println!("... {}", pcb);
            }
        }

        println!("Stats for executed processes:");
        println!("... PID | Priority | Wait Time (ticks) | Turnaround Time (ticks)");
        println!("...-----|----------|-------------------|------------------------");
        for pcb in kernel.terminated() {
            let priority = match pcb.get_priority() {
                DEFAULT_PRIORITY => "-".to_string(),
                priority => priority.to_string(),
            };
            println!(
                "... {:>3} | {:>8} | {:>17} | {:>23}",
                pcb.get_id(),
                priority,
                pcb.get_wait_time(),
                pcb.get_turnaround_time()
            );
        }

        match kernel.list_files() {
            Ok(files) if files.is_empty() => println!("No files left on disk."),
            Ok(files) => println!("Files left on disk: {}", files.join(" ")),
            Err(err) => println!("Could not list files: {}", err),
        }

        let input = kernel.take_input();
        if !input.is_empty() {
            println!("Unread keyboard input: {}", input);
        }
    }

    /// Loads `programs`, runs them all and pulses the clock until the kernel
    /// goes idle, shuts down or reaches the tick limit.
    pub fn execute<C: Console>(&self, programs: &[Program], console: C) -> Kernel<C, LogMonitor> {
        let mut kernel = Kernel::new(&self.config, console, LogMonitor);
        kernel.bootstrap(self.config.format_disk);

        if let Some(kind) = self.schedule {
            kernel.set_schedule(kind);
        }
        if let Some(quantum) = self.quantum {
            kernel.set_quantum(quantum);
        }
        for key in self.keystrokes.chars() {
            kernel.enqueue_interrupt(Interrupt::Keyboard(key));
        }

        for program in programs {
            log::debug!("Queueing job of {} bytes", program.bytes.len());
            kernel.enqueue_interrupt(Interrupt::LoadProgram {
                program: program.text.clone(),
                priority: program.priority,
            });
        }
        kernel.enqueue_interrupt(Interrupt::RunAllPrograms);

        while kernel.is_running() && !kernel.is_idle() && kernel.clock() < self.max_ticks {
            kernel.on_clock_pulse();
        }

        kernel.shutdown();
        kernel
    }
}
