use super::config::KernelConfig;
use super::cpu::Cpu;
use super::device_driver::DeviceDriver;
use super::error::{DispatchError, FileSystemError};
use super::file_system::FileSystemDriver;
use super::interrupt::{Interrupt, InterruptQueue};
use super::keyboard::KeyboardDriver;
use super::memory_manager::MemoryManager;
use super::process_control_block::{Pid, ProcessControlBlock, DEFAULT_PRIORITY};
use super::schedule::{ScheduleKind, SchedulePolicy};
use super::short_term_scheduler::ShortTermScheduler;

use crate::io::{loader, Console, Disk, Monitor};

/// Ticks between two "Idle" traces.
const IDLE_TRACE_INTERVAL: u64 = 10;

/// Routes interrupts to the CPU, the schedulers and the device drivers. One
/// call to `on_clock_pulse` is one tick of the virtual clock.
pub struct Kernel<C: Console, M: Monitor> {
    cpu: Cpu,
    memory: MemoryManager,
    file_system: FileSystemDriver,
    keyboard: KeyboardDriver,
    scheduler: ShortTermScheduler,
    interrupts: InterruptQueue,
    console: C,
    monitor: M,
    clock: u64,
    running: bool,
}

impl<C: Console, M: Monitor> Kernel<C, M> {
    pub fn new(config: &KernelConfig, console: C, monitor: M) -> Kernel<C, M> {
        let disk = Disk::new(config.disk_tracks, config.disk_sectors, config.disk_blocks);

        Kernel {
            cpu: Cpu::new(),
            memory: MemoryManager::new(config.memory_size, config.segment_count),
            file_system: FileSystemDriver::new(disk),
            keyboard: KeyboardDriver::new(),
            scheduler: ShortTermScheduler::new(SchedulePolicy::new(config.schedule, config.quantum)),
            interrupts: InterruptQueue::new(),
            console,
            monitor,
            clock: 0,
            running: false,
        }
    }

    /// Loads the drivers and starts the clock. The disk is formatted when
    /// `format_disk` is set.
    pub fn bootstrap(&mut self, format_disk: bool) {
        log::info!("Kernel bootstrap");

        self.cpu.init(&mut self.monitor);
        self.keyboard.driver_entry();
        self.file_system.driver_entry();

        if format_disk {
            if let Err(err) = self.file_system.format() {
                log::error!("Could not format disk: {}", err);
            }
        }

        self.running = true;
    }

    pub fn shutdown(&mut self) {
        log::info!("Kernel shutdown at tick {}", self.clock);
        self.cpu.set_executing(false);
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// True when there is nothing left to do: no pending interrupts and no
    /// process waiting for the CPU.
    pub fn is_idle(&self) -> bool {
        self.interrupts.is_empty() && self.scheduler.is_idle()
    }

    pub fn enqueue_interrupt(&mut self, interrupt: Interrupt) {
        self.interrupts.enqueue(interrupt);
    }

    /// Handles one interrupt, or runs one instruction, or does nothing.
    pub fn on_clock_pulse(&mut self) {
        if !self.running {
            return;
        }
        self.clock += 1;

        if let Some(interrupt) = self.interrupts.dequeue() {
            self.handle_interrupt(interrupt);
        } else if !self.scheduler.is_idle() {
            self.execute_cycle();
        } else if self.clock % IDLE_TRACE_INTERVAL == 0 {
            log::trace!("Idle");
        }
    }

    fn execute_cycle(&mut self) {
        let pcb = match self.scheduler.next(&mut self.memory, &mut self.file_system) {
            Ok(Some(pcb)) => pcb,
            Ok(None) => return,
            Err(err) => {
                self.dispatch_failed(err);
                return;
            }
        };

        self.cpu.set_executing(true);
        let pid = pcb.get_id();
        self.cpu.cycle(
            pcb,
            &mut self.memory,
            &mut self.console,
            &mut self.monitor,
            &mut self.interrupts,
        );
        self.scheduler.update_stats();

        let policy = self.scheduler.policy_mut();
        policy.did_cycle(pid);
        if policy.should_context_switch() {
            self.interrupts.enqueue(Interrupt::ContextSwitch);
        }

        self.monitor.show_cpu(self.cpu.registers(), self.cpu.last_instruction());
        self.monitor.show_memory(self.memory.raw());
        self.monitor.show_processes(&self.scheduler.processes());
    }

    fn handle_interrupt(&mut self, interrupt: Interrupt) {
        log::trace!("Handling IRQ~{}", interrupt);

        match interrupt {
            Interrupt::Timer => {}
            Interrupt::Keyboard(key) => self.keyboard.isr(key),
            Interrupt::LoadProgram { program, priority } => self.load_program(&program, priority),
            Interrupt::RunProgram(pid) => self.run_program(pid),
            Interrupt::BreakProgram(pid) | Interrupt::ErrProgram(pid) => {
                if !self.terminate(pid) {
                    log::debug!("Process {} already terminated", pid);
                }
            }
            Interrupt::KillProgram(pid) => {
                if !self.terminate(pid) {
                    self.console.put_system_text(&format!("No active process with PID {}", pid));
                }
            }
            Interrupt::RequestClearMemory => self.clear_memory(),
            Interrupt::ContextSwitch => self.context_switch(),
            Interrupt::RunAllPrograms => self.run_all_programs(),
            Interrupt::FileSystem(request) => match self.file_system.isr(request) {
                Ok(reply) => self.console.put_system_text(&reply.to_string()),
                Err(err) => self.console.put_system_text(&err.to_string()),
            },
            Interrupt::Unrecognized(irq) => self.trap(&format!("Unrecognized IRQ {}", irq)),
        }
    }

    fn load_program(&mut self, text: &str, priority: Option<u32>) {
        let program = match loader::parse_program(text) {
            Ok(program) => program,
            Err(err) => {
                self.console.put_system_text(&format!("Invalid program: {}", err));
                return;
            }
        };

        let priority = priority.unwrap_or(DEFAULT_PRIORITY);
        match self.scheduler.request_residency(&program, priority, &mut self.memory, &mut self.file_system) {
            Ok(pid) => self.console.put_system_text(&format!("Process created with PID {}", pid)),
            Err(err) => self.console.put_system_text(&format!("Could not load program: {}", err)),
        }
    }

    fn run_program(&mut self, pid: Pid) {
        if self.scheduler.request_cpu_execution(pid) {
            self.console.put_system_text(&format!("Running {}...", pid));
            self.did_admit();
        } else {
            self.console.put_system_text(&format!("No resident process with PID {}", pid));
        }
    }

    fn run_all_programs(&mut self) {
        let pids = self.scheduler.request_all_execution();
        if pids.is_empty() {
            self.console.put_system_text("No resident programs to run");
            return;
        }

        let pids: Vec<String> = pids.iter().map(Pid::to_string).collect();
        self.console.put_system_text(&format!("Running {}...", pids.join(", ")));
        self.did_admit();
    }

    fn did_admit(&mut self) {
        self.cpu.set_executing(true);
        if self.scheduler.should_preempt() {
            log::debug!("Preempting process for a more urgent one");
            self.interrupts.enqueue(Interrupt::ContextSwitch);
        }
    }

    /// Terminates `pid` and reports its timings. Returns false if no active
    /// process has that pid.
    fn terminate(&mut self, pid: Pid) -> bool {
        let terminated = self
            .scheduler
            .request_graceful_termination(
                pid,
                &mut self.cpu,
                &mut self.monitor,
                &mut self.memory,
                &mut self.file_system,
            )
            .is_some();

        if terminated {
            self.report_finished(pid);
        }
        terminated
    }

    fn report_finished(&mut self, pid: Pid) {
        if let Some(pcb) = self.scheduler.terminated().iter().rev().find(|pcb| pcb.get_id() == pid) {
            self.console.put_system_text(&format!(
                "Process {} finished. Wait time: {} ticks, turnaround time: {} ticks",
                pid,
                pcb.get_wait_time(),
                pcb.get_turnaround_time()
            ));
        }
    }

    /// The scheduler has already terminated the process; only the report is
    /// left.
    fn dispatch_failed(&mut self, err: DispatchError) {
        self.console.put_system_text(&err.to_string());
        self.report_finished(err.pid);
    }

    fn clear_memory(&mut self) {
        match self.scheduler.clear_memory(&mut self.memory) {
            Some(dropped) => {
                log::debug!("Dropped resident processes {:?}", dropped);
                self.console.put_system_text("Memory cleared");
            }
            None => self.console.put_system_text("Cannot clear memory while processes are running"),
        }
    }

    fn context_switch(&mut self) {
        match self.scheduler.context_switch(&mut self.cpu, &mut self.memory, &mut self.file_system) {
            Ok(true) => log::debug!("Context switch to process {:?}", self.scheduler.executing_pid()),
            Ok(false) => {}
            Err(err) => self.dispatch_failed(err),
        }
    }

    fn trap(&mut self, message: &str) {
        log::error!("Kernel trap: {}", message);
        self.console.put_system_text(&format!("Kernel trap: {}", message));
        self.shutdown();
    }

    /// Every process that has not terminated yet.
    pub fn processes(&self) -> Vec<&ProcessControlBlock> {
        self.scheduler.processes()
    }

    pub fn terminated(&self) -> &[ProcessControlBlock] {
        self.scheduler.terminated()
    }

    pub fn list_files(&self) -> Result<Vec<String>, FileSystemError> {
        self.file_system.ls()
    }

    pub fn schedule(&self) -> ScheduleKind {
        self.scheduler.policy().kind()
    }

    pub fn set_schedule(&mut self, kind: ScheduleKind) {
        log::info!("Schedule set to {}", kind);
        self.scheduler.set_schedule(kind);
    }

    pub fn quantum(&self) -> usize {
        self.scheduler.policy().quantum()
    }

    pub fn set_quantum(&mut self, quantum: usize) {
        self.scheduler.policy_mut().set_quantum(quantum);
    }

    pub fn take_input(&mut self) -> String {
        self.keyboard.take_input()
    }

    pub fn console(&self) -> &C {
        &self.console
    }
}
