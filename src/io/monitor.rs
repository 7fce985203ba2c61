use crate::kernel::{ProcessControlBlock, Registers};

/// Receives snapshots of machine state for presentation. Nothing it does
/// feeds back into the kernel.
pub trait Monitor {
    fn show_memory(&mut self, memory: &[u8]);

    fn show_cpu(&mut self, registers: &Registers, instruction: Option<u8>);

    fn show_processes(&mut self, processes: &[&ProcessControlBlock]);
}

pub struct NullMonitor;

impl Monitor for NullMonitor {
    fn show_memory(&mut self, _memory: &[u8]) {}

    fn show_cpu(&mut self, _registers: &Registers, _instruction: Option<u8>) {}

    fn show_processes(&mut self, _processes: &[&ProcessControlBlock]) {}
}

/// Writes snapshots to the `monitor` log target at trace level.
pub struct LogMonitor;

impl Monitor for LogMonitor {
    fn show_memory(&mut self, memory: &[u8]) {
        if !log::log_enabled!(target: "monitor", log::Level::Trace) {
            return;
        }

        for (row, bytes) in memory.chunks(8).enumerate() {
            if bytes.iter().any(|byte| *byte != 0) {
                log::trace!(
                    target: "monitor",
                    "{:03X}: {}",
                    row * 8,
                    crate::io::loader::format_program(bytes)
                );
            }
        }
    }

    fn show_cpu(&mut self, registers: &Registers, instruction: Option<u8>) {
        log::trace!(
            target: "monitor",
            "PC={:02X} IR={} ACC={:02X} X={:02X} Y={:02X} Z={}",
            registers.program_counter,
            instruction.map_or_else(|| "--".to_string(), |ir| format!("{:02X}", ir)),
            registers.accumulator,
            registers.x_reg,
            registers.y_reg,
            registers.z_flag
        );
    }

    fn show_processes(&mut self, processes: &[&ProcessControlBlock]) {
        for pcb in processes {
            log::trace!(target: "monitor", "{}", pcb);
        }
    }
}
