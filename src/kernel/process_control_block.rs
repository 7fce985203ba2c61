use std::fmt;

use super::memory_manager::Segment;

pub type Pid = u32;

/// Priority given to programs loaded without one. Lower is more urgent.
pub const DEFAULT_PRIORITY: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Uninitialized,
    Resident,
    Ready,
    Running,
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ProcessState::Uninitialized => "uninitialized",
            ProcessState::Resident => "resident",
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Where the process image currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Memory,
    Disk,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Location::Memory => f.write_str("memory"),
            Location::Disk => f.write_str("disk"),
        }
    }
}

/// The register file shared by the CPU and every saved process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub program_counter: u8,
    pub accumulator: u8,
    pub x_reg: u8,
    pub y_reg: u8,
    pub z_flag: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessControlBlock {
    pub registers: Registers,
    pub last_instruction: Option<u8>,
    pub state: ProcessState,
    /// Set when the registers above must be loaded into the CPU before the next cycle.
    pub fresh: bool,
    pub cycles_in_ready: u64,
    pub cycles_executing: u64,

    pub(crate) segment: Option<Segment>,
    pub(crate) location: Option<Location>,

    id: Pid,
    priority: u32,
}

impl ProcessControlBlock {
    pub fn new(id: Pid, priority: u32) -> ProcessControlBlock {
        ProcessControlBlock {
            registers: Registers::default(),
            last_instruction: None,
            state: ProcessState::Uninitialized,
            fresh: true,
            cycles_in_ready: 0,
            cycles_executing: 0,
            segment: None,
            location: None,
            id,
            priority,
        }
    }

    pub fn get_id(&self) -> Pid {
        self.id
    }

    pub fn get_priority(&self) -> u32 {
        self.priority
    }

    pub fn get_segment(&self) -> Option<Segment> {
        self.segment
    }

    pub fn get_location(&self) -> Option<Location> {
        self.location
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == Some(Location::Memory) && self.segment.is_some()
    }

    pub fn is_on_disk(&self) -> bool {
        self.location == Some(Location::Disk)
    }

    /// Ticks spent in the ready queue.
    pub fn get_wait_time(&self) -> u64 {
        self.cycles_in_ready
    }

    /// Ticks between entering the ready queue and termination.
    pub fn get_turnaround_time(&self) -> u64 {
        self.cycles_in_ready + self.cycles_executing
    }
}

impl fmt::Display for ProcessControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let location = self.location.map_or_else(|| "-".to_string(), |l| l.to_string());
        let priority = if self.priority == DEFAULT_PRIORITY {
            "-".to_string()
        } else {
            self.priority.to_string()
        };
        write!(
            f,
            "{:>3} {:<10} {:<6} {:>3} PC={:02X} IR={} ACC={:02X} X={:02X} Y={:02X} Z={}",
            self.id,
            self.state,
            location,
            priority,
            self.registers.program_counter,
            self.last_instruction.map_or_else(|| "--".to_string(), |ir| format!("{:02X}", ir)),
            self.registers.accumulator,
            self.registers.x_reg,
            self.registers.y_reg,
            self.registers.z_flag,
        )
    }
}
