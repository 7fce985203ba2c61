use super::error::CpuFault;
use super::instruction::{self, DecodedInstruction, Operation};
use super::interrupt::{Interrupt, InterruptQueue};
use super::memory_manager::MemoryManager;
use super::process_control_block::{ProcessControlBlock, Registers};

use crate::io::{Console, Monitor};

/// What became of the instruction once executed.
enum Step {
    Continue,
    Break,
}

pub(crate) struct Cpu {
    registers: Registers,
    last_instruction: Option<u8>,
    is_executing: bool,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            registers: Registers::default(),
            last_instruction: None,
            is_executing: false,
        }
    }

    pub fn init(&mut self, monitor: &mut dyn Monitor) {
        self.reset(monitor);
        self.is_executing = false;
    }

    /// Zeroes the register file after a fault or a terminated program and
    /// shows the cleared state.
    pub fn reset(&mut self, monitor: &mut dyn Monitor) {
        self.registers = Registers::default();
        self.last_instruction = None;
        monitor.show_cpu(&self.registers, self.last_instruction);
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn last_instruction(&self) -> Option<u8> {
        self.last_instruction
    }

    pub fn is_executing(&self) -> bool {
        self.is_executing
    }

    pub fn set_executing(&mut self, is_executing: bool) {
        self.is_executing = is_executing;
    }

    /// Copies the live registers into `pcb`.
    pub fn save_into(&self, pcb: &mut ProcessControlBlock) {
        pcb.registers = self.registers;
        pcb.last_instruction = self.last_instruction;
    }

    /// Loads the saved registers of `pcb`.
    pub fn restore_from(&mut self, pcb: &ProcessControlBlock) {
        self.registers = pcb.registers;
        self.last_instruction = pcb.last_instruction;
    }

    /// Runs exactly one instruction of `pcb`. Breaks and faults are raised as
    /// interrupts for the kernel to act on during a later tick.
    pub fn cycle(
        &mut self,
        pcb: &mut ProcessControlBlock,
        memory: &mut MemoryManager,
        console: &mut dyn Console,
        monitor: &mut dyn Monitor,
        interrupts: &mut InterruptQueue,
    ) {
        log::trace!("CPU cycle");

        if pcb.fresh {
            self.restore_from(pcb);
            pcb.fresh = false;
        }

        let pid = pcb.get_id();
        match self.fetch_and_execute(pcb, memory, console) {
            Ok(Step::Continue) => {
                self.registers.program_counter = self.registers.program_counter.wrapping_add(1);
                self.save_into(pcb);
            }
            Ok(Step::Break) => {
                interrupts.enqueue(Interrupt::BreakProgram(pid));
                self.reset(monitor);
            }
            Err(fault) => {
                log::warn!("Process {} faulted: {}", pid, fault);
                console.put_system_text(&format!("Process {} error: {}", pid, fault));
                interrupts.enqueue(Interrupt::ErrProgram(pid));
                self.reset(monitor);
            }
        }
    }

    fn fetch_and_execute(
        &mut self,
        pcb: &ProcessControlBlock,
        memory: &mut MemoryManager,
        console: &mut dyn Console,
    ) -> Result<Step, CpuFault> {
        let code = memory.read_logical(pcb, self.registers.program_counter as usize)?;
        self.last_instruction = Some(code);

        let info = instruction::lookup(code).ok_or(CpuFault::UnknownOpcode(code))?;
        let mut decoded = DecodedInstruction::new(info);

        // Look ahead for the operand bytes.
        for idx in 0..info.arg_count {
            self.registers.program_counter = self.registers.program_counter.wrapping_add(1);
            decoded.set_arg(idx, memory.read_logical(pcb, self.registers.program_counter as usize)?);
        }

        log::trace!("Process {} executing {}", pcb.get_id(), decoded);
        self.execute(&decoded, pcb, memory, console)
    }

    fn execute(
        &mut self,
        instruction: &DecodedInstruction,
        pcb: &ProcessControlBlock,
        memory: &mut MemoryManager,
        console: &mut dyn Console,
    ) -> Result<Step, CpuFault> {
        let registers = &mut self.registers;

        match instruction.info.operation {
            Operation::Break => return Ok(Step::Break),
            Operation::LoadAccConstant => registers.accumulator = instruction.constant(),
            Operation::LoadAccMemory => registers.accumulator = memory.read_logical(pcb, instruction.address())?,
            Operation::StoreAcc => {
                memory.write_logical(pcb, instruction.address(), registers.accumulator)?;
            }
            Operation::AddWithCarry => {
                let value = memory.read_logical(pcb, instruction.address())?;
                registers.accumulator = registers.accumulator.wrapping_add(value);
            }
            Operation::LoadXConstant => registers.x_reg = instruction.constant(),
            Operation::LoadXMemory => registers.x_reg = memory.read_logical(pcb, instruction.address())?,
            Operation::LoadYConstant => registers.y_reg = instruction.constant(),
            Operation::LoadYMemory => registers.y_reg = memory.read_logical(pcb, instruction.address())?,
            Operation::NoOperation => {}
            Operation::CompareX => {
                let value = memory.read_logical(pcb, instruction.address())?;
                registers.z_flag = u8::from(value == registers.x_reg);
            }
            Operation::BranchNotEqual => {
                if registers.z_flag == 0 {
                    registers.program_counter = registers.program_counter.wrapping_add(instruction.constant());
                }
            }
            Operation::Increment => {
                let address = instruction.address();
                let value = memory.read_logical(pcb, address)?.wrapping_add(1);
                memory.write_logical(pcb, address, value)?;
            }
            Operation::SystemCall => match registers.x_reg {
                1 => console.put_text(&registers.y_reg.to_string()),
                2 => {
                    let text = Self::read_string(pcb, memory, registers.y_reg as usize)?;
                    console.put_text(&text);
                }
                x => return Err(CpuFault::InvalidSysArgument(x)),
            },
        }

        Ok(Step::Continue)
    }

    /// Reads a null-terminated string. Running off the segment is a fault.
    fn read_string(pcb: &ProcessControlBlock, memory: &MemoryManager, start: usize) -> Result<String, CpuFault> {
        let mut text = String::new();
        let mut address = start;

        loop {
            let byte = memory.read_logical(pcb, address)?;
            if byte == 0 {
                return Ok(text);
            }
            text.push(char::from(byte));
            address += 1;
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
