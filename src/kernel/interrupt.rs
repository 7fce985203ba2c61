use std::collections::VecDeque;
use std::fmt;

use super::file_system::FileSystemRequest;
use super::process_control_block::Pid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interrupt {
    Timer,
    Keyboard(char),
    LoadProgram { program: String, priority: Option<u32> },
    RunProgram(Pid),
    BreakProgram(Pid),
    ErrProgram(Pid),
    RequestClearMemory,
    ContextSwitch,
    RunAllPrograms,
    KillProgram(Pid),
    FileSystem(FileSystemRequest),
    /// An IRQ number the kernel has no routine for.
    Unrecognized(u32),
}

impl Interrupt {
    pub fn irq(&self) -> u32 {
        match self {
            Interrupt::Timer => 0,
            Interrupt::Keyboard(_) => 1,
            Interrupt::LoadProgram { .. } => 2,
            Interrupt::RunProgram(_) => 3,
            Interrupt::BreakProgram(_) => 4,
            Interrupt::ErrProgram(_) => 5,
            Interrupt::RequestClearMemory => 6,
            Interrupt::ContextSwitch => 7,
            Interrupt::RunAllPrograms => 8,
            Interrupt::KillProgram(_) => 9,
            Interrupt::FileSystem(_) => 10,
            Interrupt::Unrecognized(irq) => *irq,
        }
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Interrupt::Timer => write!(f, "TIMER"),
            Interrupt::Keyboard(key) => write!(f, "KEYBOARD({:?})", key),
            Interrupt::LoadProgram { priority, .. } => write!(f, "LOAD_PROGRAM(priority={:?})", priority),
            Interrupt::RunProgram(pid) => write!(f, "RUN_PROGRAM({})", pid),
            Interrupt::BreakProgram(pid) => write!(f, "BREAK_PROGRAM({})", pid),
            Interrupt::ErrProgram(pid) => write!(f, "ERR_PROGRAM({})", pid),
            Interrupt::RequestClearMemory => write!(f, "REQUEST_CLEAR_MEMORY"),
            Interrupt::ContextSwitch => write!(f, "CONTEXT_SWITCH"),
            Interrupt::RunAllPrograms => write!(f, "RUN_ALL_PROGRAMS"),
            Interrupt::KillProgram(pid) => write!(f, "KILL_PROGRAM({})", pid),
            Interrupt::FileSystem(request) => write!(f, "FILE_SYSTEM({:?})", request),
            Interrupt::Unrecognized(irq) => write!(f, "UNRECOGNIZED({})", irq),
        }
    }
}

/// FIFO of pending interrupts.
#[derive(Default)]
pub struct InterruptQueue {
    queue: VecDeque<Interrupt>,
}

impl InterruptQueue {
    pub fn new() -> InterruptQueue {
        InterruptQueue::default()
    }

    pub fn enqueue(&mut self, interrupt: Interrupt) {
        self.queue.push_back(interrupt);
    }

    pub fn dequeue(&mut self) -> Option<Interrupt> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interrupt> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_queue_is_fifo() {
        let mut queue = InterruptQueue::new();
        queue.enqueue(Interrupt::RunProgram(1));
        queue.enqueue(Interrupt::ContextSwitch);
        queue.enqueue(Interrupt::BreakProgram(1));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some(Interrupt::RunProgram(1)));
        assert_eq!(queue.dequeue(), Some(Interrupt::ContextSwitch));
        assert_eq!(queue.dequeue(), Some(Interrupt::BreakProgram(1)));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_interrupt_irq_numbers() {
        assert_eq!(Interrupt::Timer.irq(), 0);
        assert_eq!(Interrupt::FileSystem(FileSystemRequest::Format).irq(), 10);
        assert_eq!(Interrupt::Unrecognized(42).irq(), 42);
    }
}
