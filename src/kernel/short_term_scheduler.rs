use std::collections::VecDeque;

use super::cpu::Cpu;
use super::error::{DispatchError, SchedulerError};
use super::file_system::FileSystemDriver;
use super::long_term_scheduler::LongTermScheduler;
use super::memory_manager::MemoryManager;
use super::process_control_block::{Pid, ProcessControlBlock, ProcessState};
use super::schedule::{ScheduleKind, SchedulePolicy};

use crate::io::Monitor;

/// Owns every process from admission to termination and decides which one
/// the CPU runs.
pub(crate) struct ShortTermScheduler {
    ready_queue: VecDeque<ProcessControlBlock>,
    executing: Option<ProcessControlBlock>,
    terminated: Vec<ProcessControlBlock>,
    long_term: LongTermScheduler,
    policy: SchedulePolicy,
}

impl ShortTermScheduler {
    pub fn new(policy: SchedulePolicy) -> ShortTermScheduler {
        ShortTermScheduler {
            ready_queue: VecDeque::new(),
            executing: None,
            terminated: Vec::new(),
            long_term: LongTermScheduler::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut SchedulePolicy {
        &mut self.policy
    }

    pub fn set_schedule(&mut self, kind: ScheduleKind) {
        self.policy.set_kind(kind);
        if self.policy.orders_by_priority() {
            self.sort_ready_queue();
        }
    }

    pub fn request_residency(
        &mut self,
        program: &[u8],
        priority: u32,
        memory: &mut MemoryManager,
        fs: &mut FileSystemDriver,
    ) -> Result<Pid, SchedulerError> {
        self.long_term.request_residency(program, priority, memory, fs)
    }

    /// Queues a resident process for execution. Returns false if `pid` is
    /// not resident.
    pub fn request_cpu_execution(&mut self, pid: Pid) -> bool {
        match self.long_term.take_resident(pid) {
            Some(mut pcb) => {
                pcb.state = ProcessState::Ready;
                self.enqueue_ready(pcb);
                true
            }
            None => false,
        }
    }

    /// Queues every resident process, lowest pid first.
    pub fn request_all_execution(&mut self) -> Vec<Pid> {
        self.long_term
            .resident_pids()
            .into_iter()
            .filter(|pid| self.request_cpu_execution(*pid))
            .collect()
    }

    /// Returns the executing process, dispatching the head of the ready queue
    /// if nothing runs. A process that cannot be rolled in is terminated and
    /// its swap file deleted; the error names it.
    pub fn next(
        &mut self,
        memory: &mut MemoryManager,
        fs: &mut FileSystemDriver,
    ) -> Result<Option<&mut ProcessControlBlock>, DispatchError> {
        if self.executing.is_none() {
            if let Some(mut pcb) = self.ready_queue.pop_front() {
                if let Err(cause) = self.long_term.roll_in(&mut pcb, &mut self.ready_queue, memory, fs) {
                    let pid = pcb.get_id();
                    log::warn!("Could not roll in process {}: {}", pid, cause);
                    Self::reclaim(&pcb, memory, fs);
                    self.retire(pcb);
                    return Err(DispatchError { pid, cause });
                }

                log::debug!("Dispatching process {}", pcb.get_id());
                pcb.state = ProcessState::Running;
                self.executing = Some(pcb);
            }
        }

        Ok(self.executing.as_mut())
    }

    pub fn executing(&self) -> Option<&ProcessControlBlock> {
        self.executing.as_ref()
    }

    pub fn executing_pid(&self) -> Option<Pid> {
        self.executing.as_ref().map(ProcessControlBlock::get_id)
    }

    /// True when no process is executing or waiting to.
    pub fn is_idle(&self) -> bool {
        self.executing.is_none() && self.ready_queue.is_empty()
    }

    pub fn update_stats(&mut self) {
        for pcb in self.ready_queue.iter_mut() {
            pcb.cycles_in_ready += 1;
        }
        if let Some(pcb) = self.executing.as_mut() {
            pcb.cycles_executing += 1;
        }
    }

    /// Saves the executing process back to the ready queue and dispatches the
    /// next one into the CPU. Returns false when nothing else is ready.
    pub fn context_switch(
        &mut self,
        cpu: &mut Cpu,
        memory: &mut MemoryManager,
        fs: &mut FileSystemDriver,
    ) -> Result<bool, DispatchError> {
        self.policy.did_context_switch();

        if self.ready_queue.is_empty() {
            log::trace!("Context switch skipped, no other process is ready");
            return Ok(false);
        }

        if let Some(mut pcb) = self.executing.take() {
            log::debug!("Switching out process {}", pcb.get_id());
            cpu.save_into(&mut pcb);
            pcb.fresh = true;
            pcb.state = ProcessState::Ready;
            self.enqueue_ready(pcb);
        }

        if let Some(pcb) = self.next(memory, fs)? {
            cpu.restore_from(pcb);
            pcb.fresh = false;
            cpu.set_executing(true);
        }
        Ok(true)
    }

    /// Removes `pid` wherever it is tracked, reclaims its segment or swap file
    /// and moves it to the terminated list.
    pub fn request_graceful_termination(
        &mut self,
        pid: Pid,
        cpu: &mut Cpu,
        monitor: &mut dyn Monitor,
        memory: &mut MemoryManager,
        fs: &mut FileSystemDriver,
    ) -> Option<&ProcessControlBlock> {
        let removed = if self.executing_pid() == Some(pid) {
            cpu.set_executing(false);
            cpu.reset(monitor);
            self.policy.did_context_switch();
            self.executing.take()
        } else if let Some(idx) = self.ready_queue.iter().position(|pcb| pcb.get_id() == pid) {
            self.ready_queue.remove(idx)
        } else {
            self.long_term.take_resident(pid)
        };
        let pcb = removed?;

        Self::reclaim(&pcb, memory, fs);
        log::info!("Process {} terminated", pid);
        self.retire(pcb);
        self.terminated.last()
    }

    /// Drops every resident process held in memory and clears all segments.
    /// Refused while anything is ready or executing.
    pub fn clear_memory(&mut self, memory: &mut MemoryManager) -> Option<Vec<Pid>> {
        if !self.is_idle() {
            return None;
        }

        let dropped: Vec<Pid> = self
            .long_term
            .drain_in_memory()
            .into_iter()
            .map(|pcb| {
                let pid = pcb.get_id();
                self.retire(pcb);
                pid
            })
            .collect();
        memory.evacuate(None);

        Some(dropped)
    }

    /// In priority mode, true if the head of the ready queue is strictly more
    /// urgent than the executing process.
    pub fn should_preempt(&self) -> bool {
        if !self.policy.orders_by_priority() {
            return false;
        }

        match (self.executing.as_ref(), self.ready_queue.front()) {
            (Some(executing), Some(head)) => head.get_priority() < executing.get_priority(),
            _ => false,
        }
    }

    /// Every process not yet terminated: executing first, then ready, then
    /// resident.
    pub fn processes(&self) -> Vec<&ProcessControlBlock> {
        self.executing
            .iter()
            .chain(self.ready_queue.iter())
            .chain(self.long_term.resident())
            .collect()
    }

    pub fn terminated(&self) -> &[ProcessControlBlock] {
        &self.terminated
    }

    pub fn is_active(&self, pid: Pid) -> bool {
        self.executing_pid() == Some(pid)
            || self.ready_queue.iter().any(|pcb| pcb.get_id() == pid)
            || self.long_term.is_resident(pid)
    }

    fn enqueue_ready(&mut self, pcb: ProcessControlBlock) {
        self.ready_queue.push_back(pcb);
        if self.policy.orders_by_priority() {
            self.sort_ready_queue();
        }
    }

    // Stable, so equal priorities keep arrival order.
    fn sort_ready_queue(&mut self) {
        self.ready_queue.make_contiguous().sort_by_key(ProcessControlBlock::get_priority);
    }

    fn reclaim(pcb: &ProcessControlBlock, memory: &mut MemoryManager, fs: &mut FileSystemDriver) {
        let pid = pcb.get_id();
        if pcb.is_in_memory() {
            memory.evacuate(Some(pid));
        } else if fs.has_swap(pid) {
            if let Err(err) = fs.delete_swap(pid) {
                log::warn!("Could not delete swap file of process {}: {}", pid, err);
            }
        }
    }

    fn retire(&mut self, mut pcb: ProcessControlBlock) {
        pcb.state = ProcessState::Terminated;
        pcb.segment = None;
        pcb.location = None;
        self.terminated.push(pcb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{BufferedConsole, Disk, NullMonitor};
    use crate::kernel::error::FileSystemError;
    use crate::kernel::interrupt::InterruptQueue;
    use crate::kernel::process_control_block::Registers;

    // NOP then branch back to the start forever.
    const SPIN: [u8; 3] = [0xEA, 0xD0, 0xFD];

    struct System {
        sts: ShortTermScheduler,
        cpu: Cpu,
        memory: MemoryManager,
        fs: FileSystemDriver,
    }

    fn system(kind: ScheduleKind) -> System {
        system_with_disk(kind, Disk::new(4, 8, 8))
    }

    fn system_with_disk(kind: ScheduleKind, disk: Disk) -> System {
        let mut fs = FileSystemDriver::new(disk);
        fs.format().unwrap();
        System {
            sts: ShortTermScheduler::new(SchedulePolicy::new(kind, 6)),
            cpu: Cpu::new(),
            memory: MemoryManager::new(768, 3),
            fs,
        }
    }

    fn admit(s: &mut System, program: &[u8], priority: u32) -> Pid {
        let pid = s.sts.request_residency(program, priority, &mut s.memory, &mut s.fs).unwrap();
        assert!(s.sts.request_cpu_execution(pid));
        pid
    }

    /// One tick of execution, switching when the policy asks. Returns the pid
    /// that ran.
    fn tick(s: &mut System, console: &mut BufferedConsole, interrupts: &mut InterruptQueue) -> Pid {
        s.cpu.set_executing(true);
        let pcb = s.sts.next(&mut s.memory, &mut s.fs).unwrap().unwrap();
        let pid = pcb.get_id();
        s.cpu.cycle(pcb, &mut s.memory, console, &mut NullMonitor, interrupts);
        s.sts.update_stats();
        s.sts.policy_mut().did_cycle(pid);
        if s.sts.policy().should_context_switch() {
            s.sts.context_switch(&mut s.cpu, &mut s.memory, &mut s.fs).unwrap();
        }
        pid
    }

    #[test]
    fn test_scheduler_round_robin_fairness() {
        let mut s = system(ScheduleKind::RoundRobin);
        admit(&mut s, &SPIN, 1);
        admit(&mut s, &SPIN, 1);
        let mut console = BufferedConsole::new();
        let mut interrupts = InterruptQueue::new();

        let ran: Vec<Pid> = (0..12).map(|_| tick(&mut s, &mut console, &mut interrupts)).collect();

        assert_eq!(ran, [vec![0; 6], vec![1; 6]].concat());
        assert!(interrupts.is_empty());
    }

    #[test]
    fn test_scheduler_fcfs_never_switches() {
        let mut s = system(ScheduleKind::FirstComeFirstServed);
        admit(&mut s, &SPIN, 1);
        admit(&mut s, &SPIN, 1);
        let mut console = BufferedConsole::new();
        let mut interrupts = InterruptQueue::new();

        let ran: Vec<Pid> = (0..20).map(|_| tick(&mut s, &mut console, &mut interrupts)).collect();

        assert!(ran.iter().all(|pid| *pid == 0));
    }

    #[test]
    fn test_scheduler_context_switch_saves_registers() {
        let mut s = system(ScheduleKind::RoundRobin);
        admit(&mut s, &[0xA9, 0x07, 0xEA, 0xEA, 0xEA, 0xEA, 0xEA, 0xEA, 0x00], 1);
        admit(&mut s, &SPIN, 1);
        let mut console = BufferedConsole::new();
        let mut interrupts = InterruptQueue::new();

        for _ in 0..6 {
            tick(&mut s, &mut console, &mut interrupts);
        }

        let switched_out = s.sts.processes().into_iter().find(|pcb| pcb.get_id() == 0).unwrap();
        assert_eq!(switched_out.state, ProcessState::Ready);
        assert!(switched_out.fresh);
        assert_eq!(switched_out.registers.accumulator, 7);
        assert_eq!(switched_out.registers.program_counter, 7);
        assert_eq!(s.sts.executing_pid(), Some(1));
        assert_eq!(s.cpu.registers(), &Registers::default());
    }

    #[test]
    fn test_scheduler_context_switch_noop_when_ready_empty() {
        let mut s = system(ScheduleKind::RoundRobin);
        admit(&mut s, &SPIN, 1);
        s.sts.next(&mut s.memory, &mut s.fs).unwrap();

        let switched = s.sts.context_switch(&mut s.cpu, &mut s.memory, &mut s.fs).unwrap();

        assert!(!switched);
        assert_eq!(s.sts.executing_pid(), Some(0));
    }

    #[test]
    fn test_scheduler_update_stats() {
        let mut s = system(ScheduleKind::RoundRobin);
        admit(&mut s, &SPIN, 1);
        admit(&mut s, &SPIN, 1);
        s.sts.next(&mut s.memory, &mut s.fs).unwrap();

        s.sts.update_stats();
        s.sts.update_stats();

        let processes = s.sts.processes();
        assert_eq!(processes[0].cycles_executing, 2);
        assert_eq!(processes[1].cycles_in_ready, 2);
        assert_eq!(processes[1].get_wait_time(), 2);
        assert_eq!(processes[0].get_turnaround_time(), 2);
    }

    #[test]
    fn test_scheduler_request_cpu_execution_unknown_pid() {
        let mut s = system(ScheduleKind::RoundRobin);
        assert!(!s.sts.request_cpu_execution(4));
    }

    #[test]
    fn test_scheduler_priority_orders_ready_queue() {
        let mut s = system(ScheduleKind::Priority);
        admit(&mut s, &SPIN, 5);
        admit(&mut s, &SPIN, 1);
        admit(&mut s, &SPIN, 3);

        let order: Vec<Pid> = s.sts.processes().iter().map(|pcb| pcb.get_id()).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_scheduler_priority_preemption() {
        let mut s = system(ScheduleKind::Priority);
        admit(&mut s, &SPIN, 5);
        s.sts.next(&mut s.memory, &mut s.fs).unwrap();
        assert!(!s.sts.should_preempt());

        admit(&mut s, &SPIN, 2);
        assert!(s.sts.should_preempt());

        s.sts.context_switch(&mut s.cpu, &mut s.memory, &mut s.fs).unwrap();
        assert_eq!(s.sts.executing_pid(), Some(1));
        assert!(!s.sts.should_preempt());
    }

    #[test]
    fn test_scheduler_switching_to_priority_sorts_queue() {
        let mut s = system(ScheduleKind::RoundRobin);
        admit(&mut s, &SPIN, 9);
        admit(&mut s, &SPIN, 4);

        s.sts.set_schedule(ScheduleKind::Priority);

        let order: Vec<Pid> = s.sts.processes().iter().map(|pcb| pcb.get_id()).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_scheduler_terminate_executing_frees_segment() {
        let mut s = system(ScheduleKind::RoundRobin);
        admit(&mut s, &SPIN, 1);
        s.cpu.set_executing(true);
        s.sts.next(&mut s.memory, &mut s.fs).unwrap();

        let pcb = s.sts.request_graceful_termination(0, &mut s.cpu, &mut NullMonitor, &mut s.memory, &mut s.fs).unwrap();

        assert_eq!(pcb.state, ProcessState::Terminated);
        assert!(s.sts.executing().is_none());
        assert!(!s.cpu.is_executing());
        assert!(!s.memory.is_occupied(0));
        assert!(s.memory.raw().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn test_scheduler_terminate_unknown_pid() {
        let mut s = system(ScheduleKind::RoundRobin);
        assert!(s.sts.request_graceful_termination(3, &mut s.cpu, &mut NullMonitor, &mut s.memory, &mut s.fs).is_none());
    }

    #[test]
    fn test_scheduler_terminate_swapped_process_deletes_swap() {
        let mut s = system(ScheduleKind::RoundRobin);
        for _ in 0..4 {
            admit(&mut s, &SPIN, 1);
        }
        assert!(s.fs.has_swap(3));

        s.sts.request_graceful_termination(3, &mut s.cpu, &mut NullMonitor, &mut s.memory, &mut s.fs).unwrap();

        assert!(!s.fs.has_swap(3));
        assert!(!s.sts.is_active(3));
    }

    #[test]
    fn test_scheduler_dispatch_rolls_in_swapped_process() {
        let mut s = system(ScheduleKind::RoundRobin);
        for _ in 0..4 {
            admit(&mut s, &SPIN, 1);
        }
        let mut console = BufferedConsole::new();
        let mut interrupts = InterruptQueue::new();

        let ran: Vec<Pid> = (0..24).map(|_| tick(&mut s, &mut console, &mut interrupts)).collect();

        let expected: Vec<Pid> = (0..4).flat_map(|pid| vec![pid; 6]).collect();
        assert_eq!(ran, expected);
        assert!(interrupts.is_empty(), "{}", console.output());
        assert!(s.memory.is_full());
        assert_eq!(s.sts.processes().iter().filter(|pcb| pcb.is_on_disk()).count(), 1);
    }

    #[test]
    fn test_scheduler_failed_roll_in_deletes_swap_file() {
        // Three content blocks are left once the fourth program is swapped,
        // too few for a whole segment.
        let mut s = system_with_disk(ScheduleKind::RoundRobin, Disk::new(2, 1, 4));
        for _ in 0..3 {
            s.sts.request_residency(&SPIN, 1, &mut s.memory, &mut s.fs).unwrap();
        }
        admit(&mut s, &SPIN, 1);
        assert!(s.fs.has_swap(3));

        let err = s.sts.next(&mut s.memory, &mut s.fs).unwrap_err();

        assert_eq!(err.pid, 3);
        assert_eq!(err.cause, SchedulerError::FileSystem(FileSystemError::NoAvailableSpace));
        assert!(!s.fs.has_swap(3));
        assert_eq!(
            s.fs.read_bytes(&FileSystemDriver::derive_swap_file_name(3)),
            Err(FileSystemError::FileNotFound(".swap3".to_string()))
        );
        assert_eq!(s.sts.terminated()[0].get_id(), 3);
        assert!(s.sts.executing().is_none());
        assert!(s.memory.is_full());
        assert!(s.sts.processes().iter().all(|pcb| pcb.is_in_memory()));

        // The freed blocks are usable again.
        s.fs.store_swap(9, &[0; 240]).unwrap();
    }

    #[test]
    fn test_scheduler_clear_memory() {
        let mut s = system(ScheduleKind::RoundRobin);
        s.sts.request_residency(&SPIN, 1, &mut s.memory, &mut s.fs).unwrap();
        admit(&mut s, &SPIN, 1);

        assert!(s.sts.clear_memory(&mut s.memory).is_none());

        s.sts.request_graceful_termination(1, &mut s.cpu, &mut NullMonitor, &mut s.memory, &mut s.fs);
        assert_eq!(s.sts.clear_memory(&mut s.memory), Some(vec![0]));
        assert!(!s.memory.is_full());
        assert!(s.sts.processes().is_empty());
    }
}
