use std::collections::{BTreeMap, VecDeque};

use super::error::{MemoryError, SchedulerError};
use super::file_system::FileSystemDriver;
use super::memory_manager::MemoryManager;
use super::process_control_block::{Location, Pid, ProcessControlBlock, ProcessState};

/// Admits programs into the system and moves process images between memory
/// and their swap files on disk.
pub(crate) struct LongTermScheduler {
    next_pid: Pid,
    resident: BTreeMap<Pid, ProcessControlBlock>,
}

impl LongTermScheduler {
    pub fn new() -> LongTermScheduler {
        LongTermScheduler {
            next_pid: 0,
            resident: BTreeMap::new(),
        }
    }

    /// Loads `program` into memory, or onto disk when every segment is taken,
    /// and registers the new process as resident.
    pub fn request_residency(
        &mut self,
        program: &[u8],
        priority: u32,
        memory: &mut MemoryManager,
        fs: &mut FileSystemDriver,
    ) -> Result<Pid, SchedulerError> {
        let pid = self.next_pid;

        let mut pcb = if memory.is_full() {
            let length = program.len().min(memory.segment_size());
            fs.store_swap(pid, &program[..length])?;

            let mut pcb = ProcessControlBlock::new(pid, priority);
            pcb.location = Some(Location::Disk);
            pcb
        } else {
            memory.load(program, pid, priority)?
        };

        pcb.state = ProcessState::Resident;
        self.next_pid += 1;
        self.resident.insert(pid, pcb);

        log::info!("Process {} resident on {}", pid, if memory.is_resident(pid) { "memory" } else { "disk" });
        Ok(pid)
    }

    pub fn is_resident(&self, pid: Pid) -> bool {
        self.resident.contains_key(&pid)
    }

    pub fn take_resident(&mut self, pid: Pid) -> Option<ProcessControlBlock> {
        self.resident.remove(&pid)
    }

    pub fn resident_pids(&self) -> Vec<Pid> {
        self.resident.keys().copied().collect()
    }

    pub fn resident(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.resident.values()
    }

    /// Removes every resident process whose image sits in memory.
    pub fn drain_in_memory(&mut self) -> Vec<ProcessControlBlock> {
        let pids: Vec<Pid> = self
            .resident
            .values()
            .filter(|pcb| pcb.is_in_memory())
            .map(ProcessControlBlock::get_id)
            .collect();

        pids.iter().filter_map(|pid| self.resident.remove(pid)).collect()
    }

    /// Brings `pcb` back into memory from its swap file. When memory is full a
    /// victim is rolled out first: the ready queue is scanned tail to head for
    /// the first process in memory, then the newest resident process.
    pub fn roll_in(
        &mut self,
        pcb: &mut ProcessControlBlock,
        ready_queue: &mut VecDeque<ProcessControlBlock>,
        memory: &mut MemoryManager,
        fs: &mut FileSystemDriver,
    ) -> Result<(), SchedulerError> {
        if !pcb.is_on_disk() {
            return Ok(());
        }

        if memory.is_full() {
            let victim = ready_queue
                .iter_mut()
                .rev()
                .find(|candidate| candidate.is_in_memory())
                .or_else(|| self.resident.values_mut().rev().find(|candidate| candidate.is_in_memory()))
                .ok_or(MemoryError::OutOfMemory)?;

            Self::roll_out(victim, memory, fs)?;
        }

        let program = fs.delete_swap(pcb.get_id())?;
        memory.load_from_pcb(pcb, &program)?;

        log::debug!("Rolled in process {}", pcb.get_id());
        Ok(())
    }

    /// Moves the memory image of `victim` into its swap file. Memory is left
    /// untouched if the disk cannot take it.
    pub fn roll_out(
        victim: &mut ProcessControlBlock,
        memory: &mut MemoryManager,
        fs: &mut FileSystemDriver,
    ) -> Result<(), SchedulerError> {
        let program = memory.dequeue_disk_candidate(victim)?;

        if let Err(err) = fs.store_swap(victim.get_id(), &program) {
            memory.load_from_pcb(victim, &program)?;
            return Err(err.into());
        }
        victim.location = Some(Location::Disk);

        log::debug!("Rolled out process {}", victim.get_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Disk;
    use crate::kernel::error::FileSystemError;

    fn system() -> (LongTermScheduler, MemoryManager, FileSystemDriver) {
        let mut fs = FileSystemDriver::new(Disk::new(4, 8, 8));
        fs.format().unwrap();
        (LongTermScheduler::new(), MemoryManager::new(768, 3), fs)
    }

    #[test]
    fn test_long_term_scheduler_assigns_increasing_pids() {
        let (mut lts, mut memory, mut fs) = system();

        assert_eq!(lts.request_residency(&[0xEA], 1, &mut memory, &mut fs), Ok(0));
        assert_eq!(lts.request_residency(&[0xEA], 1, &mut memory, &mut fs), Ok(1));
        assert_eq!(lts.resident_pids(), vec![0, 1]);
        assert!(lts.resident().all(|pcb| pcb.state == ProcessState::Resident));
    }

    #[test]
    fn test_long_term_scheduler_spills_to_disk_when_memory_full() {
        let (mut lts, mut memory, mut fs) = system();
        for _ in 0..3 {
            lts.request_residency(&[0xEA], 1, &mut memory, &mut fs).unwrap();
        }

        let pid = lts.request_residency(&[0xA9, 0x04, 0x00], 1, &mut memory, &mut fs).unwrap();

        let pcb = lts.take_resident(pid).unwrap();
        assert!(pcb.is_on_disk());
        assert!(fs.has_swap(pid));
        assert_eq!(&fs.delete_swap(pid).unwrap(), &[0xA9, 0x04, 0x00]);
    }

    #[test]
    fn test_long_term_scheduler_failed_residency_keeps_pid() {
        let (mut lts, mut memory, _) = system();
        let mut unformatted = FileSystemDriver::new(Disk::new(4, 8, 8));
        for _ in 0..3 {
            lts.request_residency(&[0xEA], 1, &mut memory, &mut unformatted).unwrap();
        }

        let result = lts.request_residency(&[0xEA], 1, &mut memory, &mut unformatted);

        assert_eq!(result, Err(SchedulerError::FileSystem(FileSystemError::NotFormatted)));
        assert_eq!(lts.resident_pids(), vec![0, 1, 2]);
    }

    #[test]
    fn test_long_term_scheduler_roll_in_evicts_ready_tail() {
        let (mut lts, mut memory, mut fs) = system();
        for _ in 0..4 {
            lts.request_residency(&[0xA9, 0x01, 0x00], 1, &mut memory, &mut fs).unwrap();
        }
        let mut ready: VecDeque<_> = (0..3).filter_map(|pid| lts.take_resident(pid)).collect();
        let mut incoming = lts.take_resident(3).unwrap();
        let victim_image = memory.raw()[512..768].to_vec();

        lts.roll_in(&mut incoming, &mut ready, &mut memory, &mut fs).unwrap();

        assert!(incoming.is_in_memory());
        assert_eq!(incoming.get_segment().unwrap().base, 512);
        assert!(!fs.has_swap(3));

        let victim = ready.back().unwrap();
        assert_eq!(victim.get_id(), 2);
        assert!(victim.is_on_disk());
        assert!(ready.iter().take(2).all(ProcessControlBlock::is_in_memory));
        assert_eq!(fs.delete_swap(2).unwrap(), victim_image);
    }

    #[test]
    fn test_long_term_scheduler_roll_in_falls_back_to_resident_victim() {
        let (mut lts, mut memory, mut fs) = system();
        for _ in 0..4 {
            lts.request_residency(&[0xEA], 1, &mut memory, &mut fs).unwrap();
        }
        let mut ready = VecDeque::new();
        let mut incoming = lts.take_resident(3).unwrap();

        lts.roll_in(&mut incoming, &mut ready, &mut memory, &mut fs).unwrap();

        assert!(incoming.is_in_memory());
        assert!(fs.has_swap(2));
        assert!(lts.resident().any(|pcb| pcb.get_id() == 2 && pcb.is_on_disk()));
    }

    #[test]
    fn test_long_term_scheduler_roll_in_noop_for_memory_resident() {
        let (mut lts, mut memory, mut fs) = system();
        lts.request_residency(&[0xEA], 1, &mut memory, &mut fs).unwrap();
        let mut pcb = lts.take_resident(0).unwrap();
        let before = memory.clone();

        lts.roll_in(&mut pcb, &mut VecDeque::new(), &mut memory, &mut fs).unwrap();

        assert_eq!(memory, before);
    }
}
