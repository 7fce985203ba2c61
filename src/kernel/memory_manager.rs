use std::collections::BTreeMap;

use super::error::MemoryError;
use super::memory::Memory;
use super::process_control_block::{Location, Pid, ProcessControlBlock};

/// An inclusive `base..=limit` range of physical memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    pub base: usize,
    pub limit: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.limit - self.base + 1
    }

    /// Maps a logical address onto this segment.
    pub fn translate(&self, logical_address: usize) -> Option<usize> {
        if logical_address < self.len() {
            Some(self.base + logical_address)
        } else {
            None
        }
    }
}

/// Fixed-partition memory manager. Owns the byte store, the segment table
/// and which process sits in which segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MemoryManager {
    memory: Memory,
    segments: Vec<Segment>,
    occupied: Vec<bool>,
    processes: BTreeMap<Pid, usize>,
}

impl MemoryManager {
    pub fn new(memory_size: usize, segment_count: usize) -> MemoryManager {
        // An empty store has no segments and is always full.
        let segment_count = if memory_size == 0 {
            0
        } else {
            segment_count.clamp(1, memory_size)
        };
        let segment_size = memory_size.checked_div(segment_count).unwrap_or(0);

        let segments: Vec<Segment> = (0..segment_count)
            .map(|i| {
                let base = i * segment_size;
                // The last segment absorbs any remainder.
                let limit = if i + 1 == segment_count {
                    memory_size - 1
                } else {
                    base + segment_size - 1
                };
                Segment { base, limit }
            })
            .collect();

        MemoryManager {
            memory: Memory::new(memory_size),
            occupied: vec![false; segments.len()],
            segments,
            processes: BTreeMap::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_size(&self) -> usize {
        self.segments.first().map_or(0, Segment::len)
    }

    pub fn is_occupied(&self, segment_idx: usize) -> bool {
        self.occupied.get(segment_idx).copied().unwrap_or(false)
    }

    pub fn is_full(&self) -> bool {
        self.occupied.iter().all(|occupied| *occupied)
    }

    pub fn is_resident(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn resident_pids(&self) -> Vec<Pid> {
        self.processes.keys().copied().collect()
    }

    pub fn raw(&self) -> &[u8] {
        self.memory.as_slice()
    }

    /// Places `program` in the first free segment and creates its PCB.
    pub fn load(&mut self, program: &[u8], pid: Pid, priority: u32) -> Result<ProcessControlBlock, MemoryError> {
        let mut pcb = ProcessControlBlock::new(pid, priority);
        self.load_from_pcb(&mut pcb, program)?;
        Ok(pcb)
    }

    /// Places `program` in the first free segment on behalf of an existing PCB,
    /// e.g. when rolling it back in from disk.
    pub fn load_from_pcb(&mut self, pcb: &mut ProcessControlBlock, program: &[u8]) -> Result<(), MemoryError> {
        let segment_idx = self
            .occupied
            .iter()
            .position(|occupied| !occupied)
            .ok_or(MemoryError::OutOfMemory)?;
        let segment = self.segments[segment_idx];

        let length = program.len().min(segment.len());
        self.memory.write_block_to(segment.base, &program[..length])?;

        self.occupied[segment_idx] = true;
        self.processes.insert(pcb.get_id(), segment_idx);

        pcb.segment = Some(segment);
        pcb.location = Some(Location::Memory);

        log::debug!(
            "Loaded process {} into segment {} ({:03X}-{:03X})",
            pcb.get_id(),
            segment_idx,
            segment.base,
            segment.limit
        );
        Ok(())
    }

    /// Zero-fills and frees the segment held by `pid`, or every occupied
    /// segment when `pid` is `None`. Returns the evacuated pids.
    pub fn evacuate(&mut self, pid: Option<Pid>) -> Vec<Pid> {
        let pids = match pid {
            Some(pid) if self.processes.contains_key(&pid) => vec![pid],
            Some(_) => Vec::new(),
            None => self.resident_pids(),
        };

        for pid in &pids {
            if let Some(segment_idx) = self.processes.remove(pid) {
                self.release_segment(segment_idx);
            }
        }

        pids
    }

    /// Frees the segment of `pcb` and hands back its contents so the caller
    /// can persist them to disk.
    pub fn dequeue_disk_candidate(&mut self, pcb: &mut ProcessControlBlock) -> Result<Vec<u8>, MemoryError> {
        let pid = pcb.get_id();
        let segment_idx = *self
            .processes
            .get(&pid)
            .ok_or(MemoryError::NotResident { pid })?;
        let segment = self.segments[segment_idx];

        let program = self.memory.read_block_from(segment.base, segment.limit)?;

        self.processes.remove(&pid);
        self.release_segment(segment_idx);
        pcb.segment = None;
        pcb.location = None;

        Ok(program)
    }

    /// Reads `logical_address` relative to the segment of the executing `pcb`.
    pub fn read_logical(&self, pcb: &ProcessControlBlock, logical_address: usize) -> Result<u8, MemoryError> {
        let address = Self::translate(pcb, logical_address)?;
        self.memory.read_from(address)
    }

    pub fn write_logical(&mut self, pcb: &ProcessControlBlock, logical_address: usize, value: u8) -> Result<u8, MemoryError> {
        let address = Self::translate(pcb, logical_address)?;
        self.memory.write_to(address, value)
    }

    fn translate(pcb: &ProcessControlBlock, logical_address: usize) -> Result<usize, MemoryError> {
        let pid = pcb.get_id();
        let segment = pcb.segment.ok_or(MemoryError::NotResident { pid })?;

        segment
            .translate(logical_address)
            .ok_or(MemoryError::SegmentationFault { pid, address: logical_address })
    }

    fn release_segment(&mut self, segment_idx: usize) {
        let segment = self.segments[segment_idx];
        if let Err(err) = self.memory.zero_fill(segment.base, segment.limit) {
            log::error!("Failed to clear segment {}: {}", segment_idx, err);
        }
        self.occupied[segment_idx] = false;
    }
}
