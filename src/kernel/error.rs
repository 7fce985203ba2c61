use std::fmt;

use super::process_control_block::Pid;

use crate::io::DiskLocation;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// Physical address outside the byte store.
    OutOfRange { address: usize },
    /// Every segment is occupied.
    OutOfMemory,
    /// Logical address outside the executing process's segment.
    SegmentationFault { pid: Pid, address: usize },
    /// The process holds no segment.
    NotResident { pid: Pid },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryError::OutOfRange { address } => {
                write!(f, "Memory address {:#06X} is out of range", address)
            }
            MemoryError::OutOfMemory => {
                write!(f, "There is not enough memory to load a new program")
            }
            MemoryError::SegmentationFault { pid, address } => write!(
                f,
                "Process {} attempted to access memory address {:02X}, which is out of its segment",
                pid, address
            ),
            MemoryError::NotResident { pid } => {
                write!(f, "Process {} is not resident in memory", pid)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSystemError {
    NotFormatted,
    FileNotFound(String),
    FileAlreadyExists(String),
    NoAvailableSpace,
    /// Empty names, which no directory entry can hold.
    InvalidName(String),
    NameTooLong(String),
    /// Dot-prefixed names belong to the kernel's swap files.
    ReservedName(String),
    /// A pointer chain that never reaches its terminus.
    CorruptChain(DiskLocation),
    NoActiveSwap(Pid),
    InvalidLocation(DiskLocation),
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileSystemError::NotFormatted => write!(f, "The disk is not formatted"),
            FileSystemError::FileNotFound(name) => write!(f, "File {} does not exist", name),
            FileSystemError::FileAlreadyExists(name) => write!(f, "File {} already exists", name),
            FileSystemError::NoAvailableSpace => write!(f, "No available space on disk"),
            FileSystemError::InvalidName(name) => write!(f, "File name {:?} is not valid", name),
            FileSystemError::NameTooLong(name) => write!(f, "File name {} is too long", name),
            FileSystemError::ReservedName(name) => write!(f, "File name {} is reserved", name),
            FileSystemError::CorruptChain(location) => {
                write!(f, "Block chain starting at {} never terminates", location)
            }
            FileSystemError::NoActiveSwap(pid) => {
                write!(f, "Process {} has no swap file on disk", pid)
            }
            FileSystemError::InvalidLocation(location) => {
                write!(f, "Disk location {} does not exist", location)
            }
        }
    }
}

impl std::error::Error for FileSystemError {}

/// Everything that aborts one instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CpuFault {
    UnknownOpcode(u8),
    InvalidSysArgument(u8),
    Memory(MemoryError),
}

impl fmt::Display for CpuFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CpuFault::UnknownOpcode(opcode) => write!(f, "Unknown opcode: {:02X}", opcode),
            CpuFault::InvalidSysArgument(x) => {
                write!(f, "Invalid system call: X register holds {:02X}", x)
            }
            CpuFault::Memory(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for CpuFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CpuFault::Memory(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemoryError> for CpuFault {
    fn from(err: MemoryError) -> CpuFault {
        CpuFault::Memory(err)
    }
}

/// Failures while moving a process between memory and disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    Memory(MemoryError),
    FileSystem(FileSystemError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchedulerError::Memory(err) => err.fmt(f),
            SchedulerError::FileSystem(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Memory(err) => Some(err),
            SchedulerError::FileSystem(err) => Some(err),
        }
    }
}

impl From<MemoryError> for SchedulerError {
    fn from(err: MemoryError) -> SchedulerError {
        SchedulerError::Memory(err)
    }
}

impl From<FileSystemError> for SchedulerError {
    fn from(err: FileSystemError) -> SchedulerError {
        SchedulerError::FileSystem(err)
    }
}

/// A ready process that could not be brought into memory. The process has
/// already been terminated when this is returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchError {
    pub pid: Pid,
    pub cause: SchedulerError,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Could not dispatch process {}: {}", self.pid, self.cause)
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
