//! Linked-block file system on top of the raw [`Disk`].
//!
//! Track 0 holds directory blocks, one per file, whose payload is the file
//! name and whose pointer leads to the first content block. `(0,0,0)` is the
//! master boot record. Content blocks on the remaining tracks form a singly
//! linked list ending at a block that points to itself.

use std::collections::BTreeSet;
use std::fmt;

use super::device_driver::{DeviceDriver, DriverStatus};
use super::error::FileSystemError;
use super::process_control_block::Pid;

use crate::io::disk::{RawBlock, BLOCK_SIZE};
use crate::io::{Disk, DiskLocation};

pub const CONTENT_SIZE: usize = 60;

const HEADER_SIZE: usize = BLOCK_SIZE - CONTENT_SIZE;
const MASTER_BOOT_RECORD: DiskLocation = DiskLocation::new(0, 0, 0);
const DIRECTORY_TRACK: u8 = 0;
/// Leads every name the kernel keeps for itself.
const RESERVED_PREFIX: char = '.';

type Res<T> = Result<T, FileSystemError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    Available,
    Occupied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FileSystemBlock {
    location: DiskLocation,
    state: BlockState,
    pointer: DiskLocation,
    contents: [u8; CONTENT_SIZE],
    len: usize,
}

impl FileSystemBlock {
    fn available(location: DiskLocation) -> FileSystemBlock {
        FileSystemBlock {
            location,
            state: BlockState::Available,
            pointer: location,
            contents: [0; CONTENT_SIZE],
            len: 0,
        }
    }

    fn occupied(location: DiskLocation) -> FileSystemBlock {
        FileSystemBlock {
            state: BlockState::Occupied,
            ..FileSystemBlock::available(location)
        }
    }

    /// Byte 0 packs the occupied flag (bit 0) with the payload length
    /// (bits 1-6), bytes 1-3 hold the pointer, the rest is payload.
    fn serialize(&self) -> RawBlock {
        let mut raw = [0; BLOCK_SIZE];
        let occupied = u8::from(self.state == BlockState::Occupied);
        raw[0] = ((self.len as u8) << 1) | occupied;
        raw[1..HEADER_SIZE].copy_from_slice(&self.pointer.to_bytes());
        raw[HEADER_SIZE..].copy_from_slice(&self.contents);
        raw
    }

    fn deserialize(location: DiskLocation, raw: &RawBlock) -> FileSystemBlock {
        let mut contents = [0; CONTENT_SIZE];
        contents.copy_from_slice(&raw[HEADER_SIZE..]);

        FileSystemBlock {
            location,
            state: if raw[0] & 1 == 1 {
                BlockState::Occupied
            } else {
                BlockState::Available
            },
            pointer: DiskLocation::from_bytes([raw[1], raw[2], raw[3]]),
            contents,
            len: ((raw[0] >> 1) as usize).min(CONTENT_SIZE),
        }
    }

    fn is_terminus(&self) -> bool {
        self.pointer == self.location
    }

    fn payload(&self) -> &[u8] {
        &self.contents[..self.len]
    }

    fn remaining(&self) -> usize {
        CONTENT_SIZE - self.len
    }

    /// Fills the block from `data`, returning what did not fit.
    fn fill<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let n = self.remaining().min(data.len());
        self.contents[self.len..self.len + n].copy_from_slice(&data[..n]);
        self.len += n;
        &data[n..]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSystemRequest {
    Format,
    Create(String),
    Write { name: String, data: String },
    Read(String),
    Delete(String),
    List,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSystemReply {
    Formatted,
    Created(String),
    Written(String),
    Contents(String),
    Deleted(String),
    Listing(Vec<String>),
}

impl fmt::Display for FileSystemReply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileSystemReply::Formatted => write!(f, "Formatted disk."),
            FileSystemReply::Created(name) => write!(f, "Created file {}.", name),
            FileSystemReply::Written(name) => write!(f, "Wrote to file {}.", name),
            FileSystemReply::Contents(contents) => f.write_str(contents),
            FileSystemReply::Deleted(name) => write!(f, "Deleted file {}.", name),
            FileSystemReply::Listing(names) if names.is_empty() => write!(f, "No files on disk."),
            FileSystemReply::Listing(names) => f.write_str(&names.join(" ")),
        }
    }
}

pub struct FileSystemDriver {
    disk: Disk,
    status: DriverStatus,
    formatted: bool,
    available_directory: BTreeSet<DiskLocation>,
    available_content: BTreeSet<DiskLocation>,
    active_swaps: BTreeSet<Pid>,
}

impl FileSystemDriver {
    pub fn new(disk: Disk) -> FileSystemDriver {
        FileSystemDriver {
            disk,
            status: DriverStatus::Unloaded,
            formatted: false,
            available_directory: BTreeSet::new(),
            available_content: BTreeSet::new(),
            active_swaps: BTreeSet::new(),
        }
    }

    pub fn format(&mut self) -> Res<()> {
        let locations: Vec<DiskLocation> = self.disk.locations().collect();
        for location in &locations {
            self.write_block(&FileSystemBlock::available(*location))?;
        }

        let mut boot_record = FileSystemBlock::occupied(MASTER_BOOT_RECORD);
        boot_record.fill(b"MBR");
        self.write_block(&boot_record)?;

        self.available_directory = locations
            .iter()
            .copied()
            .filter(|l| l.track == DIRECTORY_TRACK && *l != MASTER_BOOT_RECORD)
            .collect();
        self.available_content = locations
            .iter()
            .copied()
            .filter(|l| l.track != DIRECTORY_TRACK)
            .collect();
        self.active_swaps.clear();
        self.formatted = true;

        log::info!(
            "Formatted disk: {} directory blocks, {} content blocks",
            self.available_directory.len(),
            self.available_content.len()
        );
        Ok(())
    }

    pub fn create_file(&mut self, name: &str) -> Res<()> {
        self.ensure_formatted()?;
        if name.is_empty() {
            return Err(FileSystemError::InvalidName(name.to_string()));
        }
        if name.len() > CONTENT_SIZE {
            return Err(FileSystemError::NameTooLong(name.to_string()));
        }
        if self.find_directory_block(name)?.is_some() {
            return Err(FileSystemError::FileAlreadyExists(name.to_string()));
        }

        let location = self
            .available_directory
            .pop_first()
            .ok_or(FileSystemError::NoAvailableSpace)?;
        let mut block = FileSystemBlock::occupied(location);
        block.fill(name.as_bytes());
        self.write_block(&block)?;

        log::debug!("Created file {} at {}", name, location);
        Ok(())
    }

    pub fn append_to_file(&mut self, name: &str, data: &[u8]) -> Res<()> {
        self.ensure_formatted()?;
        let directory = self.require_directory_block(name)?;
        let chain = self.walk_chain(&directory)?;

        let tail_room = chain.last().map_or(0, FileSystemBlock::remaining);
        let blocks_needed = data.len().saturating_sub(tail_room).div_ceil(CONTENT_SIZE);
        if blocks_needed > self.available_content.len() {
            return Err(FileSystemError::NoAvailableSpace);
        }
        if data.is_empty() {
            return Ok(());
        }

        let current = match chain.into_iter().last() {
            Some(tail) => tail,
            None => {
                let mut directory = directory;
                let first = self.claim_content_block()?;
                directory.pointer = first.location;
                self.write_block(&directory)?;
                first
            }
        };

        self.fill_chain(current, data)
    }

    /// Replaces the contents of `name` with `data`.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Res<()> {
        self.ensure_formatted()?;
        let mut directory = self.require_directory_block(name)?;
        let chain = self.walk_chain(&directory)?;

        let blocks_needed = data.len().div_ceil(CONTENT_SIZE);
        if blocks_needed > self.available_content.len() + chain.len() {
            return Err(FileSystemError::NoAvailableSpace);
        }

        self.release_blocks(&chain)?;
        directory.pointer = directory.location;
        self.write_block(&directory)?;

        self.append_to_file(name, data)
    }

    pub fn read_file(&self, name: &str) -> Res<String> {
        let bytes = self.read_bytes(name)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn read_bytes(&self, name: &str) -> Res<Vec<u8>> {
        self.ensure_formatted()?;
        let directory = self.require_directory_block(name)?;

        Ok(self
            .walk_chain(&directory)?
            .iter()
            .flat_map(|block| block.payload().iter().copied())
            .collect())
    }

    pub fn delete_file(&mut self, name: &str) -> Res<()> {
        self.ensure_formatted()?;
        let directory = self.require_directory_block(name)?;
        let chain = self.walk_chain(&directory)?;

        self.release_blocks(&chain)?;
        self.write_block(&FileSystemBlock::available(directory.location))?;
        self.available_directory.insert(directory.location);

        log::debug!("Deleted file {} ({} content blocks)", name, chain.len());
        Ok(())
    }

    /// Names of every user-visible file.
    pub fn ls(&self) -> Res<Vec<String>> {
        self.ensure_formatted()?;
        Ok(self
            .directory_blocks()?
            .into_iter()
            .map(|block| String::from_utf8_lossy(block.payload()).into_owned())
            .filter(|name| !name.starts_with(RESERVED_PREFIX))
            .collect())
    }

    pub fn derive_swap_file_name(pid: Pid) -> String {
        format!("{}swap{}", RESERVED_PREFIX, pid)
    }

    /// Names reachable through requests: non-empty and outside the reserved
    /// swap namespace.
    fn check_user_name(name: &str) -> Res<()> {
        if name.is_empty() {
            return Err(FileSystemError::InvalidName(name.to_string()));
        }
        if name.starts_with(RESERVED_PREFIX) {
            return Err(FileSystemError::ReservedName(name.to_string()));
        }
        Ok(())
    }

    pub fn has_swap(&self, pid: Pid) -> bool {
        self.active_swaps.contains(&pid)
    }

    /// Writes a rolled-out process image to its swap file.
    pub fn store_swap(&mut self, pid: Pid, program: &[u8]) -> Res<()> {
        self.ensure_formatted()?;
        let name = Self::derive_swap_file_name(pid);
        let blocks_needed = program.len().div_ceil(CONTENT_SIZE);
        if self.available_directory.is_empty() || blocks_needed > self.available_content.len() {
            return Err(FileSystemError::NoAvailableSpace);
        }

        self.create_file(&name)?;
        if let Err(err) = self.append_to_file(&name, program) {
            self.delete_file(&name)?;
            return Err(err);
        }
        self.active_swaps.insert(pid);

        log::debug!("Wrote {} bytes of process {} to {}", program.len(), pid, name);
        Ok(())
    }

    /// Reads back and removes the swap file of `pid`.
    pub fn delete_swap(&mut self, pid: Pid) -> Res<Vec<u8>> {
        if !self.active_swaps.contains(&pid) {
            return Err(FileSystemError::NoActiveSwap(pid));
        }

        let name = Self::derive_swap_file_name(pid);
        let program = self.read_bytes(&name)?;
        self.delete_file(&name)?;
        self.active_swaps.remove(&pid);

        log::debug!("Read back process {} from {}", pid, name);
        Ok(program)
    }

    fn ensure_formatted(&self) -> Res<()> {
        if self.formatted {
            Ok(())
        } else {
            Err(FileSystemError::NotFormatted)
        }
    }

    fn read_block(&self, location: DiskLocation) -> Res<FileSystemBlock> {
        let raw = self
            .disk
            .read_block(location)
            .ok_or(FileSystemError::InvalidLocation(location))?;
        Ok(FileSystemBlock::deserialize(location, &raw))
    }

    fn write_block(&mut self, block: &FileSystemBlock) -> Res<()> {
        self.disk
            .write_block(block.location, &block.serialize())
            .ok_or(FileSystemError::InvalidLocation(block.location))
    }

    fn directory_blocks(&self) -> Res<Vec<FileSystemBlock>> {
        let locations: Vec<DiskLocation> = self
            .disk
            .locations()
            .filter(|l| l.track == DIRECTORY_TRACK && *l != MASTER_BOOT_RECORD)
            .collect();

        let mut blocks = Vec::new();
        for location in locations {
            let block = self.read_block(location)?;
            if block.state == BlockState::Occupied {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    fn find_directory_block(&self, name: &str) -> Res<Option<FileSystemBlock>> {
        Ok(self
            .directory_blocks()?
            .into_iter()
            .find(|block| block.payload() == name.as_bytes()))
    }

    fn require_directory_block(&self, name: &str) -> Res<FileSystemBlock> {
        self.find_directory_block(name)?
            .ok_or_else(|| FileSystemError::FileNotFound(name.to_string()))
    }

    /// The content blocks hanging off `directory`, in order. A chain longer
    /// than the disk has blocks is reported as corrupt.
    fn walk_chain(&self, directory: &FileSystemBlock) -> Res<Vec<FileSystemBlock>> {
        let max_hops = self.disk.locations().count();
        let mut chain: Vec<FileSystemBlock> = Vec::new();
        let mut current = directory.clone();

        while !current.is_terminus() {
            if chain.len() >= max_hops {
                return Err(FileSystemError::CorruptChain(directory.location));
            }
            current = self.read_block(current.pointer)?;
            chain.push(current.clone());
        }

        Ok(chain)
    }

    fn claim_content_block(&mut self) -> Res<FileSystemBlock> {
        let location = self
            .available_content
            .pop_first()
            .ok_or(FileSystemError::NoAvailableSpace)?;
        Ok(FileSystemBlock::occupied(location))
    }

    fn fill_chain(&mut self, mut current: FileSystemBlock, data: &[u8]) -> Res<()> {
        let mut rest = current.fill(data);

        while !rest.is_empty() {
            let mut next = self.claim_content_block()?;
            current.pointer = next.location;
            self.write_block(&current)?;

            rest = next.fill(rest);
            current = next;
        }

        self.write_block(&current)
    }

    fn release_blocks(&mut self, blocks: &[FileSystemBlock]) -> Res<()> {
        for block in blocks {
            self.write_block(&FileSystemBlock::available(block.location))?;
            self.available_content.insert(block.location);
        }
        Ok(())
    }
}

impl DeviceDriver for FileSystemDriver {
    type Request = FileSystemRequest;
    type Response = Res<FileSystemReply>;

    fn driver_entry(&mut self) {
        self.status = DriverStatus::Loaded;
    }

    fn status(&self) -> DriverStatus {
        self.status
    }

    fn isr(&mut self, request: FileSystemRequest) -> Res<FileSystemReply> {
        match request {
            FileSystemRequest::Format => {
                self.format()?;
                Ok(FileSystemReply::Formatted)
            }
            FileSystemRequest::Create(name) => {
                Self::check_user_name(&name)?;
                self.create_file(&name)?;
                Ok(FileSystemReply::Created(name))
            }
            FileSystemRequest::Write { name, data } => {
                Self::check_user_name(&name)?;
                self.write_file(&name, data.as_bytes())?;
                Ok(FileSystemReply::Written(name))
            }
            FileSystemRequest::Read(name) => {
                Self::check_user_name(&name)?;
                Ok(FileSystemReply::Contents(self.read_file(&name)?))
            }
            FileSystemRequest::Delete(name) => {
                Self::check_user_name(&name)?;
                self.delete_file(&name)?;
                Ok(FileSystemReply::Deleted(name))
            }
            FileSystemRequest::List => Ok(FileSystemReply::Listing(self.ls()?)),
        }
    }
}
