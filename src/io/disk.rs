use std::fmt;

pub const BLOCK_SIZE: usize = 64;

pub type RawBlock = [u8; BLOCK_SIZE];

/// Address of one block on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiskLocation {
    pub track: u8,
    pub sector: u8,
    pub block: u8,
}

impl DiskLocation {
    pub const fn new(track: u8, sector: u8, block: u8) -> DiskLocation {
        DiskLocation { track, sector, block }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.track, self.sector, self.block]
    }

    pub fn from_bytes(bytes: [u8; 3]) -> DiskLocation {
        DiskLocation::new(bytes[0], bytes[1], bytes[2])
    }
}

impl fmt::Display for DiskLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{},{})", self.track, self.sector, self.block)
    }
}

/// A track/sector/block addressed store of raw 64-byte blocks. It knows
/// nothing about block layout; an unwritten location reads as `None`.
pub struct Disk {
    tracks: u8,
    sectors: u8,
    blocks: u8,
    data: Vec<Option<RawBlock>>,
}

impl Disk {
    pub fn new(tracks: u8, sectors: u8, blocks: u8) -> Disk {
        let capacity = tracks as usize * sectors as usize * blocks as usize;
        Disk {
            tracks,
            sectors,
            blocks,
            data: vec![None; capacity],
        }
    }

    pub fn is_valid_location(&self, location: DiskLocation) -> bool {
        location.track < self.tracks && location.sector < self.sectors && location.block < self.blocks
    }

    /// Every location in track, sector, block order.
    pub fn locations(&self) -> impl Iterator<Item = DiskLocation> + '_ {
        (0..self.tracks).flat_map(move |t| {
            (0..self.sectors).flat_map(move |s| (0..self.blocks).map(move |b| DiskLocation::new(t, s, b)))
        })
    }

    pub fn read_block(&self, location: DiskLocation) -> Option<RawBlock> {
        let idx = self.index_of(location)?;
        self.data[idx]
    }

    pub fn write_block(&mut self, location: DiskLocation, block: &RawBlock) -> Option<()> {
        let idx = self.index_of(location)?;
        self.data[idx] = Some(*block);
        Some(())
    }

    fn index_of(&self, location: DiskLocation) -> Option<usize> {
        if !self.is_valid_location(location) {
            return None;
        }

        let sectors = self.sectors as usize;
        let blocks = self.blocks as usize;
        Some((location.track as usize * sectors + location.sector as usize) * blocks + location.block as usize)
    }
}
