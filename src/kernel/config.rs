use std::fmt;

use super::schedule::{ScheduleKind, DEFAULT_QUANTUM};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    NoMemory,
    NoSegments,
    /// More segments than bytes to put in them.
    TooManySegments { memory_size: usize, segment_count: usize },
    EmptyDisk,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::NoMemory => write!(f, "Memory size must be at least one byte"),
            ConfigError::NoSegments => write!(f, "Memory needs at least one segment"),
            ConfigError::TooManySegments {
                memory_size,
                segment_count,
            } => write!(
                f,
                "Cannot split {} bytes of memory into {} segments",
                memory_size, segment_count
            ),
            ConfigError::EmptyDisk => write!(f, "Disk tracks, sectors and blocks must all be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Machine geometry and scheduling settings the kernel boots with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelConfig {
    pub memory_size: usize,
    pub segment_count: usize,
    pub disk_tracks: u8,
    pub disk_sectors: u8,
    pub disk_blocks: u8,
    pub quantum: usize,
    pub schedule: ScheduleKind,
    /// Format the disk while booting.
    pub format_disk: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            memory_size: 768,
            segment_count: 3,
            disk_tracks: 4,
            disk_sectors: 8,
            disk_blocks: 8,
            quantum: DEFAULT_QUANTUM,
            schedule: ScheduleKind::RoundRobin,
            format_disk: true,
        }
    }
}

impl KernelConfig {
    /// Rejects geometries the kernel cannot boot with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 {
            return Err(ConfigError::NoMemory);
        }
        if self.segment_count == 0 {
            return Err(ConfigError::NoSegments);
        }
        if self.segment_count > self.memory_size {
            return Err(ConfigError::TooManySegments {
                memory_size: self.memory_size,
                segment_count: self.segment_count,
            });
        }
        if self.disk_tracks == 0 || self.disk_sectors == 0 || self.disk_blocks == 0 {
            return Err(ConfigError::EmptyDisk);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        assert_eq!(KernelConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_config_rejects_empty_memory() {
        let config = KernelConfig {
            memory_size: 0,
            ..KernelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoMemory));

        let config = KernelConfig {
            segment_count: 0,
            ..KernelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoSegments));

        let config = KernelConfig {
            memory_size: 2,
            segment_count: 3,
            ..KernelConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManySegments {
                memory_size: 2,
                segment_count: 3
            })
        );
    }

    #[test]
    fn test_config_rejects_empty_disk() {
        let config = KernelConfig {
            disk_sectors: 0,
            ..KernelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyDisk));
    }
}
