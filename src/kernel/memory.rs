use super::error::MemoryError;

/// The raw byte store. Every access is bounds-checked against the store size;
/// only the memory manager holds one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(size: usize) -> Memory {
        Memory {
            data: vec![0; size],
        }
    }

    pub fn read_from(&self, address: usize) -> Result<u8, MemoryError> {
        self.data
            .get(address)
            .copied()
            .ok_or(MemoryError::OutOfRange { address })
    }

    pub fn write_to(&mut self, address: usize, value: u8) -> Result<u8, MemoryError> {
        let cell = self
            .data
            .get_mut(address)
            .ok_or(MemoryError::OutOfRange { address })?;
        *cell = value;

        Ok(value)
    }

    /// Copies `start_address..=end_address`.
    pub fn read_block_from(&self, start_address: usize, end_address: usize) -> Result<Vec<u8>, MemoryError> {
        if end_address >= self.data.len() {
            return Err(MemoryError::OutOfRange { address: end_address });
        } else if start_address > end_address {
            return Err(MemoryError::OutOfRange { address: start_address });
        }

        Ok(self.data[start_address..=end_address].to_vec())
    }

    pub fn write_block_to(&mut self, address: usize, data: &[u8]) -> Result<(), MemoryError> {
        let end_address = address + data.len();

        if end_address > self.data.len() {
            return Err(MemoryError::OutOfRange { address: end_address - 1 });
        }

        self.data[address..end_address].copy_from_slice(data);
        Ok(())
    }

    pub fn zero_fill(&mut self, start_address: usize, end_address: usize) -> Result<(), MemoryError> {
        if end_address >= self.data.len() || start_address > end_address {
            return Err(MemoryError::OutOfRange { address: end_address });
        }

        self.data[start_address..=end_address].fill(0);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zero_filled_on_construction() {
        let memory = Memory::new(768);
        assert!(memory.as_slice().iter().all(|byte| *byte == 0));
        assert_eq!(format!("{:02X}", memory.read_from(0).unwrap()), "00");
    }

    #[test]
    fn test_memory_read_write_succeed_only_in_bounds() {
        let mut memory = Memory::new(16);

        for address in 0..20 {
            let written = memory.write_to(address, address as u8);
            let read = memory.read_from(address);
            if address < 16 {
                assert_eq!(written, Ok(address as u8));
                assert_eq!(read, Ok(address as u8));
            } else {
                assert_eq!(written, Err(MemoryError::OutOfRange { address }));
                assert_eq!(read, Err(MemoryError::OutOfRange { address }));
            }
        }
    }

    #[test]
    fn test_memory_read_block_from() {
        let mut memory = Memory::new(16);
        memory.write_block_to(2, &[1, 2, 3]).unwrap();
        assert_eq!(memory.read_block_from(2, 4).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_memory_out_of_bounds_read_block_from() {
        let memory = Memory::new(16);
        assert!(memory.read_block_from(0, 16).is_err());
        assert!(memory.read_block_from(5, 0).is_err());
    }

    #[test]
    fn test_memory_out_of_bounds_write_block_to() {
        let mut memory = Memory::new(16);
        assert_eq!(
            memory.write_block_to(14, &[1, 2, 3]),
            Err(MemoryError::OutOfRange { address: 16 })
        );
        assert_eq!(memory.read_from(14), Ok(0));
    }

    #[test]
    fn test_memory_zero_fill() {
        let mut memory = Memory::new(8);
        memory.write_block_to(0, &[9; 8]).unwrap();
        memory.zero_fill(2, 5).unwrap();
        assert_eq!(memory.as_slice(), &[9, 9, 0, 0, 0, 0, 9, 9]);
    }
}
