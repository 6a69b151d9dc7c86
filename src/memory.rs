use std::collections::BTreeMap;

pub type Word = i64; // signed machine word
pub type Address = i64; // addresses are computed from words, so they may be negative

/// Number of addressable data cells. Accesses outside `0..MEMORY_SIZE` are ignored.
pub const MEMORY_SIZE: Address = 4096;

/// Sparse data memory. Cells that were never written read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    cells: BTreeMap<Address, Word>,
}

impl Memory {
    /// Returns true if `address` lies inside the acceptance window
    pub fn contains(address: Address) -> bool {
        (0..MEMORY_SIZE).contains(&address)
    }

    /// Reads a word from the memory
    pub fn read(&self, address: Address) -> Word {
        self.cells.get(&address).copied().unwrap_or(0)
    }

    /// Writes a word to the memory. Writes outside the window are dropped.
    pub fn write(&mut self, address: Address, value: Word) {
        if Self::contains(address) {
            self.cells.insert(address, value);
        } else {
            log::warn!("dropped write of {} to out of range address {}", value, address);
        }
    }

    /// Iterates over all written cells in address order
    pub fn iter(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        self.cells.iter().map(|(address, value)| (*address, *value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_unwritten_reads_zero() -> Result<()> {
        let mem = Memory::default();
        assert_eq!(mem.read(0), 0);
        assert_eq!(mem.read(4095), 0);
        assert!(mem.is_empty());

        Ok(())
    }

    #[test]
    fn test_write_read() -> Result<()> {
        let mut mem = Memory::default();
        mem.write(0x44, -12);
        mem.write(4095, 7);
        assert_eq!(mem.read(0x44), -12);
        assert_eq!(mem.read(4095), 7);
        assert_eq!(mem.len(), 2);

        Ok(())
    }

    #[test]
    fn test_out_of_range_write_is_dropped() -> Result<()> {
        let mut mem = Memory::default();
        mem.write(-1, 5);
        mem.write(MEMORY_SIZE, 5);
        mem.write(1 << 40, 5);
        assert!(mem.is_empty());
        assert_eq!(mem.read(-1), 0);
        assert_eq!(mem.read(MEMORY_SIZE), 0);

        Ok(())
    }

    #[test]
    fn test_iter_is_ordered() -> Result<()> {
        let mut mem = Memory::default();
        mem.write(30, 3);
        mem.write(2, 1);
        mem.write(10, 2);
        let cells: Vec<_> = mem.iter().collect();
        assert_eq!(cells, vec![(2, 1), (10, 2), (30, 3)]);

        Ok(())
    }
}
