use serde::{Deserialize, Serialize};

use crate::error::InvalidMemory;
use crate::memory::{Memory, Region};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Reject halfword and word accesses that are not naturally aligned.
    pub strict_alignment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone)]
struct MappedRegion {
    name: String,
    region: Region,
    access: Access,
    data: Vec<u8>,
}

/// Little-endian address space made of non-overlapping regions.
#[derive(Debug, Default, Clone)]
pub struct RegionMemory {
    config: MemoryConfig,
    regions: Vec<MappedRegion>,
}

impl RegionMemory {
    #[must_use]
    pub const fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            regions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> MemoryConfig {
        self.config
    }

    /// Maps `size` zeroed, writable bytes at `begin`.
    pub fn map_ram(
        &mut self,
        name: impl Into<String>,
        begin: u32,
        size: u32,
    ) -> Result<Region, InvalidMemory> {
        let len = usize::try_from(size).map_err(|_| InvalidMemory::new(begin, size))?;
        self.map(name.into(), begin, vec![0; len], Access::ReadWrite)
    }

    /// Maps a copy of `bytes` at `begin`. The guest cannot write to it.
    pub fn map_rom(
        &mut self,
        name: impl Into<String>,
        begin: u32,
        bytes: &[u8],
    ) -> Result<Region, InvalidMemory> {
        self.map(name.into(), begin, bytes.to_vec(), Access::ReadOnly)
    }

    fn map(
        &mut self,
        name: String,
        begin: u32,
        data: Vec<u8>,
        access: Access,
    ) -> Result<Region, InvalidMemory> {
        let size = u32::try_from(data.len()).map_err(|_| InvalidMemory::new(begin, u32::MAX))?;
        let region = Region::new(begin, size);

        if size == 0
            || region.end() > 1 << 32
            || self.regions.iter().any(|mapped| mapped.region.overlaps(&region))
        {
            return Err(InvalidMemory::new(begin, size));
        }

        self.regions.push(MappedRegion {
            name,
            region,
            access,
            data,
        });

        Ok(region)
    }

    /// Mapped regions with their names, in mapping order.
    pub fn regions(&self) -> impl Iterator<Item = (&str, Region)> {
        self.regions
            .iter()
            .map(|mapped| (mapped.name.as_str(), mapped.region))
    }

    /// Host-side copy of `bytes` to `address`. ROM regions accept it too.
    pub fn load(&mut self, address: u32, bytes: &[u8]) -> Result<(), InvalidMemory> {
        let len = u32::try_from(bytes.len()).map_err(|_| InvalidMemory::new(address, u32::MAX))?;
        let index = self.locate(address, len)?;
        self.regions[index]
            .slice_mut(address, len)
            .copy_from_slice(bytes);

        Ok(())
    }

    fn locate(&self, address: u32, len: u32) -> Result<usize, InvalidMemory> {
        self.regions
            .iter()
            .position(|mapped| mapped.region.contains(address, len))
            .ok_or(InvalidMemory::new(address, len))
    }

    fn check_alignment(&self, address: u32, len: u32) -> Result<(), InvalidMemory> {
        if self.config.strict_alignment && address % len != 0 {
            return Err(InvalidMemory::new(address, len));
        }

        Ok(())
    }

    fn read<const N: usize>(&self, address: u32) -> Result<[u8; N], InvalidMemory> {
        let len = N as u32;
        self.check_alignment(address, len)?;

        let mapped = &self.regions[self.locate(address, len)?];
        let mut bytes = [0; N];
        bytes.copy_from_slice(mapped.slice(address, len));

        Ok(bytes)
    }

    fn write<const N: usize>(&mut self, address: u32, bytes: [u8; N]) -> Result<(), InvalidMemory> {
        let len = N as u32;
        self.check_alignment(address, len)?;

        let index = self.locate(address, len)?;
        let mapped = &mut self.regions[index];
        if mapped.access == Access::ReadOnly {
            return Err(InvalidMemory::new(address, len));
        }
        mapped.slice_mut(address, len).copy_from_slice(&bytes);

        Ok(())
    }
}

impl MappedRegion {
    /// Caller guarantees the range is inside the region.
    fn slice(&self, address: u32, len: u32) -> &[u8] {
        let start = (address - self.region.begin) as usize;
        &self.data[start..start + len as usize]
    }

    fn slice_mut(&mut self, address: u32, len: u32) -> &mut [u8] {
        let start = (address - self.region.begin) as usize;
        &mut self.data[start..start + len as usize]
    }
}

impl Memory for RegionMemory {
    fn find_region(&self, address: u32, min_size: u32) -> Result<Region, InvalidMemory> {
        Ok(self.regions[self.locate(address, min_size)?].region)
    }

    fn read_byte(&self, address: u32) -> Result<u8, InvalidMemory> {
        self.read::<1>(address).map(u8::from_le_bytes)
    }

    fn read_short(&self, address: u32) -> Result<u16, InvalidMemory> {
        self.read::<2>(address).map(u16::from_le_bytes)
    }

    fn read_int(&self, address: u32) -> Result<u32, InvalidMemory> {
        self.read::<4>(address).map(u32::from_le_bytes)
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), InvalidMemory> {
        self.write(address, value.to_le_bytes())
    }

    fn write_short(&mut self, address: u32, value: u16) -> Result<(), InvalidMemory> {
        self.write(address, value.to_le_bytes())
    }

    fn write_int(&mut self, address: u32, value: u32) -> Result<(), InvalidMemory> {
        self.write(address, value.to_le_bytes())
    }
}
