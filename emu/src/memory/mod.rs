//! # Address Space
//!
//! The interpreter never owns guest memory. Every load, store and code fetch
//! goes through the [`Memory`] trait, implemented by the host. Any access may
//! be rejected with [`InvalidMemory`], which aborts the current instruction.
//!
//! [`RegionMemory`] is a ready-made little-endian implementation made of
//! named RAM and ROM regions.

mod region_memory;

pub use region_memory::{MemoryConfig, RegionMemory};

use crate::error::InvalidMemory;

/// A contiguous block of the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub begin: u32,
    pub size: u32,
}

impl Region {
    #[must_use]
    pub const fn new(begin: u32, size: u32) -> Self {
        Self { begin, size }
    }

    /// First address past the region. May be `1 << 32`.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.begin as u64 + self.size as u64
    }

    /// Whether `[address, address + len)` lies entirely inside the region.
    #[must_use]
    pub const fn contains(&self, address: u32, len: u32) -> bool {
        address >= self.begin && address as u64 + len as u64 <= self.end()
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        (self.begin as u64) < other.end() && (other.begin as u64) < self.end()
    }
}

/// Guest address space as seen by the interpreter.
pub trait Memory {
    /// The region holding at least `min_size` bytes starting at `address`.
    fn find_region(&self, address: u32, min_size: u32) -> Result<Region, InvalidMemory>;

    fn read_byte(&self, address: u32) -> Result<u8, InvalidMemory>;

    fn read_short(&self, address: u32) -> Result<u16, InvalidMemory>;

    fn read_int(&self, address: u32) -> Result<u32, InvalidMemory>;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), InvalidMemory>;

    fn write_short(&mut self, address: u32, value: u16) -> Result<(), InvalidMemory>;

    fn write_int(&mut self, address: u32, value: u32) -> Result<(), InvalidMemory>;

    /// Instruction fetch. Only used while populating the code cache.
    fn fetch_code(&self, address: u32) -> Result<u16, InvalidMemory> {
        self.read_short(address)
    }
}

impl<T: Memory + ?Sized> Memory for &mut T {
    fn find_region(&self, address: u32, min_size: u32) -> Result<Region, InvalidMemory> {
        (**self).find_region(address, min_size)
    }

    fn read_byte(&self, address: u32) -> Result<u8, InvalidMemory> {
        (**self).read_byte(address)
    }

    fn read_short(&self, address: u32) -> Result<u16, InvalidMemory> {
        (**self).read_short(address)
    }

    fn read_int(&self, address: u32) -> Result<u32, InvalidMemory> {
        (**self).read_int(address)
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), InvalidMemory> {
        (**self).write_byte(address, value)
    }

    fn write_short(&mut self, address: u32, value: u16) -> Result<(), InvalidMemory> {
        (**self).write_short(address, value)
    }

    fn write_int(&mut self, address: u32, value: u32) -> Result<(), InvalidMemory> {
        (**self).write_int(address, value)
    }

    fn fetch_code(&self, address: u32) -> Result<u16, InvalidMemory> {
        (**self).fetch_code(address)
    }
}
