//! One-shot instruction cache.
//!
//! Built from the region holding the PC the first time a batch runs, then kept
//! for the lifetime of the [`Cpu`](super::interpreter::Cpu). Every instruction
//! executed afterwards must come from that region: fetching outside of it is
//! an [`InvalidMemory`] error, the cache is never rebuilt.

use crate::error::InvalidMemory;
use crate::memory::{Memory, Region};

#[derive(Debug, Clone)]
pub struct CodeCache {
    region: Region,
    /// First halfword-aligned address of the region.
    base: u32,
    /// One entry per aligned halfword, starting at `base`.
    halfwords: Box<[u16]>,
}

impl CodeCache {
    pub fn build<M: Memory + ?Sized>(memory: &M, pc: u32) -> Result<Self, InvalidMemory> {
        let region = memory.find_region(pc, 2)?;

        let base = u64::from(region.begin).next_multiple_of(2);
        let count = region.end().saturating_sub(base) / 2;
        let halfwords = (0..count)
            .map(|index| memory.fetch_code((base + index * 2) as u32))
            .collect::<Result<Box<[u16]>, _>>()?;
        let base = base as u32;

        tracing::debug!(
            "code cache built for 0x{:08X}..0x{:08X} ({} halfwords)",
            region.begin,
            region.end(),
            halfwords.len()
        );

        Ok(Self {
            region,
            base,
            halfwords,
        })
    }

    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Instruction word at `pc`, which must be halfword aligned.
    pub fn fetch(&self, pc: u32) -> Result<u16, InvalidMemory> {
        pc.checked_sub(self.base)
            .filter(|offset| offset % 2 == 0)
            .and_then(|offset| self.halfwords.get((offset / 2) as usize))
            .copied()
            .ok_or(InvalidMemory::new(pc, 2))
    }
}
