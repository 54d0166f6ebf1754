use serde::{Deserialize, Serialize};

/// Direction of a single or multiple data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStoreKind {
    Store,
    Load,
}

impl From<bool> for LoadStoreKind {
    fn from(b: bool) -> Self {
        if b { Self::Load } else { Self::Store }
    }
}

/// Width of a load/store with register or immediate offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadWriteKind {
    Word,
    Byte,
}

impl From<bool> for ReadWriteKind {
    fn from(value: bool) -> Self {
        if value { Self::Byte } else { Self::Word }
    }
}

impl ReadWriteKind {
    /// How far the 5-bit immediate offset is shifted for this width.
    #[must_use]
    pub const fn offset_shift(self) -> u32 {
        match self {
            Self::Word => 2,
            Self::Byte => 0,
        }
    }
}

/// The four sign-extended byte/halfword transfers, selected by the H and S bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignExtendedKind {
    /// STRH
    StoreHalfword,
    /// LDSB
    LoadSignedByte,
    /// LDRH
    LoadHalfword,
    /// LDSH
    LoadSignedHalfword,
}

impl SignExtendedKind {
    #[must_use]
    pub const fn from_bits(h: bool, s: bool) -> Self {
        match (s, h) {
            (false, false) => Self::StoreHalfword,
            (false, true) => Self::LoadHalfword,
            (true, false) => Self::LoadSignedByte,
            (true, true) => Self::LoadSignedHalfword,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    Immediate,
    Register,
}

impl From<bool> for OperandKind {
    fn from(b: bool) -> Self {
        if b { Self::Immediate } else { Self::Register }
    }
}

/// Barrel shifter operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl std::fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lsl => f.write_str("LSL"),
            Self::Lsr => f.write_str("LSR"),
            Self::Asr => f.write_str("ASR"),
            Self::Ror => f.write_str("ROR"),
        }
    }
}

/// Operations of the move/compare/add/subtract immediate format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Mov,
    Cmp,
    Add,
    Sub,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mov => f.write_str("MOV"),
            Self::Cmp => f.write_str("CMP"),
            Self::Add => f.write_str("ADD"),
            Self::Sub => f.write_str("SUB"),
        }
    }
}

/// Register used as the base of a load address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressBase {
    Pc,
    Sp,
}

/// Sign/zero extensions of the low byte or halfword of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendKind {
    Sxth,
    Sxtb,
    Uxth,
    Uxtb,
}

impl ExtendKind {
    #[must_use]
    pub const fn apply(self, value: u32) -> u32 {
        match self {
            Self::Sxth => value as u16 as i16 as i32 as u32,
            Self::Sxtb => value as u8 as i8 as i32 as u32,
            Self::Uxth => value & 0xFFFF,
            Self::Uxtb => value & 0xFF,
        }
    }
}

impl std::fmt::Display for ExtendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sxth => f.write_str("SXTH"),
            Self::Sxtb => f.write_str("SXTB"),
            Self::Uxth => f.write_str("UXTH"),
            Self::Uxtb => f.write_str("UXTB"),
        }
    }
}
