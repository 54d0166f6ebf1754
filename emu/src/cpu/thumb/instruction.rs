//! # Thumb Instruction Decoding
//!
//! Decoding switches on bits 15-12 first, then on narrower sub-fields:
//!
//! ```text
//! ┌──────────┬─────────────────────────────────────────────────────────────┐
//! │ 15-12    │ Family                                                      │
//! ├──────────┼─────────────────────────────────────────────────────────────┤
//! │ 000x     │ Move shifted register (12-11 ≠ 11) / Add-subtract (11)      │
//! │ 001x     │ Move/compare/add/subtract immediate                         │
//! │ 0100     │ ALU operations (11-10 = 00), Hi register / BX (01),         │
//! │          │ PC-relative load (1x)                                       │
//! │ 0101     │ Load/store register offset (9 = 0), sign-extended (9 = 1)   │
//! │ 011x     │ Load/store immediate offset                                 │
//! │ 1000     │ Load/store halfword                                         │
//! │ 1001     │ SP-relative load/store                                      │
//! │ 1010     │ Load address                                                │
//! │ 1011     │ Miscellaneous, switched on bits 11-8:                       │
//! │          │   0000 ADD SP     00x1/10x1 CBZ/CBNZ     0010 SXT/UXT       │
//! │          │   010x PUSH       110x POP               1010 REV family    │
//! │ 1100     │ Multiple load/store                                         │
//! │ 1101     │ Conditional branch, SWI (11-8 = 1111)                       │
//! │ 1110     │ Unconditional branch (11 = 0)                               │
//! │ 1111     │ Long branch with link                                       │
//! └──────────┴─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Long Branch (BL)
//!
//! ```text
//! First:  1111 0xxx xxxx xxxx  ; LR = offset_hi << 12
//! Second: 1111 1xxx xxxx xxxx  ; PC = next + sext23(LR | offset_lo << 1), LR = next | 1
//! ```

use crate::bitwise::Bits;
use crate::cpu::condition::Condition;
use crate::cpu::flags::{
    AddressBase, ExtendKind, LoadStoreKind, OperandKind, Operation, ReadWriteKind, ShiftKind,
    SignExtendedKind,
};
use crate::cpu::thumb::alu_instructions::{ThumbHighRegisterOperation, ThumbModeAluInstruction};
use crate::error::Fault;

/// Why an instruction word could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Reserved or unassigned encoding.
    Unknown,
    /// Valid encoding that is not implemented (REV16, REVSH).
    Unsupported,
    /// A sub-field held a value its width cannot hold.
    InternalLogic,
}

impl DecodeError {
    #[must_use]
    pub const fn at(self, opcode: u16, address: u32) -> Fault {
        match self {
            Self::Unknown => Fault::UnknownInstruction { opcode, address },
            Self::Unsupported => Fault::UnsupportedInstruction { opcode, address },
            Self::InternalLogic => Fault::InternalLogic { opcode },
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Instruction {
    MoveShiftedRegister {
        shift_operation: ShiftKind,
        offset5: u32,
        source_register: usize,
        destination_register: usize,
    },
    AddSubtract {
        operation_kind: OperandKind,
        subtract: bool,
        rn_offset3: u32,
        source_register: usize,
        destination_register: usize,
    },
    MoveCompareAddSubtractImm {
        operation: Operation,
        destination_register: usize,
        offset: u32,
    },
    AluOp {
        alu_operation: ThumbModeAluInstruction,
        source_register: usize,
        destination_register: usize,
    },
    /// Operands span R0-R15.
    HiRegisterOp {
        register_operation: ThumbHighRegisterOperation,
        source_register: usize,
        destination_register: usize,
    },
    /// BX, or BLX when `link` (H1) is set.
    BranchExchange {
        source_register: usize,
        link: bool,
    },
    PcRelativeLoad {
        destination_register: usize,
        word8: u32,
    },
    LoadStoreRegisterOffset {
        load_store: LoadStoreKind,
        byte_word: ReadWriteKind,
        offset_register: usize,
        base_register: usize,
        destination_register: usize,
    },
    LoadStoreSignExtByteHalfword {
        kind: SignExtendedKind,
        offset_register: usize,
        base_register: usize,
        destination_register: usize,
    },
    LoadStoreImmOffset {
        load_store: LoadStoreKind,
        byte_word: ReadWriteKind,
        offset5: u32,
        base_register: usize,
        destination_register: usize,
    },
    LoadStoreHalfword {
        load_store: LoadStoreKind,
        offset5: u32,
        base_register: usize,
        source_destination_register: usize,
    },
    SpRelativeLoadStore {
        load_store: LoadStoreKind,
        destination_register: usize,
        word8: u32,
    },
    LoadAddress {
        base: AddressBase,
        destination_register: usize,
        word8: u32,
    },
    AddOffsetSp {
        negative: bool,
        word7: u32,
    },
    /// CBZ, or CBNZ when `non_zero`. `offset` is already in bytes.
    CompareBranch {
        non_zero: bool,
        register: usize,
        offset: u32,
    },
    Extend {
        kind: ExtendKind,
        source_register: usize,
        destination_register: usize,
    },
    ByteReverse {
        source_register: usize,
        destination_register: usize,
    },
    PushPopReg {
        load_store: LoadStoreKind,
        pc_lr: bool,
        register_list: u8,
    },
    MultipleLoadStore {
        load_store: LoadStoreKind,
        base_register: usize,
        register_list: u8,
    },
    /// `immediate_offset` is sign-extended and already in bytes.
    CondBranch {
        condition: Condition,
        immediate_offset: i32,
    },
    Swi {
        comment: u8,
    },
    /// `offset` is sign-extended and already in bytes.
    UncondBranch {
        offset: i32,
    },
    /// `h` clear: first half, holds offset bits 22-12. `h` set: second half, bits 11-1.
    LongBranchLink {
        h: bool,
        offset: u32,
    },
}

impl TryFrom<u16> for Instruction {
    type Error = DecodeError;

    #[allow(clippy::too_many_lines, clippy::cast_possible_wrap)]
    fn try_from(op_code: u16) -> Result<Self, Self::Error> {
        use Instruction::{
            AddSubtract, AluOp, BranchExchange, CondBranch, HiRegisterOp, LoadAddress,
            LoadStoreHalfword, LoadStoreImmOffset, LoadStoreRegisterOffset,
            LoadStoreSignExtByteHalfword, LongBranchLink, MoveCompareAddSubtractImm,
            MoveShiftedRegister, MultipleLoadStore, PcRelativeLoad, SpRelativeLoadStore, Swi,
            UncondBranch,
        };

        let low_register = usize::from(op_code.get_bits(0..=2));
        let middle_register = usize::from(op_code.get_bits(3..=5));
        let upper_register = usize::from(op_code.get_bits(8..=10));
        let offset5 = u32::from(op_code.get_bits(6..=10));
        let word8 = u32::from(op_code.get_bits(0..=7));

        let instruction = match op_code.get_bits(12..=15) {
            0b0000 | 0b0001 => {
                let shift_operation = match op_code.get_bits(11..=12) {
                    0b00 => ShiftKind::Lsl,
                    0b01 => ShiftKind::Lsr,
                    0b10 => ShiftKind::Asr,
                    0b11 => {
                        return Ok(AddSubtract {
                            operation_kind: op_code.get_bit(10).into(),
                            subtract: op_code.get_bit(9),
                            rn_offset3: u32::from(op_code.get_bits(6..=8)),
                            source_register: middle_register,
                            destination_register: low_register,
                        });
                    }
                    _ => return Err(DecodeError::InternalLogic),
                };

                MoveShiftedRegister {
                    shift_operation,
                    offset5,
                    source_register: middle_register,
                    destination_register: low_register,
                }
            }
            0b0010 | 0b0011 => MoveCompareAddSubtractImm {
                operation: match op_code.get_bits(11..=12) {
                    0b00 => Operation::Mov,
                    0b01 => Operation::Cmp,
                    0b10 => Operation::Add,
                    0b11 => Operation::Sub,
                    _ => return Err(DecodeError::InternalLogic),
                },
                destination_register: upper_register,
                offset: word8,
            },
            0b0100 => match op_code.get_bits(10..=11) {
                0b00 => AluOp {
                    alu_operation: ThumbModeAluInstruction::from_field(op_code.get_bits(6..=9))
                        .ok_or(DecodeError::InternalLogic)?,
                    source_register: middle_register,
                    destination_register: low_register,
                },
                0b01 => {
                    let h1 = op_code.get_bit(7);
                    let source_register = usize::from(op_code.get_bits(3..=6));
                    let destination_register = low_register | (usize::from(h1) << 3);

                    let register_operation = match op_code.get_bits(8..=9) {
                        0b00 => ThumbHighRegisterOperation::Add,
                        0b01 => ThumbHighRegisterOperation::Cmp,
                        0b10 => ThumbHighRegisterOperation::Mov,
                        0b11 => {
                            return Ok(BranchExchange {
                                source_register,
                                link: h1,
                            });
                        }
                        _ => return Err(DecodeError::InternalLogic),
                    };

                    HiRegisterOp {
                        register_operation,
                        source_register,
                        destination_register,
                    }
                }
                0b10 | 0b11 => PcRelativeLoad {
                    destination_register: upper_register,
                    word8,
                },
                _ => return Err(DecodeError::InternalLogic),
            },
            0b0101 => {
                let offset_register = usize::from(op_code.get_bits(6..=8));
                if op_code.get_bit(9) {
                    LoadStoreSignExtByteHalfword {
                        kind: SignExtendedKind::from_bits(op_code.get_bit(11), op_code.get_bit(10)),
                        offset_register,
                        base_register: middle_register,
                        destination_register: low_register,
                    }
                } else {
                    LoadStoreRegisterOffset {
                        load_store: op_code.get_bit(11).into(),
                        byte_word: op_code.get_bit(10).into(),
                        offset_register,
                        base_register: middle_register,
                        destination_register: low_register,
                    }
                }
            }
            0b0110 | 0b0111 => LoadStoreImmOffset {
                load_store: op_code.get_bit(11).into(),
                byte_word: op_code.get_bit(12).into(),
                offset5,
                base_register: middle_register,
                destination_register: low_register,
            },
            0b1000 => LoadStoreHalfword {
                load_store: op_code.get_bit(11).into(),
                offset5,
                base_register: middle_register,
                source_destination_register: low_register,
            },
            0b1001 => SpRelativeLoadStore {
                load_store: op_code.get_bit(11).into(),
                destination_register: upper_register,
                word8,
            },
            0b1010 => LoadAddress {
                base: if op_code.get_bit(11) {
                    AddressBase::Sp
                } else {
                    AddressBase::Pc
                },
                destination_register: upper_register,
                word8,
            },
            0b1011 => decode_miscellaneous(op_code)?,
            0b1100 => MultipleLoadStore {
                load_store: op_code.get_bit(11).into(),
                base_register: upper_register,
                register_list: low_byte(op_code),
            },
            0b1101 => match op_code.get_bits(8..=11) {
                0b1111 => Swi {
                    comment: low_byte(op_code),
                },
                condition => CondBranch {
                    condition: Condition::from_field(condition).ok_or(DecodeError::Unknown)?,
                    immediate_offset: (word8 << 1).sign_extended(9) as i32,
                },
            },
            0b1110 => {
                // 11101: second half of a BLX pair, which needs ARM state.
                if op_code.get_bit(11) {
                    return Err(DecodeError::Unknown);
                }

                UncondBranch {
                    offset: (u32::from(op_code.get_bits(0..=10)) << 1).sign_extended(12) as i32,
                }
            }
            0b1111 => LongBranchLink {
                h: op_code.get_bit(11),
                offset: u32::from(op_code.get_bits(0..=10)),
            },
            _ => return Err(DecodeError::InternalLogic),
        };

        Ok(instruction)
    }
}

/// Format `1011 xxxx`.
fn decode_miscellaneous(op_code: u16) -> Result<Instruction, DecodeError> {
    let low_register = usize::from(op_code.get_bits(0..=2));
    let middle_register = usize::from(op_code.get_bits(3..=5));

    let instruction = match op_code.get_bits(8..=11) {
        0b0000 => Instruction::AddOffsetSp {
            negative: op_code.get_bit(7),
            word7: u32::from(op_code.get_bits(0..=6)),
        },
        0b0001 | 0b0011 | 0b1001 | 0b1011 => Instruction::CompareBranch {
            non_zero: op_code.get_bit(11),
            register: low_register,
            offset: (u32::from(op_code.get_bit(9)) << 6) | (u32::from(op_code.get_bits(3..=7)) << 1),
        },
        0b0010 => Instruction::Extend {
            kind: match op_code.get_bits(6..=7) {
                0b00 => ExtendKind::Sxth,
                0b01 => ExtendKind::Sxtb,
                0b10 => ExtendKind::Uxth,
                0b11 => ExtendKind::Uxtb,
                _ => return Err(DecodeError::InternalLogic),
            },
            source_register: middle_register,
            destination_register: low_register,
        },
        0b0100 | 0b0101 | 0b1100 | 0b1101 => Instruction::PushPopReg {
            load_store: op_code.get_bit(11).into(),
            pc_lr: op_code.get_bit(8),
            register_list: low_byte(op_code),
        },
        0b1010 => match op_code.get_bits(6..=7) {
            0b00 => Instruction::ByteReverse {
                source_register: middle_register,
                destination_register: low_register,
            },
            // REV16, REVSH
            0b01 | 0b11 => return Err(DecodeError::Unsupported),
            0b10 => return Err(DecodeError::Unknown),
            _ => return Err(DecodeError::InternalLogic),
        },
        0b0110 | 0b0111 | 0b1000 | 0b1110 | 0b1111 => return Err(DecodeError::Unknown),
        _ => return Err(DecodeError::InternalLogic),
    };

    Ok(instruction)
}

#[allow(clippy::cast_possible_truncation)]
const fn low_byte(op_code: u16) -> u8 {
    (op_code & 0xFF) as u8
}

#[cfg(feature = "disassembler")]
struct Reg(usize);

#[cfg(feature = "disassembler")]
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            13 => f.write_str("SP"),
            14 => f.write_str("LR"),
            15 => f.write_str("PC"),
            n => write!(f, "R{n}"),
        }
    }
}

#[cfg(feature = "disassembler")]
struct RegList {
    list: u8,
    extra: Option<usize>,
}

#[cfg(feature = "disassembler")]
impl std::fmt::Display for RegList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registers = (0..8)
            .filter(|r| self.list.get_bit(*r))
            .map(|r| Reg(usize::from(r)))
            .chain(self.extra.map(Reg))
            .map(|r| r.to_string())
            .collect::<Vec<_>>();

        write!(f, "{{{}}}", registers.join(", "))
    }
}

#[cfg(feature = "disassembler")]
impl std::fmt::Display for Instruction {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::MoveShiftedRegister {
                shift_operation,
                offset5,
                source_register,
                destination_register,
            } => write!(
                f,
                "{shift_operation} {}, {}, #{offset5}",
                Reg(destination_register),
                Reg(source_register)
            ),
            Self::AddSubtract {
                operation_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            } => {
                let op = if subtract { "SUB" } else { "ADD" };
                write!(
                    f,
                    "{op} {}, {}, ",
                    Reg(destination_register),
                    Reg(source_register)
                )?;
                match operation_kind {
                    OperandKind::Immediate => write!(f, "#{rn_offset3}"),
                    OperandKind::Register => write!(f, "R{rn_offset3}"),
                }
            }
            Self::MoveCompareAddSubtractImm {
                operation,
                destination_register,
                offset,
            } => write!(f, "{operation} {}, #{offset}", Reg(destination_register)),
            Self::AluOp {
                alu_operation,
                source_register,
                destination_register,
            } => write!(
                f,
                "{alu_operation} {}, {}",
                Reg(destination_register),
                Reg(source_register)
            ),
            Self::HiRegisterOp {
                register_operation,
                source_register,
                destination_register,
            } => write!(
                f,
                "{register_operation} {}, {}",
                Reg(destination_register),
                Reg(source_register)
            ),
            Self::BranchExchange {
                source_register,
                link,
            } => {
                let op = if link { "BLX" } else { "BX" };
                write!(f, "{op} {}", Reg(source_register))
            }
            Self::PcRelativeLoad {
                destination_register,
                word8,
            } => write!(f, "LDR {}, [PC, #{}]", Reg(destination_register), word8 << 2),
            Self::LoadStoreRegisterOffset {
                load_store,
                byte_word,
                offset_register,
                base_register,
                destination_register,
            } => {
                let op = match load_store {
                    LoadStoreKind::Load => "LDR",
                    LoadStoreKind::Store => "STR",
                };
                let suffix = match byte_word {
                    ReadWriteKind::Byte => "B",
                    ReadWriteKind::Word => "",
                };
                write!(
                    f,
                    "{op}{suffix} {}, [{}, {}]",
                    Reg(destination_register),
                    Reg(base_register),
                    Reg(offset_register)
                )
            }
            Self::LoadStoreSignExtByteHalfword {
                kind,
                offset_register,
                base_register,
                destination_register,
            } => {
                let op = match kind {
                    SignExtendedKind::StoreHalfword => "STRH",
                    SignExtendedKind::LoadHalfword => "LDRH",
                    SignExtendedKind::LoadSignedByte => "LDSB",
                    SignExtendedKind::LoadSignedHalfword => "LDSH",
                };
                write!(
                    f,
                    "{op} {}, [{}, {}]",
                    Reg(destination_register),
                    Reg(base_register),
                    Reg(offset_register)
                )
            }
            Self::LoadStoreImmOffset {
                load_store,
                byte_word,
                offset5,
                base_register,
                destination_register,
            } => {
                let op = match load_store {
                    LoadStoreKind::Load => "LDR",
                    LoadStoreKind::Store => "STR",
                };
                let suffix = match byte_word {
                    ReadWriteKind::Byte => "B",
                    ReadWriteKind::Word => "",
                };
                write!(
                    f,
                    "{op}{suffix} {}, [{}, #{}]",
                    Reg(destination_register),
                    Reg(base_register),
                    offset5 << byte_word.offset_shift()
                )
            }
            Self::LoadStoreHalfword {
                load_store,
                offset5,
                base_register,
                source_destination_register,
            } => {
                let op = match load_store {
                    LoadStoreKind::Load => "LDRH",
                    LoadStoreKind::Store => "STRH",
                };
                write!(
                    f,
                    "{op} {}, [{}, #{}]",
                    Reg(source_destination_register),
                    Reg(base_register),
                    offset5 << 1
                )
            }
            Self::SpRelativeLoadStore {
                load_store,
                destination_register,
                word8,
            } => {
                let op = match load_store {
                    LoadStoreKind::Load => "LDR",
                    LoadStoreKind::Store => "STR",
                };
                write!(f, "{op} {}, [SP, #{}]", Reg(destination_register), word8 << 2)
            }
            Self::LoadAddress {
                base,
                destination_register,
                word8,
            } => {
                let base = match base {
                    AddressBase::Pc => "PC",
                    AddressBase::Sp => "SP",
                };
                write!(f, "ADD {}, {base}, #{}", Reg(destination_register), word8 << 2)
            }
            Self::AddOffsetSp { negative, word7 } => {
                let sign = if negative { "-" } else { "" };
                write!(f, "ADD SP, #{sign}{}", word7 << 2)
            }
            Self::CompareBranch {
                non_zero,
                register,
                offset,
            } => {
                let op = if non_zero { "CBNZ" } else { "CBZ" };
                write!(f, "{op} {}, #+{}", Reg(register), offset + 4)
            }
            Self::Extend {
                kind,
                source_register,
                destination_register,
            } => write!(
                f,
                "{kind} {}, {}",
                Reg(destination_register),
                Reg(source_register)
            ),
            Self::ByteReverse {
                source_register,
                destination_register,
            } => write!(
                f,
                "REV {}, {}",
                Reg(destination_register),
                Reg(source_register)
            ),
            Self::PushPopReg {
                load_store,
                pc_lr,
                register_list,
            } => {
                let (op, extra) = match load_store {
                    LoadStoreKind::Store => ("PUSH", 14),
                    LoadStoreKind::Load => ("POP", 15),
                };
                let list = RegList {
                    list: register_list,
                    extra: pc_lr.then_some(extra),
                };
                write!(f, "{op} {list}")
            }
            Self::MultipleLoadStore {
                load_store,
                base_register,
                register_list,
            } => {
                let op = match load_store {
                    LoadStoreKind::Load => "LDMIA",
                    LoadStoreKind::Store => "STMIA",
                };
                let list = RegList {
                    list: register_list,
                    extra: None,
                };
                write!(f, "{op} {}!, {list}", Reg(base_register))
            }
            Self::CondBranch {
                condition,
                immediate_offset,
            } => write!(f, "B{condition} #{:+}", immediate_offset + 4),
            Self::Swi { comment } => write!(f, "SWI #0x{comment:02X}"),
            Self::UncondBranch { offset } => write!(f, "B #{:+}", offset + 4),
            Self::LongBranchLink { h, offset } => {
                let part = if h { "lo" } else { "hi" };
                write!(f, "BL.{part} #0x{offset:03X}")
            }
        }
    }
}

#[cfg(not(feature = "disassembler"))]
impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
