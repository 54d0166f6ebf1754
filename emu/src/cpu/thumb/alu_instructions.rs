/// Opcodes of the "ALU operations" format (`010000 oooo sss ddd`).
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ThumbModeAluInstruction {
    And = 0x0,
    Eor = 0x1,
    Lsl = 0x2,
    Lsr = 0x3,
    Asr = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Ror = 0x7,
    Tst = 0x8,
    Neg = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mul = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl ThumbModeAluInstruction {
    /// Maps the 4-bit opcode field, `None` for anything wider.
    #[must_use]
    pub const fn from_field(alu_op_code: u16) -> Option<Self> {
        use ThumbModeAluInstruction::{
            Adc, And, Asr, Bic, Cmn, Cmp, Eor, Lsl, Lsr, Mul, Mvn, Neg, Orr, Ror, Sbc, Tst,
        };
        Some(match alu_op_code {
            0x0 => And,
            0x1 => Eor,
            0x2 => Lsl,
            0x3 => Lsr,
            0x4 => Asr,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Ror,
            0x8 => Tst,
            0x9 => Neg,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mul,
            0xE => Bic,
            0xF => Mvn,
            _ => return None,
        })
    }

    /// TST, CMP and CMN only update the flags.
    #[must_use]
    pub const fn writes_result(self) -> bool {
        !matches!(self, Self::Tst | Self::Cmp | Self::Cmn)
    }
}

impl std::fmt::Display for ThumbModeAluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::And => "AND",
            Self::Eor => "EOR",
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Adc => "ADC",
            Self::Sbc => "SBC",
            Self::Ror => "ROR",
            Self::Tst => "TST",
            Self::Neg => "NEG",
            Self::Cmp => "CMP",
            Self::Cmn => "CMN",
            Self::Orr => "ORR",
            Self::Mul => "MUL",
            Self::Bic => "BIC",
            Self::Mvn => "MVN",
        };
        f.write_str(name)
    }
}

/// Operations of the Hi register format (`010001 oo H1 H2 sss ddd`), BX excluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbHighRegisterOperation {
    Add,
    Cmp,
    Mov,
}

impl std::fmt::Display for ThumbHighRegisterOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mov => f.write_str("MOV"),
            Self::Cmp => f.write_str("CMP"),
            Self::Add => f.write_str("ADD"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_conversion_thumb_alu_op() {
        assert_eq!(
            ThumbModeAluInstruction::from_field(0b0000),
            Some(ThumbModeAluInstruction::And)
        );
        assert_eq!(
            ThumbModeAluInstruction::from_field(0b1101),
            Some(ThumbModeAluInstruction::Mul)
        );
        assert_eq!(
            ThumbModeAluInstruction::from_field(0b1111),
            Some(ThumbModeAluInstruction::Mvn)
        );
        assert_eq!(ThumbModeAluInstruction::from_field(0b1_0000), None);
    }

    #[test]
    fn comparisons_do_not_write() {
        assert!(!ThumbModeAluInstruction::Tst.writes_result());
        assert!(!ThumbModeAluInstruction::Cmp.writes_result());
        assert!(!ThumbModeAluInstruction::Cmn.writes_result());
        assert!(ThumbModeAluInstruction::Neg.writes_result());
        assert!(ThumbModeAluInstruction::Mul.writes_result());
    }
}
