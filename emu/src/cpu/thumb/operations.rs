use crate::bitwise::Bits;
use crate::cpu::alu_instruction::{
    ArithmeticOpResult, add, add_with_carry, multiply, shift_by_register, shift_immediate, sub,
    sub_with_carry,
};
use crate::cpu::condition::Condition;
use crate::cpu::flags::{
    AddressBase, ExtendKind, LoadStoreKind, OperandKind, Operation, ReadWriteKind, ShiftKind,
    SignExtendedKind,
};
use crate::cpu::registers::{REG_LR, REG_PC, REG_SP};
use crate::cpu::state::{SIZE_OF_INSTRUCTION, WorkingState};
use crate::cpu::thumb::alu_instructions::{ThumbHighRegisterOperation, ThumbModeAluInstruction};
use crate::cpu::thumb::instruction::Instruction;
use crate::error::Fault;
use crate::memory::Memory;

/// Outcome of a single instruction: how far the PC moves afterwards.
/// `None` when the instruction already set it.
type Step = Result<Option<u32>, Fault>;

const ADVANCE: Step = Ok(Some(SIZE_OF_INSTRUCTION));

impl WorkingState {
    /// Executes every instruction except `SWI`, which needs the host.
    pub fn execute<M: Memory + ?Sized>(
        &mut self,
        instruction: Instruction,
        op_code: u16,
        memory: &mut M,
    ) -> Step {
        use Instruction::{
            AddOffsetSp, AddSubtract, AluOp, BranchExchange, ByteReverse, CompareBranch,
            CondBranch, Extend, HiRegisterOp, LoadAddress, LoadStoreHalfword, LoadStoreImmOffset,
            LoadStoreRegisterOffset, LoadStoreSignExtByteHalfword, LongBranchLink,
            MoveCompareAddSubtractImm, MoveShiftedRegister, MultipleLoadStore, PcRelativeLoad,
            PushPopReg, SpRelativeLoadStore, Swi, UncondBranch,
        };

        match instruction {
            MoveShiftedRegister {
                shift_operation,
                offset5,
                source_register,
                destination_register,
            } => self.move_shifted_reg(
                shift_operation,
                offset5,
                source_register,
                destination_register,
            ),
            AddSubtract {
                operation_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            } => self.add_subtract(
                operation_kind,
                subtract,
                rn_offset3,
                source_register,
                destination_register,
            ),
            MoveCompareAddSubtractImm {
                operation,
                destination_register,
                offset,
            } => self.move_compare_add_sub_imm(operation, destination_register, offset),
            AluOp {
                alu_operation,
                source_register,
                destination_register,
            } => self.alu_op(alu_operation, source_register, destination_register),
            HiRegisterOp {
                register_operation,
                source_register,
                destination_register,
            } => self.hi_reg_operation(register_operation, source_register, destination_register),
            BranchExchange {
                source_register,
                link,
            } => self.branch_exchange(source_register, link),
            PcRelativeLoad {
                destination_register,
                word8,
            } => self.pc_relative_load(destination_register, word8, memory),
            LoadStoreRegisterOffset {
                load_store,
                byte_word,
                offset_register,
                base_register,
                destination_register,
            } => {
                let address = self
                    .read(base_register)
                    .wrapping_add(self.read(offset_register));
                self.load_store(load_store, byte_word, address, destination_register, memory)
            }
            LoadStoreSignExtByteHalfword {
                kind,
                offset_register,
                base_register,
                destination_register,
            } => self.load_store_sign_extend(
                kind,
                offset_register,
                base_register,
                destination_register,
                memory,
            ),
            LoadStoreImmOffset {
                load_store,
                byte_word,
                offset5,
                base_register,
                destination_register,
            } => {
                let address = self
                    .read(base_register)
                    .wrapping_add(offset5 << byte_word.offset_shift());
                self.load_store(load_store, byte_word, address, destination_register, memory)
            }
            LoadStoreHalfword {
                load_store,
                offset5,
                base_register,
                source_destination_register,
            } => self.load_store_halfword(
                load_store,
                offset5,
                base_register,
                source_destination_register,
                memory,
            ),
            SpRelativeLoadStore {
                load_store,
                destination_register,
                word8,
            } => {
                let address = self.read(REG_SP).wrapping_add(word8 << 2);
                self.load_store(
                    load_store,
                    ReadWriteKind::Word,
                    address,
                    destination_register,
                    memory,
                )
            }
            LoadAddress {
                base,
                destination_register,
                word8,
            } => self.load_address(base, destination_register, word8),
            AddOffsetSp { negative, word7 } => self.add_offset_sp(negative, word7),
            CompareBranch {
                non_zero,
                register,
                offset,
            } => self.compare_branch(non_zero, register, offset),
            Extend {
                kind,
                source_register,
                destination_register,
            } => self.extend(kind, source_register, destination_register),
            ByteReverse {
                source_register,
                destination_register,
            } => {
                self.write(destination_register, self.read(source_register).swap_bytes());
                ADVANCE
            }
            PushPopReg {
                load_store,
                pc_lr,
                register_list,
            } => self.push_pop_register(load_store, pc_lr, register_list, memory),
            MultipleLoadStore {
                load_store,
                base_register,
                register_list,
            } => self.multiple_load_store(load_store, base_register, register_list, memory),
            CondBranch {
                condition,
                immediate_offset,
            } => self.cond_branch(condition, immediate_offset),
            UncondBranch { offset } => self.uncond_branch(offset),
            LongBranchLink { h, offset } => self.long_branch_link(h, offset),
            // Handled by the interrupt gateway before reaching here.
            Swi { .. } => Err(Fault::InternalLogic { opcode: op_code }),
        }
    }

    fn move_shifted_reg(&mut self, op: ShiftKind, offset5: u32, rs: usize, rd: usize) -> Step {
        let r = shift_immediate(op, offset5, self.read(rs), self.flags.c);
        self.write(rd, r.result);
        self.flags.set_logical_flags(&r);

        ADVANCE
    }

    fn add_subtract(
        &mut self,
        operation_kind: OperandKind,
        subtract: bool,
        rn_offset3: u32,
        rs: usize,
        rd: usize,
    ) -> Step {
        let left = self.read(rs);
        let right = match operation_kind {
            OperandKind::Immediate => rn_offset3,
            OperandKind::Register => self.read(rn_offset3 as usize),
        };

        let r = if subtract {
            sub(left, right)
        } else {
            add(left, right)
        };
        self.write(rd, r.result);
        self.flags.set_flags(&r);

        ADVANCE
    }

    fn move_compare_add_sub_imm(&mut self, op: Operation, rd: usize, offset: u32) -> Step {
        let current = self.read(rd);
        match op {
            Operation::Mov => {
                self.write(rd, offset);
                self.flags.set_sign_zero(offset);
            }
            Operation::Cmp => self.flags.set_flags(&sub(current, offset)),
            Operation::Add => self.write_with_flags(rd, &add(current, offset)),
            Operation::Sub => self.write_with_flags(rd, &sub(current, offset)),
        }

        ADVANCE
    }

    fn write_with_flags(&mut self, rd: usize, r: &ArithmeticOpResult) {
        self.write(rd, r.result);
        self.flags.set_flags(r);
    }

    fn alu_op(&mut self, op: ThumbModeAluInstruction, rs: usize, rd: usize) -> Step {
        use ThumbModeAluInstruction::{
            Adc, And, Asr, Bic, Cmn, Cmp, Eor, Lsl, Lsr, Mul, Mvn, Neg, Orr, Ror, Sbc, Tst,
        };

        let left = self.read(rd);
        let right = self.read(rs);
        let carry = self.flags.c;

        let result = match op {
            And | Tst => self.logical(left & right),
            Eor => self.logical(left ^ right),
            Orr => self.logical(left | right),
            Bic => self.logical(left & !right),
            Mvn => self.logical(!right),
            Lsl | Lsr | Asr | Ror => {
                let kind = match op {
                    Lsl => ShiftKind::Lsl,
                    Lsr => ShiftKind::Lsr,
                    Asr => ShiftKind::Asr,
                    _ => ShiftKind::Ror,
                };
                // Only the bottom byte of Rs counts.
                let r = shift_by_register(kind, right as u8, left, carry);
                self.flags.set_logical_flags(&r);
                r.result
            }
            Adc => self.arithmetic(&add_with_carry(left, right, carry)),
            Sbc => self.arithmetic(&sub_with_carry(left, right, carry)),
            Neg => self.arithmetic(&sub(0, right)),
            Cmp => self.arithmetic(&sub(left, right)),
            Cmn => self.arithmetic(&add(left, right)),
            Mul => self.arithmetic(&multiply(left, right, carry)),
        };

        if op.writes_result() {
            self.write(rd, result);
        }

        ADVANCE
    }

    /// N and Z from `result`, C and V untouched.
    fn logical(&mut self, result: u32) -> u32 {
        self.flags.set_sign_zero(result);
        result
    }

    fn arithmetic(&mut self, r: &ArithmeticOpResult) -> u32 {
        self.flags.set_flags(r);
        r.result
    }

    fn hi_reg_operation(
        &mut self,
        op: ThumbHighRegisterOperation,
        rs: usize,
        rd: usize,
    ) -> Step {
        let value = match op {
            ThumbHighRegisterOperation::Add => self.read(rd).wrapping_add(self.read(rs)),
            ThumbHighRegisterOperation::Mov => self.read(rs),
            ThumbHighRegisterOperation::Cmp => {
                self.flags.set_flags(&sub(self.read(rd), self.read(rs)));
                return ADVANCE;
            }
        };

        if rd == REG_PC {
            self.pc = value & !1;
            return Ok(None);
        }

        self.write(rd, value);
        ADVANCE
    }

    fn branch_exchange(&mut self, rs: usize, link: bool) -> Step {
        let target = self.read(rs);
        if !target.get_bit(0) {
            return Err(Fault::InvalidAddress { target });
        }

        if link {
            self.write(REG_LR, self.next_pc() | 1);
        }
        self.pc = target & !1;

        Ok(None)
    }

    /// The PC operand is word-aligned before the offset is added.
    fn pc_relative_load<M: Memory + ?Sized>(
        &mut self,
        rd: usize,
        word8: u32,
        memory: &M,
    ) -> Step {
        let address = (self.read(REG_PC) & !3).wrapping_add(word8 << 2);
        self.write(rd, memory.read_int(address)?);

        ADVANCE
    }

    fn load_store<M: Memory + ?Sized>(
        &mut self,
        load_store: LoadStoreKind,
        byte_word: ReadWriteKind,
        address: u32,
        rd: usize,
        memory: &mut M,
    ) -> Step {
        match (load_store, byte_word) {
            (LoadStoreKind::Store, ReadWriteKind::Word) => {
                memory.write_int(address, self.read(rd))?;
            }
            (LoadStoreKind::Store, ReadWriteKind::Byte) => {
                memory.write_byte(address, self.read(rd) as u8)?;
            }
            (LoadStoreKind::Load, ReadWriteKind::Word) => {
                self.write(rd, memory.read_int(address)?);
            }
            (LoadStoreKind::Load, ReadWriteKind::Byte) => {
                self.write(rd, u32::from(memory.read_byte(address)?));
            }
        }

        ADVANCE
    }

    fn load_store_sign_extend<M: Memory + ?Sized>(
        &mut self,
        kind: SignExtendedKind,
        ro: usize,
        rb: usize,
        rd: usize,
        memory: &mut M,
    ) -> Step {
        let address = self.read(rb).wrapping_add(self.read(ro));

        match kind {
            SignExtendedKind::StoreHalfword => memory.write_short(address, self.read(rd) as u16)?,
            SignExtendedKind::LoadHalfword => {
                self.write(rd, u32::from(memory.read_short(address)?));
            }
            SignExtendedKind::LoadSignedByte => {
                self.write(rd, u32::from(memory.read_byte(address)?).sign_extended(8));
            }
            SignExtendedKind::LoadSignedHalfword => {
                self.write(rd, u32::from(memory.read_short(address)?).sign_extended(16));
            }
        }

        ADVANCE
    }

    fn load_store_halfword<M: Memory + ?Sized>(
        &mut self,
        load_store: LoadStoreKind,
        offset5: u32,
        rb: usize,
        rd: usize,
        memory: &mut M,
    ) -> Step {
        let address = self.read(rb).wrapping_add(offset5 << 1);

        match load_store {
            LoadStoreKind::Load => self.write(rd, u32::from(memory.read_short(address)?)),
            LoadStoreKind::Store => memory.write_short(address, self.read(rd) as u16)?,
        }

        ADVANCE
    }

    fn load_address(&mut self, base: AddressBase, rd: usize, word8: u32) -> Step {
        let base = match base {
            AddressBase::Pc => self.read(REG_PC) & !3,
            AddressBase::Sp => self.read(REG_SP),
        };
        self.write(rd, base.wrapping_add(word8 << 2));

        ADVANCE
    }

    fn add_offset_sp(&mut self, negative: bool, word7: u32) -> Step {
        let sp = self.read(REG_SP);
        let offset = word7 << 2;
        let sp = if negative {
            sp.wrapping_sub(offset)
        } else {
            sp.wrapping_add(offset)
        };
        self.write(REG_SP, sp);

        ADVANCE
    }

    fn compare_branch(&mut self, non_zero: bool, rn: usize, offset: u32) -> Step {
        if (self.read(rn) != 0) == non_zero {
            self.pc = self.read(REG_PC).wrapping_add(offset);
            return Ok(None);
        }

        ADVANCE
    }

    fn extend(&mut self, kind: ExtendKind, rs: usize, rd: usize) -> Step {
        self.write(rd, kind.apply(self.read(rs)));

        ADVANCE
    }

    fn push_pop_register<M: Memory + ?Sized>(
        &mut self,
        load_store: LoadStoreKind,
        pc_lr: bool,
        register_list: u8,
        memory: &mut M,
    ) -> Step {
        let mut sp = self.read(REG_SP);

        let step = match load_store {
            LoadStoreKind::Store => self.push(&mut sp, pc_lr, register_list, memory),
            LoadStoreKind::Load => self.pop(&mut sp, pc_lr, register_list, memory),
        };

        // Whatever was transferred before a fault still moves SP.
        self.write(REG_SP, sp);
        step
    }

    fn push<M: Memory + ?Sized>(
        &self,
        sp: &mut u32,
        lr: bool,
        register_list: u8,
        memory: &mut M,
    ) -> Step {
        if lr {
            *sp = sp.wrapping_sub(4);
            memory.write_int(*sp, self.read(REG_LR))?;
        }

        for r in (0..8).rev().filter(|r| register_list.get_bit(*r)) {
            *sp = sp.wrapping_sub(4);
            memory.write_int(*sp, self.read(usize::from(r)))?;
        }

        ADVANCE
    }

    fn pop<M: Memory + ?Sized>(
        &mut self,
        sp: &mut u32,
        pc: bool,
        register_list: u8,
        memory: &mut M,
    ) -> Step {
        for r in (0..8).filter(|r| register_list.get_bit(*r)) {
            self.write(usize::from(r), memory.read_int(*sp)?);
            *sp = sp.wrapping_add(4);
        }

        if !pc {
            return ADVANCE;
        }

        let target = memory.read_int(*sp)?;
        if !target.get_bit(0) {
            return Err(Fault::InvalidAddress { target });
        }
        *sp = sp.wrapping_add(4);
        self.pc = target & !1;

        Ok(None)
    }

    fn multiple_load_store<M: Memory + ?Sized>(
        &mut self,
        load_store: LoadStoreKind,
        rb: usize,
        register_list: u8,
        memory: &mut M,
    ) -> Step {
        let mut address = self.read(rb);
        let step = self.transfer_multiple(load_store, &mut address, register_list, memory);

        // Written back even when the base was also loaded.
        self.write(rb, address);
        step
    }

    fn transfer_multiple<M: Memory + ?Sized>(
        &mut self,
        load_store: LoadStoreKind,
        address: &mut u32,
        register_list: u8,
        memory: &mut M,
    ) -> Step {
        for r in (0..8).filter(|r| register_list.get_bit(*r)) {
            let r = usize::from(r);
            match load_store {
                LoadStoreKind::Store => memory.write_int(*address, self.read(r))?,
                LoadStoreKind::Load => self.write(r, memory.read_int(*address)?),
            }
            *address = address.wrapping_add(4);
        }

        ADVANCE
    }

    fn cond_branch(&mut self, condition: Condition, immediate_offset: i32) -> Step {
        if !self.flags.can_execute(condition) {
            return ADVANCE;
        }

        self.uncond_branch(immediate_offset)
    }

    fn uncond_branch(&mut self, offset: i32) -> Step {
        self.pc = self.read(REG_PC).wrapping_add_signed(offset);

        Ok(None)
    }

    /// First half parks the upper offset bits in LR, second half branches.
    fn long_branch_link(&mut self, h: bool, offset: u32) -> Step {
        if !h {
            self.write(REG_LR, offset << 12);
            return ADVANCE;
        }

        let offset = (self.read(REG_LR) | (offset << 1)).sign_extended(23);
        let next_instruction = self.next_pc();

        self.pc = next_instruction.wrapping_add(offset);
        self.write(REG_LR, next_instruction | 1);

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidMemory;
    use crate::memory::RegionMemory;
    use pretty_assertions::assert_eq;

    const RAM: u32 = 0x1000;

    fn setup() -> (WorkingState, RegionMemory) {
        let mut memory = RegionMemory::default();
        memory.map_ram("ram", RAM, 0x100).unwrap();

        let state = WorkingState {
            pc: 0x100,
            ..WorkingState::default()
        };

        (state, memory)
    }

    fn exec(state: &mut WorkingState, memory: &mut RegionMemory, op_code: u16) -> Step {
        let instruction = Instruction::try_from(op_code).unwrap();
        state.execute(instruction, op_code, memory)
    }

    #[test]
    fn check_move_compare_add_sub_imm() {
        let (mut state, mut memory) = setup();
        state.flags.c = true;
        state.flags.v = true;

        // MOV R0, #0
        assert_eq!(exec(&mut state, &mut memory, 0x2000), ADVANCE);
        assert!(state.flags.z);
        assert!(!state.flags.n);
        // MOV leaves C and V alone
        assert!(state.flags.c);
        assert!(state.flags.v);

        // SUB R0, #1
        exec(&mut state, &mut memory, 0x3801).unwrap();
        assert_eq!(state.registers[0], 0xFFFF_FFFF);
        assert!(state.flags.n);
        assert!(!state.flags.z);
        assert!(!state.flags.c);
        assert!(!state.flags.v);

        // CMP R0, #1 keeps R0
        exec(&mut state, &mut memory, 0x2801).unwrap();
        assert_eq!(state.registers[0], 0xFFFF_FFFF);
        assert!(state.flags.c);
    }

    #[test]
    fn check_move_shifted_register() {
        let (mut state, mut memory) = setup();
        state.registers[1] = 0x8000_0001;

        // LSR R0, R1, #0 means #32
        exec(&mut state, &mut memory, 0b000_01_00000_001_000).unwrap();
        assert_eq!(state.registers[0], 0);
        assert!(state.flags.c);
        assert!(state.flags.z);

        // ASR R0, R1, #1
        exec(&mut state, &mut memory, 0b000_10_00001_001_000).unwrap();
        assert_eq!(state.registers[0], 0xC000_0000);
        assert!(state.flags.c);
        assert!(state.flags.n);

        // LSL R0, R1, #1
        exec(&mut state, &mut memory, 0b000_00_00001_001_000).unwrap();
        assert_eq!(state.registers[0], 2);
        assert!(state.flags.c);
        assert!(!state.flags.n);
    }

    #[test]
    fn check_add_subtract_register() {
        let (mut state, mut memory) = setup();
        state.registers[1] = 0x7FFF_FFFF;
        state.registers[2] = 1;

        // ADD R0, R1, R2
        exec(&mut state, &mut memory, 0b0001100_010_001_000).unwrap();
        assert_eq!(state.registers[0], 0x8000_0000);
        assert!(state.flags.v);
        assert!(state.flags.n);
        assert!(!state.flags.c);
    }

    #[test]
    fn comparisons_never_write() {
        let (mut state, mut memory) = setup();
        state.registers[0] = 5;
        state.registers[1] = 5;

        // TST, CMP, CMN R0, R1
        for op_code in [0x4208, 0x4288, 0x42C8] {
            exec(&mut state, &mut memory, op_code).unwrap();
            assert_eq!(state.registers[0], 5);
        }
        assert!(!state.flags.z);

        // CMP R0, R1 again, Z comes from the comparison
        exec(&mut state, &mut memory, 0x4288).unwrap();
        assert!(state.flags.z);
        assert!(state.flags.c);
    }

    #[test]
    fn check_alu_shifts_by_register() {
        let (mut state, mut memory) = setup();
        state.registers[0] = 0x8000_0001;
        state.registers[1] = 0xFFFF_FF20;

        // LSL R0, R1 by 32 (bottom byte of R1)
        exec(&mut state, &mut memory, 0x4088).unwrap();
        assert_eq!(state.registers[0], 0);
        assert!(state.flags.c);
        assert!(state.flags.z);

        state.registers[0] = 0x8000_0000;
        state.registers[1] = 0xFF;
        // ASR R0, R1 by 255
        exec(&mut state, &mut memory, 0x4108).unwrap();
        assert_eq!(state.registers[0], 0xFFFF_FFFF);
        assert!(state.flags.c);
        assert!(state.flags.n);

        state.registers[0] = 0x1234;
        state.registers[1] = 0x100;
        state.flags.c = false;
        // LSR R0, R1 by 0: value and carry kept
        exec(&mut state, &mut memory, 0x40C8).unwrap();
        assert_eq!(state.registers[0], 0x1234);
        assert!(!state.flags.c);
    }

    #[test]
    fn check_adc_sbc_neg() {
        let (mut state, mut memory) = setup();
        state.registers[0] = 0xFFFF_FFFF;
        state.registers[1] = 0;
        state.flags.c = true;

        // ADC R0, R1
        exec(&mut state, &mut memory, 0x4148).unwrap();
        assert_eq!(state.registers[0], 0);
        assert!(state.flags.c);
        assert!(state.flags.z);

        // SBC R0, R1 with carry set: 0 - 0
        exec(&mut state, &mut memory, 0x4188).unwrap();
        assert_eq!(state.registers[0], 0);
        assert!(state.flags.c);

        state.registers[1] = 1;
        // NEG R0, R1
        exec(&mut state, &mut memory, 0x4248).unwrap();
        assert_eq!(state.registers[0], 0xFFFF_FFFF);
        assert!(!state.flags.c);
        assert!(state.flags.n);
    }

    #[test]
    fn multiply_clears_overflow_and_keeps_carry() {
        let (mut state, mut memory) = setup();
        state.registers[0] = 3;
        state.registers[1] = 7;
        state.flags.c = true;
        state.flags.v = true;

        // MUL R0, R1
        exec(&mut state, &mut memory, 0x4348).unwrap();
        assert_eq!(state.registers[0], 21);
        assert!(state.flags.c);
        assert!(!state.flags.v);

        state.flags.c = false;
        state.registers[0] = 0x1_0000;
        state.registers[1] = 0x1_0000;
        exec(&mut state, &mut memory, 0x4348).unwrap();
        assert_eq!(state.registers[0], 0);
        assert!(state.flags.z);
        // product did not fit
        assert!(state.flags.c);
    }

    #[test]
    fn check_logical_ops() {
        let (mut state, mut memory) = setup();
        state.registers[0] = 0b1100;
        state.registers[1] = 0b1010;
        state.flags.c = true;

        // BIC R0, R1
        exec(&mut state, &mut memory, 0x4388).unwrap();
        assert_eq!(state.registers[0], 0b0100);
        assert!(state.flags.c);

        // MVN R0, R1
        exec(&mut state, &mut memory, 0x43C8).unwrap();
        assert_eq!(state.registers[0], !0b1010);
        assert!(state.flags.n);
    }

    #[test]
    fn check_hi_register_operations() {
        let (mut state, mut memory) = setup();
        state.registers[8] = 0x10;

        // ADD R0, PC
        exec(&mut state, &mut memory, 0x4478).unwrap();
        assert_eq!(state.registers[0], 0x104);

        // MOV R9, R8
        exec(&mut state, &mut memory, 0x46C1).unwrap();
        assert_eq!(state.registers[9], 0x10);

        // CMP R9, R8
        exec(&mut state, &mut memory, 0x45C1).unwrap();
        assert!(state.flags.z);

        // MOV PC, R8
        assert_eq!(exec(&mut state, &mut memory, 0x46C7), Ok(None));
        assert_eq!(state.pc, 0x10);

        state.pc = 0x100;
        state.registers[8] = 0x21;
        // ADD PC, R8: 0x104 + 0x21, bit 0 dropped
        assert_eq!(exec(&mut state, &mut memory, 0x44C7), Ok(None));
        assert_eq!(state.pc, 0x124);

        state.pc = 0x100;
        state.registers[8] = 0x104;
        // CMP R8, PC
        assert_eq!(exec(&mut state, &mut memory, 0x45F8), Ok(Some(2)));
        assert!(state.flags.z);
        assert!(state.flags.c);
        assert_eq!(state.pc, 0x100);

        state.registers[8] = 0x200;
        // CMP PC, R8 only sets flags
        assert_eq!(exec(&mut state, &mut memory, 0x45C7), Ok(Some(2)));
        assert!(state.flags.n);
        assert!(!state.flags.c);
        assert!(!state.flags.z);
        assert_eq!(state.pc, 0x100);
        assert_eq!(state.registers[8], 0x200);
    }

    #[test]
    fn branch_exchange_requires_thumb_target() {
        let (mut state, mut memory) = setup();
        state.registers[REG_LR] = 0x200;

        // BX LR
        assert_eq!(
            exec(&mut state, &mut memory, 0x4770),
            Err(Fault::InvalidAddress { target: 0x200 })
        );
        assert_eq!(state.pc, 0x100);

        state.registers[3] = 0x301;
        // BLX R3
        assert_eq!(exec(&mut state, &mut memory, 0x4798), Ok(None));
        assert_eq!(state.pc, 0x300);
        assert_eq!(state.registers[REG_LR], 0x103);
    }

    #[test]
    fn check_pc_relative_load_and_load_address() {
        let (mut state, mut memory) = setup();
        state.pc = RAM + 2;
        memory.write_int(RAM + 8, 0xCAFE_BABE).unwrap();

        // LDR R2, [PC, #4]: (0x1006 & !3) + 4
        exec(&mut state, &mut memory, 0x4A01).unwrap();
        assert_eq!(state.registers[2], 0xCAFE_BABE);

        // ADD R1, PC, #8
        exec(&mut state, &mut memory, 0xA102).unwrap();
        assert_eq!(state.registers[1], RAM + 12);

        state.registers[REG_SP] = 0x2000;
        // ADD R1, SP, #8
        exec(&mut state, &mut memory, 0xA902).unwrap();
        assert_eq!(state.registers[1], 0x2008);
    }

    #[test]
    fn check_loads_and_stores() {
        let (mut state, mut memory) = setup();
        state.registers[0] = 0xFFFF_FF80;
        state.registers[1] = RAM;
        state.registers[2] = 4;

        // STR R0, [R1, R2]
        exec(&mut state, &mut memory, 0x5088).unwrap();
        assert_eq!(memory.read_int(RAM + 4), Ok(0xFFFF_FF80));

        // LDRB R3, [R1, R2]
        exec(&mut state, &mut memory, 0x5C8B).unwrap();
        assert_eq!(state.registers[3], 0x80);

        // LDSB R3, [R1, R2]
        exec(&mut state, &mut memory, 0x568B).unwrap();
        assert_eq!(state.registers[3], 0xFFFF_FF80);

        // LDRH R3, [R1, R2]
        exec(&mut state, &mut memory, 0x5A8B).unwrap();
        assert_eq!(state.registers[3], 0xFF80);

        // LDSH R3, [R1, R2]
        exec(&mut state, &mut memory, 0x5E8B).unwrap();
        assert_eq!(state.registers[3], 0xFFFF_FF80);

        // STRB R0, [R1, #1]
        exec(&mut state, &mut memory, 0x7048).unwrap();
        assert_eq!(memory.read_byte(RAM + 1), Ok(0x80));

        // STRH R0, [R1, #2]
        exec(&mut state, &mut memory, 0x8048).unwrap();
        assert_eq!(memory.read_short(RAM + 2), Ok(0xFF80));

        // LDR R4, [R1, #4]
        exec(&mut state, &mut memory, 0x684C).unwrap();
        assert_eq!(state.registers[4], 0xFFFF_FF80);

        state.registers[REG_SP] = RAM + 0x10;
        // STR R4, [SP, #4] then LDR R5, [SP, #4]
        exec(&mut state, &mut memory, 0x9401).unwrap();
        exec(&mut state, &mut memory, 0x9D01).unwrap();
        assert_eq!(state.registers[5], 0xFFFF_FF80);
    }

    #[test]
    fn invalid_memory_propagates() {
        let (mut state, mut memory) = setup();
        state.registers[1] = 0x10;

        // LDR R0, [R1, #0]
        assert_eq!(
            exec(&mut state, &mut memory, 0x6808),
            Err(Fault::InvalidMemory(InvalidMemory::new(0x10, 4)))
        );
    }

    #[test]
    fn check_add_offset_sp_and_extend() {
        let (mut state, mut memory) = setup();
        state.registers[REG_SP] = 0x100;

        // SUB SP, #8
        exec(&mut state, &mut memory, 0xB082).unwrap();
        assert_eq!(state.registers[REG_SP], 0xF8);
        // ADD SP, #12
        exec(&mut state, &mut memory, 0xB003).unwrap();
        assert_eq!(state.registers[REG_SP], 0x104);

        state.registers[1] = 0x1234_5680;
        // SXTB R0, R1
        exec(&mut state, &mut memory, 0xB248).unwrap();
        assert_eq!(state.registers[0], 0xFFFF_FF80);
        // UXTH R0, R1
        exec(&mut state, &mut memory, 0xB288).unwrap();
        assert_eq!(state.registers[0], 0x5680);
        // REV R0, R1
        exec(&mut state, &mut memory, 0xBA08).unwrap();
        assert_eq!(state.registers[0], 0x8056_3412);
    }

    #[test]
    fn check_compare_branch() {
        let (mut state, mut memory) = setup();

        // CBZ R2, #+8 taken
        assert_eq!(exec(&mut state, &mut memory, 0xB112), Ok(None));
        assert_eq!(state.pc, 0x108);

        // CBNZ R2 not taken
        assert_eq!(exec(&mut state, &mut memory, 0xB912), ADVANCE);
        assert_eq!(state.pc, 0x108);
        assert!(!state.flags.z);
    }

    #[test]
    fn push_then_pop_round_trip() {
        let (mut state, mut memory) = setup();
        state.registers[REG_SP] = RAM + 0x100;
        state.registers[0] = 0xA;
        state.registers[1] = 0xB;
        state.registers[REG_LR] = 0x201;

        // PUSH {R0, R1, LR}
        exec(&mut state, &mut memory, 0xB503).unwrap();
        assert_eq!(state.registers[REG_SP], RAM + 0xF4);
        assert_eq!(memory.read_int(RAM + 0xF4), Ok(0xA));
        assert_eq!(memory.read_int(RAM + 0xF8), Ok(0xB));
        assert_eq!(memory.read_int(RAM + 0xFC), Ok(0x201));

        state.registers[0] = 0;
        state.registers[1] = 0;
        // POP {R0, R1, PC}
        assert_eq!(exec(&mut state, &mut memory, 0xBD03), Ok(None));
        assert_eq!(state.registers[REG_SP], RAM + 0x100);
        assert_eq!(state.registers[0], 0xA);
        assert_eq!(state.registers[1], 0xB);
        assert_eq!(state.pc, 0x200);
    }

    #[test]
    fn pop_into_arm_state_is_refused() {
        let (mut state, mut memory) = setup();
        state.registers[REG_SP] = RAM;
        memory.write_int(RAM, 7).unwrap();
        memory.write_int(RAM + 4, 0x400).unwrap();

        // POP {R0, PC}
        assert_eq!(
            exec(&mut state, &mut memory, 0xBD01),
            Err(Fault::InvalidAddress { target: 0x400 })
        );
        assert_eq!(state.registers[0], 7);
        assert_eq!(state.registers[REG_SP], RAM + 4);
        assert_eq!(state.pc, 0x100);
    }

    #[test]
    fn partial_push_still_moves_sp() {
        let (mut state, mut memory) = setup();
        state.registers[REG_SP] = RAM + 4;

        // PUSH {R0, R1}: R1 lands at RAM, R0 below the region
        assert_eq!(
            exec(&mut state, &mut memory, 0xB403),
            Err(Fault::InvalidMemory(InvalidMemory::new(RAM - 4, 4)))
        );
        assert_eq!(state.registers[REG_SP], RAM - 4);
    }

    #[test]
    fn multiple_load_store_writes_back_base() {
        let (mut state, mut memory) = setup();
        state.registers[0] = RAM;
        state.registers[1] = 0x11;
        state.registers[2] = 0x22;

        // STMIA R0!, {R1, R2}
        exec(&mut state, &mut memory, 0xC006).unwrap();
        assert_eq!(state.registers[0], RAM + 8);
        assert_eq!(memory.read_int(RAM), Ok(0x11));
        assert_eq!(memory.read_int(RAM + 4), Ok(0x22));

        state.registers[3] = RAM;
        // LDMIA R3!, {R0, R3}: the base ends written back
        exec(&mut state, &mut memory, 0xCB09).unwrap();
        assert_eq!(state.registers[0], 0x11);
        assert_eq!(state.registers[3], RAM + 8);
    }

    #[test]
    fn partial_block_load_commits_base() {
        let (mut state, mut memory) = setup();
        state.registers[0] = RAM + 0xFC;

        // LDMIA R0!, {R1, R2}
        assert_eq!(
            exec(&mut state, &mut memory, 0xC806),
            Err(Fault::InvalidMemory(InvalidMemory::new(RAM + 0x100, 4)))
        );
        assert_eq!(state.registers[0], RAM + 0x100);
        assert_eq!(state.registers[1], 0);
    }

    #[test]
    fn check_branches() {
        let (mut state, mut memory) = setup();

        // BEQ +2 not taken
        assert_eq!(exec(&mut state, &mut memory, 0xD001), ADVANCE);
        assert_eq!(state.pc, 0x100);

        state.flags.z = true;
        // BEQ +2 taken: 0x100 + 4 + 2
        assert_eq!(exec(&mut state, &mut memory, 0xD001), Ok(None));
        assert_eq!(state.pc, 0x106);

        // B -4
        exec(&mut state, &mut memory, 0xE7FE).unwrap();
        assert_eq!(state.pc, 0x106);
    }

    #[test]
    fn check_long_branch_link() {
        let (mut state, mut memory) = setup();

        // BL +0x1000 from 0x100
        assert_eq!(exec(&mut state, &mut memory, 0xF001), ADVANCE);
        assert_eq!(state.registers[REG_LR], 0x1000);

        state.pc = 0x102;
        assert_eq!(exec(&mut state, &mut memory, 0xF800), Ok(None));
        assert_eq!(state.pc, 0x1104);
        assert_eq!(state.registers[REG_LR], 0x105);

        // BL -4 from 0x200
        state.pc = 0x200;
        exec(&mut state, &mut memory, 0xF7FF).unwrap();
        state.pc = 0x202;
        exec(&mut state, &mut memory, 0xFFFE).unwrap();
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.registers[REG_LR], 0x205);
    }

    #[test]
    fn swi_is_not_executed_here() {
        let (mut state, mut memory) = setup();
        assert_eq!(
            exec(&mut state, &mut memory, 0xDF01),
            Err(Fault::InternalLogic { opcode: 0xDF01 })
        );
    }
}
