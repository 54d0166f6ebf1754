#![allow(dead_code)]

use thumb_emu::{Cpu, InterruptHandler, RegionMemory, RegisterFile};
use tracing_subscriber::EnvFilter;

pub const CODE: u32 = 0x0800_0000;
pub const RAM: u32 = 0x0200_0000;
pub const RAM_SIZE: u32 = 0x400;

/// `MOV R8, R8`
pub const NOP: u16 = 0x46C0;

/// Honours `RUST_LOG`, e.g. `RUST_LOG=thumb_emu=trace cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Maps `program` as ROM at [`CODE`] and an empty stack in RAM, with the PC
/// on the first instruction and SP at the top of RAM.
pub fn boot<H: InterruptHandler>(program: &[u16], handler: H) -> Cpu<RegisterFile, RegionMemory, H> {
    init_tracing();

    let bytes = program
        .iter()
        .flat_map(|op_code| op_code.to_le_bytes())
        .collect::<Vec<_>>();

    let mut memory = RegionMemory::default();
    memory
        .map_rom("rom", CODE, &bytes)
        .expect("rom mapping failed");
    memory
        .map_ram("ram", RAM, RAM_SIZE)
        .expect("ram mapping failed");

    let mut registers = RegisterFile::default();
    registers.set_program_counter(CODE);
    registers[13] = RAM + RAM_SIZE;

    Cpu::new(registers, memory, handler)
}
