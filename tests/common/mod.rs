use std::cell::Cell;
use std::path::Path;

use nix::errno::Errno;
use pwnbox::ptrace::{Pid, Tracee};
use pwnbox::regs::{Registers32, Registers64, CS_X86, CS_X86_64};
use pwnbox::state::State;

/// Where 64-bit mock stops sit: `rip` points just past a 2-byte gate here.
#[allow(unused)]
pub const TEXT: u64 = 0x40_1000;
#[allow(unused)]
pub const SYSCALL_INSN: [u8; 2] = [0x0f, 0x05];
#[allow(unused)]
pub const INT_80_INSN: [u8; 2] = [0xcd, 0x80];

/// Register set the mock hands out.
#[allow(unused)]
pub enum Regset {
  /// GETREGSET works and the task is 64-bit shaped.
  Full(Registers64),
  /// GETREGSET works and returns the i386 layout.
  Compat(Registers32),
  /// GETREGSET fails with EIO; GETREGS returns this.
  Legacy(Registers64),
  /// GETREGSET reports this many bytes.
  Odd(usize)
}

pub struct MockTracee {
  regset: Regset,
  memory: Vec<(u64, Vec<u8>)>,
  pub peeks: Cell<usize>,
  pub killed: Cell<bool>
}

#[allow(unused)]
impl MockTracee {
  pub fn new(regset: Regset) -> MockTracee {
    MockTracee { regset, memory: Vec::new(), peeks: Cell::new(0), killed: Cell::new(false) }
  }

  pub fn x86_64(nr: u64, args: [u64; 6]) -> MockTracee {
    MockTracee::new(Regset::Full(regs64(nr, args))).map(TEXT, &SYSCALL_INSN)
  }

  /// A 64-bit task calling through `int $0x80` with i386 argument registers.
  pub fn int80(nr: u32, args: [u32; 6]) -> MockTracee {
    let mut regs = regs64(nr as u64, [0; 6]);
    regs.rbx = args[0] as u64;
    regs.rcx = args[1] as u64;
    regs.rdx = args[2] as u64;
    regs.rsi = args[3] as u64;
    regs.rdi = args[4] as u64;
    regs.rbp = args[5] as u64;
    MockTracee::new(Regset::Full(regs)).map(TEXT, &INT_80_INSN)
  }

  pub fn x86(nr: u32, args: [u32; 6]) -> MockTracee {
    MockTracee::new(Regset::Compat(regs32(nr, args)))
  }

  pub fn map(mut self, addr: u64, bytes: &[u8]) -> MockTracee {
    self.memory.push((addr, bytes.to_vec()));
    self
  }
}

impl Tracee for MockTracee {
  fn pid(&self) -> Pid {
    Pid::from_raw(4242)
  }

  fn getregset(&self, buf: &mut [u8]) -> Result<usize, Errno> {
    let bytes = match &self.regset {
      Regset::Full(regs) => regs.to_ne_bytes(),
      Regset::Compat(regs) => regs.to_ne_bytes(),
      Regset::Legacy(_) => return Err(Errno::EIO),
      Regset::Odd(len) => vec![0; *len]
    };
    buf[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
  }

  fn getregs(&self) -> Result<Registers64, Errno> {
    match &self.regset {
      Regset::Legacy(regs) | Regset::Full(regs) => Ok(*regs),
      _ => Err(Errno::ESRCH)
    }
  }

  /// Only the first byte of the word has to be mapped; the rest of a word
  /// running off a region reads as 0xaa.
  fn peek(&self, addr: u64) -> Result<u64, Errno> {
    self.peeks.set(self.peeks.get() + 1);
    let (base, bytes) = self.memory.iter()
      .find(|(base, bytes)| addr >= *base && addr < base + bytes.len() as u64)
      .ok_or(Errno::EIO)?;
    let start = (addr - base) as usize;
    let mut word = [0xaau8; 8];
    for (i, byte) in bytes[start..].iter().take(8).enumerate() {
      word[i] = *byte;
    }
    Ok(u64::from_ne_bytes(word))
  }

  fn kill(&self) -> Result<(), Errno> {
    self.killed.set(true);
    Ok(())
  }
}

#[allow(unused)]
pub fn regs64(nr: u64, args: [u64; 6]) -> Registers64 {
  Registers64 {
    orig_rax: nr,
    rdi: args[0], rsi: args[1], rdx: args[2], r10: args[3], r8: args[4], r9: args[5],
    rip: TEXT + 2,
    cs: CS_X86_64,
    ..Default::default()
  }
}

#[allow(unused)]
pub fn regs32(nr: u32, args: [u32; 6]) -> Registers32 {
  Registers32 {
    orig_eax: nr,
    ebx: args[0], ecx: args[1], edx: args[2], esi: args[3], edi: args[4], ebp: args[5],
    xcs: CS_X86 as u32,
    ..Default::default()
  }
}

#[allow(unused)]
pub fn state_in(dir: &Path) -> State {
  State::new(dir, "test")
}

#[allow(unused)]
pub fn read_file(path: impl AsRef<Path>) -> Vec<u8> {
  std::fs::read(path).unwrap_or_default()
}
