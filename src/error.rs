use nix::errno::Errno;
use thiserror::Error;

use crate::policy::Violation;
use crate::regs::Abi;

pub type Result<T> = std::result::Result<T, Error>;

/// Monitor exit status after the tracee was killed for a policy violation.
pub const VIOLATION_EXIT_CODE: i32 = 255;
/// Monitor exit status after any other failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

#[derive(Error, Debug)]
pub enum Error {
  #[error("unsupported ABI: code segment selector {0:#x}")]
  UnsupportedAbi(u64),

  #[error("unexpected register set size: {0} bytes")]
  RegsetSize(usize),

  #[error("failed to read registers: {0}")]
  Registers(#[source] Errno),

  #[error("failed to read tracee memory at {addr:#x}: {source}")]
  MemoryRead { addr: u64, #[source] source: Errno },

  #[error("string at {addr:#x} is not terminated within {capacity} bytes")]
  UnterminatedString { addr: u64, capacity: usize },

  #[error("syscall {nr} is not in the {abi} table")]
  UnknownSyscall { abi: Abi, nr: u64 },

  #[error("capture record of {0} bytes does not fit a 24-bit length")]
  RecordTooLarge(usize),

  #[error("truncated capture record at offset {0}")]
  TruncatedRecord(usize),

  #[error("invalid stream tag {tag:#04x} at offset {offset}")]
  InvalidTag { tag: u8, offset: usize },

  #[error("policy violation: {0}")]
  Violation(Violation),

  #[error("ptrace: {0}")]
  Ptrace(#[from] Errno),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl Error {
  pub fn exit_code(&self) -> i32 {
    match self {
      Error::Violation(_) => VIOLATION_EXIT_CODE,
      _ => FAILURE_EXIT_CODE
    }
  }
}
