use std::fmt;

use nix::errno::Errno;
use tracing::trace;

use crate::error::{Error, Result};
use crate::getreg;
use crate::memory;
use crate::ptrace::Tracee;

/// User code segment selector of a 64-bit task.
pub const CS_X86_64: u64 = 0x33;
/// User code segment selector of a 32-bit compat task.
pub const CS_X86: u64 = 0x23;
/// `int $0x80`, the gate into the i386 syscall table.
const INT_80: [u8; 2] = [0xcd, 0x80];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Abi {
  X86,
  X86_64
}

impl Abi {
  pub fn word_size(self) -> usize {
    match self {
      Abi::X86 => 4,
      Abi::X86_64 => 8
    }
  }
}

impl fmt::Display for Abi {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Abi::X86 => f.write_str("i386"),
      Abi::X86_64 => f.write_str("x86_64")
    }
  }
}

macro_rules! register_layout {
  ($name:ident, $ty:ty, [$($field:ident),* $(,)?]) => {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct $name {
      $(pub $field: $ty),*
    }

    impl $name {
      pub const SIZE: usize = [$(stringify!($field)),*].len() * std::mem::size_of::<$ty>();

      /// Decodes the kernel's `NT_PRSTATUS` layout field by field.
      pub fn from_ne_bytes(bytes: &[u8]) -> Option<$name> {
        if bytes.len() != Self::SIZE {
          return None;
        }
        let mut words = bytes.chunks_exact(std::mem::size_of::<$ty>()).map(|chunk| {
          let mut word = [0u8; std::mem::size_of::<$ty>()];
          word.copy_from_slice(chunk);
          <$ty>::from_ne_bytes(word)
        });
        Some($name { $($field: words.next()?),* })
      }

      pub fn to_ne_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        $(bytes.extend_from_slice(&self.$field.to_ne_bytes());)*
        bytes
      }
    }
  };
}

register_layout!(Registers64, u64, [
  r15, r14, r13, r12, rbp, rbx, r11, r10, r9, r8, rax, rcx, rdx, rsi, rdi,
  orig_rax, rip, cs, eflags, rsp, ss, fs_base, gs_base, ds, es, fs, gs
]);

register_layout!(Registers32, u32, [
  ebx, ecx, edx, esi, edi, ebp, eax, xds, xes, xfs, xgs, orig_eax, eip, xcs,
  eflags, esp, xss
]);

#[cfg(target_arch="x86_64")]
impl From<&nix::libc::user_regs_struct> for Registers64 {
  fn from(r: &nix::libc::user_regs_struct) -> Self {
    Registers64 {
      r15: r.r15, r14: r.r14, r13: r.r13, r12: r.r12,
      rbp: r.rbp, rbx: r.rbx, r11: r.r11, r10: r.r10,
      r9: r.r9, r8: r.r8, rax: r.rax, rcx: r.rcx,
      rdx: r.rdx, rsi: r.rsi, rdi: r.rdi, orig_rax: r.orig_rax,
      rip: r.rip, cs: r.cs, eflags: r.eflags, rsp: r.rsp,
      ss: r.ss, fs_base: r.fs_base, gs_base: r.gs_base,
      ds: r.ds, es: r.es, fs: r.fs, gs: r.gs
    }
  }
}

/// Rebuilds the i386 view of a compat task from a 64-bit shaped read.
impl From<&Registers64> for Registers32 {
  fn from(r: &Registers64) -> Self {
    Registers32 {
      ebx: r.rbx as u32,
      ecx: r.rcx as u32,
      edx: r.rdx as u32,
      esi: r.rsi as u32,
      edi: r.rdi as u32,
      ebp: r.rbp as u32,
      eax: r.rax as u32,
      xds: r.ds as u32,
      xes: r.es as u32,
      xfs: r.fs as u32,
      xgs: r.gs as u32,
      orig_eax: r.orig_rax as u32,
      eip: r.rip as u32,
      xcs: r.cs as u32,
      eflags: r.eflags as u32,
      esp: r.rsp as u32,
      xss: r.ss as u32
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterSnapshot {
  X86(Registers32),
  X86_64(Registers64)
}

impl RegisterSnapshot {
  pub fn from_registers64(regs: Registers64) -> Result<RegisterSnapshot> {
    match regs.cs {
      CS_X86_64 => Ok(RegisterSnapshot::X86_64(regs)),
      CS_X86 => Ok(RegisterSnapshot::X86(Registers32::from(&regs))),
      cs => Err(Error::UnsupportedAbi(cs))
    }
  }

  pub fn from_registers32(regs: Registers32) -> Result<RegisterSnapshot> {
    match regs.xcs as u64 {
      CS_X86 => Ok(RegisterSnapshot::X86(regs)),
      cs => Err(Error::UnsupportedAbi(cs))
    }
  }

  pub fn abi(&self) -> Abi {
    match self {
      RegisterSnapshot::X86(_) => Abi::X86,
      RegisterSnapshot::X86_64(_) => Abi::X86_64
    }
  }

  pub fn syscall_number(&self) -> u64 {
    match self {
      RegisterSnapshot::X86(r) => r.orig_eax as u64,
      RegisterSnapshot::X86_64(r) => getreg!(r, syscall_nr)
    }
  }

  /// Syscall return value at an exit stop, sign-extended from the ABI width.
  pub fn return_value(&self) -> i64 {
    match self {
      RegisterSnapshot::X86(r) => r.eax as i32 as i64,
      RegisterSnapshot::X86_64(r) => getreg!(r, rax) as i64
    }
  }

  pub fn args(&self) -> [u64; 6] {
    extract_args(self)
  }
}

/// Maps the six syscall argument registers of the snapshot's ABI onto
/// zero-extended 64-bit slots.
pub fn extract_args(snapshot: &RegisterSnapshot) -> [u64; 6] {
  match snapshot {
    RegisterSnapshot::X86_64(r) => [
      getreg!(r, arg0),
      getreg!(r, arg1),
      getreg!(r, arg2),
      getreg!(r, arg3),
      getreg!(r, arg4),
      getreg!(r, arg5)
    ],
    RegisterSnapshot::X86(r) => [
      r.ebx as u64,
      r.ecx as u64,
      r.edx as u64,
      r.esi as u64,
      r.edi as u64,
      r.ebp as u64
    ]
  }
}

pub fn read_registers(tracee: &dyn Tracee) -> Result<RegisterSnapshot> {
  let mut buf = [0u8; Registers64::SIZE];
  match tracee.getregset(&mut buf) {
    Ok(len) if len == Registers64::SIZE => {
      let regs = Registers64::from_ne_bytes(&buf).ok_or(Error::RegsetSize(len))?;
      RegisterSnapshot::from_registers64(regs)
    }
    Ok(len) if len == Registers32::SIZE => {
      let regs = Registers32::from_ne_bytes(&buf[..len]).ok_or(Error::RegsetSize(len))?;
      RegisterSnapshot::from_registers32(regs)
    }
    Ok(len) => Err(Error::RegsetSize(len)),
    Err(Errno::EIO | Errno::EINVAL) => {
      trace!(pid = %tracee.pid(), "PTRACE_GETREGSET unavailable, using PTRACE_GETREGS");
      let regs = tracee.getregs().map_err(Error::Registers)?;
      RegisterSnapshot::from_registers64(regs)
    }
    Err(err) => Err(Error::Registers(err))
  }
}

/// Registers of a syscall-entry stop in the ABI the kernel serves the call
/// with. A 64-bit task entering through `int $0x80` goes through the i386
/// table, so its stop is rebuilt as an i386 snapshot.
pub fn read_entry_registers(tracee: &dyn Tracee) -> Result<RegisterSnapshot> {
  let snapshot = read_registers(tracee)?;
  let RegisterSnapshot::X86_64(regs) = snapshot else {
    return Ok(snapshot);
  };
  let gate = getreg!(regs, rip).wrapping_sub(INT_80.len() as u64);
  if memory::read_aligned(tracee, gate, INT_80.len())? == INT_80 {
    trace!(pid = %tracee.pid(), rip = getreg!(regs, rip), "int 0x80 from a 64-bit task");
    return Ok(RegisterSnapshot::X86(Registers32::from(&regs)));
  }
  Ok(snapshot)
}
