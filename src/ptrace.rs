use std::ffi::c_void;

pub use nix::{unistd::Pid, errno::Errno, sys::ptrace::{Options, traceme, setoptions, syscall}};
use nix::{libc, sys::{ptrace, signal::{self, Signal}}};

use crate::regs::Registers64;

const NT_PRSTATUS: usize = 1;

#[macro_export]
macro_rules! getreg {
  ($r:expr, syscall_nr) => { $r.orig_rax };
  ($r:expr, arg0) => { $r.rdi };
  ($r:expr, arg1) => { $r.rsi };
  ($r:expr, arg2) => { $r.rdx };
  ($r:expr, arg3) => { $r.r10 };
  ($r:expr, arg4) => { $r.r8 };
  ($r:expr, arg5) => { $r.r9 };
  ($r:expr, rip) => { $r.rip };
  ($r:expr, rax) => { $r.rax };
}

#[cfg(target_arch="x86_64")]
#[macro_export]
macro_rules! syscall_nr {
  (read) => { 0 };
  (write) => { 1 };
  (open) => { 2 };
  (fork) => { 57 };
  (execve) => { 59 };
}

pub use getreg;
#[cfg(target_arch="x86_64")]
pub use syscall_nr;

/// The tracing facility as seen by the core: one stopped process whose
/// registers and memory can be read and which can be killed.
pub trait Tracee {
  fn pid(&self) -> Pid;

  /// Fills `buf` with the `NT_PRSTATUS` register set and returns how many
  /// bytes the kernel wrote, which identifies the layout.
  fn getregset(&self, buf: &mut [u8]) -> Result<usize, Errno>;

  /// Legacy fixed-layout retrieval, always shaped like the x86_64 set.
  fn getregs(&self) -> Result<Registers64, Errno>;

  /// Reads the native word at `addr`. Narrower ABIs use its leading bytes.
  fn peek(&self, addr: u64) -> Result<u64, Errno>;

  fn kill(&self) -> Result<(), Errno>;
}

pub struct PtraceTracee {
  pid: Pid
}

impl PtraceTracee {
  pub fn new(pid: Pid) -> PtraceTracee {
    PtraceTracee { pid }
  }
}

impl Tracee for PtraceTracee {
  fn pid(&self) -> Pid {
    self.pid
  }

  fn getregset(&self, buf: &mut [u8]) -> Result<usize, Errno> {
    let mut iov = libc::iovec {
      iov_base: buf.as_mut_ptr().cast(),
      iov_len: buf.len()
    };
    // nix's getregset hides iov_len, which is how a compat tracee shows up.
    Errno::result(unsafe {
      libc::ptrace(
        libc::PTRACE_GETREGSET,
        self.pid.as_raw(),
        NT_PRSTATUS as *mut c_void,
        &mut iov as *mut libc::iovec
      )
    })?;
    Ok(iov.iov_len.min(buf.len()))
  }

  #[cfg(target_arch="x86_64")]
  fn getregs(&self) -> Result<Registers64, Errno> {
    ptrace::getregs(self.pid).map(|regs| Registers64::from(&regs))
  }

  #[cfg(not(target_arch="x86_64"))]
  fn getregs(&self) -> Result<Registers64, Errno> {
    Err(Errno::ENOSYS)
  }

  fn peek(&self, addr: u64) -> Result<u64, Errno> {
    let addr: usize = addr.try_into().map_err(|_| Errno::EFAULT)?;
    ptrace::read(self.pid, addr as *mut c_void).map(|word| word as u64)
  }

  fn kill(&self) -> Result<(), Errno> {
    signal::kill(self.pid, Signal::SIGKILL)
  }
}
