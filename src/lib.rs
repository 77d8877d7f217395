//! Syscall-interception sandbox: traces a process with ptrace, captures what
//! it reads and writes, and kills it on forbidden file access, process
//! creation or program replacement.

pub mod capture;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod policy;
pub mod ptrace;
pub mod regs;
pub mod server;
pub mod state;
pub mod syscall_table;

pub mod syscalls {
  pub mod execve;
  pub mod fork;
  pub mod open;
  pub mod read;
  pub mod write;
}

pub use error::{Error, Result};
