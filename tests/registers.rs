use common::{regs64, MockTracee, Regset, TEXT};
use pwnbox::dispatcher::SyscallStop;
use pwnbox::regs::{read_entry_registers, read_registers, Abi, RegisterSnapshot, CS_X86};
use pwnbox::syscall_table::Category;
use pwnbox::Error;

mod common;

#[test]
fn getregset_64_bit_task() {
  let tracee = MockTracee::x86_64(2, [0x1000, 0, 0o644, 0, 0, 0]);
  let snapshot = read_registers(&tracee).unwrap();
  assert_eq!(snapshot.abi(), Abi::X86_64);
  assert_eq!(snapshot.syscall_number(), 2);
  assert_eq!(snapshot.args(), [0x1000, 0, 0o644, 0, 0, 0]);
}

#[test]
fn getregset_compat_task() {
  let tracee = MockTracee::x86(5, [0xffff_d000, 0, 0, 0, 0, 0xffff_ffff]);
  let snapshot = read_registers(&tracee).unwrap();
  assert_eq!(snapshot.abi(), Abi::X86);
  assert_eq!(snapshot.syscall_number(), 5);
  assert_eq!(snapshot.args(), [0xffff_d000, 0, 0, 0, 0, 0xffff_ffff]);

  let stop = SyscallStop::from_snapshot(&snapshot).unwrap();
  assert_eq!(stop.descriptor.name, "open");
  assert_eq!(stop.descriptor.category, Category::Open { path_arg: 0 });
}

#[test]
fn legacy_fallback_rebuilds_compat_registers() {
  let mut regs = regs64(4, [1, 0x0804_a000, 2, 0, 0, 0]);
  regs.rbx = 1;
  regs.rcx = 0x0804_a000;
  regs.rdx = 2;
  regs.cs = CS_X86;
  let tracee = MockTracee::new(Regset::Legacy(regs));
  let snapshot = read_registers(&tracee).unwrap();
  let RegisterSnapshot::X86(r) = snapshot else {
    panic!("expected i386 registers, got {:?}", snapshot);
  };
  assert_eq!(r.orig_eax, 4);
  assert_eq!(snapshot.args()[..3], [1, 0x0804_a000, 2]);
  assert_eq!(SyscallStop::from_snapshot(&snapshot).unwrap().descriptor.category, Category::WriteLike);
}

#[test]
fn legacy_fallback_64_bit_task() {
  let tracee = MockTracee::new(Regset::Legacy(regs64(59, [0x2000, 0, 0, 0, 0, 0])));
  let snapshot = read_registers(&tracee).unwrap();
  assert_eq!(snapshot.abi(), Abi::X86_64);
  assert_eq!(snapshot.args()[0], 0x2000);
}

#[test]
fn unknown_selector_is_fatal() {
  let mut regs = regs64(0, [0; 6]);
  regs.cs = 0x10;
  let tracee = MockTracee::new(Regset::Full(regs));
  assert!(matches!(read_registers(&tracee), Err(Error::UnsupportedAbi(0x10))));
}

#[test]
fn unexpected_regset_size_is_fatal() {
  let tracee = MockTracee::new(Regset::Odd(100));
  assert!(matches!(read_registers(&tracee), Err(Error::RegsetSize(100))));
}

#[test]
fn out_of_range_syscall_is_not_defaulted() {
  let tracee = MockTracee::x86_64(1000, [0; 6]);
  let err = SyscallStop::capture(&tracee).unwrap_err();
  assert!(matches!(err, Error::UnknownSyscall { abi: Abi::X86_64, nr: 1000 }));
}

#[test]
fn int80_from_64_bit_task_uses_i386_table() {
  let tracee = MockTracee::int80(11, [0x0804_a000, 0, 0, 0, 0, 0]);
  let snapshot = read_entry_registers(&tracee).unwrap();
  assert_eq!(snapshot.abi(), Abi::X86);
  assert_eq!(snapshot.syscall_number(), 11);
  assert_eq!(snapshot.args()[0], 0x0804_a000);

  let stop = SyscallStop::capture(&tracee).unwrap();
  assert_eq!(stop.abi, Abi::X86);
  assert_eq!(stop.descriptor.category, Category::Execve { path_arg: 0 });
}

#[test]
fn syscall_instruction_keeps_x86_64_table() {
  let stop = SyscallStop::capture(&MockTracee::x86_64(11, [0; 6])).unwrap();
  assert_eq!(stop.abi, Abi::X86_64);
  assert_eq!(stop.name(), "munmap");
}

#[test]
fn unreadable_entry_gate_is_fatal() {
  let tracee = MockTracee::new(Regset::Full(regs64(59, [0; 6])));
  let err = SyscallStop::capture(&tracee).unwrap_err();
  assert!(matches!(err, Error::MemoryRead { addr: TEXT, .. }), "{err:?}");
}
