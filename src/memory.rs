//! Reads from the tracee's address space, one word at a time.

use nix::errno::Errno;

use crate::error::{Error, Result};
use crate::ptrace::Tracee;
use crate::regs::Abi;

fn word_at(tracee: &dyn Tracee, abi: Abi, addr: u64, offset: usize) -> Result<Vec<u8>> {
  let addr = addr.checked_add(offset as u64)
    .ok_or(Error::MemoryRead { addr, source: Errno::EFAULT })?;
  let word = tracee.peek(addr).map_err(|source| Error::MemoryRead { addr, source })?;
  Ok(word.to_ne_bytes()[..abi.word_size()].to_vec())
}

/// Copies `len` bytes starting at `addr`. Every word is fetched whole; the
/// trailing partial word is read once and only its leading bytes are kept.
pub fn read_buffer(tracee: &dyn Tracee, abi: Abi, addr: u64, len: usize) -> Result<Vec<u8>> {
  let word_size = abi.word_size();
  let words = len / word_size;
  let remainder = len % word_size;

  let mut buf = vec![0u8; len];
  for i in 0..words {
    let offset = i * word_size;
    let word = word_at(tracee, abi, addr, offset)?;
    buf[offset..offset + word_size].copy_from_slice(&word);
  }
  if remainder > 0 {
    let offset = words * word_size;
    let word = word_at(tracee, abi, addr, offset)?;
    buf[offset..].copy_from_slice(&word[..remainder]);
  }
  Ok(buf)
}

/// Copies `len` bytes at `addr` using only naturally aligned native-word
/// peeks, so no peek reaches past the page holding the bytes asked for.
pub fn read_aligned(tracee: &dyn Tracee, addr: u64, len: usize) -> Result<Vec<u8>> {
  const WORD: u64 = std::mem::size_of::<u64>() as u64;
  let mut buf = Vec::with_capacity(len);
  for offset in 0..len as u64 {
    let byte_addr = addr.checked_add(offset)
      .ok_or(Error::MemoryRead { addr, source: Errno::EFAULT })?;
    let word_addr = byte_addr & !(WORD - 1);
    let word = tracee.peek(word_addr).map_err(|source| Error::MemoryRead { addr: word_addr, source })?;
    buf.push(word.to_ne_bytes()[(byte_addr - word_addr) as usize]);
  }
  Ok(buf)
}

/// Reads a NUL-terminated string at `addr`, terminator excluded. Fails
/// instead of growing past `capacity` bytes.
pub fn read_c_string(tracee: &dyn Tracee, abi: Abi, addr: u64, capacity: usize) -> Result<Vec<u8>> {
  let word_size = abi.word_size();
  let mut buf = Vec::new();
  let mut offset = 0;
  while offset < capacity {
    let word = word_at(tracee, abi, addr, offset)?;
    for &byte in &word {
      if byte == 0 {
        return Ok(buf);
      }
      if buf.len() + 1 >= capacity {
        return Err(Error::UnterminatedString { addr, capacity });
      }
      buf.push(byte);
    }
    offset += word_size;
  }
  Err(Error::UnterminatedString { addr, capacity })
}
