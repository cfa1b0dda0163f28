//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a program that can't fit in memory.
    ProgramTooLarge { size: usize, capacity: usize },
    /// Instruction could not be decoded.
    ///
    /// The program counter is left pointing at the offending opcode.
    UnknownOpcode { opcode: u16, pc: Address },
    /// Subroutine call with every stack slot in use.
    StackOverflow { pc: Address },
    /// Subroutine return with an empty stack.
    StackUnderflow { pc: Address },
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramTooLarge { size, capacity } => write!(
                f,
                "program too large for VM memory: {size} bytes, capacity is {capacity} bytes"
            ),
            Self::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode {opcode:04X} at address {pc:04X}")
            }
            Self::StackOverflow { pc } => write!(f, "call stack overflow at address {pc:04X}"),
            Self::StackUnderflow { pc } => write!(f, "call stack underflow at address {pc:04X}"),
        }
    }
}

impl std::error::Error for Chip8Error {}
