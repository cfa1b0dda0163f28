//! Helpers for extracting operands from instruction words.
//!
//! Instructions are two bytes, stored big-endian, with the opcode
//! identity in the first 4-bit nibble.
//!
//! ```text
//! 0xF000 op
//! 0x0F00 X
//! 0x00F0 Y
//! 0x000F N
//! 0x00FF NN
//! 0x0FFF NNN
//! ```

/// A single fetched instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr(pub u16);

impl Instr {
    /// Combine the high and low bytes fetched from memory.
    #[inline(always)]
    pub fn from_bytes([a, b]: [u8; 2]) -> Self {
        Self(((a as u16) << 8) | b as u16)
    }

    /// Raw 16-bit instruction word.
    #[inline(always)]
    pub fn word(self) -> u16 {
        self.0
    }

    /// Primary opcode in the upper nibble.
    #[inline(always)]
    pub fn op(self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// Operand register VX.
    #[inline(always)]
    pub fn x(self) -> usize {
        ((self.0 >> 8) & 0xF) as usize
    }

    /// Operand register VY.
    #[inline(always)]
    pub fn y(self) -> usize {
        ((self.0 >> 4) & 0xF) as usize
    }

    /// Lowest nibble.
    #[inline(always)]
    pub fn n(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    /// Lowest byte.
    #[inline(always)]
    pub fn nn(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// 12-bit address.
    #[inline(always)]
    pub fn nnn(self) -> u16 {
        self.0 & 0xFFF
    }
}
