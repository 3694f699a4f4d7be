//! Bit-level access to the fields of an instruction word

use crate::constants::Word;

use super::registers::{Condition, Reg};

/// Sign-extend the `bits` low bits of a value to a full word
#[must_use]
pub const fn sign_extend(value: Word, bits: u32) -> Word {
    let mask = (1 << bits) - 1;
    let value = value & mask;
    if (value >> (bits - 1)) & 1 == 1 {
        value | !mask
    } else {
        value
    }
}

/// A raw instruction, as fetched from memory.
///
/// Field accessors are named after the operands they hold. Which of them are
/// meaningful depends on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionWord(pub Word);

impl InstructionWord {
    const fn bits(self, shift: u32, width: u32) -> Word {
        (self.0 >> shift) & ((1 << width) - 1)
    }

    /// Opcode selector, bits [15:12]
    #[must_use]
    pub const fn opcode(self) -> Word {
        self.bits(12, 4)
    }

    /// Destination register, bits [11:9]. Also the source of stores.
    #[must_use]
    pub fn dr(self) -> Reg {
        Reg::from_field(self.bits(9, 3))
    }

    /// First source register, bits [8:6]
    #[must_use]
    pub fn sr1(self) -> Reg {
        Reg::from_field(self.bits(6, 3))
    }

    /// Second source register, bits [2:0]
    #[must_use]
    pub fn sr2(self) -> Reg {
        Reg::from_field(self.bits(0, 3))
    }

    /// Base register of `jmp`, `jsrr`, `ldr` and `str`, bits [8:6]
    #[must_use]
    pub fn base(self) -> Reg {
        self.sr1()
    }

    /// Whether `add`/`and` use an immediate operand, bit 5
    #[must_use]
    pub const fn is_immediate(self) -> bool {
        self.bits(5, 1) == 1
    }

    /// Whether `jsr` uses a PC-relative offset rather than a register, bit 11
    #[must_use]
    pub const fn is_long_jump(self) -> bool {
        self.bits(11, 1) == 1
    }

    /// Condition mask of `br`, bits [11:9]
    #[must_use]
    pub const fn cond_mask(self) -> Condition {
        Condition::from_bits_truncate(self.bits(9, 3))
    }

    /// Sign-extended immediate, bits [4:0]
    #[must_use]
    pub const fn imm5(self) -> Word {
        sign_extend(self.0, 5)
    }

    /// Sign-extended base offset, bits [5:0]
    #[must_use]
    pub const fn offset6(self) -> Word {
        sign_extend(self.0, 6)
    }

    /// Sign-extended PC-relative offset, bits [8:0]
    #[must_use]
    pub const fn pc_offset9(self) -> Word {
        sign_extend(self.0, 9)
    }

    /// Sign-extended PC-relative offset of `jsr`, bits [10:0]
    #[must_use]
    pub const fn pc_offset11(self) -> Word {
        sign_extend(self.0, 11)
    }

    /// Trap vector, bits [7:0]
    #[must_use]
    pub fn trap_vector(self) -> u8 {
        self.0.to_le_bytes()[0]
    }
}

/// Displays a sign-extended word as a signed decimal immediate, like `#-3`
pub(crate) struct Signed(pub Word);

impl std::fmt::Display for Signed {
    #[allow(clippy::cast_possible_wrap)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0 as i16)
    }
}
