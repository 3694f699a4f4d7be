use bitflags::bitflags;
use parse_display::Display;
use thiserror::Error;

use crate::constants as C;

bitflags! {
    /// Condition codes, set by every instruction writing a general purpose
    /// register. Exactly one of them is set at any time.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Condition: C::Word {
        const POSITIVE = 0b001;
        const ZERO     = 0b010;
        const NEGATIVE = 0b100;
    }
}

impl Condition {
    /// Compute the condition code matching a value
    #[must_use]
    pub const fn of(value: C::Word) -> Self {
        if value == 0 {
            Self::ZERO
        } else if value & 0x8000 != 0 {
            Self::NEGATIVE
        } else {
            Self::POSITIVE
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        // All registers start at zero
        Condition::ZERO
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |flag, c| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Condition::NEGATIVE, 'n'),
            flag(Condition::ZERO, 'z'),
            flag(Condition::POSITIVE, 'p'),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// General purpose registers, `%r0` to `%r7`
    pub gpr: [C::Word; 8],

    /// Program counter
    pub pc: C::Address,

    /// Condition codes
    pub cond: Condition,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            gpr: [0; 8],
            pc: C::PROGRAM_START,
            cond: Condition::default(),
        }
    }
}

impl Registers {
    #[must_use]
    pub fn get(&self, reg: Reg) -> C::Word {
        match reg {
            Reg::PC => self.pc,
            Reg::COND => self.cond.bits(),
            gpr => self.gpr[gpr.index()],
        }
    }

    /// Set a register value.
    ///
    /// This does not touch the condition codes, except when setting `%cond`
    /// itself. Only the three condition bits are kept in that case.
    pub fn set(&mut self, reg: Reg, value: C::Word) {
        match reg {
            Reg::PC => self.pc = value,
            Reg::COND => self.cond = Condition::from_bits_truncate(value),
            gpr => self.gpr[gpr.index()] = value,
        }
    }

    /// Write a general purpose register and update the condition codes
    pub(crate) fn set_with_flags(&mut self, reg: Reg, value: C::Word) {
        self.set(reg, value);
        self.cond = Condition::of(value);
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.gpr.iter().enumerate() {
            write!(f, "%r{i} = x{value:04X} | ")?;
        }
        write!(f, "%pc = x{:04X} | %cond = {:?}", self.pc, self.cond)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("%{}", style = "lowercase")]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,

    /// Program counter
    PC,

    /// Condition codes
    COND,
}

impl Reg {
    /// General purpose registers, in encoding order
    pub const GPR: [Reg; 8] = [
        Reg::R0,
        Reg::R1,
        Reg::R2,
        Reg::R3,
        Reg::R4,
        Reg::R5,
        Reg::R6,
        Reg::R7,
    ];

    /// Get the general purpose register encoded in the three low bits of a word
    #[must_use]
    pub fn from_field(bits: C::Word) -> Self {
        Self::GPR[usize::from(bits & 0b111)]
    }

    const fn index(self) -> usize {
        match self {
            Reg::R0 => 0,
            Reg::R1 => 1,
            Reg::R2 => 2,
            Reg::R3 => 3,
            Reg::R4 => 4,
            Reg::R5 => 5,
            Reg::R6 => 6,
            // Only general purpose registers reach this
            Reg::R7 | Reg::PC | Reg::COND => 7,
        }
    }
}

#[derive(Error, Debug)]
#[error("could not parse register")]
pub struct RegisterParseError;

impl std::str::FromStr for Reg {
    type Err = RegisterParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.strip_prefix('%').unwrap_or(s).to_lowercase();
        match name.as_str() {
            "pc" => Ok(Reg::PC),
            "cond" | "cc" => Ok(Reg::COND),
            _ => name
                .strip_prefix('r')
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| Reg::GPR.get(n).copied())
                .ok_or(RegisterParseError),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn condition_of_value() {
        assert_eq!(Condition::of(0), Condition::ZERO);
        assert_eq!(Condition::of(1), Condition::POSITIVE);
        assert_eq!(Condition::of(0x7FFF), Condition::POSITIVE);
        assert_eq!(Condition::of(0x8000), Condition::NEGATIVE);
        assert_eq!(Condition::of(0xFFFF), Condition::NEGATIVE);
    }

    #[test]
    fn flag_update_sets_a_single_condition() {
        let mut registers = Registers::default();
        for value in [0, 1, 0x8000, 42, 0xFFFF, 0] {
            registers.set_with_flags(Reg::R3, value);
            assert_eq!(registers.cond.bits().count_ones(), 1);
            assert_eq!(registers.cond, Condition::of(registers.get(Reg::R3)));
        }
    }

    #[test]
    fn set_cond_keeps_condition_bits() {
        let mut registers = Registers::default();
        registers.set(Reg::COND, 0xFFFC);
        assert_eq!(registers.cond, Condition::NEGATIVE);
    }

    #[test]
    fn parse_register() {
        assert_eq!("r0".parse::<Reg>().unwrap(), Reg::R0);
        assert_eq!("%R7".parse::<Reg>().unwrap(), Reg::R7);
        assert_eq!("pc".parse::<Reg>().unwrap(), Reg::PC);
        assert_eq!("%cond".parse::<Reg>().unwrap(), Reg::COND);
        assert!("r8".parse::<Reg>().is_err());
        assert!("sp".parse::<Reg>().is_err());
    }

    #[test]
    fn display() {
        insta::assert_snapshot!(Reg::R5, @"%r5");
        insta::assert_snapshot!(Reg::COND, @"%cond");

        let mut registers = Registers::default();
        registers.set_with_flags(Reg::R1, 0xBEEF);
        insta::assert_snapshot!(
            registers,
            @"%r0 = x0000 | %r1 = xBEEF | %r2 = x0000 | %r3 = x0000 | %r4 = x0000 | %r5 = x0000 | %r6 = x0000 | %r7 = x0000 | %pc = x3000 | %cond = n--"
        );
    }
}
