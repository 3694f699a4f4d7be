use parse_display::Display;
use tracing::debug;

use crate::constants as C;

use super::encoding::{InstructionWord, Signed};
use super::registers::{Condition, Reg, Registers};
use super::traps::{Console, TrapVector};
use super::{Computer, Exception, ProcessorError};

/// The 4-bit operation selector of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "UPPERCASE")]
pub enum Opcode {
    Br,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    /// Return from interrupt, not supported
    Rti,
    Not,
    Ldi,
    Sti,
    Jmp,
    /// Reserved
    Res,
    Lea,
    Trap,
}

/// Opcodes indexed by their encoding
const OPCODES: [Opcode; 16] = [
    Opcode::Br,
    Opcode::Add,
    Opcode::Ld,
    Opcode::St,
    Opcode::Jsr,
    Opcode::And,
    Opcode::Ldr,
    Opcode::Str,
    Opcode::Rti,
    Opcode::Not,
    Opcode::Ldi,
    Opcode::Sti,
    Opcode::Jmp,
    Opcode::Res,
    Opcode::Lea,
    Opcode::Trap,
];

impl From<InstructionWord> for Opcode {
    fn from(word: InstructionWord) -> Self {
        OPCODES[usize::from(word.opcode())]
    }
}

/// Second operand of `add` and `and`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    /// Sign-extended immediate
    Imm(C::Word),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reg(reg) => write!(f, "{reg}"),
            Self::Imm(imm) => write!(f, "{}", Signed(*imm)),
        }
    }
}

/// A decoded instruction.
///
/// Offsets are kept sign-extended to a full word, so that applying them is a
/// wrapping addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `dst = src + operand`
    Add { dst: Reg, src: Reg, operand: Operand },

    /// `dst = src & operand`
    And { dst: Reg, src: Reg, operand: Operand },

    /// `dst = !src`
    Not { dst: Reg, src: Reg },

    /// Branch if any of the condition codes in `mask` is set
    Br { mask: Condition, offset: C::Word },

    /// Unconditional jump to the address in a register
    Jmp { base: Reg },

    /// Save `%pc` in `%r7`, then jump to a PC-relative address
    Jsr { offset: C::Word },

    /// Save `%pc` in `%r7`, then jump to the address in a register
    Jsrr { base: Reg },

    /// Load a PC-relative memory cell
    Ld { dst: Reg, offset: C::Word },

    /// Load the memory cell pointed to by a PC-relative memory cell
    Ldi { dst: Reg, offset: C::Word },

    /// Load a memory cell relative to a base register
    Ldr { dst: Reg, base: Reg, offset: C::Word },

    /// Load a PC-relative address
    Lea { dst: Reg, offset: C::Word },

    /// Store to a PC-relative memory cell
    St { src: Reg, offset: C::Word },

    /// Store to the memory cell pointed to by a PC-relative memory cell
    Sti { src: Reg, offset: C::Word },

    /// Store to a memory cell relative to a base register
    Str { src: Reg, base: Reg, offset: C::Word },

    /// Call a trap routine
    Trap { vector: u8 },
}

impl Instruction {
    /// Decode an instruction word fetched at `address`
    ///
    /// # Errors
    ///
    /// Fails if the opcode is reserved or unsupported.
    pub fn decode(word: C::Word, address: C::Address) -> Result<Self, Exception> {
        let word = InstructionWord(word);
        let operand = || {
            if word.is_immediate() {
                Operand::Imm(word.imm5())
            } else {
                Operand::Reg(word.sr2())
            }
        };

        let instruction = match Opcode::from(word) {
            Opcode::Add => Self::Add {
                dst: word.dr(),
                src: word.sr1(),
                operand: operand(),
            },
            Opcode::And => Self::And {
                dst: word.dr(),
                src: word.sr1(),
                operand: operand(),
            },
            Opcode::Not => Self::Not {
                dst: word.dr(),
                src: word.sr1(),
            },
            Opcode::Br => Self::Br {
                mask: word.cond_mask(),
                offset: word.pc_offset9(),
            },
            Opcode::Jmp => Self::Jmp { base: word.base() },
            Opcode::Jsr if word.is_long_jump() => Self::Jsr {
                offset: word.pc_offset11(),
            },
            Opcode::Jsr => Self::Jsrr { base: word.base() },
            Opcode::Ld => Self::Ld {
                dst: word.dr(),
                offset: word.pc_offset9(),
            },
            Opcode::Ldi => Self::Ldi {
                dst: word.dr(),
                offset: word.pc_offset9(),
            },
            Opcode::Ldr => Self::Ldr {
                dst: word.dr(),
                base: word.base(),
                offset: word.offset6(),
            },
            Opcode::Lea => Self::Lea {
                dst: word.dr(),
                offset: word.pc_offset9(),
            },
            Opcode::St => Self::St {
                src: word.dr(),
                offset: word.pc_offset9(),
            },
            Opcode::Sti => Self::Sti {
                src: word.dr(),
                offset: word.pc_offset9(),
            },
            Opcode::Str => Self::Str {
                src: word.dr(),
                base: word.base(),
                offset: word.offset6(),
            },
            Opcode::Trap => Self::Trap {
                vector: word.trap_vector(),
            },
            opcode @ (Opcode::Rti | Opcode::Res) => {
                return Err(Exception::IllegalOpcode { opcode, address })
            }
        };

        Ok(instruction)
    }

    /// Execute the instruction.
    ///
    /// `%pc` must already point to the next instruction. Returns `false` once
    /// the machine halted.
    #[tracing::instrument(skip(computer))]
    pub(crate) fn execute<T: Console>(
        self,
        computer: &mut Computer<T>,
    ) -> Result<bool, ProcessorError> {
        use Instruction::{
            Add, And, Br, Jmp, Jsr, Jsrr, Ld, Ldi, Ldr, Lea, Not, St, Sti, Str, Trap,
        };

        let pc = computer.registers.pc;
        let registers = &mut computer.registers;
        let memory = &mut computer.memory;

        match self {
            Add { dst, src, operand } => {
                let a = registers.get(src);
                let b = operand_value(registers, operand);
                let res = a.wrapping_add(b);
                debug!("{} + {} = {}", a, b, res);
                registers.set_with_flags(dst, res);
            }

            And { dst, src, operand } => {
                let a = registers.get(src);
                let b = operand_value(registers, operand);
                let res = a & b;
                debug!("{} & {} = {}", a, b, res);
                registers.set_with_flags(dst, res);
            }

            Not { dst, src } => {
                let res = !registers.get(src);
                registers.set_with_flags(dst, res);
            }

            Br { mask, offset } => {
                if mask.intersects(registers.cond) {
                    let target = pc.wrapping_add(offset);
                    debug!("Branching to address x{:04X}", target);
                    registers.pc = target;
                }
            }

            Jmp { base } => {
                registers.pc = registers.get(base);
            }

            Jsr { offset } => {
                registers.set(Reg::R7, pc);
                registers.pc = pc.wrapping_add(offset);
            }

            Jsrr { base } => {
                // Read the base first, it might be %r7
                let target = registers.get(base);
                registers.set(Reg::R7, pc);
                registers.pc = target;
            }

            Ld { dst, offset } => {
                let value = memory.read(pc.wrapping_add(offset));
                registers.set_with_flags(dst, value);
            }

            Ldi { dst, offset } => {
                let address = memory.read(pc.wrapping_add(offset));
                let value = memory.read(address);
                registers.set_with_flags(dst, value);
            }

            Ldr { dst, base, offset } => {
                let address = registers.get(base).wrapping_add(offset);
                let value = memory.read(address);
                registers.set_with_flags(dst, value);
            }

            Lea { dst, offset } => {
                registers.set_with_flags(dst, pc.wrapping_add(offset));
            }

            St { src, offset } => {
                memory.write(pc.wrapping_add(offset), registers.get(src));
            }

            Sti { src, offset } => {
                let address = memory.read(pc.wrapping_add(offset));
                memory.write(address, registers.get(src));
            }

            Str { src, base, offset } => {
                let address = registers.get(base).wrapping_add(offset);
                memory.write(address, registers.get(src));
            }

            Trap { vector } => return computer.trap(vector),
        }

        Ok(true)
    }
}

fn operand_value(registers: &Registers, operand: Operand) -> C::Word {
    match operand {
        Operand::Reg(reg) => registers.get(reg),
        Operand::Imm(imm) => imm,
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Add { dst, src, operand } => write!(f, "add  {dst}, {src}, {operand}"),
            Self::And { dst, src, operand } => write!(f, "and  {dst}, {src}, {operand}"),
            Self::Not { dst, src } => write!(f, "not  {dst}, {src}"),
            Self::Br { mask, offset } if mask.is_empty() => {
                write!(f, "nop  {}", Signed(offset))
            }
            Self::Br { mask, offset } => {
                let mut name = String::from("br");
                for (flag, c) in [
                    (Condition::NEGATIVE, 'n'),
                    (Condition::ZERO, 'z'),
                    (Condition::POSITIVE, 'p'),
                ] {
                    if mask.contains(flag) {
                        name.push(c);
                    }
                }
                write!(f, "{name:<4} {}", Signed(offset))
            }
            Self::Jmp { base: Reg::R7 } => write!(f, "ret"),
            Self::Jmp { base } => write!(f, "jmp  {base}"),
            Self::Jsr { offset } => write!(f, "jsr  {}", Signed(offset)),
            Self::Jsrr { base } => write!(f, "jsrr {base}"),
            Self::Ld { dst, offset } => write!(f, "ld   {dst}, {}", Signed(offset)),
            Self::Ldi { dst, offset } => write!(f, "ldi  {dst}, {}", Signed(offset)),
            Self::Ldr { dst, base, offset } => {
                write!(f, "ldr  {dst}, {base}, {}", Signed(offset))
            }
            Self::Lea { dst, offset } => write!(f, "lea  {dst}, {}", Signed(offset)),
            Self::St { src, offset } => write!(f, "st   {src}, {}", Signed(offset)),
            Self::Sti { src, offset } => write!(f, "sti  {src}, {}", Signed(offset)),
            Self::Str { src, base, offset } => {
                write!(f, "str  {src}, {base}, {}", Signed(offset))
            }
            Self::Trap { vector } => match TrapVector::try_from(vector) {
                Ok(routine) => write!(f, "{routine}"),
                Err(vector) => write!(f, "trap x{vector:02X}"),
            },
        }
    }
}
