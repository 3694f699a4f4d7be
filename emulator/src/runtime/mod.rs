use thiserror::Error;
use tracing::{debug, info, trace};

use crate::constants as C;
use crate::loader::Image;

mod encoding;
mod exception;
mod instructions;
mod memory;
mod registers;
mod traps;

pub use self::encoding::{sign_extend, InstructionWord};
pub use self::exception::Exception;
pub use self::instructions::{Instruction, Opcode, Operand};
pub use self::memory::Memory;
pub use self::registers::{Condition, Reg, RegisterParseError, Registers};
pub use self::traps::{BufferedConsole, Console, StdConsole, TrapVector};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("CPU exception: {0}")]
    Exception(#[from] Exception),

    #[error("console error: {0}")]
    Console(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, ProcessorError>;

/// How a bounded run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program executed the `halt` trap
    Halted,

    /// The step limit was reached before the program halted
    StepLimit,
}

#[derive(Default)]
pub struct Computer<T = StdConsole> {
    pub registers: Registers,
    pub memory: Memory,
    pub console: T,

    /// Number of instructions executed so far
    pub steps: u64,
}

impl<T> std::fmt::Debug for Computer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ registers: {:?}, memory: [...] }}",
            self.registers
        )
    }
}

impl<T: Console> Computer<T> {
    /// Create a computer with zeroed memory, starting at the default address
    #[must_use]
    pub fn with_console(console: T) -> Self {
        Self {
            registers: Registers::default(),
            memory: Memory::default(),
            console,
            steps: 0,
        }
    }

    /// Set the address of the first instruction to execute
    #[must_use]
    pub fn starting_at(mut self, address: C::Address) -> Self {
        self.registers.pc = address;
        self
    }

    /// Copy a program image in memory and point `%pc` to its origin
    pub fn load_image(&mut self, image: &Image) {
        info!(
            origin = format_args!("x{:04X}", image.origin),
            words = image.words.len(),
            "Loading image"
        );
        self.memory.load(image.origin, &image.words);
        self.registers.pc = image.origin;
    }

    /// Fetch the instruction at `%pc`, then move `%pc` to the next one
    fn fetch(&mut self) -> (C::Address, C::Word) {
        let address = self.registers.pc;
        let word = self.memory.read(address);
        self.registers.pc = address.wrapping_add(1);
        (address, word)
    }

    /// Execute a single instruction.
    ///
    /// Returns `false` once the program halted.
    ///
    /// # Errors
    ///
    /// Fails on illegal instructions, unknown trap vectors and console errors.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<bool> {
        let (address, word) = self.fetch();
        let instruction = Instruction::decode(word, address)?;
        debug!(
            address = format_args!("x{address:04X}"),
            "Executing instruction \"{}\"", instruction
        );
        let running = instruction.execute(self)?;
        self.steps += 1;
        trace!("Register state {}", self.registers);
        Ok(running)
    }

    /// Run until the program halts.
    ///
    /// # Errors
    ///
    /// Fails on the first error raised by [`Computer::step`].
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    /// Run until the program halts, or at most `max_steps` instructions.
    ///
    /// # Errors
    ///
    /// Fails on the first error raised by [`Computer::step`].
    #[tracing::instrument(skip(self))]
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<RunOutcome> {
        for _ in 0..max_steps {
            if !self.step()? {
                return Ok(RunOutcome::Halted);
            }
        }
        Ok(RunOutcome::StepLimit)
    }

    /// Decode the instruction stored at an address, if it is a valid one
    #[must_use]
    pub fn instruction_at(&self, address: C::Address) -> Option<Instruction> {
        Instruction::decode(self.memory.read(address), address).ok()
    }
}
