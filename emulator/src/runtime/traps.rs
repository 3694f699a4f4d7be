//! Trap routines and the console they talk to

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use parse_display::Display;
use tracing::{debug, trace};

use super::{Computer, Reg, Result};
use crate::constants as C;
use crate::runtime::Exception;

/// Character device used by the trap routines.
///
/// Reads block until a byte is available. An input that can no longer provide
/// bytes must return an error rather than a made-up value.
pub trait Console {
    /// Read a single byte
    ///
    /// # Errors
    ///
    /// Fails if the underlying input is closed or broken.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write a single byte
    ///
    /// # Errors
    ///
    /// Fails if the underlying output is closed or broken.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Flush anything written so far
    ///
    /// # Errors
    ///
    /// Fails if the underlying output is closed or broken.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Console + ?Sized> Console for &mut T {
    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Console bound to the standard input and output of the process
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0; 1];
        io::stdin().lock().read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        io::stdout().lock().write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// In-memory console, fed with scripted input
#[derive(Debug, Default, Clone)]
pub struct BufferedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferedConsole {
    #[must_use]
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Queue more bytes for the program to read
    pub fn push_input(&mut self, input: &[u8]) {
        self.input.extend(input);
    }

    /// Everything written so far
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take what was written so far, leaving the output empty
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Console for BufferedConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "console input exhausted"))
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }
}

/// Trap routines known to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum TrapVector {
    /// Read a character, without echo
    Getc,

    /// Write the character in `%r0`
    Out,

    /// Write a string of one character per word
    Puts,

    /// Prompt for a character, echo it
    In,

    /// Write a string of two characters per word
    Putsp,

    /// Stop the machine
    Halt,
}

impl TrapVector {
    #[must_use]
    pub const fn vector(self) -> u8 {
        match self {
            TrapVector::Getc => 0x20,
            TrapVector::Out => 0x21,
            TrapVector::Puts => 0x22,
            TrapVector::In => 0x23,
            TrapVector::Putsp => 0x24,
            TrapVector::Halt => 0x25,
        }
    }
}

impl TryFrom<u8> for TrapVector {
    type Error = u8;

    fn try_from(vector: u8) -> std::result::Result<Self, Self::Error> {
        match vector {
            0x20 => Ok(TrapVector::Getc),
            0x21 => Ok(TrapVector::Out),
            0x22 => Ok(TrapVector::Puts),
            0x23 => Ok(TrapVector::In),
            0x24 => Ok(TrapVector::Putsp),
            0x25 => Ok(TrapVector::Halt),
            other => Err(other),
        }
    }
}

impl<T: Console> Computer<T> {
    /// Run a trap routine. Returns `false` if the machine halted.
    #[tracing::instrument(skip(self))]
    pub(crate) fn trap(&mut self, vector: u8) -> Result<bool> {
        let Ok(routine) = TrapVector::try_from(vector) else {
            // %pc was already moved past the `trap` instruction
            let address = self.registers.pc.wrapping_sub(1);
            return Err(Exception::UnknownTrap { vector, address }.into());
        };

        debug!(%routine, "Running trap routine");
        match routine {
            TrapVector::Getc => {
                let byte = self.console.read_byte()?;
                self.registers.set(Reg::R0, C::Word::from(byte));
            }

            TrapVector::Out => {
                let [low, _] = self.registers.get(Reg::R0).to_le_bytes();
                self.console.write_byte(low)?;
                self.console.flush()?;
            }

            TrapVector::Puts => {
                let start = self.registers.get(Reg::R0);
                for (_, word) in self.memory.iter_from(start) {
                    if word == 0 {
                        break;
                    }
                    let [low, _] = word.to_le_bytes();
                    self.console.write_byte(low)?;
                }
                self.console.flush()?;
            }

            TrapVector::In => {
                for &byte in C::IN_PROMPT.as_bytes() {
                    self.console.write_byte(byte)?;
                }
                self.console.flush()?;
                let byte = self.console.read_byte()?;
                self.console.write_byte(byte)?;
                self.console.flush()?;
                self.registers.set(Reg::R0, C::Word::from(byte));
            }

            TrapVector::Putsp => {
                let start = self.registers.get(Reg::R0);
                'words: for (_, word) in self.memory.iter_from(start) {
                    for byte in word.to_le_bytes() {
                        if byte == 0 {
                            break 'words;
                        }
                        self.console.write_byte(byte)?;
                    }
                }
                self.console.flush()?;
            }

            TrapVector::Halt => {
                self.console.flush()?;
                trace!("Halting");
                return Ok(false);
            }
        }

        Ok(true)
    }
}
