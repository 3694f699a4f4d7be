pub type Address = u16;
pub type Word = u16;

/// Total size of the computer memory, in words
pub const MEMORY_SIZE: usize = 1 << 16;

/// Default place where programs are loaded and started
pub const PROGRAM_START: Address = 0x3000;

/// Message written by the `IN` trap before reading a character
pub const IN_PROMPT: &str = "Enter a character: ";
