use thiserror::Error;

use crate::constants::Address;

use super::instructions::Opcode;

/// Fatal conditions raised by the program being executed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    #[error("illegal opcode {opcode} at address x{address:04X}")]
    IllegalOpcode { opcode: Opcode, address: Address },

    #[error("unknown trap vector x{vector:02X} at address x{address:04X}")]
    UnknownTrap { vector: u8, address: Address },
}

impl Exception {
    /// Address of the instruction which raised this exception
    #[must_use]
    pub const fn address(&self) -> Address {
        match self {
            Exception::IllegalOpcode { address, .. } | Exception::UnknownTrap { address, .. } => {
                *address
            }
        }
    }
}
