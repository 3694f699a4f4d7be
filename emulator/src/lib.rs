//! An emulator for the LC-3 architecture.
//!
//! The [`runtime::Computer`] owns the registers and the memory, fetches
//! instructions at `%pc` and executes them one at a time. Character I/O
//! requested by trap routines goes through an injected [`runtime::Console`].

pub mod constants;
pub mod loader;
pub mod runtime;

pub use self::loader::{load_file, load_image, Image};
pub use self::runtime::Computer;
