//! Program images, as produced by LC-3 assemblers.
//!
//! An image is a sequence of big-endian words. The first one is the address
//! where the program is loaded, the others are copied from there.

use camino::Utf8Path;
use thiserror::Error;
use tracing::debug;

use crate::constants::{Address, Word, MEMORY_SIZE};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("image is too short to hold an origin address")]
    MissingOrigin,

    #[error("image has an odd number of bytes ({len})")]
    OddLength { len: usize },

    #[error("image of {words} words does not fit in memory when loaded at x{origin:04X}")]
    TooLarge { origin: Address, words: usize },
}

/// A program, ready to be copied in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Where the first word goes
    pub origin: Address,

    /// Content of the program
    pub words: Vec<Word>,
}

impl Image {
    /// Address right after the last word of the image
    #[must_use]
    pub fn end(&self) -> usize {
        usize::from(self.origin) + self.words.len()
    }
}

/// Parse an image from its raw bytes
///
/// # Errors
///
/// Fails if the image has no origin, ends in the middle of a word, or would
/// not fit between its origin and the end of the memory.
pub fn load_image(bytes: &[u8]) -> Result<Image, LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::OddLength { len: bytes.len() });
    }

    let mut words = bytes
        .chunks_exact(2)
        .map(|pair| Word::from_be_bytes([pair[0], pair[1]]));

    let origin = words.next().ok_or(LoadError::MissingOrigin)?;
    let image = Image {
        origin,
        words: words.collect(),
    };

    if image.end() > MEMORY_SIZE {
        return Err(LoadError::TooLarge {
            origin,
            words: image.words.len(),
        });
    }

    debug!(
        origin = format_args!("x{origin:04X}"),
        words = image.words.len(),
        "Parsed image"
    );
    Ok(image)
}

/// Read and parse an image file
///
/// # Errors
///
/// Fails if the file can't be read, or if its content is not a valid image.
pub fn load_file(path: &Utf8Path) -> Result<Image, LoadError> {
    debug!(%path, "Reading image");
    let bytes = std::fs::read(path)?;
    load_image(&bytes)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_big_endian_words() {
        let image = load_image(&[0x30, 0x00, 0xE0, 0x02, 0xF0, 0x25]).unwrap();
        assert_eq!(
            image,
            Image {
                origin: 0x3000,
                words: vec![0xE002, 0xF025],
            }
        );
        assert_eq!(image.end(), 0x3002);
    }

    #[test]
    fn origin_only() {
        let image = load_image(&[0x40, 0x00]).unwrap();
        assert_eq!(image.origin, 0x4000);
        assert!(image.words.is_empty());
    }

    #[test]
    fn invalid_images() {
        assert!(matches!(load_image(&[]), Err(LoadError::MissingOrigin)));
        assert!(matches!(
            load_image(&[0x30, 0x00, 0x12]),
            Err(LoadError::OddLength { len: 3 })
        ));
        assert!(matches!(
            load_image(&[0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02]),
            Err(LoadError::TooLarge {
                origin: 0xFFFF,
                words: 2
            })
        ));
    }

    #[test]
    fn fills_memory_up_to_the_last_address() {
        let image = load_image(&[0xFF, 0xFF, 0x12, 0x34]).unwrap();
        assert_eq!(image.end(), MEMORY_SIZE);
    }

    #[test]
    fn missing_file() {
        let err = load_file(Utf8Path::new("/nonexistent/program.obj")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
