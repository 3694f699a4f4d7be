use crate::constants::{Address, Word, MEMORY_SIZE};

/// Holds the memory cells of the computer.
///
/// It has one cell for each 16-bit address, so every access is valid and
/// reading or writing memory never fails.
#[derive(Clone)]
pub struct Memory {
    inner: Box<[Word]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.inner.iter().filter(|&&w| w != 0).count();
        write!(f, "Memory {{ non-zero cells: {used} }}")
    }
}

impl Memory {
    /// Read the word at an address
    #[must_use]
    pub fn read(&self, address: Address) -> Word {
        self.inner[usize::from(address)]
    }

    /// Write a word at an address
    pub fn write(&mut self, address: Address, value: Word) {
        self.inner[usize::from(address)] = value;
    }

    /// Copy a block of words, starting at `origin`.
    ///
    /// Writing past the last address wraps to the beginning of the memory.
    pub fn load(&mut self, origin: Address, words: &[Word]) {
        let mut address = origin;
        for &word in words {
            self.write(address, word);
            address = address.wrapping_add(1);
        }
    }

    /// Walk the memory, starting at `address`, wrapping at the end
    pub fn iter_from(&self, address: Address) -> impl Iterator<Item = (Address, Word)> + '_ {
        let mut address = address;
        std::iter::repeat_with(move || {
            let current = address;
            address = address.wrapping_add(1);
            (current, self.read(current))
        })
        .take(MEMORY_SIZE)
    }
}
