use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use lc3_emulator::constants as C;
use lc3_emulator::runtime::Memory;
use lc3_emulator::{load_file, Image};
use tracing::{debug, info};

use crate::interactive::parse::parse_word;

#[derive(Parser, Debug)]
pub struct DumpOpt {
    /// Program image: a big-endian origin word followed by the program words
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// First address to print, defaults to the image origin
    #[clap(long, value_parser = parse_word)]
    from: Option<C::Address>,

    /// Number of words to print, defaults to the image length
    #[clap(long, value_parser)]
    count: Option<u16>,
}

impl DumpOpt {
    fn lines(&self, image: &Image) -> Vec<String> {
        let from = self.from.unwrap_or(image.origin);
        let count = self.count.map_or(image.words.len(), usize::from);

        let mut memory = Memory::default();
        memory.load(image.origin, &image.words);

        memory
            .iter_from(from)
            .take(count)
            .map(|(address, word)| format!("x{address:04X}: x{word:04X}"))
            .collect()
    }

    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.input, "Reading program");
        let image = load_file(&self.input)?;

        debug!(
            origin = format_args!("x{:04X}", image.origin),
            words = image.words.len(),
            "Dumping image"
        );
        for line in self.lines(&image) {
            println!("{line}");
        }

        Ok(())
    }
}
