use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use lc3_emulator::constants as C;
use lc3_emulator::load_file;
use lc3_emulator::runtime::{Computer, RunOutcome, StdConsole};
use tracing::{debug, info, warn};

use crate::interactive::parse::parse_word;
use crate::interactive::run_interactive;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Program image: a big-endian origin word followed by the program words
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Run the program in interactive mode
    #[clap(short, long, action = ArgAction::SetTrue)]
    interactive: bool,

    /// Stop after this many instructions if the program did not halt
    #[clap(long, value_parser, conflicts_with = "interactive")]
    max_steps: Option<u64>,

    /// Start at this address instead of the image origin
    #[clap(long, value_parser = parse_word)]
    pc: Option<C::Address>,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.input, "Reading program");
        let image = load_file(&self.input)?;

        debug!("Building computer");
        let mut computer = Computer::with_console(StdConsole);
        computer.load_image(&image);
        if let Some(pc) = self.pc {
            computer.registers.pc = pc;
        }

        info!("Running program");
        if self.interactive {
            run_interactive(&mut computer)?;
        } else if let Some(max_steps) = self.max_steps {
            if computer.run_with_limit(max_steps)? == RunOutcome::StepLimit {
                warn!(max_steps, "Program did not halt");
            }
        } else {
            computer.run()?;
        }

        info!(
            registers = %computer.registers,
            steps = computer.steps,
            "End of program"
        );

        Ok(())
    }
}
