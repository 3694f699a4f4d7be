//! The `run --interactive` debugger.
//!
//! Lines are read with rustyline, split like a shell would, then parsed by
//! clap as if they were the arguments of a tiny program without a binary name.

use std::collections::BTreeSet;

use clap::Parser;
use lc3_emulator::constants as C;
use lc3_emulator::runtime::{Computer, Console, Reg};
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

mod helper;
pub(crate) mod parse;

use self::helper::RunHelper;
use self::parse::{Argument, AssignmentTarget};

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

/// Debugger commands
#[derive(Parser, Clone, Debug)]
#[command(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
)]
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        #[arg(default_value_t = 1)]
        number: u64,
    },

    /// Run until a breakpoint is reached or the program halts
    #[command(alias = "c")]
    Continue,

    /// Print registers, or a single one
    #[command(alias = "r")]
    Registers { register: Option<Reg> },

    /// Print words from memory
    #[command(alias = "m", allow_negative_numbers = true)]
    Memory {
        /// A literal like `x3000`, or a register with an optional offset like `r6 - 1`
        address: Argument,

        #[arg(default_value_t = 1)]
        number: u16,
    },

    /// Write a register, or a word in memory
    #[command(allow_negative_numbers = true)]
    Set {
        /// A register name, or an address
        target: AssignmentTarget,
        value: Argument,
    },

    /// Decode the instructions at `%pc`, then the following ones on repeat
    #[command(alias = "l")]
    List {
        #[arg(default_value_t = 10)]
        number: u16,
    },

    /// Stop before executing the instruction at an address
    #[command(alias = "b", allow_negative_numbers = true)]
    Break { address: Argument },

    /// Remove a breakpoint
    #[command(allow_negative_numbers = true)]
    Unbreak { address: Argument },

    /// Print the breakpoints and the step counter
    Info {
        #[command(subcommand)]
        what: Option<InfoCommand>,
    },

    /// Leave the debugger
    #[command(alias = "q")]
    Exit,
}

#[derive(Parser, Clone, Debug)]
enum InfoCommand {
    /// List breakpoints
    Breakpoints,

    /// Number of instructions executed so far
    Steps,
}

/// What the read loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Prompt,
    Exit,
}

/// State of the debugger, kept between commands
#[derive(Debug, Default)]
struct Session {
    breakpoints: BTreeSet<C::Address>,

    /// Where the next `list` starts, `None` means at `%pc`
    list_address: Option<C::Address>,

    /// Set once the program halted or raised an error
    halted: bool,
}

impl Session {
    fn add_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.insert(address) {
            info!("Breakpoint set at x{address:04X}");
        } else {
            warn!("There is already a breakpoint at x{address:04X}");
        }
    }

    fn remove_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.remove(&address) {
            info!("Breakpoint at x{address:04X} removed");
        } else {
            warn!("No breakpoint at x{address:04X}");
        }
    }

    /// First address of a `list`. Repeating it shows the words that follow.
    fn next_list<T>(&mut self, computer: &Computer<T>, count: u16) -> C::Address {
        let start = self.list_address.unwrap_or(computer.registers.pc);
        self.list_address = Some(start.wrapping_add(count));
        start
    }

    /// One line of `list`: markers for `%pc` and breakpoints, the word and its decoding
    fn listing<T: Console>(&self, computer: &Computer<T>, address: C::Address) -> String {
        let breakpoint = if self.breakpoints.contains(&address) { 'B' } else { ' ' };
        let current = if computer.registers.pc == address { '>' } else { ' ' };
        let word = computer.memory.read(address);
        let text = computer
            .instruction_at(address)
            .map_or_else(|| "–".to_string(), |instruction| instruction.to_string());
        format!("{breakpoint}{current} x{address:04X}  x{word:04X}  {text}")
    }

    /// Run one instruction, and remember if the program cannot run anymore
    fn step<T: Console>(&mut self, computer: &mut Computer<T>) -> bool {
        self.list_address = None;
        match computer.step() {
            Ok(true) => true,
            Ok(false) => {
                info!(registers = %computer.registers, "Program halted");
                self.halted = true;
                false
            }
            Err(e) => {
                warn!(error = &e as &dyn std::error::Error, "Program stopped");
                self.halted = true;
                false
            }
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    fn execute<T: Console>(&mut self, computer: &mut Computer<T>, command: Command) -> Flow {
        debug!(?command, "Executing command");

        match command {
            Command::Exit => return Flow::Exit,

            Command::Step { .. }
            | Command::Continue
            | Command::Set { .. }
            | Command::Break { .. }
            | Command::Unbreak { .. }
                if self.halted =>
            {
                warn!("The program is not running anymore. Use \"exit\" to quit");
            }

            Command::Step { number } => {
                for _ in 0..number {
                    if !self.step(computer) {
                        break;
                    }
                }
            }

            Command::Continue => {
                while self.step(computer) {
                    let pc = computer.registers.pc;
                    if self.breakpoints.contains(&pc) {
                        info!("Stopped at breakpoint x{pc:04X}");
                        break;
                    }
                }
            }

            Command::Registers { register: None } => {
                info!("{}", computer.registers);
            }

            Command::Registers {
                register: Some(Reg::COND),
            } => {
                info!("{} = {:?}", Reg::COND, computer.registers.cond);
            }

            Command::Registers {
                register: Some(reg),
            } => {
                info!("{reg} = x{:04X}", computer.registers.get(reg));
            }

            Command::Memory { address, number } => {
                let start = address.evaluate(computer);
                for (address, word) in computer.memory.iter_from(start).take(number.into()) {
                    info!("x{address:04X}: x{word:04X}");
                }
            }

            Command::Set { target, value } => {
                let value = value.evaluate(computer);
                match target {
                    AssignmentTarget::Register(reg) => {
                        info!("{reg} <- x{value:04X}");
                        computer.registers.set(reg, value);
                    }
                    AssignmentTarget::Address(address) => {
                        let address = address.evaluate(computer);
                        info!("x{address:04X} <- x{value:04X}");
                        computer.memory.write(address, value);
                    }
                }
                self.list_address = None;
            }

            Command::List { number } => {
                let start = self.next_list(computer, number);
                for offset in 0..number {
                    info!("{}", self.listing(computer, start.wrapping_add(offset)));
                }
            }

            Command::Break { address } => self.add_breakpoint(address.evaluate(computer)),

            Command::Unbreak { address } => self.remove_breakpoint(address.evaluate(computer)),

            Command::Info { what } => {
                if matches!(what, None | Some(InfoCommand::Breakpoints)) {
                    info!("{} breakpoint(s)", self.breakpoints.len());
                    for &address in &self.breakpoints {
                        info!("{}", self.listing(computer, address));
                    }
                }
                if matches!(what, None | Some(InfoCommand::Steps)) {
                    info!("{} instruction(s) executed", computer.steps);
                }
            }
        }

        Flow::Prompt
    }
}

pub(crate) fn run_interactive<T: Console>(computer: &mut Computer<T>) -> anyhow::Result<()> {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let mut editor: Editor<RunHelper<Command>, DefaultHistory> = Editor::with_config(config)?;
    editor.set_helper(Some(RunHelper::new()));

    let mut session = Session::default();
    let mut last_command: Option<Command> = None;

    loop {
        let Ok(line) = editor.readline(">> ") else {
            info!("EOF, exitting");
            return Ok(());
        };

        let command = if line.trim().is_empty() {
            let Some(command) = last_command.clone() else {
                info!("Type \"help\" to get the list of available commands");
                continue;
            };
            command
        } else {
            let Ok(words) = shell_words::split(&line) else {
                warn!("Unbalanced quotes");
                continue;
            };

            match Command::try_parse_from(words) {
                Ok(command) => {
                    last_command = Some(command.clone());
                    command
                }
                Err(e) => {
                    // Also covers `help`, which clap reports as an error
                    warn!("{e}");
                    continue;
                }
            }
        };

        if session.execute(computer, command) == Flow::Exit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use lc3_emulator::runtime::BufferedConsole;
    use pretty_assertions::assert_eq;

    use super::*;

    fn command(line: &str) -> Command {
        Command::try_parse_from(shell_words::split(line).unwrap()).unwrap()
    }

    /// `out` three times, then `halt`
    fn program() -> Computer<BufferedConsole> {
        let mut computer = Computer::with_console(BufferedConsole::default());
        computer.registers.set(Reg::R0, u16::from(b'!'));
        computer
            .memory
            .load(C::PROGRAM_START, &[0xF021, 0xF021, 0xF021, 0xF025]);
        computer
    }

    #[test]
    fn parse_commands() {
        assert!(matches!(command("s"), Command::Step { number: 1 }));
        assert!(matches!(command("step 5"), Command::Step { number: 5 }));
        assert!(matches!(
            command("registers pc"),
            Command::Registers {
                register: Some(Reg::PC)
            }
        ));
        assert!(matches!(
            command("memory x3000 4"),
            Command::Memory {
                address: Argument::Literal(0x3000),
                number: 4
            }
        ));
        assert!(matches!(
            command("set r1 -1"),
            Command::Set {
                target: AssignmentTarget::Register(Reg::R1),
                value: Argument::Literal(0xFFFF)
            }
        ));
        assert!(matches!(
            command("memory -2 2"),
            Command::Memory {
                address: Argument::Literal(0xFFFE),
                number: 2
            }
        ));
        assert!(matches!(
            command("break -1"),
            Command::Break {
                address: Argument::Literal(0xFFFF)
            }
        ));
        assert!(matches!(
            command("unbreak -1"),
            Command::Unbreak {
                address: Argument::Literal(0xFFFF)
            }
        ));
        assert!(matches!(
            command("info steps"),
            Command::Info {
                what: Some(InfoCommand::Steps)
            }
        ));
        assert!(Command::try_parse_from(["frobnicate"]).is_err());
    }

    #[test]
    fn step_until_halted() {
        let mut computer = program();
        let mut session = Session::default();

        assert_eq!(session.execute(&mut computer, command("step 2")), Flow::Prompt);
        assert_eq!(computer.console.output(), b"!!");
        assert!(!session.halted);

        session.execute(&mut computer, command("step 10"));
        assert!(session.halted);
        assert_eq!(computer.steps, 4);

        // Nothing runs once halted
        session.execute(&mut computer, command("step"));
        assert_eq!(computer.steps, 4);
        assert_eq!(session.execute(&mut computer, command("exit")), Flow::Exit);
    }

    #[test]
    fn continue_to_breakpoint() {
        let mut computer = program();
        let mut session = Session::default();

        session.execute(&mut computer, command("break x3002"));
        session.execute(&mut computer, command("continue"));
        assert_eq!(computer.registers.pc, 0x3002);
        assert!(!session.halted);

        session.execute(&mut computer, command("unbreak x3002"));
        session.execute(&mut computer, command("continue"));
        assert!(session.halted);
        assert_eq!(computer.console.take_output(), b"!!!");
    }

    #[test]
    fn set_registers_and_memory() {
        let mut computer = program();
        let mut session = Session::default();

        session.execute(&mut computer, command("set r2 x4000"));
        session.execute(&mut computer, command("set r2+1 42"));
        assert_eq!(computer.registers.get(Reg::R2), 0x4000);
        assert_eq!(computer.memory.read(0x4001), 42);

        session.execute(&mut computer, command("set pc x3003"));
        session.execute(&mut computer, command("step"));
        assert!(session.halted);
        assert_eq!(computer.console.output(), b"");
    }

    #[test]
    fn negative_values() {
        let mut computer = program();
        let mut session = Session::default();

        session.execute(&mut computer, command("set r3 -5"));
        assert_eq!(computer.registers.get(Reg::R3), 0xFFFB);

        session.execute(&mut computer, command("set -1 -2"));
        assert_eq!(computer.memory.read(0xFFFF), 0xFFFE);

        session.execute(&mut computer, command("break -1"));
        assert!(session.breakpoints.contains(&0xFFFF));
    }

    #[test]
    fn listing() {
        let mut computer = program();
        computer.memory.write(0x3004, 0xD000);
        let mut session = Session::default();
        session.add_breakpoint(0x3003);

        assert_eq!(session.next_list(&computer, 4), 0x3000);
        assert_eq!(session.next_list(&computer, 4), 0x3004);

        assert_eq!(session.listing(&computer, 0x3000), " > x3000  xF021  out");
        assert_eq!(session.listing(&computer, 0x3003), "B  x3003  xF025  halt");
        assert_eq!(session.listing(&computer, 0x3004), "   x3004  xD000  –");

        // Running an instruction brings `list` back to %pc
        session.execute(&mut computer, command("step"));
        assert_eq!(session.next_list(&computer, 4), 0x3001);
    }
}
