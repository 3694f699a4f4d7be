use std::borrow::Cow;
use std::collections::BTreeSet;
use std::marker::PhantomData;

use anstyle::Style;
use clap::{Command, CommandFactory};
use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    hint::Hinter,
    validate::{ValidationContext, ValidationResult, Validator},
    Context,
};
use rustyline_derive::Helper;

/// Register names offered when completing a register or an address
const REGISTERS: [&str; 10] = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "pc", "cond"];

/// Rustyline helper, that handles interactive completion, highlighting and hinting.
#[derive(Helper, Debug)]
pub(crate) struct RunHelper<T: CommandFactory> {
    app: PhantomData<T>,
}

impl<T: CommandFactory> RunHelper<T> {
    pub fn new() -> Self {
        RunHelper { app: PhantomData }
    }
}

fn paint(style: Style, text: &str) -> String {
    format!("{}{text}{}", style.render(), style.render_reset())
}

/// Split the line, adding an empty last word if the cursor is after a space
fn words_before_cursor(line: &str, pos: usize) -> Option<Vec<String>> {
    let line = &line[..pos];
    let mut words = shell_words::split(line).ok()?;
    if line.ends_with([' ', '\t']) {
        words.push(String::new());
    }
    Some(words)
}

/// Find the completions of the last word, and how many bytes of it are typed
fn suggest(command: &Command, input: &[String]) -> (usize, BTreeSet<String>) {
    if let [head, tail @ ..] = input {
        if let Some(sub) = command.find_subcommand(head).filter(|_| !tail.is_empty()) {
            return suggest(sub, tail);
        }
    }

    let Some(last) = input.last() else {
        return (0, candidates(command, 0));
    };

    let candidates = candidates(command, input.len() - 1)
        .into_iter()
        .filter(|candidate| candidate.starts_with(last.as_str()))
        .collect();
    (last.len(), candidates)
}

/// Everything that can be typed as the `index`-th word after a command name
fn candidates(command: &Command, index: usize) -> BTreeSet<String> {
    let mut candidates = BTreeSet::new();

    if index == 0 && command.has_subcommands() {
        candidates.extend(command.get_subcommands().flat_map(|cmd| {
            std::iter::once(cmd.get_name().to_string())
                .chain(cmd.get_visible_aliases().map(ToString::to_string))
        }));
        // clap adds a `help` command to anything with subcommands
        candidates.insert("help".to_string());
    }

    if let Some(arg) = command.get_positionals().nth(index) {
        if matches!(
            arg.get_id().as_str(),
            "register" | "target" | "address" | "value"
        ) {
            candidates.extend(REGISTERS.iter().map(ToString::to_string));
        }
    }

    candidates
}

impl<T: CommandFactory> Completer for RunHelper<T> {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let Some(words) = words_before_cursor(line, pos) else {
            return Ok((0, Vec::new()));
        };

        let app = T::command();
        let (offset, candidates) = suggest(&app, words.as_slice());
        Ok((pos - offset, candidates.into_iter().collect()))
    }
}

impl<T: CommandFactory> Highlighter for RunHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(paint(Style::new().dimmed(), hint))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Owned(paint(Style::new().bold(), prompt))
    }
}

impl<T: CommandFactory> Hinter for RunHelper<T> {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let words = words_before_cursor(line, pos)?;
        let app = T::command();
        let (offset, candidates) = suggest(&app, words.as_slice());

        if candidates.len() == 1 {
            candidates
                .into_iter()
                .next()
                .map(|candidate| candidate[offset..].to_string())
        } else {
            None
        }
    }
}

impl<T: CommandFactory> Validator for RunHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if shell_words::split(ctx.input()).is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}
