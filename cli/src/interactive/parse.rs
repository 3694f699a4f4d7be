use std::str::FromStr;

use lc3_emulator::constants as C;
use lc3_emulator::runtime::{Computer, Reg};
use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{alphanumeric1, char, digit1, hex_digit1, space0};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, value};
use nom::error::{convert_error, VerboseError};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::{Finish, IResult};
use thiserror::Error;

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

/// A value typed in the interactive prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    /// A number: `x3000`, `0x3000`, `#-1`, `12`
    Literal(C::Word),

    /// The content of a register
    Register(Reg),

    /// The content of a register, plus or minus an offset
    Indexed(Reg, Sign, C::Word),
}

impl Argument {
    pub fn evaluate<T>(&self, computer: &Computer<T>) -> C::Word {
        match *self {
            Argument::Literal(word) => word,
            Argument::Register(reg) => computer.registers.get(reg),
            Argument::Indexed(reg, Sign::Plus, offset) => {
                computer.registers.get(reg).wrapping_add(offset)
            }
            Argument::Indexed(reg, Sign::Minus, offset) => {
                computer.registers.get(reg).wrapping_sub(offset)
            }
        }
    }
}

/// Where the `set` command writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    /// A bare register name sets that register
    Register(Reg),

    /// Anything else is a memory address
    Address(Argument),
}

#[derive(Debug, Error)]
#[error("could not parse expression: {0}")]
pub struct ParseArgumentError(String);

impl FromStr for Argument {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_all(parse_argument, s)
    }
}

impl FromStr for AssignmentTarget {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_all(
            alt((
                map(all_consuming(parse_register), AssignmentTarget::Register),
                map(parse_argument, AssignmentTarget::Address),
            )),
            s,
        )
    }
}

/// Parse a number, for command line arguments
pub fn parse_word(s: &str) -> Result<C::Word, ParseArgumentError> {
    parse_all(parse_literal, s)
}

fn parse_all<'a, T>(
    parser: impl FnMut(&'a str) -> ParseResult<'a, T>,
    input: &'a str,
) -> Result<T, ParseArgumentError> {
    let input = input.trim();
    all_consuming(parser)(input)
        .finish()
        .map(|(_, ret)| ret)
        .map_err(|e| ParseArgumentError(convert_error(input, e)))
}

/// Fit a number in a word. Negative numbers are stored in two's complement.
fn to_word(value: i32) -> Result<C::Word, std::num::TryFromIntError> {
    C::Word::try_from(value)
        .or_else(|_| i16::try_from(value).map(|v| C::Word::from_ne_bytes(v.to_ne_bytes())))
}

fn parse_hexadecimal(input: &str) -> ParseResult<'_, C::Word> {
    map_res(
        preceded(alt((tag_no_case("0x"), tag_no_case("x"))), hex_digit1),
        |digits| C::Word::from_str_radix(digits, 16),
    )(input)
}

fn parse_decimal(input: &str) -> ParseResult<'_, C::Word> {
    map_res(
        preceded(opt(char('#')), recognize(pair(opt(char('-')), digit1))),
        |digits: &str| {
            digits
                .parse::<i32>()
                .map_err(|_| ())
                .and_then(|v| to_word(v).map_err(|_| ()))
        },
    )(input)
}

fn parse_literal(input: &str) -> ParseResult<'_, C::Word> {
    alt((parse_hexadecimal, parse_decimal))(input)
}

fn parse_register(input: &str) -> ParseResult<'_, Reg> {
    map_res(recognize(pair(opt(char('%')), alphanumeric1)), Reg::from_str)(input)
}

fn parse_indexed(input: &str) -> ParseResult<'_, Argument> {
    map(
        tuple((
            parse_register,
            delimited(
                space0,
                alt((value(Sign::Plus, char('+')), value(Sign::Minus, char('-')))),
                space0,
            ),
            parse_literal,
        )),
        |(reg, sign, offset)| Argument::Indexed(reg, sign, offset),
    )(input)
}

fn parse_argument(input: &str) -> ParseResult<'_, Argument> {
    alt((
        map(parse_literal, Argument::Literal),
        parse_indexed,
        map(parse_register, Argument::Register),
    ))(input)
}

#[cfg(test)]
mod tests {
    use lc3_emulator::runtime::BufferedConsole;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn literals() {
        assert_eq!(parse_word("x3000").unwrap(), 0x3000);
        assert_eq!(parse_word("0xfe00").unwrap(), 0xFE00);
        assert_eq!(parse_word("#12").unwrap(), 12);
        assert_eq!(parse_word("65535").unwrap(), 0xFFFF);
        assert_eq!(parse_word("-1").unwrap(), 0xFFFF);
        assert_eq!(parse_word("#-32768").unwrap(), 0x8000);
        assert!(parse_word("65536").is_err());
        assert!(parse_word("x").is_err());
        assert!(parse_word("r1").is_err());
    }

    #[test]
    fn arguments() {
        assert_eq!(
            "x4000".parse::<Argument>().unwrap(),
            Argument::Literal(0x4000)
        );
        assert_eq!(
            "%r6".parse::<Argument>().unwrap(),
            Argument::Register(Reg::R6)
        );
        assert_eq!(
            "r6 - 2".parse::<Argument>().unwrap(),
            Argument::Indexed(Reg::R6, Sign::Minus, 2)
        );
        assert_eq!(
            "pc+x10".parse::<Argument>().unwrap(),
            Argument::Indexed(Reg::PC, Sign::Plus, 0x10)
        );
        assert!("r9".parse::<Argument>().is_err());
    }

    #[test]
    fn assignment_targets() {
        assert_eq!(
            "r2".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Register(Reg::R2)
        );
        assert_eq!(
            "r2+0".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Address(Argument::Indexed(Reg::R2, Sign::Plus, 0))
        );
        assert_eq!(
            "x3000".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Address(Argument::Literal(0x3000))
        );
    }

    #[test]
    fn evaluate() {
        let mut computer = Computer::with_console(BufferedConsole::default());
        computer.registers.set(Reg::R1, 0x0001);
        assert_eq!(Argument::Literal(7).evaluate(&computer), 7);
        assert_eq!(Argument::Register(Reg::PC).evaluate(&computer), 0x3000);
        assert_eq!(
            Argument::Indexed(Reg::R1, Sign::Minus, 2).evaluate(&computer),
            0xFFFF
        );
    }
}
