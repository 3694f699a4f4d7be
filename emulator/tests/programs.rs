//! Whole programs, loaded from images and run to completion

#![allow(clippy::unusual_byte_groupings)]

use indoc::indoc;
use lc3_emulator::runtime::{BufferedConsole, Computer, ProcessorError, Reg, RunOutcome};
use lc3_emulator::{load_image, Image};
use pretty_assertions::assert_eq;

/// Encode an image the way an assembler would write it
fn image_bytes(origin: u16, words: &[u16]) -> Vec<u8> {
    std::iter::once(origin)
        .chain(words.iter().copied())
        .flat_map(u16::to_be_bytes)
        .collect()
}

fn boot(origin: u16, words: &[u16], input: &[u8]) -> Computer<BufferedConsole> {
    let image: Image = load_image(&image_bytes(origin, words)).unwrap();
    let mut computer = Computer::with_console(BufferedConsole::new(input));
    computer.load_image(&image);
    computer
}

#[test]
fn hello() {
    //      .ORIG x3000
    //      lea  %r0, msg
    //      puts
    //      halt
    // msg: .STRINGZ "HI"
    let mut computer = boot(
        0x3000,
        &[
            0b1110_000_000000010,
            0xF022,
            0xF025,
            u16::from(b'H'),
            u16::from(b'I'),
            0x0000,
        ],
        b"",
    );

    computer.run().unwrap();
    assert_eq!(computer.console.output(), b"HI");
    assert_eq!(computer.registers.pc, 0x3003);
    assert_eq!(computer.steps, 3);
}

#[test]
fn hello_at_another_origin() {
    let mut computer = boot(
        0x4000,
        &[
            0b1110_000_000000010,
            0xF022,
            0xF025,
            u16::from(b'o'),
            u16::from(b'k'),
            0x0000,
        ],
        b"",
    );
    assert_eq!(computer.registers.pc, 0x4000);
    computer.run().unwrap();
    assert_eq!(computer.console.output(), b"ok");
}

#[test]
fn echo_uppercase() {
    //      .ORIG x3000
    // loop: getc
    //      add  %r1, %r0, #-10      ; stop on newline
    //      brz  done
    //      ld   %r2, offset
    //      add  %r0, %r0, %r2
    //      out
    //      brnzp loop
    // done: halt
    // offset: .FILL #-32
    let mut computer = boot(
        0x3000,
        &[
            0xF020,
            0b0001_001_000_1_10110,
            0b0000_010_000000100,
            0b0010_010_000000100,
            0b0001_000_000_0_00_010,
            0xF021,
            0b0000_111_111111001,
            0xF025,
            0xFFE0,
        ],
        b"lc3\n",
    );

    computer.run().unwrap();
    assert_eq!(computer.console.output(), b"LC\x13");
}

#[test]
fn countdown_with_subroutine() {
    //       .ORIG x3000
    //       and  %r1, %r1, #0
    //       add  %r1, %r1, #3
    // loop: jsr  print
    //       add  %r1, %r1, #-1
    //       brp  loop
    //       lea  %r0, bye
    //       puts
    //       halt
    // print: ld  %r0, digit
    //       add  %r0, %r0, %r1
    //       out
    //       ret
    // digit: .FILL x30
    // bye:  .STRINGZ "!\n"
    let mut computer = boot(
        0x3000,
        &[
            0b0101_001_001_1_00000,
            0b0001_001_001_1_00011,
            0b0100_1_00000000101,
            0b0001_001_001_1_11111,
            0b0000_001_111111101,
            0b1110_000_000000111,
            0xF022,
            0xF025,
            0b0010_000_000000011,
            0b0001_000_000_0_00_001,
            0xF021,
            0b1100_000_111_000000,
            0x0030,
            u16::from(b'!'),
            u16::from(b'\n'),
            0x0000,
        ],
        b"",
    );

    computer.run().unwrap();
    let output = String::from_utf8(computer.console.take_output()).unwrap();
    assert_eq!(
        output,
        indoc! {"
            321!
        "}
    );
    assert_eq!(computer.registers.get(Reg::R1), 0);
}

#[test]
fn prompt_for_a_character() {
    //      .ORIG x3000
    //      in
    //      putsp (of the packed string at msg)
    //      halt
    let mut computer = boot(
        0x3000,
        &[
            0xF023,
            0b1110_000_000000010,
            0xF024,
            0xF025,
            u16::from_le_bytes(*b" !"),
            u16::from_le_bytes([b'\n', 0]),
        ],
        b"y",
    );

    computer.run().unwrap();
    let output = String::from_utf8(computer.console.take_output()).unwrap();
    assert_eq!(output, "Enter a character: y !\n");
    assert_eq!(computer.registers.get(Reg::R0), 0x3004);
}

#[test]
fn infinite_loop_is_bounded() {
    let mut computer = boot(0x3000, &[0b0000_111_111111111], b"");
    assert_eq!(computer.run_with_limit(1000).unwrap(), RunOutcome::StepLimit);
    assert_eq!(computer.registers.pc, 0x3000);
}

#[test]
fn running_into_empty_memory_is_not_an_error() {
    // Zeroed memory decodes as `nop`, the program falls through until it
    // reaches the halt at the end of its image
    let mut words = vec![0; 16];
    words.push(0xF025);
    let mut computer = boot(0x3000, &words, b"");
    computer.run().unwrap();
    assert_eq!(computer.steps, 17);
}

#[test]
fn reserved_opcode_reports_its_address() {
    let mut computer = boot(0x3000, &[0, 0, 0xD123], b"");
    let err = computer.run().unwrap_err();
    assert_eq!(err.to_string(), "CPU exception: illegal opcode RES at address x3002");
    assert!(matches!(err, ProcessorError::Exception(_)));
}
