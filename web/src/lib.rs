#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
//! WebAssembly bindings, to run LC-3 images in a browser

use serde::Serialize;
use tsify::Tsify;
use wasm_bindgen::prelude::*;

use lc3_emulator::{
    load_image,
    runtime::{self, BufferedConsole, Reg},
};

#[wasm_bindgen(start)]
fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// A computer whose console is a pair of in-memory buffers.
///
/// The page feeds keystrokes with `push_input` and drains what the program
/// printed with `take_output`.
#[wasm_bindgen]
pub struct Computer {
    computer: runtime::Computer<BufferedConsole>,
}

#[derive(Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Registers {
    gpr: Vec<u16>,
    pc: u16,
    cond: String,
    steps: u64,
}

#[derive(Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Cell {
    address: u16,
    word: u16,
    instruction: Option<String>,
}

#[derive(Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MemoryView {
    start: u16,
    cells: Vec<Cell>,
}

#[wasm_bindgen]
impl Computer {
    /// Load an image: a big-endian origin followed by the program words
    #[wasm_bindgen(constructor)]
    pub fn new(image: &[u8]) -> Result<Computer, JsValue> {
        let image = load_image(image).map_err(|e| format!("{e}"))?;
        let mut computer = runtime::Computer::with_console(BufferedConsole::default());
        computer.load_image(&image);
        Ok(Self { computer })
    }

    /// Execute one instruction, returns `false` once the program halted
    pub fn step(&mut self) -> Result<bool, JsValue> {
        self.computer.step().map_err(|e| format!("{e}").into())
    }

    /// Run at most `max_steps` instructions, returns `false` once the program halted
    pub fn run(&mut self, max_steps: u32) -> Result<bool, JsValue> {
        match self.computer.run_with_limit(max_steps.into()) {
            Ok(runtime::RunOutcome::Halted) => Ok(false),
            Ok(runtime::RunOutcome::StepLimit) => Ok(true),
            Err(e) => Err(format!("{e}").into()),
        }
    }

    pub fn push_input(&mut self, input: &[u8]) {
        self.computer.console.push_input(input);
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        self.computer.console.take_output()
    }

    #[wasm_bindgen(getter)]
    pub fn registers(&self) -> Registers {
        let registers = &self.computer.registers;
        Registers {
            gpr: Reg::GPR.iter().map(|&reg| registers.get(reg)).collect(),
            pc: registers.pc,
            cond: format!("{:?}", registers.cond),
            steps: self.computer.steps,
        }
    }

    pub fn memory_view(&self, start: u16, count: u16) -> MemoryView {
        let cells = self
            .computer
            .memory
            .iter_from(start)
            .take(count.into())
            .map(|(address, word)| Cell {
                address,
                word,
                instruction: self
                    .computer
                    .instruction_at(address)
                    .map(|instruction| instruction.to_string()),
            })
            .collect();
        MemoryView { start, cells }
    }
}
