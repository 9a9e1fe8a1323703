//! Machine-code model for the hearth device VM.
//!
//! The VM executes a small stack machine on the device. This crate defines
//! its instruction vocabulary, a [`Builder`] that accumulates instructions
//! and resolves symbolic jump labels into a validated [`Program`], and a
//! pretty printer that renders programs in an assembly-like text form for
//! debugging and golden tests.
//!
//! Programs are required to be acyclic at the label level: a jump may only
//! target a label bound later in the instruction stream. Looping behavior
//! is expressed as state transitions outside the program, never as a
//! backward branch inside it.

mod builder;
mod error;
mod insn;
mod printer;
mod program;

pub use builder::Builder;
pub use error::ProgramError;
pub use insn::{BlockPart, DtMask, Insn, Instruction, Label, MemType, SwitchEntry, SwitchTable};
pub use printer::pretty_print;
pub use program::Program;
