//! Machine-code generation for hearth automation machines.
//!
//! This crate turns one parsed and type-resolved machine definition into
//! a program for the device VM. The translation mirrors the source tree
//! directly onto stack-machine control flow; there are no optimization
//! passes.
//!
//! # Supported subset
//!
//! The generator targets the constructs the device VM can dispatch today:
//!
//! - machines with exactly one state
//! - `on entry` and `on periodic` blocks, at most one of each
//! - writes to the endpoints of a single target device
//! - the full expression language, including datetime built-ins
//!
//! Everything else is rejected with [`CodegenError::CantDo`] naming the
//! missing capability. Rejection is all-or-nothing; no partial program is
//! ever produced.
//!
//! # Example
//!
//! ```ignore
//! use hearth_codegen::compile;
//! use hearth_mc::pretty_print;
//!
//! let program = compile(&machine, machine_id)?;
//! println!("{}", pretty_print(&program));
//! ```

mod compile;
mod error;
mod symbols;

pub use compile::compile;
pub use error::CodegenError;
