//! Errors for structurally invalid programs.
use thiserror::Error;

/// A structural violation detected while assembling a program.
///
/// Raised either when an instruction with an out-of-range operand is
/// inserted, or by [`Builder::finish`](crate::Builder::finish) when label
/// resolution fails. An invalid program never escapes the builder.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("version {version} not supported")]
    UnsupportedVersion { version: u8 },

    #[error("memory operand address invalid: {address:#x}")]
    MemoryAddressInvalid { address: u16 },

    #[error("switch table too large: {entries} entries")]
    SwitchTableTooLarge { entries: usize },

    #[error("switch value too wide: {value} does not fit {opcode}")]
    SwitchValueTooWide { opcode: &'static str, value: u32 },

    #[error("datetime mask invalid: {bits:#x}")]
    InvalidDateTimeMask { bits: u8 },

    #[error("address block out of range: start {start}, length {length}")]
    AddressBlockOutOfRange { start: u8, length: u8 },

    #[error("label defined multiple times: label '{label}' defined in lines {first} and {second}")]
    DuplicateLabel { label: String, first: u32, second: u32 },

    #[error("backward jump not allowed: jump in line {line} to '{label}' in line {target_line}")]
    BackwardJump {
        label: String,
        line: u32,
        target_line: u32,
    },

    /// Lists every unresolved label with the line of each use.
    #[error("jump to undefined label: {uses}")]
    UndefinedLabel { uses: String },

    #[error("entry point {kind} bound to undefined label '{label}'")]
    UndefinedEntryPoint { kind: &'static str, label: String },
}
