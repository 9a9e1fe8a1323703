//! The instruction vocabulary of the device VM.
//!
//! Each [`Insn`] variant carries its operand inline, so an instruction
//! with a mismatched opcode and operand cannot be constructed. Operand
//! kinds with value constraints ([`SwitchTable`], [`BlockPart`],
//! [`DtMask`]) validate at construction.
use core::fmt;

use crate::error::ProgramError;

/// An opaque jump-target identity issued by the builder.
///
/// A label is bound to at most one instruction; the builder verifies
/// bindings when it finishes the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    id: usize,
    name: String,
}

impl Label {
    pub(crate) fn new(id: usize, name: &str) -> Self {
        Self {
            id,
            name: String::from(name),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "L{}", self.id)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Memory operand type of `ld`/`st` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    S8,
    S16,
    S32,
    S64,
    Float,
}

/// Field selection mask for datetime decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtMask(u8);

impl DtMask {
    pub const SECOND: DtMask = DtMask(1);
    pub const MINUTE: DtMask = DtMask(2);
    pub const HOUR: DtMask = DtMask(4);
    pub const DAY: DtMask = DtMask(8);
    pub const MONTH: DtMask = DtMask(16);
    pub const YEAR: DtMask = DtMask(32);
    pub const WEEKDAY: DtMask = DtMask(64);

    /// Builds a mask from raw bits. Only the low seven bits are defined.
    pub fn from_bits(bits: u8) -> Result<Self, ProgramError> {
        if bits > 0x7f {
            return Err(ProgramError::InvalidDateTimeMask { bits });
        }
        Ok(DtMask(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn with(self, other: DtMask) -> Self {
        DtMask(self.0 | other.0)
    }

    pub fn contains(self, other: DtMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for DtMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, c) in [
            (DtMask::SECOND, 's'),
            (DtMask::MINUTE, 'm'),
            (DtMask::HOUR, 'h'),
            (DtMask::DAY, 'D'),
            (DtMask::MONTH, 'M'),
            (DtMask::YEAR, 'Y'),
            (DtMask::WEEKDAY, 'W'),
        ] {
            if self.contains(bit) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// One case of a switch table: a scrutinee value and its jump target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchEntry {
    pub value: u32,
    pub target: Label,
}

/// Jump table operand of the `switch8/16/32` instructions.
///
/// Holds at most 255 entries; the VM encodes the entry count in one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTable {
    entries: Vec<SwitchEntry>,
}

impl SwitchTable {
    pub fn new(entries: Vec<SwitchEntry>) -> Result<Self, ProgramError> {
        if entries.len() > 255 {
            return Err(ProgramError::SwitchTableTooLarge {
                entries: entries.len(),
            });
        }
        Ok(SwitchTable { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SwitchEntry> {
        self.entries.iter()
    }

    /// Largest case value, 0 for an empty table. Decides which switch
    /// opcode widths can carry the table.
    pub fn max_value(&self) -> u32 {
        self.entries.iter().map(|e| e.value).max().unwrap_or(0)
    }
}

/// A contiguous byte range of a 16-byte address, compared against the
/// source address of the packet being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPart {
    start: u8,
    length: u8,
    block: [u8; 16],
}

impl BlockPart {
    pub fn new(start: u8, length: u8, block: [u8; 16]) -> Result<Self, ProgramError> {
        if start > 15 || length > 16 || start + length > 16 {
            return Err(ProgramError::AddressBlockOutOfRange { start, length });
        }
        Ok(BlockPart {
            start,
            length,
            block,
        })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn block(&self) -> &[u8; 16] {
        &self.block
    }
}

/// One VM instruction with its operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Push the endpoint id of the packet being handled.
    LdSourceEid,
    /// Push the value of the packet being handled.
    LdSourceVal,
    LdFalse,
    LdTrue,
    LdU8(u8),
    LdU16(u16),
    LdU32(u32),
    LdU64(u64),
    LdS8(i8),
    LdS16(i16),
    LdS32(i32),
    LdS64(i64),
    LdFloat(f32),
    /// Push the device wall-clock time.
    LdSysTime,

    /// Push a machine variable from device memory.
    LdMem(MemType, u16),
    /// Pop into a machine variable in device memory.
    StMem(MemType, u16),

    Mul,
    Div,
    Mod,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Shl,
    Shr,

    /// Duplicate the top of stack.
    Dup,
    /// Duplicate the value `n` slots below the top.
    DupI(u8),
    /// Rotate the top two stack slots.
    Rot,
    /// Rotate the top `n + 2` stack slots.
    RotI(u8),
    /// Pop the top of stack into the slot `n` below the top.
    Exchange(u8),
    Pop,
    /// Pop `n + 1` slots.
    PopI(u8),

    /// Decompose a datetime into the selected fields.
    DtDecompose(DtMask),

    Switch8(SwitchTable),
    Switch16(SwitchTable),
    Switch32(SwitchTable),

    /// Compare a byte range of the handled packet's source address.
    CmpSrcIp(BlockPart),
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    CmpEq,
    CmpNeq,

    ConvB,
    ConvU8,
    ConvU16,
    ConvU32,
    ConvU64,
    ConvS8,
    ConvS16,
    ConvS32,
    ConvS64,
    ConvF,

    Jnz(Label),
    Jz(Label),
    Jump(Label),

    /// Write the top of stack to the endpoint id below it.
    Write,

    Ret,
}

impl Insn {
    /// Direct jump target of the instruction, if it has one. Switch
    /// targets are reached through [`Insn::switch_table`] instead.
    pub fn jump_target(&self) -> Option<&Label> {
        match self {
            Insn::Jnz(target) | Insn::Jz(target) | Insn::Jump(target) => Some(target),
            _ => None,
        }
    }

    pub fn switch_table(&self) -> Option<&SwitchTable> {
        match self {
            Insn::Switch8(table) | Insn::Switch16(table) | Insn::Switch32(table) => Some(table),
            _ => None,
        }
    }
}

/// An instruction as placed in the stream: the optional label bound to it
/// and the source line it was generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub label: Option<Label>,
    pub insn: Insn,
    pub line: u32,
}
