//! Accumulates instructions and resolves labels into a [`Program`].
use std::collections::HashMap;

use crate::error::ProgramError;
use crate::insn::{Insn, Instruction, Label};
use crate::program::Program;

/// Single-use, append-only program accumulator.
///
/// Labels are issued by [`Builder::create_label`] and bound by inserting
/// an instruction with the label attached. [`Builder::finish`] consumes
/// the builder, verifies that every label is bound exactly once and that
/// every jump goes strictly forward, and returns the immutable program.
///
/// Operand range checks that do not need the whole stream (memory
/// addresses, switch value widths) happen at insertion time.
pub struct Builder {
    version: u8,
    machine_id: [u8; 16],
    next_label: usize,
    instructions: Vec<Instruction>,
    on_init: Option<Label>,
    on_packet: Option<Label>,
    on_periodic: Option<Label>,
}

impl Builder {
    /// Only program version 0 exists.
    pub fn new(version: u8, machine_id: [u8; 16]) -> Result<Self, ProgramError> {
        if version != 0 {
            return Err(ProgramError::UnsupportedVersion { version });
        }
        Ok(Self {
            version,
            machine_id,
            next_label: 0,
            instructions: Vec::new(),
            on_init: None,
            on_packet: None,
            on_periodic: None,
        })
    }

    /// Returns a fresh label, unique within this builder.
    pub fn create_label(&mut self) -> Label {
        self.create_named_label("")
    }

    /// Returns a fresh label carrying a debug name used by the printer.
    pub fn create_named_label(&mut self, name: &str) -> Label {
        let label = Label::new(self.next_label, name);
        self.next_label += 1;
        label
    }

    /// Appends one instruction. A `Some` label binds that label to this
    /// instruction. Structural label validation is deferred to
    /// [`Builder::finish`]; only operand ranges are checked here.
    pub fn insert(
        &mut self,
        label: Option<Label>,
        insn: Insn,
        line: u32,
    ) -> Result<(), ProgramError> {
        match &insn {
            Insn::LdMem(_, address) | Insn::StMem(_, address) => {
                if *address > 0xfff {
                    return Err(ProgramError::MemoryAddressInvalid { address: *address });
                }
            }
            Insn::Switch8(table) => {
                if table.max_value() > u8::MAX as u32 {
                    return Err(ProgramError::SwitchValueTooWide {
                        opcode: "switch8",
                        value: table.max_value(),
                    });
                }
            }
            Insn::Switch16(table) => {
                if table.max_value() > u16::MAX as u32 {
                    return Err(ProgramError::SwitchValueTooWide {
                        opcode: "switch16",
                        value: table.max_value(),
                    });
                }
            }
            _ => {}
        }

        self.instructions.push(Instruction { label, insn, line });
        Ok(())
    }

    /// Registers the state-entry entry point. A later registration
    /// replaces an earlier one.
    pub fn on_init(&mut self, label: Label) {
        self.on_init = Some(label);
    }

    /// Registers the packet-dispatch entry point. A later registration
    /// replaces an earlier one.
    pub fn on_packet(&mut self, label: Label) {
        self.on_packet = Some(label);
    }

    /// Registers the periodic-tick entry point. A later registration
    /// replaces an earlier one.
    pub fn on_periodic(&mut self, label: Label) {
        self.on_periodic = Some(label);
    }

    /// Validates the accumulated stream and produces the program.
    ///
    /// One forward scan: label bindings must be unique, jump uses may only
    /// refer to labels bound later in the stream, and no use may remain
    /// unbound at the end. Registered entry points must be bound.
    pub fn finish(self) -> Result<Program, ProgramError> {
        // Label id -> line of its binding instruction, for scanned prefix.
        let mut bound: HashMap<usize, u32> = HashMap::new();
        // Label id -> pending uses, each (label, use line).
        let mut pending: HashMap<usize, Vec<(Label, u32)>> = HashMap::new();

        for instruction in &self.instructions {
            if let Some(label) = &instruction.label {
                if let Some(first) = bound.get(&label.id()) {
                    return Err(ProgramError::DuplicateLabel {
                        label: label.to_string(),
                        first: *first,
                        second: instruction.line,
                    });
                }
                bound.insert(label.id(), instruction.line);
                pending.remove(&label.id());
            }

            let mut use_label = |target: &Label| -> Result<(), ProgramError> {
                if let Some(target_line) = bound.get(&target.id()) {
                    return Err(ProgramError::BackwardJump {
                        label: target.to_string(),
                        line: instruction.line,
                        target_line: *target_line,
                    });
                }
                pending
                    .entry(target.id())
                    .or_default()
                    .push((target.clone(), instruction.line));
                Ok(())
            };

            if let Some(table) = instruction.insn.switch_table() {
                for entry in table.iter() {
                    use_label(&entry.target)?;
                }
            } else if let Some(target) = instruction.insn.jump_target() {
                use_label(target)?;
            }
        }

        if !pending.is_empty() {
            let mut uses: Vec<_> = pending.values().flatten().collect();
            uses.sort_by_key(|(label, line)| (label.id(), *line));
            let uses = uses
                .iter()
                .map(|(label, line)| format!("'{label}' (in line {line})"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ProgramError::UndefinedLabel { uses });
        }

        for (kind, entry) in [
            ("on_init", &self.on_init),
            ("on_packet", &self.on_packet),
            ("on_periodic", &self.on_periodic),
        ] {
            if let Some(label) = entry {
                if !bound.contains_key(&label.id()) {
                    return Err(ProgramError::UndefinedEntryPoint {
                        kind,
                        label: label.to_string(),
                    });
                }
            }
        }

        Ok(Program::new(
            self.version,
            self.machine_id,
            self.on_init,
            self.on_packet,
            self.on_periodic,
            self.instructions,
        ))
    }
}
