//! The finished, validated program artifact.
use crate::insn::{Instruction, Label};

/// A validated machine-code program.
///
/// Produced only by [`Builder::finish`](crate::Builder::finish); every
/// label has exactly one binding and every jump goes forward. Immutable
/// once built, and freely shareable read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    version: u8,
    machine_id: [u8; 16],
    on_init: Option<Label>,
    on_packet: Option<Label>,
    on_periodic: Option<Label>,
    instructions: Vec<Instruction>,
}

impl Program {
    pub(crate) fn new(
        version: u8,
        machine_id: [u8; 16],
        on_init: Option<Label>,
        on_packet: Option<Label>,
        on_periodic: Option<Label>,
        instructions: Vec<Instruction>,
    ) -> Self {
        Self {
            version,
            machine_id,
            on_init,
            on_packet,
            on_periodic,
            instructions,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn machine_id(&self) -> &[u8; 16] {
        &self.machine_id
    }

    /// Entry point run when the machine's state is entered.
    pub fn on_init(&self) -> Option<&Label> {
        self.on_init.as_ref()
    }

    /// Entry point run for each inbound packet.
    pub fn on_packet(&self) -> Option<&Label> {
        self.on_packet.as_ref()
    }

    /// Entry point run on the periodic tick.
    pub fn on_periodic(&self) -> Option<&Label> {
        self.on_periodic.as_ref()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}
