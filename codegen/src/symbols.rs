//! Scope and stack-slot bookkeeping for block-local variables.
//!
//! Block-local variables live on the operand stack of the VM. The symbol
//! table tracks, per lexical scope, which slot each variable occupies,
//! together with the number of temporary slots the generator currently
//! has in flight. Both are adjusted only through the methods here so the
//! virtual stack depth cannot drift from the emitted push/pop traffic.
use crate::error::{cant_do, CodegenError};

/// Symbol table with a stack of lexical scopes and a temporary counter.
pub struct SymbolTable {
    scopes: Vec<Vec<String>>,
    temporaries: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            temporaries: 0,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Closes the innermost scope and returns how many stack slots its
    /// variables occupied; the caller pops that many.
    pub fn pop_scope(&mut self) -> usize {
        self.scopes.pop().map(|scope| scope.len()).unwrap_or(0)
    }

    /// Declares a variable in the innermost scope. The value is expected
    /// to be on top of the stack already.
    pub fn declare(&mut self, name: &str) -> Result<(), CodegenError> {
        if self.scopes.iter().any(|s| s.iter().any(|v| v == name)) {
            return Err(cant_do("duplicate variable names"));
        }
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| cant_do("declarations outside any scope"))?;
        scope.push(String::from(name));
        Ok(())
    }

    /// Marks one temporary value as live on the stack.
    pub fn push_temp(&mut self) {
        self.temporaries += 1;
    }

    pub fn pop_temp(&mut self) {
        self.temporaries -= 1;
    }

    fn slot_of(&self, name: &str) -> Option<usize> {
        let mut base = 0;
        for scope in &self.scopes {
            if let Some(i) = scope.iter().position(|v| v == name) {
                return Some(base + i);
            }
            base += scope.len();
        }
        None
    }

    fn top_slot(&self) -> usize {
        self.scopes.iter().map(|s| s.len()).sum::<usize>() + self.temporaries
    }

    /// Distance from the current stack top to the variable's slot.
    /// At least 1; the VM addresses at most 256 slots below the top.
    pub fn distance_to(&self, name: &str) -> Result<u8, CodegenError> {
        let slot = self.slot_of(name).ok_or_else(|| cant_do("unknown vars"))?;
        let distance = self.top_slot() - slot;
        if distance >= 256 {
            return Err(cant_do("deep stacks"));
        }
        Ok(distance as u8)
    }
}
