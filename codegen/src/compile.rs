//! Translates one machine definition into VM machine code.
//!
//! The translation is a deterministic single pass over the syntax tree.
//! Expressions become postfix stack code. Structured statements become
//! forward jumps over freshly labeled sub-blocks, so the label discipline
//! of the builder (forward jumps only) holds by construction: a block is
//! always emitted before its continuation.
//!
//! The builder has no stack-effect verifier, so keeping the operand stack
//! balanced across alternative control paths is handled entirely here:
//! every conditional form ends in a `ld false; pop` pair at its shared
//! exit label, and every temporary the generator pushes is accounted for
//! in the symbol table while sub-expressions are generated.
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use hearth_dsl::ast::{
    BinaryOp, Device, Expr, Literal, MachineDefinition, OnBlock, OnTrigger, State, Stmt,
    SystemProperty, UnaryOp,
};
use hearth_dsl::core::Located;
use hearth_dsl::types::{size_of, Type};
use hearth_mc::{
    Builder, DtMask, Insn, Label, MemType, Program, SwitchEntry, SwitchTable,
};

use crate::error::{cant_do, CodegenError};
use crate::symbols::SymbolTable;

/// Compiles one machine into a program for the device VM.
///
/// The machine must have exactly one state, and all of its writes must
/// target a single device. The returned program has its `on_init` and
/// `on_periodic` entry points populated from the state's on-blocks.
pub fn compile(machine: &MachineDefinition, machine_id: [u8; 16]) -> Result<Program, CodegenError> {
    Generator::new(machine_id)?.compile_machine(machine)
}

/// Instructions for one region of the program, accumulated before they
/// are placed into the builder. The region is entered through its entry
/// label; `next_label` is the label the next appended instruction binds.
struct Block {
    entry: Label,
    insns: Vec<(Option<Label>, Insn, u32)>,
    next_label: Option<Label>,
}

impl Block {
    fn new(entry: Label) -> Self {
        Self {
            next_label: Some(entry.clone()),
            entry,
            insns: Vec::new(),
        }
    }

    fn append(&mut self, insn: Insn, line: u32) {
        let label = self.next_label.take();
        self.insns.push((label, insn, line));
    }

    /// Splices a finished sub-block after this block's instructions.
    fn extend(&mut self, child: Block) -> Result<(), CodegenError> {
        if self.insns.is_empty() {
            // The first instruction would have to bind both entry labels.
            return Err(cant_do("blocks with multiple entry labels"));
        }
        self.insns.extend(child.insns);
        Ok(())
    }

    /// Binds `label` to the next appended instruction.
    fn set_next(&mut self, label: Label) {
        self.next_label = Some(label);
    }

    fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    fn emit(self, builder: &mut Builder) -> Result<(), CodegenError> {
        for (label, insn, line) in self.insns {
            builder.insert(label, insn, line)?;
        }
        Ok(())
    }
}

fn mem_type_for(ty: Type) -> Result<MemType, CodegenError> {
    match ty {
        Type::Bool => Ok(MemType::Bool),
        Type::UInt8 => Ok(MemType::U8),
        Type::UInt16 => Ok(MemType::U16),
        Type::UInt32 => Ok(MemType::U32),
        Type::UInt64 => Ok(MemType::U64),
        Type::Int8 => Ok(MemType::S8),
        Type::Int16 => Ok(MemType::S16),
        Type::Int32 => Ok(MemType::S32),
        Type::Int64 => Ok(MemType::S64),
        Type::Float => Ok(MemType::Float),
        Type::Unknown => Err(cant_do("unknown types")),
    }
}

struct Generator {
    builder: Builder,
    symbols: SymbolTable,
    /// Memory addresses of machine- and state-level variables.
    addresses: HashMap<String, u16>,
    /// The one device this machine writes to, pinned by the first write.
    current_device: Option<Rc<Device>>,
}

impl Generator {
    fn new(machine_id: [u8; 16]) -> Result<Self, CodegenError> {
        Ok(Self {
            builder: Builder::new(0, machine_id)?,
            symbols: SymbolTable::new(),
            addresses: HashMap::new(),
            current_device: None,
        })
    }

    fn expr(&mut self, block: &mut Block, expr: &Expr) -> Result<(), CodegenError> {
        let line = expr.location().line();

        match expr {
            Expr::Identifier { name, ty } => {
                if let Some(address) = self.addresses.get(name.name()) {
                    block.append(Insn::LdMem(mem_type_for(*ty)?, *address), line);
                } else {
                    let distance = self.symbols.distance_to(name.name())?;
                    block.append(Insn::DupI(distance - 1), line);
                }
            }

            Expr::Literal { value, .. } => {
                let insn = match value {
                    Literal::Bool(true) => Insn::LdTrue,
                    Literal::Bool(false) => Insn::LdFalse,
                    Literal::UInt8(v) => Insn::LdU8(*v),
                    Literal::UInt16(v) => Insn::LdU16(*v),
                    Literal::UInt32(v) => Insn::LdU32(*v),
                    Literal::UInt64(v) => Insn::LdU64(*v),
                    Literal::Int8(v) => Insn::LdS8(*v),
                    Literal::Int16(v) => Insn::LdS16(*v),
                    Literal::Int32(v) => Insn::LdS32(*v),
                    Literal::Int64(v) => Insn::LdS64(*v),
                    Literal::Float(v) => Insn::LdFloat(*v),
                };
                block.append(insn, line);
            }

            Expr::Cast { ty, expr, .. } => {
                self.expr(block, expr)?;
                let insn = match ty {
                    Type::Bool => Insn::ConvB,
                    Type::UInt8 => Insn::ConvU8,
                    Type::UInt16 => Insn::ConvU16,
                    Type::UInt32 => Insn::ConvU32,
                    Type::UInt64 => Insn::ConvU64,
                    Type::Int8 => Insn::ConvS8,
                    Type::Int16 => Insn::ConvS16,
                    Type::Int32 => Insn::ConvS32,
                    Type::Int64 => Insn::ConvS64,
                    Type::Float => Insn::ConvF,
                    Type::Unknown => return Err(cant_do("unknown types")),
                };
                block.append(insn, line);
            }

            Expr::Unary { op, expr, .. } => {
                self.expr(block, expr)?;
                match op {
                    UnaryOp::Plus => {}
                    // 0 - x; the VM has no negate instruction.
                    UnaryOp::Minus => {
                        block.append(Insn::LdFalse, line);
                        block.append(Insn::Rot, line);
                        block.append(Insn::Sub, line);
                    }
                    UnaryOp::Not | UnaryOp::Negate => {
                        if expr.ty() == Type::Bool {
                            block.append(Insn::LdTrue, line);
                            block.append(Insn::Xor, line);
                        } else {
                            // All-ones mask from (0 - 1), widened for
                            // 64-bit operands, then xor.
                            block.append(Insn::LdFalse, line);
                            block.append(Insn::LdTrue, line);
                            block.append(Insn::Sub, line);
                            if expr.ty() == Type::UInt64 || expr.ty() == Type::Int64 {
                                block.append(Insn::ConvU64, line);
                            }
                            block.append(Insn::Xor, line);
                        }
                    }
                }
            }

            Expr::Binary {
                op, left, right, ..
            } => {
                let bool_op = matches!(op, BinaryOp::BoolAnd | BinaryOp::BoolOr);

                self.expr(block, left)?;
                if bool_op && left.ty() != Type::Bool {
                    block.append(Insn::ConvB, line);
                }

                self.symbols.push_temp();
                self.expr(block, right)?;
                if bool_op && right.ty() != Type::Bool {
                    block.append(Insn::ConvB, line);
                }
                self.symbols.pop_temp();

                let insn = match op {
                    BinaryOp::Plus => Insn::Add,
                    BinaryOp::Minus => Insn::Sub,
                    BinaryOp::Multiply => Insn::Mul,
                    BinaryOp::Divide => Insn::Div,
                    BinaryOp::Modulo => Insn::Mod,
                    BinaryOp::BoolAnd | BinaryOp::And => Insn::And,
                    BinaryOp::BoolOr | BinaryOp::Or => Insn::Or,
                    BinaryOp::Xor => Insn::Xor,
                    BinaryOp::Equals => Insn::CmpEq,
                    BinaryOp::NotEquals => Insn::CmpNeq,
                    BinaryOp::LessThan => Insn::CmpLt,
                    BinaryOp::LessOrEqual => Insn::CmpLe,
                    BinaryOp::GreaterThan => Insn::CmpGt,
                    BinaryOp::GreaterOrEqual => Insn::CmpGe,
                    BinaryOp::ShiftLeft => Insn::Shl,
                    BinaryOp::ShiftRight => Insn::Shr,
                };
                block.append(insn, line);
            }

            Expr::Conditional {
                condition,
                if_true,
                if_false,
                ..
            } => {
                self.expr(block, condition)?;

                let mut true_block = Block::new(self.builder.create_label());
                let mut false_block = Block::new(self.builder.create_label());
                let exit = self.builder.create_label();

                self.expr(&mut true_block, if_true)?;
                self.expr(&mut false_block, if_false)?;

                block.append(Insn::Jz(false_block.entry.clone()), line);
                true_block.append(Insn::Jump(exit.clone()), line);
                block.extend(true_block)?;
                block.extend(false_block)?;

                block.set_next(exit);
                block.append(Insn::LdFalse, line);
                block.append(Insn::Pop, line);
            }

            Expr::Endpoint { .. } => return Err(cant_do("packet value access by endpoints")),

            Expr::Call { name, args, .. } => {
                for arg in args {
                    self.expr(block, arg)?;
                    self.symbols.push_temp();
                }

                let insn = match name.name() {
                    "second" => Insn::DtDecompose(DtMask::SECOND),
                    "minute" => Insn::DtDecompose(DtMask::MINUTE),
                    "hour" => Insn::DtDecompose(DtMask::HOUR),
                    "day" => Insn::DtDecompose(DtMask::DAY),
                    "month" => Insn::DtDecompose(DtMask::MONTH),
                    "year" => Insn::DtDecompose(DtMask::YEAR),
                    "weekday" => Insn::DtDecompose(DtMask::WEEKDAY),
                    "now" => Insn::LdSysTime,
                    _ => return Err(cant_do("unknown functions")),
                };
                block.append(insn, line);

                for _ in args {
                    self.symbols.pop_temp();
                }
            }

            Expr::SystemProperty { property, .. } => match property {
                SystemProperty::Time => block.append(Insn::LdSysTime, line),
                SystemProperty::PacketEid => block.append(Insn::LdSourceEid, line),
                SystemProperty::StateTime => return Err(cant_do("state timers")),
            },

            Expr::PacketValue { .. } => block.append(Insn::LdSourceVal, line),
        }

        Ok(())
    }

    fn stmt(&mut self, block: &mut Block, stmt: &Stmt) -> Result<(), CodegenError> {
        let line = stmt.location().line();

        match stmt {
            Stmt::Assign {
                target,
                target_ty,
                value,
                ..
            } => {
                self.expr(block, value)?;
                if let Some(address) = self.addresses.get(target.name()) {
                    block.append(Insn::StMem(mem_type_for(*target_ty)?, *address), line);
                } else {
                    let distance = self.symbols.distance_to(target.name())?;
                    block.append(Insn::Exchange(distance - 1), line);
                }
            }

            Stmt::Write {
                device,
                endpoint,
                value,
                ..
            } => {
                if let Some(current) = &self.current_device {
                    if !Rc::ptr_eq(current, device) {
                        return Err(cant_do("multiple devices written by a single machine"));
                    }
                }
                self.current_device = Some(device.clone());

                block.append(Insn::LdU32(endpoint.eid), line);
                self.symbols.push_temp();
                self.expr(block, value)?;
                self.symbols.pop_temp();
                block.append(Insn::Write, line);
            }

            Stmt::If {
                condition,
                if_true,
                if_false,
                ..
            } => {
                self.expr(block, condition)?;

                let mut true_block = Block::new(self.builder.create_label());
                let mut false_block = Block::new(self.builder.create_label());
                let exit = self.builder.create_label();

                self.stmt(&mut true_block, if_true)?;
                if let Some(if_false) = if_false {
                    self.stmt(&mut false_block, if_false)?;
                }

                if !true_block.is_empty() {
                    if !false_block.is_empty() {
                        block.append(Insn::Jz(false_block.entry.clone()), line);
                        true_block.append(Insn::Jump(exit.clone()), line);
                        block.extend(true_block)?;
                        block.extend(false_block)?;
                    } else {
                        block.append(Insn::Jz(exit.clone()), line);
                        block.extend(true_block)?;
                    }
                } else if !false_block.is_empty() {
                    block.append(Insn::Jz(exit.clone()), line);
                    block.extend(false_block)?;
                } else {
                    // No branch emitted anything; drop the condition.
                    block.append(Insn::Pop, line);
                }

                block.set_next(exit);
                block.append(Insn::LdFalse, line);
                block.append(Insn::Pop, line);
            }

            Stmt::Switch { expr, entries, .. } => {
                let exit = self.builder.create_label();
                let mut table = Vec::new();
                let mut values = BTreeSet::new();
                let mut default_target: Option<Label> = None;
                let mut case_blocks = Vec::new();

                for entry in entries {
                    let mut case_block = Block::new(self.builder.create_label());

                    for label in &entry.labels {
                        match label.value {
                            None => default_target = Some(case_block.entry.clone()),
                            Some(v) if v < 0 => return Err(cant_do("negative switch labels")),
                            Some(v) if v > u32::MAX as i64 => {
                                return Err(cant_do("large switch labels"))
                            }
                            Some(v) => {
                                table.push(SwitchEntry {
                                    value: v as u32,
                                    target: case_block.entry.clone(),
                                });
                                values.insert(v as u32);
                            }
                        }
                    }

                    self.stmt(&mut case_block, &entry.body)?;
                    case_block.append(Insn::Jump(exit.clone()), line);
                    case_blocks.push(case_block);
                }

                if values.len() > 255 {
                    return Err(cant_do("large switch blocks"));
                }

                self.expr(block, expr)?;
                block.append(Insn::Switch32(SwitchTable::new(table)?), line);
                if let Some(default_target) = default_target {
                    block.append(Insn::Jump(default_target), line);
                }
                block.append(Insn::Jump(exit.clone()), line);

                for case_block in case_blocks {
                    block.extend(case_block)?;
                }

                block.set_next(exit);
                block.append(Insn::LdFalse, line);
                block.append(Insn::Pop, line);
            }

            Stmt::Block { statements, .. } => {
                self.symbols.push_scope();
                for statement in statements {
                    self.stmt(block, statement)?;
                }
                for _ in 0..self.symbols.pop_scope() {
                    block.append(Insn::Pop, line);
                }
            }

            Stmt::Declaration { name, value, .. } => {
                self.expr(block, value)?;
                self.symbols.declare(name.name())?;
            }

            // A state transition returns to the VM dispatcher; the target
            // state is resolved outside the program.
            Stmt::Goto { .. } => block.append(Insn::Ret, line),
        }

        Ok(())
    }

    /// Lays out machine- and state-level variables in device memory,
    /// bump-allocated in declaration order.
    fn allocate_variables(&mut self, machine: &MachineDefinition, state: &State) -> Result<(), CodegenError> {
        let mut offset: u16 = 0;
        for var in machine.variables.iter().chain(state.variables.iter()) {
            let size = size_of(var.ty).ok_or_else(|| cant_do("unknown types"))?;
            self.addresses.entry(String::from(var.name.name())).or_insert(offset);
            offset += size;
        }
        debug!(
            "allocated {} bytes for {} variables",
            offset,
            self.addresses.len()
        );
        Ok(())
    }

    fn compile_machine(mut self, machine: &MachineDefinition) -> Result<Program, CodegenError> {
        if machine.states.len() != 1 {
            return Err(cant_do("machines with not exactly one state"));
        }
        let state = &machine.states[0];
        debug!("compiling machine '{}', state '{}'", machine.name, state.name);

        self.symbols.push_scope();
        self.allocate_variables(machine, state)?;

        let mut entry_block: Option<Block> = None;
        let mut periodic_block: Option<Block> = None;

        for on_block in &state.on_blocks {
            match on_block {
                OnBlock::Simple { trigger, body, .. } => {
                    let slot = match trigger {
                        OnTrigger::Entry => &mut entry_block,
                        OnTrigger::Periodic => &mut periodic_block,
                        OnTrigger::Exit => {
                            return Err(cant_do(
                                "simple on blocks that aren't 'entry' or 'periodic'",
                            ))
                        }
                    };
                    if slot.is_some() {
                        return Err(cant_do("multiple simple on blocks of same type"));
                    }

                    let mut block = Block::new(self.builder.create_label());
                    self.stmt(&mut block, body)?;
                    *slot = Some(block);
                }
                OnBlock::Expr { .. } => return Err(cant_do("expression-triggered on blocks")),
                OnBlock::Update { .. } => return Err(cant_do("value-triggered on blocks")),
            }
        }

        let mut always = Block::new(self.builder.create_label());
        for statement in &state.statements {
            self.stmt(&mut always, statement)?;
        }

        let state_line = state.name.location.line();
        if always.is_empty() {
            // Each dispatch path terminates on its own.
            for block in [&mut entry_block, &mut periodic_block].into_iter().flatten() {
                block.append(Insn::Ret, state_line);
            }
        } else {
            // Dispatch paths share the always-body as their epilogue.
            for block in [&mut entry_block, &mut periodic_block].into_iter().flatten() {
                block.append(Insn::Jump(always.entry.clone()), state_line);
            }
            always.append(Insn::Ret, state_line);
        }

        if let Some(block) = entry_block {
            self.builder.on_init(block.entry.clone());
            block.emit(&mut self.builder)?;
        }
        if let Some(block) = periodic_block {
            self.builder.on_periodic(block.entry.clone());
            block.emit(&mut self.builder)?;
        }
        if !always.is_empty() {
            always.emit(&mut self.builder)?;
        }

        self.symbols.pop_scope();
        Ok(self.builder.finish()?)
    }
}
