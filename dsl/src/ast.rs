//! Syntax tree for machine definitions.
//!
//! The node set is closed. Expressions, statements and on-blocks are sum
//! types traversed by exhaustive `match`; a new node kind is a compile
//! error at every consumer until it is handled.
//!
//! Expressions resolve their type structurally from their children, so a
//! well-formed tree never needs a separate inference pass before code
//! generation.
use std::rc::Rc;

use crate::core::{Identifier, Located, SourceLocation};
use crate::types::{common_type, Type};

/// Access capabilities of an endpoint, combinable as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointAccess(u8);

impl EndpointAccess {
    pub const READ: EndpointAccess = EndpointAccess(1);
    pub const WRITE: EndpointAccess = EndpointAccess(2);
    pub const NON_LOCAL_WRITE: EndpointAccess = EndpointAccess(4);
    pub const BROADCAST: EndpointAccess = EndpointAccess(8);

    pub fn empty() -> Self {
        EndpointAccess(0)
    }

    pub fn with(self, other: EndpointAccess) -> Self {
        EndpointAccess(self.0 | other.0)
    }

    pub fn contains(self, other: EndpointAccess) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A typed, numerically identified device property.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub name: Identifier,
    /// Endpoint id used on the wire and in generated write instructions.
    pub eid: u32,
    pub ty: Type,
    pub access: EndpointAccess,
}

/// A device node: a name, a 16-byte address and the endpoints it exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub name: Identifier,
    pub address: [u8; 16],
    pub endpoints: Vec<Rc<Endpoint>>,
}

impl Device {
    /// Membership by identity. Endpoint counts per device are small, so a
    /// linear scan is fine.
    pub fn has_endpoint(&self, endpoint: &Rc<Endpoint>) -> bool {
        self.endpoints.iter().any(|e| Rc::ptr_eq(e, endpoint))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    /// Boolean or bitwise not, written `!`.
    Not,
    /// Bit complement, written `~`.
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Multiply,
    Divide,
    Modulo,
    Plus,
    Minus,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    Xor,
    BoolAnd,
    BoolOr,
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

/// A literal constant; its type is fixed by the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
}

impl Literal {
    pub fn ty(&self) -> Type {
        match self {
            Literal::Bool(_) => Type::Bool,
            Literal::UInt8(_) => Type::UInt8,
            Literal::UInt16(_) => Type::UInt16,
            Literal::UInt32(_) => Type::UInt32,
            Literal::UInt64(_) => Type::UInt64,
            Literal::Int8(_) => Type::Int8,
            Literal::Int16(_) => Type::Int16,
            Literal::Int32(_) => Type::Int32,
            Literal::Int64(_) => Type::Int64,
            Literal::Float(_) => Type::Float,
        }
    }
}

/// Properties of the execution environment readable from a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemProperty {
    /// Wall-clock time of the device.
    Time,
    /// Seconds spent in the current state.
    StateTime,
    /// Endpoint id of the packet being handled.
    PacketEid,
}

impl SystemProperty {
    pub fn ty(&self) -> Type {
        match self {
            SystemProperty::Time => Type::UInt64,
            SystemProperty::StateTime => Type::UInt32,
            SystemProperty::PacketEid => Type::UInt32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a declared variable. The type is the declared type,
    /// resolved by the front end.
    Identifier {
        name: Identifier,
        ty: Type,
    },
    Literal {
        value: Literal,
        location: SourceLocation,
    },
    Cast {
        ty: Type,
        expr: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    /// Ternary `condition ? if_true : if_false`.
    Conditional {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
        location: SourceLocation,
    },
    /// Direct endpoint read, `device.endpoint`.
    Endpoint {
        device: Rc<Device>,
        endpoint: Rc<Endpoint>,
        location: SourceLocation,
    },
    /// Built-in function application; the result type is fixed by the
    /// front end when it resolves the callee.
    Call {
        name: Identifier,
        ty: Type,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    SystemProperty {
        property: SystemProperty,
        location: SourceLocation,
    },
    /// Value carried by the packet being handled; typed like the endpoint
    /// the packet refers to.
    PacketValue {
        endpoint: Rc<Endpoint>,
        location: SourceLocation,
    },
}

impl Expr {
    /// Static type of the expression, resolved from its children.
    pub fn ty(&self) -> Type {
        match self {
            Expr::Identifier { ty, .. } => *ty,
            Expr::Literal { value, .. } => value.ty(),
            Expr::Cast { ty, .. } => *ty,
            Expr::Unary { op, expr, .. } => match op {
                UnaryOp::Not => Type::Bool,
                UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Negate => expr.ty(),
            },
            Expr::Binary { left, right, .. } => common_type(left.ty(), right.ty()),
            Expr::Conditional {
                if_true, if_false, ..
            } => {
                if if_true.ty() == if_false.ty() {
                    if_true.ty()
                } else {
                    common_type(if_true.ty(), if_false.ty())
                }
            }
            Expr::Endpoint { endpoint, .. } => endpoint.ty,
            Expr::Call { ty, .. } => *ty,
            Expr::SystemProperty { property, .. } => property.ty(),
            Expr::PacketValue { endpoint, .. } => endpoint.ty,
        }
    }

    /// Constant value of the expression, when it is one the language can
    /// fold. Only literals fold; switch labels require a foldable value.
    pub fn const_value(&self) -> Option<i64> {
        match self {
            Expr::Literal { value, .. } => match value {
                Literal::Bool(b) => Some(*b as i64),
                Literal::UInt8(v) => Some(*v as i64),
                Literal::UInt16(v) => Some(*v as i64),
                Literal::UInt32(v) => Some(*v as i64),
                Literal::UInt64(v) => i64::try_from(*v).ok(),
                Literal::Int8(v) => Some(*v as i64),
                Literal::Int16(v) => Some(*v as i64),
                Literal::Int32(v) => Some(*v as i64),
                Literal::Int64(v) => Some(*v),
                Literal::Float(_) => None,
            },
            _ => None,
        }
    }
}

impl Located for Expr {
    fn location(&self) -> &SourceLocation {
        match self {
            Expr::Identifier { name, .. } => &name.location,
            Expr::Literal { location, .. }
            | Expr::Cast { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Conditional { location, .. }
            | Expr::Endpoint { location, .. }
            | Expr::Call { location, .. }
            | Expr::SystemProperty { location, .. }
            | Expr::PacketValue { location, .. } => location,
        }
    }
}

/// One label of a switch entry. `value: None` is the default label.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchLabel {
    pub value: Option<i64>,
    pub location: SourceLocation,
}

/// One arm of a switch statement; several labels may share a body.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchEntry {
    pub labels: Vec<SwitchLabel>,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign {
        target: Identifier,
        /// Declared type of the target, resolved by the front end.
        target_ty: Type,
        value: Expr,
        location: SourceLocation,
    },
    /// The only statement with an externally observable effect: writes a
    /// value to a device endpoint.
    Write {
        device: Rc<Device>,
        endpoint: Rc<Endpoint>,
        value: Expr,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        if_true: Box<Stmt>,
        if_false: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    Switch {
        expr: Expr,
        entries: Vec<SwitchEntry>,
        location: SourceLocation,
    },
    /// Statement sequence introducing a lexical scope.
    Block {
        statements: Vec<Stmt>,
        location: SourceLocation,
    },
    /// Block-local variable declaration with initializer.
    Declaration {
        name: Identifier,
        ty: Type,
        value: Expr,
        location: SourceLocation,
    },
    /// Transition to another state of the machine.
    Goto {
        state: Identifier,
        location: SourceLocation,
    },
}

impl Located for Stmt {
    fn location(&self) -> &SourceLocation {
        match self {
            Stmt::Assign { location, .. }
            | Stmt::Write { location, .. }
            | Stmt::If { location, .. }
            | Stmt::Switch { location, .. }
            | Stmt::Block { location, .. }
            | Stmt::Declaration { location, .. }
            | Stmt::Goto { location, .. } => location,
        }
    }
}

/// Triggers of simple on-blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OnTrigger {
    Entry,
    Exit,
    Periodic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OnBlock {
    /// `on entry`, `on exit`, `on periodic`.
    Simple {
        trigger: OnTrigger,
        body: Stmt,
        location: SourceLocation,
    },
    /// Runs when the condition becomes true.
    Expr {
        condition: Expr,
        body: Stmt,
        location: SourceLocation,
    },
    /// Runs when a packet updates an endpoint, optionally filtered to one
    /// source device.
    Update {
        from: Option<Rc<Device>>,
        body: Stmt,
        location: SourceLocation,
    },
}

/// A variable declared at machine or state level. These live in device
/// memory, not on the operand stack, and start zeroed.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: Identifier,
    pub ty: Type,
    pub location: SourceLocation,
}

/// One state of a machine: state variables, triggered on-blocks and an
/// always-body run after any trigger fires.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: Identifier,
    pub variables: Vec<VariableDecl>,
    pub on_blocks: Vec<OnBlock>,
    pub statements: Vec<Stmt>,
}

/// A complete machine: machine-level variables plus its states.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineDefinition {
    pub name: Identifier,
    pub variables: Vec<VariableDecl>,
    pub states: Vec<State>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::default()
    }

    fn lit(value: Literal) -> Expr {
        Expr::Literal {
            value,
            location: loc(),
        }
    }

    #[test]
    fn expr_when_unary_not_then_bool() {
        let e = Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(lit(Literal::UInt32(1))),
            location: loc(),
        };
        assert_eq!(e.ty(), Type::Bool);
    }

    #[test]
    fn expr_when_unary_minus_then_operand_type() {
        let e = Expr::Unary {
            op: UnaryOp::Minus,
            expr: Box::new(lit(Literal::Int16(-4))),
            location: loc(),
        };
        assert_eq!(e.ty(), Type::Int16);
    }

    #[test]
    fn expr_when_binary_mixed_width_then_common_type() {
        let e = Expr::Binary {
            op: BinaryOp::Plus,
            left: Box::new(lit(Literal::UInt8(1))),
            right: Box::new(lit(Literal::Float(2.0))),
            location: loc(),
        };
        assert_eq!(e.ty(), Type::Float);
    }

    #[test]
    fn expr_when_conditional_same_branch_types_then_that_type() {
        let e = Expr::Conditional {
            condition: Box::new(lit(Literal::Bool(true))),
            if_true: Box::new(lit(Literal::UInt8(1))),
            if_false: Box::new(lit(Literal::UInt8(2))),
            location: loc(),
        };
        assert_eq!(e.ty(), Type::UInt8);
    }

    #[test]
    fn expr_when_literal_folds_then_const_value() {
        assert_eq!(lit(Literal::UInt32(7)).const_value(), Some(7));
        assert_eq!(lit(Literal::Int8(-3)).const_value(), Some(-3));
        assert_eq!(lit(Literal::Float(1.5)).const_value(), None);
    }

    #[test]
    fn device_when_endpoint_not_member_then_has_endpoint_false() {
        let ep = Rc::new(Endpoint {
            name: Identifier::from("temp"),
            eid: 3,
            ty: Type::Float,
            access: EndpointAccess::READ,
        });
        let other = Rc::new(Endpoint {
            name: Identifier::from("temp"),
            eid: 3,
            ty: Type::Float,
            access: EndpointAccess::READ,
        });
        let dev = Device {
            name: Identifier::from("sensor"),
            address: [0; 16],
            endpoints: vec![ep.clone()],
        };
        assert!(dev.has_endpoint(&ep));
        // Identity, not structural equality.
        assert!(!dev.has_endpoint(&other));
    }

    #[test]
    fn endpoint_access_when_combined_then_contains_both() {
        let access = EndpointAccess::READ.with(EndpointAccess::BROADCAST);
        assert!(access.contains(EndpointAccess::READ));
        assert!(access.contains(EndpointAccess::BROADCAST));
        assert!(!access.contains(EndpointAccess::WRITE));
    }
}
