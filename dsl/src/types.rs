//! The scalar type lattice of the machine language.
//!
//! Every value in the language has one of these types. The only implicit
//! conversion rule is [`common_type`]; narrowing requires an explicit cast
//! in the source program.
use core::fmt;

/// Scalar type of a language value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// Placeholder for expressions whose type could not be resolved.
    /// Absorbing under [`common_type`].
    Unknown,
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
}

impl Type {
    /// All types, for exhaustive property checks.
    pub const ALL: [Type; 11] = [
        Type::Unknown,
        Type::Bool,
        Type::UInt8,
        Type::UInt16,
        Type::UInt32,
        Type::UInt64,
        Type::Int8,
        Type::Int16,
        Type::Int32,
        Type::Int64,
        Type::Float,
    ];
}

/// Width ordering of the integer family. `Bool` sits below the 8-bit types.
fn rank(t: Type) -> u8 {
    match t {
        Type::Bool => 0,
        Type::UInt8 | Type::Int8 => 1,
        Type::UInt16 | Type::Int16 => 2,
        Type::UInt32 | Type::Int32 => 3,
        Type::UInt64 | Type::Int64 => 4,
        Type::Unknown | Type::Float => 0,
    }
}

fn from_rank(rank: u8, signed: bool) -> Type {
    match (rank, signed) {
        (0, _) => Type::Bool,
        (1, false) => Type::UInt8,
        (2, false) => Type::UInt16,
        (3, false) => Type::UInt32,
        (_, false) => Type::UInt64,
        (1, true) => Type::Int8,
        (2, true) => Type::Int16,
        (3, true) => Type::Int32,
        (_, true) => Type::Int64,
    }
}

/// The widest mutually compatible type of two operands.
///
/// `Unknown` absorbs everything, `Float` absorbs everything known, and a
/// type paired with itself is a fixed point. Otherwise the operand of
/// greater rank decides the width; the result is signed only when the
/// signed operand is at least as wide as the unsigned one on both sides.
///
/// Total and commutative over all pairs of [`Type`].
pub fn common_type(a: Type, b: Type) -> Type {
    if a == Type::Unknown || b == Type::Unknown {
        return Type::Unknown;
    }
    if a == b {
        return a;
    }
    if a == Type::Float || b == Type::Float {
        return Type::Float;
    }

    let max_rank = rank(a).max(rank(b));
    let signed = (is_signed(a) && is_signed(b))
        || (is_signed(a) && !is_signed(b) && rank(a) > rank(b))
        || (!is_signed(a) && is_signed(b) && rank(a) < rank(b));

    from_rank(max_rank, signed)
}

pub fn is_signed(t: Type) -> bool {
    matches!(
        t,
        Type::Int8 | Type::Int16 | Type::Int32 | Type::Int64 | Type::Float
    )
}

pub fn is_int(t: Type) -> bool {
    matches!(
        t,
        Type::UInt8
            | Type::UInt16
            | Type::UInt32
            | Type::UInt64
            | Type::Int8
            | Type::Int16
            | Type::Int32
            | Type::Int64
    )
}

/// Storage size in bytes, as used by the machine-variable allocator.
/// `None` for `Unknown`, which cannot be stored.
pub fn size_of(t: Type) -> Option<u16> {
    match t {
        Type::Unknown => None,
        Type::Bool | Type::UInt8 | Type::Int8 => Some(1),
        Type::UInt16 | Type::Int16 => Some(2),
        Type::UInt32 | Type::Int32 | Type::Float => Some(4),
        Type::UInt64 | Type::Int64 => Some(8),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Unknown => "<??>",
            Type::Bool => "bool",
            Type::UInt8 => "uint8",
            Type::UInt16 => "uint16",
            Type::UInt32 => "uint32",
            Type::UInt64 => "uint64",
            Type::Int8 => "int8",
            Type::Int16 => "int16",
            Type::Int32 => "int32",
            Type::Int64 => "int64",
            Type::Float => "float",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_type() -> impl Strategy<Value = Type> {
        prop::sample::select(Type::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn common_type_when_any_pair_then_commutative(a in any_type(), b in any_type()) {
            prop_assert_eq!(common_type(a, b), common_type(b, a));
        }

        #[test]
        fn common_type_when_same_operand_then_fixed_point(a in any_type()) {
            prop_assert_eq!(common_type(a, a), a);
        }

        #[test]
        fn common_type_when_unknown_operand_then_unknown(a in any_type()) {
            prop_assert_eq!(common_type(Type::Unknown, a), Type::Unknown);
        }

        #[test]
        fn common_type_when_float_operand_then_float(a in any_type()) {
            prop_assume!(a != Type::Unknown);
            prop_assert_eq!(common_type(Type::Float, a), Type::Float);
        }

        #[test]
        fn common_type_when_known_operands_then_at_least_as_wide(a in any_type(), b in any_type()) {
            prop_assume!(a != Type::Unknown && b != Type::Unknown);
            prop_assume!(a != Type::Float && b != Type::Float);
            let c = common_type(a, b);
            prop_assert!(rank(c) >= rank(a).max(rank(b)));
        }
    }

    #[test]
    fn common_type_when_unsigned_wider_than_signed_then_unsigned() {
        assert_eq!(common_type(Type::Int8, Type::UInt32), Type::UInt32);
        assert_eq!(common_type(Type::UInt32, Type::Int32), Type::UInt32);
    }

    #[test]
    fn common_type_when_signed_wider_than_unsigned_then_signed() {
        assert_eq!(common_type(Type::Int32, Type::UInt8), Type::Int32);
        assert_eq!(common_type(Type::UInt16, Type::Int64), Type::Int64);
    }

    #[test]
    fn common_type_when_bool_and_integer_then_integer() {
        assert_eq!(common_type(Type::Bool, Type::UInt8), Type::UInt8);
        assert_eq!(common_type(Type::Bool, Type::Int16), Type::Int16);
    }

    #[test]
    fn size_of_when_storable_types_then_bytes() {
        assert_eq!(size_of(Type::Bool), Some(1));
        assert_eq!(size_of(Type::UInt16), Some(2));
        assert_eq!(size_of(Type::Float), Some(4));
        assert_eq!(size_of(Type::Int64), Some(8));
        assert_eq!(size_of(Type::Unknown), None);
    }
}
