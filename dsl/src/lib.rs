//! Language objects for hearth automation machines.
//!
//! This crate defines the data that flows between the front end and the
//! code generator: the scalar type lattice, source locations, the syntax
//! tree for machine definitions, and the device/endpoint model that write
//! statements refer to.
//!
//! The tree is immutable once built. Every expression carries a resolved
//! type; name resolution and type checking happen before code generation
//! and are not repeated here.

pub mod ast;
pub mod core;
pub mod types;
