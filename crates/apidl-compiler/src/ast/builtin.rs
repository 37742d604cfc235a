//! Built-in type names.
//!
//! Generators map these names straight onto target-language scalars, so the
//! list here must stay in sync with every generator that consumes the AST.

/// Type names that never need a declaration.
pub const BASIC_TYPES: &[&str] = &[
    "bool",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "int8",
    "int16",
    "int32",
    "int64",
    "float32",
    "float64",
    "complex64",
    "complex128",
    "string",
    "int",
    "uint",
    "uintptr",
    "byte",
    "rune",
];

/// Returns true if `name` is a built-in scalar.
pub fn is_basic_type(name: &str) -> bool {
    BASIC_TYPES.contains(&name)
}
