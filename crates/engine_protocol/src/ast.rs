/// Abstract syntax tree types for the packet descriptor language.
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Top-level file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub items: Vec<StructDef>,
}

// ---------------------------------------------------------------------------
// Structs & packets
// ---------------------------------------------------------------------------

/// A `struct` or `packet` declaration. Packets are structs with an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub packet_id: Option<i32>,
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn is_packet(&self) -> bool {
        self.packet_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
    pub tags: Tags,
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String,
    VarInt,
    VarLong,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "i8" => Self::I8,
            "u8" => Self::U8,
            "i16" => Self::I16,
            "u16" => Self::U16,
            "i32" => Self::I32,
            "u32" => Self::U32,
            "i64" => Self::I64,
            "u64" => Self::U64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "string" => Self::String,
            "VarInt" => Self::VarInt,
            "VarLong" => Self::VarLong,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::VarInt => "VarInt",
            Self::VarLong => "VarLong",
        }
    }

    /// Whether this primitive can carry a list length.
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64 | Self::String)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TypeExpr {
    Primitive(Primitive),
    /// A struct, or an opaque type handled by a raw codec.
    Named(String),
    /// list<T>
    List(Box<TypeExpr>),
    /// box<T>, an indirection that only makes sense with an `as` tag.
    Boxed(Box<TypeExpr>),
}

impl TypeExpr {
    /// The type with any outer `box<...>` layers removed.
    pub fn unboxed(&self) -> &TypeExpr {
        match self {
            TypeExpr::Boxed(inner) => inner.unboxed(),
            other => other,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(p) => f.write_str(p.name()),
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::List(inner) => write!(f, "list<{inner}>"),
            TypeExpr::Boxed(inner) => write!(f, "box<{inner}>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Encoding {
    /// Serialized to JSON text and written as a string.
    Json,
    /// Delegated to a registered raw codec.
    Raw,
}

/// `[length = T, as = json|raw]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tags {
    pub length: Option<TypeExpr>,
    pub encoding: Option<Encoding>,
}

impl Tags {
    pub fn is_empty(&self) -> bool {
        self.length.is_none() && self.encoding.is_none()
    }
}
