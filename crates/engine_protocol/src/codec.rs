//! Compiled protocol: per-struct field plans and the encode/decode walker.
//!
//! A [`Schema`] is validated once and flattened into plans that reference
//! other structs by index, so the walker never looks at type names again.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use tracing::debug;

use crate::ast::{Encoding, FieldDef, Primitive, TypeExpr};
use crate::error::CodecError;
use crate::schema::{Schema, SchemaError};
use crate::value::{Record, Value};
use crate::wire::{self, MAX_PREALLOCATION};

/// Deepest struct and list nesting the codec will walk.
pub const MAX_DEPTH: usize = 128;

/// Encoder/decoder for an `as = raw` type, registered by type name.
pub trait RawCodec {
    fn write(&self, value: &Value, out: &mut dyn Write) -> Result<(), CodecError>;
    fn read(&self, input: &mut dyn Read) -> Result<Value, CodecError>;

    /// Build a value from its JSON form. `None` when the type has no JSON form.
    fn from_json(&self, _json: &serde_json::Value) -> Option<Value> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Kind {
    Primitive(Primitive),
    Struct(usize),
    List {
        length: Primitive,
        element: Box<Kind>,
    },
    /// `list<u8>`
    Bytes {
        length: Primitive,
    },
    Json,
    Raw(String),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Primitive(p) => f.write_str(p.name()),
            Kind::Struct(_) => f.write_str("struct"),
            Kind::List { .. } => f.write_str("list"),
            Kind::Bytes { .. } => f.write_str("bytes"),
            Kind::Json => f.write_str("json"),
            Kind::Raw(name) => write!(f, "raw {name}"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct FieldPlan {
    pub(crate) name: String,
    pub(crate) kind: Kind,
}

#[derive(Debug)]
pub(crate) struct StructPlan {
    pub(crate) name: String,
    pub(crate) packet_id: Option<i32>,
    pub(crate) fields: Vec<FieldPlan>,
}

pub struct Protocol {
    pub(crate) structs: Vec<StructPlan>,
    by_name: HashMap<String, usize>,
    pub(crate) packets: HashMap<i32, usize>,
    pub(crate) raw: HashMap<String, Box<dyn RawCodec>>,
}

impl Protocol {
    /// Validate `schema` and build the field plans.
    pub fn compile(schema: &Schema) -> Result<Self, SchemaError> {
        schema.validate()?;

        let names = schema.struct_names();
        let by_name: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        let mut structs = Vec::with_capacity(names.len());
        let mut packets = HashMap::new();
        for (index, name) in names.iter().enumerate() {
            let def = &schema.structs[*name];
            let fields = def
                .fields
                .iter()
                .map(|field| {
                    Ok(FieldPlan {
                        name: field.name.clone(),
                        kind: plan_field(&by_name, &def.name, field)?,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            if let Some(id) = def.packet_id {
                packets.insert(id, index);
            }
            structs.push(StructPlan {
                name: def.name.clone(),
                packet_id: def.packet_id,
                fields,
            });
        }

        debug!(
            structs = structs.len(),
            packets = packets.len(),
            "compiled protocol"
        );
        Ok(Self {
            structs,
            by_name,
            packets,
            raw: HashMap::new(),
        })
    }

    /// Parse, validate and compile descriptor source in one step.
    pub fn from_source(source: &str) -> Result<Self, SchemaError> {
        let mut schema = Schema::new();
        schema.load_source(source)?;
        Self::compile(&schema)
    }

    /// Register the codec used for `as = raw` fields of type `type_name`
    /// (any outer `box<...>` stripped). Replaces an earlier registration.
    pub fn register_raw(&mut self, type_name: impl Into<String>, codec: impl RawCodec + 'static) {
        let type_name = type_name.into();
        debug!(type_name = %type_name, "registered raw codec");
        self.raw.insert(type_name, Box::new(codec));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Struct names, sorted.
    pub fn struct_names(&self) -> impl Iterator<Item = &str> {
        self.structs.iter().map(|s| s.name.as_str())
    }

    pub fn packet_id(&self, name: &str) -> Option<i32> {
        self.by_name
            .get(name)
            .and_then(|&i| self.structs[i].packet_id)
    }

    pub(crate) fn index_of(&self, name: &str) -> Result<usize, CodecError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CodecError::UnknownStruct(name.to_string()))
    }

    // -- Encoding --

    /// Encode `record` as the body of struct `name`.
    pub fn encode<W: Write>(
        &self,
        name: &str,
        record: &Record,
        out: &mut W,
    ) -> Result<(), CodecError> {
        let index = self.index_of(name)?;
        self.write_record(index, record, out)
    }

    pub fn encode_to_vec(&self, name: &str, record: &Record) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode(name, record, &mut out)?;
        Ok(out)
    }

    pub(crate) fn write_record(
        &self,
        index: usize,
        record: &Record,
        out: &mut dyn Write,
    ) -> Result<(), CodecError> {
        self.write_struct(index, record, out, 0)
    }

    fn write_struct(
        &self,
        index: usize,
        record: &Record,
        out: &mut dyn Write,
        depth: usize,
    ) -> Result<(), CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let plan = &self.structs[index];
        for field in &plan.fields {
            let path = || format!("{}.{}", plan.name, field.name);
            let value = record
                .get(&field.name)
                .ok_or_else(|| CodecError::MissingField(path()))?;
            self.write_value(&path, &field.kind, value, out, depth + 1)?;
        }
        Ok(())
    }

    fn write_value(
        &self,
        path: &dyn Fn() -> String,
        kind: &Kind,
        value: &Value,
        out: &mut dyn Write,
        depth: usize,
    ) -> Result<(), CodecError> {
        let mismatch = || CodecError::TypeMismatch {
            field: path(),
            expected: kind.to_string(),
            found: value.kind_name(),
        };

        match (kind, value) {
            (Kind::Primitive(p), _) => write_primitive(*p, value, out)
                .ok_or_else(mismatch)?,
            (Kind::Struct(index), Value::Struct(record)) => {
                self.write_struct(*index, record, out, depth)
            }
            (Kind::List { length, element }, Value::List(items)) => {
                if depth > MAX_DEPTH {
                    return Err(CodecError::TooDeep(MAX_DEPTH));
                }
                write_length(*length, items.len(), out)?;
                for item in items {
                    self.write_value(path, element, item, out, depth + 1)?;
                }
                Ok(())
            }
            (Kind::Bytes { length }, Value::Bytes(bytes)) => {
                write_length(*length, bytes.len(), out)?;
                out.write_all(bytes)?;
                Ok(())
            }
            (Kind::Json, Value::Json(json)) => {
                wire::write_string(out, &serde_json::to_string(json)?)
            }
            (Kind::Raw(type_name), _) => self.raw_codec(type_name)?.write(value, out),
            _ => Err(mismatch()),
        }
    }

    pub(crate) fn raw_codec(&self, type_name: &str) -> Result<&dyn RawCodec, CodecError> {
        self.raw
            .get(type_name)
            .map(|codec| &**codec)
            .ok_or_else(|| CodecError::MissingRawCodec(type_name.to_string()))
    }

    // -- Decoding --

    /// Decode the body of struct `name`, consuming exactly its bytes.
    pub fn decode<R: Read>(&self, name: &str, input: &mut R) -> Result<Record, CodecError> {
        let index = self.index_of(name)?;
        self.read_record(index, input)
    }

    /// Decode a complete buffer; leftover bytes are an error.
    pub fn decode_slice(&self, name: &str, bytes: &[u8]) -> Result<Record, CodecError> {
        let mut input = bytes;
        let record = self.decode(name, &mut input)?;
        if !input.is_empty() {
            return Err(CodecError::TrailingBytes(input.len()));
        }
        Ok(record)
    }

    pub(crate) fn read_record(
        &self,
        index: usize,
        input: &mut dyn Read,
    ) -> Result<Record, CodecError> {
        self.read_struct(index, input, 0)
    }

    fn read_struct(
        &self,
        index: usize,
        input: &mut dyn Read,
        depth: usize,
    ) -> Result<Record, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let plan = &self.structs[index];
        let mut record = Record::new();
        for field in &plan.fields {
            let value = self.read_value(&field.kind, input, depth + 1)?;
            record.set(field.name.as_str(), value);
        }
        Ok(record)
    }

    fn read_value(
        &self,
        kind: &Kind,
        input: &mut dyn Read,
        depth: usize,
    ) -> Result<Value, CodecError> {
        Ok(match kind {
            Kind::Primitive(p) => read_primitive(*p, input)?,
            Kind::Struct(index) => Value::Struct(self.read_struct(*index, input, depth)?),
            Kind::List { length, element } => {
                if depth > MAX_DEPTH {
                    return Err(CodecError::TooDeep(MAX_DEPTH));
                }
                let len = read_length(*length, input)?;
                if len > MAX_PREALLOCATION && self.is_zero_sized(element) {
                    return Err(CodecError::InvalidLength(format!(
                        "{len} elements that take no bytes"
                    )));
                }
                let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATION));
                for _ in 0..len {
                    items.push(self.read_value(element, input, depth + 1)?);
                }
                Value::List(items)
            }
            Kind::Bytes { length } => {
                let len = read_length(*length, input)?;
                Value::Bytes(wire::read_bytes(input, len)?)
            }
            Kind::Json => Value::Json(serde_json::from_str(&wire::read_string(input)?)?),
            Kind::Raw(type_name) => self.raw_codec(type_name)?.read(input)?,
        })
    }
}

impl Protocol {
    /// Whether `kind` always encodes to zero bytes (structs of empty structs).
    fn is_zero_sized(&self, kind: &Kind) -> bool {
        match kind {
            Kind::Struct(index) => self.structs[*index]
                .fields
                .iter()
                .all(|f| self.is_zero_sized(&f.kind)),
            _ => false,
        }
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw: Vec<_> = self.raw.keys().collect();
        raw.sort();
        f.debug_struct("Protocol")
            .field("structs", &self.structs)
            .field("raw", &raw)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

fn plan_field(
    by_name: &HashMap<String, usize>,
    structure: &str,
    field: &FieldDef,
) -> Result<Kind, SchemaError> {
    match field.tags.encoding {
        Some(Encoding::Json) => return Ok(Kind::Json),
        Some(Encoding::Raw) => return Ok(Kind::Raw(field.ty.unboxed().to_string())),
        None => {}
    }

    let length = match &field.tags.length {
        Some(TypeExpr::Primitive(p)) => Some(*p),
        _ => None,
    };
    plan_type(by_name, structure, field, &field.ty, length)
}

fn plan_type(
    by_name: &HashMap<String, usize>,
    structure: &str,
    field: &FieldDef,
    ty: &TypeExpr,
    length: Option<Primitive>,
) -> Result<Kind, SchemaError> {
    let invalid = || SchemaError::InvalidField {
        structure: structure.to_string(),
        field: field.name.clone(),
        reason: format!("{ty} cannot be encoded"),
    };

    match ty {
        TypeExpr::Primitive(p) => Ok(Kind::Primitive(*p)),
        TypeExpr::Named(name) => by_name
            .get(name)
            .map(|&index| Kind::Struct(index))
            .ok_or_else(|| SchemaError::UnknownType {
                structure: structure.to_string(),
                field: field.name.clone(),
                name: name.clone(),
            }),
        TypeExpr::List(inner) => {
            let length = length.ok_or_else(invalid)?;
            if **inner == TypeExpr::Primitive(Primitive::U8) {
                return Ok(Kind::Bytes { length });
            }
            Ok(Kind::List {
                length,
                element: Box::new(plan_type(by_name, structure, field, inner, None)?),
            })
        }
        TypeExpr::Boxed(_) => Err(invalid()),
    }
}

// ---------------------------------------------------------------------------
// Primitives & lengths
// ---------------------------------------------------------------------------

/// `None` when `value` does not have the primitive's shape.
fn write_primitive(
    p: Primitive,
    value: &Value,
    out: &mut dyn Write,
) -> Option<Result<(), CodecError>> {
    let bytes: Vec<u8> = match (p, value) {
        (Primitive::Bool, Value::Bool(v)) => vec![u8::from(*v)],
        (Primitive::I8, Value::I8(v)) => v.to_be_bytes().to_vec(),
        (Primitive::U8, Value::U8(v)) => vec![*v],
        (Primitive::I16, Value::I16(v)) => v.to_be_bytes().to_vec(),
        (Primitive::U16, Value::U16(v)) => v.to_be_bytes().to_vec(),
        (Primitive::I32, Value::I32(v)) => v.to_be_bytes().to_vec(),
        (Primitive::U32, Value::U32(v)) => v.to_be_bytes().to_vec(),
        (Primitive::I64, Value::I64(v)) => v.to_be_bytes().to_vec(),
        (Primitive::U64, Value::U64(v)) => v.to_be_bytes().to_vec(),
        (Primitive::F32, Value::F32(v)) => v.to_be_bytes().to_vec(),
        (Primitive::F64, Value::F64(v)) => v.to_be_bytes().to_vec(),
        (Primitive::VarInt, Value::VarInt(v)) => {
            return Some(wire::write_varint(out, *v).map_err(Into::into));
        }
        (Primitive::VarLong, Value::VarLong(v)) => {
            return Some(wire::write_varlong(out, *v).map_err(Into::into));
        }
        (Primitive::String, Value::String(v)) => return Some(wire::write_string(out, v)),
        _ => return None,
    };
    Some(out.write_all(&bytes).map_err(Into::into))
}

fn read_primitive(p: Primitive, input: &mut dyn Read) -> Result<Value, CodecError> {
    Ok(match p {
        Primitive::Bool => Value::Bool(wire::read_bool(input)?),
        Primitive::I8 => Value::I8(i8::from_be_bytes(wire::read_array(input)?)),
        Primitive::U8 => Value::U8(wire::read_u8(input)?),
        Primitive::I16 => Value::I16(i16::from_be_bytes(wire::read_array(input)?)),
        Primitive::U16 => Value::U16(u16::from_be_bytes(wire::read_array(input)?)),
        Primitive::I32 => Value::I32(i32::from_be_bytes(wire::read_array(input)?)),
        Primitive::U32 => Value::U32(u32::from_be_bytes(wire::read_array(input)?)),
        Primitive::I64 => Value::I64(i64::from_be_bytes(wire::read_array(input)?)),
        Primitive::U64 => Value::U64(u64::from_be_bytes(wire::read_array(input)?)),
        Primitive::F32 => Value::F32(f32::from_be_bytes(wire::read_array(input)?)),
        Primitive::F64 => Value::F64(f64::from_be_bytes(wire::read_array(input)?)),
        Primitive::VarInt => Value::VarInt(wire::read_varint(input)?),
        Primitive::VarLong => Value::VarLong(wire::read_varlong(input)?),
        Primitive::String => Value::String(wire::read_string(input)?),
    })
}

/// Write a collection length in the integer encoding `p`.
fn write_length(p: Primitive, len: usize, out: &mut dyn Write) -> Result<(), CodecError> {
    let too_long = || CodecError::InvalidLength(format!("{len} does not fit {}", p.name()));
    let value = match p {
        Primitive::I8 => Value::I8(i8::try_from(len).map_err(|_| too_long())?),
        Primitive::U8 => Value::U8(u8::try_from(len).map_err(|_| too_long())?),
        Primitive::I16 => Value::I16(i16::try_from(len).map_err(|_| too_long())?),
        Primitive::U16 => Value::U16(u16::try_from(len).map_err(|_| too_long())?),
        Primitive::I32 => Value::I32(i32::try_from(len).map_err(|_| too_long())?),
        Primitive::U32 => Value::U32(u32::try_from(len).map_err(|_| too_long())?),
        Primitive::I64 => Value::I64(i64::try_from(len).map_err(|_| too_long())?),
        Primitive::U64 => Value::U64(u64::try_from(len).map_err(|_| too_long())?),
        Primitive::VarInt => Value::VarInt(i32::try_from(len).map_err(|_| too_long())?),
        Primitive::VarLong => Value::VarLong(i64::try_from(len).map_err(|_| too_long())?),
        Primitive::Bool | Primitive::F32 | Primitive::F64 | Primitive::String => {
            return Err(CodecError::InvalidLength(format!(
                "{} is not a length type",
                p.name()
            )));
        }
    };
    write_primitive(p, &value, out).unwrap_or_else(|| Err(too_long()))
}

/// Read a collection length; negative or unrepresentable values are rejected.
fn read_length(p: Primitive, input: &mut dyn Read) -> Result<usize, CodecError> {
    let raw: i128 = match read_primitive(p, input)? {
        Value::I8(v) => v.into(),
        Value::U8(v) => v.into(),
        Value::I16(v) => v.into(),
        Value::U16(v) => v.into(),
        Value::I32(v) | Value::VarInt(v) => v.into(),
        Value::U32(v) => v.into(),
        Value::I64(v) | Value::VarLong(v) => v.into(),
        Value::U64(v) => v.into(),
        other => {
            return Err(CodecError::InvalidLength(format!(
                "{} is not a length type",
                other.kind_name()
            )));
        }
    };
    usize::try_from(raw).map_err(|_| CodecError::InvalidLength(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = r#"
        struct Position { x: f64, y: f64, z: f64 }

        packet Login @ 0x02 {
            id: VarInt,
            name: string,
            coords: list<f32> [length = VarInt],
            pos: Position,
            props: Properties [as = json],
            token: box<Token> [as = raw],
        }

        packet Hello @ 0x00 {
            id: VarInt,
            name: string,
            coords: list<f32> [length = VarInt],
        }
    "#;

    /// Raw codec for a token written as a big-endian u32.
    struct TokenCodec;

    impl RawCodec for TokenCodec {
        fn write(&self, value: &Value, out: &mut dyn Write) -> Result<(), CodecError> {
            match value {
                Value::U32(v) => Ok(out.write_all(&v.to_be_bytes())?),
                other => Err(CodecError::TypeMismatch {
                    field: "token".into(),
                    expected: "u32".into(),
                    found: other.kind_name(),
                }),
            }
        }

        fn read(&self, input: &mut dyn Read) -> Result<Value, CodecError> {
            Ok(Value::U32(u32::from_be_bytes(wire::read_array(input)?)))
        }
    }

    fn protocol() -> Protocol {
        let mut protocol = Protocol::from_source(LOGIN).unwrap();
        protocol.register_raw("Token", TokenCodec);
        protocol
    }

    fn hello() -> Record {
        Record::new()
            .with("id", Value::VarInt(42))
            .with("name", "hi")
            .with(
                "coords",
                Value::List(vec![Value::F32(1.0), Value::F32(-2.0)]),
            )
    }

    #[test]
    fn test_encode_hello_bytes() {
        let bytes = protocol().encode_to_vec("Hello", &hello()).unwrap();
        assert_eq!(
            bytes,
            [
                0x2A, 0x02, 0x68, 0x69, 0x02, 0x3F, 0x80, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_round_trip_full_packet() {
        let protocol = protocol();
        let record = hello()
            .with(
                "pos",
                Record::new()
                    .with("x", Value::F64(1.5))
                    .with("y", Value::F64(-64.0))
                    .with("z", Value::F64(f64::MAX)),
            )
            .with("props", Value::Json(serde_json::json!({"skin": "steve", "ops": [1, 2]})))
            .with("token", Value::U32(0xDEADBEEF));

        let bytes = protocol.encode_to_vec("Login", &record).unwrap();
        let decoded = protocol.decode_slice("Login", &bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_fixed_width_big_endian() {
        let protocol = Protocol::from_source(
            "struct P { a: u32, b: u16, c: i8, d: bool, e: i64 }",
        )
        .unwrap();
        let record = Record::new()
            .with("a", Value::U32(1))
            .with("b", Value::U16(0x1234))
            .with("c", Value::I8(-1))
            .with("d", true)
            .with("e", Value::I64(-2));
        let bytes = protocol.encode_to_vec("P", &record).unwrap();
        assert_eq!(
            bytes,
            [
                0x00, 0x00, 0x00, 0x01, 0x12, 0x34, 0xFF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
                0xFF, 0xFF, 0xFE
            ]
        );
        assert_eq!(protocol.decode_slice("P", &bytes).unwrap(), record);
    }

    #[test]
    fn test_float_bits_survive() {
        let protocol = Protocol::from_source("struct F { a: f32, b: f64 }").unwrap();
        let nan = f32::from_bits(0x7FC0_1234);
        let record = Record::new()
            .with("a", Value::F32(nan))
            .with("b", Value::F64(-0.0));
        let bytes = protocol.encode_to_vec("F", &record).unwrap();
        let decoded = protocol.decode_slice("F", &bytes).unwrap();

        match (decoded.get("a"), decoded.get("b")) {
            (Some(Value::F32(a)), Some(Value::F64(b))) => {
                assert_eq!(a.to_bits(), nan.to_bits());
                assert_eq!(b.to_bits(), (-0.0f64).to_bits());
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn test_byte_lists_and_length_types() {
        let protocol = Protocol::from_source(
            r#"struct B {
                small: list<u8> [length = u8],
                words: list<u16> [length = i16],
                nested: list<Inner> [length = VarInt],
            }
            struct Inner { v: VarLong }"#,
        )
        .unwrap();
        let record = Record::new()
            .with("small", Value::Bytes(vec![1, 2, 3]))
            .with("words", Value::List(vec![Value::U16(0xABCD)]))
            .with(
                "nested",
                Value::List(vec![
                    Record::new().with("v", Value::VarLong(300)).into(),
                    Record::new().with("v", Value::VarLong(-1)).into(),
                ]),
            );
        let bytes = protocol.encode_to_vec("B", &record).unwrap();
        assert_eq!(&bytes[..7], &[0x03, 1, 2, 3, 0x00, 0x01, 0xAB]);
        assert_eq!(protocol.decode_slice("B", &bytes).unwrap(), record);

        let too_many = Record::new()
            .with("small", Value::Bytes(vec![0; 256]))
            .with("words", Value::List(vec![]))
            .with("nested", Value::List(vec![]));
        assert!(matches!(
            protocol.encode_to_vec("B", &too_many),
            Err(CodecError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_encode_errors() {
        let protocol = protocol();

        let err = protocol
            .encode_to_vec("Hello", &hello().with("id", Value::I32(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "Hello.id: expected VarInt, got i32");

        let err = protocol
            .encode_to_vec("Hello", &Record::new().with("id", Value::VarInt(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "missing field: Hello.name");

        assert!(matches!(
            protocol.encode_to_vec("Nope", &Record::new()),
            Err(CodecError::UnknownStruct(_))
        ));
    }

    #[test]
    fn test_missing_raw_codec() {
        let protocol = Protocol::from_source(LOGIN).unwrap();
        let record = hello()
            .with(
                "pos",
                Record::new()
                    .with("x", Value::F64(0.0))
                    .with("y", Value::F64(0.0))
                    .with("z", Value::F64(0.0)),
            )
            .with("props", Value::Json(serde_json::Value::Null))
            .with("token", Value::U32(1));
        assert!(matches!(
            protocol.encode_to_vec("Login", &record),
            Err(CodecError::MissingRawCodec(ref t)) if t == "Token"
        ));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let protocol = protocol();

        // Truncated list body.
        assert!(matches!(
            protocol.decode_slice("Hello", &[0x2A, 0x00, 0x02, 0x3F]),
            Err(CodecError::Io(_))
        ));

        // Negative VarInt length.
        assert!(matches!(
            protocol.decode_slice("Hello", &[0x2A, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
            Err(CodecError::InvalidLength(_))
        ));

        // Huge declared length with no data fails without a huge allocation.
        assert!(matches!(
            protocol.decode_slice("Hello", &[0x2A, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            Err(CodecError::Io(_))
        ));

        assert!(matches!(
            protocol.decode_slice("Hello", &[0x2A, 0x00, 0x00, 0x99]),
            Err(CodecError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_decode_never_panics_on_garbage() {
        let protocol = protocol();
        let mut seed = 0x2545_F491u32;
        for len in 0..64 {
            let bytes: Vec<u8> = (0..len)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 17;
                    seed ^= seed << 5;
                    seed as u8
                })
                .collect();
            for name in ["Hello", "Login", "Position"] {
                let _ = protocol.decode_slice(name, &bytes);
            }
        }
    }

    #[test]
    fn test_zero_sized_elements_are_bounded() {
        let protocol =
            Protocol::from_source("struct E {} struct L { xs: list<E> [length = VarInt] }")
                .unwrap();
        assert_eq!(
            protocol.decode_slice("L", &[0x03]).unwrap().get("xs"),
            Some(&Value::List(vec![Value::Struct(Record::new()); 3]))
        );
        assert!(matches!(
            protocol.decode_slice("L", &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            Err(CodecError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_integer_edges_round_trip() {
        let mut cases: Vec<(&str, Value, Vec<u8>)> = Vec::new();
        for v in [i8::MIN, -1, 0, 1, i8::MAX] {
            cases.push(("i8", Value::I8(v), v.to_be_bytes().to_vec()));
        }
        for v in [i16::MIN, -1, 0, 1, i16::MAX] {
            cases.push(("i16", Value::I16(v), v.to_be_bytes().to_vec()));
        }
        for v in [i32::MIN, -1, 0, 1, i32::MAX] {
            cases.push(("i32", Value::I32(v), v.to_be_bytes().to_vec()));
        }
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            cases.push(("i64", Value::I64(v), v.to_be_bytes().to_vec()));
        }
        for v in [0, 1, u8::MAX] {
            cases.push(("u8", Value::U8(v), vec![v]));
        }
        for v in [0, 1, u16::MAX] {
            cases.push(("u16", Value::U16(v), v.to_be_bytes().to_vec()));
        }
        for v in [0, 1, u32::MAX] {
            cases.push(("u32", Value::U32(v), v.to_be_bytes().to_vec()));
        }
        for v in [0, 1, u64::MAX] {
            cases.push(("u64", Value::U64(v), v.to_be_bytes().to_vec()));
        }

        for (ty, value, bytes) in cases {
            let protocol = Protocol::from_source(&format!("struct S {{ v: {ty} }}")).unwrap();
            let record = Record::new().with("v", value.clone());
            assert_eq!(
                protocol.encode_to_vec("S", &record).unwrap(),
                bytes,
                "{ty} {value:?}"
            );
            assert_eq!(protocol.decode_slice("S", &bytes).unwrap(), record);
        }

        // Most significant byte first, two's complement for signed types.
        let wide = Protocol::from_source("struct W { a: i16, b: i32, c: u64, d: i64 }").unwrap();
        let record = Record::new()
            .with("a", Value::I16(i16::MIN))
            .with("b", Value::I32(-1))
            .with("c", Value::U64(0x0102_0304_0506_0708))
            .with("d", Value::I64(i64::MAX));
        assert_eq!(
            wide.encode_to_vec("W", &record).unwrap(),
            [
                0x80, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
                0x08, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF
            ]
        );
    }

    fn nested(levels: usize) -> Record {
        let mut node = Record::new().with("children", Value::List(Vec::new()));
        for _ in 0..levels {
            node = Record::new().with("children", Value::List(vec![Value::Struct(node)]));
        }
        node
    }

    #[test]
    fn test_recursive_list_nesting_is_bounded() {
        let protocol =
            Protocol::from_source("struct Node { children: list<Node> [length = VarInt] }")
                .unwrap();

        let mut bytes = vec![0x01; 10];
        bytes.push(0x00);
        assert_eq!(protocol.encode_to_vec("Node", &nested(10)).unwrap(), bytes);
        assert_eq!(protocol.decode_slice("Node", &bytes).unwrap(), nested(10));

        assert!(matches!(
            protocol.decode_slice("Node", &vec![0x01; 1_000_000]),
            Err(CodecError::TooDeep(MAX_DEPTH))
        ));
        assert!(matches!(
            protocol.encode_to_vec("Node", &nested(MAX_DEPTH)),
            Err(CodecError::TooDeep(MAX_DEPTH))
        ));
    }

    #[test]
    fn test_introspection() {
        let protocol = protocol();
        assert_eq!(
            protocol.struct_names().collect::<Vec<_>>(),
            vec!["Hello", "Login", "Position"]
        );
        assert_eq!(protocol.packet_id("Login"), Some(2));
        assert_eq!(protocol.packet_id("Position"), None);
        assert!(protocol.contains("Position"));
        assert!(!protocol.contains("Token"));
    }
}
