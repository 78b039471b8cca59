//! Conversion between [`Value`]s and JSON, for tooling and the console.
//!
//! Building a record from JSON needs the struct plan to pick each number's
//! wire type; the reverse direction only needs the value itself.

use serde_json::{Map, Number};

use crate::codec::{Kind, Protocol};
use crate::ast::Primitive;
use crate::error::CodecError;
use crate::value::{Record, Value};

impl Value {
    /// Structural JSON form. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Bool(v) => Json::Bool(*v),
            Value::I8(v) => (*v).into(),
            Value::U8(v) => (*v).into(),
            Value::I16(v) => (*v).into(),
            Value::U16(v) => (*v).into(),
            Value::I32(v) | Value::VarInt(v) => (*v).into(),
            Value::U32(v) => (*v).into(),
            Value::I64(v) | Value::VarLong(v) => (*v).into(),
            Value::U64(v) => (*v).into(),
            Value::F32(v) => Number::from_f64(f64::from(*v)).map_or(Json::Null, Json::Number),
            Value::F64(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Value::String(v) => Json::String(v.clone()),
            Value::Bytes(v) => Json::Array(v.iter().map(|b| (*b).into()).collect()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Struct(record) => record.to_json(),
            Value::Json(json) => json.clone(),
        }
    }
}

impl Record {
    /// A JSON object with one key per field.
    pub fn to_json(&self) -> serde_json::Value {
        let map: Map<String, serde_json::Value> = self
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Protocol {
    /// Build a record for struct `name` from a JSON object, typing each
    /// field by the struct's plan. Extra keys are ignored.
    pub fn value_from_json(
        &self,
        name: &str,
        json: &serde_json::Value,
    ) -> Result<Record, CodecError> {
        let index = self.index_of(name)?;
        self.record_from_json(index, name, json)
    }

    fn record_from_json(
        &self,
        index: usize,
        path: &str,
        json: &serde_json::Value,
    ) -> Result<Record, CodecError> {
        let plan = &self.structs[index];
        let object = json.as_object().ok_or_else(|| CodecError::TypeMismatch {
            field: path.to_string(),
            expected: "object".into(),
            found: json_kind(json),
        })?;

        let mut record = Record::new();
        for field in &plan.fields {
            let field_path = format!("{path}.{}", field.name);
            let value = object
                .get(&field.name)
                .ok_or_else(|| CodecError::MissingField(field_path.clone()))?;
            record.set(
                field.name.as_str(),
                self.from_json(&field_path, &field.kind, value)?,
            );
        }
        Ok(record)
    }

    fn from_json(
        &self,
        path: &str,
        kind: &Kind,
        json: &serde_json::Value,
    ) -> Result<Value, CodecError> {
        let mismatch = || CodecError::TypeMismatch {
            field: path.to_string(),
            expected: kind.to_string(),
            found: json_kind(json),
        };

        match kind {
            Kind::Primitive(p) => primitive_from_json(*p, json).ok_or_else(mismatch),
            Kind::Struct(index) => Ok(Value::Struct(self.record_from_json(*index, path, json)?)),
            Kind::List { element, .. } => {
                let items = json.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.from_json(&format!("{path}[{i}]"), element, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            Kind::Bytes { .. } => {
                let items = json.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|b| u8::try_from(b).ok())
                            .ok_or_else(mismatch)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Bytes)
            }
            Kind::Json => Ok(Value::Json(json.clone())),
            Kind::Raw(type_name) => self
                .raw_codec(type_name)?
                .from_json(json)
                .ok_or_else(mismatch),
        }
    }
}

fn primitive_from_json(p: Primitive, json: &serde_json::Value) -> Option<Value> {
    fn int<T: TryFrom<i64>>(json: &serde_json::Value) -> Option<T> {
        json.as_i64().and_then(|v| T::try_from(v).ok())
    }

    Some(match p {
        Primitive::Bool => Value::Bool(json.as_bool()?),
        Primitive::I8 => Value::I8(int(json)?),
        Primitive::U8 => Value::U8(int(json)?),
        Primitive::I16 => Value::I16(int(json)?),
        Primitive::U16 => Value::U16(int(json)?),
        Primitive::I32 => Value::I32(int(json)?),
        Primitive::U32 => Value::U32(int(json)?),
        Primitive::I64 => Value::I64(json.as_i64()?),
        Primitive::U64 => Value::U64(json.as_u64()?),
        Primitive::F32 => Value::F32(json.as_f64()? as f32),
        Primitive::F64 => Value::F64(json.as_f64()?),
        Primitive::VarInt => Value::VarInt(int(json)?),
        Primitive::VarLong => Value::VarLong(json.as_i64()?),
        Primitive::String => Value::String(json.as_str()?.to_string()),
    })
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
