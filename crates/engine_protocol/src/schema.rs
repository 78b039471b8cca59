/// Resolved schema: every struct and packet from the loaded descriptor files,
/// checked for consistency before a [`Protocol`](crate::Protocol) is compiled
/// from it.
use crate::ast::*;
use crate::parser::Parser;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("parse error: {0}")]
    Parse(#[from] crate::parser::ParseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate struct: {0}")]
    DuplicateStruct(String),
    #[error("duplicate packet id {id:#04x}: {first} and {second}")]
    DuplicatePacketId {
        id: i32,
        first: String,
        second: String,
    },
    #[error("{structure}.{field}: unknown type '{name}'")]
    UnknownType {
        structure: String,
        field: String,
        name: String,
    },
    #[error("{structure}.{field}: {reason}")]
    InvalidField {
        structure: String,
        field: String,
        reason: String,
    },
    #[error("struct '{0}' contains itself")]
    RecursiveStruct(String),
}

/// All struct definitions, packets included, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub structs: HashMap<String, StructDef>,
    /// Packet id -> struct name.
    pub packets: HashMap<i32, String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `.proto` file and merge its definitions into this schema.
    pub fn load_file(&mut self, path: &Path) -> Result<(), SchemaError> {
        let source = std::fs::read_to_string(path)?;
        self.load_source(&source)?;
        debug!(path = %path.display(), "loaded descriptor file");
        Ok(())
    }

    /// Parse a source string and merge its definitions.
    ///
    /// Nothing is merged when any definition clashes with one already
    /// loaded (or with another in the same source).
    pub fn load_source(&mut self, source: &str) -> Result<(), SchemaError> {
        let file = Parser::parse(source)?;

        let mut names = HashSet::new();
        let mut ids = HashMap::new();
        for def in &file.items {
            if self.structs.contains_key(&def.name) || !names.insert(def.name.as_str()) {
                return Err(SchemaError::DuplicateStruct(def.name.clone()));
            }
            if let Some(id) = def.packet_id {
                let first = self
                    .packets
                    .get(&id)
                    .map(String::as_str)
                    .or_else(|| ids.get(&id).copied());
                if let Some(first) = first {
                    return Err(SchemaError::DuplicatePacketId {
                        id,
                        first: first.to_string(),
                        second: def.name.clone(),
                    });
                }
                ids.insert(id, def.name.as_str());
            }
        }

        for def in file.items {
            if let Some(id) = def.packet_id {
                self.packets.insert(id, def.name.clone());
            }
            self.structs.insert(def.name.clone(), def);
        }
        Ok(())
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    /// All struct names, sorted.
    pub fn struct_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.structs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check every field's type and tags, then reject structs that would
    /// contain themselves inline.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for name in self.struct_names() {
            let def = &self.structs[name];
            for field in &def.fields {
                self.validate_field(def, field)?;
            }
        }

        let mut done = HashSet::new();
        for name in self.struct_names() {
            self.check_cycles(name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    fn validate_field(&self, def: &StructDef, field: &FieldDef) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidField {
            structure: def.name.clone(),
            field: field.name.clone(),
            reason,
        };

        // Encoded fields are opaque to the walker.
        if field.tags.encoding.is_some() {
            if field.tags.length.is_some() {
                return Err(invalid("'length' cannot be combined with 'as'".into()));
            }
            return Ok(());
        }

        if let Some(length) = &field.tags.length {
            match length {
                TypeExpr::Primitive(p) if p.is_integer() => {}
                other => {
                    return Err(invalid(format!(
                        "length must be an integer type, got {other}"
                    )));
                }
            }
            if !matches!(field.ty, TypeExpr::List(_)) {
                return Err(invalid("'length' only applies to lists".into()));
            }
        }

        self.validate_type(def, field, &field.ty, field.tags.length.is_some())
    }

    fn validate_type(
        &self,
        def: &StructDef,
        field: &FieldDef,
        ty: &TypeExpr,
        has_length: bool,
    ) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidField {
            structure: def.name.clone(),
            field: field.name.clone(),
            reason,
        };

        match ty {
            TypeExpr::Primitive(_) => Ok(()),
            TypeExpr::Named(name) => {
                if self.structs.contains_key(name) {
                    Ok(())
                } else {
                    Err(SchemaError::UnknownType {
                        structure: def.name.clone(),
                        field: field.name.clone(),
                        name: name.clone(),
                    })
                }
            }
            TypeExpr::List(inner) => {
                if !has_length {
                    return Err(invalid(format!("{ty} needs a 'length' or 'as' tag")));
                }
                self.validate_type(def, field, inner, false)
            }
            TypeExpr::Boxed(_) => Err(invalid(format!("{ty} needs an 'as' tag"))),
        }
    }

    /// Depth-first walk over inline struct fields. Lists may be empty and
    /// tagged fields are opaque, so only bare named fields count.
    fn check_cycles<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), SchemaError> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(SchemaError::RecursiveStruct(name.to_string()));
        }
        let Some(def) = self.structs.get(name) else {
            return Ok(());
        };

        path.push(name);
        for field in &def.fields {
            if field.tags.encoding.is_none()
                && let TypeExpr::Named(child) = &field.ty
            {
                self.check_cycles(child, path, done)?;
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }

    /// Serialize the schema to a JSON description for tooling.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "structs": self.struct_names().into_iter().map(|name| {
                let def = &self.structs[name];
                serde_json::json!({
                    "name": def.name,
                    "packet_id": def.packet_id,
                    "fields": def.fields.iter().map(|f| {
                        serde_json::json!({
                            "name": f.name,
                            "type": f.ty.to_string(),
                            "tags": f.tags,
                        })
                    }).collect::<Vec<_>>(),
                })
            }).collect::<Vec<_>>(),
        })
    }
}
