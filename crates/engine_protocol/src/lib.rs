//! # engine_protocol
//!
//! Packet descriptors and the wire codec they drive.
//!
//! Descriptor files declare structs and packets:
//!
//! ```text
//! struct Position { x: f64, y: f64, z: f64 }
//!
//! packet Login @ 0x02 {
//!     id: VarInt,
//!     name: string,
//!     coords: list<f32> [length = VarInt],
//!     pos: Position,
//!     props: Properties [as = json],
//!     token: box<Token> [as = raw],
//! }
//! ```
//!
//! A [`Schema`] collects and validates them, [`Protocol::compile`] turns the
//! schema into field plans, and the protocol then encodes and decodes
//! [`Record`]s, framed or bare. All integers are big-endian; strings and
//! frame lengths use VarInt prefixes.
//!
//! ```rust
//! use engine_protocol::{Protocol, Record, Value};
//!
//! let protocol = Protocol::from_source(
//!     "packet Hello @ 0 { id: VarInt, name: string, coords: list<f32> [length = VarInt] }",
//! )
//! .unwrap();
//! let hello = Record::new()
//!     .with("id", Value::VarInt(42))
//!     .with("name", "hi")
//!     .with("coords", Value::List(vec![Value::F32(1.0), Value::F32(-2.0)]));
//! let bytes = protocol.encode_to_vec("Hello", &hello).unwrap();
//! assert_eq!(bytes[..4], [0x2A, 0x02, b'h', b'i']);
//! ```

pub mod ast;
pub mod codec;
pub mod error;
pub mod frame;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod value;
pub mod wire;

pub use codec::{MAX_DEPTH, Protocol, RawCodec};
pub use error::CodecError;
pub use frame::MAX_PACKET_LENGTH;
pub use schema::{Schema, SchemaError};
pub use value::{Record, Value};
