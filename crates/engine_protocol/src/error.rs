use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{field}: expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("VarInt is too long")]
    VarIntTooLong,

    #[error("invalid length: {0}")]
    InvalidLength(String),

    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid bool byte {0:#04x}")]
    InvalidBool(u8),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown struct: {0}")]
    UnknownStruct(String),

    #[error("unknown packet id {0:#04x}")]
    UnknownPacket(i32),

    #[error("no raw codec registered for '{0}'")]
    MissingRawCodec(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("{0} trailing bytes after decode")]
    TrailingBytes(usize),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}
