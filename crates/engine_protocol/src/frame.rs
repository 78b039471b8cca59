//! Packet framing: `VarInt(length) ‖ VarInt(packet id) ‖ body`, where the
//! length counts the id and body bytes.

use std::io::{Read, Write};

use tracing::trace;

use crate::codec::Protocol;
use crate::error::CodecError;
use crate::value::Record;
use crate::wire;

/// Largest frame accepted by [`Protocol::read_packet`]: the biggest value a
/// three-byte VarInt can hold.
pub const MAX_PACKET_LENGTH: usize = (1 << 21) - 1;

impl Protocol {
    /// Frame and write packet `name`.
    pub fn write_packet<W: Write>(
        &self,
        name: &str,
        record: &Record,
        out: &mut W,
    ) -> Result<(), CodecError> {
        let index = self.index_of(name)?;
        let id = self.structs[index]
            .packet_id
            .ok_or_else(|| CodecError::UnknownStruct(format!("{name} is not a packet")))?;

        let mut body = Vec::new();
        wire::write_varint(&mut body, id)?;
        self.write_record(index, record, &mut body)?;

        let len = i32::try_from(body.len())
            .ok()
            .filter(|&len| len as usize <= MAX_PACKET_LENGTH)
            .ok_or_else(|| CodecError::InvalidLength(format!("packet of {} bytes", body.len())))?;
        wire::write_varint(out, len)?;
        out.write_all(&body)?;
        trace!(packet = name, id, len, "wrote packet");
        Ok(())
    }

    /// Read one framed packet, returning its struct name and body.
    ///
    /// The whole frame must be consumed by the body; leftover bytes are an
    /// error and the stream stays positioned after the frame either way.
    pub fn read_packet<R: Read>(&self, input: &mut R) -> Result<(&str, Record), CodecError> {
        let len = wire::read_varint(input)?;
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= MAX_PACKET_LENGTH)
            .ok_or_else(|| CodecError::InvalidLength(format!("packet length {len}")))?;

        let frame = wire::read_bytes(input, len)?;
        let mut body = frame.as_slice();
        let id = wire::read_varint(&mut body)?;
        let index = *self.packets.get(&id).ok_or(CodecError::UnknownPacket(id))?;
        let record = self.read_record(index, &mut body)?;
        if !body.is_empty() {
            return Err(CodecError::TrailingBytes(body.len()));
        }

        let name = self.structs[index].name.as_str();
        trace!(packet = name, id, len, "read packet");
        Ok((name, record))
    }
}
