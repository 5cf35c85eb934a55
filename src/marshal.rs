use std::io::{Read, Write};

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::record::Record;

const DEFAULT_MARSHAL_CAPACITY: usize = 256;

/// Serializes `record` into `writer` and flushes it.
pub fn marshal_to<R: Record>(record: &R, writer: &mut impl Write) -> Result<()> {
    let mut encoder = Encoder::new(writer)?;
    encoder.write_record(record)?;
    encoder.flush()
}

/// Serializes `record` into a fresh payload.
pub fn marshal<R: Record>(record: &R) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(DEFAULT_MARSHAL_CAPACITY);
    marshal_to(record, &mut payload)?;
    Ok(payload)
}

/// Decodes a complete document payload into a fresh `R`.
pub fn unmarshal<R: Record>(data: &[u8]) -> Result<R> {
    let mut decoder = Decoder::new(data);
    decoder.read_document()
}

/// Drains `reader` and decodes the result. The reader is taken by value so
/// the source is dropped (closed) on every exit path.
pub fn unmarshal_reader<R: Record>(mut reader: impl Read) -> Result<R> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    unmarshal(&data)
}
