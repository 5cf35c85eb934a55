//! Streamable element payloads.
//!
//! A streamable field's wire form is an inline string whose bytes are
//! produced and consumed by the value itself rather than buffered into a
//! scalar. On decode the value reads from a source bounded at the string
//! terminator; on encode it writes straight into the sink.

use std::any::Any;
use std::io::{Read, Write};

use crate::error::Result;

pub trait Streamable: Send + 'static {
    /// Read the value's content from a source that ends at the inline
    /// string's terminator.
    fn read_from(src: &mut dyn Read) -> std::io::Result<Self>
    where
        Self: Sized;

    /// Write the value's content. The payload must not contain a 0x00 byte;
    /// one would terminate the inline string early on decode.
    fn write_to(&self, dst: &mut dyn Write) -> std::io::Result<()>;
}

impl Streamable for Vec<u8> {
    fn read_from(src: &mut dyn Read) -> std::io::Result<Self> {
        let mut buf = Vec::new();
        src.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn write_to(&self, dst: &mut dyn Write) -> std::io::Result<()> {
        dst.write_all(self)
    }
}

impl Streamable for String {
    fn read_from(src: &mut dyn Read) -> std::io::Result<Self> {
        let mut buf = String::new();
        src.read_to_string(&mut buf)?;
        Ok(buf)
    }

    fn write_to(&self, dst: &mut dyn Write) -> std::io::Result<()> {
        dst.write_all(self.as_bytes())
    }
}

#[doc(hidden)]
pub fn read_stream<S: Streamable + Sized>(src: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
    let value = S::read_from(src)?;
    Ok(Box::new(value))
}
