use std::any::Any;

use crate::error::{Result, WbxmlError};
use crate::record::{Record, Slot};
use crate::schema::{FieldKind, FieldSpec, StreamVtable};
use crate::token;

/// Token-driven decoder over a complete document payload. End of the slice
/// is the end-of-stream condition.
pub struct Decoder<'a> {
    data: &'a [u8],
    position: usize,
    active_page: u16,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            active_page: 0,
        }
    }

    fn bytes_left(&self) -> usize {
        self.data.len() - self.position
    }

    fn check_eos(&self, len: usize) -> Result<()> {
        if self.bytes_left() >= len {
            Ok(())
        } else {
            Err(WbxmlError::UnexpectedEof)
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.check_eos(1)?;
        let value = self.data[self.position];
        self.position += 1;
        Ok(value)
    }

    /// Like `read_u8`, but end of input is an expected condition.
    fn try_read_u8(&mut self) -> Option<u8> {
        if self.bytes_left() == 0 {
            return None;
        }
        let value = self.data[self.position];
        self.position += 1;
        Some(value)
    }

    /// Multi-byte integer: continuation bytes carry the high bit.
    fn read_mb_u32(&mut self) -> Result<u32> {
        let mut value = 0u32;
        loop {
            let byte = self.read_u8()?;
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }

    /// Consumes the prologue. The version byte and the three header
    /// integers are accepted in any form and discarded.
    fn read_header(&mut self) -> Result<()> {
        let version = self.read_u8()?;
        let public_id = self.read_mb_u32()?;
        let charset = self.read_mb_u32()?;
        let table_len = self.read_mb_u32()?;
        log::trace!(
            "wbxml header: version {version:#04x}, public id {public_id}, charset {charset}, string table {table_len} bytes"
        );
        Ok(())
    }

    pub(crate) fn read_document<R: Record>(&mut self) -> Result<R> {
        self.read_header()?;
        self.read_record::<R>()
    }

    /// The parse loop for one record frame. Known tags dispatch to their
    /// field reader, unknown tags are skipped as balanced subtrees, and
    /// `END` (or end of input between fields) constructs the record.
    pub(crate) fn read_record<R: Record>(&mut self) -> Result<R> {
        let schema = R::schema()?;
        let mut slots: Vec<Slot> = std::iter::repeat_with(|| Slot::Empty)
            .take(schema.fields().len())
            .collect();

        loop {
            let Some(byte) = self.try_read_u8() else { break };
            match byte {
                token::SWITCH_PAGE => {
                    let page = self.read_u8()?;
                    self.active_page = (page as u16) << token::PAGE_SHIFT;
                }
                token::END => break,
                token::STR_I => return Err(WbxmlError::MalformedToken(byte)),
                opener => {
                    let has_content = opener & token::CONTENT_MASK != 0;
                    let tag = (opener & token::PAGE_MASK) as u16 | self.active_page;
                    match schema.field_by_tag(tag) {
                        Some(spec) => self.read_field(spec, has_content, &mut slots)?,
                        None if has_content => {
                            log::trace!(
                                "skipping unknown tag {tag:#06x} while decoding {}",
                                schema.type_name()
                            );
                            self.skip_element()?;
                        }
                        // Empty-form unknown element: nothing to consume.
                        None => {}
                    }
                }
            }
        }
        R::from_slots(slots)
    }

    fn read_field(&mut self, spec: &FieldSpec, has_content: bool, slots: &mut [Slot]) -> Result<()> {
        match spec.kind {
            FieldKind::String => {
                let text = if has_content {
                    self.read_text()?
                } else {
                    String::new()
                };
                slots[spec.index] = Slot::Str(text);
            }
            FieldKind::Integer => {
                let value = if has_content { self.read_int()? } else { 0 };
                slots[spec.index] = Slot::Int(value);
            }
            FieldKind::Boolean => {
                // Presence means true. A well-formed producer emits booleans
                // in empty form; consume any content to stay token-aligned.
                if has_content {
                    self.skip_element()?;
                }
                slots[spec.index] = Slot::Bool(true);
            }
            FieldKind::Nested(vt) => {
                if has_content {
                    slots[spec.index] = Slot::Record((vt.parse)(self)?);
                }
            }
            FieldKind::Stream(vt) => {
                if has_content
                    && let Some(value) = self.read_stream_body(vt)?
                {
                    slots[spec.index] = Slot::Record(value);
                }
            }
            FieldKind::StringList => {
                if !matches!(slots[spec.index], Slot::StrList(_)) {
                    slots[spec.index] = Slot::StrList(Vec::new());
                }
                if has_content {
                    let text = self.read_text()?;
                    if let Slot::StrList(items) = &mut slots[spec.index] {
                        items.push(text);
                    }
                }
            }
            FieldKind::IntegerList => {
                if !matches!(slots[spec.index], Slot::IntList(_)) {
                    slots[spec.index] = Slot::IntList(Vec::new());
                }
                if has_content {
                    let value = self.read_int()?;
                    if let Slot::IntList(items) = &mut slots[spec.index] {
                        items.push(value);
                    }
                }
            }
            FieldKind::NestedList(vt) => {
                if !matches!(slots[spec.index], Slot::RecordList(_)) {
                    slots[spec.index] = Slot::RecordList(Vec::new());
                }
                if has_content {
                    let value = (vt.parse)(self)?;
                    if let Slot::RecordList(items) = &mut slots[spec.index] {
                        items.push(value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Reads the text body of a content-form element, including its closing
    /// `END`. A lone `END` in place of the inline string closes the element
    /// with an empty value.
    fn read_text(&mut self) -> Result<String> {
        match self.read_u8()? {
            token::STR_I => {
                let body = self.read_until_term()?;
                let text = std::str::from_utf8(body)?.to_owned();
                self.expect_end()?;
                Ok(text)
            }
            token::END => Ok(String::new()),
            other => Err(WbxmlError::MalformedToken(other)),
        }
    }

    fn read_int(&mut self) -> Result<i32> {
        let text = self.read_text()?;
        text.parse()
            .map_err(|_| WbxmlError::ContentFormat(text))
    }

    fn read_stream_body(&mut self, vt: StreamVtable) -> Result<Option<Box<dyn Any + Send>>> {
        match self.read_u8()? {
            token::STR_I => {
                // The subslice up to the terminator is the bounded source:
                // it yields EOF after the payload's last byte.
                let body = self.read_until_term()?;
                let mut src: &[u8] = body;
                let value = (vt.read)(&mut src)?;
                self.expect_end()?;
                Ok(Some(value))
            }
            token::END => Ok(None),
            other => Err(WbxmlError::MalformedToken(other)),
        }
    }

    /// Returns the inline-string body and consumes its terminator.
    fn read_until_term(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.position..];
        let term = rest
            .iter()
            .position(|&b| b == token::STR_TERM)
            .ok_or(WbxmlError::UnexpectedEof)?;
        self.position += term + 1;
        Ok(&rest[..term])
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.read_u8()? {
            token::END => Ok(()),
            other => Err(WbxmlError::MalformedToken(other)),
        }
    }

    /// Discards a balanced element whose content-form opener has already
    /// been read. End of input here is a hard error.
    fn skip_element(&mut self) -> Result<()> {
        loop {
            match self.read_u8()? {
                token::SWITCH_PAGE => {
                    let page = self.read_u8()?;
                    self.active_page = (page as u16) << token::PAGE_SHIFT;
                }
                token::END => return Ok(()),
                token::STR_I => {
                    self.read_until_term()?;
                }
                opener if opener & token::CONTENT_MASK != 0 => self.skip_element()?,
                _ => {}
            }
        }
    }
}

#[doc(hidden)]
pub fn parse_nested<R: Record>(decoder: &mut Decoder<'_>) -> Result<Box<dyn Any + Send>> {
    let record = decoder.read_record::<R>()?;
    Ok(Box::new(record))
}
