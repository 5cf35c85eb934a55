use std::io::Write;

use crate::error::Result;
use crate::record::{EncodeRecord, FieldRef};
use crate::stream::Streamable;
use crate::token;

pub(crate) struct Encoder<W: Write> {
    writer: W,
    active_page: u16,
}

impl<W: Write> Encoder<W> {
    /// Creates the encoder and emits the document prologue.
    pub(crate) fn new(writer: W) -> Result<Self> {
        let mut enc = Self {
            writer,
            active_page: token::PAGE_UNSET,
        };
        enc.write_raw(&token::DOCUMENT_HEADER)?;
        Ok(enc)
    }

    fn write_u8(&mut self, val: u8) -> Result<()> {
        self.writer.write_all(&[val])?;
        Ok(())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Switches the active code page if `tag` lives on a different one and
    /// returns the in-page id.
    fn select_page(&mut self, tag: u16) -> Result<u8> {
        let page = token::page_of(tag);
        if page != self.active_page {
            self.write_u8(token::SWITCH_PAGE)?;
            self.write_u8(page as u8)?;
            self.active_page = page;
        }
        Ok(token::id_of(tag))
    }

    /// Emits every annotated field of `record` in index order. The active
    /// page carries across nested records.
    pub(crate) fn write_record(&mut self, record: &dyn EncodeRecord) -> Result<()> {
        let schema = record.schema_dyn()?;
        for spec in schema.fields() {
            self.write_field(spec.tag, record.field_dyn(spec.index))?;
        }
        Ok(())
    }

    fn write_field(&mut self, tag: u16, value: FieldRef<'_>) -> Result<()> {
        match value {
            FieldRef::Absent | FieldRef::Bool(false) => Ok(()),
            FieldRef::Str(text) => self.write_text_element(tag, text.as_bytes()),
            FieldRef::Int(n) => self.write_text_element(tag, n.to_string().as_bytes()),
            FieldRef::Bool(true) => {
                // Empty form: bare id, no content, no END.
                let id = self.select_page(tag)?;
                self.write_u8(id)
            }
            FieldRef::Nested(record) => self.write_nested_element(tag, record),
            FieldRef::Stream(value) => self.write_stream_element(tag, value),
            FieldRef::StrList(items) => {
                for item in items {
                    self.write_text_element(tag, item.as_bytes())?;
                }
                Ok(())
            }
            FieldRef::IntList(items) => {
                for item in items {
                    self.write_text_element(tag, item.to_string().as_bytes())?;
                }
                Ok(())
            }
            FieldRef::NestedList(items) => {
                for item in items {
                    self.write_nested_element(tag, item)?;
                }
                Ok(())
            }
        }
    }

    fn write_text_element(&mut self, tag: u16, body: &[u8]) -> Result<()> {
        let id = self.select_page(tag)?;
        self.write_u8(id | token::CONTENT_MASK)?;
        self.write_u8(token::STR_I)?;
        self.write_raw(body)?;
        self.write_u8(token::STR_TERM)?;
        self.write_u8(token::END)
    }

    fn write_nested_element(&mut self, tag: u16, record: &dyn EncodeRecord) -> Result<()> {
        let id = self.select_page(tag)?;
        self.write_u8(id | token::CONTENT_MASK)?;
        self.write_record(record)?;
        self.write_u8(token::END)
    }

    fn write_stream_element(&mut self, tag: u16, value: &dyn Streamable) -> Result<()> {
        let id = self.select_page(tag)?;
        self.write_u8(id | token::CONTENT_MASK)?;
        self.write_u8(token::STR_I)?;
        value.write_to(&mut self.writer)?;
        self.write_u8(token::STR_TERM)?;
        self.write_u8(token::END)
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
