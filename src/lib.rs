//! A codec between schema-annotated record types and the Exchange
//! ActiveSync subset of WBXML 1.3.
//!
//! Annotate a struct's fields with composite `(page << 6) | id` tags and
//! derive [`Record`]; [`marshal`] and [`unmarshal`] then map values to and
//! from the tokenized wire form.
//!
//! ```ignore
//! use wbxml::Record;
//!
//! #[derive(Debug, PartialEq, Record)]
//! struct Note {
//!     #[wbxml(tag = 0x45)]
//!     subject: String,
//!     #[wbxml(tag = 0x46)]
//!     read: bool,
//! }
//!
//! let payload = wbxml::marshal(&Note { subject: "hi".into(), read: true })?;
//! let note: Note = wbxml::unmarshal(&payload)?;
//! ```

pub mod decoder;
mod encoder;
pub mod error;
pub mod marshal;
pub mod record;
pub mod schema;
pub mod stream;
pub mod token;

pub use error::{Result, WbxmlError};
pub use marshal::{marshal, marshal_to, unmarshal, unmarshal_reader};
pub use record::{EncodeRecord, FieldRef, Record, Slot};
pub use schema::Schema;
pub use stream::Streamable;

pub use wbxml_derive::Record;
