//! The [`Record`] trait implemented by `#[derive(Record)]`, plus the views
//! the engines exchange with generated code: [`FieldRef`] borrows a field
//! for encoding, [`Slot`] carries one decoded argument.

use std::any::Any;

use crate::error::{Result, WbxmlError};
use crate::schema::Schema;
use crate::stream::Streamable;

/// A struct that maps to and from a WBXML element body.
///
/// Implement via `#[derive(Record)]`; a manual impl amounts to a static tag
/// table plus a constructor and is equivalent to the derived one.
pub trait Record: Sized + Send + 'static {
    /// The validated schema for this type, derived on first use and cached
    /// for the life of the process.
    fn schema() -> Result<&'static Schema>;

    /// Borrow the field at `index` for encoding.
    fn field(&self, index: usize) -> FieldRef<'_>;

    /// Build an instance from decoded slots in index order.
    fn from_slots(slots: Vec<Slot>) -> Result<Self>;
}

/// Object-safe encoding view so one encoder loop can walk any nesting of
/// record types.
pub trait EncodeRecord {
    fn schema_dyn(&self) -> Result<&'static Schema>;
    fn field_dyn(&self, index: usize) -> FieldRef<'_>;
}

impl<R: Record> EncodeRecord for R {
    fn schema_dyn(&self) -> Result<&'static Schema> {
        R::schema()
    }

    fn field_dyn(&self, index: usize) -> FieldRef<'_> {
        self.field(index)
    }
}

/// Borrowed view of one field value.
pub enum FieldRef<'a> {
    /// A none/empty value; the encoder emits nothing for it.
    Absent,
    Str(&'a str),
    Int(i32),
    Bool(bool),
    Nested(&'a dyn EncodeRecord),
    Stream(&'a dyn Streamable),
    StrList(&'a [String]),
    IntList(&'a [i32]),
    NestedList(Vec<&'a dyn EncodeRecord>),
}

/// One decoded constructor argument. Scalars default when the tag was never
/// seen; lists exist only once their tag has occurred at least once.
pub enum Slot {
    Empty,
    Str(String),
    Int(i32),
    Bool(bool),
    Record(Box<dyn Any + Send>),
    StrList(Vec<String>),
    IntList(Vec<i32>),
    RecordList(Vec<Box<dyn Any + Send>>),
}

fn take(slots: &mut [Slot], index: usize) -> Result<Slot> {
    slots
        .get_mut(index)
        .map(|slot| std::mem::replace(slot, Slot::Empty))
        .ok_or(WbxmlError::SlotMismatch)
}

#[doc(hidden)]
pub fn take_string(slots: &mut [Slot], index: usize) -> Result<String> {
    match take(slots, index)? {
        Slot::Str(value) => Ok(value),
        Slot::Empty => Ok(String::new()),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_opt_string(slots: &mut [Slot], index: usize) -> Result<Option<String>> {
    match take(slots, index)? {
        Slot::Str(value) => Ok(Some(value)),
        Slot::Empty => Ok(None),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_int(slots: &mut [Slot], index: usize) -> Result<i32> {
    match take(slots, index)? {
        Slot::Int(value) => Ok(value),
        Slot::Empty => Ok(0),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_opt_int(slots: &mut [Slot], index: usize) -> Result<Option<i32>> {
    match take(slots, index)? {
        Slot::Int(value) => Ok(Some(value)),
        Slot::Empty => Ok(None),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_bool(slots: &mut [Slot], index: usize) -> Result<bool> {
    match take(slots, index)? {
        Slot::Bool(value) => Ok(value),
        Slot::Empty => Ok(false),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_nested<R: Record>(slots: &mut [Slot], index: usize) -> Result<Option<R>> {
    match take(slots, index)? {
        Slot::Record(boxed) => match boxed.downcast::<R>() {
            Ok(value) => Ok(Some(*value)),
            Err(_) => Err(WbxmlError::SlotMismatch),
        },
        Slot::Empty => Ok(None),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_stream<S: Streamable + Sized>(slots: &mut [Slot], index: usize) -> Result<Option<S>> {
    match take(slots, index)? {
        Slot::Record(boxed) => match boxed.downcast::<S>() {
            Ok(value) => Ok(Some(*value)),
            Err(_) => Err(WbxmlError::SlotMismatch),
        },
        Slot::Empty => Ok(None),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_string_list(slots: &mut [Slot], index: usize) -> Result<Vec<String>> {
    match take(slots, index)? {
        Slot::StrList(items) => Ok(items),
        Slot::Empty => Ok(Vec::new()),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_int_list(slots: &mut [Slot], index: usize) -> Result<Vec<i32>> {
    match take(slots, index)? {
        Slot::IntList(items) => Ok(items),
        Slot::Empty => Ok(Vec::new()),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[doc(hidden)]
pub fn take_nested_list<R: Record>(slots: &mut [Slot], index: usize) -> Result<Vec<R>> {
    match take(slots, index)? {
        Slot::RecordList(items) => items
            .into_iter()
            .map(|boxed| match boxed.downcast::<R>() {
                Ok(value) => Ok(*value),
                Err(_) => Err(WbxmlError::SlotMismatch),
            })
            .collect(),
        Slot::Empty => Ok(Vec::new()),
        _ => Err(WbxmlError::SlotMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_defaults_for_unseen_tags() {
        let mut slots = vec![Slot::Empty, Slot::Empty, Slot::Empty];
        assert_eq!(take_string(&mut slots, 0).unwrap(), "");
        assert_eq!(take_int(&mut slots, 1).unwrap(), 0);
        assert!(!take_bool(&mut slots, 2).unwrap());
    }

    #[test]
    fn test_list_defaults_for_unseen_tags() {
        let mut slots = vec![Slot::Empty, Slot::Empty];
        assert!(take_string_list(&mut slots, 0).unwrap().is_empty());
        assert!(take_int_list(&mut slots, 1).unwrap().is_empty());
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        let mut slots = vec![Slot::Int(7)];
        assert!(matches!(
            take_string(&mut slots, 0),
            Err(WbxmlError::SlotMismatch)
        ));
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let mut slots = vec![Slot::Empty];
        assert!(matches!(
            take_int(&mut slots, 5),
            Err(WbxmlError::SlotMismatch)
        ));
    }
}
