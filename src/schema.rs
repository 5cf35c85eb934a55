//! Per-type schema tables and the process-wide schema cache.
//!
//! A record type's annotated fields become a [`Schema`]: an ordered list of
//! [`FieldSpec`] entries the encoder walks in index order and the decoder
//! dispatches on by composite tag. Schemas are validated once per type,
//! leaked to `'static`, and kept for the life of the process.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::io::Read;
use std::sync::{LazyLock, RwLock};

use crate::decoder::Decoder;
use crate::error::{Result, WbxmlError};
use crate::record::Record;
use crate::token;

/// One annotated field, as emitted by the derive before validation.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Composite `(page << 6) | id` tag.
    pub tag: u16,
    /// Position in the record's canonical ordering.
    pub index: usize,
    pub name: &'static str,
    pub kind: FieldKind,
}

/// The wire kind of a field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Nested(NestedVtable),
    Stream(StreamVtable),
    StringList,
    IntegerList,
    NestedList(NestedVtable),
}

/// Monomorphized parse hook for a nested record type.
#[derive(Debug, Clone, Copy)]
pub struct NestedVtable {
    pub parse: fn(&mut Decoder<'_>) -> Result<Box<dyn Any + Send>>,
}

/// Monomorphized read hook for a streamable type.
#[derive(Debug, Clone, Copy)]
pub struct StreamVtable {
    pub read: fn(&mut dyn Read) -> Result<Box<dyn Any + Send>>,
}

/// Validated schema for one record type, fields sorted by index.
#[derive(Debug)]
pub struct Schema {
    type_name: &'static str,
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Entries in emission (index) order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_by_tag(&self, tag: u16) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.tag == tag)
    }

    fn derive(type_name: &'static str, specs: &[FieldSpec]) -> Result<Schema> {
        let err = |reason: String| WbxmlError::Schema { type_name, reason };

        let count = specs.len();
        let mut seen = vec![false; count];
        for spec in specs {
            if !token::is_valid_tag(spec.tag) {
                return Err(err(format!(
                    "field `{}` has tag {:#06x} outside the valid (page, id) range",
                    spec.name, spec.tag
                )));
            }
            if spec.index >= count {
                return Err(err(format!(
                    "field `{}` has index {} but the record has {} fields",
                    spec.name, spec.index, count
                )));
            }
            if seen[spec.index] {
                return Err(err(format!(
                    "field `{}` reuses index {}",
                    spec.name, spec.index
                )));
            }
            seen[spec.index] = true;
            if specs
                .iter()
                .any(|other| other.index != spec.index && other.tag == spec.tag)
            {
                return Err(err(format!(
                    "field `{}` shares tag {:#06x} with another field",
                    spec.name, spec.tag
                )));
            }
        }

        let mut fields = specs.to_vec();
        fields.sort_by_key(|spec| spec.index);
        Ok(Schema { type_name, fields })
    }
}

static SCHEMAS: LazyLock<RwLock<HashMap<TypeId, &'static Schema>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Look up (or derive and cache) the schema for `R`.
///
/// Double-checked under the write lock so a type is derived at most once;
/// successful schemas are leaked and never evicted.
pub fn resolve<R: Record>(specs: &'static [FieldSpec]) -> Result<&'static Schema> {
    let key = TypeId::of::<R>();
    if let Some(schema) = SCHEMAS.read().expect("schema cache poisoned").get(&key) {
        return Ok(*schema);
    }

    let mut cache = SCHEMAS.write().expect("schema cache poisoned");
    if let Some(schema) = cache.get(&key) {
        return Ok(*schema);
    }
    let schema = Schema::derive(type_name::<R>(), specs)?;
    let schema: &'static Schema = Box::leak(Box::new(schema));
    cache.insert(key, schema);
    Ok(schema)
}
