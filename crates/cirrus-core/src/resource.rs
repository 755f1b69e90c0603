//! Resource kind descriptors and the `Resource` trait.
//!
//! Every REST resource kind declares a singular/plural name pair and a
//! capability table. The generic CRUD engine in `cirrus-api` consults the
//! table instead of dispatching on concrete types, so disabling an operation
//! for a kind (read-only flavors, update-less images) is a data change, not
//! a new code path.

use crate::errors::{CirrusError, Result};
use crate::inflect;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Which fields an update sends to the API.
///
/// `Only(&[])` is a valid declaration: the PUT still happens, with an empty
/// field object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatableFields {
    /// Every serialized field is sent.
    Unrestricted,
    /// Only the named fields are sent; everything else is stripped.
    Only(&'static [&'static str]),
}

impl UpdatableFields {
    pub fn permits(&self, field: &str) -> bool {
        match self {
            UpdatableFields::Unrestricted => true,
            UpdatableFields::Only(fields) => fields.contains(&field),
        }
    }
}

/// Per-kind lifecycle capability table.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub reload: bool,
    pub updatable_fields: UpdatableFields,
}

impl Capabilities {
    /// Full lifecycle, unrestricted updates.
    pub const fn full() -> Self {
        Self {
            create: true,
            update: true,
            delete: true,
            reload: true,
            updatable_fields: UpdatableFields::Unrestricted,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Descriptor for a REST resource kind: its two name forms and what the API
/// allows callers to do with it.
#[derive(Debug, Clone)]
pub struct ResourceKind {
    /// Name used for single-record envelopes.
    pub singular: &'static str,
    /// Name used for URL segments and collection envelopes.
    pub plural: String,
    pub capabilities: Capabilities,
}

impl ResourceKind {
    /// Declare a kind; the plural is derived from the singular.
    pub fn new(singular: &'static str) -> Self {
        Self {
            singular,
            plural: inflect::pluralize(singular),
            capabilities: Capabilities::full(),
        }
    }

    /// Override the derived plural for irregular names.
    pub fn with_plural(mut self, plural: &str) -> Self {
        self.plural = plural.to_string();
        self
    }

    /// Disable create, update and delete (reload stays available).
    pub fn read_only(mut self) -> Self {
        self.capabilities.create = false;
        self.capabilities.update = false;
        self.capabilities.delete = false;
        self
    }

    /// Disable update only.
    pub fn without_update(mut self) -> Self {
        self.capabilities.update = false;
        self
    }

    /// Restrict updates to an explicit field subset.
    pub fn updatable(mut self, fields: &'static [&'static str]) -> Self {
        self.capabilities.updatable_fields = UpdatableFields::Only(fields);
        self
    }
}

/// A mappable resource record.
///
/// Records serialize to flat JSON objects with unset fields omitted, so a
/// freshly built record with one field set POSTs exactly that one field.
pub trait Resource: Serialize + DeserializeOwned {
    /// Kind descriptor consulted by the CRUD engine.
    fn kind() -> ResourceKind;

    /// Server-assigned identity; `None` means the record was never persisted.
    fn id(&self) -> Option<u64>;

    fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Serialize the record to its field map (unset fields absent).
    fn to_fields(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(CirrusError::ParseError(format!(
                "resource serialized to {} instead of an object",
                other
            ))),
        }
    }

    /// Overwrite declared fields from a decoded JSON object.
    ///
    /// Incoming keys are merged over the current field map, so fields the
    /// response does not mention keep their values; keys that match no
    /// declared field are ignored.
    fn absorb(&mut self, incoming: &Map<String, Value>) -> Result<()> {
        let mut fields = self.to_fields()?;
        for (key, value) in incoming {
            fields.insert(key.clone(), value.clone());
        }
        *self = serde_json::from_value(Value::Object(fields))?;
        Ok(())
    }
}
