//! Generic CRUD engine over a named REST resource.
//!
//! `Mapper<R>` builds resource URLs from the kind's plural name, wraps and
//! unwraps the singular/plural JSON envelopes, and consults the kind's
//! capability table before every lifecycle operation. Blank response bodies
//! on single-record GETs mean "absent", not an error.

use crate::errors::{ApiError, Result};
use crate::session::SessionManager;
use cirrus_core::{CirrusError, Resource, ResourceKind, UpdatableFields};
use log::debug;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Which records a [`Mapper::find`] call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    First,
    Last,
    Id(u64),
}

/// Result shape of a [`Mapper::find`] call.
#[derive(Debug)]
pub enum Find<R> {
    /// `Selector::All`; `None` when the API answered with a blank body.
    Many(Option<Vec<R>>),
    /// `Selector::First`/`Last`/`Id`.
    One(Option<R>),
}

/// Outcome of [`Mapper::reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    /// Fields overwritten from the API.
    Refreshed,
    /// The API answered with a blank body; the record was left untouched.
    Missing,
    /// The record is unpersisted or the kind disables reload; no call made.
    Skipped,
}

/// Generic resource mapper for one resource kind.
pub struct Mapper<'a, R: Resource> {
    session: &'a SessionManager,
    kind: ResourceKind,
    _marker: PhantomData<R>,
}

impl<'a, R: Resource> Mapper<'a, R> {
    pub fn new(session: &'a SessionManager) -> Self {
        Self {
            session,
            kind: R::kind(),
            _marker: PhantomData,
        }
    }

    /// The kind descriptor this mapper operates on.
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Collection or single-record URL under the server management root.
    ///
    /// No format suffix; the session layer appends `.json` on dispatch.
    pub async fn resource_url(&self, id: Option<u64>) -> Result<String> {
        let session = self.session.session().await?;
        let root = format!("{}/{}", session.server_management_url, self.kind.plural);
        Ok(match id {
            Some(id) => format!("{}/{}", root, id),
            None => root,
        })
    }

    /// Find records by selector. `All`/`First`/`Last` share one GET of the
    /// detail listing; an id fetches a single record.
    pub async fn find(&self, selector: Selector) -> Result<Find<R>> {
        match selector {
            Selector::All => Ok(Find::Many(self.all().await?)),
            Selector::First => Ok(Find::One(self.first().await?)),
            Selector::Last => Ok(Find::One(self.last().await?)),
            Selector::Id(id) => Ok(Find::One(self.get(id).await?)),
        }
    }

    /// All records, in server-supplied order. Blank body means absent.
    pub async fn all(&self) -> Result<Option<Vec<R>>> {
        self.detail().await
    }

    /// First record of the detail listing, from the same single GET as
    /// [`Mapper::all`].
    pub async fn first(&self) -> Result<Option<R>> {
        Ok(self.detail().await?.and_then(|records| records.into_iter().next()))
    }

    /// Last record of the detail listing.
    pub async fn last(&self) -> Result<Option<R>> {
        Ok(self.detail().await?.and_then(|records| records.into_iter().last()))
    }

    /// Fetch one record by id; a blank body means the record is absent.
    pub async fn get(&self, id: u64) -> Result<Option<R>> {
        let url = self.resource_url(Some(id)).await?;
        let body = self.session.get(&url, None).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let json: Value = serde_json::from_str(&body)?;
        let fields = singular_envelope(&json, self.kind.singular)?;
        Ok(Some(serde_json::from_value(Value::Object(fields.clone()))?))
    }

    /// Number of records, zero when the listing is absent.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.all().await?.map_or(0, |records| records.len()))
    }

    async fn detail(&self) -> Result<Option<Vec<R>>> {
        let url = format!("{}/detail", self.resource_url(None).await?);
        let body = self.session.get(&url, None).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let json: Value = serde_json::from_str(&body)?;
        let items = json
            .get(&self.kind.plural)
            .and_then(Value::as_array)
            .ok_or_else(|| missing_envelope(&self.kind.plural))?;
        let records = items
            .iter()
            .map(|item| serde_json::from_value(item.clone()))
            .collect::<std::result::Result<Vec<R>, _>>()?;
        Ok(Some(records))
    }

    /// Save the record and hand it back, persisted or not.
    pub async fn create(&self, mut record: R) -> Result<R> {
        self.save(&mut record).await?;
        Ok(record)
    }

    /// Create the record if it is new, update it otherwise. `false` means
    /// the kind's capability table refused the operation (no call made).
    pub async fn save(&self, record: &mut R) -> Result<bool> {
        if record.is_new() {
            self.create_new(record).await
        } else {
            self.update(record).await
        }
    }

    async fn create_new(&self, record: &mut R) -> Result<bool> {
        if !self.kind.capabilities.create {
            debug!("create disabled for {}", self.kind.singular);
            return Ok(false);
        }
        let payload = envelope(self.kind.singular, record.to_fields()?);
        let url = self.resource_url(None).await?;
        let body = self.session.post(&url, &payload, None).await?;
        let json: Value = serde_json::from_str(&body)?;
        // Server-assigned fields (id, admin password, host id) come back in
        // the response and are folded into the caller's record.
        let fields = singular_envelope(&json, self.kind.singular)?;
        record.absorb(fields).map_err(ApiError::Core)?;
        Ok(true)
    }

    /// Update the record, sending only the kind's updatable fields. The
    /// response body is ignored (fire-and-forget).
    pub async fn update(&self, record: &R) -> Result<bool> {
        if !self.kind.capabilities.update {
            debug!("update disabled for {}", self.kind.singular);
            return Ok(false);
        }
        let Some(id) = record.id() else {
            return Ok(false);
        };
        let mut fields = record.to_fields()?;
        let allowed = self.kind.capabilities.updatable_fields;
        if allowed != UpdatableFields::Unrestricted {
            fields.retain(|key, _| allowed.permits(key));
        }
        let payload = envelope(self.kind.singular, fields);
        let url = self.resource_url(Some(id)).await?;
        self.session.put(&url, &payload, None).await?;
        Ok(true)
    }

    /// Delete the record. Succeeds whenever the call does not error,
    /// regardless of response content.
    pub async fn destroy(&self, record: &R) -> Result<bool> {
        if !self.kind.capabilities.delete {
            debug!("delete disabled for {}", self.kind.singular);
            return Ok(false);
        }
        let Some(id) = record.id() else {
            return Ok(false);
        };
        let url = self.resource_url(Some(id)).await?;
        self.session.delete(&url, None).await?;
        Ok(true)
    }

    /// Refresh the record from the API in place.
    pub async fn reload(&self, record: &mut R) -> Result<Reload> {
        if !self.kind.capabilities.reload {
            debug!("reload disabled for {}", self.kind.singular);
            return Ok(Reload::Skipped);
        }
        let Some(id) = record.id() else {
            return Ok(Reload::Skipped);
        };
        let url = self.resource_url(Some(id)).await?;
        let body = self.session.get(&url, None).await?;
        if body.trim().is_empty() {
            return Ok(Reload::Missing);
        }
        let json: Value = serde_json::from_str(&body)?;
        let fields = singular_envelope(&json, self.kind.singular)?;
        record.absorb(fields).map_err(ApiError::Core)?;
        Ok(Reload::Refreshed)
    }
}

fn envelope(key: &str, fields: Map<String, Value>) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(key.to_string(), Value::Object(fields));
    Value::Object(wrapper)
}

fn singular_envelope<'v>(json: &'v Value, key: &str) -> Result<&'v Map<String, Value>> {
    json.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| missing_envelope(key))
}

fn missing_envelope(key: &str) -> ApiError {
    ApiError::Core(CirrusError::ParseError(format!(
        "response missing '{}' envelope",
        key
    )))
}
