//! Domain records for the Cloud Servers API.
//!
//! Wire names are camelCase per the provider's JSON envelopes. Every field
//! is optional: a record built locally carries only what the caller set, and
//! unset fields stay out of the serialized body.

use crate::resource::{Resource, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A compute instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Server {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Public/private address map, kept loosely typed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// File-injection payload accepted on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<Value>,
    /// Root password, assigned by the API on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
}

impl Resource for Server {
    fn kind() -> ResourceKind {
        // Only the name and root password may change after boot.
        ResourceKind::new("server").updatable(&["name", "adminPass"])
    }

    fn id(&self) -> Option<u64> {
        self.id
    }
}

/// A machine image; create (snapshot) and delete work, update does not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source server for snapshot images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
}

impl Resource for Image {
    fn kind() -> ResourceKind {
        ResourceKind::new("image").without_update()
    }

    fn id(&self) -> Option<u64> {
        self.id
    }
}

/// A hardware configuration; provider-defined, read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Flavor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u32>,
}

impl Resource for Flavor {
    fn kind() -> ResourceKind {
        ResourceKind::new("flavor").read_only()
    }

    fn id(&self) -> Option<u64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Server::kind().singular, "server");
        assert_eq!(Server::kind().plural, "servers");
        assert_eq!(Image::kind().plural, "images");
        assert_eq!(Flavor::kind().plural, "flavors");
    }

    #[test]
    fn test_server_wire_names_are_camel_case() {
        let server = Server {
            image_id: Some(2),
            flavor_id: Some(1),
            admin_pass: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&server).unwrap();
        assert_eq!(json["imageId"], 2);
        assert_eq!(json["flavorId"], 1);
        assert_eq!(json["adminPass"], "secret");
    }

    #[test]
    fn test_deserialize_ignores_unknown_keys() {
        let server: Server = serde_json::from_value(serde_json::json!({
            "id": 1234,
            "name": "sample-server",
            "hostId": "e4d909c290d0fb1ca068ffaddf22cbd0",
            "sharedIpGroupId": 42,
        }))
        .unwrap();
        assert_eq!(server.id, Some(1234));
        assert_eq!(server.host_id.as_deref(), Some("e4d909c290d0fb1ca068ffaddf22cbd0"));
    }

    #[test]
    fn test_image_timestamps_parse() {
        let image: Image = serde_json::from_value(serde_json::json!({
            "id": 2,
            "name": "CentOS 5.2",
            "created": "2010-10-10T12:00:00Z",
            "updated": "2010-10-10T12:00:00Z",
            "status": "ACTIVE",
        }))
        .unwrap();
        assert!(image.created.is_some());
        assert_eq!(image.status.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_flavor_is_read_only() {
        let caps = Flavor::kind().capabilities;
        assert!(!caps.create && !caps.update && !caps.delete);
        assert!(caps.reload);
    }
}
