use crate::errors::Result;
use crate::mapper::Mapper;
use crate::session::SessionManager;
use cirrus_core::{Flavor, Image, Server};

/// Main SDK struct for Cirrus
pub struct Cirrus {
    session: SessionManager,
}

impl Cirrus {
    /// Connect to the default provider endpoints and validate credentials
    /// against the published API versions.
    pub async fn connect(user: &str, key: &str, version: Option<&str>) -> Result<Self> {
        let session = SessionManager::new();
        session.initialize(user, key, version).await?;
        Ok(Self { session })
    }

    /// Connect against explicit identity endpoints.
    pub async fn connect_to(
        auth_url: &str,
        version_url: &str,
        user: &str,
        key: &str,
        version: Option<&str>,
    ) -> Result<Self> {
        let session = SessionManager::with_endpoints(auth_url, version_url);
        session.initialize(user, key, version).await?;
        Ok(Self { session })
    }

    /// Mapper over compute instances.
    pub fn servers(&self) -> Mapper<'_, Server> {
        Mapper::new(&self.session)
    }

    /// Mapper over machine images.
    pub fn images(&self) -> Mapper<'_, Image> {
        Mapper::new(&self.session)
    }

    /// Mapper over hardware flavors (read-only).
    pub fn flavors(&self) -> Mapper<'_, Flavor> {
        Mapper::new(&self.session)
    }

    /// The underlying session manager, for raw authenticated calls.
    pub fn session_manager(&self) -> &SessionManager {
        &self.session
    }

    /// List all servers.
    pub async fn list_servers(&self) -> Result<Option<Vec<Server>>> {
        self.servers().all().await
    }

    /// Get one server by id.
    pub async fn get_server(&self, id: u64) -> Result<Option<Server>> {
        self.servers().get(id).await
    }

    /// Boot a new server from a locally built record.
    pub async fn boot_server(&self, server: Server) -> Result<Server> {
        self.servers().create(server).await
    }

    /// Delete a server.
    pub async fn delete_server(&self, server: &Server) -> Result<bool> {
        self.servers().destroy(server).await
    }
}
