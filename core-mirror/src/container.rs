//! Remote folder creation.

use bridge_traits::storage::{NewObject, RemoteObjectStore};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{MirrorError, Result};
use crate::links::PUBLIC_READER;

/// Creates remote folders and shares them publicly.
#[derive(Clone)]
pub struct RemoteContainerManager {
    store: Arc<dyn RemoteObjectStore>,
}

impl RemoteContainerManager {
    pub fn new(store: Arc<dyn RemoteObjectStore>) -> Self {
        Self { store }
    }

    /// Create a folder named `name` under `parent_id` (the store root when
    /// `None`) and attach the public reader permission.
    ///
    /// Returns the new folder's id.
    #[instrument(skip(self), fields(name = %name, parent_id = ?parent_id))]
    pub async fn create_container(&self, name: &str, parent_id: Option<&str>) -> Result<String> {
        let folder = self
            .store
            .create_container(&NewObject::container(name, parent_id))
            .await
            .map_err(MirrorError::remote("create folder"))?;

        self.store
            .create_permission(&folder.id, &PUBLIC_READER)
            .await
            .map_err(MirrorError::remote("create permission"))?;

        info!(object_id = %folder.id, "Created remote folder");
        Ok(folder.id)
    }
}
