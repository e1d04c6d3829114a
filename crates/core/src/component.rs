//! Lifecycle handle for components defined in the runtime.
//!
//! A handle is created by defining the component and stays valid until
//! [`ComponentHandle::delete`] is awaited. Deleting twice is a no-op and no
//! call is accepted after deletion. A handle dropped while still valid
//! schedules the deletion on the current tokio runtime so abnormal exits
//! (early returns, panics unwinding through the owner) still release it.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RuntimeError;
use crate::runtime::{Runtime, ValueStream};

pub struct ComponentHandle {
    id: String,
    component_type: String,
    runtime: Arc<dyn Runtime>,
    valid: bool,
}

impl ComponentHandle {
    /// Define a new component with a freshly generated id.
    pub async fn define(
        runtime: Arc<dyn Runtime>,
        component_type: &str,
        attrs: serde_json::Value,
    ) -> Result<Self, RuntimeError> {
        let id = Uuid::new_v4().to_string();
        runtime.define(component_type, &id, attrs).await?;
        info!(component_id = %id, component_type, "Component defined");
        Ok(Self {
            id,
            component_type: component_type.to_string(),
            runtime,
            valid: true,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    fn ensure_valid(&self) -> Result<(), RuntimeError> {
        if self.valid {
            Ok(())
        } else {
            Err(RuntimeError::ComponentInvalid(self.id.clone()))
        }
    }

    pub async fn call_method(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RuntimeError> {
        self.ensure_valid()?;
        self.runtime.call_method(&self.id, method, args).await
    }

    pub async fn call_iter_method(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<ValueStream, RuntimeError> {
        self.ensure_valid()?;
        self.runtime.call_iter_method(&self.id, method, args).await
    }

    /// Delete the component from the runtime. Idempotent.
    pub async fn delete(&mut self) -> Result<(), RuntimeError> {
        if !self.valid {
            return Ok(());
        }
        // Invalidate first: a failed delete still leaves the handle unusable.
        self.valid = false;
        self.runtime.delete(&self.id).await?;
        info!(component_id = %self.id, "Component deleted");
        Ok(())
    }
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("id", &self.id)
            .field("component_type", &self.component_type)
            .field("valid", &self.valid)
            .finish()
    }
}

impl Drop for ComponentHandle {
    fn drop(&mut self) {
        if !self.valid {
            return;
        }
        self.valid = false;
        warn!(component_id = %self.id, "Component dropped without delete, scheduling cleanup");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let runtime = Arc::clone(&self.runtime);
                let id = std::mem::take(&mut self.id);
                handle.spawn(async move {
                    if let Err(e) = runtime.delete(&id).await {
                        warn!(component_id = %id, error = %e, "Deferred component delete failed");
                    } else {
                        debug!(component_id = %id, "Deferred component delete finished");
                    }
                });
            }
            Err(_) => {
                warn!(component_id = %self.id, "No async runtime available, component leaked");
            }
        }
    }
}
