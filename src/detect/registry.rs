use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::config::VideoLoopConfig;

use super::backend::{DetectionCapability, DetectorBackend};

pub type SharedBackend = Arc<Mutex<dyn DetectorBackend>>;

/// Registry of detector backends.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
pub struct BackendRegistry {
    backends: HashMap<String, SharedBackend>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Built-in backends tuned by the loaded configuration.
    pub fn from_config(config: &VideoLoopConfig) -> Result<Self> {
        let mut registry = Self::new();
        #[cfg(feature = "backend-opencv")]
        registry.register(super::backends::HogBackend::new(config.hog.clone())?);
        registry.register(super::backends::MotionBackend::new(config.motion.clone())?);
        registry.register(super::backends::StubBackend::new());
        Ok(registry)
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedBackend> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedBackend> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Select a backend that supports the requested capability.
    ///
    /// Prefers the default backend when it supports the capability, then
    /// falls back to the others in name order.
    pub fn backend_for_capability(
        &self,
        capability: DetectionCapability,
    ) -> Result<SharedBackend> {
        if let Some(default_backend) = self.default_backend() {
            if supports(&default_backend, capability)? {
                return Ok(default_backend);
            }
        }

        for name in self.list() {
            if let Some(backend) = self.get(&name) {
                if supports(&backend, capability)? {
                    return Ok(backend);
                }
            }
        }

        Err(anyhow!(
            "no registered backend supports capability {:?} (registered: {})",
            capability,
            self.list().join(", ")
        ))
    }

    /// Resolve an explicitly named backend, or fall back to capability lookup.
    pub fn resolve(
        &self,
        name: Option<&str>,
        capability: DetectionCapability,
    ) -> Result<SharedBackend> {
        let Some(name) = name else {
            return self.backend_for_capability(capability);
        };
        let backend = self.get(name).ok_or_else(|| {
            anyhow!(
                "backend '{}' not registered (registered: {})",
                name,
                self.list().join(", ")
            )
        })?;
        if !supports(&backend, capability)? {
            return Err(anyhow!(
                "backend '{}' does not support capability {:?}",
                name,
                capability
            ));
        }
        Ok(backend)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn supports(backend: &SharedBackend, capability: DetectionCapability) -> Result<bool> {
    let guard = backend
        .lock()
        .map_err(|_| anyhow!("backend lock poisoned"))?;
    Ok(guard.supports(capability))
}
