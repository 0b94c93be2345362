//! Specification lookup by service and disruption cause.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::measurement::Specification;
use crate::ResilienceError;

/// Source of declared specifications.
///
/// `Ok(None)` means no specification is declared for the pair; callers then
/// draw no overlay.
pub trait SpecificationSource {
    fn fetch(&self, service_id: &str, cause: &str)
        -> Result<Option<Specification>, ResilienceError>;
}

/// In-memory catalog, `service id -> cause -> specification`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificationCatalog {
    #[serde(default)]
    pub services: BTreeMap<String, BTreeMap<String, Specification>>,
}

impl SpecificationCatalog {
    pub fn from_json_file(path: &Path) -> Result<Self, ResilienceError> {
        let raw = fs::read_to_string(path)?;
        let catalog: SpecificationCatalog = serde_json::from_str(&raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ResilienceError> {
        self.services
            .values()
            .flat_map(BTreeMap::values)
            .try_for_each(Specification::validate)
    }

    pub fn insert(&mut self, service_id: &str, cause: &str, spec: Specification) {
        self.services
            .entry(service_id.to_string())
            .or_default()
            .insert(cause.to_string(), spec);
    }

    /// Causes declared for `service_id`.
    pub fn causes(&self, service_id: &str) -> Vec<&str> {
        self.services
            .get(service_id)
            .map(|causes| causes.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl SpecificationSource for SpecificationCatalog {
    fn fetch(
        &self,
        service_id: &str,
        cause: &str,
    ) -> Result<Option<Specification>, ResilienceError> {
        Ok(self
            .services
            .get(service_id)
            .and_then(|causes| causes.get(cause))
            .copied())
    }
}
