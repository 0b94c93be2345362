//! Service dependency graph description.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ResilienceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
}

/// Directed edge; `source` depends on `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGraph {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl ServiceGraph {
    pub fn from_json_file(path: &Path) -> Result<Self, ResilienceError> {
        let raw = fs::read_to_string(path)?;
        let graph: ServiceGraph = serde_json::from_str(&raw)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Every dependency endpoint must name a known service id.
    pub fn validate(&self) -> Result<(), ResilienceError> {
        let ids: BTreeSet<&str> = self.services.iter().map(|s| s.id.as_str()).collect();
        for dependency in &self.dependencies {
            for endpoint in [&dependency.source, &dependency.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(ResilienceError::UnknownService(endpoint.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Services `id` depends on.
    pub fn dependencies_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.dependencies
            .iter()
            .filter(move |d| d.source == id)
            .map(|d| d.target.as_str())
    }
}
