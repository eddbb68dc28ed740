use serde::{Deserialize, Serialize};

/// Catalog entry describing a known route. Read-only for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEndpoint {
    pub category: String,
    pub endpoint: String,
    pub definition: EndpointDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub method: String,
    pub path: String,
}

impl RegistryEndpoint {
    pub fn new(category: &str, endpoint: &str, method: &str, path: &str) -> Self {
        Self {
            category: category.to_string(),
            endpoint: endpoint.to_string(),
            definition: EndpointDefinition {
                method: method.to_string(),
                path: path.to_string(),
            },
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.category, self.endpoint)
    }
}
