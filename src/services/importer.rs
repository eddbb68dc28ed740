use crate::errors::EngineError;
use crate::models::{ContentType, HttpMethod, RegistryEndpoint, RequestDefinition};
use crate::utils::url_template::extract_placeholders;

/// Builds a fresh definition from a catalog entry.
///
/// Path params start out empty, one per `:placeholder` of the entry's path.
pub fn import_endpoint(
    endpoint: &RegistryEndpoint,
    base_url: &str,
) -> Result<RequestDefinition, EngineError> {
    let method: HttpMethod = endpoint.definition.method.parse().map_err(|err: EngineError| {
        err.with_details(serde_json::json!({
            "category": endpoint.category,
            "endpoint": endpoint.endpoint,
        }))
    })?;

    let mut definition = RequestDefinition::new();
    definition.name = endpoint.display_name();
    definition.method = method;
    definition.url = format!("{}{}", base_url, endpoint.definition.path);
    definition.path_params = extract_placeholders(&endpoint.definition.path)
        .into_iter()
        .map(|name| (name, String::new()))
        .collect();
    definition.reset_headers();
    definition.body.clear();
    definition.content_type = ContentType::Json;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_placeholders_as_empty_path_params() {
        let endpoint = RegistryEndpoint::new("Orgs", "List members", "get", "/orgs/:orgId/members");
        let definition = import_endpoint(&endpoint, "https://api.example.com").expect("import");
        assert_eq!(definition.name, "Orgs - List members");
        assert_eq!(definition.method, HttpMethod::Get);
        assert_eq!(definition.url, "https://api.example.com/orgs/:orgId/members");
        assert_eq!(definition.path_params.len(), 1);
        assert_eq!(definition.path_params.get("orgId").map(String::as_str), Some(""));
        assert_eq!(definition.header_names(), vec!["Accept", "Content-Type"]);
        assert!(definition.body.is_empty());
        assert_eq!(definition.content_type, ContentType::Json);
    }

    #[test]
    fn every_import_gets_a_new_id() {
        let endpoint = RegistryEndpoint::new("Users", "Get", "GET", "/users/:id");
        let a = import_endpoint(&endpoint, "").expect("import");
        let b = import_endpoint(&endpoint, "").expect("import");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let endpoint = RegistryEndpoint::new("Misc", "Trace", "TRACE", "/trace");
        let err = import_endpoint(&endpoint, "").expect_err("must fail");
        assert_eq!(err.code, "INVALID_PARAMS");
        assert!(err.details.is_some());
    }
}
