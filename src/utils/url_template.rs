use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder regex"));

/// Byte range of the path. Scheme, authority (`http:`, `:8080`, `user:pass@`),
/// query and fragment are never scanned for placeholders.
fn path_span(url: &str) -> (usize, usize) {
    let start = match url.find("://") {
        Some(idx) => {
            let after = idx + 3;
            url[after..]
                .find(&['/', '?', '#'][..])
                .map(|offset| after + offset)
                .unwrap_or(url.len())
        }
        None => 0,
    };
    let end = url[start..]
        .find(&['?', '#'][..])
        .map(|offset| start + offset)
        .unwrap_or(url.len());
    (start, end)
}

/// `:identifier` tokens of a URL template, in order of first appearance.
pub fn extract_placeholders(url: &str) -> Vec<String> {
    let (start, end) = path_span(url);
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(&url[start..end]) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Path params for `url`: exactly its placeholders, keeping surviving values.
pub fn sync_path_params(
    url: &str,
    existing: &IndexMap<String, String>,
) -> IndexMap<String, String> {
    extract_placeholders(url)
        .into_iter()
        .map(|name| {
            let value = existing.get(&name).cloned().unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Placeholders of `url` that `path_params` cannot fill.
pub fn unresolved_placeholders(url: &str, path_params: &IndexMap<String, String>) -> Vec<String> {
    extract_placeholders(url)
        .into_iter()
        .filter(|name| {
            path_params
                .get(name)
                .map(|value| value.is_empty())
                .unwrap_or(true)
        })
        .collect()
}

/// Substitutes the first occurrence of each `:key` with its value, verbatim.
///
/// Values are not escaped, and a substituted value is never rescanned.
pub fn substitute_path_params(url: &str, path_params: &IndexMap<String, String>) -> String {
    let (start, end) = path_span(url);
    let (head, path) = (&url[..start], &url[start..end]);
    let mut used: Vec<&str> = Vec::new();
    let mut out = String::with_capacity(url.len());
    out.push_str(head);
    let mut cursor = 0;
    for caps in PLACEHOLDER_RE.captures_iter(path) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = path_params
            .get_key_value(name.as_str())
            .filter(|(_, value)| !value.is_empty());
        if let Some((key, value)) = value {
            if !used.contains(&key.as_str()) {
                out.push_str(&path[cursor..whole.start()]);
                out.push_str(value);
                cursor = whole.end();
                used.push(key.as_str());
            }
        }
    }
    out.push_str(&path[cursor..]);
    out.push_str(&url[end..]);
    out
}

/// Form-encodes the entries whose key and value are both non-empty.
pub fn build_query_string(query_params: &IndexMap<String, String>) -> String {
    let pairs: Vec<(&str, &str)> = query_params
        .iter()
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    // Serializing a sequence of string pairs cannot fail.
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

/// Produces the final request URL from a template and its parameters.
pub fn resolve_url(
    url: &str,
    path_params: &IndexMap<String, String>,
    query_params: &IndexMap<String, String>,
) -> String {
    let mut resolved = substitute_path_params(url, path_params);
    let query = build_query_string(query_params);
    if query.is_empty() {
        return resolved;
    }
    if resolved.ends_with('?') || resolved.ends_with('&') {
        resolved.push_str(&query);
    } else if resolved.contains('?') {
        resolved.push('&');
        resolved.push_str(&query);
    } else {
        resolved.push('?');
        resolved.push_str(&query);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_each_placeholder() {
        let resolved = resolve_url(
            "/users/:id/posts/:postId",
            &params(&[("id", "42"), ("postId", "7")]),
            &IndexMap::new(),
        );
        assert_eq!(resolved, "/users/42/posts/7");
    }

    #[test]
    fn prefix_placeholders_do_not_clobber_longer_names() {
        let resolved = resolve_url(
            "/a/:idx/b/:id",
            &params(&[("id", "1"), ("idx", "2")]),
            &IndexMap::new(),
        );
        assert_eq!(resolved, "/a/2/b/1");
    }

    #[test]
    fn port_and_scheme_are_not_placeholders() {
        let url = "http://localhost:8080/orgs/:orgId";
        assert_eq!(extract_placeholders(url), vec!["orgId"]);
        assert_eq!(
            resolve_url(url, &params(&[("orgId", "acme")]), &IndexMap::new()),
            "http://localhost:8080/orgs/acme"
        );
    }

    #[test]
    fn empty_values_leave_placeholder_in_place() {
        let resolved = resolve_url(
            "/users/:id",
            &params(&[("id", "")]),
            &IndexMap::new(),
        );
        assert_eq!(resolved, "/users/:id");
        assert_eq!(
            unresolved_placeholders("/users/:id/:other", &params(&[("id", "")])),
            vec!["id", "other"]
        );
    }

    #[test]
    fn values_are_inserted_verbatim() {
        let resolved = resolve_url(
            "/files/:path",
            &params(&[("path", "a%2Fb c")]),
            &IndexMap::new(),
        );
        assert_eq!(resolved, "/files/a%2Fb c");
    }

    #[test]
    fn query_and_fragment_are_not_placeholders() {
        let url = "https://api.example.com/search/:scope?t=a:b";
        assert_eq!(extract_placeholders(url), vec!["scope"]);
        assert_eq!(
            resolve_url(
                url,
                &params(&[("scope", "all"), ("b", "x")]),
                &params(&[("page", "2")]),
            ),
            "https://api.example.com/search/all?t=a:b&page=2"
        );
        assert_eq!(extract_placeholders("/docs/:id#see:also"), vec!["id"]);
        assert_eq!(extract_placeholders("/search?t=a:b"), Vec::<String>::new());
        assert_eq!(
            extract_placeholders("http://localhost:8080?x=:y"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let resolved = resolve_url(
            "/x/:a/:b",
            &params(&[("a", ":b"), ("b", "2")]),
            &IndexMap::new(),
        );
        assert_eq!(resolved, "/x/:b/2");
    }

    #[test]
    fn query_skips_empty_keys_and_values() {
        let resolved = resolve_url(
            "/search",
            &IndexMap::new(),
            &params(&[("q", "test"), ("page", ""), ("", "orphan")]),
        );
        assert_eq!(resolved, "/search?q=test");
    }

    #[test]
    fn query_appends_with_ampersand_after_existing_query() {
        let resolved = resolve_url(
            "/search?existing=1",
            &IndexMap::new(),
            &params(&[("q", "x")]),
        );
        assert_eq!(resolved, "/search?existing=1&q=x");
    }

    #[test]
    fn query_values_are_escaped() {
        let resolved = resolve_url(
            "/search",
            &IndexMap::new(),
            &params(&[("q", "a&b=c"), ("tag", "rust lang")]),
        );
        assert_eq!(resolved, "/search?q=a%26b%3Dc&tag=rust+lang");
    }

    #[test]
    fn no_query_leaves_url_untouched() {
        let resolved = resolve_url("/plain?", &IndexMap::new(), &params(&[("q", "")]));
        assert_eq!(resolved, "/plain?");
    }

    #[test]
    fn sync_keeps_order_and_values() {
        let synced = sync_path_params(
            "/orgs/:orgId/members/:memberId/:orgId",
            &params(&[("memberId", "m1"), ("gone", "x")]),
        );
        let keys: Vec<&str> = synced.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["orgId", "memberId"]);
        assert_eq!(synced["memberId"], "m1");
    }
}
