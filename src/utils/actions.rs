use crate::errors::EngineError;
use serde_json::Value;

fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut curr = vec![i + 1; b_chars.len() + 1];
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev = curr;
    }
    prev[b_chars.len()]
}

fn normalize(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Known actions close to `input`, best match first.
pub fn closest_actions<'a>(input: &str, known: &[&'a str], limit: usize) -> Vec<&'a str> {
    let needle = normalize(input);
    if needle.is_empty() {
        return Vec::new();
    }
    let allowed = match needle.len() {
        0..=4 => 1,
        5..=8 => 2,
        n => (n / 3).max(3),
    };
    let mut scored: Vec<(&'a str, usize)> = known
        .iter()
        .filter_map(|candidate| {
            let hay = normalize(candidate);
            let score = if hay == needle {
                0
            } else if hay.contains(&needle) || needle.contains(&hay) {
                1
            } else {
                edit_distance(&needle, &hay)
            };
            (score <= allowed).then_some((*candidate, score))
        })
        .collect();
    scored.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| a.0.len().cmp(&b.0.len()))
            .then_with(|| a.0.cmp(b.0))
    });
    scored.into_iter().take(limit.max(1)).map(|(name, _)| name).collect()
}

pub fn unknown_action_error(action: Option<&Value>, known: &[&str]) -> EngineError {
    let name = action.and_then(Value::as_str).unwrap_or("");
    let suggestions = closest_actions(name, known, 3);
    let mut hint = format!("Use one of: {}.", known.join(", "));
    if !suggestions.is_empty() {
        hint = format!("Did you mean: {}? {}", suggestions.join(", "), hint);
    }
    EngineError::invalid_params(format!("Unknown action: {}", name))
        .with_hint(hint)
        .with_details(serde_json::json!({
            "known_actions": known,
            "did_you_mean": suggestions,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["execute", "save", "list_saved", "load", "delete"];

    #[test]
    fn suggests_close_matches() {
        assert_eq!(closest_actions("exec", KNOWN, 3), vec!["execute"]);
        assert_eq!(closest_actions("dlete", KNOWN, 3), vec!["delete"]);
        assert!(closest_actions("", KNOWN, 3).is_empty());
    }

    #[test]
    fn unknown_action_carries_hint() {
        let err = unknown_action_error(Some(&Value::String("sav".to_string())), KNOWN);
        assert_eq!(err.message, "Unknown action: sav");
        assert!(err.hint.as_deref().unwrap_or("").starts_with("Did you mean: save"));
    }
}
