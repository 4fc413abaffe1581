//! `${{name.path.path}}` variable substitution against a per-invocation
//! outputs map (§4.5).

use serde_json::Value;

use crate::domain::models::OutputsMap;

/// Walk `value` recursively (maps, lists, scalars) and substitute every
/// `${{name.path.path}}` occurrence in string leaves with the corresponding
/// value pulled from `outputs`. Unresolvable references are left as the
/// literal placeholder.
pub fn substitute(value: &Value, outputs: &OutputsMap) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_string(s, outputs)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, outputs)).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), substitute(v, outputs));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn substitute_string(input: &str, outputs: &OutputsMap) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${{") {
        let Some(end_rel) = rest[start..].find("}}") else {
            result.push_str(rest);
            return result;
        };
        let end = start + end_rel;
        result.push_str(&rest[..start]);

        let reference = rest[start + 3..end].trim();
        match resolve_reference(reference, outputs) {
            Some(resolved) => result.push_str(&resolved),
            None => result.push_str(&rest[start..end + 2]),
        }

        rest = &rest[end + 2..];
    }
    result.push_str(rest);
    result
}

/// `name.path.path`: the first segment names a previous step's `outputAs`;
/// remaining segments descend that step's result-data map. If descent meets
/// a scalar before exhausting the path, its string form is the result;
/// non-string leaves use canonical (serde_json) stringification.
fn resolve_reference(reference: &str, outputs: &OutputsMap) -> Option<String> {
    let mut segments = reference.split('.');
    let name = segments.next()?;
    let mut current = outputs.get(name)?;

    for segment in segments {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return Some(stringify(current)),
        }
    }

    Some(stringify(current))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn resolves_nested_path() {
        let mut outputs = HashMap::new();
        outputs.insert(
            "deploy1".to_string(),
            serde_json::json!({"container_id": "abc123", "nested": {"ip": "10.0.0.1"}}),
        );
        assert_eq!(
            substitute_string("id=${{deploy1.container_id}}", &outputs),
            "id=abc123"
        );
        assert_eq!(
            substitute_string("ip=${{deploy1.nested.ip}}", &outputs),
            "ip=10.0.0.1"
        );
    }

    #[test]
    fn unresolvable_reference_left_as_literal() {
        let outputs = HashMap::new();
        assert_eq!(
            substitute_string("x=${{missing.field}}", &outputs),
            "x=${{missing.field}}"
        );
    }

    #[test]
    fn scalar_stops_descent_early() {
        let mut outputs = HashMap::new();
        outputs.insert("step".to_string(), serde_json::json!({"count": 3}));
        assert_eq!(substitute_string("n=${{step.count.extra}}", &outputs), "n=3");
    }

    #[test]
    fn substitute_walks_nested_structures() {
        let mut outputs = HashMap::new();
        outputs.insert("step".to_string(), serde_json::json!({"value": "x"}));
        let payload = serde_json::json!({"env": {"VAR": "${{step.value}}"}, "list": ["${{step.value}}"]});
        let result = substitute(&payload, &outputs);
        assert_eq!(result["env"]["VAR"], "x");
        assert_eq!(result["list"][0], "x");
    }
}
