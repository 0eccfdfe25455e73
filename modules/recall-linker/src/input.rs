// Thread input. Accepted layouts:
//   - a JSON object mapping thread id → thread (or → {"submission": thread})
//   - a JSON array of threads
//   - a single thread object
//   - JSON lines, one thread (or wrapper) per line
// Threads come back sorted by id so every run visits them in the same order.

use std::path::Path;

use anyhow::{Context, Result};
use recall_common::{RecallError, Thread};
use serde_json::Value;
use tracing::info;

const SUBMISSION_KEY: &str = "submission";

pub fn load_threads(path: &Path) -> Result<Vec<Thread>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    let mut threads = parse_threads(&raw)?;
    threads.sort_by(|a, b| a.id.cmp(&b.id));
    info!(path = %path.display(), threads = threads.len(), "input: loaded threads");
    Ok(threads)
}

pub fn parse_threads(raw: &str) -> Result<Vec<Thread>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items.into_iter().map(|v| thread_from(v, None)).collect(),
        Ok(Value::Object(map)) if is_thread(&map) || map.contains_key(SUBMISSION_KEY) => {
            Ok(vec![thread_from(Value::Object(map), None)?])
        }
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(id, v)| thread_from(v, Some(id)))
            .collect(),
        Ok(other) => Err(RecallError::Input(format!("expected threads, found {other}")).into()),
        Err(_) => raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                let value: Value = serde_json::from_str(line)
                    .with_context(|| format!("Invalid JSON on input line {}", n + 1))?;
                thread_from(value, None)
            })
            .collect(),
    }
}

fn is_thread(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("replies") && map.contains_key("id")
}

/// Unwrap `{"submission": ...}` and fill a missing id from the map key.
fn thread_from(value: Value, key: Option<String>) -> Result<Thread> {
    let mut value = match value {
        Value::Object(mut map) if map.contains_key(SUBMISSION_KEY) => {
            map.remove(SUBMISSION_KEY).unwrap_or(Value::Null)
        }
        other => other,
    };
    if let (Value::Object(map), Some(key)) = (&mut value, key) {
        map.entry("id").or_insert(Value::String(key));
    }
    serde_json::from_value(value).context("Invalid thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(threads: &[Thread]) -> Vec<&str> {
        threads.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn map_of_wrapped_submissions() {
        let raw = r#"{
            "b2": {"submission": {"id": "b2", "author": "op", "replies": []}},
            "a1": {"submission": {"author": "op", "replies": null}}
        }"#;
        let mut threads = parse_threads(raw).unwrap();
        threads.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(ids(&threads), ["a1", "b2"]);
    }

    #[test]
    fn array_and_single_object() {
        let raw = r#"[{"id": "x", "replies": []}, {"id": "y", "replies": []}]"#;
        assert_eq!(ids(&parse_threads(raw).unwrap()), ["x", "y"]);

        let raw = r#"{"id": "solo", "replies": [{"id": "r1", "body": "hi"}]}"#;
        let threads = parse_threads(raw).unwrap();
        assert_eq!(ids(&threads), ["solo"]);
        assert_eq!(threads[0].replies.len(), 1);
    }

    #[test]
    fn json_lines() {
        let raw = "{\"id\": \"l1\", \"replies\": []}\n\n{\"submission\": {\"id\": \"l2\", \"replies\": []}}\n";
        assert_eq!(ids(&parse_threads(raw).unwrap()), ["l1", "l2"]);
    }

    #[test]
    fn load_sorts_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.json");
        std::fs::write(&path, r#"[{"id": "zz", "replies": []}, {"id": "aa", "replies": []}]"#).unwrap();
        assert_eq!(ids(&load_threads(&path).unwrap()), ["aa", "zz"]);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_threads("not json at all").is_err());
        assert!(parse_threads("42").is_err());
    }
}
