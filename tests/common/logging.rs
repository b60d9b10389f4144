//! Log output verification helpers.
//!
//! The binary writes JSON lines to stderr under `--json-logs`; these helpers
//! parse them and assert on levels, messages and the `category` field.

use serde_json::Value;

/// Verifier for JSON log output captured from stderr.
///
/// # Example
///
/// ```ignore
/// let result = cli.run(&["--json-logs", "--replay", replay, "--config", config]);
/// LogVerifier::from_stderr(&result.stderr)
///     .assert_message("INFO", "Simulated action")
///     .assert_no_errors();
/// ```
pub struct LogVerifier {
    entries: Vec<Value>,
    raw: Vec<String>,
}

impl LogVerifier {
    /// Parse every JSON line in `stderr`, skipping anything else.
    #[must_use]
    pub fn from_stderr(stderr: &str) -> Self {
        let raw: Vec<String> = stderr.lines().map(String::from).collect();
        let entries = raw
            .iter()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(Value::is_object)
            .collect();
        Self { entries, raw }
    }

    fn message(entry: &Value) -> &str {
        entry
            .pointer("/fields/message")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    fn level(entry: &Value) -> &str {
        entry.get("level").and_then(Value::as_str).unwrap_or("")
    }

    /// Entries whose `category` field equals `category`.
    #[must_use]
    pub fn in_category(&self, category: &str) -> Vec<&Value> {
        self.entries
            .iter()
            .filter(|e| e.pointer("/fields/category").and_then(Value::as_str) == Some(category))
            .collect()
    }

    /// Number of entries whose message contains `message`.
    #[must_use]
    pub fn count_message(&self, message: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| Self::message(e).contains(message))
            .count()
    }

    /// Assert that an entry exists with the given level and message.
    ///
    /// # Panics
    ///
    /// Panics if no matching entry is found.
    #[must_use]
    pub fn assert_message(&self, level: &str, message: &str) -> &Self {
        let found = self
            .entries
            .iter()
            .any(|e| Self::level(e) == level && Self::message(e).contains(message));
        assert!(
            found,
            "No {level} log containing \"{message}\" found in:\n{}",
            self.raw.join("\n")
        );
        self
    }

    /// Assert that no ERROR entries exist.
    ///
    /// # Panics
    ///
    /// Panics if any ERROR entries are found.
    #[must_use]
    pub fn assert_no_errors(&self) -> &Self {
        let errors: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| Self::level(e) == "ERROR")
            .map(Self::message)
            .collect();
        assert!(errors.is_empty(), "Found unexpected errors:\n{}", errors.join("\n"));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGS: &str = r#"{"timestamp":"t","level":"INFO","fields":{"message":"Simulated action","category":"dry_run","button":"a"},"target":"bridge::dispatch"}
not json
{"timestamp":"t","level":"WARN","fields":{"message":"Emergency toggle: bridge disabled","category":"safety"},"target":"bridge::engine"}"#;

    #[test]
    fn test_parses_json_lines_only() {
        let verifier = LogVerifier::from_stderr(LOGS);
        assert_eq!(verifier.len(), 2);
        assert_eq!(verifier.in_category("dry_run").len(), 1);
        let _ = verifier
            .assert_message("INFO", "Simulated action")
            .assert_message("WARN", "bridge disabled")
            .assert_no_errors();
    }

    #[test]
    fn test_count_message() {
        assert_eq!(LogVerifier::from_stderr(LOGS).count_message("Emergency"), 1);
    }
}
