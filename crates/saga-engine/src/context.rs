use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DuplicateKeyError;

/// Write-once data envelope threaded through a saga run.
///
/// Holds the run's initial input plus one result per completed step, keyed by
/// the step's output key. Results are kept in insertion order so that the
/// serialized form reflects the order in which steps completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    input: Value,
    results: IndexMap<String, Value>,
}

impl RunContext {
    #[must_use]
    pub fn new(input: Value) -> Self {
        Self {
            input,
            results: IndexMap::new(),
        }
    }

    /// The input the run was submitted with.
    #[must_use]
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Store a step result.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKeyError` if `key` already holds a value; the stored
    /// value is left untouched.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), DuplicateKeyError> {
        let key = key.into();
        if self.results.contains_key(&key) {
            return Err(DuplicateKeyError { key });
        }
        self.results.insert(key, value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.results.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.results.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Copy of this context restricted to `keys`.
    ///
    /// An empty key list projects the whole context. Keys that have not been
    /// written yet are omitted. The input is always carried over.
    #[must_use]
    pub fn project(&self, keys: &[String]) -> Self {
        if keys.is_empty() {
            return self.clone();
        }
        let results = keys
            .iter()
            .filter_map(|key| {
                self.results
                    .get_key_value(key)
                    .map(|(k, v)| (k.clone(), v.clone()))
            })
            .collect();
        Self {
            input: self.input.clone(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_context_has_no_results() {
        let ctx = RunContext::new(json!({"trip_id": "t-1"}));

        assert!(ctx.is_empty());
        assert_eq!(ctx.input()["trip_id"], "t-1");
    }

    #[test]
    fn set_then_get_returns_value() -> anyhow::Result<()> {
        let mut ctx = RunContext::default();

        ctx.set("ReserveHotelResult", json!({"booking_id": "h-9"}))?;

        assert_eq!(
            ctx.get("ReserveHotelResult"),
            Some(&json!({"booking_id": "h-9"}))
        );
        assert!(ctx.contains("ReserveHotelResult"));
        Ok(())
    }

    #[test]
    fn second_write_to_same_key_is_rejected() -> anyhow::Result<()> {
        let mut ctx = RunContext::default();
        ctx.set("result", json!(1))?;

        let err = ctx
            .set("result", json!(2))
            .expect_err("duplicate key should fail");

        assert_eq!(err.key, "result");
        assert_eq!(ctx.get("result"), Some(&json!(1)));
        Ok(())
    }

    #[test]
    fn keys_preserve_insertion_order() -> anyhow::Result<()> {
        let mut ctx = RunContext::default();
        ctx.set("zeta", json!(null))?;
        ctx.set("alpha", json!(null))?;
        ctx.set("mid", json!(null))?;

        let keys: Vec<_> = ctx.keys().collect();

        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        Ok(())
    }

    #[test]
    fn serialization_is_ordered_by_insertion() -> anyhow::Result<()> {
        let mut ctx = RunContext::new(json!("in"));
        ctx.set("b", json!(2))?;
        ctx.set("a", json!(1))?;

        let text = serde_json::to_string(&ctx)?;

        assert_eq!(text, r#"{"input":"in","results":{"b":2,"a":1}}"#);
        Ok(())
    }

    #[test]
    fn project_with_no_keys_copies_everything() -> anyhow::Result<()> {
        let mut ctx = RunContext::new(json!(7));
        ctx.set("a", json!(1))?;

        let slice = ctx.project(&[]);

        assert_eq!(slice, ctx);
        Ok(())
    }

    #[test]
    fn project_keeps_only_requested_keys() -> anyhow::Result<()> {
        let mut ctx = RunContext::new(json!(7));
        ctx.set("a", json!(1))?;
        ctx.set("b", json!(2))?;

        let slice = ctx.project(&["b".to_string(), "missing".to_string()]);

        assert_eq!(slice.len(), 1);
        assert_eq!(slice.get("b"), Some(&json!(2)));
        assert!(slice.get("a").is_none());
        assert_eq!(slice.input(), &json!(7));
        Ok(())
    }
}
