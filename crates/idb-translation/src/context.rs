//! Per-run variable context for rule conditions and action parameters.

use std::collections::HashMap;

/// Named variables an expression can reference during one translation run.
///
/// Three variable shapes exist: scalars (`id`, `idp`), lists (`groups`)
/// and keyed maps of value lists (`attr`, `attrs`, `idsByType`). The
/// context is built once per `translate()` call and shared by all rules.
#[derive(Debug, Clone, Default)]
pub struct RuleContext {
    scalars: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
    maps: HashMap<String, HashMap<String, Vec<String>>>,
}

impl RuleContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar variable.
    pub fn set_scalar(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.scalars.insert(name.into(), value.into());
    }

    /// Sets a list variable.
    pub fn set_list(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.lists.insert(name.into(), values);
    }

    /// Sets one entry of a keyed map variable.
    pub fn set_map_entry(
        &mut self,
        map: impl Into<String>,
        key: impl Into<String>,
        values: Vec<String>,
    ) {
        self.maps
            .entry(map.into())
            .or_default()
            .insert(key.into(), values);
    }

    /// Gets a scalar variable.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars.get(name).map(String::as_str)
    }

    /// Gets a list variable.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    /// Gets one entry of a keyed map variable.
    #[must_use]
    pub fn map_entry(&self, map: &str, key: &str) -> Option<&[String]> {
        self.maps
            .get(map)
            .and_then(|entries| entries.get(key))
            .map(Vec::as_slice)
    }

    /// Checks whether a map variable exists at all (even if the requested
    /// key is absent).
    #[must_use]
    pub fn has_map(&self, map: &str) -> bool {
        self.maps.contains_key(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_are_kept_by_shape() {
        let mut ctx = RuleContext::new();
        ctx.set_scalar("idp", "testIdp");
        ctx.set_list("groups", vec!["/A".into()]);
        ctx.set_map_entry("attr", "email", vec!["a@example.com".into()]);

        assert_eq!(ctx.scalar("idp"), Some("testIdp"));
        assert_eq!(ctx.list("groups").unwrap().len(), 1);
        assert_eq!(
            ctx.map_entry("attr", "email").unwrap(),
            ["a@example.com".to_string()]
        );
        assert!(ctx.has_map("attr"));
        assert!(ctx.map_entry("attr", "missing").is_none());
    }
}
