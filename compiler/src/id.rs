// id.rs — Stable regime identifiers
//
// Generated code never names a regime; it refers to it by a small dense
// integer. IDs are allocated in first-seen (document) order exactly once per
// component and the resulting table is shared, read-only, by every handler
// that emits regime-conditioned code.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::diag::{codes, Result, TranslateError};

/// Dense identifier of a regime within one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegimeId(pub u32);

impl fmt::Display for RegimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bijective regime name ↔ ID mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegimeTable {
    names: Vec<String>,
    #[serde(skip)]
    ids: HashMap<String, RegimeId>,
}

impl RegimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next ID for `name`. A name already in the table is a
    /// configuration error naming `context`.
    pub fn insert(&mut self, name: &str, context: &str) -> Result<RegimeId> {
        if self.ids.contains_key(name) {
            return Err(TranslateError::configuration(
                codes::E0109,
                context,
                format!("regime '{}' is declared more than once", name),
            ));
        }
        let id = RegimeId(self.names.len() as u32);
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<RegimeId> {
        self.ids.get(name).copied()
    }

    /// Look up a transition target, failing with a reference error naming
    /// the offending node when the regime does not exist.
    pub fn resolve(&self, name: &str, context: &str) -> Result<RegimeId> {
        self.id(name).ok_or_else(|| {
            TranslateError::reference(
                codes::E0200,
                context,
                format!("target regime '{}' is not defined", name),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether generated code needs the synthetic regime variable and guards.
    pub fn has_multiple(&self) -> bool {
        self.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::ErrorKind;

    fn table(names: &[&str]) -> RegimeTable {
        let mut table = RegimeTable::new();
        for name in names {
            table.insert(name, "Regime").unwrap();
        }
        table
    }

    #[test]
    fn ids_follow_first_seen_order() {
        let table = table(&["integrating", "refractory", "bursting"]);
        assert_eq!(table.id("integrating"), Some(RegimeId(0)));
        assert_eq!(table.id("refractory"), Some(RegimeId(1)));
        assert_eq!(table.id("bursting"), Some(RegimeId(2)));
        assert_eq!(table.len(), 3);
        assert!(table.has_multiple());
    }

    #[test]
    fn not_sorted_by_name() {
        let table = table(&["zeta", "alpha"]);
        assert_eq!(table.id("zeta"), Some(RegimeId(0)));
        assert_eq!(table.id("alpha"), Some(RegimeId(1)));
    }

    #[test]
    fn duplicate_name_is_configuration_error() {
        let mut table = table(&["a", "b"]);
        let err = table.insert("a", "Regime[@name='a']").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.code(), codes::E0109);
        assert!(format!("{err}").contains("Regime[@name='a']"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn single_regime_is_not_multiple() {
        let table = table(&["only"]);
        assert!(!table.has_multiple());
        assert!(!table.is_empty());
    }

    #[test]
    fn independent_tables_are_identical() {
        let names = ["a", "b", "c"];
        assert_eq!(table(&names), table(&names));
    }

    #[test]
    fn resolve_unknown_is_reference_error() {
        let table = table(&["a"]);
        let err = table.resolve("Ghost", "OnCondition").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.code(), codes::E0200);
        assert!(format!("{err}").contains("Ghost"));
    }
}
