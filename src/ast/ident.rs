//! Identifiers and the deterministic unique-name generator.
//!
//! Every `Func`, `Memory`, `Table`, `Global`, `Block`, `Loop` and `If` must
//! carry an identifier. When the source omits one, the parser draws a name
//! from a monotonic per-category sequence (`func_0`, `func_1`, `block_0`,
//! ...) so that later passes (module instantiation, the executor) never
//! have to special-case anonymous nodes.

use crate::ast::loc::Loc;
use std::collections::HashMap;

/// A symbolic name, either user-supplied (`$foo`) or generated.
///
/// `raw` is the literal source text of the identifier, including the `$`
/// sigil. It is empty for generated identifiers, which lets a future
/// printer decide whether a name needs to be rendered at all.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identifier {
    pub value: String,
    pub raw: String,
    pub loc: Option<Loc>,
}

impl Identifier {
    /// Builds an identifier from a `$name` token actually present in the source.
    pub fn named(value: impl Into<String>, loc: Option<Loc>) -> Self {
        let value = value.into();
        Identifier {
            raw: format!("${value}"),
            value,
            loc,
        }
    }

    /// Builds an identifier with no backing source text, as produced by the
    /// unique-name generator for an anonymous node.
    pub fn generated(value: impl Into<String>) -> Self {
        Identifier {
            value: value.into(),
            raw: String::new(),
            loc: None,
        }
    }

    /// An identifier was drawn from source text rather than generated.
    pub fn is_anonymous(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Produces deterministic, monotonically increasing names per category
/// (`func_0`, `func_1`, `block_0`, ...) for anonymous nodes encountered
/// during a single parse. Never re-issues a name within one parse.
#[derive(Debug, Default)]
pub struct UniqueNameGenerator {
    counters: HashMap<&'static str, u32>,
}

impl UniqueNameGenerator {
    pub fn new() -> Self {
        UniqueNameGenerator::default()
    }

    /// Returns the next unused name for `kind`, e.g. `"func"` -> `func_0`.
    pub fn generate(&mut self, kind: &'static str) -> Identifier {
        let counter = self.counters.entry(kind).or_insert(0);
        let name = format!("{kind}_{counter}");
        *counter += 1;
        Identifier::generated(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_monotonic_names_per_kind() {
        let mut generator = UniqueNameGenerator::new();

        assert_eq!(generator.generate("func").value, "func_0");
        assert_eq!(generator.generate("func").value, "func_1");
        assert_eq!(generator.generate("block").value, "block_0");
        assert_eq!(generator.generate("func").value, "func_2");
    }

    #[test]
    fn generated_identifiers_are_anonymous() {
        let mut generator = UniqueNameGenerator::new();
        let id = generator.generate("func");

        assert!(id.is_anonymous());
        assert_eq!(id.raw, "");
    }

    #[test]
    fn named_identifiers_are_not_anonymous() {
        let id = Identifier::named("f", None);

        assert!(!id.is_anonymous());
        assert_eq!(id.raw, "$f");
    }
}
