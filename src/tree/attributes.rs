//! Kind-specific node attributes.
//!
//! Source languages disagree on what data exists for a declaration, so nodes
//! carry an open map of attributes. Values are a closed sum type: consumers
//! match on the variant instead of casting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known attribute keys written by the adapters.
pub mod keys {
    /// `Module`: package or namespace name.
    pub const PACKAGE: &str = "package";
    /// `Module`: imported module paths.
    pub const IMPORTS: &str = "imports";
    /// `Class`/`Method`/`Variable`: modifier keywords (`public`, `static`, ...).
    pub const MODIFIERS: &str = "modifiers";
    /// `Class`: first supertype.
    pub const SUPERCLASS: &str = "superclass";
    /// `Class`: every supertype after the first, for multiple-inheritance languages.
    pub const SUPERTYPES: &str = "supertypes";
    /// `Class`: implemented interfaces.
    pub const INTERFACES: &str = "interfaces";
    /// `Class`: declaration flavour (`class`, `interface`, `enum`, `object`).
    pub const CLASS_KIND: &str = "classKind";
    /// `Method`: declared return type or `"unknown"`.
    pub const RETURN_TYPE: &str = "returnType";
    /// `Method`: list of `{name, type}` maps.
    pub const PARAMETERS: &str = "parameters";
    /// `Method`: declared thrown exception types.
    pub const THROWS: &str = "throws";
    /// `Method`: precomputed cyclomatic complexity.
    pub const CYCLOMATIC_COMPLEXITY: &str = "cyclomaticComplexity";
    /// `Method`: whether this is a constructor-like method.
    pub const CONSTRUCTOR: &str = "constructor";
    /// `Variable`: declared type or `"unknown"`.
    pub const TYPE: &str = "type";
    /// `Variable`: true for class members, false for locals and module globals.
    pub const FIELD: &str = "field";
    /// `Statement`: normalized statement kind (`if`, `for`, `return`, ...).
    pub const STATEMENT_TYPE: &str = "statementType";
    /// `Expression`: normalized expression kind (`binary`, `call`, ...).
    pub const EXPRESSION_TYPE: &str = "expressionType";
    /// `Unclassified`: the raw grammar node type.
    pub const SYNTAX_TYPE: &str = "syntaxType";
}

/// Placeholder for types a source does not declare.
pub const UNKNOWN_TYPE: &str = "unknown";

/// A single attribute value.
///
/// Serialized adjacently tagged (`{"type": "pair_list", "value": []}`) so an
/// empty list keeps its variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    StrList(Vec<String>),
    PairList(Vec<BTreeMap<String, String>>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::StrList(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&[BTreeMap<String, String>]> {
        match self {
            AttrValue::PairList(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::StrList(value)
    }
}

impl From<Vec<BTreeMap<String, String>>> for AttrValue {
    fn from(value: Vec<BTreeMap<String, String>>) -> Self {
        AttrValue::PairList(value)
    }
}

/// Ordered attribute map. Ordering keeps structural equality and
/// serialized output deterministic.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A method parameter rendered as a `{name, type}` pair.
pub fn parameter(name: impl Into<String>, ty: impl Into<String>) -> BTreeMap<String, String> {
    let mut pair = BTreeMap::new();
    pair.insert("name".to_string(), name.into());
    pair.insert("type".to_string(), ty.into());
    pair
}

/// Small builder used by the adapters to assemble attribute maps.
#[derive(Debug, Default, Clone)]
pub struct AttrsBuilder {
    attrs: Attributes,
}

impl AttrsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Set a list attribute only when it has entries.
    pub fn list_if_any(self, key: &str, values: Vec<String>) -> Self {
        if values.is_empty() {
            self
        } else {
            self.set(key, values)
        }
    }

    /// Set a string attribute only when present.
    pub fn str_if_some(self, key: &str, value: Option<String>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn build(self) -> Attributes {
        self.attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_variant() {
        assert_eq!(AttrValue::from("int").as_str(), Some("int"));
        assert_eq!(AttrValue::from(true).as_bool(), Some(true));
        assert_eq!(AttrValue::from(4i64).as_int(), Some(4));
        assert_eq!(AttrValue::from(4i64).as_str(), None);

        let list = AttrValue::from(vec!["public".to_string()]);
        assert_eq!(list.as_list().unwrap(), ["public".to_string()]);
    }

    #[test]
    fn test_builder_skips_empty_values() {
        let attrs = AttrsBuilder::new()
            .list_if_any(keys::IMPORTS, vec![])
            .str_if_some(keys::PACKAGE, None)
            .set(keys::FIELD, false)
            .build();

        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[keys::FIELD], AttrValue::Bool(false));
    }

    #[test]
    fn test_empty_lists_keep_their_variant_through_json() {
        let attrs = AttrsBuilder::new()
            .set(keys::PARAMETERS, Vec::<BTreeMap<String, String>>::new())
            .set(keys::MODIFIERS, Vec::<String>::new())
            .set(keys::CYCLOMATIC_COMPLEXITY, 1i64)
            .build();

        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json[keys::PARAMETERS]["type"], "pair_list");
        assert_eq!(json[keys::MODIFIERS]["type"], "str_list");

        let back: Attributes = serde_json::from_value(json).unwrap();
        assert_eq!(back, attrs);
        assert_eq!(back[keys::PARAMETERS].as_pairs(), Some(&[][..]));
    }

    #[test]
    fn test_parameter_pair() {
        let p = parameter("x", "int");
        assert_eq!(p["name"], "x");
        assert_eq!(p["type"], "int");
    }
}
