//! Python adapter using tree-sitter.
//!
//! Python has no access modifiers or static keyword, so they are derived:
//! - a single leading underscore marks a member `private`
//! - decorators become modifiers (`@staticmethod` → `static`)
//! - class-level assignments are `static` fields
//! - `self`/`cls` receivers are dropped from parameter lists

use std::collections::{BTreeMap, HashSet};

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

use crate::adapter::convert::{self, SyntaxRules};
use crate::adapter::treesitter::{all_children, named_children, Converter, Grammar, TreeSitterAdapter};
use crate::adapter::AdapterError;
use crate::tree::{keys, parameter, AttrsBuilder, CodeNode, UNKNOWN_TYPE};

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
; import module
(import_statement
  name: (dotted_name) @module_name
) @import

; import module as alias
(import_statement
  name: (aliased_import
    name: (dotted_name) @module_name)
) @import_aliased

; from module import name
(import_from_statement
  module_name: (dotted_name) @from_module
) @import_from

; from . import name (relative imports)
(import_from_statement
  module_name: (relative_import) @relative_module
) @import_relative
"#;

static RULES: SyntaxRules = SyntaxRules {
    branch_kinds: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "case_clause",
    ],
    transparent_kinds: &["block"],
    skip_kinds: &[],
    statement_kinds: &[
        "elif_clause",
        "else_clause",
        "except_clause",
        "finally_clause",
        "case_clause",
        "with_clause",
    ],
    expression_kinds: &[
        "call",
        "attribute",
        "assignment",
        "augmented_assignment",
        "binary_operator",
        "boolean_operator",
        "comparison_operator",
        "unary_operator",
        "not_operator",
        "subscript",
        "string",
        "integer",
        "float",
        "true",
        "false",
        "none",
        "list",
        "dictionary",
        "tuple",
        "set",
        "lambda",
        "list_comprehension",
        "dictionary_comprehension",
        "generator_expression",
        "await",
    ],
    case_label_kinds: &[],
};

/// Python grammar for the tree-sitter driver.
pub struct PythonGrammar;

/// Python adapter.
pub type PythonAdapter = TreeSitterAdapter<PythonGrammar>;

/// Create a new Python adapter.
pub fn new_adapter() -> PythonAdapter {
    TreeSitterAdapter::new(PythonGrammar)
}

impl PythonGrammar {
    fn imports(&self, cx: &Converter<'_>, root: Node) -> Result<Vec<String>, AdapterError> {
        let language = self.language();
        let query = Query::new(&language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, cx.source());

        let mut imports = Vec::new();
        let mut seen_paths = HashSet::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if matches!(name, "module_name" | "from_module" | "relative_module") {
                    let path = cx.text(capture.node).to_string();
                    if seen_paths.insert(path.clone()) {
                        imports.push(path);
                    }
                }
            }
        }
        Ok(imports)
    }

    /// Decorator names without `@` or call arguments.
    fn decorators(&self, cx: &Converter<'_>, decorated: Node) -> Vec<String> {
        named_children(decorated)
            .into_iter()
            .filter(|n| n.kind() == "decorator")
            .map(|d| {
                let text = cx.text(d).trim_start_matches('@');
                let name = text.split('(').next().unwrap_or(text);
                name.trim().to_string()
            })
            .collect()
    }

    fn modifiers(&self, name: &str, decorators: &[String], is_async: bool) -> Vec<String> {
        let mut modifiers = Vec::new();
        if name.starts_with('_') && !name.starts_with("__") {
            modifiers.push("private".to_string());
        }
        for decorator in decorators {
            match decorator.as_str() {
                "staticmethod" => modifiers.push("static".to_string()),
                "abc.abstractmethod" | "abstractmethod" => modifiers.push("abstract".to_string()),
                other => modifiers.push(other.to_string()),
            }
        }
        if is_async {
            modifiers.push("async".to_string());
        }
        modifiers
    }

    /// Convert a statement at module or class scope.
    ///
    /// `class_name` is set for class bodies and changes how functions and
    /// assignments are interpreted.
    fn member(&self, cx: &mut Converter<'_>, node: Node, class_name: Option<&str>) -> Vec<CodeNode> {
        match node.kind() {
            "class_definition" => vec![self.class(cx, node, &[])],
            "function_definition" => vec![self.function(cx, node, &[], class_name)],
            "decorated_definition" => {
                let decorators = self.decorators(cx, node);
                match node.child_by_field_name("definition") {
                    Some(def) if def.kind() == "class_definition" => {
                        vec![self.class(cx, def, &decorators)]
                    }
                    Some(def) if def.kind() == "function_definition" => {
                        vec![self.function(cx, def, &decorators, class_name)]
                    }
                    _ => vec![cx.unclassified(node)],
                }
            }
            "import_statement" | "import_from_statement" | "future_import_statement" => Vec::new(),
            "expression_statement" => {
                let inner = named_children(node);
                match inner.as_slice() {
                    [only] if only.kind() == "string" => Vec::new(),
                    [only] if only.kind() == "assignment" => {
                        match self.assignment(cx, *only, class_name.is_some()) {
                            Some(var) => vec![var],
                            None => cx.syntax(node),
                        }
                    }
                    _ => cx.syntax(node),
                }
            }
            _ => cx.syntax(node),
        }
    }

    fn class(&self, cx: &mut Converter<'_>, node: Node, decorators: &[String]) -> CodeNode {
        let name = cx.field_text(node, "name").unwrap_or_default();

        let bases: Vec<String> = node
            .child_by_field_name("superclasses")
            .map(|args| {
                named_children(args)
                    .into_iter()
                    .filter(|a| a.kind() != "keyword_argument" && !a.kind().contains("comment"))
                    .map(|a| convert::squash_whitespace(cx.text(a)))
                    .collect()
            })
            .unwrap_or_default();
        let mut bases = bases.into_iter();
        let superclass = bases.next();
        let supertypes: Vec<String> = bases.collect();

        let children = match node.child_by_field_name("body") {
            Some(body) => named_children(body)
                .into_iter()
                .flat_map(|member| self.member(cx, member, Some(name.as_str())))
                .collect(),
            None => Vec::new(),
        };

        CodeNode::class(
            name.clone(),
            cx.location(node),
            children,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, self.modifiers(&name, decorators, false))
                .set(keys::CLASS_KIND, "class")
                .str_if_some(keys::SUPERCLASS, superclass)
                .list_if_any(keys::SUPERTYPES, supertypes)
                .set(keys::INTERFACES, Vec::<String>::new())
                .build(),
        )
    }

    fn function(
        &self,
        cx: &mut Converter<'_>,
        node: Node,
        decorators: &[String],
        class_name: Option<&str>,
    ) -> CodeNode {
        let name = cx.field_text(node, "name").unwrap_or_default();
        let is_async = all_children(node).iter().any(|n| n.kind() == "async");
        let constructor_of = class_name.filter(|_| name == "__init__" || name == "__new__");

        let return_type = match constructor_of {
            Some(class_name) => class_name.to_string(),
            None => cx
                .field_text(node, "return_type")
                .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
        };

        let is_static = decorators.iter().any(|d| d == "staticmethod");
        let drop_receiver = class_name.is_some() && !is_static;
        let parameters = node
            .child_by_field_name("parameters")
            .map(|params| self.parameters(cx, params, drop_receiver))
            .unwrap_or_default();

        let body = node.child_by_field_name("body");
        let complexity = cx.complexity(body);
        let statements = cx.body(body);

        CodeNode::method(
            name.clone(),
            cx.location(node),
            statements,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, self.modifiers(&name, decorators, is_async))
                .set(keys::RETURN_TYPE, return_type)
                .set(keys::PARAMETERS, parameters)
                .set(keys::CYCLOMATIC_COMPLEXITY, complexity)
                .set(keys::CONSTRUCTOR, constructor_of.is_some())
                .build(),
        )
    }

    fn parameters(
        &self,
        cx: &Converter<'_>,
        params: Node,
        drop_receiver: bool,
    ) -> Vec<BTreeMap<String, String>> {
        let mut out = Vec::new();
        for (index, param) in named_children(params).into_iter().enumerate() {
            let (name, ty) = match param.kind() {
                "identifier" => (cx.text(param).to_string(), None),
                "default_parameter" => (cx.field_text(param, "name").unwrap_or_default(), None),
                "typed_default_parameter" => (
                    cx.field_text(param, "name").unwrap_or_default(),
                    cx.field_text(param, "type"),
                ),
                "typed_parameter" => {
                    let name = param
                        .named_child(0)
                        .map(|n| cx.text(n).to_string())
                        .unwrap_or_default();
                    (name, cx.field_text(param, "type"))
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    (cx.text(param).to_string(), None)
                }
                _ => continue,
            };
            if index == 0 && drop_receiver && (name == "self" || name == "cls") {
                continue;
            }
            out.push(parameter(name, ty.unwrap_or_else(|| UNKNOWN_TYPE.to_string())));
        }
        out
    }

    /// A `Variable` for `name = value` / `name: T = value`. Destructuring and
    /// attribute targets stay ordinary statements.
    fn assignment(&self, cx: &mut Converter<'_>, node: Node, is_field: bool) -> Option<CodeNode> {
        let left = node.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }
        let name = cx.text(left).to_string();
        let ty = cx
            .field_text(node, "type")
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
        let initializer = node
            .child_by_field_name("right")
            .map(|right| cx.syntax(right))
            .unwrap_or_default();

        let mut modifiers = self.modifiers(&name, &[], false);
        if is_field {
            modifiers.push("static".to_string());
        }

        Some(CodeNode::variable(
            name,
            cx.location(node),
            initializer,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, modifiers)
                .set(keys::TYPE, ty)
                .set(keys::FIELD, is_field)
                .build(),
        ))
    }
}

impl Grammar for PythonGrammar {
    fn name(&self) -> &'static str {
        "PythonAdapter"
    }

    fn language(&self) -> Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["python", "py"]
    }

    fn rules(&self) -> &'static SyntaxRules {
        &RULES
    }

    fn convert(&self, cx: &mut Converter<'_>, root: Node<'_>) -> Result<CodeNode, AdapterError> {
        let imports = self.imports(cx, root)?;
        let children = named_children(root)
            .into_iter()
            .flat_map(|child| self.member(cx, child, None))
            .collect();

        Ok(CodeNode::module(
            convert::module_name(cx.file()),
            cx.location(root),
            children,
            AttrsBuilder::new().list_if_any(keys::IMPORTS, imports).build(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LanguageAdapter;
    use crate::tree::NodeKind;

    async fn parse_python(source: &str) -> CodeNode {
        let result = new_adapter().parse(source, "python", "app/models.py").await;
        assert!(result.is_success(), "errors: {:?}", result.errors());
        result.into_root().unwrap()
    }

    #[tokio::test]
    async fn test_imports() {
        let root = parse_python(
            r#"
import os
import numpy as np
from typing import List
from . import sibling
"#,
        )
        .await;

        assert_eq!(root.name(), "models");
        let imports = root.attr_list(keys::IMPORTS);
        assert!(imports.contains(&"os".to_string()));
        assert!(imports.contains(&"numpy".to_string()));
        assert!(imports.contains(&"typing".to_string()));
        assert!(imports.contains(&".".to_string()));
    }

    #[tokio::test]
    async fn test_class_members() {
        let root = parse_python(
            r#"
class Repo(Base, Mixin, metaclass=Meta):
    """Stores things."""
    _instance = None

    def __init__(self, path: str, retries=3):
        self.path = path

    @staticmethod
    def build(name: str) -> "Repo":
        return Repo(name)

    def _reset(self):
        pass

    async def fetch(self, key):
        return await self.load(key)
"#,
        )
        .await;

        let class = &root.children()[0];
        assert_eq!(class.kind(), NodeKind::Class);
        assert_eq!(class.attr_str(keys::SUPERCLASS), Some("Base"));
        assert_eq!(class.attr_list(keys::SUPERTYPES), ["Mixin"]);
        assert!(class.attr_list(keys::INTERFACES).is_empty());

        let field = class.children_of_kind(NodeKind::Variable).next().unwrap();
        assert_eq!(field.name(), "_instance");
        assert!(field.has_modifier("static"));
        assert!(field.has_modifier("private"));
        assert_eq!(field.attr_bool(keys::FIELD), Some(true));

        let methods: Vec<_> = class.children_of_kind(NodeKind::Method).collect();
        assert_eq!(methods.len(), 4);

        let init = methods[0];
        assert_eq!(init.attr_bool(keys::CONSTRUCTOR), Some(true));
        assert_eq!(init.attr_str(keys::RETURN_TYPE), Some("Repo"));
        let params = init.attr_pairs(keys::PARAMETERS);
        assert_eq!(params.len(), 2, "self is dropped");
        assert_eq!(params[0]["name"], "path");
        assert_eq!(params[0]["type"], "str");
        assert_eq!(params[1]["type"], UNKNOWN_TYPE);

        let build = methods[1];
        assert!(build.has_modifier("static"));
        assert_eq!(build.attr_str(keys::RETURN_TYPE), Some("\"Repo\""));
        assert_eq!(build.attr_pairs(keys::PARAMETERS).len(), 1);

        assert!(methods[2].has_modifier("private"));
        assert!(methods[3].has_modifier("async"));
        assert_eq!(methods[3].attr_str(keys::RETURN_TYPE), Some(UNKNOWN_TYPE));
    }

    #[tokio::test]
    async fn test_module_level_functions_and_globals() {
        let root = parse_python(
            r#"
MAX_SIZE: int = 10

def helper(x):
    return x * 2
"#,
        )
        .await;

        let global = &root.children()[0];
        assert_eq!(global.kind(), NodeKind::Variable);
        assert_eq!(global.attr_bool(keys::FIELD), Some(false));
        assert_eq!(global.attr_str(keys::TYPE), Some("int"));

        let helper = &root.children()[1];
        assert_eq!(helper.kind(), NodeKind::Method);
        assert_eq!(helper.attr_bool(keys::CONSTRUCTOR), Some(false));
        assert_eq!(helper.children()[0].attr_str(keys::STATEMENT_TYPE), Some("return"));
    }

    #[tokio::test]
    async fn test_complexity_if_for_except() {
        let root = parse_python(
            r#"
def process(items):
    try:
        if items and len(items) > 1:
            return None
        for item in items:
            print(item)
    except ValueError:
        pass
"#,
        )
        .await;

        let method = &root.children()[0];
        assert_eq!(method.attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(4));
    }

    #[tokio::test]
    async fn test_elif_counts_as_branch() {
        let root = parse_python(
            r#"
def sign(x):
    if x > 0:
        return 1
    elif x < 0:
        return -1
    else:
        return 0
"#,
        )
        .await;

        assert_eq!(root.children()[0].attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(3));
    }

    #[tokio::test]
    async fn test_invalid_source_fails() {
        let adapter = new_adapter();
        let result = adapter.parse("def broken(:\n    pass", "python", "x.py").await;
        assert!(!result.is_success());
        assert!(!adapter.validate_syntax("def f(:", "python").await);
        assert!(adapter.validate_syntax("def f():\n    pass\n", "python").await);
    }
}
