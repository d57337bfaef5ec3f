//! Java adapter using tree-sitter.

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

use crate::adapter::convert::{self, SyntaxRules};
use crate::adapter::treesitter::{all_children, named_children, Converter, Grammar, TreeSitterAdapter};
use crate::adapter::AdapterError;
use crate::tree::{keys, parameter, AttrsBuilder, CodeNode, UNKNOWN_TYPE};

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
; import com.package.Class;
(import_declaration
  (scoped_identifier) @import_path
) @import

; import Class;
(import_declaration
  (identifier) @import_path
) @import
"#;

static RULES: SyntaxRules = SyntaxRules {
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "switch_label",
        "catch_clause",
    ],
    transparent_kinds: &["block", "constructor_body"],
    skip_kinds: &[],
    statement_kinds: &[
        "local_variable_declaration",
        "explicit_constructor_invocation",
        "catch_clause",
        "finally_clause",
        "switch_block_statement_group",
        "switch_rule",
    ],
    expression_kinds: &[
        "method_invocation",
        "field_access",
        "array_access",
        "this",
        "super",
        "true",
        "false",
    ],
    case_label_kinds: &["switch_label"],
};

/// Java grammar for the tree-sitter driver.
pub struct JavaGrammar;

/// Java adapter.
pub type JavaAdapter = TreeSitterAdapter<JavaGrammar>;

/// Create a new Java adapter.
pub fn new_adapter() -> JavaAdapter {
    TreeSitterAdapter::new(JavaGrammar)
}

impl JavaGrammar {
    fn package(&self, cx: &Converter<'_>, node: Node) -> Option<String> {
        named_children(node)
            .into_iter()
            .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
            .map(|n| cx.text(n).to_string())
    }

    fn imports(&self, cx: &Converter<'_>, root: Node) -> Result<Vec<String>, AdapterError> {
        let language = self.language();
        let query = Query::new(&language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, cx.source());

        let mut imports = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if query.capture_names()[capture.index as usize] == "import_path" {
                    let path = cx.text(capture.node).to_string();
                    if !imports.contains(&path) {
                        imports.push(path);
                    }
                }
            }
        }
        Ok(imports)
    }

    /// Keyword modifiers (`public`, `static`, ...); annotations are left out.
    fn modifiers(&self, node: Node) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "modifiers")
            .flat_map(all_children)
            .filter(|n| !n.is_named())
            .map(|n| n.kind().to_string())
            .collect()
    }

    fn type_list(&self, cx: &Converter<'_>, node: Option<Node>) -> Vec<String> {
        let Some(node) = node else {
            return Vec::new();
        };
        let list = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "type_list");
        match list {
            Some(list) => named_children(list)
                .into_iter()
                .map(|n| convert::squash_whitespace(cx.text(n)))
                .collect(),
            None => Vec::new(),
        }
    }

    fn class(&self, cx: &mut Converter<'_>, node: Node) -> CodeNode {
        let name = cx.field_text(node, "name").unwrap_or_default();
        let class_kind = match node.kind() {
            "interface_declaration" => "interface",
            "enum_declaration" => "enum",
            _ => "class",
        };

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|s| s.named_child(0))
            .map(|t| convert::squash_whitespace(cx.text(t)));

        let mut interfaces = self.type_list(cx, node.child_by_field_name("interfaces"));
        let extends_interfaces = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "extends_interfaces");
        interfaces.extend(self.type_list(cx, extends_interfaces));

        let children = match node.child_by_field_name("body") {
            Some(body) => self.members(cx, body, &name),
            None => Vec::new(),
        };

        CodeNode::class(
            name,
            cx.location(node),
            children,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, self.modifiers(node))
                .set(keys::CLASS_KIND, class_kind)
                .str_if_some(keys::SUPERCLASS, superclass)
                .set(keys::INTERFACES, interfaces)
                .build(),
        )
    }

    fn members(&self, cx: &mut Converter<'_>, body: Node, class_name: &str) -> Vec<CodeNode> {
        let mut members = Vec::new();
        for member in named_children(body) {
            match member.kind() {
                "method_declaration" => members.push(self.method(cx, member, None)),
                "constructor_declaration" | "compact_constructor_declaration" => {
                    members.push(self.method(cx, member, Some(class_name)))
                }
                "field_declaration" | "constant_declaration" => {
                    members.extend(self.fields(cx, member))
                }
                "class_declaration" | "interface_declaration" | "enum_declaration" => {
                    members.push(self.class(cx, member))
                }
                "enum_body_declarations" => members.extend(self.members(cx, member, class_name)),
                "enum_constant" => members.push(CodeNode::variable(
                    cx.field_text(member, "name").unwrap_or_default(),
                    cx.location(member),
                    Vec::new(),
                    AttrsBuilder::new()
                        .set(
                            keys::MODIFIERS,
                            vec!["public".to_string(), "static".to_string(), "final".to_string()],
                        )
                        .set(keys::TYPE, class_name)
                        .set(keys::FIELD, true)
                        .build(),
                )),
                kind if kind.contains("comment") => {}
                _ => members.push(cx.unclassified(member)),
            }
        }
        members
    }

    /// Convert a method or, when `constructor_of` is set, a constructor.
    fn method(&self, cx: &mut Converter<'_>, node: Node, constructor_of: Option<&str>) -> CodeNode {
        let name = cx.field_text(node, "name").unwrap_or_default();
        let return_type = match constructor_of {
            Some(class_name) => class_name.to_string(),
            None => cx
                .field_text(node, "type")
                .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
        };

        let parameters = node
            .child_by_field_name("parameters")
            .map(|params| self.parameters(cx, params))
            .unwrap_or_default();

        let throws: Vec<String> = named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "throws")
            .flat_map(named_children)
            .map(|t| convert::squash_whitespace(cx.text(t)))
            .collect();

        let body = node.child_by_field_name("body");
        let complexity = cx.complexity(body);
        let statements = cx.body(body);

        CodeNode::method(
            name,
            cx.location(node),
            statements,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, self.modifiers(node))
                .set(keys::RETURN_TYPE, return_type)
                .set(keys::PARAMETERS, parameters)
                .list_if_any(keys::THROWS, throws)
                .set(keys::CYCLOMATIC_COMPLEXITY, complexity)
                .set(keys::CONSTRUCTOR, constructor_of.is_some())
                .build(),
        )
    }

    fn parameters(
        &self,
        cx: &Converter<'_>,
        params: Node,
    ) -> Vec<std::collections::BTreeMap<String, String>> {
        let mut out = Vec::new();
        for param in named_children(params) {
            match param.kind() {
                "formal_parameter" => {
                    let name = cx.field_text(param, "name").unwrap_or_default();
                    let ty = cx
                        .field_text(param, "type")
                        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
                    out.push(parameter(name, ty));
                }
                "spread_parameter" => {
                    let parts = named_children(param);
                    let ty = parts
                        .iter()
                        .find(|n| !matches!(n.kind(), "modifiers" | "variable_declarator"))
                        .map(|n| format!("{}...", cx.text(*n)))
                        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
                    let name = parts
                        .iter()
                        .find(|n| n.kind() == "variable_declarator")
                        .and_then(|d| cx.field_text(*d, "name"))
                        .unwrap_or_default();
                    out.push(parameter(name, ty));
                }
                _ => {}
            }
        }
        out
    }

    /// One `Variable` per declarator of a field declaration.
    fn fields(&self, cx: &mut Converter<'_>, node: Node) -> Vec<CodeNode> {
        let modifiers = self.modifiers(node);
        let ty = cx
            .field_text(node, "type")
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string());

        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut node.walk())
            .collect();

        declarators
            .into_iter()
            .map(|declarator| {
                let initializer = declarator
                    .child_by_field_name("value")
                    .map(|value| cx.syntax(value))
                    .unwrap_or_default();
                CodeNode::variable(
                    cx.field_text(declarator, "name").unwrap_or_default(),
                    cx.location(declarator),
                    initializer,
                    AttrsBuilder::new()
                        .set(keys::MODIFIERS, modifiers.clone())
                        .set(keys::TYPE, ty.clone())
                        .set(keys::FIELD, true)
                        .build(),
                )
            })
            .collect()
    }
}

impl Grammar for JavaGrammar {
    fn name(&self) -> &'static str {
        "JavaAdapter"
    }

    fn language(&self) -> Language {
        tree_sitter_java::LANGUAGE.into()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn rules(&self) -> &'static SyntaxRules {
        &RULES
    }

    fn convert(&self, cx: &mut Converter<'_>, root: Node<'_>) -> Result<CodeNode, AdapterError> {
        let imports = self.imports(cx, root)?;
        let mut package = None;
        let mut children = Vec::new();

        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => package = self.package(cx, child),
                "import_declaration" => {}
                "class_declaration" | "interface_declaration" | "enum_declaration" => {
                    children.push(self.class(cx, child))
                }
                kind if kind.contains("comment") => {}
                kind => {
                    cx.warn(child, format!("unsupported declaration `{}`", kind));
                    children.push(cx.unclassified(child));
                }
            }
        }

        Ok(CodeNode::module(
            convert::module_name(cx.file()),
            cx.location(root),
            children,
            AttrsBuilder::new()
                .str_if_some(keys::PACKAGE, package)
                .list_if_any(keys::IMPORTS, imports)
                .build(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LanguageAdapter;
    use crate::tree::NodeKind;

    async fn parse_java(source: &str) -> CodeNode {
        let result = new_adapter().parse(source, "java", "Test.java").await;
        assert!(result.is_success(), "errors: {:?}", result.errors());
        result.into_root().unwrap()
    }

    #[tokio::test]
    async fn test_package_and_imports() {
        let root = parse_java(
            r#"
package com.example;

import java.util.List;
import java.util.Map;

public class Test {}
"#,
        )
        .await;

        assert_eq!(root.kind(), NodeKind::Module);
        assert_eq!(root.name(), "Test");
        assert_eq!(root.attr_str(keys::PACKAGE), Some("com.example"));
        let imports = root.attr_list(keys::IMPORTS);
        assert!(imports.contains(&"java.util.List".to_string()));
        assert!(imports.contains(&"java.util.Map".to_string()));
    }

    #[tokio::test]
    async fn test_class_attributes() {
        let root = parse_java(
            r#"
public final class Repo extends Base implements Store, Closeable {
    private static int count = 0;

    public Repo() {}

    protected String find(int id, String... keys) throws IOException {
        return null;
    }
}
"#,
        )
        .await;

        let class = &root.children()[0];
        assert_eq!(class.kind(), NodeKind::Class);
        assert_eq!(class.name(), "Repo");
        assert!(class.has_modifier("public"));
        assert!(class.has_modifier("final"));
        assert_eq!(class.attr_str(keys::SUPERCLASS), Some("Base"));
        assert_eq!(class.attr_list(keys::INTERFACES), ["Store", "Closeable"]);

        let field = class.children_of_kind(NodeKind::Variable).next().unwrap();
        assert_eq!(field.name(), "count");
        assert_eq!(field.attr_str(keys::TYPE), Some("int"));
        assert_eq!(field.attr_bool(keys::FIELD), Some(true));
        assert!(field.has_modifier("static"));
        assert_eq!(field.children().len(), 1, "initializer becomes the only child");

        let methods: Vec<_> = class.children_of_kind(NodeKind::Method).collect();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name(), "Repo");
        assert_eq!(methods[0].attr_bool(keys::CONSTRUCTOR), Some(true));

        let find = methods[1];
        assert_eq!(find.attr_str(keys::RETURN_TYPE), Some("String"));
        assert_eq!(find.attr_list(keys::THROWS), ["IOException"]);
        let params = find.attr_pairs(keys::PARAMETERS);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0]["name"], "id");
        assert_eq!(params[0]["type"], "int");
        assert_eq!(params[1]["type"], "String...");
    }

    #[tokio::test]
    async fn test_complexity_if_for_catch() {
        let root = parse_java(
            r#"
class Test {
    void run(int[] xs) {
        try {
            if (xs.length > 0 && xs[0] > 1) {
                return;
            }
            for (int i = 0; i < xs.length; i++) {
                System.out.println(i);
            }
        } catch (Exception e) {
            System.out.println("fail");
        }
    }
}
"#,
        )
        .await;

        let method = root.children()[0].children_of_kind(NodeKind::Method).next().unwrap();
        assert_eq!(method.attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(4));
    }

    #[tokio::test]
    async fn test_complexity_counts_each_case_label() {
        let root = parse_java(
            r#"
class Test {
    int size(int n) {
        switch (n) {
            case 1:
            case 2:
                return 1;
            case 3:
                return 2;
            default:
                return 0;
        }
    }
}
"#,
        )
        .await;

        let method = root.children()[0].children_of_kind(NodeKind::Method).next().unwrap();
        assert_eq!(method.attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(4));
    }

    #[tokio::test]
    async fn test_statements_are_normalized() {
        let root = parse_java(
            r#"
class Test {
    int pick(int x) {
        int y = x * 2;
        while (y > 10) { y--; }
        return y;
    }
}
"#,
        )
        .await;

        let method = root.children()[0].children_of_kind(NodeKind::Method).next().unwrap();
        let kinds: Vec<_> = method
            .children()
            .iter()
            .map(|s| s.attr_str(keys::STATEMENT_TYPE).unwrap_or(""))
            .collect();
        assert_eq!(kinds, vec!["local_variable_declaration", "while", "return"]);
    }

    #[tokio::test]
    async fn test_enum_constants_are_static_fields() {
        let root = parse_java("enum Status { ACTIVE, INACTIVE; int code() { return 1; } }").await;
        let class = &root.children()[0];
        assert_eq!(class.attr_str(keys::CLASS_KIND), Some("enum"));
        assert_eq!(class.children_of_kind(NodeKind::Variable).count(), 2);
        assert_eq!(class.children_of_kind(NodeKind::Method).count(), 1);
    }

    #[tokio::test]
    async fn test_unbalanced_braces_fail() {
        let result = new_adapter().parse("class A {", "java", "A.java").await;
        assert!(!result.is_success());
        assert!(!result.errors().is_empty());
        assert!(!new_adapter().validate_syntax("class A {", "java").await);
        assert!(new_adapter().validate_syntax("class A {}", "java").await);
    }
}
