//! TypeScript adapter using tree-sitter.

use std::collections::{BTreeMap, HashSet};

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

use crate::adapter::convert::{self, SyntaxRules};
use crate::adapter::treesitter::{all_children, named_children, Converter, Grammar, TreeSitterAdapter};
use crate::adapter::AdapterError;
use crate::tree::{keys, parameter, AttrsBuilder, CodeNode, UNKNOWN_TYPE};

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
; import x from 'module'
; import { x } from 'module'
; import type { x } from 'module'
(import_statement
  source: (string) @import_source
) @import

; require('module')
(call_expression
  function: (identifier) @require_func (#eq? @require_func "require")
  arguments: (arguments (string) @require_source)
) @require

; export * from 'module'
(export_statement
  source: (string) @reexport_source
) @reexport
"#;

static RULES: SyntaxRules = SyntaxRules {
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
    ],
    transparent_kinds: &["statement_block"],
    skip_kinds: &[],
    statement_kinds: &[
        "lexical_declaration",
        "variable_declaration",
        "else_clause",
        "catch_clause",
        "finally_clause",
        "switch_case",
        "switch_default",
    ],
    expression_kinds: &[
        "string",
        "number",
        "template_string",
        "true",
        "false",
        "null",
        "undefined",
        "this",
        "super",
        "arrow_function",
        "array",
        "object",
    ],
    case_label_kinds: &[],
};

/// Keyword tokens that appear as anonymous children of declarations.
const MODIFIER_TOKENS: &[&str] = &[
    "static", "async", "readonly", "abstract", "declare", "get", "set",
];

/// TypeScript grammar for the tree-sitter driver.
pub struct TypeScriptGrammar;

/// TypeScript adapter.
pub type TypeScriptAdapter = TreeSitterAdapter<TypeScriptGrammar>;

/// Create a new TypeScript adapter.
pub fn new_adapter() -> TypeScriptAdapter {
    TreeSitterAdapter::new(TypeScriptGrammar)
}

/// Strip the leading `:` of a type annotation.
fn annotation_text(cx: &Converter<'_>, annotation: Option<Node>) -> Option<String> {
    annotation.map(|a| {
        let text = convert::squash_whitespace(cx.text(a));
        text.trim_start_matches(':').trim().to_string()
    })
}

/// Prepend `export` to a declaration's modifiers.
fn exported(node: CodeNode) -> CodeNode {
    let mut modifiers = vec!["export".to_string()];
    modifiers.extend(node.attr_list(keys::MODIFIERS).iter().cloned());
    node.with_attribute(keys::MODIFIERS, modifiers)
}

impl TypeScriptGrammar {
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
                if matches!(name, "import_source" | "require_source" | "reexport_source") {
                    let path = cx
                        .text(capture.node)
                        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                        .to_string();
                    if seen_paths.insert(path.clone()) {
                        imports.push(path);
                    }
                }
            }
        }
        Ok(imports)
    }

    /// Accessibility and keyword modifiers of a member or declaration.
    fn modifiers(&self, cx: &Converter<'_>, node: Node) -> Vec<String> {
        let mut modifiers = Vec::new();
        for child in all_children(node) {
            match child.kind() {
                "accessibility_modifier" => modifiers.push(cx.text(child).to_string()),
                "override_modifier" => modifiers.push("override".to_string()),
                kind if !child.is_named() && MODIFIER_TOKENS.contains(&kind) => {
                    modifiers.push(kind.to_string())
                }
                _ => {}
            }
        }
        modifiers
    }

    /// Convert a module-level declaration or statement.
    fn top_level(&self, cx: &mut Converter<'_>, node: Node) -> Vec<CodeNode> {
        match node.kind() {
            "import_statement" => Vec::new(),
            "export_statement" => match node.child_by_field_name("declaration") {
                Some(declaration) => self
                    .top_level(cx, declaration)
                    .into_iter()
                    .map(exported)
                    .collect(),
                None => Vec::new(),
            },
            "class_declaration" | "abstract_class_declaration" => vec![self.class(cx, node)],
            "interface_declaration" => vec![self.interface(cx, node)],
            "function_declaration" | "generator_function_declaration" => {
                let name = cx.field_text(node, "name").unwrap_or_default();
                vec![self.function(cx, node, name, self.modifiers(cx, node), None)]
            }
            "lexical_declaration" | "variable_declaration" => self.declarators(cx, node),
            "enum_declaration"
            | "type_alias_declaration"
            | "module"
            | "internal_module"
            | "ambient_declaration" => {
                cx.warn(node, format!("unsupported declaration `{}`", node.kind()));
                vec![cx.unclassified(node)]
            }
            _ => cx.syntax(node),
        }
    }

    fn class(&self, cx: &mut Converter<'_>, node: Node) -> CodeNode {
        let name = cx.field_text(node, "name").unwrap_or_default();
        let mut modifiers = self.modifiers(cx, node);
        if node.kind() == "abstract_class_declaration" && !modifiers.iter().any(|m| m == "abstract") {
            modifiers.push("abstract".to_string());
        }

        let mut superclass = None;
        let mut interfaces = Vec::new();
        if let Some(heritage) = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "class_heritage")
        {
            for clause in named_children(heritage) {
                match clause.kind() {
                    "extends_clause" => {
                        superclass = clause
                            .child_by_field_name("value")
                            .map(|v| convert::squash_whitespace(cx.text(v)));
                    }
                    "implements_clause" => interfaces.extend(
                        named_children(clause)
                            .into_iter()
                            .map(|t| convert::squash_whitespace(cx.text(t))),
                    ),
                    _ => {}
                }
            }
        }

        let children = match node.child_by_field_name("body") {
            Some(body) => self.class_members(cx, body, &name),
            None => Vec::new(),
        };

        CodeNode::class(
            name,
            cx.location(node),
            children,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, modifiers)
                .set(keys::CLASS_KIND, "class")
                .str_if_some(keys::SUPERCLASS, superclass)
                .set(keys::INTERFACES, interfaces)
                .build(),
        )
    }

    fn class_members(&self, cx: &mut Converter<'_>, body: Node, class_name: &str) -> Vec<CodeNode> {
        let mut members = Vec::new();
        for member in named_children(body) {
            match member.kind() {
                "method_definition" | "method_signature" | "abstract_method_signature" => {
                    let name = cx.field_text(member, "name").unwrap_or_default();
                    let constructor_of = (name == "constructor").then_some(class_name);
                    let modifiers = self.modifiers(cx, member);
                    members.push(self.function(cx, member, name, modifiers, constructor_of));
                }
                "public_field_definition" | "property_signature" => {
                    members.push(self.field(cx, member, true))
                }
                "decorator" => {}
                kind if kind.contains("comment") => {}
                _ => members.push(cx.unclassified(member)),
            }
        }
        members
    }

    /// Interfaces become `Class` nodes with `classKind = interface`.
    fn interface(&self, cx: &mut Converter<'_>, node: Node) -> CodeNode {
        let name = cx.field_text(node, "name").unwrap_or_default();
        let extends: Vec<String> = named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "extends_type_clause")
            .flat_map(named_children)
            .map(|t| convert::squash_whitespace(cx.text(t)))
            .collect();

        let children = match node.child_by_field_name("body") {
            Some(body) => self.class_members(cx, body, &name),
            None => Vec::new(),
        };

        CodeNode::class(
            name,
            cx.location(node),
            children,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, self.modifiers(cx, node))
                .set(keys::CLASS_KIND, "interface")
                .set(keys::INTERFACES, extends)
                .build(),
        )
    }

    /// Convert anything with a call signature: methods, functions and arrow
    /// functions bound to a name.
    fn function(
        &self,
        cx: &mut Converter<'_>,
        node: Node,
        name: String,
        mut modifiers: Vec<String>,
        constructor_of: Option<&str>,
    ) -> CodeNode {
        if all_children(node).iter().any(|n| n.kind() == "async") && !modifiers.iter().any(|m| m == "async") {
            modifiers.push("async".to_string());
        }

        let return_type = match constructor_of {
            Some(class_name) => class_name.to_string(),
            None => annotation_text(cx, node.child_by_field_name("return_type"))
                .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
        };

        let parameters = match node.child_by_field_name("parameters") {
            Some(params) => self.parameters(cx, params),
            // `x => ...` has a bare `parameter` field.
            None => node
                .child_by_field_name("parameter")
                .map(|p| vec![parameter(cx.text(p), UNKNOWN_TYPE)])
                .unwrap_or_default(),
        };

        let body = node.child_by_field_name("body");
        let complexity = cx.complexity(body);
        let statements = match body {
            Some(b) if b.kind() == "statement_block" => cx.body(Some(b)),
            Some(b) => cx.syntax(b),
            None => Vec::new(),
        };

        CodeNode::method(
            name,
            cx.location(node),
            statements,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, modifiers)
                .set(keys::RETURN_TYPE, return_type)
                .set(keys::PARAMETERS, parameters)
                .set(keys::CYCLOMATIC_COMPLEXITY, complexity)
                .set(keys::CONSTRUCTOR, constructor_of.is_some())
                .build(),
        )
    }

    fn parameters(&self, cx: &Converter<'_>, params: Node) -> Vec<BTreeMap<String, String>> {
        named_children(params)
            .into_iter()
            .filter(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))
            .map(|p| {
                let name = cx.field_text(p, "pattern").unwrap_or_default();
                let ty = annotation_text(cx, p.child_by_field_name("type"))
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
                parameter(name, ty)
            })
            .collect()
    }

    fn field(&self, cx: &mut Converter<'_>, node: Node, is_field: bool) -> CodeNode {
        let name = cx.field_text(node, "name").unwrap_or_default();
        let ty = annotation_text(cx, node.child_by_field_name("type"))
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
        let initializer = node
            .child_by_field_name("value")
            .map(|value| cx.syntax(value))
            .unwrap_or_default();

        CodeNode::variable(
            name,
            cx.location(node),
            initializer,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, self.modifiers(cx, node))
                .set(keys::TYPE, ty)
                .set(keys::FIELD, is_field)
                .build(),
        )
    }

    /// `const f = () => {}` becomes a `Method`; other declarators become
    /// module-level `Variable`s.
    fn declarators(&self, cx: &mut Converter<'_>, node: Node) -> Vec<CodeNode> {
        let keyword = all_children(node)
            .into_iter()
            .find(|n| matches!(n.kind(), "const" | "let" | "var"))
            .map(|n| n.kind().to_string());

        let mut out = Vec::new();
        for declarator in named_children(node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let value = declarator.child_by_field_name("value");
            match value {
                Some(v) if matches!(v.kind(), "arrow_function" | "function_expression") => {
                    let name = cx.field_text(declarator, "name").unwrap_or_default();
                    let modifiers: Vec<String> = keyword.iter().cloned().collect();
                    out.push(self.function(cx, v, name, modifiers, None));
                }
                _ => {
                    let mut var = self.field(cx, declarator, false);
                    if let Some(keyword) = &keyword {
                        var = var.with_attribute(keys::MODIFIERS, vec![keyword.clone()]);
                    }
                    out.push(var);
                }
            }
        }
        out
    }
}

impl Grammar for TypeScriptGrammar {
    fn name(&self) -> &'static str {
        "TypeScriptAdapter"
    }

    fn language(&self) -> Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["typescript", "ts"]
    }

    fn rules(&self) -> &'static SyntaxRules {
        &RULES
    }

    fn convert(&self, cx: &mut Converter<'_>, root: Node<'_>) -> Result<CodeNode, AdapterError> {
        let imports = self.imports(cx, root)?;
        let children = named_children(root)
            .into_iter()
            .flat_map(|child| self.top_level(cx, child))
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

    async fn parse_ts(source: &str) -> crate::adapter::ParseResult {
        new_adapter().parse(source, "typescript", "src/service.ts").await
    }

    async fn parse_ok(source: &str) -> CodeNode {
        let result = parse_ts(source).await;
        assert!(result.is_success(), "errors: {:?}", result.errors());
        result.into_root().unwrap()
    }

    #[tokio::test]
    async fn test_imports() {
        let root = parse_ok(
            r#"
import { Injectable } from '@angular/core';
import * as fs from "fs";
const path = require('path');
export * from './models';
"#,
        )
        .await;

        let imports = root.attr_list(keys::IMPORTS);
        assert!(imports.contains(&"@angular/core".to_string()));
        assert!(imports.contains(&"fs".to_string()));
        assert!(imports.contains(&"path".to_string()));
        assert!(imports.contains(&"./models".to_string()));
    }

    #[tokio::test]
    async fn test_exported_class() {
        let root = parse_ok(
            r#"
export class UserService extends BaseService implements Disposable {
    private static instance: UserService;
    private readonly cache: Map<string, User> = new Map();

    private constructor(private repo: Repo) {
        super();
    }

    static getInstance(): UserService {
        return UserService.instance;
    }

    async find(id: number, name?: string): Promise<User> {
        return this.repo.find(id);
    }
}
"#,
        )
        .await;

        let class = &root.children()[0];
        assert_eq!(class.kind(), NodeKind::Class);
        assert_eq!(class.name(), "UserService");
        assert!(class.has_modifier("export"));
        assert_eq!(class.attr_str(keys::SUPERCLASS), Some("BaseService"));
        assert_eq!(class.attr_list(keys::INTERFACES), ["Disposable"]);

        let fields: Vec<_> = class.children_of_kind(NodeKind::Variable).collect();
        assert_eq!(fields.len(), 2);
        assert!(fields[0].has_modifier("private"));
        assert!(fields[0].has_modifier("static"));
        assert_eq!(fields[0].attr_str(keys::TYPE), Some("UserService"));
        assert_eq!(fields[1].attr_str(keys::TYPE), Some("Map<string, User>"));
        assert_eq!(fields[1].children().len(), 1);

        let methods: Vec<_> = class.children_of_kind(NodeKind::Method).collect();
        assert_eq!(methods.len(), 3);
        assert_eq!(methods[0].attr_bool(keys::CONSTRUCTOR), Some(true));
        assert!(methods[0].has_modifier("private"));
        assert_eq!(methods[0].attr_str(keys::RETURN_TYPE), Some("UserService"));

        assert!(methods[1].has_modifier("static"));
        assert_eq!(methods[1].attr_str(keys::RETURN_TYPE), Some("UserService"));

        let find = methods[2];
        assert!(find.has_modifier("async"));
        assert_eq!(find.attr_str(keys::RETURN_TYPE), Some("Promise<User>"));
        let params = find.attr_pairs(keys::PARAMETERS);
        assert_eq!(params[0]["name"], "id");
        assert_eq!(params[0]["type"], "number");
        assert_eq!(params[1]["type"], "string");
    }

    #[tokio::test]
    async fn test_module_functions() {
        let root = parse_ok(
            r#"
export function add(a: number, b: number): number {
    return a + b;
}

const double = (x: number) => x * 2;
let counter = 0;
"#,
        )
        .await;

        let kinds: Vec<_> = root.children().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![NodeKind::Method, NodeKind::Method, NodeKind::Variable]);
        assert!(root.children()[0].has_modifier("export"));
        assert_eq!(root.children()[1].name(), "double");
        assert_eq!(root.children()[1].attr_str(keys::RETURN_TYPE), Some(UNKNOWN_TYPE));
        assert_eq!(root.children()[2].attr_bool(keys::FIELD), Some(false));
    }

    #[tokio::test]
    async fn test_interface() {
        let root = parse_ok(
            r#"
interface Shape extends Named {
    area(): number;
    sides: number;
}
"#,
        )
        .await;

        let iface = &root.children()[0];
        assert_eq!(iface.kind(), NodeKind::Class);
        assert_eq!(iface.attr_str(keys::CLASS_KIND), Some("interface"));
        assert_eq!(iface.attr_list(keys::INTERFACES), ["Named"]);
        assert_eq!(iface.children_of_kind(NodeKind::Method).count(), 1);
        assert_eq!(iface.children_of_kind(NodeKind::Variable).count(), 1);
    }

    #[tokio::test]
    async fn test_complexity_if_for_catch() {
        let root = parse_ok(
            r#"
function run(xs: number[]): void {
    try {
        if (xs.length > 0 || xs[0] === 1) {
            return;
        }
        for (const x of xs) {
            console.log(x);
        }
    } catch (e) {
        console.error(e);
    }
}
"#,
        )
        .await;

        assert_eq!(root.children()[0].attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(4));
    }

    #[tokio::test]
    async fn test_enum_is_partial_success() {
        let result = parse_ts("enum Color { Red, Green }\nfunction f() {}\n").await;
        assert!(result.is_success());
        assert_eq!(result.warnings().len(), 1);
        let root = result.root().unwrap();
        assert_eq!(root.children()[0].kind(), NodeKind::Unclassified);
        assert_eq!(root.children()[1].kind(), NodeKind::Method);
    }

    #[tokio::test]
    async fn test_validate_syntax() {
        let adapter = new_adapter();
        assert!(!adapter.validate_syntax("function f( {", "typescript").await);
        assert!(adapter.validate_syntax("const x: number = 1;", "typescript").await);
    }
}
