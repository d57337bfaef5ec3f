//! Integration tests for the language adapters and the dispatcher.
//!
//! These tests parse the testdata fixtures through the public engine and
//! check the canonical trees they produce.

use std::path::PathBuf;

use codecanon::{keys, AnalysisEngine, CodeNode, LanguageAdapter, NodeKind, SourceFile};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(testdata_path().join(name)).expect("should read fixture")
}

async fn parse_fixture(engine: &AnalysisEngine, name: &str, language: &str) -> CodeNode {
    let result = engine.parse(&fixture(name), language, name).await;
    assert!(result.is_success(), "{}: {:?}", name, result.errors());
    result.into_root().expect("successful parse has a root")
}

fn child<'a>(node: &'a CodeNode, name: &str) -> &'a CodeNode {
    node.children()
        .iter()
        .find(|c| c.name() == name)
        .unwrap_or_else(|| panic!("no child named {}", name))
}

// =============================================================================
// Java
// =============================================================================

#[tokio::test]
#[cfg(feature = "tree-sitter")]
async fn test_java_fixture() {
    let engine = AnalysisEngine::new();
    let root = parse_fixture(&engine, "ConfigRegistry.java", "java").await;

    assert_eq!(root.kind(), NodeKind::Module);
    assert_eq!(root.name(), "ConfigRegistry");
    assert_eq!(root.attr_str(keys::PACKAGE), Some("com.acme.config"));
    assert_eq!(root.attr_list(keys::IMPORTS).len(), 2);

    let class = child(&root, "ConfigRegistry");
    assert_eq!(class.kind(), NodeKind::Class);

    let instance = child(class, "instance");
    assert_eq!(instance.kind(), NodeKind::Variable);
    assert!(instance.has_modifier("static"));
    assert_eq!(instance.attr_str(keys::TYPE), Some("ConfigRegistry"));

    let methods: Vec<&str> = class.children_of_kind(NodeKind::Method).map(|m| m.name()).collect();
    assert_eq!(methods, vec!["ConfigRegistry", "getInstance", "get"]);

    let ctor = child(class, "ConfigRegistry");
    assert_eq!(ctor.attr_bool(keys::CONSTRUCTOR), Some(true));
    assert!(ctor.has_modifier("private"));

    let get_instance = child(class, "getInstance");
    assert_eq!(get_instance.attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(2));
    assert_eq!(get_instance.children().len(), 2);
}

// =============================================================================
// Python
// =============================================================================

#[tokio::test]
#[cfg(feature = "tree-sitter")]
async fn test_python_fixture() {
    let engine = AnalysisEngine::new();
    let root = parse_fixture(&engine, "query_builder.py", "py").await;

    assert_eq!(root.name(), "query_builder");
    let class = child(&root, "QueryBuilder");
    let methods: Vec<&str> = class.children_of_kind(NodeKind::Method).map(|m| m.name()).collect();
    assert_eq!(methods, vec!["__init__", "table", "where", "build"]);

    let table = child(class, "table");
    let params = table.attr_pairs(keys::PARAMETERS);
    assert_eq!(params.len(), 1);
    assert_eq!(params[0]["type"], "str");

    assert_eq!(child(class, "build").attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(2));

    let factory = child(&root, "create_builder");
    assert_eq!(factory.kind(), NodeKind::Method);
    assert_eq!(factory.attr_str(keys::RETURN_TYPE), Some("QueryBuilder"));
}

#[tokio::test]
#[cfg(feature = "tree-sitter")]
async fn test_deep_nesting_is_collapsed() {
    let engine = AnalysisEngine::new();

    let terms: Vec<String> = (0..1500).map(|i| format!("\"s{}\"", i)).collect();
    let java = format!("class A {{ String s = {}; }}", terms.join(" + "));
    let python = format!("x = {}1{}\n", "(".repeat(1000), ")".repeat(1000));

    for (source, language) in [(java, "java"), (python, "python")] {
        let result = engine.parse(&source, language, "deep").await;
        assert!(result.is_success(), "{}: {:?}", language, result.errors());
        assert!(
            result
                .warnings()
                .iter()
                .any(|w| w.message().contains("nested deeper than 256 levels")),
            "{}: {:?}",
            language,
            result.warnings()
        );

        let root = result.root().unwrap();
        assert!(root.depth() < 270, "{}: depth {}", language, root.depth());
        assert!(root.walk().any(|n| n.kind() == NodeKind::Unclassified));
        assert!(engine.validate_syntax(&source, language).await);
    }
}

// =============================================================================
// TypeScript
// =============================================================================

#[tokio::test]
#[cfg(feature = "tree-sitter")]
async fn test_typescript_fixture_is_partial() {
    let engine = AnalysisEngine::new();
    let result = engine
        .parse(&fixture("event_bus.ts"), "typescript", "event_bus.ts")
        .await;
    assert!(result.is_success());
    assert_eq!(result.warnings().len(), 1, "type alias is unsupported");

    let root = result.root().unwrap();
    assert_eq!(root.attr_list(keys::IMPORTS), ["events"]);
    assert!(root
        .children()
        .iter()
        .any(|c| c.kind() == NodeKind::Unclassified));

    let class = child(root, "EventBus");
    assert!(class.has_modifier("export"));
    let handlers = child(class, "handlers");
    assert!(handlers.has_modifier("private"));
    assert_eq!(child(class, "publish").attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(2));
}

// =============================================================================
// Kotlin
// =============================================================================

#[tokio::test]
async fn test_kotlin_fixture() {
    let engine = AnalysisEngine::new();
    let result = engine.parse(&fixture("Registry.kt"), "kt", "Registry.kt").await;
    assert!(result.is_success(), "{:?}", result.errors());
    assert_eq!(result.warnings().len(), 1, "method bodies are not converted");

    let root = result.root().unwrap();
    assert_eq!(root.attr_str(keys::PACKAGE), Some("com.acme.registry"));

    let class = child(root, "Registry");
    let put = child(class, "put");
    assert!(put.children().is_empty());
    assert_eq!(put.attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(2));

    let get_instance = child(class, "getInstance");
    assert!(get_instance.has_modifier("static"));
}

// =============================================================================
// Dispatcher
// =============================================================================

#[tokio::test]
async fn test_unknown_language_is_a_diagnostic() {
    let engine = AnalysisEngine::new();
    let result = engine.parse("IDENTIFICATION DIVISION.", "cobol", "main.cbl").await;

    assert!(!result.is_success());
    assert!(result.root().is_none());
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].message(), "unsupported language: cobol");
    assert!(!engine.validate_syntax("x", "cobol").await);
    assert!(!engine.supports_language("cobol"));
}

#[tokio::test]
async fn test_validate_syntax_every_language() {
    let engine = AnalysisEngine::new();
    let mut cases: Vec<(&str, &str, &str)> = vec![("kotlin", "fun f() { g() }", "fun f() { g( }")];
    if cfg!(feature = "tree-sitter") {
        cases.push(("java", "class A { void f() {} }", "class A { void f() {"));
        cases.push(("python", "def f(x):\n    return x\n", "def f(:\n    return\n"));
        cases.push((
            "typescript",
            "function f(a: number) { return a; }",
            "function f(a: number { return a; }",
        ));
    }

    for (language, valid, invalid) in cases {
        assert!(engine.validate_syntax(valid, language).await, "{} valid", language);
        assert!(!engine.validate_syntax(invalid, language).await, "{} invalid", language);
    }
}

#[tokio::test]
async fn test_runtime_adapter_replacement() {
    let engine = AnalysisEngine::new();
    let removed = engine.dispatcher().remove_adapter("kt");
    assert!(removed.is_some());
    assert!(!engine.supports_language("kt"));
    assert!(engine.supports_language("kotlin"));

    engine.dispatcher().add_adapter("kts", removed.unwrap());
    assert!(engine.parse("val x = 1", "KTS", "build.kts").await.is_success());
    assert_eq!(engine.dispatcher().statistics()["kts"], "KotlinAdapter");
}

#[tokio::test]
async fn test_incremental_parse_reuses_file_path() {
    let engine = AnalysisEngine::new();
    let first = engine.parse("class A", "kotlin", "src/A.kt").await;
    let root = first.into_root().unwrap();

    let second = engine.incremental_parse(&root, "class A { fun f() {} }", "kotlin").await;
    assert!(second.is_success());
    assert_eq!(second.file_path(), "src/A.kt");
    assert_eq!(second.root().unwrap().location().file(), "src/A.kt");
    assert_eq!(
        engine.dispatcher().adapter_for("kotlin").unwrap().incremental_fidelity(),
        codecanon::IncrementalFidelity::FullReparse
    );
}

#[tokio::test]
async fn test_parse_all_fixtures() {
    let engine = AnalysisEngine::new();
    let mut files = vec![SourceFile::new(fixture("Registry.kt"), "kotlin", "Registry.kt")];
    if cfg!(feature = "tree-sitter") {
        files.push(SourceFile::new(fixture("ConfigRegistry.java"), "java", "ConfigRegistry.java"));
        files.push(SourceFile::new(fixture("query_builder.py"), "python", "query_builder.py"));
    }
    let count = files.len();

    let results = engine.parse_all(files).await;
    assert_eq!(results.len(), count);
    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(results[0].language(), "kotlin");
}
