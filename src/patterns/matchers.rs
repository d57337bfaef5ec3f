//! Built-in matchers.
//!
//! Each matcher is a pure function of one node and a language tag. Matchers
//! look at a node and its immediate children only; tree-wide detection is a
//! walk that applies every matcher to every node.

use crate::tree::{keys, CodeNode, NodeKind};

use super::MatchOutcome;

/// Fixed confidences. Changing them changes detection output.
pub const SINGLETON_CONFIDENCE: f64 = 0.8;
pub const FACTORY_CONFIDENCE: f64 = 0.7;
pub const GOD_CLASS_CONFIDENCE: f64 = 0.7;
pub const LONG_METHOD_CONFIDENCE: f64 = 0.8;
pub const OBSERVER_CONFIDENCE: f64 = 0.75;
pub const BUILDER_CONFIDENCE: f64 = 0.75;
pub const STRATEGY_CONFIDENCE: f64 = 0.6;
pub const HIGH_COMPLEXITY_CONFIDENCE: f64 = 0.6;

/// A class with more methods than this is a god class.
pub const GOD_CLASS_MAX_METHODS: usize = 20;

/// A method with more statements than this is too long.
pub const LONG_METHOD_MAX_CHILDREN: usize = 30;

/// A method with a cyclomatic complexity above this is too complex.
pub const HIGH_COMPLEXITY_THRESHOLD: i64 = 10;

/// Normalize a declared type for comparison with a class name:
/// `Registry?` and `"Registry"` both read as `Registry`.
fn bare_type(ty: &str) -> &str {
    ty.trim()
        .trim_end_matches('?')
        .trim_matches(|c| c == '"' || c == '\'')
}

fn methods(class: &CodeNode) -> impl Iterator<Item = &CodeNode> {
    class.children_of_kind(NodeKind::Method)
}

fn is_static(node: &CodeNode) -> bool {
    node.has_modifier("static") || node.has_modifier("classmethod")
}

fn is_constructor_of(method: &CodeNode, class_name: &str) -> bool {
    method.attr_bool(keys::CONSTRUCTOR).unwrap_or(false) || method.name() == class_name
}

fn returns(method: &CodeNode, class_name: &str) -> bool {
    method
        .attr_str(keys::RETURN_TYPE)
        .is_some_and(|ty| bare_type(ty) == class_name)
}

/// A private constructor-like method plus a static member typed as the
/// class itself (a field, or a static accessor returning the class).
pub fn singleton(node: &CodeNode, _language: &str) -> MatchOutcome {
    if node.kind() != NodeKind::Class || node.name().is_empty() {
        return MatchOutcome::MISS;
    }
    let class_name = node.name();

    let private_constructor = methods(node)
        .any(|m| is_constructor_of(m, class_name) && m.has_modifier("private"));

    let static_self = node.children().iter().any(|member| match member.kind() {
        NodeKind::Variable => {
            is_static(member)
                && member
                    .attr_str(keys::TYPE)
                    .is_some_and(|ty| bare_type(ty) == class_name)
        }
        NodeKind::Method => {
            is_static(member) && !is_constructor_of(member, class_name) && returns(member, class_name)
        }
        _ => false,
    });

    if private_constructor && static_self {
        MatchOutcome::hit(SINGLETON_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}

fn is_factory_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("create") || lower.contains("factory")
}

/// A method named `create*` / `*factory*`, or a class or module owning one.
pub fn factory(node: &CodeNode, _language: &str) -> MatchOutcome {
    let matched = match node.kind() {
        NodeKind::Method => is_factory_name(node.name()),
        NodeKind::Class | NodeKind::Module => methods(node).any(|m| is_factory_name(m.name())),
        _ => false,
    };
    if matched {
        MatchOutcome::hit(FACTORY_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}

/// A class with more than [`GOD_CLASS_MAX_METHODS`] methods.
pub fn god_class(node: &CodeNode, _language: &str) -> MatchOutcome {
    if node.kind() == NodeKind::Class && methods(node).count() > GOD_CLASS_MAX_METHODS {
        MatchOutcome::hit(GOD_CLASS_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}

/// A method with more than [`LONG_METHOD_MAX_CHILDREN`] statements.
pub fn long_method(node: &CodeNode, _language: &str) -> MatchOutcome {
    if node.kind() == NodeKind::Method && node.children().len() > LONG_METHOD_MAX_CHILDREN {
        MatchOutcome::hit(LONG_METHOD_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}

fn is_subscribe_name(lower: &str) -> bool {
    (lower.starts_with("add") && lower.ends_with("listener"))
        || lower.starts_with("register")
        || lower == "subscribe"
        || lower == "attach"
        || lower == "on"
}

fn is_notify_name(lower: &str) -> bool {
    lower.starts_with("notify")
        || lower.starts_with("fire")
        || lower == "emit"
        || lower == "publish"
}

/// A class that both accepts subscribers and notifies them.
pub fn observer(node: &CodeNode, _language: &str) -> MatchOutcome {
    if node.kind() != NodeKind::Class {
        return MatchOutcome::MISS;
    }
    let names: Vec<String> = methods(node).map(|m| m.name().to_lowercase()).collect();
    let subscribes = names.iter().any(|n| is_subscribe_name(n));
    let notifies = names.iter().any(|n| is_notify_name(n));
    if subscribes && notifies {
        MatchOutcome::hit(OBSERVER_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}

/// A class with a `build` method and at least two other methods returning
/// the class's own type.
pub fn builder(node: &CodeNode, _language: &str) -> MatchOutcome {
    if node.kind() != NodeKind::Class || node.name().is_empty() {
        return MatchOutcome::MISS;
    }
    let class_name = node.name();
    let has_build = methods(node).any(|m| m.name().eq_ignore_ascii_case("build"));
    let fluent = methods(node)
        .filter(|m| !m.name().eq_ignore_ascii_case("build"))
        .filter(|m| !is_constructor_of(m, class_name))
        .filter(|m| returns(m, class_name))
        .count();
    if has_build && fluent >= 2 {
        MatchOutcome::hit(BUILDER_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}

fn is_strategy_name(name: &str) -> bool {
    let bare = name.split('<').next().unwrap_or(name).trim();
    bare.ends_with("Strategy") || bare.ends_with("Policy")
}

/// A class named, or deriving from a type named, `*Strategy` / `*Policy`.
pub fn strategy(node: &CodeNode, _language: &str) -> MatchOutcome {
    if node.kind() != NodeKind::Class {
        return MatchOutcome::MISS;
    }
    let matched = is_strategy_name(node.name())
        || node.attr_str(keys::SUPERCLASS).is_some_and(is_strategy_name)
        || node.attr_list(keys::SUPERTYPES).iter().any(|t| is_strategy_name(t))
        || node.attr_list(keys::INTERFACES).iter().any(|t| is_strategy_name(t));
    if matched {
        MatchOutcome::hit(STRATEGY_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}

/// A method whose precomputed complexity exceeds [`HIGH_COMPLEXITY_THRESHOLD`].
pub fn high_complexity(node: &CodeNode, _language: &str) -> MatchOutcome {
    let complexity = node.attr_int(keys::CYCLOMATIC_COMPLEXITY).unwrap_or(0);
    if node.kind() == NodeKind::Method && complexity > HIGH_COMPLEXITY_THRESHOLD {
        MatchOutcome::hit(HIGH_COMPLEXITY_CONFIDENCE)
    } else {
        MatchOutcome::MISS
    }
}
