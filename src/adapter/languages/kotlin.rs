//! Lightweight Kotlin adapter.
//!
//! tree-sitter-kotlin does not build against tree-sitter 0.24, so Kotlin
//! declarations are recognised line by line with regular expressions. The
//! scanner first produces a masked copy of the source in which string and
//! comment contents are blanked out (byte offsets are preserved), checks
//! bracket balance, and then matches declarations only at the brace depth
//! of the enclosing module or class body.
//!
//! Method bodies are not converted: `Method` nodes have no children, but
//! their cyclomatic complexity is estimated from keywords in the body.
//! Members of a `companion object` are folded into the enclosing class with
//! a `static` modifier.
//!
//! String templates are followed through `${…}`, so braces and strings
//! inside a template never unbalance the file. Backtick-quoted function
//! names are reported without their backticks.

use std::time::Instant;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::adapter::convert::{self, BASE_COMPLEXITY};
use crate::adapter::{
    AdapterError, LanguageAdapter, ParseDiagnostic, ParseError, ParseResult, ParseWarning,
};
use crate::tree::{keys, parameter, AttrsBuilder, CodeNode, Position, SourceLocation, UNKNOWN_TYPE};

/// Soft keywords accepted in front of a declaration.
const MODIFIER: &str = r"(?:public|private|protected|internal|abstract|open|final|sealed|data|enum|annotation|inner|value|companion|fun|override|suspend|inline|operator|infix|tailrec|external|const|lateinit|expect|actual)";

/// Annotations in front of a declaration.
const ANNOTATIONS: &str = r"(?:@[\w.:]+(?:\([^)]*\))?\s+)*";

lazy_static! {
    static ref PACKAGE: Regex = Regex::new(r"^\s*package\s+([\w.]+)").unwrap();
    static ref IMPORT: Regex = Regex::new(r"^\s*import\s+([\w.*]+)").unwrap();
    static ref CLASS: Regex = Regex::new(&format!(
        r"^\s*{a}((?:{m}\s+)*)(class|interface|object)\b\s*(\w*)",
        a = ANNOTATIONS,
        m = MODIFIER
    ))
    .unwrap();
    static ref FUNCTION: Regex = Regex::new(&format!(
        r"^\s*{a}((?:{m}\s+)*)fun\b\s*(?:<[^>]*>\s*)?(?:[\w.<>?, ]+\.)?(\w+|`\w+`)\s*\(",
        a = ANNOTATIONS,
        m = MODIFIER
    ))
    .unwrap();
    static ref PROPERTY: Regex = Regex::new(&format!(
        r"^\s*{a}((?:{m}\s+)*)(val|var)\s+(?:<[^>]*>\s*)?(\w+)\s*(?::\s*([^=]+?))?\s*(?:=.*|by\b.*)?$",
        a = ANNOTATIONS,
        m = MODIFIER
    ))
    .unwrap();
    static ref SECONDARY_CONSTRUCTOR: Regex = Regex::new(&format!(
        r"^\s*{a}((?:{m}\s+)*)constructor\s*\(",
        a = ANNOTATIONS,
        m = MODIFIER
    ))
    .unwrap();
    static ref PRIMARY_CONSTRUCTOR: Regex =
        Regex::new(r"^\s*((?:(?:public|private|protected|internal)\s+)*)constructor\b").unwrap();
    static ref RETURN_TYPE: Regex = Regex::new(r"^\s*:\s*([^{=\n]+)").unwrap();
    static ref ANNOTATION: Regex = Regex::new(r"@[\w.:]+(?:\([^)]*\))?").unwrap();
    static ref BRANCH: Regex = Regex::new(r"\b(?:if|for|while|catch)\b").unwrap();
    static ref WHEN: Regex = Regex::new(r"\bwhen\b").unwrap();
}

/// Lightweight regex-based Kotlin adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct KotlinAdapter;

impl KotlinAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageAdapter for KotlinAdapter {
    async fn parse(&self, source: &str, language: &str, file_path: &str) -> ParseResult {
        let started = Instant::now();
        let owned_source = source.to_string();
        let owned_path = file_path.to_string();
        let outcome = tokio::task::spawn_blocking(move || scan(&owned_source, &owned_path))
            .await
            .map_err(|e| AdapterError::Worker(e.to_string()));
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok((root, warnings))) => {
                tracing::debug!(
                    language,
                    file = file_path,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "scanned kotlin source"
                );
                ParseResult::success(root, warnings, language, file_path, elapsed)
            }
            Ok(Err(error)) => ParseResult::failure(vec![error], language, file_path, elapsed),
            Err(e) => {
                tracing::warn!(language, file = file_path, error = %e, "adapter failure");
                let error = ParseDiagnostic::at_start(e.to_string(), file_path);
                ParseResult::failure(vec![error], language, file_path, elapsed)
            }
        }
    }

    async fn validate_syntax(&self, source: &str, _language: &str) -> bool {
        let owned_source = source.to_string();
        tokio::task::spawn_blocking(move || Masked::new(&owned_source, "<validate>").is_ok())
            .await
            .unwrap_or(false)
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["kotlin".to_string(), "kt".to_string()]
    }

    fn adapter_name(&self) -> &'static str {
        "KotlinAdapter"
    }
}

/// Source with string and comment contents replaced by spaces.
struct Masked<'a> {
    source: &'a str,
    file: &'a str,
    text: String,
    line_starts: Vec<usize>,
    /// Brace depth before each byte.
    depth: Vec<i32>,
}

impl<'a> Masked<'a> {
    fn new(source: &'a str, file: &'a str) -> Result<Self, ParseError> {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );

        let mut masked = Self {
            source,
            file,
            text: String::new(),
            line_starts,
            depth: Vec::new(),
        };
        masked.text = masked.mask()?;
        masked.depth = brace_depths(masked.text.as_bytes());
        Ok(masked)
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&s| s <= offset).max(1);
        let start = self.line_starts[line - 1];
        let column = self.source.get(start..offset).map_or(0, |s| s.chars().count()) + 1;
        Position::new(line, column)
    }

    fn location(&self, begin: usize, end: usize) -> SourceLocation {
        SourceLocation::range(self.file, self.position(begin), self.position(end))
    }

    fn error(&self, offset: usize, message: String) -> ParseError {
        let position = self.position(offset);
        ParseDiagnostic::new(
            message,
            SourceLocation::point(self.file, position.line, position.column),
        )
    }

    /// Blank out strings and comments and check bracket balance. The first
    /// problem found is reported at the offending character.
    fn mask(&self) -> Result<String, ParseError> {
        let bytes = self.source.as_bytes();
        let mut out = bytes.to_vec();
        let mut stack: Vec<(u8, usize)> = Vec::new();
        let mut i = 0;

        let blank = |out: &mut Vec<u8>, from: usize, to: usize| {
            for b in &mut out[from..to] {
                if *b != b'\n' {
                    *b = b' ';
                }
            }
        };

        while i < bytes.len() {
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    let end = find_byte(bytes, i, b'\n').unwrap_or(bytes.len());
                    blank(&mut out, i, end);
                    i = end;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    // Kotlin block comments nest.
                    let mut nesting = 0;
                    let mut j = i;
                    loop {
                        if j + 1 >= bytes.len() {
                            return Err(self.error(i, "unterminated comment".to_string()));
                        }
                        if bytes[j] == b'/' && bytes[j + 1] == b'*' {
                            nesting += 1;
                            j += 2;
                        } else if bytes[j] == b'*' && bytes[j + 1] == b'/' {
                            nesting -= 1;
                            j += 2;
                            if nesting == 0 {
                                break;
                            }
                        } else {
                            j += 1;
                        }
                    }
                    blank(&mut out, i, j);
                    i = j;
                }
                b'"' => {
                    let quotes = if bytes[i..].starts_with(b"\"\"\"") { 3 } else { 1 };
                    let end = self.string_end(bytes, i)?;
                    blank(&mut out, i + quotes, end - quotes);
                    i = end;
                }
                b'\'' => {
                    let end = self.char_end(bytes, i)?;
                    blank(&mut out, i + 1, end - 1);
                    i = end;
                }
                b'`' => {
                    // Backtick names may hold any character but a newline.
                    let end = find_byte(bytes, i + 1, b'`')
                        .filter(|&e| !bytes[i + 1..e].contains(&b'\n'))
                        .ok_or_else(|| self.error(i, "unterminated identifier".to_string()))?;
                    for b in &mut out[i + 1..end] {
                        if !(b.is_ascii_alphanumeric() || *b == b'_') {
                            *b = b'_';
                        }
                    }
                    i = end + 1;
                }
                open @ (b'(' | b'[' | b'{') => {
                    stack.push((open, i));
                    i += 1;
                }
                close @ (b')' | b']' | b'}') => {
                    let expected = match close {
                        b')' => b'(',
                        b']' => b'[',
                        _ => b'{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(self.error(i, format!("unexpected `{}`", close as char)))
                        }
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }

        if let Some((open, offset)) = stack.pop() {
            return Err(self.error(offset, format!("unclosed `{}`", open as char)));
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Where the scanner is inside a string literal.
#[derive(Clone, Copy)]
enum StringFrame {
    Line,
    Raw,
    /// Code of a `${…}` template, with the count of open inner braces.
    Template(usize),
}

impl Masked<'_> {
    /// Offset just past the string literal opening at `start`. Templates
    /// are followed, so strings nested inside `${…}` do not end the literal.
    fn string_end(&self, bytes: &[u8], start: usize) -> Result<usize, ParseError> {
        let unterminated = || self.error(start, "unterminated string".to_string());
        let mut frames = Vec::new();
        let mut j = self.open_string(bytes, start, &mut frames);

        while let Some(&frame) = frames.last() {
            let Some(&c) = bytes.get(j) else {
                return Err(unterminated());
            };
            match frame {
                StringFrame::Line => match c {
                    b'\n' => return Err(unterminated()),
                    b'\\' => j += 2,
                    b'"' => {
                        frames.pop();
                        j += 1;
                    }
                    b'$' if bytes.get(j + 1) == Some(&b'{') => {
                        frames.push(StringFrame::Template(0));
                        j += 2;
                    }
                    _ => j += 1,
                },
                StringFrame::Raw => {
                    if bytes[j..].starts_with(b"\"\"\"") {
                        frames.pop();
                        j += 3;
                    } else if bytes[j..].starts_with(b"${") {
                        frames.push(StringFrame::Template(0));
                        j += 2;
                    } else {
                        j += 1;
                    }
                }
                StringFrame::Template(open) => match c {
                    b'{' => {
                        frames.pop();
                        frames.push(StringFrame::Template(open + 1));
                        j += 1;
                    }
                    b'}' => {
                        frames.pop();
                        if open > 0 {
                            frames.push(StringFrame::Template(open - 1));
                        }
                        j += 1;
                    }
                    b'"' => j = self.open_string(bytes, j, &mut frames),
                    b'\'' => j = self.char_end(bytes, j)?,
                    _ => j += 1,
                },
            }
        }
        Ok(j)
    }

    /// Push the frame for the string opening at `at` and return the offset
    /// of its first content byte.
    fn open_string(&self, bytes: &[u8], at: usize, frames: &mut Vec<StringFrame>) -> usize {
        if bytes[at..].starts_with(b"\"\"\"") {
            frames.push(StringFrame::Raw);
            at + 3
        } else {
            frames.push(StringFrame::Line);
            at + 1
        }
    }

    /// Offset just past the character literal opening at `start`.
    fn char_end(&self, bytes: &[u8], start: usize) -> Result<usize, ParseError> {
        let mut j = start + 1;
        loop {
            match bytes.get(j) {
                None | Some(b'\n') => {
                    return Err(self.error(start, "unterminated character literal".to_string()))
                }
                Some(b'\\') => j += 2,
                Some(b'\'') => return Ok(j + 1),
                Some(_) => j += 1,
            }
        }
    }

    /// Source text of an identifier span, without backticks.
    fn identifier(&self, begin: usize, end: usize) -> String {
        self.source
            .get(begin..end)
            .unwrap_or("")
            .trim_matches('`')
            .to_string()
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| from + p)
}

fn brace_depths(bytes: &[u8]) -> Vec<i32> {
    let mut depths = Vec::with_capacity(bytes.len() + 1);
    let mut depth = 0;
    for &b in bytes {
        depths.push(depth);
        match b {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
    }
    depths.push(depth);
    depths
}

/// Offset of the bracket closing the one at `open`.
fn matching(bytes: &[u8], open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in bytes.iter().enumerate().skip(open) {
        if c == open_ch {
            depth += 1;
        } else if c == close_ch {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn skip_inline_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r') {
        i += 1;
    }
    i
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}

/// Complexity of a body: one per `if`/`for`/`while`/`catch` and one per
/// `when` arm.
fn complexity(body: &str) -> i64 {
    let branches = BRANCH.find_iter(body).count();
    let arms: usize = WHEN
        .find_iter(body)
        .map(|m| when_arms(body.as_bytes(), m.end()))
        .sum();
    BASE_COMPLEXITY + (branches + arms) as i64
}

/// Count `->` at the top level of the `when` block starting after `from`.
fn when_arms(bytes: &[u8], from: usize) -> usize {
    let mut i = skip_ws(bytes, from);
    if bytes.get(i) == Some(&b'(') {
        i = match matching(bytes, i, b'(', b')') {
            Some(close) => skip_ws(bytes, close + 1),
            None => return 0,
        };
    }
    if bytes.get(i) != Some(&b'{') {
        return 0;
    }
    let Some(close) = matching(bytes, i, b'{', b'}') else {
        return 0;
    };

    let mut depth = 0;
    let mut arms = 0;
    for j in i + 1..close {
        match bytes[j] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'-' if depth == 0 && bytes.get(j + 1) == Some(&b'>') => arms += 1,
            _ => {}
        }
    }
    arms
}

struct Param {
    name: String,
    ty: String,
    property: bool,
    modifiers: Vec<String>,
}

fn parse_params(text: &str) -> Vec<Param> {
    convert::split_type_list(text)
        .into_iter()
        .filter_map(|item| {
            let item = ANNOTATION.replace_all(&item, "");
            let decl = item.split('=').next().unwrap_or("").trim();
            let (head, ty) = match decl.split_once(':') {
                Some((head, ty)) => (head.trim(), convert::squash_whitespace(ty)),
                None => (decl, UNKNOWN_TYPE.to_string()),
            };
            let mut parts: Vec<&str> = head.split_whitespace().collect();
            let name = parts.pop()?.to_string();
            let property = parts.iter().any(|w| *w == "val" || *w == "var");
            let modifiers = parts
                .into_iter()
                .filter(|w| *w != "val" && *w != "var")
                .map(String::from)
                .collect();
            Some(Param {
                name,
                ty,
                property,
                modifiers,
            })
        })
        .collect()
}

fn param_pairs(params: &[Param]) -> Vec<std::collections::BTreeMap<String, String>> {
    params
        .iter()
        .map(|p| parameter(p.name.clone(), p.ty.clone()))
        .collect()
}

/// A class body being collected.
struct Frame {
    name: String,
    class_kind: &'static str,
    modifiers: Vec<String>,
    superclass: Option<String>,
    interfaces: Vec<String>,
    begin: usize,
    close: usize,
    body_depth: i32,
    companion: bool,
    children: Vec<CodeNode>,
}

impl Frame {
    fn into_node(self, masked: &Masked<'_>) -> CodeNode {
        CodeNode::class(
            self.name,
            masked.location(self.begin, self.close),
            self.children,
            AttrsBuilder::new()
                .set(keys::MODIFIERS, self.modifiers)
                .set(keys::CLASS_KIND, self.class_kind)
                .str_if_some(keys::SUPERCLASS, self.superclass)
                .set(keys::INTERFACES, self.interfaces)
                .build(),
        )
    }
}

struct Scanner<'a> {
    masked: Masked<'a>,
    frames: Vec<Frame>,
    module_children: Vec<CodeNode>,
    package: Option<String>,
    imports: Vec<String>,
    bodies_skipped: bool,
}

/// Scan Kotlin source into a `Module` node.
fn scan(source: &str, file: &str) -> Result<(CodeNode, Vec<ParseWarning>), ParseError> {
    let masked = Masked::new(source, file)?;
    let mut scanner = Scanner {
        masked,
        frames: Vec::new(),
        module_children: Vec::new(),
        package: None,
        imports: Vec::new(),
        bodies_skipped: false,
    };
    scanner.run();

    let warnings = if scanner.bodies_skipped {
        vec![ParseDiagnostic::at_start(
            "method bodies are not converted by the lightweight Kotlin adapter",
            file,
        )]
    } else {
        Vec::new()
    };

    let end = source.len();
    let root = CodeNode::module(
        convert::module_name(file),
        scanner.masked.location(0, end),
        scanner.module_children,
        AttrsBuilder::new()
            .str_if_some(keys::PACKAGE, scanner.package)
            .list_if_any(keys::IMPORTS, scanner.imports)
            .build(),
    );
    Ok((root, warnings))
}

impl<'a> Scanner<'a> {
    fn run(&mut self) {
        let text = self.masked.text.clone();
        let mut start = 0;
        for line in text.split('\n') {
            let line_start = start;
            start += line.len() + 1;

            while self.frames.last().is_some_and(|f| f.close < line_start) {
                self.close_frame();
            }

            let level = self.frames.last().map_or(0, |f| f.body_depth);
            if self.masked.depth.get(line_start).copied() != Some(level) {
                continue;
            }

            if level == 0 {
                if let Some(caps) = PACKAGE.captures(line) {
                    self.package = Some(caps[1].to_string());
                    continue;
                }
                if let Some(caps) = IMPORT.captures(line) {
                    self.imports.push(caps[1].to_string());
                    continue;
                }
            }

            if let Some(caps) = CLASS.captures(line) {
                let end = caps.get(0).map_or(0, |m| m.end());
                self.class(
                    line_start,
                    line_start + end,
                    words(&caps[1]),
                    &caps[2],
                    caps[3].to_string(),
                );
            } else if let Some(caps) = FUNCTION.captures(line) {
                let paren = line_start + caps.get(0).map_or(0, |m| m.end()) - 1;
                let name = caps.get(2).map_or_else(String::new, |m| {
                    self.masked.identifier(line_start + m.start(), line_start + m.end())
                });
                self.function(line_start, paren, name, words(&caps[1]), None);
            } else if let Some(caps) = SECONDARY_CONSTRUCTOR.captures(line) {
                let paren = line_start + caps.get(0).map_or(0, |m| m.end()) - 1;
                if let Some(class_name) = self.frames.last().map(|f| f.name.clone()) {
                    self.function(line_start, paren, class_name.clone(), words(&caps[1]), Some(class_name));
                }
            } else if let Some(caps) = PROPERTY.captures(line) {
                let ty = caps
                    .get(4)
                    .map(|m| convert::squash_whitespace(m.as_str()))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
                let mut modifiers = words(&caps[1]);
                modifiers.push(caps[2].to_string());
                let end = line_start + line.trim_end().len();
                self.property(line_start, end, caps[3].to_string(), ty, modifiers);
            }
        }

        while !self.frames.is_empty() {
            self.close_frame();
        }
    }

    /// Members declared inside a companion object are static.
    fn in_companion(&self) -> bool {
        self.frames.last().is_some_and(|f| f.companion)
    }

    fn push_member(&mut self, node: CodeNode) {
        match self.frames.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.module_children.push(node),
        }
    }

    fn close_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if frame.companion {
            for child in frame.children {
                self.push_member(child);
            }
        } else {
            let node = frame.into_node(&self.masked);
            self.push_member(node);
        }
    }

    fn class(&mut self, begin: usize, header: usize, mut modifiers: Vec<String>, keyword: &str, name: String) {
        let companion = modifiers.iter().any(|m| m == "companion");
        let class_kind = match keyword {
            "interface" => "interface",
            "object" => "object",
            _ if modifiers.iter().any(|m| m == "enum") => "enum",
            _ => "class",
        };
        modifiers.retain(|m| m != "fun");

        let text = self.masked.text.clone();
        let bytes = text.as_bytes();
        let mut i = skip_inline_ws(bytes, header);
        if bytes.get(i) == Some(&b'<') {
            i = matching(bytes, i, b'<', b'>').map_or(i, |close| close + 1);
        }

        let mut constructor_modifiers = None;
        if let Some(caps) = PRIMARY_CONSTRUCTOR.captures(&text[i..]) {
            constructor_modifiers = Some(words(&caps[1]));
            i += caps.get(0).map_or(0, |m| m.end());
        }

        i = skip_inline_ws(bytes, i);
        let mut params = None;
        let mut params_span = (i, i);
        if bytes.get(i) == Some(&b'(') {
            if let Some(close) = matching(bytes, i, b'(', b')') {
                params = Some(parse_params(&text[i + 1..close]));
                params_span = (i, close);
                i = close + 1;
            }
        }

        i = skip_inline_ws(bytes, i);
        let mut superclass = None;
        let mut interfaces = Vec::new();
        if bytes.get(i) == Some(&b':') {
            let end = bytes[i..]
                .iter()
                .position(|&c| matches!(c, b'{' | b'}' | b'\n'))
                .map_or(bytes.len(), |p| i + p);
            for entry in convert::split_type_list(&text[i + 1..end]) {
                let entry = entry.split(" by ").next().unwrap_or("").trim().to_string();
                match entry.find('(') {
                    Some(paren) if superclass.is_none() && class_kind != "interface" => {
                        superclass = Some(entry[..paren].trim().to_string());
                    }
                    _ => interfaces.push(entry),
                }
            }
            i = end;
        }

        let body_open = skip_ws(bytes, i);
        let body = if bytes.get(body_open) == Some(&b'{') {
            matching(bytes, body_open, b'{', b'}').map(|close| (body_open, close))
        } else {
            None
        };

        let mut children = Vec::new();
        if let Some(params) = &params {
            for param in params.iter().filter(|p| p.property) {
                children.push(CodeNode::variable(
                    param.name.clone(),
                    self.masked.location(params_span.0, params_span.1),
                    Vec::new(),
                    AttrsBuilder::new()
                        .set(keys::MODIFIERS, param.modifiers.clone())
                        .set(keys::TYPE, param.ty.clone())
                        .set(keys::FIELD, true)
                        .build(),
                ));
            }
        }
        if constructor_modifiers.is_some() || params.is_some() {
            children.push(CodeNode::method(
                name.clone(),
                self.masked.location(params_span.0, params_span.1),
                Vec::new(),
                AttrsBuilder::new()
                    .set(keys::MODIFIERS, constructor_modifiers.unwrap_or_default())
                    .set(keys::RETURN_TYPE, name.clone())
                    .set(keys::PARAMETERS, param_pairs(params.as_deref().unwrap_or(&[])))
                    .set(keys::CYCLOMATIC_COMPLEXITY, BASE_COMPLEXITY)
                    .set(keys::CONSTRUCTOR, true)
                    .build(),
            ));
        }

        let frame = Frame {
            name,
            class_kind,
            modifiers,
            superclass,
            interfaces,
            begin,
            close: body.map_or(i, |(_, close)| close),
            body_depth: body.map_or(0, |(open, _)| self.masked.depth[open] + 1),
            companion,
            children,
        };

        match body {
            Some(_) => self.frames.push(frame),
            None if companion => {}
            None => {
                let node = frame.into_node(&self.masked);
                self.push_member(node);
            }
        }
    }

    /// Convert a `fun` (or secondary constructor) whose parameter list opens
    /// at `paren`.
    fn function(
        &mut self,
        begin: usize,
        paren: usize,
        name: String,
        mut modifiers: Vec<String>,
        constructor_of: Option<String>,
    ) {
        let text = self.masked.text.clone();
        let bytes = text.as_bytes();
        let Some(close) = matching(bytes, paren, b'(', b')') else {
            return;
        };
        let params = parse_params(&text[paren + 1..close]);

        let mut i = close + 1;
        let mut declared = None;
        if let Some(caps) = RETURN_TYPE.captures(&text[i..]) {
            declared = Some(convert::squash_whitespace(caps[1].split(" where ").next().unwrap_or("")));
            i += caps.get(0).map_or(0, |m| m.end());
        }

        let body_start = skip_inline_ws(bytes, i);
        let (end, body, expression_body) = match bytes.get(body_start) {
            Some(b'{') => match matching(bytes, body_start, b'{', b'}') {
                Some(end) => (end, Some(&text[body_start..=end]), false),
                None => (body_start, None, false),
            },
            Some(b'=') => {
                let mut end = find_byte(bytes, body_start, b'\n').unwrap_or(bytes.len());
                if let Some(brace) = bytes[body_start..end].iter().position(|&c| c == b'{') {
                    if let Some(block_end) = matching(bytes, body_start + brace, b'{', b'}') {
                        end = end.max(find_byte(bytes, block_end, b'\n').unwrap_or(bytes.len()));
                    }
                }
                (end, Some(&text[body_start..end]), true)
            }
            _ => (close, None, false),
        };

        if body.is_some() {
            self.bodies_skipped = true;
        }

        let return_type = match (&constructor_of, declared) {
            (Some(class_name), _) => class_name.clone(),
            (None, Some(declared)) if !declared.is_empty() => declared,
            (None, _) if expression_body => UNKNOWN_TYPE.to_string(),
            (None, _) => "Unit".to_string(),
        };

        if self.in_companion() {
            modifiers.push("static".to_string());
        }

        let node = CodeNode::method(
            name,
            self.masked.location(begin, end),
            Vec::new(),
            AttrsBuilder::new()
                .set(keys::MODIFIERS, modifiers)
                .set(keys::RETURN_TYPE, return_type)
                .set(keys::PARAMETERS, param_pairs(&params))
                .set(keys::CYCLOMATIC_COMPLEXITY, body.map_or(BASE_COMPLEXITY, complexity))
                .set(keys::CONSTRUCTOR, constructor_of.is_some())
                .build(),
        );
        self.push_member(node);
    }

    fn property(&mut self, begin: usize, end: usize, name: String, ty: String, mut modifiers: Vec<String>) {
        let is_field = !self.frames.is_empty();
        if self.in_companion() {
            modifiers.push("static".to_string());
        }
        let node = CodeNode::variable(
            name,
            self.masked.location(begin, end),
            Vec::new(),
            AttrsBuilder::new()
                .set(keys::MODIFIERS, modifiers)
                .set(keys::TYPE, ty)
                .set(keys::FIELD, is_field)
                .build(),
        );
        self.push_member(node);
    }
}
