//! Command-list parsing.
//!
//! The `command` section is meant to be a list of `"name": {args}` entries
//! but comes back in every shape a model can think of: JSON, YAML-ish
//! bullets, bare command names, argument blocks on the line after their
//! name. Parsing never fails; text that yields nothing is an empty list.
//!
//! Grammar, one line at a time (code fences ignored):
//!
//! ```text
//! line      := [marker] (block-line | pair | name)
//! marker    := "-" | "*" | "+" | digits ("." | ")")
//! block-line:= [key (":" | "=")] bracket ... matching bracket [rest]
//! pair      := key ":" [value]
//! name      := word | quoted-words
//! ```
//!
//! A bracket block may span lines. A `key:` with no value, a lone name and
//! `name: X` open a pending invocation that collects arguments from the
//! lines below it that are more indented (or not bulleted when it was).
//! A block without a key belongs to the pending invocation, or failing
//! that to the most recent name.

use missionclaw_core::tool::{Arguments, Invocation};
use serde_json::{Map, Value};

/// Keys whose value is the command name itself.
const NAME_KEYS: &[&str] = &["name", "command", "cmd", "tool", "action"];

/// Keys whose block holds the arguments of the pending command.
const ARGS_KEYS: &[&str] = &["args", "arguments", "parameters", "params", "input"];

/// Argument key for values that came without a key.
const POSITIONAL: &str = "args";

/// Parse a command section into invocations, in the order written.
pub fn parse_commands(text: &str) -> Vec<Invocation> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !is_fence(line))
        .collect();

    let joined = lines.join("\n");
    let whole = joined.trim();
    if whole.is_empty() {
        return Vec::new();
    }
    if let Ok(value) = serde_json::from_str::<Value>(whole) {
        if matches!(value, Value::Object(_) | Value::Array(_) | Value::String(_)) {
            return from_json(&value);
        }
    }

    let mut parser = LineParser::default();
    for line in lines {
        parser.line(line);
    }
    parser.finish()
}

/// Arguments from the text of one bracket block, brackets included.
///
/// Valid JSON is taken as is. Anything else is split into `key: value`
/// segments at `,`, `;` or line breaks that are followed by a key. A
/// separator preceded by an odd run of backslashes is escaped and does not
/// split.
pub fn parse_block_args(raw: &str) -> Arguments {
    let mut args = Arguments::new();
    let raw = raw.trim();
    if let Ok(value @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(raw) {
        merge_value(&mut args, &value);
        return args;
    }

    let inner = raw
        .trim_start_matches(['[', '{'])
        .trim_end_matches([']', '}']);
    let inner = inner
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let inner = inner.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'));
    split_loose_args(inner, &mut args);
    args
}

fn split_loose_args(text: &str, args: &mut Arguments) {
    // (separator position, value start, key)
    let mut marks: Vec<(usize, usize, String)> = Vec::new();
    if let Some((len, key)) = key_at(text) {
        marks.push((0, len, key));
    }
    for (i, c) in text.char_indices() {
        if !matches!(c, ',' | ';' | '\n') || is_escaped(text, i) {
            continue;
        }
        if marks.last().is_some_and(|(_, start, _)| i < *start) {
            continue;
        }
        let after = i + c.len_utf8();
        if let Some((len, key)) = key_at(&text[after..]) {
            marks.push((i, after + len, key));
        }
    }

    let head_end = marks.first().map_or(text.len(), |(sep, _, _)| *sep);
    let head = trim_value(&text[..head_end]);
    if !head.is_empty() {
        args.insert(POSITIONAL.to_string(), head.to_string());
    }
    for (n, (_, start, key)) in marks.iter().enumerate() {
        let end = marks.get(n + 1).map_or(text.len(), |(sep, _, _)| *sep);
        args.insert(key.clone(), trim_value(&text[*start..end]).to_string());
    }
}

/// `[ws] ["|'] key ["|'] [ws] ":" [ws]` at the start of `s`; returns the
/// consumed length and the key.
fn key_at(s: &str) -> Option<(usize, String)> {
    let body = s.trim_start();
    let mut consumed = s.len() - body.len();

    let quote = body.chars().next().filter(|c| *c == '"' || *c == '\'');
    let body = match quote {
        Some(q) => {
            consumed += q.len_utf8();
            &body[q.len_utf8()..]
        }
        None => body,
    };

    let key_len = body
        .find(|c: char| !is_name_char(c))
        .unwrap_or(body.len());
    let key = body[..key_len].trim();
    if !is_name(key) {
        return None;
    }
    consumed += key_len;

    let mut rest = &body[key_len..];
    if let Some(q) = quote {
        rest = rest.strip_prefix(q)?;
        consumed += q.len_utf8();
    }
    let trimmed = rest.trim_start_matches([' ', '\t']);
    consumed += rest.len() - trimmed.len();
    let colon = trimmed.chars().next().filter(|c| *c == ':' || *c == '：')?;
    let value = &trimmed[colon.len_utf8()..];
    if quote.is_none() && value.starts_with("//") {
        // a URL scheme, not a key
        return None;
    }
    consumed += colon.len_utf8();
    let value_trimmed = value.trim_start();
    consumed += value.len() - value_trimmed.len();

    Some((consumed, key.to_string()))
}

fn is_escaped(text: &str, at: usize) -> bool {
    text[..at].bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1
}

fn trim_value(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
}

// ── JSON ─────────────────────────────────────────────────────────────────

fn from_json(value: &Value) -> Vec<Invocation> {
    match value {
        Value::Array(items) => items.iter().flat_map(from_json).collect(),
        Value::Object(map) => from_json_object(map),
        Value::String(name) => bare_name(name).map(Invocation::new).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// `{"name": n, "args": {...}}` is one invocation; otherwise every key
/// names a command and its value holds the arguments.
fn from_json_object(map: &Map<String, Value>) -> Vec<Invocation> {
    if let Some(Value::String(name)) = map.get("name") {
        let name = name.trim();
        if name.is_empty() {
            return Vec::new();
        }
        let mut call = Invocation::new(name);
        match ARGS_KEYS.iter().find_map(|key| map.get(*key)) {
            Some(args) => merge_value(&mut call.args, args),
            None => {
                for (key, value) in map.iter().filter(|(key, _)| *key != "name") {
                    call.args.insert(key.clone(), scalar(value));
                }
            }
        }
        return vec![call];
    }

    map.iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, value)| {
            let mut call = Invocation::new(name.trim());
            merge_value(&mut call.args, value);
            call
        })
        .collect()
}

fn merge_value(args: &mut Arguments, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                args.insert(key.clone(), scalar(value));
            }
        }
        Value::Array(items) => {
            for item in items {
                merge_value(args, item);
            }
        }
        Value::Null => {}
        other => {
            let text = scalar(other);
            args.entry(POSITIONAL.to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&text);
                })
                .or_insert(text);
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Line state machine ───────────────────────────────────────────────────

/// Where the arguments of a bracket block go once it closes.
#[derive(Debug)]
enum Target {
    Named(String),
    /// Into the pending invocation, without closing it
    Attach,
    /// Pending invocation, then the last name, then the block's own JSON
    Infer,
}

#[derive(Debug)]
struct Block {
    target: Target,
    text: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Block {
    fn open(target: Target) -> Self {
        Self {
            target,
            text: String::new(),
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Consume `input` until the outermost bracket closes; returns what
    /// follows it on the line.
    fn feed<'a>(&mut self, input: &'a str) -> Option<&'a str> {
        for (i, c) in input.char_indices() {
            self.text.push(c);
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' | '[' => self.depth += 1,
                '}' | ']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(&input[i + c.len_utf8()..]);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Strings never span lines.
    fn newline(&mut self) {
        self.text.push('\n');
        self.in_string = false;
        self.escaped = false;
    }
}

#[derive(Debug)]
struct Draft {
    call: Invocation,
    indent: usize,
    listed: bool,
}

#[derive(Debug, Default)]
struct LineParser {
    calls: Vec<Invocation>,
    pending: Option<Draft>,
    last: Option<String>,
    block: Option<Block>,
}

impl LineParser {
    fn line(&mut self, line: &str) {
        let indent = line.len() - line.trim_start().len();
        if let Some(block) = self.block.as_mut() {
            block.newline();
            if let Some(rest) = block.feed(line) {
                self.close_block();
                self.segment(rest, indent, false);
            }
            return;
        }
        let (listed, body) = strip_list_marker(line);
        self.segment(body, indent, listed);
    }

    fn segment(&mut self, body: &str, indent: usize, listed: bool) {
        let body = body.trim().trim_start_matches([',', ';']).trim();
        if body.is_empty() {
            return;
        }

        if let Some(open) = find_block_start(body) {
            if let Some(target) = self.block_target(&body[..open]) {
                let mut block = Block::open(target);
                let rest = block.feed(&body[open..]);
                self.block = Some(block);
                if let Some(rest) = rest {
                    self.close_block();
                    self.segment(rest, indent, false);
                }
                return;
            }
        }

        if let Some((key, value)) = split_key_value(body) {
            let is_arg = self
                .pending
                .as_ref()
                .is_some_and(|draft| indent > draft.indent || (draft.listed && !listed));
            if is_arg {
                if let Some(draft) = self.pending.as_mut().filter(|_| !value.is_empty()) {
                    draft.call.args.insert(key, value);
                }
            } else if value.is_empty() {
                self.open_draft(key, indent, listed);
            } else if NAME_KEYS.contains(&key.to_lowercase().as_str()) {
                self.open_draft(value, indent, listed);
            } else {
                self.flush();
                self.push(Invocation::new(key).with_arg(POSITIONAL, value));
            }
            return;
        }

        if let Some(name) = bare_name(body) {
            self.open_draft(name, indent, listed);
        }
    }

    fn block_target(&self, prefix: &str) -> Option<Target> {
        let key = prefix.trim().trim_end_matches([':', '：', '=']);
        let key = clean(key);
        if key.is_empty() {
            return Some(Target::Infer);
        }
        let key = unquote(key);
        if !is_name(key) {
            return None;
        }
        let lower = key.to_lowercase();
        if ARGS_KEYS.contains(&lower.as_str()) {
            return Some(if self.pending.is_some() {
                Target::Attach
            } else {
                Target::Infer
            });
        }
        if NAME_KEYS.contains(&lower.as_str()) {
            return Some(Target::Infer);
        }
        Some(Target::Named(key.trim().to_string()))
    }

    fn close_block(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };
        let raw = block.text;
        match block.target {
            Target::Attach => {
                let args = parse_block_args(&raw);
                if let Some(draft) = self.pending.as_mut() {
                    draft.call.args.extend(args);
                }
            }
            Target::Named(name) => {
                let args = parse_block_args(&raw);
                match self.pending.take() {
                    Some(mut draft) if draft.call.name == name => {
                        draft.call.args.extend(args);
                        self.push(draft.call);
                    }
                    other => {
                        if let Some(draft) = other {
                            self.push(draft.call);
                        }
                        let mut call = Invocation::new(name);
                        call.args = args;
                        self.push(call);
                    }
                }
            }
            Target::Infer => self.infer(&raw),
        }
    }

    fn infer(&mut self, raw: &str) {
        let json = serde_json::from_str::<Value>(raw.trim()).ok();
        if let Some(Value::Object(map)) = &json {
            if map.get("name").is_some_and(Value::is_string) {
                self.flush();
                for call in from_json_object(map) {
                    self.push(call);
                }
                return;
            }
        }
        if let Some(mut draft) = self.pending.take() {
            draft.call.args.extend(parse_block_args(raw));
            self.push(draft.call);
            return;
        }
        if let Some(name) = self.last.clone() {
            let mut call = Invocation::new(name);
            call.args = parse_block_args(raw);
            self.push(call);
            return;
        }
        if let Some(json) = json {
            for call in from_json(&json) {
                self.push(call);
            }
        }
    }

    fn open_draft(&mut self, name: String, indent: usize, listed: bool) {
        self.flush();
        self.pending = Some(Draft {
            call: Invocation::new(name),
            indent,
            listed,
        });
    }

    fn flush(&mut self) {
        if let Some(draft) = self.pending.take() {
            self.push(draft.call);
        }
    }

    fn push(&mut self, call: Invocation) {
        self.last = Some(call.name.clone());
        self.calls.push(call);
    }

    fn finish(mut self) -> Vec<Invocation> {
        self.close_block();
        self.flush();
        self.calls
    }
}

// ── Lexical helpers ──────────────────────────────────────────────────────

fn is_fence(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("```") || line.starts_with("~~~")
}

fn strip_list_marker(line: &str) -> (bool, &str) {
    let trimmed = line.trim();
    let after_marker = |rest: &str| rest.is_empty() || rest.starts_with(char::is_whitespace);

    if let Some(rest) = trimmed.strip_prefix(['-', '*', '+']) {
        if after_marker(rest) {
            return (true, rest.trim_start());
        }
    }
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix(['.', ')']) {
            if after_marker(rest) {
                return (true, rest.trim_start());
            }
        }
    }
    (false, trimmed)
}

/// Position of the first `{` or `[` outside a double-quoted string.
fn find_block_start(body: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => return Some(i),
            _ => {}
        }
    }
    None
}

/// `key: value` where the key is a (possibly quoted) name. An unquoted key
/// needs whitespace or the end of line after its colon.
fn split_key_value(body: &str) -> Option<(String, String)> {
    let body = clean(body);
    let (key, rest) = match body.chars().next()? {
        q @ ('"' | '\'') => {
            let inner = &body[1..];
            let end = inner.find(q)?;
            let rest = inner[end + 1..].trim_start();
            let rest = rest.strip_prefix([':', '：'])?;
            (&inner[..end], rest)
        }
        _ => {
            let end = body.find([':', '：'])?;
            let colon_len = body[end..].chars().next().map_or(1, char::len_utf8);
            let rest = &body[end + colon_len..];
            if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
                return None;
            }
            (&body[..end], rest)
        }
    };

    let key = clean(key);
    if !is_name(key) {
        return None;
    }
    let value = rest.trim();
    let value = value.strip_suffix(',').unwrap_or(value).trim();
    Some((key.to_string(), unquote(value).to_string()))
}

/// A command name on a line of its own: one bare word, or quoted words.
fn bare_name(body: &str) -> Option<String> {
    let body = body
        .trim()
        .trim_end_matches([',', '.', ';', ':', '：'])
        .trim_matches('*')
        .trim();
    let inner = unquote(body);
    let quoted = inner.len() != body.len();
    if !quoted && inner.contains(char::is_whitespace) {
        return None;
    }
    is_name(inner).then(|| inner.to_string())
}

/// Strip emphasis and inline-code marks.
fn clean(text: &str) -> &str {
    text.trim().trim_matches(['*', '`']).trim()
}

fn unquote(text: &str) -> &str {
    for q in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(q) && text.ends_with(q) {
            return text[1..text.len() - 1].trim();
        }
    }
    text
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == ' '
}

fn is_name(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && text.chars().all(is_name_char)
        && text.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_')
}
