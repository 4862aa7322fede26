//! Static knowledge about backend tools: which are read-only, which mutate
//! the workspace, which never need approval, how a failed result looks, and
//! how to preview a call in one line.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use ask_protocol::value::{as_number, str_field};
use ask_term::first_line;

pub const READ_ONLY_TOOLS: &[&str] = &[
    "read",
    "ls",
    "tree",
    "ripgrep",
    "grep",
    "glob",
    "git_diff",
    "git_status",
];

pub const MUTATING_TOOLS: &[&str] = &["write", "edit", "apply_patch", "git_commit"];

/// Tools approved without asking, even in ask-every-time mode.
pub const SAFE_TOOLS: &[&str] = &[
    "finish",
    "progress_update",
    "update_todos",
    "update_plan",
    "git_status",
];

/// Tools whose results are never rendered.
pub const HIDDEN_TOOLS: &[&str] = &["progress_update"];

/// The terminal tool an agent calls when it reached a natural stop.
pub const FINISH_TOOL: &str = "finish";

pub const DEFAULT_TOOL_ERROR: &str = "Tool reported an error";

const ERROR_MESSAGE_KEYS: &[&str] = &["error", "stderr", "message", "detail", "details", "reason"];

pub fn is_read_only(name: &str) -> bool {
    READ_ONLY_TOOLS.contains(&name)
}

pub fn is_mutating(name: &str) -> bool {
    MUTATING_TOOLS.contains(&name)
}

pub fn is_safe(name: &str) -> bool {
    SAFE_TOOLS.contains(&name)
}

pub fn is_hidden(name: &str) -> bool {
    HIDDEN_TOOLS.contains(&name)
}

type ErrorPredicate = fn(&Value, Option<&str>) -> bool;

const ERROR_PREDICATES: &[(&str, ErrorPredicate)] = &[
    ("apply_patch", patch_failed),
    ("bash", shell_failed),
    ("terminal", shell_failed),
];

/// Whether a tool result represents a failure.
///
/// Tools without an entry in the predicate table use the generic rule.
pub fn is_error_result(name: &str, result: &Value, top_level_error: Option<&str>) -> bool {
    let predicate = ERROR_PREDICATES
        .iter()
        .find(|(tool, _)| *tool == name)
        .map(|(_, predicate)| *predicate)
        .unwrap_or(generic_failed);
    predicate(result, top_level_error)
}

/// Human-readable message for a failed result.
pub fn error_message(result: &Value, top_level_error: Option<&str>) -> String {
    if let Some(error) = non_blank(top_level_error) {
        return error.to_string();
    }
    ERROR_MESSAGE_KEYS
        .iter()
        .find_map(|key| message_field(result, key))
        .unwrap_or_else(|| DEFAULT_TOOL_ERROR.to_string())
}

fn message_field(result: &Value, key: &str) -> Option<String> {
    match result.get(key)? {
        Value::String(text) => non_blank(Some(text)).map(ToString::to_string),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .and_then(|text| non_blank(Some(text)))
            .map(ToString::to_string),
        _ => None,
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

fn generic_failed(result: &Value, top_level_error: Option<&str>) -> bool {
    non_blank(top_level_error).is_some() || has_error_key(result) || reports_failure(result)
}

fn has_error_key(result: &Value) -> bool {
    result
        .get("error")
        .is_some_and(|error| !matches!(error, Value::Null | Value::Bool(false)))
}

fn reports_failure(result: &Value) -> bool {
    result.get("success").and_then(Value::as_bool) == Some(false)
}

fn patch_failed(result: &Value, top_level_error: Option<&str>) -> bool {
    match result.get("ok").and_then(Value::as_bool) {
        Some(false) => true,
        Some(true) => non_blank(top_level_error).is_some(),
        None => generic_failed(result, top_level_error),
    }
}

fn shell_failed(result: &Value, top_level_error: Option<&str>) -> bool {
    let nonzero_exit = result
        .get("exitCode")
        .and_then(as_number)
        .is_some_and(|code| code != 0.0);
    generic_failed(result, top_level_error) || nonzero_exit
}

/// Short argument summary shown next to a tool call line.
pub fn call_preview(name: &str, args: &Value) -> Option<String> {
    match name {
        "read" | "write" | "edit" | "ls" | "tree" => str_field(args, "path"),
        "bash" => str_field(args, "cmd").map(|cmd| first_line(&cmd, 60)),
        "terminal" => str_field(args, "command").map(|cmd| first_line(&cmd, 60)),
        "ripgrep" | "grep" => str_field(args, "query")
            .or_else(|| str_field(args, "pattern"))
            .map(|query| format!("\"{}\"", first_line(&query, 50))),
        "glob" => str_field(args, "pattern"),
        "apply_patch" => str_field(args, "patch").map(|patch| patch_preview(&patch)),
        "git_commit" | "finish" => str_field(args, "message")
            .or_else(|| str_field(args, "text"))
            .map(|message| first_line(&message, 60)),
        "update_plan" | "update_todos" => args
            .get("items")
            .or_else(|| args.get("todos"))
            .and_then(Value::as_array)
            .map(|items| format!("{} steps", items.len())),
        _ => None,
    }
}

/// Argument preview shown in an approval prompt.
pub fn approval_preview(name: &str, args: &Value) -> Option<String> {
    match name {
        "bash" => str_field(args, "cmd").map(|cmd| first_line(&cmd, 80)),
        "write" | "edit" => str_field(args, "path"),
        "apply_patch" => str_field(args, "patch").map(|patch| patch_preview(&patch)),
        "terminal" => str_field(args, "command").map(|cmd| first_line(&cmd, 80)),
        "git_commit" => str_field(args, "message").map(|message| first_line(&message, 60)),
        _ => None,
    }
}

fn patch_preview(patch: &str) -> String {
    let files = files_from_patch(patch);
    match files.as_slice() {
        [single] => single.clone(),
        _ => format!("{} files", files.len()),
    }
}

fn patch_file_regexes() -> &'static [Regex] {
    static CACHED: OnceLock<Vec<Regex>> = OnceLock::new();
    CACHED.get_or_init(|| {
        [
            r"^\*\*\*\s+(?:Add|Update|Delete) File:\s+(.+)$",
            r"^diff --git\s+a/(.+?)\s+b/.+$",
            r"^---\s+a/(.+)$",
            r"^\+\+\+\s+b/(.+)$",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Paths named by a patch, in first-seen order without duplicates.
///
/// Understands apply-patch markers (`*** Update File: path`) and unified
/// diff headers (`diff --git a/.. b/..`, `--- a/..`, `+++ b/..`).
pub fn files_from_patch(patch: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in patch.lines() {
        let found = patch_file_regexes()
            .iter()
            .find_map(|regex| regex.captures(line))
            .and_then(|captures| captures.get(1))
            .map(|path| path.as_str().trim().to_string());
        if let Some(path) = found {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }
    files
}
