//! The fixed helper library available inside prompt templates.
//!
//! Helpers are side-effect free (the date helper's zero-argument form reads
//! the wall clock) and are registered exactly once when a
//! [`TemplateEngine`](super::TemplateEngine) is constructed. There is no
//! global mutable registry; the helper set lives in the engine value.
//!
//! Value-producing helpers implement `call_inner` so they compose in
//! subexpressions, e.g. `{{#if (eq a b)}}` or `{{formatMessage (last msgs)}}`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, JsonRender, RenderContext, RenderError, ScopedJson,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Write as _;

/// Default pattern for `{{$date}}` with no arguments: `August 25, 2026`.
const DEFAULT_DATE_PATTERN: &str = "MMMM dd, yyyy";

/// Names that are never reported as template variables: block keywords,
/// engine internals, iteration locals, and every registered helper.
pub(crate) const RESERVED_NAMES: &[&str] = &[
    "if",
    "each",
    "unless",
    "with",
    "log",
    "lookup",
    "this",
    "blockHelperMissing",
    "helperMissing",
    "raw",
    "eq",
    "ne",
    "lt",
    "gt",
    "lte",
    "gte",
    "and",
    "or",
    "@key",
    "@index",
    "$date",
    "formatMessage",
    "formatMessages",
    "formatMessageWithToolCalls",
    "formatMessagesWithToolCalls",
    "toJSON",
    "last",
];

/// Register the full helper set on a registry.
pub(crate) fn register(registry: &mut Handlebars<'static>) {
    registry.register_helper("eq", Box::new(CompareHelper { op: CmpOp::Eq }));
    registry.register_helper("ne", Box::new(CompareHelper { op: CmpOp::Ne }));
    registry.register_helper("lt", Box::new(CompareHelper { op: CmpOp::Lt }));
    registry.register_helper("gt", Box::new(CompareHelper { op: CmpOp::Gt }));
    registry.register_helper("lte", Box::new(CompareHelper { op: CmpOp::Lte }));
    registry.register_helper("gte", Box::new(CompareHelper { op: CmpOp::Gte }));
    registry.register_helper("and", Box::new(AndHelper));
    registry.register_helper("or", Box::new(OrHelper));
    registry.register_helper("$date", Box::new(DateHelper));
    registry.register_helper(
        "formatMessage",
        Box::new(FormatMessageHelper {
            with_tool_calls: false,
        }),
    );
    registry.register_helper(
        "formatMessageWithToolCalls",
        Box::new(FormatMessageHelper {
            with_tool_calls: true,
        }),
    );
    registry.register_helper(
        "formatMessages",
        Box::new(FormatMessagesHelper {
            with_tool_calls: false,
        }),
    );
    registry.register_helper(
        "formatMessagesWithToolCalls",
        Box::new(FormatMessagesHelper {
            with_tool_calls: true,
        }),
    );
    registry.register_helper("toJSON", Box::new(ToJsonHelper));
    registry.register_helper("last", Box::new(LastHelper));
    registry.register_helper(INTERPOLATE, Box::new(InterpolateHelper));
}

/// Internal helper that every bare `{{path}}` interpolation is routed
/// through during preprocessing. Never written by template authors.
pub(crate) const INTERPOLATE: &str = "interpolate";

// ================================
// Comparison and logic helpers
// ================================

#[derive(Clone, Copy)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
}

/// Binary comparison on the two parameters as provided.
struct CompareHelper {
    op: CmpOp,
}

impl HelperDef for CompareHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let a = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
        let b = h.param(1).map(|p| p.value()).unwrap_or(&Value::Null);

        let result = match self.op {
            CmpOp::Eq => loose_eq(a, b),
            CmpOp::Ne => !loose_eq(a, b),
            CmpOp::Lt => matches!(loose_cmp(a, b), Some(Ordering::Less)),
            CmpOp::Gt => matches!(loose_cmp(a, b), Some(Ordering::Greater)),
            CmpOp::Lte => matches!(loose_cmp(a, b), Some(Ordering::Less | Ordering::Equal)),
            CmpOp::Gte => matches!(loose_cmp(a, b), Some(Ordering::Greater | Ordering::Equal)),
        };

        Ok(ScopedJson::Derived(Value::Bool(result)))
    }
}

/// True iff every positional argument is truthy.
struct AndHelper;

impl HelperDef for AndHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let result = h.params().iter().all(|p| is_truthy(p.value()));
        Ok(ScopedJson::Derived(Value::Bool(result)))
    }
}

/// True iff any positional argument is truthy.
struct OrHelper;

impl HelperDef for OrHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let result = h.params().iter().any(|p| is_truthy(p.value()));
        Ok(ScopedJson::Derived(Value::Bool(result)))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Equality with numeric coercion: `1` equals `1.0`, and a numeric string
/// equals the number it denotes (`"1"` equals `1`). Two strings compare as
/// strings.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_)) => match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => a == b,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// ================================
// Date helper
// ================================

/// Polymorphic date formatter, registered as `$date`.
///
/// - `{{$date}}` formats the current time with the default pattern.
/// - `{{$date "yyyy-MM-dd"}}` applies the pattern to the current time
///   (a single argument that parses as an ISO-8601 date is formatted with
///   the default pattern instead).
/// - `{{$date iso pattern}}` parses `iso` strictly and formats it.
///
/// Any parse or format failure renders as an empty string; a malformed date
/// in a variable must never abort the prompt.
struct DateHelper;

impl HelperDef for DateHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let first = h.param(0).and_then(|p| p.value().as_str());
        let second = h.param(1).and_then(|p| p.value().as_str());

        let text = match h.params().len() {
            0 => format_date(Local::now().naive_local(), DEFAULT_DATE_PATTERN),
            1 => match first {
                Some(arg) => match parse_iso_date(arg) {
                    Some(date) => format_date(date, DEFAULT_DATE_PATTERN),
                    None => format_date(Local::now().naive_local(), arg),
                },
                None => String::new(),
            },
            _ => match (first, second) {
                (Some(iso), Some(pattern)) => parse_iso_date(iso)
                    .map(|date| format_date(date, pattern))
                    .unwrap_or_default(),
                _ => String::new(),
            },
        };

        Ok(ScopedJson::Derived(Value::String(text)))
    }
}

/// Strict ISO-8601 parsing: full RFC 3339, a naive datetime, or a bare date.
fn parse_iso_date(input: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    None
}

/// Format a date with a month-name-token pattern, empty string on failure.
fn format_date(date: NaiveDateTime, pattern: &str) -> String {
    let translated = translate_date_pattern(pattern);
    let mut out = String::new();
    // DelayedFormat reports bad directives through fmt::Error; the write!
    // guard turns that into the documented empty-string degradation.
    if write!(out, "{}", date.format(&translated)).is_err() {
        return String::new();
    }
    out
}

/// Token table, longest match first. Unrecognized characters are literals.
const DATE_TOKENS: &[(&str, &str)] = &[
    ("yyyy", "%Y"),
    ("yy", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("dd", "%d"),
    ("d", "%-d"),
    ("EEEE", "%A"),
    ("EEE", "%a"),
    ("HH", "%H"),
    ("H", "%-H"),
    ("hh", "%I"),
    ("h", "%-I"),
    ("mm", "%M"),
    ("m", "%-M"),
    ("ss", "%S"),
    ("s", "%-S"),
    ("SSS", "%3f"),
    ("a", "%p"),
];

/// Translate the template-facing date tokens (`MMMM dd, yyyy` style) into
/// the strftime directives chrono understands.
fn translate_date_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'scan: while !rest.is_empty() {
        for (token, directive) in DATE_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(directive);
                rest = tail;
                continue 'scan;
            }
        }
        let ch = rest.chars().next().unwrap_or_default();
        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }
    out
}

// ================================
// Message formatting helpers
// ================================

/// Render a single message object as `[role] content`, registered as
/// `formatMessage` / `formatMessageWithToolCalls`.
struct FormatMessageHelper {
    with_tool_calls: bool,
}

impl HelperDef for FormatMessageHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let message = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
        Ok(ScopedJson::Derived(Value::String(format_message(
            message,
            self.with_tool_calls,
        ))))
    }
}

/// Render a sequence of messages, joined with a blank line, registered as
/// `formatMessages` / `formatMessagesWithToolCalls`. Non-array input renders
/// as an empty string.
struct FormatMessagesHelper {
    with_tool_calls: bool,
}

impl HelperDef for FormatMessagesHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let text = match h.param(0).map(|p| p.value()) {
            Some(Value::Array(messages)) => messages
                .iter()
                .map(|m| format_message(m, self.with_tool_calls))
                .collect::<Vec<_>>()
                .join("\n\n"),
            _ => String::new(),
        };
        Ok(ScopedJson::Derived(Value::String(text)))
    }
}

fn format_message(message: &Value, with_tool_calls: bool) -> String {
    if !message.is_object() {
        return String::new();
    }

    let role = message.get("role").and_then(Value::as_str).unwrap_or("");
    let content = message_content_text(message.get("content"));
    let mut out = format!("[{role}] {content}");

    if with_tool_calls {
        if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                let name = call
                    .pointer("/function/name")
                    .or_else(|| call.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let arguments = call
                    .pointer("/function/arguments")
                    .or_else(|| call.get("arguments"));
                let arguments = match arguments {
                    Some(Value::String(s)) => s.clone(),
                    Some(v) => v.to_string(),
                    None => "{}".to_string(),
                };
                let _ = write!(out, "\n  - {name}({arguments})");
            }
        }
    }

    out
}

/// Message content may be a plain string or an array of text parts.
fn message_content_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

// ================================
// Utility helpers
// ================================

/// Pretty-print the argument as 2-space-indented JSON.
struct ToJsonHelper;

impl HelperDef for ToJsonHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let value = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
        let text = serde_json::to_string_pretty(value).unwrap_or_default();
        Ok(ScopedJson::Derived(Value::String(text)))
    }
}

/// Variable interpolation with readable structured output.
///
/// The registry renders a JSON object value as the literal `[object]`,
/// which is useless in a prompt. Preprocessing rewrites bare interpolations
/// to route through this helper instead: objects come out as 2-space
/// pretty-printed JSON, arrays keep the registry's bracket shape with each
/// element rendered the same way, and everything else renders exactly as
/// the registry would have rendered it.
struct InterpolateHelper;

impl HelperDef for InterpolateHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let value = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
        Ok(ScopedJson::Derived(Value::String(render_interpolated(
            value,
        ))))
    }
}

fn render_interpolated(value: &Value) -> String {
    match value {
        Value::Object(_) => serde_json::to_string_pretty(value).unwrap_or_default(),
        Value::Array(items) => {
            let mut out = String::new();
            out.push('[');
            for item in items {
                out.push_str(&render_interpolated(item));
                out.push_str(", ");
            }
            out.push(']');
            out
        }
        other => other.render(),
    }
}

/// Final element of an array, or null for empty/non-array input.
struct LastHelper;

impl HelperDef for LastHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let value = match h.param(0).map(|p| p.value()) {
            Some(Value::Array(items)) => items.last().cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        };
        Ok(ScopedJson::Derived(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_translate_date_pattern() {
        assert_eq!(translate_date_pattern("MMMM dd, yyyy"), "%B %d, %Y");
        assert_eq!(translate_date_pattern("yyyy-MM-dd"), "%Y-%m-%d");
        assert_eq!(translate_date_pattern("HH:mm:ss"), "%H:%M:%S");
        // Stray percent signs must not become directives.
        assert_eq!(translate_date_pattern("100%"), "100%%");
    }

    #[test]
    fn test_parse_iso_date_variants() {
        assert!(parse_iso_date("2024-03-05").is_some());
        assert!(parse_iso_date("2024-03-05T10:30:00").is_some());
        assert!(parse_iso_date("2024-03-05T10:30:00Z").is_some());
        assert!(parse_iso_date("2024-03-05T10:30:00+02:00").is_some());
        assert!(parse_iso_date("invalid_date_string").is_none());
        assert!(parse_iso_date("03/05/2024").is_none());
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(format_date(date, "MMMM dd, yyyy"), "March 05, 2024");
        assert_eq!(format_date(date, "yyyy-MM-dd"), "2024-03-05");
        assert_eq!(format_date(date, "MM"), "03");
    }

    #[test]
    fn test_loose_eq_numeric_coercion() {
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!("a"), &json!("a")));
        // A numeric string equals the number it denotes.
        assert!(loose_eq(&json!("1"), &json!(1)));
        assert!(loose_eq(&json!(2.5), &json!("2.5")));
        assert!(!loose_eq(&json!("x"), &json!(1)));
        // String pairs stay string comparisons.
        assert!(!loose_eq(&json!("01"), &json!("1")));
    }

    #[test]
    fn test_loose_cmp() {
        assert_eq!(loose_cmp(&json!(1), &json!(2)), Some(Ordering::Less));
        assert_eq!(loose_cmp(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(loose_cmp(&json!(1), &json!("a")), None);
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn test_render_interpolated() {
        assert_eq!(render_interpolated(&json!("hi")), "hi");
        assert_eq!(render_interpolated(&json!(42)), "42");
        assert_eq!(render_interpolated(&Value::Null), "");
        assert_eq!(render_interpolated(&json!({"a": 1})), "{\n  \"a\": 1\n}");
        // Primitive arrays keep the registry's bracket shape; object
        // elements pretty-print individually.
        assert_eq!(render_interpolated(&json!([1, 2])), "[1, 2, ]");
        assert_eq!(
            render_interpolated(&json!([{"a": 1}])),
            "[{\n  \"a\": 1\n}, ]"
        );
    }

    #[test]
    fn test_format_message_plain() {
        let msg = json!({"role": "user", "content": "Hello"});
        assert_eq!(format_message(&msg, false), "[user] Hello");
    }

    #[test]
    fn test_format_message_part_array_content() {
        let msg = json!({
            "role": "assistant",
            "content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]
        });
        assert_eq!(format_message(&msg, false), "[assistant] a\nb");
    }

    #[test]
    fn test_format_message_with_tool_calls() {
        let msg = json!({
            "role": "assistant",
            "content": "Checking",
            "tool_calls": [
                {"id": "c1", "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}}
            ]
        });
        assert_eq!(
            format_message(&msg, true),
            "[assistant] Checking\n  - get_weather({\"city\":\"Paris\"})"
        );
        // Variant without tool calls ignores them.
        assert_eq!(format_message(&msg, false), "[assistant] Checking");
    }

    #[test]
    fn test_format_message_null_input() {
        assert_eq!(format_message(&Value::Null, false), "");
        assert_eq!(format_message(&Value::Null, true), "");
    }
}
