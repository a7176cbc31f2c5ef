//! Integration tests for template compilation through the public API.

use promptgate::{ContentPart, ImagePart, PromptContent, TemplateEngine, TextPart};
use std::collections::HashMap;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_basic_substitution() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text("Hello, {{name}}!", &vars(&[("name", "John")]));
    assert_eq!(out.text, "Hello, John!");
    assert!(out.error.is_none());
}

#[test]
fn test_missing_variable_interpolates_empty() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text("Hello, {{x}}!", &vars(&[]));
    assert_eq!(out.text, "Hello, !");
    assert!(out.error.is_none());
}

#[test]
fn test_if_block_whitespace_normalization() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text("{{#if c}}\nWelcome\n{{/if}}", &vars(&[("c", "true")]));
    assert_eq!(out.text, "Welcome");
}

#[test]
fn test_if_else_branches() {
    let engine = TemplateEngine::new();
    let template = "{{#if premium}}Welcome back!{{else}}Upgrade today.{{/if}}";
    assert_eq!(
        engine.compile_text(template, &vars(&[("premium", "true")])).text,
        "Welcome back!"
    );
    assert_eq!(
        engine.compile_text(template, &vars(&[])).text,
        "Upgrade today."
    );
}

#[test]
fn test_each_over_parsed_array() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text(
        "{{#each items}}- {{this}}\n{{/each}}",
        &vars(&[("items", r#"["a","b"]"#)]),
    );
    assert_eq!(out.text, "- a\n- b");
}

#[test]
fn test_with_block_scoping() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text(
        "{{#with user}}{{name}} <{{email}}>{{/with}}",
        &vars(&[("user", r#"{"name":"Ada","email":"ada@example.com"}"#)]),
    );
    assert_eq!(out.text, "Ada <ada@example.com>");
}

#[test]
fn test_comparison_and_logic_helpers() {
    let engine = TemplateEngine::new();
    let bag = vars(&[("n", "5"), ("m", "5"), ("k", "7")]);
    assert_eq!(
        engine.compile_text("{{#if (eq n m)}}same{{/if}}", &bag).text,
        "same"
    );
    assert_eq!(
        engine.compile_text("{{#if (lt n k)}}less{{/if}}", &bag).text,
        "less"
    );
    assert_eq!(
        engine
            .compile_text("{{#if (and (eq n m) (gt k n))}}both{{/if}}", &bag)
            .text,
        "both"
    );
}

#[test]
fn test_json_round_trip_pretty_printed() {
    // A structured value interpolates as 2-space-indented JSON, not as a
    // stringified map.
    let engine = TemplateEngine::new();
    let out = engine.compile_text("{{data}}", &vars(&[("data", r#"{"a":1}"#)]));
    assert_eq!(out.text, "{\n  \"a\": 1\n}");
}

#[test]
fn test_primitive_string_not_reparsed() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text("{{n}}", &vars(&[("n", "42")]));
    assert_eq!(out.text, "42");
}

#[test]
fn test_no_html_escaping() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text("{{snippet}}", &vars(&[("snippet", "<b>&\"quoted\"</b>")]));
    assert_eq!(out.text, "<b>&\"quoted\"</b>");
}

#[test]
fn test_date_helper_default_pattern() {
    let engine = TemplateEngine::new();
    // Rendered against wall-clock time; compute the expected value on both
    // sides of the call so a midnight rollover cannot flake the assertion.
    let before = chrono::Local::now().format("%B %d, %Y").to_string();
    let out = engine.compile_text("{{$date}}", &vars(&[]));
    let after = chrono::Local::now().format("%B %d, %Y").to_string();
    assert!(
        out.text == before || out.text == after,
        "unexpected date output: {:?}",
        out.text
    );
}

#[test]
fn test_date_helper_formats_iso_input() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text(r#"{{$date "2024-03-01" "yyyy/MM/dd"}}"#, &vars(&[]));
    assert_eq!(out.text, "2024/03/01");
}

#[test]
fn test_date_helper_single_pattern_argument() {
    // One non-ISO argument is a pattern applied to the current time.
    let engine = TemplateEngine::new();
    let out = engine.compile_text(r#"{{$date "yyyy-MM"}}"#, &vars(&[]));
    let shape = regex::Regex::new(r"^\d{4}-\d{2}$").unwrap();
    assert!(shape.is_match(&out.text), "unexpected output: {:?}", out.text);
}

#[test]
fn test_date_helper_invalid_input_degrades_silently() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text(r#"{{$date "invalid_date_string" "MM"}}"#, &vars(&[]));
    assert_eq!(out.text, "");
    assert!(out.error.is_none());
}

#[test]
fn test_to_json_helper() {
    let engine = TemplateEngine::new();
    let out = engine.compile_text("{{toJSON obj}}", &vars(&[("obj", r#"{"k":"v"}"#)]));
    assert_eq!(out.text, "{\n  \"k\": \"v\"\n}");
}

#[test]
fn test_format_messages_helper() {
    let engine = TemplateEngine::new();
    let history = r#"[
        {"role": "user", "content": "Hi"},
        {"role": "assistant", "content": "Hello!"}
    ]"#;
    let out = engine.compile_text("{{formatMessages history}}", &vars(&[("history", history)]));
    assert_eq!(out.text, "[user] Hi\n\n[assistant] Hello!");
}

#[test]
fn test_broken_template_returns_source_and_error() {
    let engine = TemplateEngine::new();
    let source = "Hello {{#if unclosed";
    let out = engine.compile_text(source, &vars(&[]));
    assert_eq!(out.text, source);
    assert!(out.error.is_some());
}

#[test]
fn test_content_array_preserves_untemplated_image_part() {
    let engine = TemplateEngine::new();
    let image = ContentPart::Image(ImagePart::new("https://example.com/static.png"));
    let content = PromptContent::Parts(vec![
        ContentPart::Text(TextPart::new("Look at {{thing}}:")),
        image.clone(),
    ]);

    let compiled = engine
        .compile_content(Some(&content), &vars(&[("thing", "this")]))
        .unwrap();
    match compiled {
        PromptContent::Parts(parts) => {
            assert_eq!(parts[0], ContentPart::Text(TextPart::new("Look at this:")));
            assert_eq!(parts[1], image);
        }
        other => panic!("expected parts, got {other:?}"),
    }
}

#[test]
fn test_unrecognized_part_passes_through() {
    let engine = TemplateEngine::new();
    let raw = serde_json::json!({"type": "audio", "url": "https://x/{{not_a_var}}.mp3"});
    let content = PromptContent::Parts(vec![ContentPart::Other(raw.clone())]);

    let compiled = engine.compile_content(Some(&content), &vars(&[])).unwrap();
    assert_eq!(
        compiled,
        PromptContent::Parts(vec![ContentPart::Other(raw)])
    );
}
