//! Prompt template compilation.
//!
//! Prompts are authored in a constrained Handlebars dialect: interpolation,
//! `if`/`unless`/`with`/`each` blocks, and a fixed helper set. Before a
//! prompt is sent to a model its variables are interpolated by this engine.
//!
//! Two properties drive the design:
//!
//! - **Whitespace matters.** The rendered text is fed to an LLM, so the
//!   engine normalizes the stray newlines that block syntax would otherwise
//!   leave behind, and HTML escaping is disabled outright.
//! - **Rendering never fails.** A prompt that does not compile is sent as
//!   its own source text together with the captured error; a broken template
//!   degrades visibly instead of aborting the request.

mod extract;
mod helpers;
mod values;

pub use extract::extract_variables;

use crate::error::Error;
use crate::types::{ContentPart, ImagePart, PromptContent, TextPart};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Result of compiling a text template: the rendered text, or the original
/// input paired with the captured error.
#[derive(Debug)]
pub struct CompiledText {
    pub text: String,
    pub error: Option<Error>,
}

/// Template engine with the helper set baked in at construction.
///
/// Construction is cheap and the engine is immutable afterwards, so a single
/// instance can be shared freely across tasks; every render call is a pure
/// function of its inputs.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        // Output is plain prompt text fed to a model, never markup.
        registry.register_escape_fn(handlebars::no_escape);
        helpers::register(&mut registry);
        Self { registry }
    }

    /// Compile and render a text template against a variable bag.
    ///
    /// Never fails: on any parse or render error the original input text is
    /// returned unchanged alongside the error.
    pub fn compile_text(&self, text: &str, variables: &HashMap<String, String>) -> CompiledText {
        let prepared = values::prepare_variables(variables);
        let preprocessed = wrap_bare_interpolations(&preprocess(text));
        match self.registry.render_template(&preprocessed, &prepared) {
            Ok(mut rendered) => {
                // Template files conventionally end in a newline; exactly one
                // trailing newline is stripped to compensate.
                if rendered.ends_with('\n') {
                    rendered.pop();
                }
                CompiledText {
                    text: rendered,
                    error: None,
                }
            }
            Err(e) => CompiledText {
                text: text.to_string(),
                error: Some(Error::Template(e)),
            },
        }
    }

    /// Compile prompt content of either shape.
    ///
    /// String content returns only the best-effort rendered text. Part
    /// arrays are mapped part-wise: text parts get their text compiled,
    /// image parts get their URL compiled, and unrecognized parts pass
    /// through untouched with order preserved.
    pub fn compile_content(
        &self,
        content: Option<&PromptContent>,
        variables: &HashMap<String, String>,
    ) -> Option<PromptContent> {
        match content? {
            PromptContent::Text(text) => Some(PromptContent::Text(
                self.compile_text(text, variables).text,
            )),
            PromptContent::Parts(parts) => Some(PromptContent::Parts(
                parts
                    .iter()
                    .map(|part| self.compile_part(part, variables))
                    .collect(),
            )),
        }
    }

    fn compile_part(&self, part: &ContentPart, variables: &HashMap<String, String>) -> ContentPart {
        match part {
            ContentPart::Text(text) => {
                ContentPart::Text(TextPart::new(self.compile_text(&text.text, variables).text))
            }
            ContentPart::Image(image) => ContentPart::Image(ImagePart::new(
                self.compile_text(&image.image, variables).text,
            )),
            other @ ContentPart::Other(_) => other.clone(),
        }
    }

    /// Extract the free variable names referenced by a template.
    pub fn extract_variables(&self, text: &str) -> Vec<String> {
        extract::extract_variables(text)
    }
}

/// Normalize block-construct newlines before compilation.
///
/// Prompt authoring leaves a newline around every block marker and around
/// `{{else}}`; left in place those become blank lines in the rendered
/// prompt. Collapsed here: a newline before/after `{{else}}`, a newline
/// before the closing marker of `if`, `unless`, and `with` blocks, and the
/// newline after a line-initial opening marker of those same blocks.
/// `each` markers are left alone so iteration output keeps its line
/// structure.
fn preprocess(text: &str) -> String {
    let collapsed = text
        .replace("\n{{else}}", "{{else}}")
        .replace("{{else}}\n", "{{else}}")
        .replace("\n{{/if}}", "{{/if}}")
        .replace("\n{{/unless}}", "{{/unless}}")
        .replace("\n{{/with}}", "{{/with}}");
    strip_newline_after_scoped_opens(&collapsed)
}

/// Remove the single newline that follows a `{{#if ...}}`, `{{#unless ...}}`
/// or `{{#with ...}}` opening marker, but only when the marker stands alone
/// at the start of its line (at most whitespace before it). An opener in the
/// middle of a line keeps its trailing newline. The opening tag carries an
/// arbitrary condition, so this is a small scan rather than a literal
/// replacement.
fn strip_newline_after_scoped_opens(text: &str) -> String {
    const OPENERS: &[&str] = &["{{#if", "{{#unless", "{{#with"];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("{{#") {
        let (head, tail) = rest.split_at(idx);
        out.push_str(head);

        let line_prefix = out.rfind('\n').map_or(out.as_str(), |p| &out[p + 1..]);
        let standalone = line_prefix.chars().all(char::is_whitespace);
        let scoped = OPENERS
            .iter()
            .any(|open| tail.strip_prefix(open).is_some_and(|t| t.starts_with([' ', '}'])));
        match tail.find("}}") {
            Some(close) => {
                let (marker, after) = tail.split_at(close + 2);
                out.push_str(marker);
                rest = if scoped && standalone {
                    after.strip_prefix('\n').unwrap_or(after)
                } else {
                    after
                };
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Route bare `{{path}}` interpolations through the internal `interpolate`
/// helper so structured values come out as readable JSON instead of the
/// registry's `[object]` placeholder.
///
/// Only plain path references are rewritten. Block markers, `{{else}}`,
/// helper invocations (anything with whitespace or a subexpression),
/// `@`-data references, triple-stash expressions, and the registered helper
/// names are left untouched, so every other construct renders natively.
fn wrap_bare_interpolations(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;
    while let Some(idx) = rest.find("{{") {
        let (head, tail) = rest.split_at(idx);
        out.push_str(head);

        if tail.starts_with("{{{") {
            match tail.find("}}}") {
                Some(close) => {
                    let (marker, after) = tail.split_at(close + 3);
                    out.push_str(marker);
                    rest = after;
                    continue;
                }
                None => {
                    out.push_str(tail);
                    return out;
                }
            }
        }

        match tail[2..].find("}}") {
            Some(rel) => {
                let inner = &tail[2..2 + rel];
                let after = &tail[2 + rel + 2..];
                let name = inner.trim();
                if is_bare_reference(name) {
                    out.push_str("{{");
                    out.push_str(helpers::INTERPOLATE);
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("}}");
                } else {
                    out.push_str(&tail[..2 + rel + 2]);
                }
                rest = after;
            }
            None => {
                out.push_str(tail);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A plain path reference: not a block marker, helper call, data variable,
/// literal, or reserved name.
fn is_bare_reference(name: &str) -> bool {
    if name.is_empty()
        || name == "else"
        || name.starts_with(['#', '/', '^', '!', '>', '&', '*', '@', '(', '"', '\''])
        || name.contains(char::is_whitespace)
    {
        return false;
    }
    !helpers::RESERVED_NAMES.contains(&name)
}
