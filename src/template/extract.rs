//! Static variable extraction from prompt templates.
//!
//! Parses a template into the handlebars syntax tree and walks it to collect
//! the top-level variable names it references, in document order, duplicates
//! included. Scoping constructs are respected:
//!
//! - inside `{{#with x}}` every bare reference belongs to the `with` target,
//!   so only the target itself is reported;
//! - inside `{{#each xs}}` only `this.`-prefixed references are scoped to
//!   the iteration item; a bare `{{name}}` still refers to an outer variable
//!   and is reported;
//! - block parameters (`{{#each xs as |x|}}`) shadow outer names for the
//!   duration of the block;
//! - helper and keyword names are never reported.
//!
//! Parse failures yield an empty list; extraction never fails.

use handlebars::Path;
use handlebars::template::{
    BlockParam, HelperTemplate, Parameter, Template, TemplateElement,
};

use super::helpers::RESERVED_NAMES;

/// Extract the ordered list of free variable names referenced by `text`.
///
/// Duplicates are preserved; callers wanting a unique set must dedupe.
pub fn extract_variables(text: &str) -> Vec<String> {
    match Template::compile(text) {
        Ok(template) => {
            let mut walk = Walk::default();
            walk.template(&template);
            walk.found
        }
        Err(_) => Vec::new(),
    }
}

/// Traversal state threaded through the recursive walk.
#[derive(Default)]
struct Walk {
    with_depth: usize,
    each_depth: usize,
    block_params: Vec<String>,
    found: Vec<String>,
}

impl Walk {
    fn template(&mut self, template: &Template) {
        for element in &template.elements {
            self.element(element);
        }
    }

    fn element(&mut self, element: &TemplateElement) {
        match element {
            TemplateElement::Expression(ht) | TemplateElement::HtmlExpression(ht) => {
                self.expression(ht);
            }
            TemplateElement::HelperBlock(ht) => self.block(ht),
            // Raw text, decorators, partials: nothing to extract.
            _ => {}
        }
    }

    /// `{{name}}`, `{{helper a b}}`, or either inside a subexpression.
    fn expression(&mut self, ht: &HelperTemplate) {
        self.parameter(&ht.name);
        for param in &ht.params {
            self.parameter(param);
        }
    }

    fn block(&mut self, ht: &HelperTemplate) {
        match parameter_name(&ht.name) {
            Some("with") => self.with_block(ht),
            Some("each") => self.each_block(ht),
            _ => {
                // if/unless and any other block: the block name goes through
                // the normal path rules (and is filtered as a keyword), then
                // arguments and both branches are walked.
                self.expression(ht);
                self.bodies(ht);
            }
        }
    }

    /// The `with` target is recorded explicitly at entry because every path
    /// visited while the depth counter is raised is suppressed, including
    /// the target's own path node.
    fn with_block(&mut self, ht: &HelperTemplate) {
        self.with_depth += 1;
        if let Some(target) = ht.params.first().and_then(parameter_name) {
            if !RESERVED_NAMES.contains(&target) {
                self.found.push(root_name(target).to_string());
            }
        }
        self.bodies(ht);
        self.with_depth -= 1;
    }

    /// The `each` target is visited as an ordinary path in the enclosing
    /// scope, before the depth counter is raised; inside the block only
    /// `this.`-prefixed paths are suppressed, so a bare reference still gets
    /// reported.
    fn each_block(&mut self, ht: &HelperTemplate) {
        for param in &ht.params {
            self.parameter(param);
        }
        self.each_depth += 1;
        let bound = self.bind_block_params(ht.block_param.as_ref());
        self.bodies(ht);
        self.block_params.truncate(self.block_params.len() - bound);
        self.each_depth -= 1;
    }

    fn bodies(&mut self, ht: &HelperTemplate) {
        if let Some(body) = &ht.template {
            self.template(body);
        }
        if let Some(inverse) = &ht.inverse {
            self.template(inverse);
        }
    }

    /// Push the names bound by `as |a b|`, returning how many were added.
    fn bind_block_params(&mut self, block_param: Option<&BlockParam>) -> usize {
        let mut added = 0;
        let mut push = |walk: &mut Self, param: &Parameter| {
            if let Some(name) = parameter_name(param) {
                walk.block_params.push(name.to_string());
                added += 1;
            }
        };
        match block_param {
            Some(BlockParam::Single(p)) => push(self, p),
            Some(BlockParam::Pair((a, b))) => {
                push(self, a);
                push(self, b);
            }
            None => {}
        }
        added
    }

    fn parameter(&mut self, param: &Parameter) {
        match param {
            Parameter::Name(name) => self.path(name),
            Parameter::Path(path) => self.path(path_text(path)),
            Parameter::Subexpression(sub) => self.element(&sub.element),
            Parameter::Literal(_) => {}
        }
    }

    /// Apply the suppression rules to one path reference.
    fn path(&mut self, full: &str) {
        if RESERVED_NAMES.contains(&full) {
            return;
        }
        if self.with_depth > 0 {
            return;
        }
        if self.each_depth > 0 && full.starts_with("this.") {
            return;
        }
        let root = root_name(full);
        if self.block_params.iter().any(|p| p == root) {
            return;
        }
        self.found.push(root.to_string());
    }
}

/// Leading segment of a dotted path: `user` in `user.name`.
fn root_name(full: &str) -> &str {
    full.split('.').next().unwrap_or(full)
}

/// Source text of a path reference, e.g. `user.name` or `this.x`.
fn path_text(path: &Path) -> &str {
    match path {
        Path::Relative((_, raw)) | Path::Local((_, _, raw)) => raw,
    }
}

fn parameter_name(param: &Parameter) -> Option<&str> {
    match param {
        Parameter::Name(name) => Some(name),
        Parameter::Path(path) => Some(path_text(path)),
        _ => None,
    }
}
