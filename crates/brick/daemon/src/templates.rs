//! Minimal HTML template engine
//!
//! Templates are registered by name and may reference context values with
//! `{{ dotted.path }}`; values are HTML-escaped. A template that was never
//! registered renders a generic brick frame, so that every registered brick
//! has a visible fragment.

use brick_registry::{RegistryError, TemplateRenderer};
use serde_json::Value;
use std::collections::HashMap;

const FALLBACK_TEMPLATE: &str = r#"<div class="brick" id="brick-{{ brick.id }}" data-brick-id="{{ brick.id }}" data-template="{{ template }}"><div class="brick-header">{{ brick.verbose_name }}</div></div>"#;

/// Named-template renderer
#[derive(Debug, Clone, Default)]
pub struct HtmlTemplates {
    templates: HashMap<String, String>,
}

impl HtmlTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
        path.split('.').try_fold(context, |value, key| match value {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            _ => None,
        })
    }

    fn substitute(source: &str, template: &str, context: &Value) -> Result<String, RegistryError> {
        let mut out = String::with_capacity(source.len());
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                RegistryError::Template(format!("{}: unclosed placeholder", template))
            })?;

            let path = after[..end].trim();
            let text = if path == "template" {
                template.to_string()
            } else {
                match Self::lookup(context, path) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                }
            };
            out.push_str(&escape(&text));
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

impl TemplateRenderer for HtmlTemplates {
    fn render(&self, template: &str, context: &Value) -> brick_registry::Result<String> {
        let source = self
            .templates
            .get(template)
            .map(String::as_str)
            .unwrap_or(FALLBACK_TEMPLATE);
        Self::substitute(source, template, context)
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
