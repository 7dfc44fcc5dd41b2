/*!
 * HTML templates for the transcript pages.
 *
 * A small logic-less template language, bound against any `Serialize`
 * view:
 *
 * - `{{ field }}` or `{{ a.b }}` substitutes an HTML-escaped scalar
 * - `{{# list }}...{{/ list }}` repeats the block for every element
 * - `{{^ list }}...{{/ list }}` renders the block only when the value is empty
 * - `{{! note }}` is a comment
 *
 * Templates are parsed once and can be rendered many times. A field that
 * the template references but the view lacks is an error, never a blank.
 */

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::errors::TemplateError;

/// Default template for the header page
pub const PAGE_ONE_TEMPLATE: &str = include_str!("../templates/page_1.html");

/// Default template for the summary page
pub const PAGE_TWO_TEMPLATE: &str = include_str!("../templates/page_2.html");

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([#^/]?)\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)$")
        .expect("tag pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Field(String),
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

struct OpenSection {
    name: String,
    inverted: bool,
    offset: usize,
    children: Vec<Node>,
}

impl Template {
    /// Parse a template source. `name` is only used in error messages.
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let syntax_error = |offset: usize, message: String| TemplateError::Syntax {
            template: name.to_string(),
            offset,
            message,
        };

        let mut root: Vec<Node> = Vec::new();
        let mut open: Vec<OpenSection> = Vec::new();
        let mut cursor = 0;

        while let Some(start) = source[cursor..].find("{{").map(|i| cursor + i) {
            let text = &source[cursor..start];
            let end = source[start + 2..]
                .find("}}")
                .map(|i| start + 2 + i)
                .ok_or_else(|| syntax_error(start, "unclosed tag".to_string()))?;
            let tag = source[start + 2..end].trim();
            cursor = end + 2;

            let target = match open.last_mut() {
                Some(section) => &mut section.children,
                None => &mut root,
            };
            if !text.is_empty() {
                target.push(Node::Text(text.to_string()));
            }

            if tag.starts_with('!') {
                continue;
            }

            let captures = TAG_PATTERN
                .captures(tag)
                .ok_or_else(|| syntax_error(start, format!("malformed tag '{{{{{}}}}}'", tag)))?;
            let sigil = captures.get(1).map_or("", |m| m.as_str());
            let path = captures[2].to_string();

            match sigil {
                "#" | "^" => open.push(OpenSection {
                    name: path,
                    inverted: sigil == "^",
                    offset: start,
                    children: Vec::new(),
                }),
                "/" => {
                    let section = open
                        .pop()
                        .ok_or_else(|| syntax_error(start, format!("closing tag '{}' without open section", path)))?;
                    if section.name != path {
                        return Err(syntax_error(
                            start,
                            format!("section '{}' closed by '{}'", section.name, path),
                        ));
                    }
                    let node = Node::Section {
                        name: section.name,
                        inverted: section.inverted,
                        children: section.children,
                    };
                    match open.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root.push(node),
                    }
                }
                _ => target.push(Node::Field(path)),
            }
        }

        if let Some(section) = open.last() {
            return Err(syntax_error(section.offset, format!("section '{}' is never closed", section.name)));
        }

        let rest = &source[cursor..];
        if !rest.is_empty() {
            root.push(Node::Text(rest.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            nodes: root,
        })
    }

    /// Template name given at parse time
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind a view and produce the HTML document
    pub fn render<T: Serialize>(&self, view: &T) -> Result<String, TemplateError> {
        let root = serde_json::to_value(view).map_err(|e| TemplateError::Binding {
            template: self.name.clone(),
            message: e.to_string(),
        })?;

        let mut output = String::new();
        let mut stack = vec![&root];
        self.render_nodes(&self.nodes, &mut stack, &mut output)?;
        Ok(output)
    }

    fn render_nodes<'v>(
        &self,
        nodes: &[Node],
        stack: &mut Vec<&'v Value>,
        output: &mut String,
    ) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => output.push_str(text),
                Node::Field(path) => {
                    let value = self.lookup(stack, path)?;
                    let text = match value {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        Value::Null => String::new(),
                        Value::Array(_) | Value::Object(_) => {
                            return Err(TemplateError::NotScalar {
                                template: self.name.clone(),
                                field: path.clone(),
                            });
                        }
                    };
                    escape_html_into(&text, output);
                }
                Node::Section { name, inverted, children } => {
                    let value = self.lookup(stack, name)?;
                    if *inverted {
                        if is_empty(value) {
                            self.render_nodes(children, stack, output)?;
                        }
                        continue;
                    }
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                stack.push(item);
                                let result = self.render_nodes(children, stack, output);
                                stack.pop();
                                result?;
                            }
                        }
                        Value::Object(_) => {
                            stack.push(value);
                            let result = self.render_nodes(children, stack, output);
                            stack.pop();
                            result?;
                        }
                        Value::Bool(true) => self.render_nodes(children, stack, output)?,
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    // Innermost context that has the first segment wins; the remaining
    // segments must resolve inside it.
    fn lookup<'v>(&self, stack: &[&'v Value], path: &str) -> Result<&'v Value, TemplateError> {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();

        let found = stack
            .iter()
            .rev()
            .find_map(|context| (*context).get(head))
            .and_then(|value| segments.try_fold(value, |current, key| current.get(key)));

        found.ok_or_else(|| TemplateError::MissingField {
            template: self.name.clone(),
            field: path.to_string(),
        })
    }
}

/// Parse and render in one step
pub fn render<T: Serialize>(source: &str, view: &T) -> Result<String, TemplateError> {
    Template::parse("inline", source)?.render(view)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn escape_html_into(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(c),
        }
    }
}
