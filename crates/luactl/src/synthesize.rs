//! root facing variable declarations
//!
//! Every addon variable (except [EXCLUDED_VARIABLE]) is re-declared at the root with a `null`
//! default. The addon default is resolved by the rewritten lookup instead and documented in the
//! description:
//!
//! ```hcl
//! variable "size" {
//!   type = string
//!   default = null
//!   description = "Size of thing Defaults to `10`."
//! }
//! ```
use crate::declaration::{raw, Declaration, VARIABLE_BLOCK};
use hcl_edit::expr::Expression;

/// Addon internal variable, never declared at the root
pub const EXCLUDED_VARIABLE: &str = "enabled";

/// Header of every generated file
pub const BANNER: &str = "# IMPORTANT: This file is synced with the \"terraform-aws-eks-universal-addon\" module. Any changes to this file might be overwritten upon the next release of that module.";

/// Synthesized declarations of one addon module, in source order
#[derive(Debug, Clone)]
pub struct RootVariables {
    blocks: Vec<hcl::Block>,
}

impl RootVariables {
    /// [BANNER] followed by each block, separated by a blank line
    pub fn render(&self) -> Result<String, hcl::Error> {
        let mut variables = String::new();
        for block in &self.blocks {
            let body = hcl::Body::builder().add_block(block.clone()).build();
            let block = hcl::format::to_string(&body)?;

            variables.push('\n');
            variables.push_str(&align_attributes(block.trim_end()));
            variables.push('\n');
        }

        Ok(format!("{BANNER}\n{variables}"))
    }
}

/// Pads the keys of consecutive top level attributes so their `=` line up like `terraform fmt`
fn align_attributes(block: &str) -> String {
    let mut lines = Vec::new();
    let mut run = Vec::new();

    for line in block.lines() {
        match attribute_line(line) {
            Some(attribute) => run.push(attribute),
            None => {
                flush_aligned(&mut run, &mut lines);
                lines.push(line.to_string());
            }
        }
    }
    flush_aligned(&mut run, &mut lines);

    lines.join("\n")
}

/// `  <key> = <value>` at block level
fn attribute_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("  ")?;
    if rest.starts_with(' ') {
        return None;
    }

    let (key, value) = rest.split_once(" = ")?;
    let is_ident = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    is_ident.then_some((key, value))
}

fn flush_aligned(run: &mut Vec<(&str, &str)>, lines: &mut Vec<String>) {
    let width = run.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in run.drain(..) {
        lines.push(format!("  {key:<width$} = {value}"));
    }
}

#[tracing::instrument(level = "debug", skip(declarations))]
pub fn synthesize_root_variables(declarations: &[Declaration], module_name: &str) -> RootVariables {
    let blocks = declarations
        .iter()
        .filter(|declaration| {
            let excluded = declaration.name == EXCLUDED_VARIABLE;
            if excluded {
                tracing::debug!(variable = %declaration.name, "excluded from root variables");
            }
            !excluded
        })
        .map(root_block)
        .collect();

    RootVariables { blocks }
}

fn root_block(declaration: &Declaration) -> hcl::Block {
    let mut block = hcl::Block::builder(VARIABLE_BLOCK).add_label(declaration.name.as_str());

    if let Some(type_expr) = &declaration.type_expr {
        block = block.add_attribute(("type", hcl::Expression::from(type_expr.clone())));
    }

    block = block.add_attribute(("default", hcl::Expression::Null));

    if let Some(description) = root_description(declaration) {
        block = block.add_attribute(("description", description));
    }

    if let Some(sensitive) = &declaration.sensitive {
        block = block.add_attribute(("sensitive", hcl::Expression::from(sensitive.clone())));
    }

    block.build()
}

/// The source description, extended by the default value when there is one
fn root_description(declaration: &Declaration) -> Option<hcl::Expression> {
    let description = declaration.description.as_ref()?;

    let Some(default) = &declaration.default else {
        return Some(description.clone().into());
    };

    let display = default_display(default, declaration.is_string_typed());
    Some(hcl::Expression::String(format!(
        "{} Defaults to `{display}`.",
        description_text(description)
    )))
}

fn description_text(description: &Expression) -> String {
    match description {
        Expression::String(text) => text.value().trim().to_string(),
        other => match literal_template(other) {
            Some(text) => text.trim().to_string(),
            None => raw(other).replace('"', "").trim().to_string(),
        },
    }
}

/// Text of a heredoc or quoted template without interpolations or directives
fn literal_template(expr: &Expression) -> Option<String> {
    let hcl::Expression::TemplateExpr(template_expr) = hcl::Expression::from(expr.clone()) else {
        return None;
    };

    let template = hcl::Template::from_expr(&template_expr).ok()?;
    template
        .elements()
        .iter()
        .map(|element| match element {
            hcl::template::Element::Literal(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// How a default value is shown inside the description
///
/// Surrounding quotes are removed, for `string` typed variables all quotes are. An empty value
/// is shown as `""`.
pub fn default_display(default: &Expression, string_typed: bool) -> String {
    let raw = raw(default);
    let raw = raw.trim();

    let display = if string_typed {
        raw.replace('"', "")
    } else {
        raw.strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(raw)
            .to_string()
    };

    match display.trim() {
        "" => "\"\"".to_string(),
        display => display.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::declaration::{extract_blocks, VARIABLE_BLOCK};
    use crate::document::Document;
    use pretty_assertions::assert_eq;

    fn synthesize(source: &str) -> Document {
        let declarations = extract_blocks(&crate::document!(source), VARIABLE_BLOCK);
        let rendered = synthesize_root_variables(&declarations, "addon-x")
            .render()
            .unwrap();
        Document::parse(&rendered, "variables-addon-x.tf").unwrap()
    }

    fn attribute(doc: &Document, variable: &str, key: &str) -> Option<Expression> {
        doc.blocks_of(VARIABLE_BLOCK)
            .find(|block| block.labels[0].as_str() == variable)?
            .body
            .get_attribute(key)
            .map(|attribute| attribute.value.clone())
    }

    fn description(doc: &Document, variable: &str) -> Option<String> {
        match attribute(doc, variable, "description")? {
            Expression::String(text) => Some(text.value().to_string()),
            other => panic!("description is not a string: {other:?}"),
        }
    }

    #[test]
    fn single_string_variable() {
        let source = r#"
variable "size" {
  type        = string
  default     = "10"
  description = "Size of thing"
}
"#;
        let declarations = extract_blocks(&crate::document!(source), VARIABLE_BLOCK);
        let rendered = synthesize_root_variables(&declarations, "addon-x")
            .render()
            .unwrap();

        assert_eq!(
            rendered,
            format!(
                r#"{BANNER}

variable "size" {{
  type        = string
  default     = null
  description = "Size of thing Defaults to `10`."
}}
"#
            )
        );

        let doc = Document::parse(&rendered, "variables-addon-x.tf").unwrap();
        assert_eq!(doc.blocks_of(VARIABLE_BLOCK).count(), 1);
        assert_eq!(raw(&attribute(&doc, "size", "type").unwrap()), "string");
        assert_eq!(raw(&attribute(&doc, "size", "default").unwrap()), "null");
        assert_eq!(
            description(&doc, "size").as_deref(),
            Some("Size of thing Defaults to `10`.")
        );
    }

    #[test]
    fn enabled_is_never_synthesized() {
        let doc = synthesize(
            r#"
variable "enabled" {
  type    = bool
  default = true
}

variable "namespace" {
  type    = string
  default = "kube-system"
}
"#,
        );

        let names: Vec<_> = doc
            .blocks_of(VARIABLE_BLOCK)
            .map(|block| block.labels[0].as_str().to_string())
            .collect();
        assert_eq!(names, ["namespace"]);
    }

    #[test]
    fn defaults_are_always_null() {
        let doc = synthesize(
            r#"
variable "a" {
  default = { key = "value" }
}

variable "b" {
  default = null
}

variable "c" {
  type = number
}
"#,
        );

        for name in ["a", "b", "c"] {
            assert_eq!(raw(&attribute(&doc, name, "default").unwrap()), "null");
        }
    }

    #[test]
    fn quoting_policy() {
        let doc = synthesize(
            r#"
variable "name" {
  type        = string
  default     = "foo"
  description = "desc"
}

variable "replicas" {
  type        = number
  default     = 3
  description = "desc"
}

variable "mode" {
  type        = any
  default     = "fast"
  description = "desc"
}

variable "list" {
  type        = list(string)
  default     = ["a"]
  description = "desc"
}
"#,
        );

        assert_eq!(description(&doc, "name").as_deref(), Some("desc Defaults to `foo`."));
        assert_eq!(description(&doc, "replicas").as_deref(), Some("desc Defaults to `3`."));
        assert_eq!(description(&doc, "mode").as_deref(), Some("desc Defaults to `fast`."));
        assert_eq!(
            description(&doc, "list").as_deref(),
            Some("desc Defaults to `[\"a\"]`.")
        );
    }

    #[test]
    fn empty_default_is_shown_as_empty_string() {
        let doc = synthesize(
            r#"
variable "prefix" {
  type        = string
  default     = ""
  description = "desc"
}
"#,
        );

        assert_eq!(
            description(&doc, "prefix").as_deref(),
            Some("desc Defaults to `\"\"`.")
        );
    }

    #[test]
    fn description_without_default_is_kept() {
        let doc = synthesize(
            r#"
variable "required" {
  type        = string
  description = "Must be set"
}

variable "undocumented" {
  type    = string
  default = "x"
}
"#,
        );

        assert_eq!(description(&doc, "required").as_deref(), Some("Must be set"));
        assert!(attribute(&doc, "undocumented", "description").is_none());
    }

    #[test]
    fn heredoc_description_is_decoded() {
        let doc = synthesize(
            r#"
variable "values" {
  type        = map(any)
  default     = {}
  description = <<EOT
Extra values
passed to the chart
EOT
}
"#,
        );

        assert_eq!(
            description(&doc, "values").as_deref(),
            Some("Extra values\npassed to the chart Defaults to `{}`.")
        );
    }

    #[test]
    fn attributes_are_aligned() {
        let block = "variable \"a\" {\n  type = object({\n    name = string\n  })\n  default = null\n  description = \"x = y\"\n}";
        assert_eq!(
            align_attributes(block),
            "variable \"a\" {\n  type = object({\n    name = string\n  })\n  default     = null\n  description = \"x = y\"\n}"
        );
    }

    #[test]
    fn sensitive_is_carried_over() {
        let doc = synthesize(
            r#"
variable "token" {
  type      = string
  sensitive = true
  nullable  = false
}
"#,
        );

        assert_eq!(raw(&attribute(&doc, "token", "sensitive").unwrap()), "true");
        assert!(attribute(&doc, "token", "nullable").is_none());
    }

    #[test]
    fn output_is_stable() {
        let source = r#"
variable "b" {
  type        = string
  default     = "2"
  description = "second"
}

variable "a" {
  type        = map(string)
  default     = {}
  description = "first"
}
"#;
        let declarations = extract_blocks(&crate::document!(source), VARIABLE_BLOCK);
        let first = synthesize_root_variables(&declarations, "addon-x").render().unwrap();
        let second = synthesize_root_variables(&declarations, "addon-x").render().unwrap();
        assert_eq!(first, second);

        let reparsed = Document::parse(&first, "variables-addon-x.tf").unwrap();
        assert_eq!(reparsed.to_string(), first);

        let names: Vec<_> = reparsed
            .blocks_of(VARIABLE_BLOCK)
            .map(|block| block.labels[0].as_str().to_string())
            .collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn empty_module_renders_banner_only() {
        let rendered = synthesize_root_variables(&[], "addon-x").render().unwrap();
        assert_eq!(rendered, format!("{BANNER}\n"));
    }

    #[test]
    fn default_display_rules() {
        let expr = |source: &str| -> Expression { source.parse().unwrap() };

        assert_eq!(default_display(&expr("\"foo\""), true), "foo");
        assert_eq!(default_display(&expr("\"\""), true), "\"\"");
        assert_eq!(default_display(&expr("\"\""), false), "\"\"");
        assert_eq!(default_display(&expr("3"), false), "3");
        assert_eq!(default_display(&expr("[\"a\", \"b\"]"), false), "[\"a\", \"b\"]");
        assert_eq!(default_display(&expr("[\"a\", \"b\"]"), true), "[a, b]");
    }
}
