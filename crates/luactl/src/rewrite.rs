//! rewrite of addon lookups in the consumer document
//!
//! Attributes of `module` blocks that resolve a value through `try(...)` or `lookup(...)` are
//! replaced by
//!
//! ```hcl
//! var.<name> != null ? var.<name> : lookup(local.<namespace>, "<name>", <default>)
//! ```
//!
//! so a value set at the root wins over the shared `local.<namespace>` map, which in turn wins
//! over the default declared by the addon. The replacement is assembled node by node; everything
//! else in the document is left as it was parsed.
use crate::declaration::{self, DefaultTable};
use crate::document::Document;
use crate::visit::{Visit, VisitFuncCalls};
use hcl_edit::expr::{
    BinaryOp, BinaryOperator, Conditional, Expression, FuncArgs, FuncCall, Traversal,
    TraversalOperator,
};
use hcl_edit::repr::{Decor, Decorate, Decorated, Spanned};
use hcl_edit::Ident;

/// Block identifier of module calls in the consumer document
pub const MODULE_BLOCK: &str = "module";

/// Calls that mark an attribute as resolved through the lookup idiom
pub const LOOKUP_FUNCTIONS: &[&str] = &["try", "lookup"];

/// What to do with a lookup for a name the [DefaultTable] does not know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingDefault {
    /// Fall back to `null`
    #[default]
    Null,
    /// Leave the attribute untouched
    Skip,
}

#[derive(derive_new::new, Debug)]
pub struct LookupRewriter<'a> {
    defaults: &'a DefaultTable,
    namespace_key: &'a str,
    #[new(default)]
    missing_default: MissingDefault,
}

impl<'a> LookupRewriter<'a> {
    pub fn with_missing_default(mut self, missing_default: MissingDefault) -> Self {
        self.missing_default = missing_default;
        self
    }

    /// Rewrites the document in place and returns the number of replaced attributes
    #[tracing::instrument(level = "debug", skip_all, fields(file = document.name()))]
    pub fn rewrite(&self, document: &mut Document) -> usize {
        let mut rewritten = 0;

        for block in document.body_mut().blocks_mut() {
            if block.ident.value().as_str() != MODULE_BLOCK {
                continue;
            }

            for mut attribute in block.body.attributes_mut() {
                let name = attribute.key.value().to_string();

                if !is_lookup_idiom(&attribute.value) {
                    tracing::trace!(attribute = name, "no lookup, keeping expression");
                    continue;
                }

                let Some(mut expr) = self.fallback_for(&name) else {
                    continue;
                };

                // keep the whitespace and comments around the replaced value
                expr.decorate(attribute.value.decor().clone());
                *attribute.value_mut() = expr;

                tracing::trace!(attribute = name, "lookup rewritten");
                rewritten += 1;
            }
        }

        rewritten
    }

    fn fallback_for(&self, name: &str) -> Option<Expression> {
        let default = match (self.defaults.get(name), self.missing_default) {
            (Some(default), _) => default.clone(),
            (None, MissingDefault::Null) => declaration::null(),
            (None, MissingDefault::Skip) => {
                tracing::debug!(attribute = name, "no declaration for lookup, skipping");
                return None;
            }
        };

        let expr = fallback_lookup(name, self.namespace_key, default);
        if expr.is_none() {
            tracing::warn!(
                attribute = name,
                namespace = self.namespace_key,
                "not a valid identifier, skipping"
            );
        }
        expr
    }
}

/// Rewrites all lookups of `document`, using `null` for names missing from `defaults`
pub fn rewrite_lookups(
    document: &mut Document,
    defaults: &DefaultTable,
    namespace_key: &str,
) -> usize {
    LookupRewriter::new(defaults, namespace_key).rewrite(document)
}

/// Whether `expr` calls one of [LOOKUP_FUNCTIONS]
///
/// Matches on the expression tree, text in string literals or comments never counts.
pub fn is_lookup_idiom(expr: &Expression) -> bool {
    let expr: hcl::Expression = expr.clone().into();

    let mut detector = LookupDetector::default();
    expr.visit_func_calls(&mut detector);
    detector.found
}

#[derive(Default)]
struct LookupDetector {
    found: bool,
}

impl Visit<hcl::expr::FuncCall> for LookupDetector {
    fn visit(&mut self, func_call: &hcl::expr::FuncCall) {
        if LOOKUP_FUNCTIONS.contains(&func_call.name.as_str()) {
            self.found = true;
        }
    }
}

/// `var.<name> != null ? var.<name> : lookup(local.<namespace_key>, "<name>", <default>)`
///
/// Returns `None` when `name` or `namespace_key` can not be used as identifier.
pub fn fallback_lookup(name: &str, namespace_key: &str, default: Expression) -> Option<Expression> {
    let name_ident = Ident::try_new(name).ok()?;
    let namespace_ident = Ident::try_new(namespace_key).ok()?;

    let is_set = BinaryOp::new(
        decorated(get_attr("var", name_ident.clone()), "", " "),
        Spanned::new(BinaryOperator::NotEq),
        decorated(declaration::null(), " ", ""),
    );

    let lookup = FuncCall::new(
        Ident::new("lookup"),
        FuncArgs::from(vec![
            decorated(get_attr("local", namespace_ident), "", ""),
            decorated(Expression::String(Decorated::new(name.to_string())), " ", ""),
            decorated(default, " ", ""),
        ]),
    );

    let conditional = Conditional::new(
        decorated(Expression::BinaryOp(Box::new(is_set)), "", " "),
        decorated(get_attr("var", name_ident), " ", " "),
        decorated(Expression::FuncCall(Box::new(lookup)), " ", ""),
    );

    Some(Expression::Conditional(Box::new(conditional)))
}

/// `<root>.<attr>`
fn get_attr(root: &str, attr: Ident) -> Expression {
    let traversal = Traversal::new(
        Expression::Variable(Decorated::new(Ident::new(root))),
        vec![Decorated::new(TraversalOperator::GetAttr(
            Decorated::new(attr),
        ))],
    );
    Expression::Traversal(Box::new(traversal))
}

fn decorated(mut expr: Expression, prefix: &str, suffix: &str) -> Expression {
    expr.decorate(Decor::new(prefix, suffix));
    expr
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::declaration::{extract_blocks, VARIABLE_BLOCK};
    use crate::document;
    use pretty_assertions::assert_eq;

    const VARIABLES: &str = r#"
variable "size" {
  type    = string
  default = "10"
}

variable "labels" {
  type = map(string)
}

variable "replicas" {
  type    = number
  default = 2
}
"#;

    const CONSUMER: &str = r#"locals {
  addon = {}
  lookup_in_locals = lookup(local.addon, "x", 1)
}

module "addon" {
  source = "./modules/addon" # pinned

  enabled  = var.enabled
  size     = var.size != null ? var.size : try(local.addon.size, "10")
  labels   = lookup(local.addon, "labels", {})
  note     = "call lookup() here"
  replicas = var.replicas != null ? var.replicas : try(local.addon.replicas, 2)
}
"#;

    fn defaults() -> DefaultTable {
        extract_blocks(&document!(VARIABLES), VARIABLE_BLOCK)
            .iter()
            .collect()
    }

    #[test]
    fn fallback_lookup_expression() {
        let default: Expression = "\"10\"".parse().unwrap();
        let expr = fallback_lookup("size", "addon", default).unwrap();
        insta::assert_snapshot!(
            expr.to_string(),
            @r#"var.size != null ? var.size : lookup(local.addon, "size", "10")"#
        );
    }

    #[test]
    fn fallback_lookup_rejects_invalid_identifiers() {
        assert!(fallback_lookup("not valid", "addon", declaration::null()).is_none());
        assert!(fallback_lookup("size", "1addon", declaration::null()).is_none());
    }

    #[test]
    fn rewrites_module_lookups() {
        let mut consumer = document!("addon.tf" => CONSUMER);
        let rewritten = rewrite_lookups(&mut consumer, &defaults(), "addon");

        assert_eq!(rewritten, 3);
        assert_eq!(
            consumer.to_string(),
            r#"locals {
  addon = {}
  lookup_in_locals = lookup(local.addon, "x", 1)
}

module "addon" {
  source = "./modules/addon" # pinned

  enabled  = var.enabled
  size     = var.size != null ? var.size : lookup(local.addon, "size", "10")
  labels   = var.labels != null ? var.labels : lookup(local.addon, "labels", null)
  note     = "call lookup() here"
  replicas = var.replicas != null ? var.replicas : lookup(local.addon, "replicas", 2)
}
"#
        );
    }

    #[test]
    fn unknown_names_fall_back_to_null() {
        let mut consumer = document!("module \"addon\" {\n  other = try(local.addon.other, 1)\n}\n");
        rewrite_lookups(&mut consumer, &defaults(), "addon");
        assert_eq!(
            consumer.to_string(),
            "module \"addon\" {\n  other = var.other != null ? var.other : lookup(local.addon, \"other\", null)\n}\n"
        );
    }

    #[test]
    fn unknown_names_can_be_skipped() {
        let source = "module \"addon\" {\n  other = try(local.addon.other, 1)\n}\n";
        let mut consumer = document!(source);
        let defaults = defaults();
        let rewritten = LookupRewriter::new(&defaults, "addon")
            .with_missing_default(MissingDefault::Skip)
            .rewrite(&mut consumer);

        assert_eq!(rewritten, 0);
        assert_eq!(consumer.to_string(), source);
    }

    #[test]
    fn rewriting_twice_is_stable() {
        let defaults = defaults();
        let mut consumer = document!(CONSUMER);
        rewrite_lookups(&mut consumer, &defaults, "addon");
        let first = consumer.to_string();

        let mut consumer = document!(&first);
        rewrite_lookups(&mut consumer, &defaults, "addon");
        assert_eq!(consumer.to_string(), first);
    }

    #[test]
    fn lookup_idiom_detection() {
        let expr = |source: &str| -> Expression { source.parse().unwrap() };

        assert!(is_lookup_idiom(&expr("try(local.addon.size, 1)")));
        assert!(is_lookup_idiom(&expr("lookup(local.addon, \"size\", 1)")));
        assert!(is_lookup_idiom(&expr("\"${try(local.a, \"b\")}\"")));
        assert!(!is_lookup_idiom(&expr("var.retry_count")));
        assert!(!is_lookup_idiom(&expr("\"lookup(local.addon)\"")));
        assert!(!is_lookup_idiom(&expr("coalesce(var.a, 1)")));
    }
}
