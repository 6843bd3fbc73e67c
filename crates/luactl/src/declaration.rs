//! variable declarations of a module
//!
//! Collects the `variable "<name>" { ... }` blocks of a [Document] into [Declaration]s and
//! derives the [DefaultTable] the rewrite engine falls back to.
use crate::document::Document;
use hcl_edit::expr::{Expression, Null};
use hcl_edit::repr::{Decor, Decorate, Decorated};
use hcl_edit::structure::Block;

/// Block identifier of a variable declaration
pub const VARIABLE_BLOCK: &str = "variable";

/// One `variable` block
///
/// Expressions are cloned from the source document and keep their inner formatting.
/// A missing `default` is different from `default = null`.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub type_expr: Option<Expression>,
    pub default: Option<Expression>,
    pub description: Option<Expression>,
    pub sensitive: Option<Expression>,
}

impl Declaration {
    /// Returns `None` for blocks without a (non-empty) name label
    pub fn from_block(block: &Block) -> Option<Self> {
        let name = block.labels.first()?.as_str();
        if name.is_empty() {
            return None;
        }

        let attribute = |key: &str| {
            block
                .body
                .get_attribute(key)
                .map(|attribute| attribute.value.clone())
        };

        Some(Self {
            name: name.to_string(),
            type_expr: attribute("type"),
            default: attribute("default"),
            description: attribute("description"),
            sensitive: attribute("sensitive"),
        })
    }

    /// Whether the declared type is exactly `string`
    pub fn is_string_typed(&self) -> bool {
        self.type_expr
            .as_ref()
            .is_some_and(|expr| raw(expr) == "string")
    }
}

/// Top level blocks of the given kind that carry a name, in source order
///
/// Blocks without a label are incomplete stubs and are dropped.
pub fn extract_blocks(document: &Document, kind: &str) -> Vec<Declaration> {
    document
        .blocks_of(kind)
        .filter_map(|block| {
            let declaration = Declaration::from_block(block);
            if declaration.is_none() {
                tracing::debug!(file = document.name(), kind, "dropping block without name");
            }
            declaration
        })
        .collect()
}

/// Variable name to the expression used as lookup default
///
/// Names declared without `default` map to `null`.
#[derive(Debug, Default, Clone)]
pub struct DefaultTable {
    defaults: indexmap::IndexMap<String, Expression>,
}

impl DefaultTable {
    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.defaults.get(name)
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

impl<'a> FromIterator<&'a Declaration> for DefaultTable {
    fn from_iter<T: IntoIterator<Item = &'a Declaration>>(iter: T) -> Self {
        let defaults = iter
            .into_iter()
            .map(|declaration| {
                let expr = declaration
                    .default
                    .clone()
                    .map(undecorated)
                    .unwrap_or_else(null);
                (declaration.name.clone(), expr)
            })
            .collect();

        Self { defaults }
    }
}

/// `null` literal without surrounding whitespace
pub fn null() -> Expression {
    Expression::Null(Decorated::new(Null))
}

/// Strips the whitespace and comments around `expr`, keeping everything inside it
pub fn undecorated(mut expr: Expression) -> Expression {
    expr.decorate(Decor::new("", ""));
    expr
}

/// Source text of an expression without its surrounding decor
pub fn raw(expr: &Expression) -> String {
    undecorated(expr.clone()).to_string()
}
