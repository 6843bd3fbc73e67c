//! token preserving hcl document ([Body] and the name of its source file)
//!
//! A [Document] is parsed with [hcl_edit], which keeps whitespace, comments and
//! the original formatting of every expression around. Serializing a document
//! that was not modified reproduces its source byte for byte. Edited or newly
//! inserted expressions are encoded from their syntax tree.
use hcl_edit::structure::{Block, Body};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    body: Body,
}

impl Document {
    /// Parses `source`. `name` is only used to point at the file in errors.
    pub fn parse(source: &str, name: impl Into<String>) -> Result<Self, ParseError> {
        let name = name.into();
        match hcl_edit::parser::parse_body(source) {
            Ok(body) => Ok(Self { name, body }),
            Err(source) => Err(ParseError { file: name, source }),
        }
    }

    pub fn load(file_path: &Path) -> Result<Self, LoadError> {
        tracing::debug!(path=%file_path.display(), "loading file");

        let contents = std::fs::read_to_string(file_path).map_err(|source| LoadError::Read {
            path: file_path.to_owned(),
            source,
        })?;

        let name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.display().to_string());

        Ok(Self::parse(&contents, name)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Top level blocks with the given identifier, in source order
    pub fn blocks_of<'a>(&'a self, ident: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.body
            .blocks()
            .filter(move |block| block.ident.value().as_str() == ident)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.body, f)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Unable to parse hcl file {file}")]
pub struct ParseError {
    pub file: String,
    #[source]
    pub source: hcl_edit::parser::Error,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Failed to read file {}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Utility macro to create a [Document]
///
/// ```
/// # use luactl::document;
/// let doc = document!("variable \"a\" {}");
/// assert_eq!(doc.name(), "<inline>");
///
/// let doc = document!("variables.tf" => "variable \"a\" {}");
/// assert_eq!(doc.name(), "variables.tf");
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use luactl::document;
/// document!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! document {
    { $source:expr } => {
        $crate::document::Document::parse($source, "<inline>").expect("document must parse")
    };
    { $name:expr => $source:expr } => {
        $crate::document::Document::parse($source, $name).expect("document must parse")
    };
}
