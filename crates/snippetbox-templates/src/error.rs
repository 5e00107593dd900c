//! Template build and render errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building the template cache.
///
/// Every variant is fatal: the server must not start with a partially
/// composed cache.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// An action could not be parsed.
    #[error("{file}:{line}: {message}")]
    Syntax {
        /// File the action is in
        file: String,
        /// 1-based line of the action
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A block was opened and never closed.
    #[error("{file}:{line}: unclosed {{{{{keyword}}}}}")]
    UnclosedBlock {
        /// File the block is in
        file: String,
        /// Line of the opening action
        line: usize,
        /// `if`, `range`, `with` or `define`
        keyword: &'static str,
    },

    /// `{{else}}` or `{{end}}` without a matching block.
    #[error("{file}:{line}: unexpected {{{{{keyword}}}}}")]
    UnexpectedAction {
        /// File the action is in
        file: String,
        /// Line of the action
        line: usize,
        /// `else` or `end`
        keyword: &'static str,
    },

    /// Two templates with the same name in one page set.
    #[error("template {name:?} is defined in both {first} and {second}")]
    DuplicateDefinition {
        /// Template name
        name: String,
        /// File of the first definition
        first: String,
        /// File of the second definition
        second: String,
    },

    /// `{{template "name"}}` names a template the page set does not have.
    #[error("page {page}: no such template {name:?}")]
    UndefinedTemplate {
        /// Page whose set is missing the template
        page: String,
        /// Referenced name
        name: String,
    },
}

impl TemplateError {
    pub(crate) fn syntax(file: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }
}

/// Errors raised while executing a template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The cache has no set for the requested page.
    #[error("the template {0} does not exist")]
    PageNotFound(String),

    /// The set has no template with this name.
    #[error("no such template {0:?}")]
    UndefinedTemplate(String),

    /// Template inclusion nested deeper than the limit.
    #[error("exceeded maximum template depth ({0})")]
    DepthExceeded(usize),

    /// A field was read from a value that has no fields.
    #[error("can't evaluate field {field} in type {kind}")]
    Field {
        /// Field name
        field: String,
        /// JSON type of the value
        kind: &'static str,
    },

    /// `{{range}}` over something that is not a list or map.
    #[error("range can't iterate over {0}")]
    NotIterable(&'static str),

    /// A template function rejected its input.
    #[error("error calling {name}: {message}")]
    Function {
        /// Function name
        name: &'static str,
        /// What went wrong
        message: String,
    },

    /// The render data could not be converted to a template value.
    #[error("failed to serialize template data: {0}")]
    Data(#[from] serde_json::Error),
}
