//! # Proto Grammar Parser
//!
//! Turns the raw text of a single `.proto` file into an unlinked [`FileDescriptorProto`].
//!
//! Parsing is delegated to `protox-parse`, which validates the grammar and records type names
//! exactly as written. Resolving those names against the rest of the import graph happens
//! later, when the loader links every stored file into a `prost_reflect::DescriptorPool`.
//!
//! Errors carry the 1-based line and column of the offending token.
use miette::Diagnostic;
use prost_types::FileDescriptorProto;

/// A syntax error located in the source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    fn from_protox(source: &str, err: &protox_parse::ParseError) -> Self {
        let offset = err
            .labels()
            .and_then(|mut labels| labels.next())
            .map_or(0, |label| label.offset());
        let (line, column) = locate(source, offset);

        Self {
            line,
            column,
            message: err.to_string(),
        }
    }
}

/// Parses the contents of a `.proto` file.
///
/// `name` becomes the descriptor's file name, which is how other files refer to it in their
/// `import` statements.
pub fn parse_file(name: &str, source: &str) -> Result<FileDescriptorProto, ParseError> {
    protox_parse::parse(name, source).map_err(|err| ParseError::from_protox(source, &err))
}

/// 1-based line and column of the byte `offset` in `source`.
fn locate(source: &str, offset: usize) -> (usize, usize) {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map_or(0, |last| last.chars().count())
        + 1;
    (line, column)
}
