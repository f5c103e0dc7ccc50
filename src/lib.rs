pub mod api;
pub mod ast;
pub mod cursor;
pub mod error;
pub mod language;
pub mod lexer;
pub mod location;
pub mod macros;
pub mod parser;
pub mod rewrite;
pub mod source;
pub mod text_stream;
pub mod token;
pub mod utils;

pub use api::{analyze, analyze_file, analyze_with, AnalysisResult};
pub use error::{AxionError, Blame, BlameKind, Severity};
pub use source::{ProcessingMode, ProcessingOptions, SourceUnit};
