use crate::ast::Ast;
use crate::error::{AxionError, Blame, BlameReport};
use crate::source::{ProcessingOptions, SourceUnit};
use crate::token::Token;
use log::debug;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension of the debug dump written next to a source file.
pub const DEBUG_EXTENSION: &str = "dbg.json";

/// The outcome of processing one unit: its tokens, tree and blames.
///
/// Processing never fails on bad code; inspect [`blames`](Self::blames) or
/// [`has_errors`](Self::has_errors) instead.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub unit: SourceUnit,
}

impl Serialize for AnalysisResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("name", &self.unit.name)?;
        map.serialize_entry("tokens", self.unit.tokens())?;
        map.serialize_entry("ast", &self.unit.ast().map(|ast| ast.view(ast.root())))?;
        map.serialize_entry("blames", self.unit.blames())?;
        map.end()
    }
}

impl AnalysisResult {
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        self.unit.tokens()
    }

    /// The tree, absent when the unit was only lexed.
    #[must_use]
    pub fn ast(&self) -> Option<&Ast> {
        self.unit.ast()
    }

    #[must_use]
    pub fn blames(&self) -> &[Blame] {
        self.unit.blames()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.unit.has_errors()
    }

    /// Blames bound to the unit's code, ready for a `miette` handler.
    #[must_use]
    pub fn reports(&self) -> Vec<BlameReport> {
        self.blames()
            .iter()
            .map(|blame| blame.to_report(&self.unit.name, self.unit.code()))
            .collect()
    }

    /// Serializes tokens, tree and blames into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes tokens, tree and blames into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }

    /// Writes the JSON dump as `<stem>.dbg.json` next to `source_path`.
    /// The file is replaced atomically, so a reader never sees half a dump.
    ///
    /// # Errors
    /// Returns [`AxionError::Json`] if serialization fails and
    /// [`AxionError::Io`] if the file cannot be written.
    pub fn write_debug(&self, source_path: impl AsRef<Path>) -> Result<PathBuf, AxionError> {
        let target = debug_path(source_path.as_ref());
        let json = self.to_json()?;
        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_error = |source| AxionError::Io {
            path: target.clone(),
            source,
        };
        let mut file = tempfile::NamedTempFile::new_in(&directory).map_err(io_error)?;
        file.write_all(json.as_bytes()).map_err(io_error)?;
        file.persist(&target).map_err(|e| io_error(e.error))?;
        debug!("Wrote debug output to {}", target.display());
        Ok(target)
    }
}

/// `dir/name.ax` gives `dir/name.dbg.json`.
#[must_use]
pub fn debug_path(source_path: &Path) -> PathBuf {
    source_path.with_extension(DEBUG_EXTENSION)
}

/// Lexes, parses and reduces `source` with the default options.
///
/// # Example
/// ```
/// use axion_syntax::api::analyze;
///
/// let result = analyze("x = 1 < y < 3", "example.ax");
/// assert!(!result.has_errors());
/// assert!(result.to_json().unwrap().contains("\"node\": \"VarDef\""));
/// ```
#[must_use]
pub fn analyze(source: &str, file_name: &str) -> AnalysisResult {
    analyze_with(source, file_name, ProcessingOptions::default())
}

#[must_use]
pub fn analyze_with(source: &str, file_name: &str, options: ProcessingOptions) -> AnalysisResult {
    let mut unit = SourceUnit::from_code(source).with_options(options);
    unit.name = file_name.to_string();
    unit.process();
    AnalysisResult { unit }
}

/// Reads and processes an `.ax` file.
///
/// # Errors
/// Returns an [`AxionError`] if the file has another extension or cannot be read.
pub fn analyze_file(
    path: impl AsRef<Path>,
    options: ProcessingOptions,
) -> Result<AnalysisResult, AxionError> {
    let mut unit = SourceUnit::from_file(path)?.with_options(options);
    unit.process();
    Ok(AnalysisResult { unit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlameKind;
    use crate::source::ProcessingMode;

    #[test]
    fn test_simple_analysis_to_json() {
        let result = analyze("fn add(a, b):\n    return a + b\n", "add.ax");
        assert!(result.blames().is_empty());
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["name"], "add.ax");
        assert_eq!(json["ast"]["node"], "Block");
        assert_eq!(json["ast"]["block"], "root");
        assert_eq!(json["ast"]["children"][0]["node"], "FuncDef");
        assert!(json["tokens"].as_array().is_some_and(|t| !t.is_empty()));
    }

    #[test]
    fn test_simple_analysis_to_yaml() {
        let result = analyze("x = 1\n", "x.ax");
        let yaml = result.to_yaml().unwrap();
        assert!(yaml.contains("name: x.ax"));
        assert!(yaml.contains("node: VarDef"));
    }

    #[test]
    fn test_lex_only_has_no_tree() {
        let options = ProcessingOptions {
            mode: ProcessingMode::Lex,
            ..ProcessingOptions::default()
        };
        let result = analyze_with("x = 1\n", "x.ax", options);
        assert!(result.ast().is_none());
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert!(json["ast"].is_null());
    }

    #[test]
    fn test_reports_follow_blames() {
        let result = analyze("x = )\n", "bad.ax");
        assert!(result.has_errors());
        let reports = result.reports();
        assert_eq!(reports.len(), result.blames().len());
        assert!(result.blames().iter().any(|b| matches!(
            b.kind,
            BlameKind::InvalidSyntax | BlameKind::MismatchedParenthesis
        )));
    }

    #[test]
    fn test_debug_path() {
        assert_eq!(debug_path(Path::new("dir/main.ax")), PathBuf::from("dir/main.dbg.json"));
    }
}
