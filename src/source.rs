use crate::ast::Ast;
use crate::error::{AxionError, Blame};
use crate::language::DEFAULT_TAB_WIDTH;
use crate::lexer::tokenize;
use crate::location::Span;
use crate::macros::MacroDef;
use crate::parser;
use crate::rewrite;
use crate::token::{Token, TokenKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of Axion source files.
pub const SOURCE_EXTENSION: &str = "ax";

/// How far [`SourceUnit::process`] goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Stop after tokenization.
    Lex,
    /// Tokens and the syntax tree.
    Parse,
    /// Parse, then lower the tree with the rewrite passes.
    #[default]
    Reduce,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Width of a tab until the unit's first indentation decides its own size.
    pub tab_width: usize,
    pub mode: ProcessingMode,
    /// Code is going to be run line by line rather than compiled.
    pub interpretation: bool,
    pub max_interpolation_depth: usize,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            mode: ProcessingMode::default(),
            interpretation: false,
            max_interpolation_depth: 32,
        }
    }
}

/// One logical compilation unit: its code, tokens, tree and blames.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub name: String,
    pub path: Option<PathBuf>,
    pub options: ProcessingOptions,
    /// Matched after the built-in macros and before any `macro` definition
    /// of the code itself.
    macros: Vec<MacroDef>,
    code: String,
    tokens: Vec<Token>,
    ast: Option<Ast>,
    blames: Vec<Blame>,
}

impl SourceUnit {
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            name: "<input>".to_string(),
            path: None,
            options: ProcessingOptions::default(),
            macros: Vec::new(),
            code: code.into(),
            tokens: Vec::new(),
            ast: None,
            blames: Vec::new(),
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let code = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_code(code)
    }

    /// Reads a unit from an `.ax` file.
    ///
    /// # Errors
    /// Returns [`AxionError::InvalidExtension`] for other extensions and
    /// [`AxionError::Io`] when the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AxionError> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            return Err(AxionError::InvalidExtension {
                path: path.to_path_buf(),
                expected: SOURCE_EXTENSION,
            });
        }
        let code = fs::read_to_string(path).map_err(|source| AxionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut unit = Self::from_code(code);
        unit.name = path.display().to_string();
        unit.path = Some(path.to_path_buf());
        Ok(unit)
    }

    #[must_use]
    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_macro(mut self, def: MacroDef) -> Self {
        self.register_macro(def);
        self
    }

    /// Adds a macro for the next [`process`](Self::process).
    pub fn register_macro(&mut self, def: MacroDef) {
        self.macros.push(def);
    }

    #[must_use]
    pub fn macros(&self) -> &[MacroDef] {
        &self.macros
    }

    /// Runs the pipeline up to `options.mode`. Earlier results are dropped,
    /// so processing twice gives the same outcome.
    pub fn process(&mut self) -> &mut Self {
        self.ast = None;
        let lexed = tokenize(&self.code, &self.options);
        debug!(
            "Lexed '{}': {} tokens, {} blames",
            self.name,
            lexed.tokens.len(),
            lexed.blames.len()
        );
        self.tokens = lexed.tokens;
        self.blames = lexed.blames;
        if self.options.mode == ProcessingMode::Lex {
            return self;
        }

        let parsed = parser::parse_with_macros(&self.tokens, &self.options, &self.macros);
        debug!(
            "Parsed '{}': {} nodes, {} blames",
            self.name,
            parsed.ast.len(),
            parsed.blames.len()
        );
        self.blames.extend(parsed.blames);
        let mut ast = parsed.ast;
        if self.options.mode == ProcessingMode::Reduce {
            let rewrites = rewrite::reduce(&mut ast);
            debug!("Reduced '{}': {rewrites} rewrites", self.name);
        }
        self.ast = Some(ast);
        self
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn ast(&self) -> Option<&Ast> {
        self.ast.as_ref()
    }

    #[must_use]
    pub fn blames(&self) -> &[Blame] {
        &self.blames
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.blames.iter().any(Blame::is_error)
    }

    /// Tokens lying inside `span`, layout tokens included.
    #[must_use]
    pub fn tokens_in(&self, span: Span) -> Vec<&Token> {
        self.tokens
            .iter()
            .filter(|t| !t.is(TokenKind::End))
            .filter(|t| span.start <= t.span.start && t.span.end <= span.end)
            .collect()
    }

    /// Source text of the tokens inside `span`, rebuilt from their values and
    /// trailing whitespace.
    #[must_use]
    pub fn render_span(&self, span: Span) -> String {
        self.tokens_in(span)
            .into_iter()
            .map(|t| t.to_source())
            .collect()
    }
}
