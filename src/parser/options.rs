//! Reconstruction options and configuration.

use crate::detect::{DocumentKind, Language};

/// Options for reconstructing a document.
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to fill table skeletons and keep table HTML
    pub parse_tables: bool,

    /// Whether to pair captions with tables and figures
    pub associate_captions: bool,

    /// Document kind supplied by an external classifier
    pub document_kind: Option<DocumentKind>,

    /// Document language supplied by the caller
    pub language: Option<Language>,
}

impl ReconstructOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (downgrade broken table contracts to warnings).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable table parsing.
    pub fn with_tables(mut self, parse: bool) -> Self {
        self.parse_tables = parse;
        self
    }

    /// Keep tables as plain joined text.
    pub fn without_tables(mut self) -> Self {
        self.parse_tables = false;
        self
    }

    /// Enable or disable caption association.
    pub fn with_captions(mut self, associate: bool) -> Self {
        self.associate_captions = associate;
        self
    }

    /// Override the detected document kind.
    pub fn with_document_kind(mut self, kind: DocumentKind) -> Self {
        self.document_kind = Some(kind);
        self
    }

    /// Override the detected language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            parse_tables: true,
            associate_captions: true,
            document_kind: None,
            language: None,
        }
    }
}

/// Error handling mode during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on broken collaborator contracts
    #[default]
    Strict,
    /// Log broken contracts and fall back to best effort
    Lenient,
}
