//! The colorizing seam.
//!
//! [`HighlightCache`](super::HighlightCache) never colors anything itself; it
//! hands content to a [`Colorizer`]. [`SyntectColorizer`] is the real one.

use std::path::Path;

use syntect::{
    easy::HighlightLines,
    highlighting::ThemeSet,
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use super::{HighlightError, HighlightMap, HighlightSpan, Rgba, normalize_spans};

/// Theme used when the caller does not name one.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Computes a highlight map. Called from the worker thread.
pub trait Colorizer: Send + Sync {
    fn colorize(
        &self,
        content: &str,
        language: &str,
        theme: &str,
    ) -> Result<HighlightMap, HighlightError>;
}

/// `syntect` with its bundled syntaxes and themes.
pub struct SyntectColorizer {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl SyntectColorizer {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    /// Bundled themes plus every `.tmTheme` found under `folder`.
    pub fn with_theme_folder(folder: impl AsRef<Path>) -> Result<Self, HighlightError> {
        let folder = folder.as_ref();
        let mut colorizer = Self::new();
        colorizer
            .themes
            .add_from_folder(folder)
            .map_err(|err| HighlightError::ThemeFolder {
                path: folder.display().to_string(),
                message: err.to_string(),
            })?;
        Ok(colorizer)
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.themes.keys().map(String::as_str)
    }

    /// Syntax for a fence language: by name/token, then by file extension,
    /// then plain text.
    pub fn resolve_syntax(&self, language: &str) -> &SyntaxReference {
        self.syntaxes
            .find_syntax_by_token(language)
            .or_else(|| self.syntaxes.find_syntax_by_extension(language))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

impl Default for SyntectColorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Colorizer for SyntectColorizer {
    fn colorize(
        &self,
        content: &str,
        language: &str,
        theme: &str,
    ) -> Result<HighlightMap, HighlightError> {
        if matches!(language.to_lowercase().as_str(), "text" | "plaintext") {
            return Ok(Vec::new());
        }
        let theme = self
            .themes
            .themes
            .get(theme)
            .ok_or_else(|| HighlightError::UnknownTheme(theme.to_string()))?;

        let syntax = self.resolve_syntax(language);
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut spans = Vec::new();
        let mut offset = 0;

        for line in LinesWithEndings::from(content) {
            for (style, text) in highlighter.highlight_line(line, &self.syntaxes)? {
                let color = style.foreground;
                spans.push(HighlightSpan {
                    range: offset..offset + text.len(),
                    color: Rgba::new(color.r, color.g, color.b, color.a),
                });
                offset += text.len();
            }
        }
        Ok(normalize_spans(spans))
    }
}
