//! Parsing options and configuration.

/// Lines matching any of these (after trimming) are page or slide markers
/// left over from document conversion and are dropped before parsing.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    r"(?i)^-\s*Page\s*\d+\s*-$",
    r"(?i)^-\s*Slide\s*\d+\s*-$",
    r"^-\s*페이지\s*\d+\s*-$",
];

/// Options for parsing Markdown content.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Regular expressions for lines to drop before parsing
    pub noise_patterns: Vec<String>,

    /// Percent-encode spaces in image paths so they parse as links
    pub encode_image_spaces: bool,

    /// Normalize input to Unicode NFC before parsing
    pub normalize_unicode: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip invalid noise patterns).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Add a noise-line pattern.
    pub fn with_noise_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.noise_patterns.push(pattern.into());
        self
    }

    /// Keep every line, including page markers.
    pub fn without_noise_filter(mut self) -> Self {
        self.noise_patterns.clear();
        self
    }

    /// Enable or disable image path space encoding.
    pub fn with_image_space_encoding(mut self, encode: bool) -> Self {
        self.encode_image_spaces = encode;
        self
    }

    /// Enable or disable NFC normalization.
    pub fn with_unicode_normalization(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            noise_patterns: DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            encode_image_spaces: true,
            normalize_unicode: true,
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on an invalid noise pattern
    #[default]
    Strict,
    /// Skip invalid noise patterns with a warning
    Lenient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .lenient()
            .with_noise_pattern(r"^=== .* ===$")
            .with_image_space_encoding(false)
            .with_unicode_normalization(false);

        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert_eq!(options.noise_patterns.len(), DEFAULT_NOISE_PATTERNS.len() + 1);
        assert!(!options.encode_image_spaces);
        assert!(!options.normalize_unicode);
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(options.encode_image_spaces);
        assert!(options.normalize_unicode);
        assert!(ParseOptions::new().without_noise_filter().noise_patterns.is_empty());
    }
}
