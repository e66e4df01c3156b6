//! Output formatting configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default template for generated artifact names.
pub const DEFAULT_NAME_TEMPLATE: &str = "{project}_{base}_{stamp}";

/// Artifact format applied uniformly across all steps of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Txt,
    /// Markdown with fenced per-file sections
    Md,
    /// Self-contained HTML document
    Html,
}

impl OutputFormat {
    /// File extension, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => ".txt",
            OutputFormat::Md => ".md",
            OutputFormat::Html => ".html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Txt => write!(f, "txt"),
            OutputFormat::Md => write!(f, "md"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}

/// Per-file separator style for text and markdown bundles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparatorStyle {
    /// `===== path =====`
    #[default]
    Equals,
    /// `##### path #####`
    Hash,
    /// `## path`
    Markdown,
    /// `----- path -----`
    Dashed,
    /// `// === path ===`
    Comment,
    /// `<!-- path -->`
    Xml,
    /// User-supplied template with a `{path}` placeholder
    Custom,
}

impl SeparatorStyle {
    /// Template with a `{path}` placeholder.
    ///
    /// `Custom` has no built-in template and falls back to `Equals`.
    pub fn template(&self) -> &'static str {
        match self {
            SeparatorStyle::Equals | SeparatorStyle::Custom => "\n===== {path} =====\n",
            SeparatorStyle::Hash => "\n##### {path} #####\n",
            SeparatorStyle::Markdown => "\n## {path}\n",
            SeparatorStyle::Dashed => "\n----- {path} -----\n",
            SeparatorStyle::Comment => "\n// === {path} ===\n",
            SeparatorStyle::Xml => "\n<!-- {path} -->\n",
        }
    }

    /// Renders the separator line for `path`.
    pub fn render(&self, custom: Option<&str>, path: &str) -> String {
        match (self, custom) {
            (SeparatorStyle::Custom, Some(custom)) => custom.replace("{path}", path),
            _ => self.template().replace("{path}", path),
        }
    }
}

/// How bundles are rendered and named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub separator_style: SeparatorStyle,
    pub custom_separator: Option<String>,
    pub include_line_numbers: bool,
    /// Size and line count in each file header
    pub include_file_stats: bool,
    pub wrap_in_code_block: bool,
    /// Expand `name_template` for artifact names; otherwise use the bare base name
    pub dynamic_names: bool,
    pub name_template: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Txt,
            separator_style: SeparatorStyle::Equals,
            custom_separator: None,
            include_line_numbers: false,
            include_file_stats: true,
            wrap_in_code_block: false,
            dynamic_names: true,
            name_template: DEFAULT_NAME_TEMPLATE.to_string(),
        }
    }
}
