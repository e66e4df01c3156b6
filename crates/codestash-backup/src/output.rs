//! Shared rendering of bundles and listings.
//!
//! Every bundle is rendered through [`BundleWriter`], so the per-file header
//! and body rules are identical across steps: the header names the path
//! relative to the scanned root, the body is optionally line-numbered,
//! fenced or HTML-escaped.

use crate::reader::FileText;
use chrono::Local;
use codestash_core::{OutputConfig, OutputFormat, SeparatorStyle};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Fence language for a file path, from its extension.
pub fn language_hint(path: &str) -> &'static str {
    let ext = match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => ext.to_lowercase(),
        _ => return "text",
    };
    match ext.as_str() {
        "ts" => "typescript",
        "tsx" => "tsx",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "py" => "python",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "sql" => "sql",
        "sh" => "bash",
        "go" => "go",
        "rs" => "rust",
        "java" => "java",
        "kt" => "kotlin",
        "vue" => "vue",
        "svelte" => "svelte",
        _ => "text",
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Prefix every line with its right-aligned 1-based number.
pub fn add_line_numbers(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let width = lines.len().to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$} | {}", i + 1, line, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[Size: 1.5KB | Lines: 42]`; the line count is omitted when zero.
pub fn stats_annotation(size_bytes: u64, lines: usize) -> String {
    let size_kb = size_bytes as f64 / 1024.0;
    if lines > 0 {
        format!("[Size: {:.1}KB | Lines: {}]", size_kb, lines)
    } else {
        format!("[Size: {:.1}KB]", size_kb)
    }
}

const HTML_STYLE: &str = "\
body { font-family: 'SF Mono', Monaco, 'Courier New', monospace; background: #1a1a2e; color: #eee; padding: 20px; }
.file-block { background: #16213e; border-radius: 8px; margin: 16px 0; padding: 16px; }
.file-header { color: #4fc3f7; font-weight: bold; border-bottom: 1px solid #333; padding-bottom: 8px; margin-bottom: 12px; }
.file-stats { color: #888; font-size: 0.85em; }
pre { margin: 0; overflow-x: auto; white-space: pre-wrap; word-wrap: break-word; }
code { display: block; }";

fn html_preamble(title: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n<style>\n{style}\n</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<p>Generated: {generated}</p>\n",
        title = title,
        style = HTML_STYLE,
        generated = Local::now().to_rfc3339(),
    )
}

const HTML_POSTAMBLE: &str = "</body>\n</html>\n";

/// Wrap an HTML fragment in a self-contained document.
pub fn html_document(title: &str, body: &str) -> String {
    format!("{}{}{}", html_preamble(title), body, HTML_POSTAMBLE)
}

/// Streams one bundle file, entry by entry.
pub struct BundleWriter {
    out: BufWriter<File>,
    path: PathBuf,
    config: OutputConfig,
    entries: usize,
}

impl BundleWriter {
    /// Create `path` (and its parent) and write any document preamble.
    pub fn create(path: &Path, config: &OutputConfig, title: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        if config.format == OutputFormat::Html {
            out.write_all(html_preamble(title).as_bytes())?;
        }
        Ok(Self {
            out,
            path: path.to_path_buf(),
            config: config.clone(),
            entries: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append free text verbatim, outside any entry.
    pub fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    /// Append one file under a header naming `rel`.
    pub fn write_entry(&mut self, rel: &str, file: &FileText) -> io::Result<()> {
        let rendered = match self.config.format {
            OutputFormat::Html => self.render_html(rel, file),
            OutputFormat::Txt | OutputFormat::Md => self.render_text(rel, file),
        };
        self.out.write_all(rendered.as_bytes())?;
        self.entries += 1;
        Ok(())
    }

    /// Write any document postamble and flush.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        if self.config.format == OutputFormat::Html {
            self.out.write_all(HTML_POSTAMBLE.as_bytes())?;
        }
        self.out.flush()?;
        Ok(self.path)
    }

    fn header(&self, rel: &str) -> String {
        let style = match (self.config.format, self.config.separator_style) {
            (OutputFormat::Md, SeparatorStyle::Equals) => SeparatorStyle::Markdown,
            (_, style) => style,
        };
        style.render(self.config.custom_separator.as_deref(), rel)
    }

    fn body(&self, file: &FileText) -> String {
        if self.config.include_line_numbers {
            add_line_numbers(&file.text)
        } else {
            file.text.clone()
        }
    }

    fn render_text(&self, rel: &str, file: &FileText) -> String {
        let mut rendered = self.header(rel);
        if self.config.include_file_stats && !file.unreadable {
            rendered.push_str(&stats_annotation(file.size_bytes, file.line_count()));
            rendered.push('\n');
        }

        let body = self.body(file);
        let fenced = self.config.format == OutputFormat::Md || self.config.wrap_in_code_block;
        if fenced {
            rendered.push_str("```");
            rendered.push_str(language_hint(rel));
            rendered.push('\n');
        }
        rendered.push_str(&body);
        if !body.ends_with('\n') {
            rendered.push('\n');
        }
        if fenced {
            rendered.push_str("```\n");
        }
        rendered.push('\n');
        rendered
    }

    fn render_html(&self, rel: &str, file: &FileText) -> String {
        let stats = if self.config.include_file_stats && !file.unreadable {
            format!(
                " <span class=\"file-stats\">{}</span>",
                stats_annotation(file.size_bytes, file.line_count())
            )
        } else {
            String::new()
        };
        format!(
            "<div class=\"file-block\">\n<div class=\"file-header\">{}{}</div>\n<pre><code>{}</code></pre>\n</div>\n",
            escape_html(rel),
            stats,
            escape_html(&self.body(file)),
        )
    }
}

/// Write a single-block listing such as a tree or a path list.
pub fn write_listing(
    path: &Path,
    format: OutputFormat,
    title: &str,
    heading: Option<&str>,
    body: &str,
) -> io::Result<()> {
    let rendered = match format {
        OutputFormat::Txt => {
            let mut text = body.to_string();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text
        }
        OutputFormat::Md => {
            let heading = heading
                .map(|h| format!("### {}\n\n", h))
                .unwrap_or_default();
            format!("{}```text\n{}\n```\n", heading, body)
        }
        OutputFormat::Html => {
            let heading = heading
                .map(|h| format!("<h3>{}</h3>\n", escape_html(h)))
                .unwrap_or_default();
            html_document(title, &format!("{}<pre>{}</pre>\n", heading, escape_html(body)))
        }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text(content: &str) -> FileText {
        FileText {
            text: content.to_string(),
            truncated: false,
            size_bytes: content.len() as u64,
            unreadable: false,
        }
    }

    fn render(config: OutputConfig, entries: &[(&str, &str)]) -> String {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.out");
        let mut writer = BundleWriter::create(&path, &config, "bundle").unwrap();
        for (rel, content) in entries {
            writer.write_entry(rel, &text(content)).unwrap();
        }
        assert_eq!(writer.entries(), entries.len());
        let path = writer.finish().unwrap();
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_language_hint() {
        assert_eq!(language_hint("src/a.ts"), "typescript");
        assert_eq!(language_hint("App.TSX"), "tsx");
        assert_eq!(language_hint("deploy.sh"), "bash");
        assert_eq!(language_hint("Dockerfile"), "text");
        assert_eq!(language_hint("apps.v2/Makefile"), "text");
        assert_eq!(language_hint(".eslintrc"), "text");
    }

    #[test]
    fn test_line_numbers_are_right_aligned() {
        let numbered = add_line_numbers(&"x\n".repeat(10));
        let lines: Vec<&str> = numbered.split('\n').collect();
        assert_eq!(lines[0], " 1 | x");
        assert_eq!(lines[10], "11 | ");
    }

    #[test]
    fn test_stats_annotation() {
        assert_eq!(stats_annotation(1536, 42), "[Size: 1.5KB | Lines: 42]");
        assert_eq!(stats_annotation(0, 0), "[Size: 0.0KB]");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_plain_bundle() {
        let out = render(
            OutputConfig {
                include_file_stats: false,
                ..OutputConfig::default()
            },
            &[("src/a.ts", "const a = 1;"), ("src/b.ts", "const b = 2;\n")],
        );
        assert_eq!(
            out,
            "\n===== src/a.ts =====\nconst a = 1;\n\n\n===== src/b.ts =====\nconst b = 2;\n\n"
        );
    }

    #[test]
    fn test_markdown_bundle_is_fenced_with_markdown_headers() {
        let out = render(
            OutputConfig {
                format: OutputFormat::Md,
                ..OutputConfig::default()
            },
            &[("src/a.ts", "const a = 1;\n")],
        );
        assert!(out.starts_with("\n## src/a.ts\n[Size: 0.0KB | Lines: 1]\n```typescript\n"));
        assert!(out.contains("const a = 1;\n```\n"));
    }

    #[test]
    fn test_html_bundle_is_a_document_with_escaped_content() {
        let out = render(
            OutputConfig {
                format: OutputFormat::Html,
                ..OutputConfig::default()
            },
            &[("src/a.tsx", "<App />")],
        );
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<div class=\"file-header\">src/a.tsx"));
        assert!(out.contains("&lt;App /&gt;"));
        assert!(out.ends_with("</html>\n"));
    }

    #[test]
    fn test_custom_separator_and_wrap() {
        let out = render(
            OutputConfig {
                separator_style: SeparatorStyle::Custom,
                custom_separator: Some("// FILE: {path}\n".to_string()),
                wrap_in_code_block: true,
                include_file_stats: false,
                include_line_numbers: true,
                ..OutputConfig::default()
            },
            &[("x.py", "print(1)")],
        );
        assert_eq!(out, "// FILE: x.py\n```python\n1 | print(1)\n```\n\n");
    }

    #[test]
    fn test_listing_formats() {
        let dir = TempDir::new().unwrap();

        let txt = dir.path().join("paths.txt");
        write_listing(&txt, OutputFormat::Txt, "paths", Some("All paths"), "a\nb").unwrap();
        assert_eq!(fs::read_to_string(&txt).unwrap(), "a\nb\n");

        let md = dir.path().join("paths.md");
        write_listing(&md, OutputFormat::Md, "paths", Some("All paths"), "a\nb").unwrap();
        assert_eq!(
            fs::read_to_string(&md).unwrap(),
            "### All paths\n\n```text\na\nb\n```\n"
        );

        let html = dir.path().join("tree.html");
        write_listing(&html, OutputFormat::Html, "tree", None, "a<b").unwrap();
        let html = fs::read_to_string(&html).unwrap();
        assert!(html.contains("<pre>a&lt;b</pre>"));
    }
}
