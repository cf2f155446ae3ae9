use crate::errors::ErrorLog;
use crate::profile::{MergedProfile, ProfileField};
use chrono::{DateTime, Utc};

/// BNI Connect's per-field character limit.
pub const CHAR_LIMIT: usize = 999;
pub const PREVIEW_PLACEHOLDER: &str = "<p>Your profile preview will appear here.</p>";
pub const PREVIEW_ERROR: &str = r#"<p class="error-text">Could not generate preview due to an error.</p>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub field: ProfileField,
    pub title: &'static str,
    pub html: String,
    pub char_count: usize,
    pub over_limit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub preview: String,
    pub views: Vec<FieldView>,
    pub char_limit: usize,
}

impl Rendered {
    /// The view shown after a fatal failure: no blocks and an error notice.
    pub fn failed() -> Self {
        Self { preview: PREVIEW_ERROR.to_string(), views: Vec::new(), char_limit: CHAR_LIMIT }
    }
}

pub fn render(merged: &MergedProfile) -> Rendered {
    render_with_limit(merged, CHAR_LIMIT)
}

/// Builds the preview and the copyable blocks in canonical field order.
/// The limit only flags oversized fields; nothing is truncated.
pub fn render_with_limit(merged: &MergedProfile, char_limit: usize) -> Rendered {
    let mut preview = String::new();
    let mut views = Vec::new();

    for (field, html) in merged.iter() {
        // The title is preview-only and never part of the copyable block.
        preview.push_str(&format!("<p><strong>{}</strong></p>{}", field.title(), html));

        // UTF-16 code units, as counted by the BNI Connect text box.
        let char_count = html.encode_utf16().count();
        views.push(FieldView {
            field,
            title: field.title(),
            html: html.to_string(),
            char_count,
            over_limit: char_count > char_limit,
        });
    }

    if preview.is_empty() {
        preview = PREVIEW_PLACEHOLDER.to_string();
    }

    Rendered { preview, views, char_limit }
}

pub fn escape_html(unsafe_text: &str) -> String {
    let mut out = String::with_capacity(unsafe_text.len());
    for ch in unsafe_text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

fn render_output_group(view: &FieldView, char_limit: usize) -> String {
    let counter_class = if view.over_limit { "char-counter limit-reached" } else { "char-counter" };
    format!(
        r#"<div class="output-group" id="{key}">
    <div class="output-header">
        <h3>{title}</h3>
        <div class="output-meta">
            <span class="{counter_class}" title="{count} characters used">{count} / {limit}</span>
            <a class="copy-btn" href="fields/{key}.html" title="Open raw HTML">Raw</a>
        </div>
    </div>
    <pre><code class="html-output">{code}</code></pre>
</div>"#,
        key = view.field.key(),
        title = view.title,
        counter_class = counter_class,
        count = view.char_count,
        limit = char_limit,
        code = escape_html(&view.html),
    )
}

/// Full results page: error banner, live preview, then one block per field.
pub fn render_page(rendered: &Rendered, errors: &ErrorLog, generated_at: DateTime<Utc>) -> String {
    let error_html = errors
        .display()
        .map(|message| {
            format!(
                r#"<div id="error-message" class="error-message">{}</div>"#,
                escape_html(&message).replace('\n', "<br>")
            )
        })
        .unwrap_or_default();

    let outputs: String = rendered
        .views
        .iter()
        .map(|view| render_output_group(view, rendered.char_limit))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>BNI Connect Profile</title>
    <link rel="stylesheet" href="./style.css">
</head>
<body>
    <div class="container">
        <header>
            <h1 class="main-title">BNI Connect Profile</h1>
        </header>
        {}
        <main class="content">
            <section class="preview">
                <h2>Live Preview</h2>
                <div id="live-preview" class="live-preview">{}</div>
            </section>
            <section id="html-outputs-container" class="outputs">
                {}
            </section>
        </main>
        <footer>Generated {}</footer>
    </div>
</body>
</html>"#,
        error_html,
        rendered.preview,
        outputs,
        generated_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

pub fn generate_css() -> String {
    r#"* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

body {
  background-color: #f7f7f5;
  color: #1f1f1f;
  font-family: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;
  line-height: 1.6;
  font-size: 16px;
}

.container {
  max-width: 860px;
  margin: 0 auto;
  padding: 0 20px;
}

header {
  padding: 40px 0 24px;
}

.main-title {
  font-size: 28px;
  font-weight: 700;
  color: #c8102e;
}

.error-message {
  background: #fdecea;
  border: 1px solid #f5c2c0;
  color: #8a1c1c;
  padding: 12px 16px;
  border-radius: 8px;
  margin-bottom: 24px;
  white-space: pre-line;
}

.error-text {
  color: #8a1c1c;
}

section h2 {
  font-size: 18px;
  margin-bottom: 12px;
}

.live-preview {
  background: #ffffff;
  border: 1px solid #e2e2e2;
  border-radius: 8px;
  padding: 20px;
  margin-bottom: 40px;
}

.live-preview p {
  margin-bottom: 12px;
}

.live-preview ul {
  margin: 0 0 12px 24px;
}

.output-group {
  margin-bottom: 28px;
}

.output-header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 8px;
}

.output-meta {
  display: flex;
  align-items: center;
  gap: 12px;
}

.char-counter {
  font-size: 13px;
  color: #6b6b6b;
}

.char-counter.limit-reached {
  color: #c8102e;
  font-weight: 600;
}

.copy-btn {
  font-size: 13px;
  color: #1f1f1f;
  border: 1px solid #cfcfcf;
  border-radius: 6px;
  padding: 2px 10px;
  text-decoration: none;
}

pre {
  background: #1e1e1e;
  color: #e6e6e6;
  padding: 16px;
  border-radius: 8px;
  overflow-x: auto;
  white-space: pre-wrap;
  word-break: break-all;
  font-size: 13px;
}

footer {
  padding: 24px 0 40px;
  font-size: 13px;
  color: #8b8b8b;
}
"#
    .to_string()
}
