//! HTML rendering for the critique page.

use crate::session::CritiqueMode;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use url::Url;

/// What the page shows below the form.
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    /// Critique text in markdown.
    Critique(String),
    /// An error banner.
    Error(String),
}

/// Everything needed to render the page.
#[derive(Debug, Clone)]
pub struct PageView {
    pub title: String,
    pub mode: CritiqueMode,
    /// Prompt to put back into the textarea.
    pub prompt: String,
    pub result: Option<PageResult>,
    /// Masked form of the key remembered for this browser.
    pub saved_key: Option<String>,
    /// An agent exists for the remembered key.
    pub agent_ready: bool,
    /// `data:` URI of the submitted image, shown next to its critique.
    pub preview: Option<String>,
}

impl PageView {
    pub fn new(title: &str, mode: CritiqueMode) -> Self {
        Self {
            title: title.to_string(),
            mode,
            prompt: String::new(),
            result: None,
            saved_key: None,
            agent_ready: false,
            preview: None,
        }
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = prompt.to_string();
        self
    }

    pub fn with_result(mut self, result: PageResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_saved_key(mut self, masked: String, agent_ready: bool) -> Self {
        self.saved_key = Some(masked);
        self.agent_ready = agent_ready;
        self
    }

    pub fn with_preview(mut self, data_uri: String) -> Self {
        self.preview = Some(data_uri);
        self
    }
}

struct ModeCopy {
    heading: &'static str,
    blurb: &'static str,
    upload_label: &'static str,
    prompt_label: &'static str,
    button: &'static str,
}

fn mode_copy(mode: CritiqueMode) -> ModeCopy {
    match mode {
        CritiqueMode::Image => ModeCopy {
            heading: "Image Critique Mode",
            blurb: "Upload an image (JPEG or PNG) to receive creative feedback on its \
                    composition, color balance, and artistic style.",
            upload_label: "Upload an image",
            prompt_label: "What creative feedback would you like? \
                           (e.g. Analyze the composition, lighting, and mood)",
            button: "Analyze Image",
        },
        CritiqueMode::Video => ModeCopy {
            heading: "Video Critique Mode",
            blurb: "Upload a video file (MP4, MOV, or AVI) to receive an in-depth cinematic \
                    critique that covers narrative, pacing, visual style, and technical execution.",
            upload_label: "Upload a video",
            prompt_label: "What aspects of the video would you like critiqued? \
                           (e.g. Evaluate the narrative flow, pacing, and visual style)",
            button: "Analyze & Critique Video",
        },
    }
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; }
aside { width: 18rem; padding: 1.5rem; background: #f0f2f6; }
main { flex: 1; padding: 1.5rem 3rem; max-width: 60rem; }
label { display: block; margin: 1rem 0 0.35rem; font-weight: 600; }
input[type=password], textarea { width: 100%; box-sizing: border-box; padding: 0.5rem; }
textarea { height: 150px; }
button { margin-top: 1rem; padding: 0.6rem 1.2rem; }
.error { background: #fde8e8; color: #8a1c1c; padding: 0.8rem 1rem; border-radius: 0.4rem; margin: 1rem 0; }
.success { background: #e6f4ea; color: #1e6b34; padding: 0.6rem 0.8rem; border-radius: 0.4rem; margin: 0.8rem 0; }
.note { font-size: 0.85rem; color: #555; }
#preview img, #preview video, .preview img { max-width: 100%; max-height: 24rem; margin-top: 1rem; }
.critique { border-top: 1px solid #ddd; margin-top: 1.5rem; }
"#;

// Shows the chosen file before it is submitted.
const PREVIEW_SCRIPT: &str = r#"
document.getElementById('file').addEventListener('change', function () {
  var box = document.getElementById('preview');
  box.textContent = '';
  if (!this.files.length) return;
  var file = this.files[0];
  var media = document.createElement(file.type.indexOf('video/') === 0 ? 'video' : 'img');
  media.src = URL.createObjectURL(file);
  media.controls = true;
  box.appendChild(media);
});
"#;

/// Render the full page.
pub fn render_page(view: &PageView) -> String {
    let copy = mode_copy(view.mode);
    let accept = view
        .mode
        .extensions()
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    let mut radios = String::new();
    for mode in [CritiqueMode::Image, CritiqueMode::Video] {
        let checked = if mode == view.mode { " checked" } else { "" };
        radios.push_str(&format!(
            r#"<div><input type="radio" id="mode-{value}" name="mode" value="{value}" form="critique-form"{checked} onchange="location.search='?mode='+this.value"> <label for="mode-{value}" style="display:inline">{label}</label></div>"#,
            value = mode,
            checked = checked,
            label = mode.label(),
        ));
    }

    let key_status = match &view.saved_key {
        Some(masked) => {
            let ready = if view.agent_ready {
                r#"<div class="success">Agent initialized successfully!</div>"#
            } else {
                ""
            };
            format!(
                r#"<p class="note">Using saved key {}. Enter another key to replace it.</p>{}"#,
                escape_html(masked),
                ready
            )
        }
        None => String::new(),
    };

    let preview = match &view.preview {
        Some(src) => format!(
            r#"<figure class="preview"><img src="{}" alt="Submitted image"></figure>"#,
            escape_html(src)
        ),
        None => String::new(),
    };

    let result = match &view.result {
        Some(PageResult::Critique(markdown)) => format!(
            r#"<section class="critique"><h3>Critique:</h3>{}</section>"#,
            render_markdown(markdown)
        ),
        Some(PageResult::Error(message)) => {
            format!(r#"<div class="error">{}</div>"#, escape_html(message))
        }
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<aside>
<h2>Configuration &amp; Mode</h2>
<label for="api_key">Enter your Google API Key:</label>
<input type="password" id="api_key" name="api_key" form="critique-form" autocomplete="off">
{key_status}
<label>Select Media Type</label>
{radios}
</aside>
<main>
<h1>{title}</h1>
<p>Welcome to the {title}, your creative companion for multimedia analysis. Upload a digital
artwork or a video and the agent will combine Google Gemini with live web research to give
detailed, actionable feedback.</p>
<h2>{heading}</h2>
<p>{blurb}</p>
<form id="critique-form" method="post" action="/critique" enctype="multipart/form-data">
<label for="file">{upload_label}</label>
<input type="file" id="file" name="file" accept="{accept}">
<div id="preview"></div>
<label for="prompt">{prompt_label}</label>
<textarea id="prompt" name="prompt">{prompt}</textarea>
<button type="submit">{button}</button>
</form>
{preview}
{result}
</main>
<script>{script}</script>
</body>
</html>
"#,
        title = escape_html(&view.title),
        style = STYLE,
        radios = radios,
        key_status = key_status,
        heading = copy.heading,
        blurb = copy.blurb,
        upload_label = copy.upload_label,
        accept = accept,
        prompt_label = escape_html(copy.prompt_label),
        prompt = escape_html(&view.prompt),
        button = escape_html(copy.button),
        preview = preview,
        result = result,
        script = PREVIEW_SCRIPT,
    )
}

/// Render model markdown to HTML.
///
/// Raw HTML in the input is shown as text, and link or image targets outside
/// http, https and mailto are emptied.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// Keep relative targets and http(s)/mailto URLs; anything else becomes empty.
fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    let allowed = match Url::parse(dest.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto"),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    };
    if allowed {
        dest
    } else {
        CowStr::Borrowed("")
    }
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
