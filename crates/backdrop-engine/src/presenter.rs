use backdrop_contracts::error::MISSING_PROMPT_MESSAGE;
use backdrop_contracts::gallery::{ExampleEntry, Gallery};
use backdrop_contracts::generation::{GenerationResult, ImageReference};

use crate::encoder::{data_url_with_mime, UploadFormat, DATA_URL_MIME};
use crate::submission::{Submission, SubmissionOutcome};

pub const INPUT_LABEL: &str = "Attached Image";
pub const OUTPUT_LABEL: &str = "Generated Background";
pub const NO_IMAGE_MESSAGE: &str = "No image attached.";
pub const NO_IMAGE_NOTICE: &str =
    "No image attached, so nothing was generated. Attach a JPG or PNG and try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    Image { label: String, src: String },
    Info { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Info,
    Error,
}

impl StatusKind {
    fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "status-success",
            Self::Info => "status-info",
            Self::Error => "status-error",
        }
    }
}

/// What the form shows after one submission: an input/output pair and a
/// one-line status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub prompt: Option<String>,
    pub panels: Vec<Panel>,
    pub status: StatusKind,
    pub message: String,
}

impl Presentation {
    pub fn from_submission(submission: &Submission) -> Self {
        let prompt = submission.outcome.prompt().map(str::to_string);
        match &submission.outcome {
            SubmissionOutcome::PromptMissing => Self {
                prompt,
                panels: Vec::new(),
                status: StatusKind::Error,
                message: MISSING_PROMPT_MESSAGE.to_string(),
            },
            SubmissionOutcome::NoImageInfo { .. } => Self {
                prompt,
                panels: vec![
                    Panel::Info {
                        message: NO_IMAGE_MESSAGE.to_string(),
                    },
                    Panel::Info {
                        message: NO_IMAGE_NOTICE.to_string(),
                    },
                ],
                status: StatusKind::Info,
                message: NO_IMAGE_NOTICE.to_string(),
            },
            SubmissionOutcome::ResultReady { input, result, .. } => Self {
                prompt,
                panels: vec![input_panel(input.as_ref()), output_panel(result)],
                status: StatusKind::Success,
                message: "Background generated.".to_string(),
            },
            SubmissionOutcome::RequestFailed { error, .. } => Self {
                prompt,
                panels: Vec::new(),
                status: StatusKind::Error,
                message: error.to_string(),
            },
        }
    }
}

fn input_panel(input: Option<&ImageReference>) -> Panel {
    match input {
        Some(reference) => Panel::Image {
            label: INPUT_LABEL.to_string(),
            src: reference.as_str().to_string(),
        },
        None => Panel::Info {
            message: NO_IMAGE_MESSAGE.to_string(),
        },
    }
}

/// A URL result is linked as-is; it is never fetched or re-encoded.
fn output_panel(result: &GenerationResult) -> Panel {
    let src = match result {
        GenerationResult::Url(url) => url.clone(),
        GenerationResult::Inline { bytes, mime_type } => data_url_with_mime(mime_type, bytes),
    };
    Panel::Image {
        label: OUTPUT_LABEL.to_string(),
        src,
    }
}

pub fn terminal_lines(submission: &Submission) -> Vec<String> {
    let presentation = Presentation::from_submission(submission);
    let mut lines = Vec::new();
    if let Some(prompt) = &presentation.prompt {
        lines.push(format!("Prompt: {prompt}"));
    }
    for panel in &presentation.panels {
        match panel {
            Panel::Image { label, src } => lines.push(format!("{label}: {}", short_src(src))),
            Panel::Info { message } => lines.push(message.clone()),
        }
    }
    let prefix = match presentation.status {
        StatusKind::Success => "",
        StatusKind::Info => "Note: ",
        StatusKind::Error => "Error: ",
    };
    let already_shown = presentation.panels.iter().any(
        |panel| matches!(panel, Panel::Info { message } if *message == presentation.message),
    );
    if !already_shown {
        lines.push(format!("{prefix}{}", presentation.message));
    }
    lines
}

fn short_src(src: &str) -> String {
    if let Some(rest) = src.strip_prefix("data:") {
        let mime = rest.split(';').next().unwrap_or_default();
        return format!("<inline {mime}, {} chars>", src.len());
    }
    src.to_string()
}

pub fn render_page(presentation: &Presentation, gallery: &Gallery) -> String {
    let mut body = String::new();
    if let Some(prompt) = &presentation.prompt {
        body.push_str(&format!(
            "<p class=\"prompt\">{}</p>\n",
            escape_html(prompt)
        ));
    }
    body.push_str(&format!(
        "<p class=\"{}\">{}</p>\n",
        presentation.status.css_class(),
        escape_html(&presentation.message)
    ));
    if !presentation.panels.is_empty() {
        body.push_str("<div class=\"compare\">\n");
        for panel in &presentation.panels {
            body.push_str(&render_panel(panel));
        }
        body.push_str("</div>\n");
    }
    body.push_str(&gallery_section(gallery));
    page("Backdrop", &body)
}

pub fn render_gallery(gallery: &Gallery) -> String {
    page("Backdrop examples", &gallery_section(gallery))
}

fn render_panel(panel: &Panel) -> String {
    match panel {
        Panel::Image { label, src } => format!(
            "<figure><img src=\"{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>\n",
            escape_html(src),
            escape_html(label),
            escape_html(label)
        ),
        Panel::Info { message } => {
            format!("<figure class=\"info\"><p>{}</p></figure>\n", escape_html(message))
        }
    }
}

fn gallery_section(gallery: &Gallery) -> String {
    let mut out = String::from("<section class=\"gallery\">\n<h2>Examples</h2>\n");
    for entry in gallery.entries() {
        out.push_str(&format!(
            "<details>\n<summary>{}</summary>\n",
            escape_html(&entry.title)
        ));
        if let Some(prompt) = entry.prompt.as_deref().filter(|value| !value.is_empty()) {
            out.push_str(&format!("<p class=\"prompt\">{}</p>\n", escape_html(prompt)));
        }
        out.push_str("<div class=\"compare\">\n");
        out.push_str(&render_panel(&Panel::Image {
            label: "Input".to_string(),
            src: example_input_src(gallery, entry),
        }));
        out.push_str(&render_panel(&Panel::Image {
            label: "Result".to_string(),
            src: entry.result_url.clone(),
        }));
        out.push_str("</div>\n</details>\n");
    }
    out.push_str("</section>\n");
    out
}

/// Inlines the example's input image so the page renders wherever it is
/// written.
fn example_input_src(gallery: &Gallery, entry: &ExampleEntry) -> String {
    match gallery.input_image_bytes(entry) {
        Ok(bytes) => {
            let mime_type = UploadFormat::from_file_name(&entry.input_image)
                .map(|format| format.mime_type())
                .unwrap_or(DATA_URL_MIME);
            data_url_with_mime(mime_type, &bytes)
        }
        Err(err) => {
            tracing::warn!(title = %entry.title, error = %err, "example input image unavailable");
            entry.input_image.clone()
        }
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n\
body {{ font-family: sans-serif; margin: 2rem; }}\n\
.compare {{ display: grid; grid-template-columns: 1fr 1fr; gap: 1rem; }}\n\
figure {{ margin: 0; }}\n\
img {{ max-width: 100%; }}\n\
.status-error {{ color: #b00020; }}\n\
.status-info {{ color: #555; }}\n\
</style>\n</head>\n<body>\n<h1>{}</h1>\n{}</body>\n</html>\n",
        escape_html(title),
        escape_html(title),
        body
    )
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use backdrop_contracts::error::MISSING_PROMPT_MESSAGE;
    use backdrop_contracts::gallery::Gallery;
    use backdrop_contracts::generation::{GenerationResult, ImageReference};
    use backdrop_contracts::BackdropError;

    use super::{
        escape_html, render_gallery, render_page, terminal_lines, Panel, Presentation,
        StatusKind, INPUT_LABEL, NO_IMAGE_MESSAGE, OUTPUT_LABEL,
    };
    use crate::submission::{Submission, SubmissionOutcome, SubmissionState};

    const RESULT_URL: &str = "https://replicate.delivery/pbxt/out.jpg";

    fn submission(outcome: SubmissionOutcome) -> Submission {
        Submission {
            id: "sub-1".to_string(),
            trace: vec![SubmissionState::Idle, outcome.state(), SubmissionState::Idle],
            outcome,
        }
    }

    fn ready(input: Option<ImageReference>, result: GenerationResult) -> Submission {
        submission(SubmissionOutcome::ResultReady {
            prompt: "Elegant studio backdrop".to_string(),
            input,
            result,
        })
    }

    #[test]
    fn url_result_is_rendered_directly() {
        let presentation = Presentation::from_submission(&ready(
            Some(ImageReference::DataUrl("data:image/png;base64,AAAA".to_string())),
            GenerationResult::Url(RESULT_URL.to_string()),
        ));
        assert_eq!(presentation.status, StatusKind::Success);
        assert_eq!(
            presentation.panels,
            vec![
                Panel::Image {
                    label: INPUT_LABEL.to_string(),
                    src: "data:image/png;base64,AAAA".to_string(),
                },
                Panel::Image {
                    label: OUTPUT_LABEL.to_string(),
                    src: RESULT_URL.to_string(),
                },
            ]
        );
        let html = render_page(&presentation, &Gallery::default());
        assert!(html.contains(&format!("<img src=\"{RESULT_URL}\"")));
    }

    #[test]
    fn inline_result_becomes_a_data_url_and_missing_input_is_noted() {
        let presentation = Presentation::from_submission(&ready(
            None,
            GenerationResult::Inline {
                bytes: vec![1, 2, 3],
                mime_type: "image/jpeg".to_string(),
            },
        ));
        assert_eq!(
            presentation.panels[0],
            Panel::Info {
                message: NO_IMAGE_MESSAGE.to_string()
            }
        );
        assert_eq!(
            presentation.panels[1],
            Panel::Image {
                label: OUTPUT_LABEL.to_string(),
                src: "data:image/jpeg;base64,AQID".to_string(),
            }
        );
    }

    #[test]
    fn missing_prompt_shows_only_the_message() {
        let presentation = Presentation::from_submission(&submission(SubmissionOutcome::PromptMissing));
        assert!(presentation.panels.is_empty());
        assert_eq!(presentation.message, MISSING_PROMPT_MESSAGE);
        assert_eq!(
            terminal_lines(&submission(SubmissionOutcome::PromptMissing)),
            vec![format!("Error: {MISSING_PROMPT_MESSAGE}")]
        );
    }

    #[test]
    fn no_image_outcome_uses_info_panels() {
        let presentation = Presentation::from_submission(&submission(SubmissionOutcome::NoImageInfo {
            prompt: "neon skyline at dusk".to_string(),
        }));
        assert_eq!(presentation.status, StatusKind::Info);
        assert!(presentation
            .panels
            .iter()
            .all(|panel| matches!(panel, Panel::Info { .. })));

        let lines = terminal_lines(&submission(SubmissionOutcome::NoImageInfo {
            prompt: "neon skyline at dusk".to_string(),
        }));
        assert_eq!(
            lines,
            vec![
                "Prompt: neon skyline at dusk".to_string(),
                NO_IMAGE_MESSAGE.to_string(),
                super::NO_IMAGE_NOTICE.to_string(),
            ]
        );
    }

    #[test]
    fn failures_are_shown_inline_and_escaped() {
        let failed = submission(SubmissionOutcome::RequestFailed {
            prompt: "<b>studio</b>".to_string(),
            error: BackdropError::RemoteService("Replicate request failed (500): <oops>".to_string()),
        });
        let lines = terminal_lines(&failed);
        assert_eq!(lines[0], "Prompt: <b>studio</b>");
        assert_eq!(
            lines[1],
            "Error: remote service error: Replicate request failed (500): <oops>"
        );

        let html = render_page(&Presentation::from_submission(&failed), &Gallery::default());
        assert!(html.contains("&lt;b&gt;studio&lt;/b&gt;"));
        assert!(html.contains("&lt;oops&gt;"));
        assert!(!html.contains("<oops>"));
    }

    #[test]
    fn terminal_lines_abbreviate_inline_images() {
        let lines = terminal_lines(&ready(
            Some(ImageReference::DataUrl("data:image/png;base64,AAAA".to_string())),
            GenerationResult::Url(RESULT_URL.to_string()),
        ));
        assert_eq!(lines[1], "Attached Image: <inline image/png, 26 chars>");
        assert_eq!(lines[2], format!("Generated Background: {RESULT_URL}"));
        assert_eq!(lines[3], "Background generated.");
    }

    #[test]
    fn gallery_is_rendered_as_collapsible_panels_in_order() -> anyhow::Result<()> {
        let gallery = Gallery::bundled()?;
        let html = render_gallery(&gallery);
        assert_eq!(html.matches("<details>").count(), gallery.len());
        assert_eq!(
            html.matches("<img src=\"data:image/png;base64,").count(),
            gallery.len()
        );
        assert!(!html.contains("src=\"examples/"));
        let mut cursor = 0;
        for entry in gallery.entries() {
            let needle = format!("<summary>{}</summary>", escape_html(&entry.title));
            let found = html[cursor..]
                .find(&needle)
                .map(|offset| cursor + offset)
                .unwrap_or_else(|| panic!("missing or out of order: {}", entry.title));
            cursor = found + needle.len();
            assert!(html.contains(&escape_html(&entry.result_url)));
        }
        Ok(())
    }

    #[test]
    fn escape_html_covers_attribute_characters() {
        assert_eq!(
            escape_html("a&b<c>\"d\"'e'"),
            "a&amp;b&lt;c&gt;&quot;d&quot;&#x27;e&#x27;"
        );
    }
}
