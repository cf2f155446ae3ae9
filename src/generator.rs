use crate::config::Config;
use crate::errors::{ErrorLog, ScribeError};
use crate::form::FormSubmission;
use crate::gemini::{parse_generated, ProfileModel};
use crate::merger;
use crate::profile::{MergedProfile, ProfileField};
use crate::prompt::{self, GenerationRequest};
use crate::templates::{self, Rendered};
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

pub const PROFILE_FILE: &str = "profile.json";

/// Outcome of one submission. Failures are in `errors`, never returned as `Err`.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub rendered: Rendered,
    pub merged: Option<MergedProfile>,
    pub errors: ErrorLog,
}

/// Clears the in-flight flag when the submission's call chain ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SubmissionController<M> {
    model: M,
    config: Config,
    in_flight: AtomicBool,
}

impl<M: ProfileModel> SubmissionController<M> {
    pub fn new(model: M, config: Config) -> Self {
        Self {
            model,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The generate trigger is enabled exactly when no request is in flight.
    pub fn is_generate_enabled(&self) -> bool {
        !self.in_flight.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    pub async fn submit(&self, form: &FormSubmission) -> SubmissionReport {
        let mut errors = ErrorLog::new();

        let Some(_guard) = self.begin() else {
            errors.push(ScribeError::Busy);
            return SubmissionReport { rendered: Rendered::failed(), merged: None, errors };
        };

        let attachments = form.attachments(self.config.max_images, self.config.max_videos);
        let video_instructions = prompt::build_video_instructions(&attachments);
        let request = prompt::build_request(&form.field_texts(), &video_instructions);
        debug!("Prompt:\n{}", request.prompt);

        let generated = match self.model.generate(&request).await {
            Ok(text) => parse_generated(&text),
            Err(e) => Err(e),
        };
        let generated = match generated {
            Ok(generated) => generated,
            Err(e) => {
                errors.push(ScribeError::Generation(format!("{:#}", e)));
                return SubmissionReport { rendered: Rendered::failed(), merged: None, errors };
            }
        };

        let image_size = form.image_size(&self.config.default_image_size);
        let outcome = merger::merge(generated, &attachments, &image_size);
        if !outcome.failures.is_empty() {
            errors.push(ScribeError::UnsupportedMedia(outcome.failures));
        }

        let rendered = templates::render(&outcome.merged);
        info!("Rendered {} profile fields", rendered.views.len());

        SubmissionReport { rendered, merged: Some(outcome.merged), errors }
    }
}

/// Builds the model request for a form. Needs no credentials.
pub fn build_request(config: &Config, form: &FormSubmission) -> GenerationRequest {
    let attachments = form.attachments(config.max_images, config.max_videos);
    let video_instructions = prompt::build_video_instructions(&attachments);
    prompt::build_request(&form.field_texts(), &video_instructions)
}

/// Writes the results page, stylesheet, raw field blocks and merged JSON.
pub fn write_outputs<P: AsRef<Path>>(report: &SubmissionReport, output_dir: P) -> Result<()> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)
        .context("Failed to create output directory")?;

    let page = templates::render_page(&report.rendered, &report.errors, chrono::Utc::now());
    fs::write(output_dir.join("index.html"), page)
        .context("Failed to write index.html")?;
    fs::write(output_dir.join("style.css"), templates::generate_css())
        .context("Failed to write style.css")?;

    let fields_dir = output_dir.join("fields");
    if fields_dir.exists() {
        fs::remove_dir_all(&fields_dir)
            .context("Failed to clear previous field blocks")?;
    }

    if let Some(merged) = &report.merged {
        fs::create_dir_all(&fields_dir)
            .context("Failed to create fields directory")?;
        for view in &report.rendered.views {
            fs::write(fields_dir.join(format!("{}.html", view.field.key())), &view.html)
                .with_context(|| format!("Failed to write block for {}", view.field))?;
        }

        let json = serde_json::to_string_pretty(merged)
            .context("Failed to serialize merged profile")?;
        fs::write(output_dir.join(PROFILE_FILE), json)
            .context("Failed to write profile.json")?;
    } else {
        let stale = output_dir.join(PROFILE_FILE);
        if stale.exists() {
            fs::remove_file(stale).context("Failed to remove stale profile.json")?;
        }
    }

    Ok(())
}

pub fn print_summary(report: &SubmissionReport) {
    for view in &report.rendered.views {
        let counter = format!("{} / {}", view.char_count, report.rendered.char_limit);
        let counter = if view.over_limit { counter.red().bold() } else { counter.green() };
        println!("  {} {}", format!("{:<28}", view.title).white().bold(), counter);
    }
    if let Some(message) = report.errors.display() {
        eprintln!("{}", message.red());
    }
}

/// Writes one field's raw HTML from a previous run to `out`.
pub fn copy_field<P: AsRef<Path>, W: Write>(output_dir: P, field: ProfileField, out: &mut W) -> Result<(), ScribeError> {
    let path = output_dir.as_ref().join(PROFILE_FILE);
    let content = fs::read_to_string(&path)
        .map_err(|e| ScribeError::Clipboard(format!("Failed to copy text: {} ({})", path.display(), e)))?;
    let merged: MergedProfile = serde_json::from_str(&content)
        .map_err(|e| ScribeError::Clipboard(format!("Failed to copy text: {}", e)))?;
    let html = merged
        .get(field)
        .ok_or_else(|| ScribeError::Clipboard(format!("Failed to copy text: {} is empty", field)))?;

    out.write_all(html.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| ScribeError::Clipboard(format!("Failed to copy text: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio::sync::Notify;

    const FULL: &str = r#"{"myBusiness":"<p>Roofs</p>","topProduct":"<p>Widgets</p>","topProblemSolved":"<p>Leaks</p>",
        "idealReferral":"<p>Owners</p>","idealReferralPartner":"","bniStory":"<p>Story</p>"}"#;

    struct StubModel {
        reply: Result<String, String>,
        seen: Mutex<Vec<String>>,
    }

    impl StubModel {
        fn ok(text: &str) -> Self {
            Self { reply: Ok(text.to_string()), seen: Mutex::new(Vec::new()) }
        }

        fn failing(message: &str) -> Self {
            Self { reply: Err(message.to_string()), seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ProfileModel for StubModel {
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.prompt.clone());
            self.reply.clone().map_err(|e| anyhow!(e))
        }
    }

    fn form() -> FormSubmission {
        FormSubmission::parse(
            r#"
fields:
  my-business: We fix roofs.
images:
  - category: myBusiness
    url: https://www.dropbox.com/s/abc123/pic.jpg?dl=0
  - category: topProduct
    url: https://imgur.com/a/album
  - category: idealReferralPartner
    url: https://imgur.com/aBcD12
videos:
  - category: bniStory
    url: https://www.youtube.com/watch?v=xyz
image_size: "50%"
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn submission_merges_images_and_reports_bad_links() {
        let generator = SubmissionController::new(StubModel::ok(FULL), Config::default());
        let report = generator.submit(&form()).await;

        let prompt = generator.model.seen.lock().unwrap()[0].clone();
        assert!(prompt.contains("My Business: We fix roofs."));
        assert!(prompt.contains("Embed Video #1 ('https://www.youtube.com/watch?v=xyz') into the section: 'bniStory'"));

        let merged = report.merged.as_ref().unwrap();
        let business = merged.get(ProfileField::MyBusiness).unwrap();
        assert!(business.starts_with("<p>Roofs</p><img"));
        assert!(business.contains("max-width: 50%;"));
        assert!(business.contains("?raw=1"));
        assert_eq!(merged.get(ProfileField::TopProduct), Some("<p>Widgets</p>"));
        assert_eq!(merged.get(ProfileField::IdealReferralPartner), None);

        assert_eq!(
            report.errors.entries(),
            &[ScribeError::UnsupportedMedia(vec!["https://imgur.com/a/album".to_string()])]
        );
        assert_eq!(report.rendered.views.len(), 5);
        assert!(report.rendered.preview.starts_with("<p><strong>My Business</strong></p>"));
        assert!(generator.is_generate_enabled());
    }

    #[tokio::test]
    async fn model_failure_replaces_the_preview() {
        let generator = SubmissionController::new(StubModel::failing("quota exceeded"), Config::default());
        let report = generator.submit(&form()).await;

        assert!(report.merged.is_none());
        assert_eq!(report.rendered.preview, templates::PREVIEW_ERROR);
        assert_eq!(report.errors.display().unwrap(), "Error: quota exceeded");
        assert!(generator.is_generate_enabled());
    }

    #[tokio::test]
    async fn non_json_output_is_a_generation_failure() {
        let generator = SubmissionController::new(StubModel::ok("Here is your profile!"), Config::default());
        let report = generator.submit(&form()).await;

        assert!(matches!(report.errors.entries(), [ScribeError::Generation(_)]));
        assert!(report.errors.preview_failed());
    }

    struct BlockingModel {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ProfileModel for BlockingModel {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(FULL.to_string())
        }
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_rejected() {
        let generator = SubmissionController::new(
            BlockingModel { started: Notify::new(), release: Notify::new() },
            Config::default(),
        );
        let form = form();

        let (first, second) = tokio::join!(generator.submit(&form), async {
            generator.model.started.notified().await;
            assert!(!generator.is_generate_enabled());
            let second = generator.submit(&form).await;
            generator.model.release.notify_one();
            second
        });

        assert!(first.merged.is_some());
        assert_eq!(second.errors.entries(), &[ScribeError::Busy]);
        assert!(generator.is_generate_enabled());
    }

    #[tokio::test]
    async fn outputs_are_written_and_copyable() {
        let dir = tempdir().unwrap();
        let generator = SubmissionController::new(StubModel::ok(FULL), Config::default());
        let report = generator.submit(&form()).await;

        write_outputs(&report, dir.path()).unwrap();
        assert!(dir.path().join("index.html").exists());
        assert!(dir.path().join("style.css").exists());
        assert_eq!(fs::read_to_string(dir.path().join("fields/topProduct.html")).unwrap(), "<p>Widgets</p>");
        assert!(!dir.path().join("fields/idealReferralPartner.html").exists());

        let mut out = Vec::new();
        copy_field(dir.path(), ProfileField::TopProblemSolved, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<p>Leaks</p>");

        let err = copy_field(dir.path(), ProfileField::IdealReferralPartner, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ScribeError::Clipboard(_)));
    }

    #[test]
    fn offline_request_respects_the_video_cap() {
        let config = Config { max_videos: 0, ..Config::default() };
        let request = build_request(&config, &form());
        assert!(request.prompt.contains(crate::prompt::NO_VIDEOS));
        assert!(request.prompt.contains("Top Product/Service: Not provided."));
    }

    #[test]
    fn copy_without_a_previous_run_is_a_clipboard_error() {
        let dir = tempdir().unwrap();
        let err = copy_field(dir.path(), ProfileField::MyBusiness, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ScribeError::Clipboard(_)));
    }
}
