use crate::links::{self, NormalizedLink};
use crate::profile::{GeneratedProfile, MediaAttachment, MediaKind, MergedProfile};
use crate::templates::escape_html;
use tracing::debug;

pub const DEFAULT_IMAGE_SIZE: &str = "100%";
pub const IMAGE_ALT: &str = "User provided content";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: MergedProfile,
    /// Raw links that could not be turned into direct image URLs, in entry order.
    pub failures: Vec<String>,
}

/// Both values are attribute-escaped.
pub fn image_tag(src: &str, image_size: &str) -> String {
    format!(
        r#"<img alt="{}" style="max-width: {}; height: auto; border-radius: 8px; margin-top: 1rem;" src="{}">"#,
        IMAGE_ALT,
        escape_html(image_size),
        escape_html(src)
    )
}

/// Appends an `<img>` to the end of each targeted field, in attachment order.
///
/// A link that cannot be normalized is recorded and skipped; the rest of the
/// attachments are still processed. Fields no image targets are left as the
/// model wrote them.
pub fn merge(profile: GeneratedProfile, attachments: &[MediaAttachment], image_size: &str) -> MergeOutcome {
    let image_size = match image_size.trim() {
        "" => DEFAULT_IMAGE_SIZE,
        size => size,
    };
    let mut merged = MergedProfile::new(profile);
    let mut failures = Vec::new();

    let images = attachments
        .iter()
        .filter(|attachment| attachment.kind == MediaKind::Image)
        .filter_map(MediaAttachment::target);

    for (field, raw_url) in images {
        match links::normalize(raw_url) {
            NormalizedLink::Direct(src) => {
                if merged.get(field).is_some() {
                    merged.get_mut(field).push_str(&image_tag(&src, image_size));
                } else {
                    debug!("Skipping image for {}: the model returned no content", field);
                }
            }
            NormalizedLink::Unsupported => failures.push(raw_url.to_string()),
        }
    }

    MergeOutcome { merged, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileField;
    use pretty_assertions::assert_eq;

    const DROPBOX: &str = "https://www.dropbox.com/s/abc123/pic.jpg?dl=0";

    fn profile() -> GeneratedProfile {
        GeneratedProfile::default()
            .with(ProfileField::MyBusiness, "<p>Hi</p>")
            .with(ProfileField::TopProduct, "<p>Widgets</p>")
            .with(ProfileField::BniStory, "<p>Story</p>")
    }

    #[test]
    fn dropbox_image_is_appended_after_generated_text() {
        let attachments = vec![MediaAttachment::image(Some(ProfileField::MyBusiness), DROPBOX)];
        let outcome = merge(profile(), &attachments, "50%");

        assert_eq!(
            outcome.merged.get(ProfileField::MyBusiness).unwrap(),
            "<p>Hi</p><img alt=\"User provided content\" style=\"max-width: 50%; height: auto; \
             border-radius: 8px; margin-top: 1rem;\" src=\"https://www.dropbox.com/s/abc123/pic.jpg?raw=1\">"
        );
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.merged.get(ProfileField::TopProduct), Some("<p>Widgets</p>"));
        assert_eq!(outcome.merged.get(ProfileField::BniStory), Some("<p>Story</p>"));
    }

    #[test]
    fn one_bad_link_does_not_block_the_rest() {
        let attachments = vec![
            MediaAttachment::image(Some(ProfileField::TopProduct), "https://imgur.com/a/xyz"),
            MediaAttachment::image(Some(ProfileField::TopProduct), "https://imgur.com/aBcD12"),
        ];
        let outcome = merge(profile(), &attachments, "100%");

        let html = outcome.merged.get(ProfileField::TopProduct).unwrap();
        assert_eq!(html.matches("<img").count(), 1);
        assert!(html.starts_with("<p>Widgets</p>"));
        assert!(html.contains("src=\"https://i.imgur.com/aBcD12.jpg\""));
        assert_eq!(outcome.failures, vec!["https://imgur.com/a/xyz".to_string()]);
    }

    #[test]
    fn images_for_one_field_append_in_entry_order() {
        let attachments = vec![
            MediaAttachment::image(Some(ProfileField::BniStory), "https://i.imgur.com/first.png"),
            MediaAttachment::image(Some(ProfileField::BniStory), "https://i.imgur.com/second.png"),
        ];
        let outcome = merge(profile(), &attachments, "75%");

        let html = outcome.merged.get(ProfileField::BniStory).unwrap();
        let first = html.find("first.png").unwrap();
        let second = html.find("second.png").unwrap();
        assert!(html.find("<p>Story</p>").unwrap() < first);
        assert!(first < second);
    }

    #[test]
    fn absent_fields_are_never_touched() {
        let attachments = vec![MediaAttachment::image(Some(ProfileField::IdealReferral), DROPBOX)];
        let outcome = merge(profile(), &attachments, "100%");

        assert_eq!(outcome.merged.get(ProfileField::IdealReferral), None);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn rows_without_category_or_link_and_video_rows_are_ignored() {
        let attachments = vec![
            MediaAttachment::image(None, "https://imgur.com/a/xyz"),
            MediaAttachment::image(Some(ProfileField::MyBusiness), ""),
            MediaAttachment::video(Some(ProfileField::MyBusiness), "https://www.youtube.com/watch?v=abc"),
        ];
        let outcome = merge(profile(), &attachments, "100%");

        assert_eq!(outcome.merged, MergedProfile::new(profile()));
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn image_size_cannot_break_out_of_the_style_attribute() {
        let attachments = vec![MediaAttachment::image(Some(ProfileField::MyBusiness), DROPBOX)];
        let outcome = merge(profile(), &attachments, "50%\" onload=\"alert(1)");

        let html = outcome.merged.get(ProfileField::MyBusiness).unwrap();
        assert!(html.contains("max-width: 50%&quot; onload=&quot;alert(1);"));
        assert!(!html.contains("\" onload="));
    }

    #[test]
    fn dropbox_query_separators_are_escaped_in_src() {
        let attachments = vec![MediaAttachment::image(
            Some(ProfileField::MyBusiness),
            "https://www.dropbox.com/scl/fi/xyz/pic.png?rlkey=k9&dl=0",
        )];
        let outcome = merge(profile(), &attachments, "100%");

        let html = outcome.merged.get(ProfileField::MyBusiness).unwrap();
        assert!(html.ends_with("src=\"https://www.dropbox.com/scl/fi/xyz/pic.png?rlkey=k9&amp;raw=1\">"));
    }

    #[test]
    fn imgur_link_with_quotes_is_reported_not_embedded() {
        let bad = "https://i.imgur.com/x.png\"onerror=\"alert(1)";
        let attachments = vec![MediaAttachment::image(Some(ProfileField::MyBusiness), bad)];
        let outcome = merge(profile(), &attachments, "100%");

        assert_eq!(outcome.merged.get(ProfileField::MyBusiness), Some("<p>Hi</p>"));
        assert_eq!(outcome.failures, vec![bad.to_string()]);
    }

    #[test]
    fn blank_size_falls_back_to_full_width() {
        let attachments = vec![MediaAttachment::image(Some(ProfileField::MyBusiness), DROPBOX)];
        let outcome = merge(profile(), &attachments, " ");
        assert!(outcome.merged.get(ProfileField::MyBusiness).unwrap().contains("max-width: 100%;"));
    }
}
