use crate::profile::{MediaAttachment, ProfileField};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// One category selector plus link input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediaRow {
    pub category: String,
    pub url: String,
}

/// A filled-in profile form, read from YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormSubmission {
    /// Raw text keyed by form id (`my-business`, `top-product`, ...).
    pub fields: BTreeMap<String, Option<String>>,
    pub images: Vec<MediaRow>,
    pub videos: Vec<MediaRow>,
    pub image_size: Option<String>,
}

impl FormSubmission {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read submission file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let form: FormSubmission = serde_yaml::from_str(content)
            .context("Failed to parse submission file")?;
        Ok(form)
    }

    pub fn field_texts(&self) -> BTreeMap<ProfileField, String> {
        let mut texts = BTreeMap::new();
        for (id, text) in &self.fields {
            match ProfileField::ALL.into_iter().find(|field| field.form_id() == id) {
                Some(field) => {
                    texts.insert(field, text.as_deref().unwrap_or("").trim().to_string());
                }
                None => warn!("Ignoring unknown form field '{}'", id),
            }
        }
        texts
    }

    /// Image rows followed by video rows, each capped and kept in entry order.
    pub fn attachments(&self, max_images: usize, max_videos: usize) -> Vec<MediaAttachment> {
        let images = capped(&self.images, max_images, "image")
            .iter()
            .map(|row| MediaAttachment::image(selector(&row.category), row.url.trim()));
        let videos = capped(&self.videos, max_videos, "video")
            .iter()
            .map(|row| MediaAttachment::video(selector(&row.category), row.url.trim()));
        images.chain(videos).collect()
    }

    pub fn image_size(&self, default: &str) -> String {
        self.image_size
            .as_deref()
            .map(str::trim)
            .filter(|size| !size.is_empty())
            .unwrap_or(default)
            .to_string()
    }
}

fn capped<'a>(rows: &'a [MediaRow], max: usize, kind: &str) -> &'a [MediaRow] {
    if rows.len() > max {
        warn!("Only the first {} {} rows are used, {} given", max, kind, rows.len());
        &rows[..max]
    } else {
        rows
    }
}

fn selector(value: &str) -> Option<ProfileField> {
    let field = ProfileField::from_selector(value);
    if field.is_none() && !matches!(value.trim(), "" | "none") {
        warn!("Unknown category '{}', row ignored", value);
    }
    field
}

pub const STARTER: &str = r#"# Profile submission. Blank fields are sent as "Not provided."
# Lines starting with *, - or + become bullet lists; **bold** becomes <strong>.
fields:
  my-business: |

  top-product: |

  top-problem-solved: |

  ideal-referral: |

  ideal-referral-partner: |

  bni-story: |


# Up to five images. category is one of: myBusiness, topProduct,
# topProblemSolved, idealReferral, idealReferralPartner, bniStory (or none).
# Public Dropbox file links and single Imgur images are supported.
images:
  - category: none
    url: ""

# Up to five YouTube videos.
videos:
  - category: none
    url: ""

# Maximum image width, e.g. 100%, 75%, 50%
image_size: "100%"
"#;

pub fn write_starter<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        bail!("File '{}' already exists", path.display());
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .context("Failed to create submission directory")?;
    }
    fs::write(path, STARTER)
        .context("Failed to write submission file")?;
    Ok(())
}
