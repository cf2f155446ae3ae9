use serde::{Deserialize, Serialize};
use std::fmt;

/// The six fixed sections of a BNI Connect profile, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    MyBusiness,
    TopProduct,
    TopProblemSolved,
    IdealReferral,
    IdealReferralPartner,
    BniStory,
}

impl ProfileField {
    pub const ALL: [ProfileField; 6] = [
        ProfileField::MyBusiness,
        ProfileField::TopProduct,
        ProfileField::TopProblemSolved,
        ProfileField::IdealReferral,
        ProfileField::IdealReferralPartner,
        ProfileField::BniStory,
    ];

    /// Key used in the model's JSON output and in category selectors.
    pub fn key(self) -> &'static str {
        match self {
            ProfileField::MyBusiness => "myBusiness",
            ProfileField::TopProduct => "topProduct",
            ProfileField::TopProblemSolved => "topProblemSolved",
            ProfileField::IdealReferral => "idealReferral",
            ProfileField::IdealReferralPartner => "idealReferralPartner",
            ProfileField::BniStory => "bniStory",
        }
    }

    /// Identifier of the raw text input on the submission form.
    pub fn form_id(self) -> &'static str {
        match self {
            ProfileField::MyBusiness => "my-business",
            ProfileField::TopProduct => "top-product",
            ProfileField::TopProblemSolved => "top-problem-solved",
            ProfileField::IdealReferral => "ideal-referral",
            ProfileField::IdealReferralPartner => "ideal-referral-partner",
            ProfileField::BniStory => "bni-story",
        }
    }

    /// Display title shown above each block.
    pub fn title(self) -> &'static str {
        match self {
            ProfileField::MyBusiness => "My Business",
            ProfileField::TopProduct => "Top Product / Service",
            ProfileField::TopProblemSolved => "Top Problem Solved",
            ProfileField::IdealReferral => "My Ideal Referral",
            ProfileField::IdealReferralPartner => "My Ideal Referral Partner",
            ProfileField::BniStory => "My Favorite BNI Story",
        }
    }

    /// Label used for the field inside the prompt sent to the model.
    pub fn prompt_label(self) -> &'static str {
        match self {
            ProfileField::TopProduct => "Top Product/Service",
            other => other.title(),
        }
    }

    /// Description attached to the field in the response schema.
    pub fn schema_description(self) -> String {
        let section = match self {
            ProfileField::IdealReferralPartner => "Ideal Referral Partner",
            other => other.title(),
        };
        format!("HTML for '{}' section", section)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Parses a category selector value; `none` and blanks select nothing.
    pub fn from_selector(value: &str) -> Option<Self> {
        match value.trim() {
            "" | "none" => None,
            other => Self::from_key(other),
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// One user-entered media row. `field` is `None` when no category was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub field: Option<ProfileField>,
    pub raw_url: String,
    pub kind: MediaKind,
}

impl MediaAttachment {
    pub fn image(field: Option<ProfileField>, raw_url: impl Into<String>) -> Self {
        Self { field, raw_url: raw_url.into(), kind: MediaKind::Image }
    }

    pub fn video(field: Option<ProfileField>, raw_url: impl Into<String>) -> Self {
        Self { field, raw_url: raw_url.into(), kind: MediaKind::Video }
    }

    /// A row only takes part in generation with a category and a non-empty link.
    pub fn target(&self) -> Option<(ProfileField, &str)> {
        let url = self.raw_url.trim();
        match self.field {
            Some(field) if !url.is_empty() => Some((field, url)),
            _ => None,
        }
    }
}

/// The model's output. Every key is required, so a partial response fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProfile {
    pub my_business: String,
    pub top_product: String,
    pub top_problem_solved: String,
    pub ideal_referral: String,
    pub ideal_referral_partner: String,
    pub bni_story: String,
}

impl GeneratedProfile {
    pub fn get(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::MyBusiness => &self.my_business,
            ProfileField::TopProduct => &self.top_product,
            ProfileField::TopProblemSolved => &self.top_problem_solved,
            ProfileField::IdealReferral => &self.ideal_referral,
            ProfileField::IdealReferralPartner => &self.ideal_referral_partner,
            ProfileField::BniStory => &self.bni_story,
        }
    }

    pub fn get_mut(&mut self, field: ProfileField) -> &mut String {
        match field {
            ProfileField::MyBusiness => &mut self.my_business,
            ProfileField::TopProduct => &mut self.top_product,
            ProfileField::TopProblemSolved => &mut self.top_problem_solved,
            ProfileField::IdealReferral => &mut self.ideal_referral,
            ProfileField::IdealReferralPartner => &mut self.ideal_referral_partner,
            ProfileField::BniStory => &mut self.bni_story,
        }
    }

    pub fn with(mut self, field: ProfileField, html: impl Into<String>) -> Self {
        *self.get_mut(field) = html.into();
        self
    }
}

/// Generated HTML with user images spliced in. A blank field counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedProfile(GeneratedProfile);

impl MergedProfile {
    pub fn new(profile: GeneratedProfile) -> Self {
        Self(profile)
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        let html = self.0.get(field);
        (!html.is_empty()).then_some(html)
    }

    pub(crate) fn get_mut(&mut self, field: ProfileField) -> &mut String {
        self.0.get_mut(field)
    }

    /// Present fields in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        ProfileField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|html| (field, html)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_selector() {
        for field in ProfileField::ALL {
            assert_eq!(ProfileField::from_selector(field.key()), Some(field));
        }
        assert_eq!(ProfileField::from_selector("none"), None);
        assert_eq!(ProfileField::from_selector("  "), None);
        assert_eq!(ProfileField::from_selector("favouriteColour"), None);
    }

    #[test]
    fn generated_profile_requires_every_key() {
        let partial = r#"{"myBusiness":"<p>a</p>","topProduct":"<p>b</p>"}"#;
        assert!(serde_json::from_str::<GeneratedProfile>(partial).is_err());

        let full = r#"{"myBusiness":"a","topProduct":"b","topProblemSolved":"c",
            "idealReferral":"d","idealReferralPartner":"e","bniStory":"f"}"#;
        let profile: GeneratedProfile = serde_json::from_str(full).unwrap();
        assert_eq!(profile.get(ProfileField::BniStory), "f");
        assert_eq!(profile.get(ProfileField::TopProblemSolved), "c");
    }

    #[test]
    fn merged_profile_treats_blank_fields_as_absent() {
        let merged = MergedProfile::new(
            GeneratedProfile::default()
                .with(ProfileField::BniStory, "<p>story</p>")
                .with(ProfileField::MyBusiness, "<p>biz</p>"),
        );
        let fields: Vec<_> = merged.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec![ProfileField::MyBusiness, ProfileField::BniStory]);
        assert_eq!(merged.get(ProfileField::TopProduct), None);
        assert!(MergedProfile::default().is_empty());
    }

    #[test]
    fn attachment_without_category_or_link_has_no_target() {
        assert_eq!(MediaAttachment::image(None, "https://imgur.com/x").target(), None);
        assert_eq!(MediaAttachment::image(Some(ProfileField::TopProduct), "  ").target(), None);
        assert_eq!(
            MediaAttachment::video(Some(ProfileField::BniStory), " https://youtu.be/x ").target(),
            Some((ProfileField::BniStory, "https://youtu.be/x"))
        );
    }
}
