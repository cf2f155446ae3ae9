use crate::profile::{MediaAttachment, MediaKind, ProfileField};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const NOT_PROVIDED: &str = "Not provided.";
pub const NO_VIDEOS: &str = "No videos to embed.";
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// Versioned together with [`response_schema`]; both must keep all six keys required.
pub const SYSTEM_INSTRUCTION: &str = r#"You are an assistant that generates professional BNI Connect profile HTML blocks.
The user will provide their information. Your task is to convert this information into clean, formatted HTML code suitable for copy-pasting into BNI Connect.
You MUST return a JSON object. The keys must be: "myBusiness", "topProduct", "topProblemSolved", "idealReferral", "idealReferralPartner", and "bniStory".

For each key, generate a single HTML string with the following rules:
1.  **Paragraphs:** Treat each newline in the user's input as a new paragraph. Wrap each paragraph in a <p style="text-align: justify;"> tag. Do NOT include a heading/title for the section.
2.  **Bold Text:** If the user uses Markdown for bolding (e.g., **text** or __text__), convert it to <strong>text</strong> within its paragraph.
3.  **Bullet Points:** If the user creates a list using lines starting with *, -, or +, convert this into an HTML unordered list (<ul>). Each list item (e.g., "* Item 1") should become a <li>Item 1</li>. The entire list should be wrapped in a single <ul> tag. The <ul> tag should be placed after a paragraph or stand on its own, but not inside a <p> tag.
4.  **Structure:** Combine paragraphs and lists into a single, clean HTML string for the section.
5.  **Video Embedding:** If the user provides a YouTube URL and a category, embed the video at the very end of the HTML string for that specific category. The video MUST be wrapped in a responsive container. Use this exact HTML structure, replacing only the '...' with the correct YouTube embed URL: <div style="position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden; max-width: 100%; margin-top: 1rem;"><iframe src="..." style="position: absolute; top: 0; left: 0; width: 100%; height: 100%; border: 0;" allowfullscreen title="YouTube video player" frameborder="0" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture"></iframe></div>. Convert the user's URL to the correct embed format ('/watch?v=' becomes '/embed/'). If the user provides multiple videos for the same category, embed them one after another.
6.  **Empty Fields:** If a user leaves a text field blank, create a simple placeholder paragraph for it.
7.  **Output Format:** The final output MUST be a valid JSON object. Do not include explanations, markdown, or any extra text outside the JSON.
8.  **Character Limit:** The generated HTML string for each key MUST NOT exceed 999 characters. Summarize the content if necessary to meet this limit."#;

/// Schema naming all six fields as required strings.
pub fn response_schema() -> Value {
    let properties: serde_json::Map<String, Value> = ProfileField::ALL
        .iter()
        .map(|field| {
            (
                field.key().to_string(),
                json!({ "type": "STRING", "description": field.schema_description() }),
            )
        })
        .collect();
    let required: Vec<&str> = ProfileField::ALL.iter().map(|field| field.key()).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

/// Everything the model needs for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: &'static str,
    pub response_mime_type: &'static str,
    pub response_schema: Value,
}

/// Turns the video rows into one instruction line per qualifying row.
///
/// Rows keep their entry order and are never deduplicated. The watch to
/// embed rewrite is left to the model.
pub fn build_video_instructions(attachments: &[MediaAttachment]) -> String {
    let lines: Vec<String> = attachments
        .iter()
        .filter(|attachment| attachment.kind == MediaKind::Video)
        .filter_map(MediaAttachment::target)
        .enumerate()
        .map(|(index, (field, url))| {
            format!("Embed Video #{} ('{}') into the section: '{}'", index + 1, url, field.key())
        })
        .collect();

    if lines.is_empty() {
        NO_VIDEOS.to_string()
    } else {
        lines.join("\n")
    }
}

/// Assembles the prompt plus the fixed generation contract.
pub fn build_request(fields: &BTreeMap<ProfileField, String>, video_instructions: &str) -> GenerationRequest {
    let mut prompt = String::from(
        "Please generate the BNI profile HTML as a JSON object based on the following information:\n\n",
    );
    for field in ProfileField::ALL {
        let text = fields
            .get(&field)
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .unwrap_or(NOT_PROVIDED);
        prompt.push_str(&format!("{}: {}\n", field.prompt_label(), text));
    }
    prompt.push('\n');
    prompt.push_str(video_instructions);
    prompt.push('\n');

    GenerationRequest {
        prompt,
        system_instruction: SYSTEM_INSTRUCTION,
        response_mime_type: RESPONSE_MIME_TYPE,
        response_schema: response_schema(),
    }
}
