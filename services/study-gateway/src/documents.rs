//! Long-form documents: assignments, reports and presentation outlines
//!
//! Builds the prompts for the three document kinds and parses the JSON slide
//! outline the model returns for presentations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ASSIGNMENT_SYSTEM_INSTRUCTION: &str = "You are a professional academic assistant. \
Output exclusively in English. Use LaTeX notation for mathematical formulas ONLY when the subject \
matter genuinely requires mathematical expressions (STEM fields). For humanities, social sciences, \
and non-quantitative topics, write in clear prose without any math notation. Ensure professional \
image placement using placeholders.";

pub const REPORT_SYSTEM_INSTRUCTION: &str = "You are an expert academic report writer. Output \
exclusively in English. Use LaTeX for mathematical formulas ONLY when the topic genuinely requires \
them (STEM fields). Structure the report professionally with clear sections.";

pub const PRESENTATION_SYSTEM_INSTRUCTION: &str = "You are a professional presentation creator. \
Return ONLY valid JSON, no markdown code blocks or extra text.";

const STEM_RULES: &str = "IMPORTANT CONTEXT-AWARE FORMATTING:
- If the topic is related to Mathematics, Physics, Engineering, Chemistry, Computer Science, \
Statistics, Economics (with quantitative analysis), or any STEM field:
  * Use LaTeX notation for mathematical formulas: $...$ for inline math, $$...$$ for display/block math
  * Include relevant formulas and equations where appropriate
- If the topic is related to Literature, History, Philosophy, Languages, Social Sciences, Arts, \
Business, or non-quantitative fields:
  * DO NOT use mathematical notation or LaTeX
  * Write in clear, professional prose";

const ASSIGNMENT_STRUCTURE: &str = "Structure:
# Title
## Introduction
## Key Concepts
## Detailed Analysis
## Conclusion
## References";

const REPORT_STRUCTURE: &str = "Structure:
# Report Title
## Executive Summary
## 1. Introduction
## 2. Literature Review / Background
## 3. Methodology / Analysis
## 4. Findings / Results
## 5. Discussion
## 6. Conclusion
## 7. Recommendations
## References";

const IMAGE_REMINDER: &str = " Remember to distribute [IMAGE_X] placeholders with explanations.";

/// Inputs for an academic assignment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentBrief {
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub college: String,
    /// Titles of images the caller will place at `[IMAGE_N]` markers.
    #[serde(default)]
    pub images: Vec<String>,
}

/// Inputs for an academic report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportBrief {
    pub topic: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Inputs for a presentation outline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresentationBrief {
    pub topic: String,
    #[serde(default)]
    pub subject: String,
    /// Number of images available; slides may reference them by index.
    #[serde(default)]
    pub image_count: usize,
    /// Ask for one slide carrying chart data.
    #[serde(default)]
    pub charts: bool,
}

/// One slide of a presentation outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default, alias = "imageIndex", skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
    #[serde(default, alias = "chartData", skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// The model's presentation reply could not be turned into slides.
#[derive(Debug, Error)]
pub enum SlideParseError {
    #[error("model returned no slide outline")]
    Empty,

    #[error("slide outline is not valid JSON: {0}")]
    Json(String),

    #[error("slide outline is not a JSON array")]
    NotArray,

    #[error("slide outline has an invalid slide: {0}")]
    Malformed(String),
}

/// Image placement rules shared by assignments and reports.
fn image_instructions(images: &[String], document: &str, sections: &str) -> String {
    let listing = images
        .iter()
        .enumerate()
        .map(|(i, title)| format!("Image {}: {title}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    let n = images.len();
    format!(
        "IMPORTANT - IMAGE PLACEMENT & EXPLANATION:
The user has selected {n} specific images to be distributed throughout this {document}.
Here are the descriptions/titles of the images:
{listing}

INSTRUCTIONS FOR IMAGES:
1. You MUST distribute these images throughout the {document} where they are most relevant using identifiers [IMAGE_1], [IMAGE_2], etc.
2. DO NOT group them all together. Spread them out across different sections (e.g., {sections}).
3. IMMEDIATELY AFTER placing an [IMAGE_X] tag, write a short paragraph or caption explaining how this image relates to the text above or describing the concept shown in references to the image title provided above.
4. Ensure every selected image (1 to {n}) is included exactly once."
    )
}

pub fn assignment_prompt(brief: &AssignmentBrief) -> String {
    let mut prompt = format!(
        "Write a highly professional academic assignment in ENGLISH about the subject: \"{}\", \
specifically on the topic: \"{}\".\n\n{STEM_RULES}\n\n",
        brief.subject, brief.topic
    );
    if !brief.images.is_empty() {
        prompt.push_str(&image_instructions(
            &brief.images,
            "assignment",
            "Introduction, Analysis, Conclusion",
        ));
        prompt.push_str("\n\n");
    }
    prompt.push_str(ASSIGNMENT_STRUCTURE);
    prompt.push_str("\n\nStyle: Formal Academic English.\n");
    if !brief.student_name.is_empty() {
        prompt.push_str(&format!("Student Name: {}.\n", brief.student_name));
    }
    if !brief.college.is_empty() {
        prompt.push_str(&format!("College: {}.\n", brief.college));
    }
    prompt.push_str(
        "IMPORTANT: The output MUST be entirely in English. ONLY include math formulas if the topic genuinely requires them.",
    );
    if !brief.images.is_empty() {
        prompt.push_str(IMAGE_REMINDER);
    }
    prompt
}

pub fn report_prompt(brief: &ReportBrief) -> String {
    let mut prompt = format!(
        "Write a detailed academic report in ENGLISH of approximately 1500 words about: \"{}\".\n\n{STEM_RULES}\n\n",
        brief.topic
    );
    if !brief.images.is_empty() {
        prompt.push_str(&image_instructions(
            &brief.images,
            "report",
            "Introduction, Analysis, Findings",
        ));
        prompt.push_str("\n\n");
    }
    prompt.push_str(REPORT_STRUCTURE);
    prompt.push_str("\n\n");
    if !brief.student_name.is_empty() {
        prompt.push_str(&format!("Student: {}. ", brief.student_name));
    }
    if !brief.subject.is_empty() {
        prompt.push_str(&format!("Subject: {}.", brief.subject));
    }
    prompt.push_str("\nStyle: Professional, Technical, Academic English.\n");
    prompt.push_str("IMPORTANT: The output must be entirely in ENGLISH.");
    if !brief.images.is_empty() {
        prompt.push_str(IMAGE_REMINDER);
    }
    prompt
}

pub fn presentation_prompt(brief: &PresentationBrief) -> String {
    let images = match brief.image_count {
        0 => "No images are available, so do not include imageIndex in any slide.".to_string(),
        n => format!(
            "You have {n} images to distribute. Assign imageIndex (0-{}) to slides where images are most relevant.",
            n - 1
        ),
    };
    let charts = if brief.charts {
        "\n\nADDITIONAL REQUIREMENT: Include ONE slide with statistical chart data related to the topic.
For this chart slide, include a \"chartData\" field with this structure:
{\"type\": \"bar\" or \"pie\" or \"line\", \"title\": \"Chart Title\", \"data\": [{\"label\": \"Category 1\", \"value\": 75}, {\"label\": \"Category 2\", \"value\": 60}]}
Make up REALISTIC fake statistics that would be relevant for an academic presentation on this topic."
    } else {
        ""
    };
    format!(
        "Create a professional PowerPoint presentation outline about \"{}\" for the subject \"{}\".

Generate EXACTLY 6-8 content slides (not including title and thank you slides).

{images}{charts}

Return ONLY a valid JSON array with this exact structure, no markdown or extra text:
[
  {{\"title\": \"Slide Title Here\", \"content\": [\"Point 1\", \"Point 2\", \"Point 3\", \"Point 4\"], \"imageIndex\": 0}},
  {{\"title\": \"Another Slide Title\", \"content\": [\"Point 1\", \"Point 2\", \"Point 3\"]}}
]

Rules:
- Each slide should have 3-5 bullet points in the content array
- Content should be professional and academic
- Distribute images evenly across slides (if available)
- All text must be in English
- Make it suitable for a university/college presentation",
        brief.topic, brief.subject
    )
}

/// Remove a surrounding markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(reply: &str) -> &str {
    let mut s = reply.trim();
    s = s.strip_prefix("```json").unwrap_or(s);
    s = s.strip_prefix("```").unwrap_or(s);
    s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

/// Parse the model's reply into slides.
///
/// Image indexes outside `0..image_count` are dropped rather than failing
/// the whole outline.
pub fn parse_slides(reply: &str, image_count: usize) -> Result<Vec<Slide>, SlideParseError> {
    let cleaned = strip_code_fence(reply);
    if cleaned.is_empty() {
        return Err(SlideParseError::Empty);
    }
    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| SlideParseError::Json(e.to_string()))?;
    if !value.is_array() {
        return Err(SlideParseError::NotArray);
    }
    let mut slides: Vec<Slide> =
        serde_json::from_value(value).map_err(|e| SlideParseError::Malformed(e.to_string()))?;
    for slide in &mut slides {
        if slide.image_index.is_some_and(|i| i >= image_count) {
            slide.image_index = None;
        }
    }
    Ok(slides)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTLINE: &str = r#"[
        {"title": "Intro", "content": ["a", "b", "c"], "imageIndex": 0},
        {"title": "Numbers", "content": ["x"], "chartData": {"type": "pie", "title": "Share", "data": [{"label": "A", "value": 40}, {"label": "B", "value": 60.5}]}}
    ]"#;

    #[test]
    fn parses_plain_array() {
        let slides = parse_slides(OUTLINE, 2).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title, "Intro");
        assert_eq!(slides[0].content, vec!["a", "b", "c"]);
        assert_eq!(slides[0].image_index, Some(0));
        let chart = slides[1].chart_data.as_ref().unwrap();
        assert_eq!(chart.kind, ChartKind::Pie);
        assert_eq!(chart.data[1].value, 60.5);
    }

    #[test]
    fn strips_json_fence() {
        let fenced = format!("```json\n{OUTLINE}\n```");
        assert_eq!(parse_slides(&fenced, 2).unwrap().len(), 2);

        let bare_fence = format!("  ```\n{OUTLINE}\n```  ");
        assert_eq!(parse_slides(&bare_fence, 2).unwrap().len(), 2);
    }

    #[test]
    fn rejects_non_array() {
        let err = parse_slides(r#"```json
{"title": "Only one", "content": []}
```"#, 0)
        .unwrap_err();
        assert!(matches!(err, SlideParseError::NotArray));
    }

    #[test]
    fn rejects_prose_and_empty() {
        assert!(matches!(
            parse_slides("Sure! Here are your slides:", 0).unwrap_err(),
            SlideParseError::Json(_)
        ));
        assert!(matches!(parse_slides("```json\n```", 0).unwrap_err(), SlideParseError::Empty));
    }

    #[test]
    fn rejects_slide_without_title() {
        let err = parse_slides(r#"[{"content": ["a"]}]"#, 0).unwrap_err();
        assert!(matches!(err, SlideParseError::Malformed(_)));
    }

    #[test]
    fn out_of_range_image_index_is_dropped() {
        let slides = parse_slides(OUTLINE, 0).unwrap();
        assert_eq!(slides[0].image_index, None);
    }

    #[test]
    fn slides_serialize_snake_case() {
        let slides = parse_slides(OUTLINE, 1).unwrap();
        let json = serde_json::to_value(&slides).unwrap();
        assert_eq!(json[0]["image_index"], 0);
        assert!(json[0].get("chart_data").is_none());
        assert_eq!(json[1]["chart_data"]["type"], "pie");
    }

    #[test]
    fn assignment_prompt_without_images() {
        let prompt = assignment_prompt(&AssignmentBrief {
            subject: "Physics".into(),
            topic: "Projectile motion".into(),
            student_name: "Sam".into(),
            college: "Engineering".into(),
            images: vec![],
        });
        assert!(prompt.contains("about the subject: \"Physics\""));
        assert!(prompt.contains("on the topic: \"Projectile motion\""));
        assert!(prompt.contains("## Key Concepts"));
        assert!(prompt.contains("Student Name: Sam."));
        assert!(prompt.contains("College: Engineering."));
        assert!(!prompt.contains("[IMAGE_1]"));
    }

    #[test]
    fn assignment_prompt_lists_images() {
        let prompt = assignment_prompt(&AssignmentBrief {
            subject: "History".into(),
            topic: "The Nile".into(),
            images: vec!["Aswan dam".into(), "Delta map".into()],
            ..AssignmentBrief::default()
        });
        assert!(prompt.contains("selected 2 specific images"));
        assert!(prompt.contains("Image 1: Aswan dam\nImage 2: Delta map"));
        assert!(prompt.contains("(1 to 2)"));
        assert!(prompt.ends_with(IMAGE_REMINDER));
        assert!(!prompt.contains("Student Name"));
    }

    #[test]
    fn report_prompt_structure() {
        let prompt = report_prompt(&ReportBrief {
            topic: "Solar power".into(),
            subject: "Energy".into(),
            student_name: "Ali".into(),
            images: vec!["Panel".into()],
        });
        assert!(prompt.contains("approximately 1500 words about: \"Solar power\""));
        assert!(prompt.contains("## Executive Summary"));
        assert!(prompt.contains("Student: Ali. Subject: Energy."));
        assert!(prompt.contains("throughout this report"));
    }

    #[test]
    fn presentation_prompt_images_and_charts() {
        let prompt = presentation_prompt(&PresentationBrief {
            topic: "AI".into(),
            subject: "CS".into(),
            image_count: 3,
            charts: true,
        });
        assert!(prompt.contains("Assign imageIndex (0-2)"));
        assert!(prompt.contains("chartData"));

        let prompt = presentation_prompt(&PresentationBrief {
            topic: "AI".into(),
            ..PresentationBrief::default()
        });
        assert!(prompt.contains("do not include imageIndex"));
        assert!(!prompt.contains("ADDITIONAL REQUIREMENT"));
    }
}
