//! Study assistant operations
//!
//! The generation tasks the gateway serves. Each builds one request, runs it
//! through the resilient invoker, and substitutes a fixed reply when the model
//! returns no text. Presentations are the exception: their reply must parse
//! as a slide outline.

use std::sync::Arc;

use generative::{BackendError, GenerateRequest, Generator, InlineData};
use key_rotation::ResilientInvoker;
use thiserror::Error;
use tracing::warn;

use crate::documents::{
    self, AssignmentBrief, PresentationBrief, ReportBrief, Slide, SlideParseError,
};

pub const TEXT_FALLBACK: &str = "Sorry, no content was generated.";
pub const QUIZ_FALLBACK: &str = "No answer was found.";
pub const SHEET_FALLBACK: &str = "No solution was found.";

pub const SHEET_SYSTEM_INSTRUCTION: &str = "You are an expert academic tutor and problem solver. \
Analyze the uploaded worksheet carefully and solve ALL questions with detailed step-by-step \
explanations. Use LaTeX notation ($...$ for inline, $$...$$ for display) for mathematical \
formulas. Output must be in English.";

/// Operation names, used in logs, metrics and the attempts-exhausted message.
pub const GENERATE_TEXT: &str = "Generating Text";
pub const SOLVE_QUIZ: &str = "Solving Quiz";
pub const SOLVE_SHEET: &str = "Solving Sheet";
pub const WRITE_ASSIGNMENT: &str = "Writing Assignment";
pub const WRITE_REPORT: &str = "Writing Report";
pub const BUILD_PRESENTATION: &str = "Building Presentation";

/// Failure of an assistant operation.
pub type AssistantError = key_rotation::Error<BackendError>;

#[derive(Debug, Error)]
pub enum PresentationError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),

    #[error(transparent)]
    Slides(#[from] SlideParseError),
}

/// Model used for each operation.
#[derive(Debug, Clone)]
pub struct Models {
    pub text: String,
    pub quiz: String,
    pub sheet: String,
}

pub struct StudyAssistant {
    generator: Arc<dyn Generator>,
    invoker: ResilientInvoker,
    models: Models,
}

impl StudyAssistant {
    pub fn new(generator: Arc<dyn Generator>, invoker: ResilientInvoker, models: Models) -> Self {
        Self {
            generator,
            invoker,
            models,
        }
    }

    pub fn invoker(&self) -> &ResilientInvoker {
        &self.invoker
    }

    /// Backend identifier for health reporting.
    pub fn backend_id(&self) -> &str {
        self.generator.id()
    }

    /// Free-form text generation with an optional system instruction.
    pub async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: Option<String>,
    ) -> Result<String, AssistantError> {
        let request = GenerateRequest::text(&self.models.text, prompt)
            .with_system_instruction(system_instruction);
        self.run(GENERATE_TEXT, &request, TEXT_FALLBACK).await
    }

    /// Answer a quiz question, optionally with an image of it. The image
    /// goes before the question text.
    pub async fn solve_quiz(
        &self,
        question: &str,
        image: Option<InlineData>,
    ) -> Result<String, AssistantError> {
        let mut request = GenerateRequest::new(&self.models.quiz);
        if let Some(image) = image {
            request = request.with_inline(image.mime_type, image.data);
        }
        let request = request.with_text(question);
        self.run(SOLVE_QUIZ, &request, QUIZ_FALLBACK).await
    }

    /// Solve every question on an uploaded worksheet (image or PDF).
    pub async fn solve_sheet(
        &self,
        sheet: InlineData,
        prompt: &str,
    ) -> Result<String, AssistantError> {
        let request = GenerateRequest::new(&self.models.sheet)
            .with_inline(sheet.mime_type, sheet.data)
            .with_text(prompt)
            .with_system_instruction(Some(SHEET_SYSTEM_INSTRUCTION.to_string()));
        self.run(SOLVE_SHEET, &request, SHEET_FALLBACK).await
    }

    /// Academic assignment on the text model.
    pub async fn write_assignment(&self, brief: &AssignmentBrief) -> Result<String, AssistantError> {
        let request = GenerateRequest::text(&self.models.text, documents::assignment_prompt(brief))
            .with_system_instruction(Some(documents::ASSIGNMENT_SYSTEM_INSTRUCTION.to_string()));
        self.run(WRITE_ASSIGNMENT, &request, TEXT_FALLBACK).await
    }

    /// Academic report on the text model.
    pub async fn write_report(&self, brief: &ReportBrief) -> Result<String, AssistantError> {
        let request = GenerateRequest::text(&self.models.text, documents::report_prompt(brief))
            .with_system_instruction(Some(documents::REPORT_SYSTEM_INSTRUCTION.to_string()));
        self.run(WRITE_REPORT, &request, TEXT_FALLBACK).await
    }

    /// Presentation outline, parsed into slides.
    pub async fn build_presentation(
        &self,
        brief: &PresentationBrief,
    ) -> Result<Vec<Slide>, PresentationError> {
        let request = GenerateRequest::text(&self.models.text, documents::presentation_prompt(brief))
            .with_system_instruction(Some(documents::PRESENTATION_SYSTEM_INSTRUCTION.to_string()));
        let reply = self.call(BUILD_PRESENTATION, &request).await?.unwrap_or_default();
        documents::parse_slides(&reply, brief.image_count).map_err(|e| {
            warn!(error = %e, reply_len = reply.len(), "unusable presentation outline");
            PresentationError::from(e)
        })
    }

    async fn run(
        &self,
        description: &str,
        request: &GenerateRequest,
        fallback: &str,
    ) -> Result<String, AssistantError> {
        let text = self.call(description, request).await?;
        Ok(text.unwrap_or_else(|| fallback.to_string()))
    }

    async fn call(
        &self,
        description: &str,
        request: &GenerateRequest,
    ) -> Result<Option<String>, AssistantError> {
        let generator = self.generator.as_ref();
        self.invoker
            .execute(description, move |key| async move {
                generator.generate(&key, request).await
            })
            .await
    }
}
