//! Request types passed to a `Generator`

/// Base64-encoded binary content (an image or a PDF) sent alongside text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    /// Standard base64, no `data:` URL prefix.
    pub data: String,
}

/// One piece of user content. Order is preserved on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Inline(InlineData),
}

/// A single-turn generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub system_instruction: Option<String>,
}

impl GenerateRequest {
    /// Request with no content yet.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: Vec::new(),
            system_instruction: None,
        }
    }

    /// Plain text prompt.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model).with_text(prompt)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn with_inline(mut self, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        self.parts.push(Part::Inline(InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        }));
        self
    }

    /// Set the system instruction. Empty strings are treated as absent.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction.filter(|s| !s.is_empty());
        self
    }
}
