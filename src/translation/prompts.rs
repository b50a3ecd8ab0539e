/*!
 * Request framing for a batch.
 *
 * The system prompt goes out verbatim and the user message is the batch's
 * `ID:::Text` lines, one per line, with nothing before or after them. The
 * response parser relies on the model mirroring exactly this layout.
 */

use crate::providers::openai::ChatMessage;
use crate::unit_processor::TranslationUnit;

/// Builder for the messages of one batch request
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder<'a> {
    system_prompt: &'a str,
    units: &'a [TranslationUnit],
}

impl<'a> TranslationPromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(system_prompt: &'a str) -> Self {
        Self {
            system_prompt,
            units: &[],
        }
    }

    /// Set the units to translate
    pub fn with_units(mut self, units: &'a [TranslationUnit]) -> Self {
        self.units = units;
        self
    }

    /// Render the user message
    pub fn build_user_message(&self) -> String {
        render_batch(self.units)
    }

    /// System prompt followed by the batch lines
    pub fn build_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt),
            ChatMessage::user(self.build_user_message()),
        ]
    }
}

/// Join the batch as `ID:::SourceText` lines
pub fn render_batch(units: &[TranslationUnit]) -> String {
    units
        .iter()
        .map(TranslationUnit::source_line)
        .collect::<Vec<_>>()
        .join("\n")
}
