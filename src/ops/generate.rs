//! Turns a free-text prompt into a short list of actionable item texts.
//!
//! The upstream completion call is optional: without a credential, or when
//! the call fails in any way, a deterministic set of template items built
//! from the prompt is returned instead. [`Generator::generate`] never fails
//! and never returns an empty list.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::io::completion::{CompletionClient, CompletionError};
use crate::model::config::GenerationConfig;
use crate::model::item::Item;
use crate::model::text::ItemText;
use crate::ops::list_ops::new_id;

/// Upper bound on generated items
pub const MAX_ITEMS: usize = 8;

/// Generated items are cut to this many grapheme clusters
pub const MAX_ITEM_LEN: usize = 80;

/// Instruction sent with every upstream request
pub const INSTRUCTION: &str = "\
You are an expert assistant for building todo lists.
From the user's request, produce 3 to 8 concrete, useful tasks.
Each task must be:
- concrete and actionable
- short (at most 80 characters)
- written in the same language as the request
- logically related to the topic of the request

Return ONLY the list of tasks, one per line, with no numbering and no extra text.

Example for the request \"prepare for a job interview\":
Review and update the resume
Research the company and its values
Prepare answers to common questions
Choose a professional outfit
Practice a short self-introduction";

/// Prefixes of the deterministic fallback items
const FALLBACK_TEMPLATES: [&str; 4] = [
    "Start work on: ",
    "Research: ",
    "Create a plan for: ",
    "Gather information about: ",
];

/// A leading bullet (`-`, `•`, `*`) or number (`1.`, `2)`, `(3)`), only when
/// followed by whitespace or the end of the line
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-•*]|\d+[.)]|\(\d+\))(?:\s+|$)").expect("list marker pattern is valid")
});

/// Where a set of generated items came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Upstream,
    Fallback,
}

/// Result of one generation: 1 to [`MAX_ITEMS`] item texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub items: Vec<String>,
    pub source: GenerationSource,
}

impl Generation {
    fn fallback(prompt: &str) -> Self {
        Generation {
            items: fallback_items(prompt),
            source: GenerationSource::Fallback,
        }
    }
}

/// The generation gateway. Holds an upstream client when a credential is configured.
#[derive(Debug, Clone)]
pub struct Generator {
    client: Option<CompletionClient>,
}

impl Generator {
    pub fn new(client: Option<CompletionClient>) -> Self {
        Generator { client }
    }

    /// A generator that only ever uses the fallback templates
    pub fn offline() -> Self {
        Generator { client: None }
    }

    /// Build from config, reading the credential from the configured
    /// environment variable.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let key = std::env::var(&config.api_key_env).ok();
        Self::from_config_with_key(config, key)
    }

    pub fn from_config_with_key(config: &GenerationConfig, api_key: Option<String>) -> Self {
        let Some(key) = api_key.filter(|k| !k.trim().is_empty()) else {
            info!(env = %config.api_key_env, "no API key configured, using fallback generation");
            return Self::offline();
        };
        match CompletionClient::new(config, key) {
            Ok(client) => Self::new(Some(client)),
            Err(e) => {
                warn!(error = %e, "could not set up completion client, using fallback generation");
                Self::offline()
            }
        }
    }

    pub fn has_upstream(&self) -> bool {
        self.client.is_some()
    }

    /// Generate item texts for `prompt`. Never fails, never empty.
    pub async fn generate(&self, prompt: &str) -> Generation {
        let Some(client) = &self.client else {
            return Generation::fallback(prompt);
        };
        match self.generate_upstream(client, prompt).await {
            Ok(items) => {
                debug!(count = items.len(), "generated items upstream");
                Generation {
                    items,
                    source: GenerationSource::Upstream,
                }
            }
            Err(e) => {
                warn!(error = %e, endpoint = %client.endpoint(), "generation failed, using fallback");
                Generation::fallback(prompt)
            }
        }
    }

    async fn generate_upstream(
        &self,
        client: &CompletionClient,
        prompt: &str,
    ) -> Result<Vec<String>, CompletionError> {
        let content = client.complete(INSTRUCTION, prompt).await?;
        let items = parse_completion(&content);
        if items.is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(items)
    }
}

/// Split completion text into item texts: one per line, list markers
/// stripped, blanks dropped, each truncated, at most [`MAX_ITEMS`].
pub fn parse_completion(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .map(|line| truncate_graphemes(&line, MAX_ITEM_LEN))
        .take(MAX_ITEMS)
        .collect()
}

/// Deterministic items built from the prompt
pub fn fallback_items(prompt: &str) -> Vec<String> {
    let prompt = prompt.trim();
    FALLBACK_TEMPLATES
        .iter()
        .map(|prefix| format!("{}{}", prefix, prompt))
        .collect()
}

fn truncate_graphemes(text: &str, max: usize) -> String {
    match text.grapheme_indices(true).nth(max) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Request/response surface
// ---------------------------------------------------------------------------

/// Incoming generation request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub list_id: String,
    #[serde(default)]
    pub prompt: String,
}

/// Outgoing generation response
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<Item>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<GenerationSource>,
}

impl GenerateResponse {
    fn failure(message: &str) -> Self {
        GenerateResponse {
            success: false,
            todos: None,
            error: Some(message.to_string()),
            source: None,
        }
    }
}

/// Validate a request and turn the generated texts into full items with
/// fresh ids and current timestamps. Upstream problems never surface here.
pub async fn handle_generate(generator: &Generator, request: &GenerateRequest) -> GenerateResponse {
    if request.list_id.trim().is_empty() || request.prompt.trim().is_empty() {
        return GenerateResponse::failure("listId and prompt are required");
    }

    let generation = generator.generate(request.prompt.trim()).await;
    let now = Utc::now();
    let todos: Vec<Item> = generation
        .items
        .iter()
        .filter_map(|text| ItemText::parse(text).ok())
        .map(|text| Item::new(new_id(), text, now))
        .collect();

    GenerateResponse {
        success: true,
        todos: Some(todos),
        error: None,
        source: Some(generation.source),
    }
}
