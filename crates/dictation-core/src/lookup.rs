//! Dictionary and translation lookups.
//!
//! Every public lookup returns displayable text. Network errors, non-2xx
//! responses and empty results all become a fixed fallback message, so
//! callers never see an error from this module.

use crate::config::LookupConfig;
use crate::error::DictationResult;
use anyhow::{anyhow, Context};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, error, warn};

/// Shown for multi-word dictionary lookups
pub const SINGLE_WORD_ONLY: &str = "Definitions are only available for single words.";
/// Shown when the dictionary has no entry
pub const NO_DEFINITION: &str = "No definition found for this word.";
/// Shown when the translation is empty
pub const NO_TRANSLATION: &str = "No translation could be found for the input text.";

/// Definitions kept per part of speech
pub const MAX_DEFINITIONS_PER_MEANING: usize = 3;

/// Whether the text contains a CJK ideograph
#[must_use]
pub fn is_chinese(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}'))
}

#[derive(Debug, Deserialize)]
struct DictionaryEntry {
    #[serde(default)]
    meanings: Vec<DictionaryMeaning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DictionaryMeaning {
    #[serde(default)]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<DictionaryDefinition>,
}

#[derive(Debug, Deserialize)]
struct DictionaryDefinition {
    definition: String,
}

/// Result of a meaning lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Meaning {
    /// Chinese input, translated to English
    Chinese {
        /// Looked-up text
        text: String,
        /// English translation or fallback
        translation: String,
    },
    /// English input, defined and translated to Cantonese
    English {
        /// Looked-up text
        text: String,
        /// English definition or fallback
        definition: String,
        /// Chinese translation or fallback
        translation: String,
    },
}

impl fmt::Display for Meaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chinese { text, translation } => {
                writeln!(f, "{text}")?;
                writeln!(f)?;
                writeln!(f, "Translation (English):")?;
                write!(f, "{translation}")
            }
            Self::English {
                text,
                definition,
                translation,
            } => {
                writeln!(f, "{text}")?;
                writeln!(f)?;
                writeln!(f, "Definition (English):")?;
                writeln!(f, "{definition}")?;
                writeln!(f)?;
                writeln!(f, "Translation (Chinese):")?;
                write!(f, "{translation}")
            }
        }
    }
}

/// HTTP client for the dictionary and translation services
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: reqwest::Client,
    config: LookupConfig,
}

impl LookupClient {
    /// Create a client using the configured endpoints and timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: LookupConfig) -> DictationResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    /// Endpoint configuration
    #[must_use]
    pub const fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Definition of a single English word, or a fallback message
    pub async fn english_definition(&self, word: &str) -> String {
        let word = word.trim();
        if word.is_empty() {
            return NO_DEFINITION.to_string();
        }
        if word.contains(char::is_whitespace) {
            return SINGLE_WORD_ONLY.to_string();
        }

        match self.fetch_definition(word).await {
            Ok(Some(text)) => text,
            Ok(None) => NO_DEFINITION.to_string(),
            Err(e) => {
                error!("Dictionary lookup for '{word}' failed: {e:#}");
                self.definition_fallback(word)
            }
        }
    }

    /// Translation between two languages, or a fallback message
    ///
    /// Chinese source languages are auto-detected by the service.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> String {
        if text.trim().is_empty() {
            return NO_TRANSLATION.to_string();
        }
        let source = if source.starts_with("zh") { "auto" } else { source };

        match self.fetch_translation(text, source, target).await {
            Ok(translated) if translated.is_empty() => NO_TRANSLATION.to_string(),
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation of '{text}' failed: {e:#}");
                format!(
                    "Could not retrieve translation for '{text}'. The service may be temporarily unavailable."
                )
            }
        }
    }

    /// Definition and translation for any entered item
    ///
    /// Chinese text is translated to English. Anything else is defined and
    /// translated to Cantonese, with both requests in flight together. Blank
    /// text gets the fallback messages without any request.
    pub async fn meaning(&self, text: &str) -> Meaning {
        let text = text.trim();

        if is_chinese(text) {
            debug!("Looking up Chinese text '{text}'");
            let translation = self.translate(text, "zh-HK", "en").await;
            return Meaning::Chinese {
                text: text.to_string(),
                translation,
            };
        }

        debug!("Looking up English text '{text}'");
        let (definition, translation) = tokio::join!(
            self.english_definition(text),
            self.translate(text, "en", "zh-HK")
        );
        Meaning::English {
            text: text.to_string(),
            definition,
            translation,
        }
    }

    /// `Ok(None)` when the service has no entry for the word
    async fn fetch_definition(&self, word: &str) -> anyhow::Result<Option<String>> {
        let url = append_segment(&self.config.dictionary_url, word)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("dictionary request failed")?;

        if !response.status().is_success() {
            debug!("Dictionary returned {} for '{word}'", response.status());
            return Ok(None);
        }

        let entries: Vec<DictionaryEntry> = response
            .json()
            .await
            .context("dictionary response was not valid JSON")?;

        let Some(entry) = entries.first() else {
            return Ok(None);
        };
        let text = format_definitions(&entry.meanings);
        Ok((!text.is_empty()).then_some(text))
    }

    async fn fetch_translation(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> anyhow::Result<String> {
        let response = self
            .http
            .get(self.config.translate_url.as_str())
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .context("translation request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "translation service responded with {}",
                response.status()
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("translation response was not valid JSON")?;
        Ok(join_translated_segments(&body))
    }

    fn definition_fallback(&self, word: &str) -> String {
        let link = append_segment(&self.config.fallback_dictionary_url, word).map_or_else(
            |_| self.config.fallback_dictionary_url.clone(),
            |url| url.to_string(),
        );
        format!("Could not retrieve definition. Try searching Merriam-Webster: {link}")
    }
}

fn append_segment(base: &str, segment: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid base URL '{base}'"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("'{base}' cannot take path segments"))?
        .push(segment);
    Ok(url)
}

fn format_definitions(meanings: &[DictionaryMeaning]) -> String {
    meanings
        .iter()
        .filter(|meaning| !meaning.definitions.is_empty())
        .map(|meaning| {
            let mut block = meaning.part_of_speech.clone();
            for definition in meaning.definitions.iter().take(MAX_DEFINITIONS_PER_MEANING) {
                block.push_str("\n  - ");
                block.push_str(&definition.definition);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The service answers `[[["segment", "source", ...], ...], ...]`
fn join_translated_segments(body: &serde_json::Value) -> String {
    body.get(0)
        .and_then(serde_json::Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|segment| segment.get(0).and_then(serde_json::Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}
