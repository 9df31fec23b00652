use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::TranslatorConfig;
use crate::store::operations::translations::TranslationEntry;

/// Client for the external translation/evaluation LLM service. The quiz
/// engine treats it as opaque: it hands over text and languages and
/// persists whatever comes back.
#[derive(Debug, Clone)]
pub struct Translator {
    config: TranslatorConfig,
    client: reqwest::Client,
}

/// Per-language entries plus a flag for a probably-misspelled source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    pub languages: HashMap<String, Vec<TranslationEntry>>,
    pub spelling_issue: bool,
}

/// Verdict of the semantic answer judge. When consulted it is
/// authoritative; `reason` lands in the attempt's evaluation detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub equivalent: bool,
    pub reason: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    model: &'a str,
    text: &'a str,
    source_language: &'a str,
    target_languages: &'a [String],
    native_language: &'a str,
}

#[derive(Debug, Serialize)]
struct JudgeRequest<'a> {
    model: &'a str,
    expected: &'a str,
    given: &'a str,
    language: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    #[error("translator is disabled")]
    Disabled,
    #[error("translator request timed out")]
    Timeout,
    #[error("translator network error: {0}")]
    Network(String),
    #[error("translator api error: status={status}, message={message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for TranslatorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslatorError::Timeout
        } else if let Some(status) = error.status() {
            TranslatorError::Api {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            TranslatorError::Network(error.to_string())
        }
    }
}

impl Translator {
    pub fn new(config: &TranslatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: config.clone(),
            client,
        }
    }

    /// Validate translator configuration at startup. A live (non-mock)
    /// translator needs an endpoint to talk to.
    pub fn validate_config(config: &TranslatorConfig) {
        if config.enabled && !config.mock && config.api_url.trim().is_empty() {
            panic!(
                "Invalid translator configuration: enabled=true, mock=false, \
                 but TRANSLATOR_API_URL is empty. \
                 Set TRANSLATOR_API_URL or TRANSLATOR_MOCK=true."
            );
        }
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    pub fn judge_enabled(&self) -> bool {
        self.config.enabled && self.config.semantic_judge_enabled
    }

    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_languages: &[String],
        native_language: &str,
    ) -> Result<TranslationOutput, TranslatorError> {
        if !self.config.enabled {
            return Err(TranslatorError::Disabled);
        }
        if self.config.mock {
            return Ok(mock_translation(text, target_languages));
        }

        let request = TranslateRequest {
            model: &self.config.model,
            text,
            source_language,
            target_languages,
            native_language,
        };
        let response = self
            .client
            .post(format!("{}/translate", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranslatorError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json::<TranslationOutput>().await?)
    }

    /// Near-miss check for free-text answers that failed the normalized
    /// string comparison.
    pub async fn judge_answer(
        &self,
        expected: &str,
        given: &str,
        language: &str,
    ) -> Result<JudgeVerdict, TranslatorError> {
        if !self.config.enabled {
            return Err(TranslatorError::Disabled);
        }
        if self.config.mock {
            return Ok(mock_verdict(expected, given));
        }

        let request = JudgeRequest {
            model: &self.config.model,
            expected,
            given,
            language,
        };
        let response = self
            .client
            .post(format!("{}/judge", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranslatorError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json::<JudgeVerdict>().await?)
    }
}

/// Deterministic stand-in used in development and tests: every target
/// language gets one entry derived from the source text.
fn mock_translation(text: &str, target_languages: &[String]) -> TranslationOutput {
    let mut languages = HashMap::new();
    for lang in target_languages {
        languages.insert(
            lang.clone(),
            vec![TranslationEntry {
                word: format!("{} [{}]", text.trim(), lang),
                grammar_info: "mock".to_string(),
                context: format!("mock rendering of '{}' into {}", text.trim(), lang),
            }],
        );
    }
    TranslationOutput {
        languages,
        spelling_issue: false,
    }
}

/// Mock judge: tolerate a single-character slip, nothing more.
fn mock_verdict(expected: &str, given: &str) -> JudgeVerdict {
    let distance = edit_distance(&expected.to_lowercase(), &given.to_lowercase());
    JudgeVerdict {
        equivalent: distance <= 1,
        reason: format!("mock judge: edit distance {distance}"),
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![i + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let insertion = current[j] + 1;
            let deletion = previous[j + 1] + 1;
            current.push(substitution.min(insertion).min(deletion));
        }
        previous = current;
    }

    previous[b.len()]
}
