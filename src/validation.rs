//! Shared input validation for the quiz and translation routes.

const MAX_PHRASE_LEN: usize = 200;
const MAX_ANSWER_LEN: usize = 500;

/// Language codes are BCP-47-ish tags: a 2-3 letter primary subtag with an
/// optional region, e.g. "en", "de", "pt-BR".
pub fn validate_language_code(code: &str) -> Result<(), &'static str> {
    let mut parts = code.splitn(2, '-');
    let primary = parts.next().unwrap_or("");
    if !(2..=3).contains(&primary.len()) || !primary.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err("Language code must be a lowercase 2-3 letter tag, e.g. \"en\" or \"pt-BR\"");
    }
    if let Some(region) = parts.next() {
        if region.len() != 2 || !region.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err("Language region must be a 2 letter uppercase tag, e.g. \"pt-BR\"");
        }
    }
    Ok(())
}

/// Phrase text must be non-empty after trimming and within length bounds.
pub fn validate_phrase_text(text: &str) -> Result<(), &'static str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("Phrase text must not be empty");
    }
    if trimmed.chars().count() > MAX_PHRASE_LEN {
        return Err("Phrase text must not exceed 200 characters");
    }
    Ok(())
}

pub fn validate_answer_text(answer: &str) -> Result<(), &'static str> {
    if answer.trim().is_empty() {
        return Err("Answer must not be empty");
    }
    if answer.chars().count() > MAX_ANSWER_LEN {
        return Err("Answer must not exceed 500 characters");
    }
    Ok(())
}
