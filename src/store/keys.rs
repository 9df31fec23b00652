use crate::store::StoreError;

/// Composite keys join segments with `:`. Ids are uuids and language codes
/// are validated upstream, but a stray `:` would silently corrupt prefix
/// scans, so every segment is checked here before a key is built.
fn ensure_segment(name: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{name} must not be empty")));
    }
    if value.contains(':') {
        return Err(StoreError::Validation(format!(
            "{name} must not contain ':' (got {value:?})"
        )));
    }
    Ok(())
}

pub fn phrase_key(phrase_id: &str) -> String {
    phrase_id.to_string()
}

pub fn phrase_text_index_key(content_hash: &str) -> String {
    content_hash.to_string()
}

pub fn phrase_translation_key(phrase_id: &str, lang: &str) -> Result<String, StoreError> {
    ensure_segment("phrase_id", phrase_id)?;
    ensure_segment("target_language_code", lang)?;
    Ok(format!("{phrase_id}:{lang}"))
}

pub fn learning_progress_key(user_id: &str, phrase_id: &str) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    ensure_segment("phrase_id", phrase_id)?;
    Ok(format!("{user_id}:{phrase_id}"))
}

pub fn learning_progress_prefix(user_id: &str) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    Ok(format!("{user_id}:"))
}

/// Due index keys sort ascending by review timestamp so a prefix scan
/// visits the most overdue phrases first and can stop at `now`.
pub fn progress_due_index_key(
    user_id: &str,
    due_ts_ms: i64,
    phrase_id: &str,
) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    ensure_segment("phrase_id", phrase_id)?;
    let ts = due_ts_ms.max(0) as u64;
    Ok(format!("{user_id}:{ts:020}:{phrase_id}"))
}

pub fn progress_due_index_prefix(user_id: &str) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    Ok(format!("{user_id}:"))
}

pub fn parse_due_index_key(raw: &[u8]) -> Option<(i64, String)> {
    let text = std::str::from_utf8(raw).ok()?;
    let mut parts = text.splitn(3, ':');
    let _user = parts.next()?;
    let ts = parts.next()?.parse::<u64>().ok()?;
    let phrase_id = parts.next()?;
    if phrase_id.is_empty() {
        return None;
    }
    Some((ts.min(i64::MAX as u64) as i64, phrase_id.to_string()))
}

pub fn quiz_attempt_key(attempt_id: &str) -> String {
    attempt_id.to_string()
}

/// Newest-first per-user listing: reverse timestamp so lexicographic order
/// is recency order.
pub fn quiz_attempt_user_index_key(
    user_id: &str,
    created_ts_ms: i64,
    attempt_id: &str,
) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    ensure_segment("attempt_id", attempt_id)?;
    let reverse_ts = u64::MAX - created_ts_ms.max(0) as u64;
    Ok(format!("{user_id}:{reverse_ts:020}:{attempt_id}"))
}

pub fn quiz_attempt_user_prefix(user_id: &str) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    Ok(format!("{user_id}:"))
}

pub fn user_search_key(
    user_id: &str,
    searched_ts_ms: i64,
    search_id: &str,
) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    ensure_segment("search_id", search_id)?;
    let reverse_ts = u64::MAX - searched_ts_ms.max(0) as u64;
    Ok(format!("{user_id}:{reverse_ts:020}:{search_id}"))
}

pub fn user_search_prefix(user_id: &str) -> Result<String, StoreError> {
    ensure_segment("user_id", user_id)?;
    Ok(format!("{user_id}:"))
}

pub fn user_languages_key(user_id: &str) -> String {
    user_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_index_key_orders_by_time_asc() {
        let early = progress_due_index_key("u1", 1000, "p1").unwrap();
        let late = progress_due_index_key("u1", 2000, "p2").unwrap();
        assert!(early < late);
    }

    #[test]
    fn due_index_key_round_trips() {
        let key = progress_due_index_key("u1", 1234, "p9").unwrap();
        let (ts, phrase_id) = parse_due_index_key(key.as_bytes()).unwrap();
        assert_eq!(ts, 1234);
        assert_eq!(phrase_id, "p9");
    }

    #[test]
    fn attempt_index_orders_newest_first() {
        let newer = quiz_attempt_user_index_key("u1", 2000, "a2").unwrap();
        let older = quiz_attempt_user_index_key("u1", 1000, "a1").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn colon_in_segment_is_rejected() {
        assert!(learning_progress_key("u:1", "p1").is_err());
        assert!(phrase_translation_key("p1", "e:n").is_err());
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert!(learning_progress_key("", "p1").is_err());
    }
}
