pub const PHRASES: &str = "phrases";
pub const PHRASE_TEXT_INDEX: &str = "phrase_text_index";
pub const PHRASE_TRANSLATIONS: &str = "phrase_translations";
pub const LEARNING_PROGRESS: &str = "learning_progress";
pub const PROGRESS_DUE_INDEX: &str = "progress_due_index";
pub const QUIZ_ATTEMPTS: &str = "quiz_attempts";
pub const QUIZ_ATTEMPTS_BY_USER: &str = "quiz_attempts_by_user";
pub const USER_SEARCHES: &str = "user_searches";
pub const USER_LANGUAGES: &str = "user_languages";
pub const SCHEMA_META: &str = "schema_meta";
