pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub phrases: sled::Tree,
    pub phrase_text_index: sled::Tree,
    pub phrase_translations: sled::Tree,
    pub learning_progress: sled::Tree,
    pub progress_due_index: sled::Tree,
    pub quiz_attempts: sled::Tree,
    pub quiz_attempts_by_user: sled::Tree,
    pub user_searches: sled::Tree,
    pub user_languages: sled::Tree,
    pub schema_meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let phrases = db.open_tree(trees::PHRASES)?;
        let phrase_text_index = db.open_tree(trees::PHRASE_TEXT_INDEX)?;
        let phrase_translations = db.open_tree(trees::PHRASE_TRANSLATIONS)?;
        let learning_progress = db.open_tree(trees::LEARNING_PROGRESS)?;
        let progress_due_index = db.open_tree(trees::PROGRESS_DUE_INDEX)?;
        let quiz_attempts = db.open_tree(trees::QUIZ_ATTEMPTS)?;
        let quiz_attempts_by_user = db.open_tree(trees::QUIZ_ATTEMPTS_BY_USER)?;
        let user_searches = db.open_tree(trees::USER_SEARCHES)?;
        let user_languages = db.open_tree(trees::USER_LANGUAGES)?;
        let schema_meta = db.open_tree(trees::SCHEMA_META)?;

        Ok(Self {
            db,
            phrases,
            phrase_text_index,
            phrase_translations,
            learning_progress,
            progress_due_index,
            quiz_attempts,
            quiz_attempts_by_user,
            user_searches,
            user_languages,
            schema_meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
