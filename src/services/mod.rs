pub mod translation_cache;
pub mod translator;
