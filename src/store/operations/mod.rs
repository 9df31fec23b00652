pub mod attempts;
pub mod languages;
pub mod phrases;
pub mod progress;
pub mod searches;
pub mod translations;
