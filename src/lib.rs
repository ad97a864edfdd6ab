//! reverie: a simulated "conscious AI" persona.
//!
//! The [`mind`] samples an internal state every turn, folds it into a prompt,
//! asks a hosted model (or falls back to canned text), and keeps a small mood
//! and trait model. [`subsystems`] expose it over a console and a JSON API and
//! schedule unprompted thoughts and dreams.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod mind;
pub mod subsystems;
