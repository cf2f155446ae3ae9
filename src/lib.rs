//! Generates BNI Connect profile HTML from plain profile text.
//!
//! A submission flows through [`prompt`] (request assembly), a
//! [`gemini::ProfileModel`], [`merger`] (image splicing via [`links`]) and
//! finally [`templates`] for the preview and copyable blocks.

pub mod config;
pub mod errors;
pub mod form;
pub mod gemini;
pub mod generator;
pub mod links;
pub mod merger;
pub mod profile;
pub mod prompt;
pub mod templates;
