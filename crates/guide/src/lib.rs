//! Markdown guide of study locations, laid out as an Obsidian vault.

pub mod vault;

pub use vault::build_guide;
