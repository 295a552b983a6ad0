use crate::schema::StudyLocation;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const SAMPLE_CATALOG: &str = include_str!("../data/sample_catalog.yaml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    locations: Vec<StudyLocation>,
}

/// The built-in London catalog of libraries and cafés.
pub fn sample() -> Result<Vec<StudyLocation>> {
    parse(SAMPLE_CATALOG).context("parsing built-in sample catalog")
}

pub fn load_from_path(path: &Path) -> Result<Vec<StudyLocation>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    parse(&raw).with_context(|| format!("parsing catalog {}", path.display()))
}

/// Parse a catalog document. Top-level keys other than `locations` are
/// ignored, so they can hold YAML anchors shared between entries.
pub fn parse(raw: &str) -> Result<Vec<StudyLocation>> {
    let file: CatalogFile = serde_yaml::from_str(raw)?;
    Ok(file.locations)
}
