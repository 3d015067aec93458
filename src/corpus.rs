//! Slide corpus loader
//!
//! Reads the JSON decks produced by the ingestion scripts:
//!
//! ```json
//! { "course_name": "NLP", "chapter_name": "Intro",
//!   "slides": [ { "page_number": 1, "title": "What is NLP", "text": "..." } ] }
//! ```
//!
//! Files are read in name order so passage ids and insertion order, and
//! therefore index tie-breaks, are the same on every run.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::{Result, RetrievalError};
use crate::types::passage::keys;
use crate::types::Passage;

#[derive(Debug, Deserialize)]
struct SlideDeck {
    course_name: String,
    chapter_name: String,
    slides: Vec<Slide>,
}

#[derive(Debug, Deserialize)]
struct Slide {
    page_number: i64,
    #[serde(default)]
    title: Option<String>,
    text: String,
}

/// Parse one deck file's contents into passages
pub fn parse_deck(file_name: &str, json: &str) -> Result<Vec<Passage>> {
    let deck: SlideDeck = serde_json::from_str(json)
        .map_err(|e| RetrievalError::Corpus(format!("{}: {}", file_name, e)))?;

    let mut passages = Vec::with_capacity(deck.slides.len());
    for (i, slide) in deck.slides.into_iter().enumerate() {
        if slide.text.trim().is_empty() {
            debug!(file = file_name, page = slide.page_number, "Skipping blank slide");
            continue;
        }

        let mut passage = Passage::new(format!("{}#{}", file_name, i), slide.text)
            .with_meta(keys::COURSE, deck.course_name.as_str())
            .with_meta(keys::CHAPTER, deck.chapter_name.as_str())
            .with_meta(keys::PAGE, slide.page_number)
            .with_meta(keys::FILE, file_name);
        if let Some(title) = slide.title {
            passage = passage.with_meta(keys::TITLE, title);
        }
        passages.push(passage);
    }

    Ok(passages)
}

/// Load every `*.json` deck in `dir`
pub fn load_dir(dir: &Path) -> Result<Vec<Passage>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        RetrievalError::Corpus(format!("cannot read corpus directory {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut passages = Vec::new();
    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let contents = fs::read_to_string(path)?;
        passages.extend(parse_deck(&file_name, &contents)?);
    }

    if files.is_empty() {
        warn!(dir = %dir.display(), "Corpus directory has no JSON decks");
    }
    info!(passages = passages.len(), files = files.len(), "Loaded slide corpus");
    Ok(passages)
}
