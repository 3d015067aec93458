//! Loading slide decks from disk and serving them from the in-memory index

mod common;

use std::fs;
use std::sync::Arc;

use slidescout::corpus;
use slidescout::rag::{CandidateRetriever, Reranker, RetrievalPipeline};
use slidescout::types::MetadataValue;
use slidescout::vector_db::{InMemoryIndex, VectorIndex};
use slidescout::{RetrievalError, RetrievalService, SlideTool};

use common::{logit, TableCrossEncoder, TableEmbedder};

const PARSING_DECK: &str = r#"{
    "course_name": "Compilers",
    "chapter_name": "Parsing",
    "slides": [
        {"page_number": 4, "title": "LL(1)", "text": "LL parsers read left to right."},
        {"page_number": 5, "title": "LR", "text": "LR parsers build rightmost derivations."}
    ]
}"#;

const LEXING_DECK: &str = r#"{
    "course_name": "Compilers",
    "chapter_name": "Lexing",
    "slides": [
        {"page_number": 1, "text": "A lexer turns characters into tokens."},
        {"page_number": 2, "text": ""}
    ]
}"#;

fn write_corpus() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("parsing.json"), PARSING_DECK).unwrap();
    fs::write(dir.path().join("lexing.json"), LEXING_DECK).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a deck").unwrap();
    dir
}

#[test]
fn test_load_dir_reads_decks_in_name_order() {
    let dir = write_corpus();
    let passages = corpus::load_dir(dir.path()).unwrap();

    let ids: Vec<&str> = passages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["lexing.json#0", "parsing.json#0", "parsing.json#1"]);

    assert_eq!(passages[1].meta("page"), Some(&MetadataValue::Int(4)));
    assert_eq!(passages[1].meta("title"), Some(&MetadataValue::from("LL(1)")));
    assert!(passages[0].meta("title").is_none());
}

#[test]
fn test_load_dir_rejects_malformed_deck() {
    let dir = write_corpus();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let err = corpus::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, RetrievalError::Corpus(_)));
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn test_load_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    let passages = corpus::load_dir(dir.path()).unwrap();
    assert!(passages.is_empty());
}

#[tokio::test]
async fn test_loaded_corpus_answers_through_the_tool() {
    let dir = write_corpus();
    let passages = corpus::load_dir(dir.path()).unwrap();

    let embedder = Arc::new(TableEmbedder::new(&[
        ("A lexer turns characters into tokens.", vec![0.0, 1.0]),
        ("LL parsers read left to right.", vec![1.0, 0.2]),
        ("LR parsers build rightmost derivations.", vec![1.0, 0.1]),
        ("how do parsers work", vec![1.0, 0.0]),
    ]));
    let index = Arc::new(InMemoryIndex::build(embedder.as_ref(), passages).await.unwrap());
    assert_eq!(index.len().await.unwrap(), 3);

    let encoder = Arc::new(TableCrossEncoder::new(&[
        ("LL parsers read left to right.", logit(0.3)),
        ("LR parsers build rightmost derivations.", logit(0.8)),
        ("A lexer turns characters into tokens.", logit(0.1)),
    ]));
    let pipeline = RetrievalPipeline::new(
        CandidateRetriever::new(embedder, index),
        Reranker::new(encoder),
    );
    let service = Arc::new(RetrievalService::ready(pipeline));
    let tool = SlideTool::new(
        service,
        slidescout::rag::RetrievalParams { initial_k: 2, final_n: 2 },
    );

    let text = tool.call("how do parsers work").await.unwrap();
    assert_eq!(
        text,
        "Retrieved slides:\n\
         - Compilers (Parsing, Page 5): LR parsers build rightmost derivations.\n\
         - Compilers (Parsing, Page 4): LL parsers read left to right."
    );
}
