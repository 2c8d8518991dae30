use super::estimate_token_count as estimate_token_count_impl;
use super::split_keeping_separator as split_keeping_separator_impl;
use super::*;

fn small_config() -> ChunkingConfig {
    ChunkingConfig {
        chunk_size: 100,
        chunk_overlap: 20,
        ..ChunkingConfig::default()
    }
}

/// Ten 19-character words separated by single spaces
fn ten_words() -> String {
    (0..10)
        .map(|i| format!("word{:015}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn page(source: &str, page: u32, text: &str) -> PageText {
    PageText {
        source: source.to_string(),
        page,
        text: text.to_string(),
    }
}

#[test]
fn estimate_token_count() {
    assert_eq!(estimate_token_count_impl("hello world"), 2);
    assert_eq!(estimate_token_count_impl("This is a test."), 5);
    assert_eq!(estimate_token_count_impl(""), 0);
}

#[test]
fn default_constants() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.chunk_overlap, 200);
    assert_eq!(config.separators, vec!["\n\n", "\n", " ", ""]);
}

#[test]
fn short_text_is_single_trimmed_chunk() {
    let chunks = split_text("  A short paragraph.\n", &ChunkingConfig::default());
    assert_eq!(chunks, vec!["A short paragraph.".to_string()]);
}

#[test]
fn blank_text_yields_no_chunks() {
    assert!(split_text("", &ChunkingConfig::default()).is_empty());
    assert!(split_text(" \n\n \n", &ChunkingConfig::default()).is_empty());
}

#[test]
fn word_split_is_deterministic_with_overlap() {
    let text = ten_words();
    let chunks = split_text(&text, &small_config());

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].chars().count(), 99);
    assert!(chunks[1].starts_with("word000000000000004"));
    assert!(chunks[0].ends_with("word000000000000004"));
    assert!(chunks[2].starts_with("word000000000000008"));
    assert!(chunks[2].ends_with("word000000000000009"));

    // Same input, same output
    assert_eq!(split_text(&text, &small_config()), chunks);
}

#[test]
fn unbroken_text_falls_back_to_characters() {
    let text = "x".repeat(250);
    let chunks = split_text(&text, &small_config());

    let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
    assert_eq!(lengths, vec![100, 100, 90]);
}

#[test]
fn chunks_never_exceed_chunk_size() {
    let paragraph = "Retrieval augmented generation combines search with language models. ";
    let text = (0..40)
        .map(|i| format!("{}{}", paragraph.repeat(i % 5 + 1), i))
        .collect::<Vec<_>>()
        .join("\n\n");
    let config = ChunkingConfig::default();

    let chunks = split_text(&text, &config);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= config.chunk_size);
        assert_eq!(chunk.trim(), chunk);
    }
}

#[test]
fn multibyte_text_is_measured_in_characters() {
    let text = "é".repeat(150);
    let chunks = split_text(&text, &small_config());

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chars().count(), 100);
    assert_eq!(chunks[1].chars().count(), 70);
}

#[test]
fn separator_stays_with_following_piece() {
    let pieces = split_keeping_separator_impl("one\n\ntwo\n\nthree", "\n\n");
    assert_eq!(pieces, vec!["one", "\n\ntwo", "\n\nthree"]);

    let pieces = split_keeping_separator_impl("\n\n\nlead", "\n\n");
    assert_eq!(pieces, vec!["\n\n\nlead"]);
}

#[test]
fn chunk_pages_tags_source_and_page() {
    let pages = vec![
        page("manual.pdf", 1, "First page text."),
        page("manual.pdf", 2, &ten_words()),
        page("guide.pdf", 1, "   "),
    ];

    let chunks = chunk_pages(&pages, &small_config());

    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks[0].page, 1);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].content, "First page text.");
    assert!(chunks[0].token_count > 0);

    let second_page: Vec<_> = chunks.iter().filter(|c| c.page == 2).collect();
    assert_eq!(second_page.len(), 3);
    assert_eq!(
        second_page.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(chunks.iter().all(|c| c.source == "manual.pdf"));
}
