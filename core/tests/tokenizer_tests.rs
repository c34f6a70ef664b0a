use search_core::tokenizer::{is_stopword, tokenize};

#[test]
fn it_lowercases_and_strips_punctuation() {
    let words = tokenize("Hello, WORLD! C3PO-r2d2 ...");
    assert_eq!(words, vec!["hello", "world", "c3po", "r2d2"]);
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert_eq!(words, vec!["quick", "brown", "fox", "lazy", "dog"]);
    assert!(is_stopword("the"));
    assert!(!is_stopword("fox"));
}

#[test]
fn contractions_leave_no_fragments() {
    assert_eq!(tokenize("Don't panic, it's fine"), vec!["panic", "fine"]);
}

#[test]
fn non_ascii_words_are_dropped() {
    // "café" is a single word, so the ascii prefix is not a term on its own
    assert_eq!(tokenize("café menu"), vec!["menu"]);
}

#[test]
fn order_and_repeats_are_preserved() {
    assert_eq!(tokenize("rust go rust"), vec!["rust", "go", "rust"]);
}
