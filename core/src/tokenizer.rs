use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    // `\b` is Unicode-aware, so "café" yields nothing rather than "caf".
    static ref RE: Regex = Regex::new(r"\b[a-z0-9]+\b").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","couldn",
            "d","did","didn","do","does","doesn","doing","don","down","during",
            "each","few","for","from","further",
            "had","hadn","has","hasn","have","haven","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","it","its","itself",
            "just","let","ll","m","me","more","most","mustn","my","myself",
            "no","nor","not","now","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "re","s","same","she","should","shouldn","so","some","such",
            "t","than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","we","were","weren","what","when","where","which","while","who","whom","why","will","with","won","would","wouldn",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into ordered terms: lowercase, `[a-z0-9]+` runs on word boundaries, stopwords removed.
///
/// The same function runs at index time and at query time.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !is_stopword(token))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        assert_eq!(tokenize("Rust 2024, Edition!"), vec!["rust", "2024", "edition"]);
    }

    #[test]
    fn empty_and_punctuation_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  --- ... !!! ").is_empty());
    }
}
