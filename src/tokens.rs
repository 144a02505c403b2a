use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

static EDGE_PUNCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\W_]+|[\W_]+$").expect("static pattern")
});

/// Lower-case a raw token and strip leading/trailing non-word characters.
pub fn clean_token(raw: &str) -> String {
    let lowered = raw.nfc().collect::<String>().to_lowercase();
    EDGE_PUNCT.replace_all(&lowered, "").into_owned()
}

/// True when a cleaned token is worth keeping as a vocabulary candidate.
pub fn is_content_token(tok: &str) -> bool {
    !tok.is_empty() && tok.chars().count() > 2 && !stopwords().contains(tok)
}

/// Whitespace-split, clean, filter and dedupe one text, keeping first-seen order.
pub fn row_tokens(text: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for raw in text.split_whitespace() {
        let t = clean_token(raw);
        if !is_content_token(&t) {
            continue;
        }
        if seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

/* ------------------------------ Stop words -------------------------------- */

pub fn stopwords() -> &'static HashSet<String> {
    static SET: Lazy<HashSet<String>> = Lazy::new(|| {
        let words = [
            // prepositions
            "a","ante","bajo","cabe","con","contra","de","del","desde","durante","en","entre",
            "hacia","hasta","mediante","para","por","según","sin","so","sobre","tras","versus","vía",
            // articles, possessives
            "el","la","los","las","un","una","unos","unas","lo","al","su","sus","mi","mis","tu","tus",
            "nuestro","nuestra","nuestros","nuestras","vuestro","vuestra","vuestros","vuestras",
            // pronouns
            "vosotros","vosotras","ellos","ellas","nosotros","nosotras","yo","tú","usted","ustedes",
            "él","ella","me","te","se","nos","os","les","le",
            // conjunctions, adverbs, auxiliaries
            "y","o","que","qué","como","cómo","porque","pero","si","ya","tan","muy","más","menos",
            "también","cuando","donde","dónde","ser","estar","haber",
        ];
        words.iter().map(|s| s.nfc().collect::<String>()).collect()
    });
    &SET
}
