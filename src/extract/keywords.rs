use regex::Regex;

/// A fixed list of case-insensitive keywords and phrases.
///
/// Entries match on word boundaries. A trailing `*` turns the entry into a
/// stem (`hallucinat*` matches "hallucinated"), and spaces or hyphens inside
/// an entry match either separator ("chain of thought" = "chain-of-thought").
pub struct KeywordSet {
    patterns: Vec<Regex>,
}

impl KeywordSet {
    pub fn new(words: &[&str]) -> Self {
        let patterns = words
            .iter()
            .map(|w| {
                let (stem, open) = match w.strip_suffix('*') {
                    Some(stem) => (stem, true),
                    None => (*w, false),
                };
                let tail = if open { r"\w*" } else { r"\b" };
                let pattern = format!(r"(?i)\b{}{}", phrase_body(stem, r"[\s\-]+"), tail);
                Regex::new(&pattern).unwrap_or_else(|e| panic!("bad keyword {:?}: {}", w, e))
            })
            .collect();
        KeywordSet { patterns }
    }

    /// Number of distinct entries present in `text`.
    pub fn distinct_hits(&self, text: &str) -> usize {
        self.patterns.iter().filter(|p| p.is_match(text)).count()
    }

    pub fn any(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Escape each token of `phrase` and join them with `separator`.
pub fn phrase_body(phrase: &str, separator: &str) -> String {
    phrase
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_words_only() {
        let set = KeywordSet::new(&["cot", "meta"]);
        assert_eq!(set.distinct_hits("I used CoT prompting"), 1);
        assert_eq!(set.distinct_hits("cotton metadata"), 0);
    }

    #[test]
    fn stems_and_separators() {
        let set = KeywordSet::new(&["hallucinat*", "chain of thought", "step by step"]);
        assert_eq!(set.distinct_hits("It hallucinated; chain-of-thought helped"), 2);
        assert!(set.any("went Step  by step"));
    }

    #[test]
    fn counts_distinct_entries_once() {
        let set = KeywordSet::new(&["error*"]);
        assert_eq!(set.distinct_hits("error errors ERROR"), 1);
    }
}
