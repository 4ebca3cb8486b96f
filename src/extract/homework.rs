use std::sync::LazyLock;

use regex::Regex;

static HW_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hw|home[\s\-]?work)\s*(?:#|no\.?|number)?\s*[:\-]?\s*0*(\d{1,3})\b").unwrap()
});
static HW_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\bhome[\s\-]?work\s+({})\b",
        NUMBER_WORDS.join("|")
    ))
    .unwrap()
});

const NUMBER_WORDS: [&str; 21] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen", "twenty",
];

/// Canonical `HW<N>` label, first match in the title, then in the document.
pub fn homework_id(title: &str, document: &str) -> Option<String> {
    [title, document]
        .iter()
        .find_map(|text| first_match(text))
        .map(|n| format!("HW{}", n))
}

fn first_match(text: &str) -> Option<u32> {
    let digits = HW_NUMBER_RE
        .captures(text)
        .and_then(|c| Some((c.get(0)?.start(), c[1].parse::<u32>().ok()?)));
    let word = HW_WORD_RE.captures(text).and_then(|c| {
        let idx = NUMBER_WORDS
            .iter()
            .position(|w| w.eq_ignore_ascii_case(&c[1]))?;
        Some((c.get(0)?.start(), idx as u32))
    });

    match (digits, word) {
        (Some(d), Some(w)) => Some(if w.0 < d.0 { w.1 } else { d.1 }),
        (d, w) => d.or(w).map(|(_, n)| n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_label() {
        assert_eq!(
            homework_id("", "...this was for HW7 and the model...").as_deref(),
            Some("HW7")
        );
    }

    #[test]
    fn variants_normalize() {
        for (text, want) in [
            ("Homework 3 writeup", "HW3"),
            ("hw 10 with Claude", "HW10"),
            ("HW07", "HW7"),
            ("homework #5", "HW5"),
            ("Home-work: 2", "HW2"),
            ("HW0 warmup", "HW0"),
            ("Homework Seven review", "HW7"),
        ] {
            assert_eq!(homework_id(text, "").as_deref(), Some(want), "{}", text);
        }
    }

    #[test]
    fn title_wins_over_document() {
        assert_eq!(homework_id("HW4 notes", "also looked at HW5").as_deref(), Some("HW4"));
    }

    #[test]
    fn earliest_form_in_text_wins() {
        assert_eq!(homework_id("", "Homework two, unlike hw 9").as_deref(), Some("HW2"));
        assert_eq!(homework_id("", "hw 9, unlike Homework two").as_deref(), Some("HW9"));
    }

    #[test]
    fn no_weak_guesses() {
        assert_eq!(homework_id("Problem 3 on the midterm", "show 5 steps"), None);
        assert_eq!(homework_id("", "homeworks are hard"), None);
        assert_eq!(homework_id("", ""), None);
    }

    #[test]
    fn label_has_trailing_digits() {
        let id = homework_id("HW12", "").unwrap();
        let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(digits.parse::<u32>().unwrap(), 12);
    }
}
