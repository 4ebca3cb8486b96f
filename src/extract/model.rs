use std::sync::LazyLock;

use regex::Regex;

use super::keywords::phrase_body;

/// Canonical display name → aliases. A bare version ("gemini 3") maps to a
/// version-level name, never to a tier the text does not mention.
const MODEL_ALIASES: &[(&str, &[&str])] = &[
    ("Claude Opus 4.5", &["claude opus 4.5", "opus 4.5", "claude 4.5 opus"]),
    ("Claude Opus 4.1", &["claude opus 4.1", "opus 4.1", "claude 4.1 opus"]),
    ("Claude Sonnet 4.5", &["claude sonnet 4.5", "sonnet 4.5", "claude 4.5 sonnet"]),
    ("Claude Sonnet 4", &["claude sonnet 4", "sonnet 4", "claude 4 sonnet"]),
    ("Claude Haiku 4.5", &["claude haiku 4.5", "haiku 4.5"]),
    ("Claude", &["claude"]),
    ("GPT-5.1", &["gpt 5.1", "chatgpt 5.1", "5.1 thinking", "gpt 5.1 thinking"]),
    ("GPT-5", &["gpt 5", "chatgpt 5", "gpt 5 thinking"]),
    ("GPT-4o", &["gpt 4o", "chatgpt 4o"]),
    ("GPT-4", &["gpt 4"]),
    ("ChatGPT", &["chatgpt", "chat gpt", "gpt"]),
    ("Gemini 3 Pro", &["gemini 3 pro"]),
    ("Gemini 3 Flash", &["gemini 3 flash"]),
    ("Gemini 3", &["gemini 3"]),
    ("Gemini 2.5 Pro", &["gemini 2.5 pro"]),
    ("Gemini 2.5 Flash", &["gemini 2.5 flash"]),
    ("Gemini 2.5", &["gemini 2.5"]),
    ("Gemini", &["gemini", "bard"]),
    ("DeepSeek R1", &["deepseek r1"]),
    ("DeepSeek V3", &["deepseek v3", "deepseek v3.1", "deepseek v3.2"]),
    ("DeepSeek", &["deepseek", "deep seek"]),
    ("Llama", &["llama"]),
    ("Mistral", &["mistral", "mixtral", "le chat"]),
    ("Kimi K2", &["kimi k2"]),
    ("Kimi", &["kimi", "moonshot ai"]),
    ("Qwen", &["qwen"]),
    ("Grok", &["grok"]),
    ("Perplexity", &["perplexity ai", "perplexity pro", "perplexity.ai", "used perplexity"]),
    ("Copilot", &["copilot"]),
];

/// Only reported when nothing specific matches.
const GENERIC_ALIASES: &[(&str, &[&str])] = &[("LLM (unspecified)", &["llm", "language model"])];

struct ModelAlias {
    canonical: &'static str,
    /// Canonical name carries a version ("GPT-5", "Kimi K2"); outranks the bare family.
    versioned: bool,
    /// Alias ends in a digit, so "4" must not match the start of "4.1".
    ends_in_digit: bool,
    pattern: Regex,
}

impl ModelAlias {
    /// Length in chars of the longest acceptable match in `text`.
    fn longest_in(&self, text: &str) -> Option<usize> {
        self.pattern
            .find_iter(text)
            .filter(|m| !(self.ends_in_digit && continues_version(&text[m.end()..])))
            .map(|m| m.as_str().chars().count())
            .max()
    }
}

fn continues_version(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('.') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

static SPECIFIC: LazyLock<Vec<ModelAlias>> = LazyLock::new(|| compile(MODEL_ALIASES));
static GENERIC: LazyLock<Vec<ModelAlias>> = LazyLock::new(|| compile(GENERIC_ALIASES));

fn compile(table: &[(&'static str, &[&str])]) -> Vec<ModelAlias> {
    table
        .iter()
        .flat_map(|&(canonical, aliases)| {
            aliases.iter().map(move |alias| {
                let tail = if alias.ends_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
                let pattern = format!(r"(?i)\b{}{}", phrase_body(alias, r"[\s\-]*"), tail);
                ModelAlias {
                    canonical,
                    versioned: canonical.chars().any(|c| c.is_ascii_digit()),
                    ends_in_digit: alias.ends_with(|c: char| c.is_ascii_digit()),
                    pattern: Regex::new(&pattern).unwrap(),
                }
            })
        })
        .collect()
}

/// Canonical model name found anywhere in the title or document. Versioned
/// names beat bare families, then the longest alias match wins; ties keep
/// table order.
pub fn model_name(title: &str, document: &str) -> Option<String> {
    best_match(&SPECIFIC, title, document)
        .or_else(|| best_match(&GENERIC, title, document))
        .map(str::to_string)
}

fn best_match(aliases: &[ModelAlias], title: &str, document: &str) -> Option<&'static str> {
    let mut best: Option<((bool, usize), &'static str)> = None;
    for alias in aliases {
        let len = [title, document]
            .iter()
            .filter_map(|text| alias.longest_in(text))
            .max();
        if let Some(len) = len {
            let rank = (alias.versioned, len);
            if best.map_or(true, |(best_rank, _)| rank > best_rank) {
                best = Some((rank, alias.canonical));
            }
        }
    }
    best.map(|(_, name)| name)
}

/// Every canonical name the extractor can produce.
pub fn canonical_names() -> impl Iterator<Item = &'static str> {
    MODEL_ALIASES
        .iter()
        .chain(GENERIC_ALIASES)
        .map(|(name, _)| *name)
}

pub fn is_generic(name: &str) -> bool {
    GENERIC_ALIASES.iter().any(|(n, _)| *n == name)
}
