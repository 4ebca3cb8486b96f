use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use tracing::debug;

use crate::models::FileRef;

static ATTACHMENT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*📎\s*([^\]\n]+?)\s*\]").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][\w:-]*)((?:\s[^<>]*?)?)(/?)\s*>").unwrap());
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*"([^"]*)""#).unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap());

/// Elements whose end starts a new line in the plain text.
const BLOCK_TAGS: &[&str] = &[
    "paragraph", "p", "div", "heading", "h1", "h2", "h3", "h4", "h5", "h6",
    "list-item", "li", "list", "ul", "ol", "pre", "snippet", "blockquote",
    "callout", "figure", "tr", "table",
];
const LINE_BREAK_TAGS: &[&str] = &["br", "break"];
const FILE_TAG: &str = "file";

/// Plain text of a post plus the attachment markers found while stripping.
#[derive(Debug, Clone, PartialEq)]
pub struct Stripped {
    pub text: String,
    pub file_refs: Vec<FileRef>,
}

/// Strip forum XML/HTML down to plain text.
///
/// Block elements end in a newline, inline whitespace collapses to one space,
/// and entities are decoded. `<file>` elements and rendered `[📎 name]` tokens
/// are removed from the text and recorded with their character offset.
pub fn strip_markup(content: &str) -> Stripped {
    if !content.contains('<') {
        return lines(content, true);
    }
    let content = escape_stray_lt(content);
    match strip_xml(&content) {
        Ok(stripped) => stripped,
        Err(e) => {
            debug!(error = %e, "markup is not well-formed, falling back to tag scan");
            strip_tags(&content)
        }
    }
}

/// Treat input as already-plain text: lines are kept, blank lines separate paragraphs.
pub fn plain_text(text: &str) -> Stripped {
    lines(text, false)
}

fn lines(text: &str, decode: bool) -> Stripped {
    let mut doc = DocumentBuilder::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            doc.paragraph_break();
        } else if decode {
            doc.push_inline(&decode_entities(line));
            doc.line_break();
        } else {
            doc.push_inline(line);
            doc.line_break();
        }
    }
    doc.finish()
}

/// A `<` that cannot open a tag ("5 < 6") is text, not markup.
fn escape_stray_lt(content: &str) -> Cow<'_, str> {
    let opens_tag = |rest: &str| {
        rest.chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
    };
    let stray = content
        .match_indices('<')
        .any(|(i, _)| !opens_tag(&content[i + 1..]));
    if !stray {
        return Cow::Borrowed(content);
    }

    let mut out = String::with_capacity(content.len() + 8);
    for (i, c) in content.char_indices() {
        if c == '<' && !opens_tag(&content[i + 1..]) {
            out.push_str("&lt;");
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn strip_xml(content: &str) -> Result<Stripped, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().check_end_names = false;

    let mut doc = DocumentBuilder::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = tag_name(&e);
                if is_one_of(&name, LINE_BREAK_TAGS) {
                    doc.line_break();
                } else if name.eq_ignore_ascii_case(FILE_TAG) {
                    record_file_element(&e, &mut doc);
                }
            }
            Event::Empty(e) => {
                let name = tag_name(&e);
                if name.eq_ignore_ascii_case(FILE_TAG) {
                    record_file_element(&e, &mut doc);
                } else if is_one_of(&name, LINE_BREAK_TAGS) || is_one_of(&name, BLOCK_TAGS) {
                    doc.line_break();
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if is_one_of(&name, BLOCK_TAGS) {
                    doc.line_break();
                }
            }
            Event::Text(t) => {
                let raw = String::from_utf8_lossy(&t);
                doc.push_inline(&decode_entities(&raw));
            }
            Event::CData(c) => {
                doc.push_inline(&String::from_utf8_lossy(&c));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(doc.finish())
}

/// Regex tag scan for markup quick-xml rejects (stray `<`, mismatched quoting).
fn strip_tags(content: &str) -> Stripped {
    let mut doc = DocumentBuilder::default();
    let mut last = 0;
    for caps in TAG_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        doc.push_inline(&decode_entities(&content[last..whole.start()]));
        last = whole.end();

        let closing = !caps[1].is_empty();
        let name = &caps[2];
        if !closing && name.eq_ignore_ascii_case(FILE_TAG) {
            let attrs: Vec<(String, String)> = ATTR_RE
                .captures_iter(&caps[3])
                .map(|a| (a[1].to_ascii_lowercase(), decode_entities(&a[2]).into_owned()))
                .collect();
            let get = |key: &str| attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
            if let Some(filename) = get("filename") {
                doc.attach(&filename, get("url"));
            }
        } else if is_one_of(name, LINE_BREAK_TAGS)
            || (is_one_of(name, BLOCK_TAGS) && (closing || !caps[4].is_empty()))
        {
            doc.line_break();
        }
    }
    doc.push_inline(&decode_entities(&content[last..]));
    doc.finish()
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn is_one_of(name: &str, tags: &[&str]) -> bool {
    tags.iter().any(|t| t.eq_ignore_ascii_case(name))
}

fn attribute(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref().eq_ignore_ascii_case(key.as_bytes()))
        .map(|a| decode_entities(&String::from_utf8_lossy(&a.value)).into_owned())
}

fn record_file_element(e: &BytesStart, doc: &mut DocumentBuilder) {
    match attribute(e, "filename") {
        Some(filename) => doc.attach(&filename, attribute(e, "url")),
        None => debug!("file element without filename attribute"),
    }
}

/// Decode each entity reference on its own; unknown names and bare `&` stay as written.
fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    ENTITY_RE.replace_all(raw, |caps: &Captures| {
        let name = &caps[1];
        let decoded = match name.strip_prefix('#') {
            Some(num) => {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse().ok(),
                };
                code.and_then(char::from_u32).map(String::from)
            }
            None => resolve_entity(name).map(String::from),
        };
        decoded.unwrap_or_else(|| caps[0].to_string())
    })
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    resolve_predefined_entity(name).or(match name {
        "nbsp" => Some(" "),
        "ndash" => Some("–"),
        "mdash" => Some("—"),
        "hellip" => Some("…"),
        "lsquo" => Some("‘"),
        "rsquo" => Some("’"),
        "ldquo" => Some("“"),
        "rdquo" => Some("”"),
        "times" => Some("×"),
        "copy" => Some("©"),
        _ => None,
    })
}

/// Accumulates plain text while tracking its length in chars, so that
/// attachment offsets are exact even with multi-byte text.
#[derive(Debug, Default)]
struct DocumentBuilder {
    text: String,
    chars: usize,
    pending_space: bool,
    pending_newlines: usize,
    refs: Vec<FileRef>,
}

impl DocumentBuilder {
    fn push_inline(&mut self, s: &str) {
        let mut last = 0;
        for caps in ATTACHMENT_MARKER_RE.captures_iter(s) {
            let Some(whole) = caps.get(0) else { continue };
            self.push_words(&s[last..whole.start()]);
            self.attach(&caps[1], None);
            last = whole.end();
        }
        self.push_words(&s[last..]);
    }

    fn push_words(&mut self, s: &str) {
        for c in s.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
            } else {
                self.flush();
                self.text.push(c);
                self.chars += 1;
            }
        }
    }

    fn line_break(&mut self) {
        self.pending_newlines = self.pending_newlines.max(1);
    }

    fn paragraph_break(&mut self) {
        self.pending_newlines = self.pending_newlines.max(2);
    }

    fn attach(&mut self, filename: &str, url: Option<String>) {
        let filename = filename.trim();
        if filename.is_empty() {
            return;
        }
        self.flush();
        self.refs.push(FileRef::inline(filename, self.chars, url));
    }

    /// Emit pending whitespace, but never at the start of the text or twice in a row.
    fn flush(&mut self) {
        if !self.text.is_empty() {
            if self.pending_newlines > 0 {
                while self.text.ends_with(' ') {
                    self.text.pop();
                    self.chars -= 1;
                }
                for _ in 0..self.pending_newlines {
                    self.text.push('\n');
                }
                self.chars += self.pending_newlines;
            } else if self.pending_space && !self.text.ends_with([' ', '\n']) {
                self.text.push(' ');
                self.chars += 1;
            }
        }
        self.pending_space = false;
        self.pending_newlines = 0;
    }

    fn finish(mut self) -> Stripped {
        while self.text.ends_with(char::is_whitespace) {
            self.text.pop();
            self.chars -= 1;
        }
        for r in &mut self.refs {
            r.position = r.position.min(self.chars);
        }
        Stripped {
            text: self.text,
            file_refs: self.refs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_index(haystack: &str, needle: &str) -> usize {
        let byte = haystack.find(needle).unwrap();
        haystack[..byte].chars().count()
    }

    #[test]
    fn paragraphs_become_lines() {
        let s = strip_markup(
            r#"<document version="2.0"><paragraph>First  part</paragraph>
<paragraph>Second <bold>bold</bold> part</paragraph></document>"#,
        );
        assert_eq!(s.text, "First part\nSecond bold part");
        assert!(s.file_refs.is_empty());
    }

    #[test]
    fn entities_are_decoded() {
        let s = strip_markup("<document><paragraph>A &amp; B &lt;3 &nbsp;x&#33;</paragraph></document>");
        assert_eq!(s.text, "A & B <3 x!");
    }

    #[test]
    fn rendered_marker_offset() {
        let s = strip_markup("See [📎 report.pdf] for details");
        assert_eq!(s.text, "See for details");
        assert_eq!(s.file_refs.len(), 1);
        assert_eq!(s.file_refs[0].filename, "report.pdf");
        assert_eq!(s.file_refs[0].position, 4);
        assert!(s.file_refs[0].inline);
    }

    #[test]
    fn file_element_offset_in_stripped_text() {
        let s = strip_markup(
            r#"<document><paragraph>Intro text</paragraph><file url="https://static.example/x" filename="hw3 log.pdf"/><paragraph>After the file</paragraph></document>"#,
        );
        assert_eq!(s.text, "Intro text\nAfter the file");
        let r = &s.file_refs[0];
        assert_eq!(r.filename, "hw3 log.pdf");
        assert_eq!(r.url.as_deref(), Some("https://static.example/x"));
        assert_eq!(r.position, char_index(&s.text, "After"));
    }

    #[test]
    fn shared_position_keeps_source_order() {
        let s = strip_markup(
            r#"<document><paragraph>Logs:<file url="u1" filename="a.pdf"/><file url="u2" filename="b.pdf"/></paragraph></document>"#,
        );
        let names: Vec<&str> = s.file_refs.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
        assert_eq!(s.file_refs[0].position, s.file_refs[1].position);
        assert_eq!(s.file_refs[0].position, s.text.chars().count());
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        let s = strip_markup("Résumé — see [📎 notes.txt] now");
        let r = &s.file_refs[0];
        assert_eq!(r.position, char_index(&s.text, "now"));
        assert!(r.position <= s.text.chars().count());
    }

    #[test]
    fn trailing_marker_clamped_to_length() {
        let s = strip_markup("Attached: [📎 out.ipynb]   ");
        assert_eq!(s.text, "Attached:");
        assert_eq!(s.file_refs[0].position, s.text.chars().count());
    }

    #[test]
    fn malformed_markup_falls_back() {
        let s = strip_markup(r#"<p>a < b and <b>c</p><p>next<file filename="z.png" url="q"></p>"#);
        assert_eq!(s.text, "a < b and c\nnext");
        assert_eq!(s.file_refs.len(), 1);
        assert_eq!(s.file_refs[0].filename, "z.png");
        assert_eq!(s.file_refs[0].position, s.text.chars().count());
    }

    #[test]
    fn stray_less_than_is_text() {
        assert_eq!(strip_markup("<p>5 < 6 is true</p>").text, "5 < 6 is true");
        assert_eq!(strip_markup("<p>a < b and <b>c</b> done</p>").text, "a < b and c done");
        assert_eq!(strip_markup("<p>x <3 y</p>").text, "x <3 y");
    }

    #[test]
    fn tag_scan_keeps_comparisons() {
        assert_eq!(strip_tags("<p>5 < 6 is true</p>").text, "5 < 6 is true");
        assert_eq!(strip_tags("<p>a <= b</p><p>c</p>").text, "a <= b\nc");
    }

    #[test]
    fn entities_without_markup() {
        assert_eq!(strip_markup("A &amp; B &lt;3").text, "A & B <3");
        assert_eq!(plain_text("A &amp; B").text, "A &amp; B");
    }

    #[test]
    fn bare_ampersand_does_not_block_decoding() {
        assert_eq!(strip_markup("<p>Tom & Jerry &amp; co</p>").text, "Tom & Jerry & co");
        assert_eq!(strip_markup("<p>R&D &bogus; &#x41;&#66;</p>").text, "R&D &bogus; AB");
    }

    #[test]
    fn html_line_breaks() {
        let s = strip_markup("<div>one<br/>two</div><div>three</div>");
        assert_eq!(s.text, "one\ntwo\nthree");
    }

    #[test]
    fn plain_text_keeps_paragraphs() {
        let s = plain_text("line one\nline two\n\n\nnext para  here\n");
        assert_eq!(s.text, "line one\nline two\n\nnext para here");
    }

    #[test]
    fn empty_input() {
        assert_eq!(strip_markup("").text, "");
        assert_eq!(strip_markup("<document></document>").text, "");
    }
}
