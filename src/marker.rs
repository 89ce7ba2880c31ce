//! Line grammar shared by the indexer, the stabilizer and the toggler.
//!
//! A todo line is a markdown checkbox item (`- [ ] text`, `- [x] text`, `- [X] text`)
//! whose text is non-empty once identity markers are removed. An identity marker is
//! the comment token `<!--todo:{id}-->` binding the line to a durable todo.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

static TODO_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*-\s*\[)( |x|X)(\])(\s+)(.+?)\s*$").unwrap());

static CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*-\s*\[)( |x|X)(\])").unwrap());

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!--todo:([a-f0-9-]{8,})-->").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A checkbox line that qualifies as a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoLine {
    pub checked: bool,
    /// Text with every marker removed, trimmed. Never empty.
    pub title: String,
    /// Ids of all markers on the line, in order, lowercased.
    pub marker_ids: Vec<String>,
}

impl TodoLine {
    /// The id of the first marker on the line, if any.
    pub fn marker_id(&self) -> Option<&str> {
        self.marker_ids.first().map(String::as_str)
    }

    /// Title key used to match lines across saves.
    pub fn title_key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Parse a single line as a todo line.
///
/// Returns `None` for anything that is not a checkbox item, and for checkbox items
/// whose text is blank or consists only of markers.
pub fn parse_todo_line(line: &str) -> Option<TodoLine> {
    let caps = TODO_LINE_RE.captures(line)?;
    let raw_text = caps.get(5).map(|m| m.as_str()).unwrap_or("");

    let title = strip_markers(raw_text).trim().to_string();
    if title.is_empty() {
        return None;
    }

    Some(TodoLine {
        checked: caps[2].eq_ignore_ascii_case("x"),
        title,
        marker_ids: marker_ids(line),
    })
}

/// All marker ids on a line, lowercased, in order of appearance.
pub fn marker_ids(line: &str) -> Vec<String> {
    MARKER_RE
        .captures_iter(line)
        .map(|caps| caps[1].to_ascii_lowercase())
        .collect()
}

/// Ids of every marked todo line in a document.
pub fn marked_todo_ids(markdown: &str) -> HashSet<String> {
    markdown
        .split('\n')
        .filter_map(parse_todo_line)
        .filter_map(|t| t.marker_id().map(str::to_string))
        .collect()
}

/// Remove every marker occurrence from `text`.
pub fn strip_markers(text: &str) -> String {
    MARKER_RE.replace_all(text, "").into_owned()
}

/// Canonical marker token for an id (always lowercase).
pub fn marker(id: &str) -> String {
    format!("<!--todo:{}-->", id.to_ascii_lowercase())
}

/// Trim, collapse internal whitespace, case-fold.
pub fn normalize_title(title: &str) -> String {
    WHITESPACE_RE
        .replace_all(title.trim(), " ")
        .to_lowercase()
}

/// Mint a fresh todo id (random UUID, hyphenated lowercase hex).
pub fn new_todo_id() -> String {
    Uuid::new_v4().to_string()
}

/// True if the line carries exactly one marker, it is `id` in lowercase, and it ends
/// the line.
pub fn has_canonical_marker(line: &str, marker_ids: &[String], id: &str) -> bool {
    if marker_ids.len() != 1 || !marker_ids[0].eq_ignore_ascii_case(id) {
        return false;
    }

    let token = marker(id);
    let trimmed = line.trim_end();
    trimmed
        .len()
        .checked_sub(token.len())
        .and_then(|start| trimmed.get(start..))
        .is_some_and(|tail| tail == token)
}

/// Rebuild a line with a single canonical marker at its end.
pub fn with_marker(line: &str, id: &str) -> String {
    let stripped = strip_markers(line);
    format!("{} {}", stripped.trim_end(), marker(id))
}

/// Replace the leading checkbox token of a line.
///
/// Returns `None` when the line does not start with a checkbox.
pub fn set_checkbox(line: &str, checked: bool) -> Option<String> {
    let caps = CHECKBOX_RE.captures(line)?;
    let end = caps.get(0)?.end();
    let state = if checked { "x" } else { " " };
    Some(format!("{}{}{}{}", &caps[1], state, &caps[3], &line[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "aaaaaaaa-1111-4a11-8a11-111111111111";

    #[test]
    fn test_parse_todo_line_states() {
        let cases = vec![
            ("- [ ] Buy milk", Some((false, "Buy milk"))),
            ("- [x] Buy milk", Some((true, "Buy milk"))),
            ("- [X] Buy milk", Some((true, "Buy milk"))),
            ("  -[ ]  indented and tight  ", Some((false, "indented and tight"))),
            ("- [ ]", None),
            ("- [ ]    ", None),
            ("- [ ]Buy milk", None), // whitespace after ] is required
            ("- [y] Buy milk", None),
            ("* [ ] Buy milk", None),
            ("Buy milk", None),
        ];

        for (line, want) in cases {
            let got = parse_todo_line(line).map(|t| (t.checked, t.title));
            let want = want.map(|(c, t)| (c, t.to_string()));
            assert_eq!(got, want, "parse_todo_line({:?})", line);
        }
    }

    #[test]
    fn test_marker_only_line_is_not_a_todo() {
        let line = format!("- [ ] <!--todo:{}-->", ID);
        assert_eq!(parse_todo_line(&line), None);
    }

    #[test]
    fn test_marker_extraction_is_case_insensitive() {
        let line = "- [ ] Call <!--TODO:DEADBEEF-0000-->";
        let t = parse_todo_line(line).expect("todo line");
        assert_eq!(t.title, "Call");
        assert_eq!(t.marker_id(), Some("deadbeef-0000"));
    }

    #[test]
    fn test_short_marker_is_plain_text() {
        // Fewer than 8 id characters is not a marker
        let t = parse_todo_line("- [ ] Call <!--todo:abc-->").expect("todo line");
        assert!(t.marker_ids.is_empty());
        assert_eq!(t.title, "Call <!--todo:abc-->");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Buy   Milk\t"), "buy milk");
        assert_eq!(normalize_title("Follow up"), normalize_title("follow  UP"));
    }

    #[test]
    fn test_new_todo_id_matches_marker_grammar() {
        let id = new_todo_id();
        let line = format!("- [ ] x {}", marker(&id));
        assert_eq!(parse_todo_line(&line).unwrap().marker_id(), Some(id.as_str()));
        assert_ne!(new_todo_id(), id);
    }

    #[test]
    fn test_has_canonical_marker() {
        let line = format!("- [ ] Buy milk {}", marker(ID));
        let ids = marker_ids(&line);
        assert!(has_canonical_marker(&line, &ids, ID));
        assert!(has_canonical_marker(&format!("{}  ", line), &ids, ID));

        let mid = format!("- [ ] Buy {} milk", marker(ID));
        assert!(!has_canonical_marker(&mid, &marker_ids(&mid), ID));

        let twice = format!("{} {}", line, marker(ID));
        assert!(!has_canonical_marker(&twice, &marker_ids(&twice), ID));

        let upper = format!("- [ ] Buy milk <!--TODO:{}-->", ID.to_ascii_uppercase());
        assert!(
            !has_canonical_marker(&upper, &marker_ids(&upper), ID),
            "uppercase markers are rewritten to the lowercase form"
        );
    }

    #[test]
    fn test_with_marker_collapses_markers() {
        let line = format!("- [ ] Buy {} milk {}   ", marker("bbbbbbbb"), marker("cccccccc"));
        assert_eq!(
            with_marker(&line, ID),
            format!("- [ ] Buy  milk {}", marker(ID))
        );
    }

    #[test]
    fn test_set_checkbox() {
        assert_eq!(
            set_checkbox("  - [ ] a [ ] b", true).as_deref(),
            Some("  - [x] a [ ] b")
        );
        assert_eq!(set_checkbox("- [X] a", false).as_deref(), Some("- [ ] a"));
        assert_eq!(set_checkbox("text - [ ] a", true), None);
    }

    #[test]
    fn test_marked_todo_ids() {
        let md = format!(
            "- [ ] a {}\n- [ ] b\nplain {}\n",
            marker(ID),
            marker("bbbbbbbb")
        );
        let ids = marked_todo_ids(&md);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(ID));
    }
}
