//! Markdown indexer.
//!
//! Lines are classified into tagged records, then folded through a small state
//! machine (`Idle` / `InTopic`) that emits todos and topic entries and renders the
//! output text. Todo lines without a marker get a freshly minted one appended.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::marker::{self, TodoLine};
use crate::model::TodoStatus;

static RULE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*-{3,}\s*$").unwrap());

static TOPIC_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*###\s+(\S.*?)\s*$").unwrap());

static SECTION_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#{1,2}\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTodo {
    pub id: String,
    pub title: String,
    pub status: TodoStatus,
    pub topic_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTopicEntry {
    pub topic_name: String,
    pub content_markdown: String,
}

/// Result of indexing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    /// Input text with markers appended to unmarked todo lines.
    pub markdown: String,
    pub todos: Vec<ParsedTodo>,
    pub topic_entries: Vec<ParsedTopicEntry>,
}

#[derive(Debug)]
enum LineKind {
    Plain,
    /// `### name` opens a topic; a blank name is a plain line
    TopicHeading(String),
    /// `#`/`##` heading closes the open topic
    SectionHeading,
    /// `---` (three or more) closes the open topic
    Rule,
    Todo(TodoLine),
}

fn classify(line: &str) -> LineKind {
    if RULE_RE.is_match(line) {
        return LineKind::Rule;
    }
    if let Some(caps) = TOPIC_HEADING_RE.captures(line) {
        return LineKind::TopicHeading(caps[1].trim().to_string());
    }
    if SECTION_HEADING_RE.is_match(line) {
        return LineKind::SectionHeading;
    }
    match marker::parse_todo_line(line) {
        Some(todo) => LineKind::Todo(todo),
        None => LineKind::Plain,
    }
}

enum Section {
    Idle,
    InTopic { name: String, body: Vec<String> },
}

impl Section {
    fn topic_name(&self) -> Option<&str> {
        match self {
            Section::Idle => None,
            Section::InTopic { name, .. } => Some(name),
        }
    }
}

struct Fold {
    lines: Vec<String>,
    todos: Vec<ParsedTodo>,
    topic_entries: Vec<ParsedTopicEntry>,
    section: Section,
}

impl Fold {
    fn new() -> Self {
        Fold {
            lines: Vec::new(),
            todos: Vec::new(),
            topic_entries: Vec::new(),
            section: Section::Idle,
        }
    }

    fn step(mut self, (raw, kind): (&str, LineKind)) -> Self {
        let rendered = match kind {
            LineKind::Rule | LineKind::SectionHeading => {
                self.close_topic();
                raw.to_string()
            }
            LineKind::TopicHeading(name) => {
                self.close_topic();
                self.section = Section::InTopic {
                    name,
                    body: Vec::new(),
                };
                raw.to_string()
            }
            LineKind::Todo(todo) => {
                let (id, rendered) = match todo.marker_id() {
                    Some(id) => (id.to_string(), raw.to_string()),
                    None => {
                        // Trailing whitespace is dropped so the marker stays canonical
                        let id = marker::new_todo_id();
                        let rendered = format!("{} {}", raw.trim_end(), marker::marker(&id));
                        (id, rendered)
                    }
                };
                self.todos.push(ParsedTodo {
                    id,
                    title: todo.title,
                    status: TodoStatus::from_checked(todo.checked),
                    topic_name: self.section.topic_name().map(str::to_string),
                });
                self.push_body(&rendered);
                rendered
            }
            LineKind::Plain => {
                self.push_body(raw);
                raw.to_string()
            }
        };
        self.lines.push(rendered);
        self
    }

    fn push_body(&mut self, line: &str) {
        if let Section::InTopic { body, .. } = &mut self.section {
            body.push(line.to_string());
        }
    }

    fn close_topic(&mut self) {
        if let Section::InTopic { name, body } = std::mem::replace(&mut self.section, Section::Idle)
        {
            let content = body.join("\n");
            let content = content.trim();
            if !content.is_empty() {
                self.topic_entries.push(ParsedTopicEntry {
                    topic_name: name,
                    content_markdown: content.to_string(),
                });
            }
        }
    }

    fn finish(mut self) -> IndexedDocument {
        self.close_topic();
        IndexedDocument {
            markdown: self.lines.join("\n"),
            todos: self.todos,
            topic_entries: self.topic_entries,
        }
    }
}

/// Index a (marker-stable) markdown document.
pub fn index_markdown(markdown: &str) -> IndexedDocument {
    markdown
        .split('\n')
        .map(|line| (line, classify(line)))
        .fold(Fold::new(), Fold::step)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "aaaaaaaa-1111-4a11-8a11-111111111111";
    const B: &str = "bbbbbbbb-2222-4b22-8b22-222222222222";

    #[test]
    fn test_canonical_markdown_is_unchanged() {
        let md = format!(
            "# Monday\n\n- [ ] Buy milk <!--todo:{A}-->\n\n### Work\n- [x] Ship it <!--todo:{B}-->\nnotes\n---\ntrailing\n"
        );
        let indexed = index_markdown(&md);
        assert_eq!(indexed.markdown, md, "canonical input must be byte-identical");
        assert_eq!(indexed.todos.len(), 2);

        // Indexing again is a fixed point
        assert_eq!(index_markdown(&indexed.markdown), indexed);
    }

    #[test]
    fn test_topic_closed_by_section_heading() {
        let indexed = index_markdown("### Ideas\nline1\n## Next\nline2");
        assert_eq!(
            indexed.topic_entries,
            vec![ParsedTopicEntry {
                topic_name: "Ideas".to_string(),
                content_markdown: "line1".to_string(),
            }]
        );
    }

    #[test]
    fn test_topic_closed_by_rule_and_next_topic() {
        let md = "### One\n\nfirst\n\n### Two\nsecond\n-----\nafter\n### Empty\n   \n";
        let indexed = index_markdown(md);
        let entries: Vec<(&str, &str)> = indexed
            .topic_entries
            .iter()
            .map(|e| (e.topic_name.as_str(), e.content_markdown.as_str()))
            .collect();
        assert_eq!(entries, vec![("One", "first"), ("Two", "second")]);
    }

    #[test]
    fn test_topic_runs_to_end_of_document() {
        let indexed = index_markdown("intro\n###   Reading list  \n- book\n- paper");
        assert_eq!(indexed.topic_entries.len(), 1);
        assert_eq!(indexed.topic_entries[0].topic_name, "Reading list");
        assert_eq!(indexed.topic_entries[0].content_markdown, "- book\n- paper");
    }

    #[test]
    fn test_deeper_headings_are_plain_lines() {
        let indexed = index_markdown("### Topic\n#### Detail\nbody");
        assert_eq!(indexed.topic_entries.len(), 1);
        assert_eq!(indexed.topic_entries[0].content_markdown, "#### Detail\nbody");
    }

    #[test]
    fn test_unmarked_todo_gets_marker() {
        let indexed = index_markdown("- [ ] Buy milk   \nplain");
        assert_eq!(indexed.todos.len(), 1);
        let todo = &indexed.todos[0];
        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.status, TodoStatus::Open);
        assert_eq!(todo.topic_name, None);
        assert_eq!(
            indexed.markdown,
            format!("- [ ] Buy milk <!--todo:{}-->\nplain", todo.id)
        );
    }

    #[test]
    fn test_blank_topic_heading_opens_no_topic() {
        let md = format!("###  \nbody\n- [ ] task <!--todo:{A}-->");
        let indexed = index_markdown(&md);
        assert!(indexed.topic_entries.is_empty());
        assert_eq!(indexed.todos[0].topic_name, None);
        assert_eq!(indexed.markdown, md);
    }

    #[test]
    fn test_blank_heading_does_not_close_open_topic() {
        let indexed = index_markdown("### Work\nfirst\n###\t\nsecond");
        assert_eq!(indexed.topic_entries.len(), 1);
        assert_eq!(indexed.topic_entries[0].topic_name, "Work");
        assert_eq!(
            indexed.topic_entries[0].content_markdown,
            "first\n###\t\nsecond"
        );
    }

    #[test]
    fn test_injected_marker_replaces_trailing_whitespace() {
        let indexed = index_markdown("- [ ] Tabbed\t \n  - [x] Nested  ");
        let ids: Vec<&str> = indexed.todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            indexed.markdown,
            format!(
                "- [ ] Tabbed <!--todo:{}-->\n  - [x] Nested <!--todo:{}-->",
                ids[0], ids[1]
            )
        );
        assert_eq!(index_markdown(&indexed.markdown).markdown, indexed.markdown);
    }

    #[test]
    fn test_existing_marker_is_reused() {
        let md = format!("- [X] Done thing <!--todo:{A}-->");
        let indexed = index_markdown(&md);
        assert_eq!(indexed.todos[0].id, A);
        assert_eq!(indexed.todos[0].status, TodoStatus::Done);
        assert_eq!(indexed.todos[0].title, "Done thing");
    }

    #[test]
    fn test_whitespace_only_checkbox_is_not_a_todo() {
        let indexed = index_markdown("- [ ]    \n- [x]\t");
        assert!(indexed.todos.is_empty());
        assert_eq!(indexed.markdown, "- [ ]    \n- [x]\t");
    }

    #[test]
    fn test_todo_inside_topic_feeds_both_paths() {
        let md = format!("### Errands\n- [ ] Post office <!--todo:{A}-->\ncall ahead");
        let indexed = index_markdown(&md);

        assert_eq!(indexed.todos.len(), 1);
        assert_eq!(indexed.todos[0].topic_name.as_deref(), Some("Errands"));

        assert_eq!(indexed.topic_entries.len(), 1);
        assert_eq!(
            indexed.topic_entries[0].content_markdown,
            format!("- [ ] Post office <!--todo:{A}-->\ncall ahead")
        );
    }

    #[test]
    fn test_topic_body_contains_injected_marker() {
        let indexed = index_markdown("### Errands\n- [ ] Post office");
        let id = &indexed.todos[0].id;
        assert_eq!(
            indexed.topic_entries[0].content_markdown,
            format!("- [ ] Post office <!--todo:{}-->", id)
        );
    }

    #[test]
    fn test_todo_after_topic_close_has_no_topic() {
        let md = format!("### Work\nx\n---\n- [ ] Loose <!--todo:{A}-->");
        let indexed = index_markdown(&md);
        assert_eq!(indexed.todos[0].topic_name, None);
    }

    #[test]
    fn test_empty_document() {
        let indexed = index_markdown("");
        assert_eq!(indexed.markdown, "");
        assert!(indexed.todos.is_empty());
        assert!(indexed.topic_entries.is_empty());
    }
}
