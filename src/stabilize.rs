//! Marker stabilization.
//!
//! Before a submitted document is indexed, its markers are reconciled against the
//! previously saved document for the same date so that todo ids survive reordering,
//! retitling, stripped markers and pasted duplicates:
//!
//! 1. History: prior ids, a FIFO queue of ids per normalized title, and each id's title.
//! 2. Reservation: a marked line keeps a known prior id, first claim wins. A marker whose
//!    prior title differs from the line's title yields whenever the line's title had
//!    any prior id, reserved or not; the line is then matched by title instead.
//! 3. Assignment: reserved id, else the first eligible id from the title queue, else a
//!    fresh id.
//! 4. Rewrite: lines already carrying exactly their assigned marker at the end are left
//!    byte-identical; all other todo lines get a single canonical marker.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::marker::{self, TodoLine};

/// Todo identities recorded in the previously saved document.
#[derive(Debug, Default)]
pub struct History {
    known: HashSet<String>,
    queues: HashMap<String, VecDeque<String>>,
    title_of: HashMap<String, String>,
}

impl History {
    /// Build history from the marked todo lines of `markdown`.
    ///
    /// Unmarked lines carry no identity and are skipped; a repeated id counts once.
    pub fn from_markdown(markdown: &str) -> Self {
        let mut history = History::default();

        for todo in markdown.split('\n').filter_map(marker::parse_todo_line) {
            let Some(id) = todo.marker_id() else {
                continue;
            };
            if !history.known.insert(id.to_string()) {
                continue;
            }
            let key = todo.title_key();
            history
                .queues
                .entry(key.clone())
                .or_default()
                .push_back(id.to_string());
            history.title_of.insert(id.to_string(), key);
        }

        history
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// True if any prior todo carried the title `key`.
    fn has_prior_title(&self, key: &str) -> bool {
        self.queues.get(key).is_some_and(|queue| !queue.is_empty())
    }
}

/// Line-to-id bindings from the reservation pass.
#[derive(Debug, Default)]
struct Reservations {
    by_line: HashMap<usize, String>,
    ids: HashSet<String>,
}

fn reserve(history: &History, todos: &[Option<TodoLine>]) -> Reservations {
    let mut reservations = Reservations::default();

    for (line_no, todo) in todos.iter().enumerate() {
        let Some(todo) = todo else {
            continue;
        };
        let Some(id) = todo.marker_id() else {
            continue;
        };
        if !history.is_known(id) || reservations.ids.contains(id) {
            continue;
        }

        let key = todo.title_key();
        let retitled = history.title_of.get(id).is_some_and(|prior| *prior != key);
        if retitled && history.has_prior_title(&key) {
            continue;
        }

        reservations.ids.insert(id.to_string());
        reservations.by_line.insert(line_no, id.to_string());
    }

    reservations
}

fn assign(
    history: &History,
    todos: &[Option<TodoLine>],
    reservations: &Reservations,
) -> Vec<Option<String>> {
    let mut queues = history.queues.clone();
    let mut used: HashSet<String> = HashSet::new();

    todos
        .iter()
        .enumerate()
        .map(|(line_no, todo)| {
            let todo = todo.as_ref()?;
            let id = reservations
                .by_line
                .get(&line_no)
                .cloned()
                .or_else(|| {
                    let queue = queues.get_mut(&todo.title_key())?;
                    pop_eligible(queue, &used, &reservations.ids)
                })
                .unwrap_or_else(marker::new_todo_id);
            used.insert(id.clone());
            Some(id)
        })
        .collect()
}

/// Pop ids off the front of `queue` until one is neither used nor reserved.
fn pop_eligible(
    queue: &mut VecDeque<String>,
    used: &HashSet<String>,
    reserved: &HashSet<String>,
) -> Option<String> {
    while let Some(id) = queue.pop_front() {
        if !used.contains(&id) && !reserved.contains(&id) {
            return Some(id);
        }
    }
    None
}

/// Rewrite `next` so every todo line carries its stabilized marker.
pub fn stabilize_markers(previous: &str, next: &str) -> String {
    let history = History::from_markdown(previous);

    let lines: Vec<&str> = next.split('\n').collect();
    let todos: Vec<Option<TodoLine>> = lines.iter().map(|l| marker::parse_todo_line(l)).collect();

    let reservations = reserve(&history, &todos);
    let assigned = assign(&history, &todos, &reservations);

    lines
        .iter()
        .zip(todos.iter().zip(assigned.iter()))
        .map(|(line, pair)| match pair {
            (Some(todo), Some(id)) if !marker::has_canonical_marker(line, &todo.marker_ids, id) => {
                marker::with_marker(line, id)
            }
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::index_markdown;

    const A1: &str = "aaaaaaaa-1111-4a11-8a11-111111111111";
    const B1: &str = "bbbbbbbb-2222-4b22-8b22-222222222222";
    const X: &str = "cccccccc-3333-4c33-8c33-333333333333";
    const Y: &str = "dddddddd-4444-4d44-8d44-444444444444";
    const Z: &str = "eeeeeeee-5555-4e55-8e55-555555555555";

    fn line(title: &str, id: &str) -> String {
        format!("- [ ] {} <!--todo:{}-->", title, id)
    }

    fn ids_of(markdown: &str) -> Vec<(String, String)> {
        index_markdown(markdown)
            .todos
            .into_iter()
            .map(|t| (t.title, t.id))
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(t, id)| (t.to_string(), id.to_string()))
            .collect()
    }

    #[test]
    fn test_reorder_with_stripped_markers_preserves_identity() {
        let previous = format!("{}\n{}", line("Buy milk", A1), line("Walk dog", B1));
        let next = "- [ ] Walk dog\n- [ ] Buy milk";

        let out = stabilize_markers(&previous, next);
        assert_eq!(
            ids_of(&out),
            pairs(&[("Walk dog", B1), ("Buy milk", A1)]),
            "ids must follow titles, not positions"
        );
    }

    #[test]
    fn test_title_edit_keeps_id_when_marker_kept() {
        let previous = line("Buy milk", A1);
        let next = format!("- [ ] Buy milk and eggs <!--todo:{}-->", A1);

        let out = stabilize_markers(&previous, &next);
        assert_eq!(out, next, "canonical line must not be rewritten");
        assert_eq!(ids_of(&out), pairs(&[("Buy milk and eggs", A1)]));
    }

    #[test]
    fn test_new_todo_gets_fresh_id() {
        let previous = format!("{}\n{}", line("Buy milk", A1), line("Walk dog", B1));
        let next = format!("{}\n- [ ] Call mom", line("Buy milk", A1));

        let out = stabilize_markers(&previous, &next);
        let todos = ids_of(&out);
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].1, A1);
        assert_eq!(todos[1].0, "Call mom");
        assert!(
            !History::from_markdown(&previous).is_known(&todos[1].1),
            "new todo must not reuse a prior id"
        );
    }

    #[test]
    fn test_duplicate_titles_follow_document_order() {
        let previous = format!("{}\n{}", line("Follow up", X), line("Follow up", Y));
        let next = "- [ ] Follow up\n- [x] Follow up";

        let out = stabilize_markers(&previous, next);
        assert_eq!(
            ids_of(&out),
            pairs(&[("Follow up", X), ("Follow up", Y)])
        );
    }

    #[test]
    fn test_three_duplicates_with_partial_marker_loss() {
        // The middle line keeps its marker; the others are matched FIFO among the
        // ids nobody reserved.
        let previous = format!(
            "{}\n{}\n{}",
            line("Follow up", X),
            line("Follow up", Y),
            line("Follow up", Z)
        );
        let next = format!("- [ ] Follow up\n{}\n- [ ] Follow up", line("Follow up", Z));

        let out = stabilize_markers(&previous, &next);
        assert_eq!(
            ids_of(&out),
            pairs(&[("Follow up", X), ("Follow up", Z), ("Follow up", Y)])
        );
    }

    #[test]
    fn test_pasted_duplicate_marker_first_keeps_id() {
        let previous = line("Buy milk", A1);
        let next = format!("{}\n{}", line("Buy milk", A1), line("Buy milk", A1));

        let out = stabilize_markers(&previous, &next);
        let todos = ids_of(&out);
        assert_eq!(todos[0].1, A1);
        assert_ne!(todos[1].1, A1, "duplicate must get its own id");
    }

    #[test]
    fn test_swapped_markers_follow_titles() {
        let previous = format!("{}\n{}", line("Buy milk", A1), line("Walk dog", B1));
        // Markers swapped between lines, e.g. by editing text around them
        let next = format!("{}\n{}", line("Walk dog", A1), line("Buy milk", B1));

        let out = stabilize_markers(&previous, &next);
        assert_eq!(
            ids_of(&out),
            pairs(&[("Walk dog", B1), ("Buy milk", A1)])
        );
    }

    #[test]
    fn test_retitle_onto_claimed_title_gets_fresh_id() {
        let previous = format!("{}\n{}", line("Walk dog", B1), line("Buy milk", A1));
        // "Buy milk" retitled to an existing title whose id is already claimed
        let next = format!("{}\n{}", line("Walk dog", B1), line("Walk dog", A1));

        let out = stabilize_markers(&previous, &next);
        let todos = ids_of(&out);
        assert_eq!(todos[0], ("Walk dog".to_string(), B1.to_string()));
        assert_eq!(todos[1].0, "Walk dog");
        assert_ne!(todos[1].1, A1, "marker yields to an existing title");
        assert_ne!(todos[1].1, B1);
    }

    #[test]
    fn test_title_guard_ignores_reservation_order() {
        // Same outcome whichever line claims its marker first
        let previous = format!("{}\n{}", line("Walk dog", B1), line("Buy milk", A1));
        let next = format!("{}\n{}", line("Walk dog", A1), line("Walk dog", B1));

        let out = stabilize_markers(&previous, &next);
        let todos = ids_of(&out);
        assert_ne!(todos[0].1, A1);
        assert_ne!(todos[0].1, B1);
        assert_eq!(todos[1], ("Walk dog".to_string(), B1.to_string()));
    }

    #[test]
    fn test_unknown_marker_is_replaced() {
        let previous = line("Buy milk", A1);
        let next = line("Something else", X);

        let out = stabilize_markers(&previous, &next);
        let todos = ids_of(&out);
        assert_ne!(todos[0].1, X, "markers not in history are not trusted");
        assert_ne!(todos[0].1, A1);
    }

    #[test]
    fn test_unknown_marker_matching_title_recovers_prior_id() {
        let previous = line("Buy milk", A1);
        let next = line("Buy milk", X);

        let out = stabilize_markers(&previous, &next);
        assert_eq!(out, line("Buy milk", A1));
    }

    #[test]
    fn test_marker_moved_to_line_end_and_lowercased() {
        let previous = line("Buy milk", A1);
        let next = format!(
            "  - [x] Buy <!--TODO:{}--> milk   ",
            A1.to_ascii_uppercase()
        );

        let out = stabilize_markers(&previous, &next);
        assert_eq!(out, format!("  - [x] Buy  milk <!--todo:{}-->", A1));
    }

    #[test]
    fn test_non_todo_lines_untouched() {
        let previous = line("Buy milk", A1);
        let next = format!(
            "# Title\n\nsome <!--todo:{}--> text\n- [ ]   \n{}\n",
            X,
            line("Buy milk", A1)
        );

        assert_eq!(stabilize_markers(&previous, &next), next);
    }

    #[test]
    fn test_empty_previous_mints_everything() {
        let out = stabilize_markers("", "- [ ] One\n- [ ] Two");
        let todos = ids_of(&out);
        assert_eq!(todos.len(), 2);
        assert_ne!(todos[0].1, todos[1].1);
        // Stabilized output is canonical: indexing does not change it
        assert_eq!(index_markdown(&out).markdown, out);
    }

    #[test]
    fn test_title_match_is_normalized() {
        let previous = line("Buy   Milk", A1);
        let out = stabilize_markers(&previous, "- [ ]  buy milk ");
        assert_eq!(ids_of(&out), pairs(&[("buy milk", A1)]));
    }
}
