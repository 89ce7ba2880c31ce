//! Push an entity-side status change back into the markdown source line.

use crate::marker;

/// Set the checkbox of the first line carrying `todo_id`'s marker.
///
/// Only the checkbox token on that line changes. If no line carries the marker, or
/// the marked line has no leading checkbox, the input is returned unmodified.
pub fn toggle_checkbox(markdown: &str, todo_id: &str, checked: bool) -> String {
    let token = marker::marker(todo_id);
    let mut lines: Vec<&str> = markdown.split('\n').collect();

    let Some(pos) = lines.iter().position(|line| line.contains(&token)) else {
        return markdown.to_string();
    };

    let patched = match marker::set_checkbox(lines[pos], checked) {
        Some(patched) => patched,
        None => return markdown.to_string(),
    };

    lines[pos] = &patched;
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DENTIST: &str = "deadbeef-0000-4000-8000-000000000000";
    const OTHER: &str = "aaaaaaaa-1111-4a11-8a11-111111111111";

    #[test]
    fn test_toggle_changes_only_the_checkbox() {
        let md = format!(
            "# Today\n- [ ] Pay rent <!--todo:{OTHER}-->\n  - [ ] Call dentist <!--todo:{DENTIST}-->\ntrailing text\n"
        );
        let out = toggle_checkbox(&md, DENTIST, true);

        let want = md.replacen("  - [ ] Call", "  - [x] Call", 1);
        assert_eq!(out, want);
        assert_eq!(out.len(), md.len());
    }

    #[test]
    fn test_uncheck_uppercase_x() {
        let md = format!("- [X] Call dentist <!--todo:{DENTIST}-->");
        assert_eq!(
            toggle_checkbox(&md, DENTIST, false),
            format!("- [ ] Call dentist <!--todo:{DENTIST}-->")
        );
    }

    #[test]
    fn test_only_first_marked_line_changes() {
        let md = format!("- [ ] a <!--todo:{DENTIST}-->\n- [ ] b <!--todo:{DENTIST}-->");
        assert_eq!(
            toggle_checkbox(&md, DENTIST, true),
            format!("- [x] a <!--todo:{DENTIST}-->\n- [ ] b <!--todo:{DENTIST}-->")
        );
    }

    #[test]
    fn test_missing_marker_returns_input() {
        let md = format!("- [ ] Pay rent <!--todo:{OTHER}-->\n");
        assert_eq!(toggle_checkbox(&md, DENTIST, true), md);
    }

    #[test]
    fn test_marked_line_without_checkbox_returns_input() {
        let md = format!("see <!--todo:{DENTIST}-->\n- [ ] b <!--todo:{DENTIST}-->");
        assert_eq!(toggle_checkbox(&md, DENTIST, true), md);
    }

    #[test]
    fn test_already_in_state_is_identity() {
        let md = format!("- [x] Call dentist <!--todo:{DENTIST}-->");
        assert_eq!(toggle_checkbox(&md, DENTIST, true), md);
    }
}
