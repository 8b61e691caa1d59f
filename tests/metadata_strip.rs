use notion_syndicate::clean::{find_metadata, remove_notion_metadata, DEFAULT_METADATA_WINDOW};

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn empty_input_has_no_metadata() {
    assert_eq!(find_metadata(&[], DEFAULT_METADATA_WINDOW), None);
}

#[test]
fn no_colon_lines_means_no_metadata() {
    let doc = lines(&["# Title", "", "Some prose without separators", "more prose"]);
    assert_eq!(find_metadata(&doc, DEFAULT_METADATA_WINDOW), None);
}

#[test]
fn block_closes_at_first_break_even_if_matches_reappear() {
    let doc = lines(&["a: 1", "b: 2", "c", "d: 3"]);
    assert_eq!(find_metadata(&doc, DEFAULT_METADATA_WINDOW), Some((0, 1)));
}

#[test]
fn block_may_start_after_non_metadata_lines() {
    let doc = lines(&["My Page", "grade: 7", "Status: Draft", "", "body text"]);
    assert_eq!(find_metadata(&doc, DEFAULT_METADATA_WINDOW), Some((1, 2)));
}

#[test]
fn single_metadata_line_is_a_one_line_block() {
    let doc = lines(&["Status: Published", "", "body"]);
    assert_eq!(find_metadata(&doc, DEFAULT_METADATA_WINDOW), Some((0, 0)));
}

#[test]
fn metadata_outside_the_scan_window_is_ignored() {
    let mut doc = vec!["plain prose".to_string(); 21];
    doc.push("key: value".to_string());
    assert_eq!(find_metadata(&doc, DEFAULT_METADATA_WINDOW), None);
}

#[test]
fn removal_with_no_block_is_the_identity() {
    let doc = lines(&["# Title", "body"]);
    assert_eq!(remove_notion_metadata(doc.clone(), None), doc);
}

#[test]
fn removal_drops_the_inclusive_range() {
    let doc = lines(&["grade: 7", "Status: Draft", "", "body"]);
    let span = find_metadata(&doc, DEFAULT_METADATA_WINDOW);
    assert_eq!(span, Some((0, 1)));
    assert_eq!(remove_notion_metadata(doc, span), lines(&["", "body"]));
}

#[test]
fn removal_keeps_lines_before_the_block() {
    let doc = lines(&["My Page", "grade: 7", "Syllabus: AB-XYZ1", "body"]);
    let span = find_metadata(&doc, DEFAULT_METADATA_WINDOW);
    assert_eq!(span, Some((1, 2)));
    assert_eq!(remove_notion_metadata(doc, span), lines(&["My Page", "body"]));
}
