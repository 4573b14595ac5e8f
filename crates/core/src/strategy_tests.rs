use super::*;

#[test]
fn fingerprint_ignores_trailing_whitespace() {
    let a = Fingerprint::of_normalized("def foo():\n    pass\n");
    let b = Fingerprint::of_normalized("def foo():   \n    pass");
    assert_eq!(a, b);
}

#[test]
fn fingerprint_distinguishes_different_code() {
    let a = Fingerprint::of_normalized("a = 1");
    let b = Fingerprint::of_normalized("a = 2");
    assert_ne!(a, b);
}

#[test]
fn root_strategy_has_generation_zero() {
    let now = Utc::now();
    let s = Strategy::new_root("root", "code", now);
    assert_eq!(s.generation, 0);
    assert!(s.parent_id.is_none());
}

#[test]
fn child_strategy_increments_generation() {
    let now = Utc::now();
    let parent = Strategy::new_root("root", "code", now);
    let child = Strategy::new_child("child", "code v2", parent.id, parent.generation, now);
    assert_eq!(child.generation, 1);
    assert_eq!(child.parent_id, Some(parent.id));
}

#[test]
fn page_total_pages_rounds_up() {
    let page = Page::new(vec![1, 2, 3], 23, 1, 10);
    assert_eq!(page.total_pages, 3);
}
