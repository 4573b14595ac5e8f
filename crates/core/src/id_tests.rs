use super::*;

crate::define_id! {
    /// Test-only id type.
    pub struct TestId;
}

#[test]
fn new_ids_are_unique() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn round_trips_through_string() {
    let id = TestId::new();
    let parsed = TestId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn short_truncates_on_char_boundary() {
    assert_eq!(short("hello world", 5), "hello");
    assert_eq!(short("hi", 10), "hi");
}
