mod helpers;

use clipdex::catalog::pagination::page;
use clipdex::Error;
use helpers::{fill, test_store};

#[test]
fn pages_split_collection_in_order() {
    let store = test_store();
    fill(&store, 25);

    let third = page(&store, 3, 10).unwrap();
    let paths: Vec<&str> = third.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ["img20.jpg", "img21.jpg", "img22.jpg", "img23.jpg", "img24.jpg"]);
    assert_eq!(third.total, 25);
    assert_eq!(third.page, 3);
    assert_eq!(third.page_size, 10);

    let beyond = page(&store, 4, 10).unwrap();
    assert!(beyond.records.is_empty());
    assert_eq!(beyond.total, 25);
}

#[test]
fn concatenated_pages_equal_fetch_all() {
    let store = test_store();
    fill(&store, 17);
    let all = store.fetch_all().unwrap();

    let mut seen = Vec::new();
    for n in 1..=4 {
        let p = page(&store, n, 5).unwrap();
        assert_eq!(p.total, 17);
        seen.extend(p.records);
    }
    assert_eq!(seen, all);
}

#[test]
fn empty_store_has_empty_first_page() {
    let store = test_store();
    let p = page(&store, 1, 12).unwrap();
    assert!(p.records.is_empty());
    assert_eq!(p.total, 0);
}

#[test]
fn zero_page_or_size_is_rejected() {
    let store = test_store();
    fill(&store, 3);
    assert!(matches!(page(&store, 0, 10), Err(Error::InvalidInput(_))));
    assert!(matches!(page(&store, 1, 0), Err(Error::InvalidInput(_))));
}

#[test]
fn huge_page_number_does_not_overflow() {
    let store = test_store();
    fill(&store, 3);
    let p = page(&store, usize::MAX, usize::MAX).unwrap();
    assert!(p.records.is_empty());
    assert_eq!(p.total, 3);
}
