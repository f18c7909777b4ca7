//! Shared behaviour checks for [`Gateway`] implementations
//!
//! Every gateway runs the same sequence against a fresh, empty store.

use super::error::StorageError;
use super::gateway::Gateway;
use crate::models::Item;

pub(crate) fn run(gw: &dyn Gateway) {
    empty_store(gw);
    valid_insert(gw);
    valid_find(gw);
    invalid_find(gw);
    valid_find_all(gw);
    valid_update(gw);
    invalid_update(gw);
    valid_delete(gw);
    delete_absent(gw);
    monotonic_after_delete(gw);
}

fn empty_store(gw: &dyn Gateway) {
    assert!(gw.find_all().unwrap().is_empty());
    assert_eq!(gw.count().unwrap(), 0);
}

fn valid_insert(gw: &dyn Gateway) {
    let got = gw.insert("test content", true).unwrap();
    assert_eq!(got, Item::new(1, "test content", true));
}

fn valid_find(gw: &dyn Gateway) {
    let got = gw.find(1).unwrap();
    assert_eq!(got, Some(Item::new(1, "test content", true)));
}

fn invalid_find(gw: &dyn Gateway) {
    assert_eq!(gw.find(10000).unwrap(), None);
}

fn valid_find_all(gw: &dyn Gateway) {
    let got = gw.find_all().unwrap();
    assert_eq!(got, vec![Item::new(1, "test content", true)]);
}

fn valid_update(gw: &dyn Gateway) {
    let got = gw.update(1, "make a sandwich", true).unwrap();
    assert_eq!(got, Item::new(1, "make a sandwich", true));

    let got = gw.update(1, "make a sandwich", false).unwrap();
    assert!(!got.is_completed);
    assert_eq!(gw.find(1).unwrap(), Some(got));
}

fn invalid_update(gw: &dyn Gateway) {
    let before = gw.find_all().unwrap();

    let err = gw.update(10000, "make a sandwich", true).unwrap_err();
    assert!(matches!(err, StorageError::NotFound { id: 10000 }));

    assert_eq!(gw.find_all().unwrap(), before);
    assert_eq!(gw.find(10000).unwrap(), None);
}

fn valid_delete(gw: &dyn Gateway) {
    gw.delete(1).unwrap();

    assert_eq!(gw.find(1).unwrap(), None);
    assert!(gw.find_all().unwrap().is_empty());
}

fn delete_absent(gw: &dyn Gateway) {
    gw.delete(1).unwrap();
    gw.delete(10000).unwrap();
}

fn monotonic_after_delete(gw: &dyn Gateway) {
    let a = gw.insert("buy milk", false).unwrap();
    let b = gw.insert("get mail", false).unwrap();

    assert!(a.id > 1, "deleted identifier was reused");
    assert!(a.id < b.id);
    assert_eq!(gw.find(b.id).unwrap(), Some(b));
    assert_eq!(gw.count().unwrap(), 2);
}
