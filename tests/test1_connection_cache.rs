use std::cell::RefCell;
use std::rc::Rc;

use sqlite_driver_shim::prelude::*;

#[test]
fn different_path_spellings_share_one_cached_handle() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new();

    let plain = dir.path().join("ranks.sqlite");
    let db_a = driver.open_cached(plain.to_str().unwrap(), None, None);
    db_a.exec("CREATE TABLE kw (id INTEGER PRIMARY KEY, term TEXT)", None);
    driver.run_until_idle();

    let dotted = dir.path().join(".").join("ranks.sqlite");
    let db_b = driver.open_cached(dotted.to_str().unwrap(), None, None);
    driver.run_until_idle();

    assert!(db_a.shares_connection(&db_b));
    assert_eq!(driver.registry().cached_count(), 1);

    // same connection, so an uncommitted-table view is identical
    let seen = Rc::new(RefCell::new(0usize));
    let seen_in_cb = seen.clone();
    db_b.run(
        "INSERT INTO kw (term) VALUES ('rust')",
        vec![run_callback(move |ctx, res| {
            res.unwrap();
            *seen_in_cb.borrow_mut() = ctx.changes;
        })],
    );
    driver.run_until_idle();
    assert_eq!(*seen.borrow(), 1);

    let count = Rc::new(RefCell::new(None));
    let count_in_cb = count.clone();
    db_a.get(
        "SELECT COUNT(*) AS n FROM kw",
        vec![get_callback(move |_ctx, res| {
            let row = res.unwrap().unwrap();
            *count_in_cb.borrow_mut() = row.get("n").and_then(ValueExt::as_int);
        })],
    );
    driver.run_until_idle();
    assert_eq!(*count.borrow(), Some(1));
}

#[test]
fn memory_databases_are_never_shared() {
    let driver = Driver::new();
    let db_a = driver.open_cached(MEMORY, None, None);
    let db_b = driver.open_cached(MEMORY, None, None);
    driver.run_until_idle();

    assert!(!db_a.shares_connection(&db_b));
    assert_eq!(driver.registry().cached_count(), 0);

    db_a.exec("CREATE TABLE only_here (id INTEGER)", None);
    let outcome = Rc::new(RefCell::new(None));
    let outcome_in_cb = outcome.clone();
    db_b.all(
        "SELECT * FROM only_here",
        vec![all_callback(move |_ctx, res| {
            *outcome_in_cb.borrow_mut() = Some(res.is_err());
        })],
    );
    driver.run_until_idle();
    assert_eq!(*outcome.borrow(), Some(true));
}

#[test]
fn opens_before_the_open_event_queue_behind_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queued.sqlite");
    let driver = Driver::new();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let first_log = log.clone();
    let db_a = driver.open_cached(
        path.to_str().unwrap(),
        None,
        Some(Box::new(move |_ctx, res| {
            res.unwrap();
            first_log.borrow_mut().push("first");
        })),
    );

    // same tick, open event not fired yet: callback must wait for it
    let second_log = log.clone();
    let db_b = driver.open_cached(
        path.to_str().unwrap(),
        None,
        Some(Box::new(move |_ctx, res| {
            res.unwrap();
            second_log.borrow_mut().push("second");
        })),
    );

    assert!(db_a.shares_connection(&db_b));
    assert!(log.borrow().is_empty());
    driver.run_until_idle();
    assert_eq!(*log.borrow(), vec!["first", "second"]);
}

#[test]
fn failed_open_does_not_poison_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.sqlite");
    let driver = Driver::new();

    // no create bit: the file must already exist
    let failed = Rc::new(RefCell::new(false));
    let failed_in_cb = failed.clone();
    let db = driver.open_cached(
        path.to_str().unwrap(),
        Some(OPEN_READWRITE),
        Some(Box::new(move |_ctx, res| {
            *failed_in_cb.borrow_mut() = res.is_err();
        })),
    );
    driver.run_until_idle();
    assert!(*failed.borrow());
    assert!(!db.is_open());
    assert_eq!(driver.registry().cached_count(), 0);

    // retry with the create bit succeeds and caches
    let opened = Rc::new(RefCell::new(false));
    let opened_in_cb = opened.clone();
    let db = driver.open_cached(
        path.to_str().unwrap(),
        None,
        Some(Box::new(move |_ctx, res| {
            res.unwrap();
            *opened_in_cb.borrow_mut() = true;
        })),
    );
    driver.run_until_idle();
    assert!(*opened.borrow());
    assert!(db.is_open());
    assert_eq!(driver.registry().cached_count(), 1);
}

#[test]
fn close_evicts_even_for_late_clones() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evict.sqlite");
    let driver = Driver::new();

    let db_a = driver.open_cached(path.to_str().unwrap(), None, None);
    driver.run_until_idle();
    assert_eq!(driver.registry().cached_count(), 1);

    db_a.close(Some(Box::new(|_ctx, res| res.unwrap())));
    driver.run_until_idle();
    assert_eq!(driver.registry().cached_count(), 0);

    // a fresh open builds a new connection rather than the closed one
    let db_b = driver.open_cached(path.to_str().unwrap(), None, None);
    driver.run_until_idle();
    assert!(!db_a.shares_connection(&db_b));
    assert!(db_b.is_open());
}

#[test]
fn close_before_the_open_event_fails_queued_waiters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("early-close.sqlite");
    let driver = Driver::new();

    let results: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));
    let first = results.clone();
    let db = driver.open_cached(
        path.to_str().unwrap(),
        None,
        Some(Box::new(move |_ctx, res| {
            first
                .borrow_mut()
                .push(matches!(res, Err(DriverError::DatabaseClosed)));
        })),
    );
    let second = results.clone();
    let _queued = driver.open_cached(
        path.to_str().unwrap(),
        None,
        Some(Box::new(move |_ctx, res| {
            second
                .borrow_mut()
                .push(matches!(res, Err(DriverError::DatabaseClosed)));
        })),
    );

    // the open event has not fired yet; both waiters must learn the handle
    // is already gone
    db.close(None);
    driver.run_until_idle();
    assert_eq!(*results.borrow(), vec![true, true]);
    assert_eq!(driver.registry().cached_count(), 0);

    // the entry was evicted, so a fresh open builds a live connection
    let db = driver.open_cached(path.to_str().unwrap(), None, None);
    driver.run_until_idle();
    assert!(db.is_open());
}

#[test]
fn reentrant_open_from_a_callback_sees_the_ready_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reentrant.sqlite");
    let path_str = path.to_str().unwrap().to_string();
    let driver = Rc::new(Driver::new());
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let outer_driver = driver.clone();
    let outer_log = log.clone();
    let path_for_cb = path_str.clone();
    let _db = driver.open_cached(
        &path_str,
        None,
        Some(Box::new(move |_ctx, res| {
            res.unwrap();
            outer_log.borrow_mut().push("outer");
            let inner_log = outer_log.clone();
            let _inner = outer_driver.open_cached(
                &path_for_cb,
                None,
                Some(Box::new(move |_ctx, res| {
                    res.unwrap();
                    inner_log.borrow_mut().push("inner");
                })),
            );
        })),
    );

    driver.run_until_idle();
    assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    assert_eq!(driver.registry().cached_count(), 1);
}
