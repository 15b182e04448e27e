use std::cell::RefCell;
use std::rc::Rc;

use sqlite_driver_shim::prelude::*;

#[test]
fn booleans_round_trip_as_integers_and_null_matches_with_is() {
    let driver = Driver::new();
    let db = driver.open(MEMORY, None, None);
    db.exec(
        "CREATE TABLE kw (id INTEGER PRIMARY KEY, term TEXT, active INTEGER, region TEXT)",
        None,
    );

    db.run(
        "INSERT INTO kw (term, active, region) VALUES (?, ?, ?)",
        vec![
            Argument::value("rust sqlite driver"),
            Argument::value(true),
            Argument::Value(BindValue::Null),
        ],
    );
    driver.run_until_idle();

    let stored = Rc::new(RefCell::new(None));
    let stored_in_cb = stored.clone();
    db.get(
        "SELECT active FROM kw WHERE term = ?",
        vec![
            Argument::value("rust sqlite driver"),
            get_callback(move |_ctx, res| {
                let row = res.unwrap().unwrap();
                *stored_in_cb.borrow_mut() = row.get("active").and_then(ValueExt::as_int);
            }),
        ],
    );
    driver.run_until_idle();
    assert_eq!(*stored.borrow(), Some(1));

    // a NULL binding finds the row whose column is NULL
    let found = Rc::new(RefCell::new(None));
    let found_in_cb = found.clone();
    db.get(
        "SELECT term, region FROM kw WHERE region IS ?",
        vec![
            Argument::Value(BindValue::Null),
            get_callback(move |ctx, res| {
                let row = res.unwrap().unwrap();
                assert!(row.get("region").is_some_and(ValueExt::is_null));
                *found_in_cb.borrow_mut() = Some(ctx.changes);
            }),
        ],
    );
    driver.run_until_idle();
    assert_eq!(*found.borrow(), Some(1));
}

#[test]
fn named_inserts_yield_increasing_last_ids() {
    let driver = Driver::new();
    let db = driver.open(MEMORY, None, None);
    db.exec(
        "CREATE TABLE kw (id INTEGER PRIMARY KEY AUTOINCREMENT, term TEXT NOT NULL)",
        None,
    );

    let ids: Rc<RefCell<Vec<(Option<i64>, usize)>>> = Rc::new(RefCell::new(Vec::new()));
    for term in ["rank tracker", "serp monitor"] {
        let ids_in_cb = ids.clone();
        db.run(
            "INSERT INTO kw (term) VALUES ($term)",
            vec![
                Argument::Value(BindValue::Map(vec![(
                    "$term".into(),
                    BindValue::Text(term.into()),
                )])),
                run_callback(move |ctx, res| {
                    res.unwrap();
                    ids_in_cb.borrow_mut().push((ctx.last_id, ctx.changes));
                }),
            ],
        );
    }
    driver.run_until_idle();

    let recorded = ids.borrow();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0], (Some(1), 1));
    assert_eq!(recorded[1], (Some(2), 1));
}

#[test]
fn get_changes_reflect_whether_a_row_was_found() {
    let driver = Driver::new();
    let db = driver.open(MEMORY, None, None);
    db.exec(
        "CREATE TABLE kw (id INTEGER PRIMARY KEY, term TEXT);
         INSERT INTO kw (term) VALUES ('found');",
        None,
    );

    let changes: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    for term in ["found", "missing"] {
        let changes_in_cb = changes.clone();
        db.get(
            "SELECT * FROM kw WHERE term = ?",
            vec![
                Argument::value(term),
                get_callback(move |ctx, res| {
                    res.unwrap();
                    changes_in_cb.borrow_mut().push(ctx.changes);
                }),
            ],
        );
    }
    driver.run_until_idle();
    assert_eq!(*changes.borrow(), vec![1, 0]);
}

#[test]
fn all_changes_reflect_the_returned_row_count() {
    let driver = Driver::new();
    let db = driver.open(MEMORY, None, None);
    db.exec(
        "CREATE TABLE kw (id INTEGER PRIMARY KEY, hits INTEGER);
         INSERT INTO kw (hits) VALUES (1), (2), (3);",
        None,
    );

    let seen = Rc::new(RefCell::new(None));
    let seen_in_cb = seen.clone();
    db.all(
        "SELECT * FROM kw WHERE hits > ?",
        vec![
            Argument::value(1i64),
            all_callback(move |ctx, res| {
                let rows = res.unwrap();
                *seen_in_cb.borrow_mut() = Some((rows.len(), ctx.changes, ctx.last_id));
            }),
        ],
    );
    driver.run_until_idle();
    assert_eq!(*seen.borrow(), Some((2, 2, None)));
}

#[test]
fn readonly_mode_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.sqlite");
    let driver = Driver::new();

    let db = driver.open(path.to_str().unwrap(), None, None);
    db.exec("CREATE TABLE kw (id INTEGER PRIMARY KEY)", None);
    db.close(None);
    driver.run_until_idle();

    let db = driver.open(path.to_str().unwrap(), Some(OPEN_READONLY), None);
    let seen = Rc::new(RefCell::new(None));
    let seen_in_cb = seen.clone();
    db.run(
        "INSERT INTO kw DEFAULT VALUES",
        vec![run_callback(move |_ctx, res| {
            *seen_in_cb.borrow_mut() = Some(matches!(res, Err(DriverError::Sqlite(_))));
        })],
    );
    driver.run_until_idle();
    assert_eq!(*seen.borrow(), Some(true));
}

#[test]
fn open_without_create_requires_an_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.sqlite");
    let driver = Driver::new();

    let failed = Rc::new(RefCell::new(false));
    let failed_in_cb = failed.clone();
    let db = driver.open(
        path.to_str().unwrap(),
        Some(OPEN_READWRITE),
        Some(Box::new(move |_ctx, res| {
            *failed_in_cb.borrow_mut() = res.is_err();
        })),
    );
    driver.run_until_idle();
    assert!(*failed.borrow());
    assert!(!db.is_open());
}
