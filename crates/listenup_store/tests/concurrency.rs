//! Concurrent writers racing on the same keys.

use listenup_codec::keys;
use listenup_core::ReadOps;
use listenup_store::{Directory, ErrorKind, Library, Role, Server, User};
use listenup_testkit::prelude::*;
use std::collections::HashSet;

#[test]
fn concurrent_directory_appends_are_not_lost() {
    let ctx = TestContext::memory();
    let library = Library::new("L1");
    ctx.libraries().create_library(&ctx.cancel(), &library).unwrap();

    let run = run_concurrently(2, |_| {
        ctx.libraries()
            .add_directory(&ctx.cancel(), &library.id, &Directory::new("Books", "/books"))
    });
    assert_eq!(run.successes(), 2);

    let stored = ctx.libraries().get_library_by_id(&library.id).unwrap();
    assert_eq!(stored.directories.len(), 2);
    let ids: HashSet<_> = stored.directories.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids.len(), 2);
}

#[test]
fn many_appenders_all_land() {
    let ctx = TestContext::memory();
    let library = Library::new("busy");
    ctx.libraries().create_library(&ctx.cancel(), &library).unwrap();

    let run = run_concurrently(8, |worker| {
        let dir = Directory::new(format!("dir{worker}"), format!("/media/{worker}"));
        ctx.libraries().add_directory(&ctx.cancel(), &library.id, &dir)
    });
    assert_eq!(run.successes(), 8);

    let stored = ctx.libraries().get_library_by_id(&library.id).unwrap();
    let names: HashSet<_> = stored.directories.iter().map(|d| d.name.clone()).collect();
    assert_eq!(names.len(), 8);
}

#[test]
fn racing_registrations_with_one_email_create_one_user() {
    let ctx = TestContext::memory();

    let run = run_concurrently(6, |worker| {
        let email = if worker % 2 == 0 {
            "race@example.com"
        } else {
            "RACE@example.com"
        };
        let user = User::new(email, format!("user{worker}"), "h", Role::Member);
        ctx.users().create_user(&ctx.cancel(), &user)
    });

    assert_eq!(run.successes(), 1);
    for result in &run.results {
        if let Err(e) = result {
            assert_eq!(e.kind(), ErrorKind::AlreadyExists);
        }
    }

    let prefix = keys::email_index_prefix("race@example.com");
    let entries = ctx
        .database()
        .view(|txn| txn.scan_prefix(&prefix))
        .unwrap();
    assert_eq!(entries.len(), 1);
    let users = ctx
        .database()
        .view(|txn| txn.scan_prefix(keys::USER_PREFIX))
        .unwrap();
    assert_eq!(users.len(), 1);
}

#[test]
fn racing_server_creation_has_one_winner() {
    let ctx = TestContext::memory();

    let run = run_concurrently(4, |worker| {
        ctx.servers()
            .create_server(&ctx.cancel(), &Server::generate(format!("s{worker}")))
    });
    assert_eq!(run.successes(), 1);
    assert!(run
        .results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.kind() == ErrorKind::AlreadyExists));
}

#[test]
fn exactly_one_caller_flips_set_up() {
    let ctx = TestContext::memory();
    ctx.bootstrap(&ctx.cancel()).unwrap();

    let run = run_concurrently(6, |_| ctx.servers().mark_set_up(&ctx.cancel()));
    let flipped = run
        .results
        .iter()
        .filter(|r| matches!(r, Ok(true)))
        .count();
    assert_eq!(flipped, 1);
    assert_eq!(run.successes(), 6);
}

#[test]
fn email_change_racing_registration_keeps_email_unique() {
    for round in 0..20 {
        let ctx = TestContext::memory();
        let mover = User::new(format!("old{round}@example.com"), "mover", "h", Role::Member);
        ctx.users().create_user(&ctx.cancel(), &mover).unwrap();

        let run = run_concurrently(2, |worker| {
            if worker == 0 {
                let mut moved = mover.clone();
                moved.email = "taken@example.com".to_string();
                ctx.users().update_user(&ctx.cancel(), &moved)
            } else {
                let newcomer = User::new("Taken@Example.com", "newcomer", "h", Role::Member);
                ctx.users().create_user(&ctx.cancel(), &newcomer)
            }
        });

        assert_eq!(run.successes(), 1, "round {round}");
        for result in &run.results {
            if let Err(e) = result {
                assert_eq!(e.kind(), ErrorKind::AlreadyExists, "round {round}");
            }
        }

        let prefix = keys::email_index_prefix("taken@example.com");
        let entries = ctx
            .database()
            .view(|txn| txn.scan_prefix(&prefix))
            .unwrap();
        assert_eq!(entries.len(), 1, "round {round}");

        let owner = ctx.users().get_user_by_email("TAKEN@example.com").unwrap();
        if run.results[0].is_ok() {
            assert_eq!(owner.id, mover.id);
        } else {
            assert_eq!(owner.display_name, "newcomer");
            let unchanged = ctx.users().get_user_by_id(&mover.id).unwrap();
            assert_eq!(unchanged.email, mover.email);
        }
    }
}
