use corekv_engine::{Config, Server};
use corekv_primitives::{keyspace, string};
use tempfile::tempdir;

#[test]
fn select_out_of_range_fails_without_changing_the_addressed_database() {
    let dir = tempdir().unwrap();
    let server = Server::open(Config::default(), dir.path(), 1_000).unwrap();
    assert!(server.with_database(999, |_| ()).is_err());
    // database 0 is unaffected by the failed lookup
    server.with_database(0, |db| assert!(db.is_empty())).unwrap();
}

#[test]
fn a_round_trip_through_save_and_reopen_preserves_ttls() {
    let dir = tempdir().unwrap();
    let server = Server::open(Config::default(), dir.path(), 1_000).unwrap();
    server
        .with_database(1, |db| {
            string::set(db, b"session", b"abc".to_vec(), 1_000);
            keyspace::expire_at(db, b"session", 50_000, 1_000, server.authority);
        })
        .unwrap();
    server.save(1_000).unwrap();

    let reopened = Server::open(Config::default(), dir.path(), 1_000).unwrap();
    reopened
        .with_database(1, |db| {
            assert_eq!(db.expire_at_ms(b"session"), Some(50_000));
        })
        .unwrap();
}

#[test]
fn record_write_with_aof_disabled_is_a_pure_counter_bump() {
    let dir = tempdir().unwrap();
    let server = Server::open(Config::default(), dir.path(), 1_000).unwrap();
    assert_eq!(server.dirty(), 0);
    server
        .record_write(0, &[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()], 1_000)
        .unwrap();
    assert_eq!(server.dirty(), 1);
    assert!(!dir.path().join("appendonly.aof").exists());
}

#[test]
fn save_points_become_due_once_enough_writes_land() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.save_points = vec![(0, 3)];
    let server = Server::open(config, dir.path(), 1_000).unwrap();
    assert!(!server.save_due(1_000));
    for _ in 0..3 {
        server.record_write(0, &[b"PING".to_vec()], 1_000).unwrap();
    }
    assert!(server.save_due(1_000));
    server.save(1_000).unwrap();
    assert!(!server.save_due(1_000));
}
