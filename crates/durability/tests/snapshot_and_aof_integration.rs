use corekv_core::RObject;
use corekv_durability::aof::{self, command, AofWriter};
use corekv_durability::config::{AofConfig, AofState, SnapshotConfig};
use corekv_durability::mode::FsyncPolicy;
use corekv_durability::snapshot::{read_snapshot, write_snapshot};
use corekv_storage::Database;
use std::collections::VecDeque;
use tempfile::tempdir;

#[test]
fn snapshot_survives_a_file_round_trip() {
    let mut db0 = Database::new();
    db0.set_fresh(b"greeting".to_vec(), RObject::StrRaw(b"hello world".to_vec()), 0);
    let mut db1 = Database::new();
    db1.set_fresh(
        b"l".to_vec(),
        RObject::ListGeneric(VecDeque::from([b"x".to_vec(), b"y".to_vec(), b"z".to_vec()])),
        0,
    );
    db1.set_expire_at(b"l", 1_893_456_000_000);

    let dir = tempdir().unwrap();
    let path = dir.path().join("dump.rdb");
    let image = write_snapshot(&[db0, db1], SnapshotConfig::default());
    std::fs::write(&path, &image).unwrap();

    let loaded_image = std::fs::read(&path).unwrap();
    let loaded = read_snapshot(&loaded_image, 2, 0).unwrap();
    assert_eq!(loaded[1].expire_at_ms(b"l"), Some(1_893_456_000_000));
    match loaded[0].dict_get(b"greeting") {
        Some(RObject::StrRaw(bytes)) => assert_eq!(bytes, b"hello world"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn aof_append_flush_and_load_round_trips_a_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("appendonly.aof");
    let cfg = AofConfig {
        state: AofState::On,
        fsync: FsyncPolicy::No,
        ..AofConfig::default()
    };

    {
        let mut writer = AofWriter::open(&path, cfg.clone()).unwrap();
        writer.append(0, &[b"SET".to_vec(), b"a".to_vec(), b"1".to_vec()], 1_000);
        writer.append(0, &[b"EXPIRE".to_vec(), b"a".to_vec(), b"60".to_vec()], 1_000);
        writer.append(1, &[b"SET".to_vec(), b"b".to_vec(), b"2".to_vec()], 1_000);
        writer.flush().unwrap();
    }

    let records = aof::load(&path, &cfg).unwrap();
    assert_eq!(records[0].db, 0);
    assert_eq!(records[0].args, vec![b"SET".to_vec(), b"a".to_vec(), b"1".to_vec()]);
    let pexpireat = &records[1];
    assert_eq!(pexpireat.args[0], b"PEXPIREAT");
    assert_eq!(pexpireat.args[2], b"61000");
    assert_eq!(records[2].db, 1);
}

#[test]
fn multi_exec_transaction_replays_as_one_block() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("appendonly.aof");
    let cfg = AofConfig {
        state: AofState::On,
        fsync: FsyncPolicy::No,
        ..AofConfig::default()
    };
    let mut writer = AofWriter::open(&path, cfg.clone()).unwrap();
    writer.append(0, &[b"MULTI".to_vec()], 0);
    writer.append(0, &[b"SET".to_vec(), b"a".to_vec(), b"1".to_vec()], 0);
    writer.append(0, &[b"SET".to_vec(), b"b".to_vec(), b"2".to_vec()], 0);
    writer.append(0, &[b"EXEC".to_vec()], 0);
    writer.flush().unwrap();

    let records = aof::load(&path, &cfg).unwrap();
    let names: Vec<Vec<u8>> = records.iter().map(|r| r.args[0].clone()).collect();
    assert_eq!(
        names,
        vec![b"MULTI".to_vec(), b"SET".to_vec(), b"SET".to_vec(), b"EXEC".to_vec()]
    );
}

#[test]
fn rewrite_pipeline_produces_a_loadable_minimal_log() {
    let mut db = Database::new();
    db.set_fresh(b"counter".to_vec(), RObject::StrInt(42), 0);
    db.set_fresh(
        b"tags".to_vec(),
        RObject::SetHashtable(std::iter::once(b"rust".to_vec()).collect()),
        0,
    );

    let dir = tempdir().unwrap();
    let temp_path = dir.path().join("temp-rewriteaof-bg-1.aof");
    let live_path = dir.path().join("appendonly.aof");
    aof::write_rewrite_file(&temp_path, &[db]).unwrap();
    aof::rename_into_place(&temp_path, &live_path).unwrap();

    let cfg = AofConfig::default();
    let records = aof::load(&live_path, &cfg).unwrap();
    assert!(records
        .iter()
        .any(|r| r.args[0] == b"SET" && r.args[1] == b"counter" && r.args[2] == b"42"));
    assert!(records
        .iter()
        .any(|r| r.args[0] == b"SADD" && r.args[1] == b"tags"));
}

#[test]
fn encode_decode_handles_binary_safe_bulk_strings() {
    let args = vec![b"SET".to_vec(), b"k".to_vec(), vec![0, 1, 2, 255, b'\r', b'\n']];
    let encoded = command::encode(&args);
    let mut pos = 0;
    let decoded = command::decode(&encoded, &mut pos).unwrap().unwrap();
    assert_eq!(decoded, args);
}
