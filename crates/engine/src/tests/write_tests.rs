use super::helpers::segment_count;
use crate::*;
use anyhow::Result;
use config::EngineConfig;
use std::fs;
use tempfile::tempdir;

fn tiny_flush_config() -> EngineConfig {
    EngineConfig {
        rbtree_flush_size: 1,
        ..EngineConfig::default()
    }
}

// --------------------- Basic put / get / delete ---------------------

#[test]
fn put_and_get() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), EngineConfig::default())?;

    engine.put(b"name", b"alice")?;
    assert_eq!(engine.get(b"name")?, b"alice");
    Ok(())
}

#[test]
fn get_missing_key() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), EngineConfig::default())?;

    assert!(matches!(engine.get(b"nope"), Err(EngineError::NotFound)));
    Ok(())
}

#[test]
fn delete_removes_key() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), EngineConfig::default())?;

    engine.put(b"k", b"v")?;
    assert!(engine.get(b"k").is_ok());

    engine.delete(b"k")?;
    assert!(matches!(engine.get(b"k"), Err(EngineError::NotFound)));
    Ok(())
}

#[test]
fn overwrite_key() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), EngineConfig::default())?;

    engine.put(b"k", b"v1")?;
    engine.put(b"k", b"v2")?;
    assert_eq!(engine.get(b"k")?, b"v2");
    Ok(())
}

#[test]
fn put_after_delete_resurrects() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), EngineConfig::default())?;

    engine.put(b"k", b"v1")?;
    engine.delete(b"k")?;
    engine.put(b"k", b"v2")?;
    assert_eq!(engine.get(b"k")?, b"v2");
    Ok(())
}

// --------------------- force_flush ---------------------

#[test]
fn force_flush_empty_memtable_is_noop() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), EngineConfig::default())?;

    let before = engine.segment_count();
    engine.force_flush()?;
    assert_eq!(engine.segment_count(), before, "empty flush should be a no-op");
    Ok(())
}

#[test]
fn force_flush_persists_memtable_data() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut engine = Engine::open(dir.path(), EngineConfig::default())?;
        engine.put(b"key", b"value")?;
        engine.force_flush()?;
        engine.close()?;
        assert_eq!(engine.segment_count(), 1);
    }

    let engine = Engine::open(dir.path(), EngineConfig::default())?;
    assert_eq!(engine.get(b"key")?, b"value");
    Ok(())
}

// --------------------- Drop flushes memtable ---------------------

#[test]
fn drop_flushes_memtable_to_segment() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut engine = Engine::open(dir.path(), EngineConfig::default())?;
        engine.put(b"drop_key", b"drop_val")?;
        // engine drops here, should flush the memtable
    }

    let engine = Engine::open(dir.path(), EngineConfig::default())?;
    assert_eq!(engine.get(b"drop_key")?, b"drop_val");
    assert!(engine.segment_count() >= 1);
    Ok(())
}

// --------------------- Key/value size limits ---------------------

#[test]
fn put_rejects_oversized_key() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), EngineConfig::default())?;

    let big_key = vec![b'k'; block::MAX_KEY_LEN + 1];
    let result = engine.put(&big_key, b"v");
    assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    Ok(())
}

#[test]
fn put_accepts_max_key_size() -> Result<()> {
    let dir = tempdir()?;
    let config = EngineConfig {
        rbtree_flush_size: 1024 * 1024 * 1024,
        ..EngineConfig::default()
    };
    let mut engine = Engine::open(dir.path(), config)?;

    let max_key = vec![b'k'; block::MAX_KEY_LEN];
    engine.put(&max_key, b"v")?;
    assert_eq!(engine.get(&max_key)?, b"v");
    Ok(())
}

// --------------------- Multiple flushes ---------------------

#[test]
fn multiple_flushes_create_multiple_segments() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), tiny_flush_config())?;

    for i in 0..5u64 {
        engine.put(format!("k{i}").as_bytes(), b"v")?;
    }

    assert!(
        segment_count(dir.path()) >= 5,
        "expected multiple segment files, got {}",
        segment_count(dir.path())
    );

    for i in 0..5u64 {
        let key = format!("k{i}");
        assert_eq!(engine.get(key.as_bytes())?, b"v");
    }
    Ok(())
}

// --------------------- Flush mechanics ---------------------

#[test]
fn flush_writes_segment_and_truncates_wal() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path(), tiny_flush_config())?;
    engine.put(b"key1", b"value1")?;

    assert!(segment_count(dir.path()) >= 1, "expected at least one segment file");

    let wal_meta = fs::metadata(dir.path().join("wal.log"))?;
    assert_eq!(wal_meta.len(), 0, "expected wal to be truncated to 0 bytes");
    Ok(())
}

#[test]
fn flush_triggers_at_threshold() -> Result<()> {
    let dir = tempdir()?;
    let config = EngineConfig {
        rbtree_flush_size: 4 * 1024,
        ..EngineConfig::default()
    };
    let mut engine = Engine::open(dir.path(), config)?;

    let value = vec![b'x'; 512];
    let writes = (config.rbtree_flush_size / value.len()) + 5;
    for i in 0..writes {
        engine.put(format!("key{i}").as_bytes(), &value)?;
    }

    assert!(segment_count(dir.path()) >= 1, "expected at least one segment after crossing threshold");
    Ok(())
}
