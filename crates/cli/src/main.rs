//! # CLI — interactive storage engine shell
//!
//! A REPL-style command-line interface for the storage engine. Reads
//! commands from stdin, executes them against an [`engine::Engine`], and
//! prints results to stdout. Suitable for interactive use and for scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! FLUSH              Force flush memtable to a new segment
//! COMPACT            Wait for the background compactor to make progress
//! STATS              Print engine debug info
//! EXIT / QUIT        Shut down gracefully
//! ```
//!
//! Range scans are intentionally not offered here — the engine is a point
//! lookup store.
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! ENGINE_DB_DIR               Database directory        (default: "data")
//! ENGINE_RBTREE_FLUSH_KB      Flush threshold in KiB     (default: 3072 = 3 MiB)
//! ENGINE_BLOCK_SIZE_KB        Block size cap in KiB      (default: 10)
//! ENGINE_BLOCK_COMPRESSION    Enable block compression   (default: "true")
//! ENGINE_COMPACTION_INTERVAL_MS  Compactor tick spacing  (default: 1000)
//! RUST_LOG                      Log level for env_logger (default: off)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! storage engine started (dir=data, segments=0)
//! > SET name Alice
//! OK
//! > GET name
//! Alice
//! > EXIT
//! bye
//! ```
use anyhow::Result;
use config::EngineConfig;
use engine::Engine;
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn config_from_env() -> EngineConfig {
    let rbtree_flush_kb: usize = env_or("ENGINE_RBTREE_FLUSH_KB", "3072")
        .parse()
        .unwrap_or(3072);
    let block_size_kb: u64 = env_or("ENGINE_BLOCK_SIZE_KB", "10").parse().unwrap_or(10);
    let block_compression: bool = env_or("ENGINE_BLOCK_COMPRESSION", "true")
        .parse()
        .unwrap_or(true);
    let compaction_interval_ms: u64 = env_or("ENGINE_COMPACTION_INTERVAL_MS", "1000")
        .parse()
        .unwrap_or(1000);

    EngineConfig {
        rbtree_flush_size: rbtree_flush_kb * 1024,
        block_size: block_size_kb * 1024,
        block_compression,
        compaction_interval: Duration::from_millis(compaction_interval_ms),
        ..EngineConfig::default()
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = env_or("ENGINE_DB_DIR", "data");
    let config = config_from_env();

    let mut engine = Engine::open(&dir, config)?;
    log::info!("engine opened at {} with {} segments", dir, engine.segment_count());

    println!(
        "storage engine started (dir={}, segments={})",
        dir,
        engine.segment_count()
    );
    println!("Commands: SET key value | GET key | DEL key | FLUSH | COMPACT | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "SET" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: SET key value");
                        } else {
                            match engine.put(k.as_bytes(), v.as_bytes()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR set failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: SET key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match engine.get(k.as_bytes()) {
                            Ok(v) => println!("{}", String::from_utf8_lossy(&v)),
                            Err(engine::EngineError::NotFound) => println!("(nil)"),
                            Err(e) => println!("ERR read failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match engine.delete(k.as_bytes()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR del failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "FLUSH" => match engine.force_flush() {
                    Ok(()) => println!("OK (segments={})", engine.segment_count()),
                    Err(e) => println!("ERR flush failed: {}", e),
                },
                "COMPACT" => {
                    // Compaction runs on its own background schedule; this
                    // just gives it one tick interval to make progress and
                    // reports the segment count before and after.
                    let before = engine.segment_count();
                    std::thread::sleep(engine.config().compaction_interval);
                    println!(
                        "OK (segments={} -> {})",
                        before,
                        engine.segment_count()
                    );
                }
                "STATS" => {
                    println!("{:?}", engine);
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    engine.close()?;
    log::info!("engine closed");
    Ok(())
}
