//! Index construction from signature files, and the hot-swap handle.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::store::{self, Store};
use crate::vptree::{Item, VpTree};
use crate::Result;

// ============================================================================
// Index — one immutable snapshot
// ============================================================================

/// Everything a query needs, frozen at build time. Requests hold an `Arc`
/// to exactly one `Index` for their whole lifetime, so a reload can never
/// tear a response.
pub struct Index {
    pub store: Option<Box<dyn Store>>,
    pub vptree: Option<VpTree>,
    /// Records indexed (post shard filter).
    pub records: u64,
    /// Lines skipped as unparseable.
    pub skipped: u64,
}

impl Index {
    pub fn corrupt_blocks(&self) -> u64 {
        self.store.as_ref().map_or(0, |s| s.corrupt_blocks())
    }
}

// ============================================================================
// IndexHandle — the process-wide publication slot
// ============================================================================

/// Holder of the current index. Readers sample once per request with
/// [`snapshot`]; a rebuild publishes a whole new index with [`publish`]
/// and the old one is dropped when its last in-flight reader finishes.
///
/// [`snapshot`]: IndexHandle::snapshot
/// [`publish`]: IndexHandle::publish
pub struct IndexHandle {
    current: RwLock<Arc<Index>>,
}

impl IndexHandle {
    pub fn new(initial: Index) -> Self {
        Self { current: RwLock::new(Arc::new(initial)) }
    }

    pub fn snapshot(&self) -> Arc<Index> {
        self.current.read().clone()
    }

    pub fn publish(&self, next: Index) {
        *self.current.write() = Arc::new(next);
    }
}

// ============================================================================
// Building
// ============================================================================

/// Scan the configured input file and build a fresh index.
///
/// Record format is one `<decimal-id> <16-hex-signature>` pair per line.
/// Unparseable lines are warned and skipped, never fatal. When sharded,
/// only records with `sig % of == no` are kept.
pub fn build_index(cfg: &Config) -> Result<Index> {
    let started = Instant::now();
    let file = File::open(&cfg.input)?;
    let reader = BufReader::new(file);

    let mut store = if cfg.store {
        Some(store::for_config(cfg.size, cfg.small, cfg.compress, cfg.hashes)?)
    } else {
        None
    };
    let mut items: Vec<Item> = Vec::with_capacity(if cfg.vptree { cfg.hashes } else { 0 });

    let mut records = 0u64;
    let mut skipped = 0u64;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let Some((id, sig)) = parse_record(&line) else {
            warn!(line = lineno + 1, "skipping unparseable record");
            skipped += 1;
            continue;
        };
        if sig % cfg.of != cfg.no {
            continue;
        }

        if let Some(s) = store.as_mut() {
            s.add(sig, id);
        }
        if cfg.vptree {
            items.push(Item { sig, id });
        }
        records += 1;
    }

    if let Some(s) = store.as_mut() {
        s.finish();
    }
    let vptree = if cfg.vptree { Some(VpTree::new(items)) } else { None };

    info!(
        records,
        skipped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "index built"
    );

    Ok(Index { store, vptree, records, skipped })
}

/// Parse one input line; `None` for anything that is not an id followed by
/// a hex signature. Trailing fields are ignored.
fn parse_record(line: &str) -> Option<(u64, u64)> {
    let mut fields = line.split_whitespace();
    let id = fields.next()?.parse().ok()?;
    let sig = u64::from_str_radix(fields.next()?, 16).ok()?;
    Some((id, sig))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn config_for(path: &std::path::Path) -> Config {
        Config::parse_from(["simdexd", "-f", path.to_str().expect("utf-8 temp path")])
    }

    fn input_file(lines: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(lines.as_bytes()).expect("write");
        f
    }

    #[test]
    fn parses_id_and_hex_signature() {
        assert_eq!(parse_record("42 00000000deadbeef"), Some((42, 0xdeadbeef)));
        assert_eq!(parse_record("7 ffffffffffffffff"), Some((7, u64::MAX)));
        // Trailing fields are tolerated.
        assert_eq!(parse_record("1 ff extra"), Some((1, 0xff)));
    }

    #[test]
    fn rejects_malformed_records() {
        assert_eq!(parse_record(""), None);
        assert_eq!(parse_record("42"), None);
        assert_eq!(parse_record("42 0xGG"), None);
        assert_eq!(parse_record("notanid ff"), None);
    }

    #[test]
    fn bad_line_is_skipped_and_rest_indexed() {
        let f = input_file("42 0xGG\n7 00000000cafebabe\n");
        let idx = build_index(&config_for(f.path())).expect("build");

        assert_eq!(idx.records, 1);
        assert_eq!(idx.skipped, 1);
        let store = idx.store.as_ref().expect("store enabled by default");
        assert_eq!(store.find(0xcafebabe), vec![7]);
    }

    #[test]
    fn shard_filter_applies() {
        let f = input_file("1 0000000000000002\n2 0000000000ff0001\n");
        let mut cfg = config_for(f.path());
        cfg.no = 0;
        cfg.of = 2;
        let idx = build_index(&cfg).expect("build");

        // Only the even signature lands in shard 0 of 2.
        assert_eq!(idx.records, 1);
        let store = idx.store.as_ref().expect("store");
        assert_eq!(store.find(0x2), vec![1]);
        assert!(store.find(0xff0001).is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let cfg = config_for(std::path::Path::new("/definitely/not/here.txt"));
        assert!(build_index(&cfg).is_err());
    }

    #[test]
    fn handle_swaps_whole_snapshots() {
        let f = input_file("1 00000000000000aa\n");
        let handle = IndexHandle::new(build_index(&config_for(f.path())).expect("build"));
        let before = handle.snapshot();

        let f2 = input_file("2 00000000000000bb\n");
        handle.publish(build_index(&config_for(f2.path())).expect("rebuild"));
        let after = handle.snapshot();

        // The old snapshot still answers from the old corpus.
        assert_eq!(before.store.as_ref().expect("store").find(0xaa), vec![1]);
        assert_eq!(after.store.as_ref().expect("store").find(0xbb), vec![2]);
        assert!(after.store.as_ref().expect("store").find(0xaa).is_empty());
    }
}
