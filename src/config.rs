//! Runtime configuration for the `simdexd` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::{Error, Result};

/// Command-line surface. One flag per knob; combinations are checked by
/// [`Config::validate`] before any index work starts.
#[derive(Debug, Clone, Parser)]
#[command(name = "simdexd", about = "Near-duplicate search over 64-bit SimHash signatures")]
pub struct Config {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Input file: one "<decimal-id> <16-hex-signature>" record per line.
    #[arg(short = 'f', long)]
    pub input: PathBuf,

    /// Serve bounded-Hamming /search queries.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub store: bool,

    /// Serve /topk nearest-neighbour queries.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub vptree: bool,

    /// Hamming bound of the store: 3 or 6.
    #[arg(long, default_value_t = 3)]
    pub size: u32,

    /// Expected number of signatures, used to preallocate tables.
    #[arg(long, default_value_t = 0)]
    pub hashes: usize,

    /// Worker threads for table sorting (defaults to all cores).
    #[arg(long)]
    pub cpus: Option<usize>,

    /// Shard id of this instance; only records with sig mod OF == NO are indexed.
    #[arg(long, default_value_t = 0)]
    pub no: u64,

    /// Total number of shards.
    #[arg(long, default_value_t = 1)]
    pub of: u64,

    /// Use the bucketed small-corpus layout (size 3 only).
    #[arg(long)]
    pub small: bool,

    /// Compress permuted tables into Huffman-delta blocks.
    #[arg(long)]
    pub compress: bool,

    /// Telemetry endpoint; when set, index counters are reported periodically.
    #[arg(long)]
    pub telemetry: Option<String>,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.size != 3 && self.size != 6 {
            return Err(Error::StoreSize(self.size));
        }
        if self.small && self.size != 3 {
            return Err(Error::Config("small store layout requires size 3".into()));
        }
        if self.small && self.compress {
            return Err(Error::Config("small and compressed stores are mutually exclusive".into()));
        }
        if self.of == 0 {
            return Err(Error::Config("shard count (--of) must be at least 1".into()));
        }
        if self.no >= self.of {
            return Err(Error::Config(format!(
                "shard id {} out of range for {} shards",
                self.no, self.of
            )));
        }
        if !self.store && !self.vptree {
            return Err(Error::Config("nothing to serve: both store and vptree disabled".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config::parse_from(["simdexd", "-f", "sigs.txt"])
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = base();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.size, 3);
        assert!(cfg.store && cfg.vptree);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn store_toggles_parse() {
        let cfg = Config::parse_from(["simdexd", "-f", "s", "--store", "false", "--vptree", "true"]);
        assert!(!cfg.store);
        assert!(cfg.vptree);
    }

    #[test]
    fn bad_size_rejected() {
        let mut cfg = base();
        cfg.size = 4;
        assert!(matches!(cfg.validate(), Err(Error::StoreSize(4))));
    }

    #[test]
    fn small_requires_size_3() {
        let mut cfg = base();
        cfg.small = true;
        cfg.size = 6;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn shard_bounds_checked() {
        let mut cfg = base();
        cfg.of = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.no = 4;
        cfg.of = 4;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.no = 3;
        cfg.of = 4;
        assert!(cfg.validate().is_ok());
    }
}
