//! Centralized configuration for PAFF containers.
//!
//! Goals:
//! - Single place for tunables instead of scattering env lookups.
//! - PaffConfig::from_env() reads PAFF_* variables; fluent with_* setters override.
//!
//! Env:
//! - PAFF_VERSION       - expected/written version tag (default "1.0")
//! - PAFF_MODE          - expected/written mode tag (default "1")
//! - PAFF_STRICT_TAGS   - reject version/mode mismatch on open (default on)
//! - PAFF_RANGE_INSERT  - allow fallocate range insertion (default on; off => always rewrite)
//! - PAFF_FSYNC         - fsync data/journal/dir on mutations (default on)
//! - PAFF_META_SLACK    - spare bytes of directory padding reserved by write() (default 0)

use std::fmt;

use crate::consts::{DEFAULT_MODE, DEFAULT_VERSION};

#[derive(Clone, Debug)]
pub struct PaffConfig {
    /// Version tag written by `write` and expected on open/validate.
    pub version: String,

    /// Mode tag written by `write` and expected on open/validate.
    pub mode: String,

    /// Fail `open` with a FormatError when version/mode differ from the above.
    /// `validate` always compares them.
    pub strict_tags: bool,

    /// Try the range-insert fast path before falling back to a full rewrite.
    pub range_insert: bool,

    /// fsync after writes (container, journal, parent directory).
    pub fsync: bool,

    /// Directory padding reserved by `write` so that later insertions can grow the
    /// directory in place.
    pub meta_slack: usize,
}

impl Default for PaffConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            mode: DEFAULT_MODE.to_string(),
            strict_tags: true,
            range_insert: true,
            fsync: true,
            meta_slack: 0,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "on" || s == "yes"
    })
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl PaffConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_string("PAFF_VERSION") {
            cfg.version = v;
        }
        if let Some(v) = env_string("PAFF_MODE") {
            cfg.mode = v;
        }
        if let Some(on) = env_flag("PAFF_STRICT_TAGS") {
            cfg.strict_tags = on;
        }
        if let Some(on) = env_flag("PAFF_RANGE_INSERT") {
            cfg.range_insert = on;
        }
        if let Some(on) = env_flag("PAFF_FSYNC") {
            cfg.fsync = on;
        }
        if let Ok(v) = std::env::var("PAFF_META_SLACK") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.meta_slack = n;
            }
        }

        cfg
    }

    pub fn with_version<S: Into<String>>(mut self, v: S) -> Self {
        self.version = v.into();
        self
    }

    pub fn with_mode<S: Into<String>>(mut self, m: S) -> Self {
        self.mode = m.into();
        self
    }

    pub fn with_strict_tags(mut self, on: bool) -> Self {
        self.strict_tags = on;
        self
    }

    pub fn with_range_insert(mut self, on: bool) -> Self {
        self.range_insert = on;
        self
    }

    pub fn with_fsync(mut self, on: bool) -> Self {
        self.fsync = on;
        self
    }

    pub fn with_meta_slack(mut self, bytes: usize) -> Self {
        self.meta_slack = bytes;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }
}

impl fmt::Display for PaffConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PaffConfig {{ version: {}, mode: {}, strict_tags: {}, range_insert: {}, fsync: {}, meta_slack: {} }}",
            self.version, self.mode, self.strict_tags, self.range_insert, self.fsync, self.meta_slack,
        )
    }
}
