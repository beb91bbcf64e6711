use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Admin CLI for PAFF partitioned container files
#[derive(Parser, Debug)]
#[command(name = "paff", version, about = "PAFF container CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Write a new container (replaces an existing file)
    Write {
        #[arg(long)]
        path: PathBuf,
        /// Version tag (default: PAFF_VERSION or "1.0")
        #[arg(long)]
        version: Option<String>,
        /// Mode tag (default: PAFF_MODE or "1")
        #[arg(long)]
        mode: Option<String>,
        /// Spare directory padding in bytes, for later in-place inserts
        #[arg(long)]
        slack: Option<usize>,
        /// Literal partition (UTF‑8); repeatable, placed after file partitions
        #[arg(long)]
        text: Vec<String>,
        /// Files whose bytes become partitions, in order
        files: Vec<PathBuf>,
    },
    /// Read one partition
    Get {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        index: i64,
        /// Optional file to write raw partition bytes into
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Insert a partition (default: append)
    Insert {
        #[arg(long)]
        path: PathBuf,
        /// Insert before this index; omitted or >= count appends
        #[arg(long, allow_negative_numbers = true)]
        index: Option<i64>,
        /// Value: literal UTF‑8, "hex:..", "@file" or "-" for stdin
        #[arg(long, conflicts_with = "value_file", required_unless_present = "value_file")]
        value: Option<String>,
        /// Read value bytes from a file
        #[arg(long)]
        value_file: Option<PathBuf>,
        /// Skip the range-insert fast path (always rewrite)
        #[arg(long, default_value_t = false)]
        no_range_insert: bool,
    },
    /// Verify header, directory and every partition checksum
    Validate {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Stop at the first checksum mismatch
        #[arg(long, default_value_t = false)]
        fail_fast: bool,
    },
    /// Container summary: tags, directory, layout
    Status {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
