use anyhow::Result;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod cmd_get;
mod cmd_insert;
mod cmd_status;
mod cmd_validate;
mod cmd_write;
mod util;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт - info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse_args();
    match cli.cmd {
        cli::Cmd::Write {
            path,
            version,
            mode,
            slack,
            text,
            files,
        } => cmd_write::exec(path, version, mode, slack, text, files),

        cli::Cmd::Get { path, index, out } => cmd_get::exec(path, index, out),

        cli::Cmd::Insert {
            path,
            index,
            value,
            value_file,
            no_range_insert,
        } => cmd_insert::exec(path, index, value, value_file, no_range_insert),

        cli::Cmd::Validate {
            path,
            json,
            fail_fast,
        } => cmd_validate::exec(path, json, fail_fast),

        cli::Cmd::Status { path, json } => cmd_status::exec(path, json),
    }
}
