#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;

use anyhow::anyhow;
use anyhow::Error;
use anyhow::Result;
use yansi::Paint;

use crate::application::cli;
use crate::application::commands;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::RemoteName;
use crate::infrastructure::remotes::RemoteManager;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! Quill has failed with the following app version and error.\n\nVersion: {}\nCommit: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            env!("VERGEN_GIT_DESCRIBE"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
        eprintln!(
            "\nA debug log is written to {} when RUST_LOG=quill is set.",
            cli::debug_log_dir().join("debug.log").to_string_lossy()
        );
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

async fn run() -> Result<()> {
    let invocation = match cli::parse().await? {
        Some(invocation) => invocation,
        None => return Ok(()),
    };

    let remote_name = Config::get(ConfigKey::Remote);
    let remote = match RemoteName::parse(&remote_name) {
        Some(remote) => RemoteManager::get(remote)?,
        None => return Err(anyhow!("Unknown remote: {remote_name}")),
    };
    let debounce = Config::duration(ConfigKey::AutosaveDebounce)?;

    tracing::debug!(remote = %remote_name, ?debounce, "Starting session");
    return commands::run(invocation, remote, debounce).await;
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let file_appender = tracing_appender::rolling::never(cli::debug_log_dir(), "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("quill")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    if let Err(err) = run().await {
        handle_error(err);
    }

    process::exit(0);
}
