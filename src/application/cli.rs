#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::env;
use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use super::repl::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentStatus;
use crate::domain::models::RemoteName;

/// Work that needs a connected workspace, resolved from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    List,
    New {
        title: String,
    },
    Edit {
        id: DocumentId,
        title: Option<String>,
        content_file: Option<path::PathBuf>,
        status: Option<DocumentStatus>,
    },
    Delete {
        id: DocumentId,
    },
    Ask {
        prompt: String,
        image: Option<path::PathBuf>,
        insert_into: Option<DocumentId>,
    },
    Open {
        id: Option<DocumentId>,
    },
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

pub fn debug_log_dir() -> path::PathBuf {
    if let Ok(dir) = env::var("QUILL_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("quill");
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn arg_id(required: bool) -> Arg {
    return Arg::new("id")
        .short('i')
        .long("id")
        .help("Document ID")
        .num_args(1)
        .required(required);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Quill")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Quill with environment variable RUST_LOG=quill")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_edit() -> Command {
    return Command::new("edit")
        .about("Edit a document and wait for the change to be saved.")
        .arg(arg_id(true))
        .arg(
            Arg::new("title")
                .short('t')
                .long("title")
                .help("New title.")
                .num_args(1),
        )
        .arg(
            Arg::new("content-file")
                .long("content-file")
                .help("Path to a JSON editor snapshot that replaces the document content.")
                .num_args(1)
                .value_parser(value_parser!(path::PathBuf)),
        )
        .arg(
            Arg::new("status")
                .short('s')
                .long("status")
                .help("New publication status.")
                .num_args(1)
                .value_parser(PossibleValuesParser::new(DocumentStatus::VARIANTS)),
        );
}

fn subcommand_ask() -> Command {
    return Command::new("ask")
        .about("Ask the writing assistant and stream its answer to stdout.")
        .arg(
            Arg::new("prompt")
                .short('p')
                .long("prompt")
                .help("What to ask.")
                .num_args(1)
                .default_value(""),
        )
        .arg(
            Arg::new("image")
                .long("image")
                .help("Path to an image sent along with the prompt.")
                .num_args(1)
                .value_parser(value_parser!(path::PathBuf)),
        )
        .arg(
            Arg::new("insert-into")
                .long("insert-into")
                .help("Document ID the answer is appended to once complete.")
                .num_args(1),
        );
}

fn arg_api_url() -> Arg {
    return Arg::new(ConfigKey::ApiUrl.to_string())
        .long(ConfigKey::ApiUrl.to_string())
        .env("QUILL_API_URL")
        .num_args(1)
        .help(format!(
            "Base URL of the document API. [default: {}]",
            Config::default(ConfigKey::ApiUrl)
        ))
        .global(true);
}

fn arg_autosave_debounce() -> Arg {
    return Arg::new(ConfigKey::AutosaveDebounce.to_string())
        .long(ConfigKey::AutosaveDebounce.to_string())
        .env("QUILL_AUTOSAVE_DEBOUNCE")
        .num_args(1)
        .help(format!(
            "Quiet period in milliseconds after the last edit before a document is saved. [default: {}]",
            Config::default(ConfigKey::AutosaveDebounce)
        ))
        .global(true);
}

fn arg_health_check_timeout() -> Arg {
    return Arg::new(ConfigKey::HealthCheckTimeout.to_string())
        .long(ConfigKey::HealthCheckTimeout.to_string())
        .env("QUILL_HEALTH_CHECK_TIMEOUT")
        .num_args(1)
        .help(format!(
            "Time to wait in milliseconds before timing out when checking whether the document API is reachable. [default: {}]",
            Config::default(ConfigKey::HealthCheckTimeout)
        ))
        .global(true);
}

fn arg_remote() -> Arg {
    return Arg::new(ConfigKey::Remote.to_string())
        .short('r')
        .long(ConfigKey::Remote.to_string())
        .env("QUILL_REMOTE")
        .num_args(1)
        .help(format!(
            "Where documents are stored. \"memory\" keeps them in process and needs no server. [default: {}]",
            Config::default(ConfigKey::Remote)
        ))
        .value_parser(PossibleValuesParser::new(RemoteName::VARIANTS))
        .global(true);
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("SESSION {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("quill")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("list").about("List all documents with their ids and status."))
        .subcommand(
            Command::new("new").about("Create a new document.").arg(
                Arg::new("title")
                    .short('t')
                    .long("title")
                    .help("Title of the new document.")
                    .num_args(1)
                    .default_value(""),
            ),
        )
        .subcommand(subcommand_edit())
        .subcommand(
            Command::new("delete")
                .about("Delete a document.")
                .arg(arg_id(true)),
        )
        .subcommand(subcommand_ask())
        .subcommand(
            Command::new("open")
                .about("Start an interactive editing session. Omit passing a document ID to load an interactive selection.")
                .arg(arg_id(false)),
        )
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .arg(arg_api_url())
        .arg(arg_autosave_debounce())
        .arg(arg_health_check_timeout())
        .arg(arg_remote())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("QUILL_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::Username.to_string())
                .short('u')
                .long(ConfigKey::Username.to_string())
                .env("QUILL_USERNAME")
                .num_args(1)
                .help("Your name, shown next to your prompts in the assistant conversation.")
                .global(true),
        );
}

fn get_id(matches: &ArgMatches, name: &str) -> Option<DocumentId> {
    return matches
        .get_one::<String>(name)
        .map(|id| return DocumentId::new(id.trim()));
}

fn get_string(matches: &ArgMatches, name: &str) -> String {
    return matches
        .get_one::<String>(name)
        .map(|e| return e.to_string())
        .unwrap_or_default();
}

/// Turns subcommand arguments into an invocation. `None` for subcommands that
/// do not need a workspace.
pub fn invocation(name: &str, matches: &ArgMatches) -> Result<Option<Invocation>> {
    let res = match name {
        "list" => Invocation::List,
        "new" => Invocation::New {
            title: get_string(matches, "title"),
        },
        "edit" => {
            let id = match get_id(matches, "id") {
                Some(id) => id,
                None => bail!("A document ID is required"),
            };
            let status = match matches.get_one::<String>("status") {
                Some(status) => match DocumentStatus::parse(status) {
                    Some(status) => Some(status),
                    None => bail!("Unknown status {status}"),
                },
                None => None,
            };

            Invocation::Edit {
                id,
                title: matches.get_one::<String>("title").cloned(),
                content_file: matches.get_one::<path::PathBuf>("content-file").cloned(),
                status,
            }
        }
        "delete" => match get_id(matches, "id") {
            Some(id) => Invocation::Delete { id },
            None => bail!("A document ID is required"),
        },
        "ask" => Invocation::Ask {
            prompt: get_string(matches, "prompt"),
            image: matches.get_one::<path::PathBuf>("image").cloned(),
            insert_into: get_id(matches, "insert-into"),
        },
        "open" => Invocation::Open {
            id: get_id(matches, "id"),
        },
        _ => return Ok(None),
    };

    return Ok(Some(res));
}

/// Parses the command line and loads config. Returns what to run, or `None`
/// when the command was fully handled here.
pub async fn parse() -> Result<Option<Invocation>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    let log_path = debug_log_dir().join("debug.log");
                    println!("{}", log_path.to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(None);
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(None);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(None);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(None);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(None);
            }
        },
        Some((name, subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return invocation(name, subcmd_matches);
        }
        None => {
            Config::load(build(), vec![&matches]).await?;
            return Ok(Some(Invocation::Open { id: None }));
        }
    }
}
