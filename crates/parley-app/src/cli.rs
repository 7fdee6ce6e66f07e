use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_config::Parameter;

/// Parley: chat with a text-generation server from the terminal.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding saved conversations.
    #[arg(long, global = true)]
    pub history_dir: Option<PathBuf>,

    /// Log level override (debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive conversation (the default).
    Chat {
        /// Continue a saved conversation.
        #[arg(long)]
        resume: Option<String>,
    },
    /// List saved conversations, newest first.
    List,
    /// Print a saved conversation.
    Show { id: String },
    /// Change the title of a saved conversation.
    Rename { id: String, title: String },
    /// Delete a saved conversation.
    Delete { id: String },
    /// Manage generation endpoints.
    #[command(subcommand)]
    Endpoint(EndpointCommand),
    /// Set a generation parameter (temperature, top_p, max_tokens).
    Set { param: Parameter, value: f64 },
    /// Print the active configuration.
    Config,
    /// Show the system instruction, or replace it.
    System { message: Option<String> },
    /// Send one message to the active endpoint and stream the reply.
    Ping { message: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum EndpointCommand {
    /// List registered endpoints.
    List,
    /// Register an endpoint under a name.
    Add { name: String, url: String },
    /// Forget a registered endpoint.
    Remove { name: String },
    /// Switch to a registered endpoint or a raw address.
    Use { name_or_url: String },
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn chat_is_optional() {
        let args = Args::try_parse_from(["parley"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn parses_set_with_alias() {
        let args = Args::try_parse_from(["parley", "set", "top-p", "0.5"]).unwrap();
        match args.command {
            Some(Command::Set { param, value }) => {
                assert_eq!(param, Parameter::TopP);
                assert_eq!(value, 0.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_parameter() {
        assert!(Args::try_parse_from(["parley", "set", "seed", "1"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["parley", "list", "--history-dir", "/tmp/h", "--log-level", "debug"])
                .unwrap();
        assert_eq!(args.history_dir, Some(PathBuf::from("/tmp/h")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn endpoint_use() {
        let args = Args::try_parse_from(["parley", "endpoint", "use", "GPU box"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Endpoint(EndpointCommand::Use { name_or_url })) if name_or_url == "GPU box"
        ));
    }
}
