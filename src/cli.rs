use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::ConfigOverrides;

/// Dashboard and collection server for tasks, projects and objectives.
/// Settings come from the config file; the flags below override it.
#[derive(Parser)]
#[command(name = "tb", version, about = "Tasks, projects and objectives dashboard")]
pub struct Cli {
    /// Config file (default: $TASKBOARD_CONFIG or ~/.config/taskboard/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file used by `serve`.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Server base URL used by the dashboard and the item commands.
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        let (listen, delete_policy) = match &self.command {
            Commands::Serve { listen, delete_policy } => (listen.clone(), *delete_policy),
            _ => (None, None),
        };
        ConfigOverrides {
            database: self.db.clone(),
            listen,
            base_url: self.url.clone(),
            delete_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{DeletePolicy, EntityKind, Status};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_become_overrides() {
        let cli = Cli::parse_from([
            "tb",
            "--db",
            "/tmp/x.db",
            "serve",
            "--listen",
            "0.0.0.0:9000",
            "--delete-policy",
            "strict",
        ]);
        let o = cli.overrides();
        assert_eq!(o.database, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(o.listen.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(o.delete_policy, Some(DeletePolicy::Strict));
        assert_eq!(o.base_url, None);
    }

    #[test]
    fn global_url_applies_to_item_commands() {
        let cli = Cli::parse_from(["tb", "list", "project", "--url", "http://h:1"]);
        assert_eq!(cli.overrides().base_url.as_deref(), Some("http://h:1"));
        match cli.command {
            Commands::List { kind, .. } => assert_eq!(kind, EntityKind::Project),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn status_flag_accepts_display_spelling() {
        let cli = Cli::parse_from(["tb", "list", "task", "--status", "In Progress"]);
        match cli.command {
            Commands::List { status, .. } => assert_eq!(status, Some(Status::InProgress)),
            _ => panic!("expected list"),
        }
        assert!(Cli::try_parse_from(["tb", "list", "task", "--status", "blocked"]).is_err());
    }
}
