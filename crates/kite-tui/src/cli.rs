use clap::{Args, Parser, Subcommand};
use kite_core::columns::DEFAULT_ALERT_COLUMNS;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kite")]
#[command(about = "Triage on-call alerts and incidents from the terminal", long_about = None)]
pub struct Cli {
    /// Append logs to this file in addition to the log window
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum Commands {
    /// Browse, acknowledge and act on alerts
    Alerts(AlertsArgs),
    /// Show who is on call
    Oncall(OncallArgs),
    /// Show or set the team used by `--assigned-to team`
    Teams(TeamsArgs),
}

#[derive(Args, Debug)]
pub struct AlertsArgs {
    /// Open the alerts of a single incident
    pub incident_id: Option<String>,
    /// self, team, or a user alias from the config file
    #[arg(long, default_value = "self")]
    pub assigned_to: String,
    /// Comma-separated alert columns
    #[arg(long, default_value = DEFAULT_ALERT_COLUMNS)]
    pub columns: String,
    /// JSON snapshot of incident data
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OncallArgs {
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TeamsArgs {
    /// Team id to store
    #[arg(long, requires = "name")]
    pub set: Option<String>,
    /// Team display name
    #[arg(long)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["kite", "alerts"]).expect("parse");
        let Commands::Alerts(args) = cli.command else {
            panic!("expected alerts command");
        };
        assert_eq!(args.assigned_to, "self");
        assert_eq!(args.columns, DEFAULT_ALERT_COLUMNS);
        assert!(args.incident_id.is_none());
    }

    #[test]
    fn global_log_file_and_positional_incident() {
        let cli = Cli::try_parse_from([
            "kite",
            "alerts",
            "Q1ABC",
            "--assigned-to",
            "team",
            "--log-file",
            "/tmp/kite.log",
        ])
        .expect("parse");
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/kite.log")));
        let Commands::Alerts(args) = cli.command else {
            panic!("expected alerts command");
        };
        assert_eq!(args.incident_id.as_deref(), Some("Q1ABC"));
        assert_eq!(args.assigned_to, "team");
    }

    #[test]
    fn teams_set_requires_a_name() {
        assert!(Cli::try_parse_from(["kite", "teams", "--set", "PTEAM"]).is_err());
        assert!(Cli::try_parse_from(["kite", "teams", "--set", "PTEAM", "--name", "SRE"]).is_ok());
    }
}
