use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "anchor",
    about = "Lot record anchoring: tamper evidence for mutable records",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API, anchor worker, and ledger observer
    Run(RunArgs),
    /// Compute the fingerprint of a record version
    Fingerprint(FingerprintArgs),
    /// Generate a submitter signing key
    Keygen,
}

#[derive(Args)]
pub struct RunArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the listen address
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct FingerprintArgs {
    /// Lot number (`numero_do_lote`)
    #[arg(long)]
    pub lot: String,
    #[arg(long)]
    pub status: String,
    /// Update timestamp (`dt_update`), exactly as stored
    #[arg(long)]
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run() {
        let cli = Cli::try_parse_from(["anchor", "run"]).unwrap();
        if let Command::Run(args) = cli.command {
            assert!(args.config.is_none());
            assert!(args.bind.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_run_with_config() {
        let cli = Cli::try_parse_from([
            "anchor", "run", "-c", "anchor.toml", "--bind", "0.0.0.0:8080",
        ])
        .unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("anchor.toml")));
            assert_eq!(args.bind.as_deref(), Some("0.0.0.0:8080"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_fingerprint() {
        let cli = Cli::try_parse_from([
            "anchor", "fingerprint", "--lot", "L100", "--status", "received",
            "--updated-at", "2024-01-01T00:00:00",
        ])
        .unwrap();
        if let Command::Fingerprint(args) = cli.command {
            assert_eq!(args.lot, "L100");
            assert_eq!(args.status, "received");
            assert_eq!(args.updated_at, "2024-01-01T00:00:00");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn fingerprint_needs_all_fields() {
        assert!(Cli::try_parse_from(["anchor", "fingerprint", "--lot", "L100"]).is_err());
    }

    #[test]
    fn parse_keygen() {
        let cli = Cli::try_parse_from(["anchor", "keygen"]).unwrap();
        assert!(matches!(cli.command, Command::Keygen));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["anchor", "--verbose", "keygen"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["anchor", "--format", "json", "keygen"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
