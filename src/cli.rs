use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SignatureFormat {
    /// Signature file layout, loadable by `check-sigs` and the signatures backend
    Toml,
    /// One JSON object per method
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "doublecheck")]
#[command(about = "Verifies that test doubles behave like the real methods they replace", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the nearest .doublecheck.toml)
    #[arg(long, global = true, env = "DOUBLECHECK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Infer method signatures from recorded real calls
    Infer {
        /// Recording of real calls
        #[arg(long)]
        calls: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: SignatureFormat,
    },

    /// Verify recorded mocked calls against recorded real calls
    Verify {
        /// Recording of real calls
        #[arg(long)]
        real: PathBuf,

        /// Recording of mocked calls
        #[arg(long)]
        mocks: PathBuf,

        /// Type-check mocked calls against signatures inferred from real calls
        #[arg(long = "type-check")]
        type_check: bool,

        /// Directory of declared signatures consulted before inferred ones
        #[arg(long = "sig-dir")]
        sig_dir: Vec<PathBuf>,

        /// Skip mock contract verification
        #[arg(long = "no-contracts")]
        no_contracts: bool,
    },

    /// Validate the signature files in a directory
    CheckSigs {
        /// Signature directory
        #[arg(long)]
        dir: PathBuf,
    },

    /// Initialize a .doublecheck.toml configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_verify_command() {
        let cli = Cli::parse_from([
            "doublecheck",
            "verify",
            "--real",
            "real.json",
            "--mocks",
            "mocks.json",
            "--type-check",
        ]);

        match cli.command {
            Commands::Verify {
                real,
                mocks,
                type_check,
                no_contracts,
                sig_dir,
            } => {
                assert_eq!(real, PathBuf::from("real.json"));
                assert_eq!(mocks, PathBuf::from("mocks.json"));
                assert!(type_check);
                assert!(!no_contracts);
                assert!(sig_dir.is_empty());
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_cli_parsing_infer_defaults_to_toml() {
        let cli = Cli::parse_from(["doublecheck", "infer", "--calls", "calls.json"]);

        match cli.command {
            Commands::Infer { calls, format } => {
                assert_eq!(calls, PathBuf::from("calls.json"));
                assert_eq!(format, SignatureFormat::Toml);
            }
            _ => panic!("Expected Infer command"),
        }
    }

    #[test]
    fn test_cli_parsing_global_config() {
        let cli = Cli::parse_from(["doublecheck", "check-sigs", "--dir", "sig", "--config", "ci.toml"]);

        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        assert!(matches!(cli.command, Commands::CheckSigs { dir } if dir == PathBuf::from("sig")));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        let result = Cli::try_parse_from(["doublecheck", "infer", "--calls", "c.json", "--format", "yaml"]);
        assert!(result.is_err());
    }
}
