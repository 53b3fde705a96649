use std::path::PathBuf;

use clap::Parser;

/// voxpair device pairing agent
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not announce that the device is unpaired before showing the code
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit once the device identity has been saved
    #[arg(long)]
    pub exit_when_paired: bool,

    /// Directory for log files (defaults to the platform data dir)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Only log to stdout
    #[arg(long)]
    pub no_file_log: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_loud_and_long_running() {
        let cli = Cli::try_parse_from(["voxpair"]).unwrap();
        assert!(!cli.quiet);
        assert!(!cli.exit_when_paired);
        assert!(!cli.no_file_log);
        assert!(cli.log_dir.is_none());
    }

    #[test]
    fn flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "voxpair",
            "--config",
            "/etc/voxpair.toml",
            "--quiet",
            "--exit-when-paired",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/voxpair.toml")));
        assert!(cli.quiet);
        assert!(cli.exit_when_paired);
    }
}
