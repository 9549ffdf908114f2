use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "discord-channel-mirror",
    version,
    about = "One-way message mirror between Discord channels"
)]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Keep running and repeat the mirror pass on an interval.
    #[arg(long)]
    pub watch: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mirror every remote guild channel into its same-id local counterpart.
    Guilds {
        /// Guild that receives the copies.
        local: String,
        /// Guild the messages are read from.
        remote: String,
    },
    /// Mirror one remote channel into one local channel.
    Channels {
        /// Channel that receives the copies.
        local: String,
        /// Channel the messages are read from.
        remote: String,
    },
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parses_channel_mirror_invocation() {
        let cli = Cli::try_parse_from(["discord-channel-mirror", "channels", "100", "200"])
            .expect("parses");

        assert!(!cli.watch);
        assert!(cli.config.is_none());
        let Command::Channels { local, remote } = cli.command else {
            panic!("expected the channels subcommand");
        };
        assert_eq!(local, "100");
        assert_eq!(remote, "200");
    }

    #[test]
    fn parses_guild_mirror_with_watch_and_config() {
        let cli = Cli::try_parse_from([
            "discord-channel-mirror",
            "--watch",
            "--config",
            "mirror.yaml",
            "guilds",
            "10",
            "20",
        ])
        .expect("parses");

        assert!(cli.watch);
        assert_eq!(cli.config.as_deref(), Some(Path::new("mirror.yaml")));
        assert!(matches!(cli.command, Command::Guilds { .. }));
    }

    #[test]
    fn rejects_missing_source_identifiers() {
        assert!(Cli::try_parse_from(["discord-channel-mirror", "channels", "100"]).is_err());
    }

    #[test]
    fn rejects_invocation_without_subcommand() {
        assert!(Cli::try_parse_from(["discord-channel-mirror"]).is_err());
    }
}
