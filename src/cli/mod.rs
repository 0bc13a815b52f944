pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ptgen")]
#[command(about = "BBCode description generator for PT sites", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/ptgen/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP endpoint
    Serve {
        /// Listen address, overrides the config file
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Generate a description
    Gen {
        /// Resource link, e.g. https://movie.douban.com/subject/1292052/
        #[arg(required_unless_present_all = ["site", "sid"], conflicts_with_all = ["site", "sid"])]
        url: Option<String>,

        /// Site key (douban, imdb, bangumi, steam, indienova, epic)
        #[arg(long, requires = "sid")]
        site: Option<String>,

        /// Identifier on that site
        #[arg(long, requires = "site")]
        sid: Option<String>,

        /// Print the whole JSON envelope instead of the description
        #[arg(long)]
        json: bool,
    },
    /// Search a source for candidates
    Search {
        query: String,

        /// douban, imdb or bangumi
        #[arg(short, long, default_value = "douban")]
        source: String,
    },
    /// Delete expired entries from the persistent cache
    Purge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_by_url() {
        let cli = Cli::try_parse_from(["ptgen", "gen", "https://bgm.tv/subject/253"]).unwrap();
        match cli.command {
            Commands::Gen { url, site, .. } => {
                assert_eq!(url.as_deref(), Some("https://bgm.tv/subject/253"));
                assert!(site.is_none());
            }
            _ => panic!("expected gen"),
        }
    }

    #[test]
    fn test_gen_requires_target() {
        assert!(Cli::try_parse_from(["ptgen", "gen"]).is_err());
        assert!(Cli::try_parse_from(["ptgen", "gen", "--site", "imdb"]).is_err());
        assert!(Cli::try_parse_from(["ptgen", "gen", "--site", "imdb", "--sid", "tt1"]).is_ok());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["ptgen", "search", "EVA", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Search { ref source, .. } if source == "douban"));
    }
}
