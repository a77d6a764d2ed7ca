//! Runtime configuration.
//!
//! Every setting can be given as a flag or through the environment. Paths
//! the pipeline touches are all derived from `base_dir`:
//!
//! ```text
//! <base_dir>/
//!   watch_conf.json   # watchlist
//!   repos/<dir>/      # one clone per watched repository
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use clap::builder::NonEmptyStringValueParser;

use crate::webhooks::GITHUB_USER_AGENT_PREFIX;

/// Default skip markers; a head commit message containing any of them
/// suppresses the sync and build.
pub const DEFAULT_SKIP_MARKERS: [&str; 2] = ["[skip build]", "[build skip]"];

/// Name of the clones directory under `base_dir`.
pub const REPOS_DIR_NAME: &str = "repos";

#[derive(Debug, Clone, Parser)]
#[command(name = "push-builder")]
#[command(version, about = "Sync and rebuild watched repositories on push webhooks")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "PUSH_BUILDER_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Directory holding the watchlist and the repos/ clones
    #[arg(long, env = "PUSH_BUILDER_BASE_DIR")]
    pub base_dir: PathBuf,

    /// Watchlist file name, relative to the base directory
    #[arg(long, env = "PUSH_BUILDER_WATCHLIST", default_value = "watch_conf.json")]
    pub watchlist_file: String,

    /// Remote URL template; `{name}` is replaced by the repository name
    #[arg(
        long,
        env = "PUSH_BUILDER_REMOTE_TEMPLATE",
        default_value = "https://github.com/{name}.git"
    )]
    pub remote_template: String,

    /// Secret used for watchlist entries that do not carry their own
    #[arg(long, env = "PUSH_BUILDER_SECRET", hide_env_values = true)]
    pub default_secret: Option<String>,

    /// Commit message marker that suppresses a build (repeatable, non-empty)
    #[arg(
        long = "skip-marker",
        value_parser = NonEmptyStringValueParser::new(),
        default_values_t = DEFAULT_SKIP_MARKERS.map(String::from)
    )]
    pub skip_markers: Vec<String>,

    /// Required prefix of the sender's User-Agent header
    #[arg(long, default_value = GITHUB_USER_AGENT_PREFIX)]
    pub user_agent_prefix: String,

    /// Build command run inside the synced clone
    #[arg(
        long,
        env = "PUSH_BUILDER_BUILD_COMMAND",
        value_delimiter = ' ',
        num_args = 1..,
        default_value = "make"
    )]
    pub build_command: Vec<String>,
}

impl Config {
    /// Configuration rooted at `base_dir` with every other setting at its default.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Config {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            base_dir: base_dir.into(),
            watchlist_file: "watch_conf.json".to_string(),
            remote_template: "https://github.com/{name}.git".to_string(),
            default_secret: None,
            skip_markers: DEFAULT_SKIP_MARKERS.map(String::from).to_vec(),
            user_agent_prefix: GITHUB_USER_AGENT_PREFIX.to_string(),
            build_command: vec!["make".to_string()],
        }
    }

    pub fn watchlist_path(&self) -> PathBuf {
        self.base_dir.join(&self.watchlist_file)
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.base_dir.join(REPOS_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_minimal_args() {
        let config = Config::try_parse_from(["push-builder", "--base-dir", "/srv/hooks"]).unwrap();

        assert_eq!(config.listen, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert_eq!(
            config.watchlist_path(),
            PathBuf::from("/srv/hooks/watch_conf.json")
        );
        assert_eq!(config.repos_dir(), PathBuf::from("/srv/hooks/repos"));
        assert_eq!(config.skip_markers, vec!["[skip build]", "[build skip]"]);
        assert_eq!(config.user_agent_prefix, "GitHub-Hookshot/");
        assert_eq!(config.build_command, vec!["make"]);
        assert_eq!(config.default_secret, None);
    }

    #[test]
    fn with_base_dir_matches_parsed_defaults() {
        let parsed = Config::try_parse_from(["push-builder", "--base-dir", "/srv/hooks"]).unwrap();
        let built = Config::with_base_dir("/srv/hooks");

        assert_eq!(parsed.listen, built.listen);
        assert_eq!(parsed.watchlist_file, built.watchlist_file);
        assert_eq!(parsed.remote_template, built.remote_template);
        assert_eq!(parsed.skip_markers, built.skip_markers);
        assert_eq!(parsed.user_agent_prefix, built.user_agent_prefix);
        assert_eq!(parsed.build_command, built.build_command);
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::try_parse_from([
            "push-builder",
            "--base-dir",
            "/srv/hooks",
            "--listen",
            "127.0.0.1:8080",
            "--skip-marker",
            "[ci skip]",
            "--build-command",
            "make -j4 site",
            "--remote-template",
            "git@github.com:example-org/{name}.git",
        ])
        .unwrap();

        assert_eq!(config.listen, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(config.skip_markers, vec!["[ci skip]"]);
        assert_eq!(config.build_command, vec!["make", "-j4", "site"]);
        assert_eq!(
            config.remote_template,
            "git@github.com:example-org/{name}.git"
        );
    }

    #[test]
    fn base_dir_is_required() {
        assert!(Config::try_parse_from(["push-builder"]).is_err());
    }

    #[test]
    fn empty_skip_marker_is_rejected() {
        let result = Config::try_parse_from([
            "push-builder",
            "--base-dir",
            "/srv/hooks",
            "--skip-marker",
            "",
        ]);
        assert!(result.is_err());
    }
}
