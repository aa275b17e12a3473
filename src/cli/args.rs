//! Command-line argument parsing

use crate::config::{AuthConfig, RegistryConfig, SyncOptions, DEFAULT_TIMEOUT_SECS};
use crate::error::handlers::ValidationErrorHandler;
use crate::error::{RegistryError, Result};
use crate::registry::reference::{validate_tag, RepositoryName};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "registry-sync")]
#[command(about = "Copy image blobs for a set of tags from one registry to another")]
#[command(version, author)]
pub struct Args {
    /// Source registry
    #[arg(
        long = "source",
        short = 's',
        help = "Source registry URL, e.g. https://registry-1.docker.io"
    )]
    pub source: String,

    /// Destination registry
    #[arg(
        long = "destination",
        short = 'd',
        help = "Destination registry URL"
    )]
    pub destination: String,

    /// Repository to sync
    #[arg(
        long = "repository",
        short = 'r',
        help = "Repository name, e.g. library/alpine"
    )]
    pub repository: String,

    /// Repository name at the destination
    #[arg(
        long = "destination-repository",
        help = "Repository name at the destination (defaults to --repository)"
    )]
    pub destination_repository: Option<String>,

    /// Tags to sync
    #[arg(
        long = "tag",
        short = 't',
        help = "Tag to sync; repeat for several. All source tags when omitted"
    )]
    pub tags: Vec<String>,

    /// Source registry username
    #[arg(
        long = "username",
        short = 'u',
        env = "REGISTRY_USERNAME",
        help = "Username for source registry authentication"
    )]
    pub username: Option<String>,

    /// Source registry password
    #[arg(
        long = "password",
        short = 'p',
        env = "REGISTRY_PASSWORD",
        hide_env_values = true,
        help = "Password for source registry authentication"
    )]
    pub password: Option<String>,

    /// Destination registry username
    #[arg(
        long = "destination-username",
        env = "DESTINATION_REGISTRY_USERNAME",
        help = "Username for destination registry authentication"
    )]
    pub destination_username: Option<String>,

    /// Destination registry password
    #[arg(
        long = "destination-password",
        env = "DESTINATION_REGISTRY_PASSWORD",
        hide_env_values = true,
        help = "Password for destination registry authentication"
    )]
    pub destination_password: Option<String>,

    /// Skip TLS verification
    #[arg(
        long = "skip-tls",
        short = 'k',
        help = "Skip TLS certificate verification"
    )]
    pub skip_tls: bool,

    /// Timeout in seconds for network operations
    #[arg(
        long = "timeout",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Timeout for a single network request in seconds"
    )]
    pub timeout: u64,

    /// Skip blobs the destination already has
    #[arg(
        long = "skip-existing",
        help = "Skip blobs already present at the destination with a matching size"
    )]
    pub skip_existing: bool,

    /// Reuse bearer tokens until they expire
    #[arg(
        long = "cache-tokens",
        help = "Cache bearer tokens per realm, service and scope instead of fetching one per request"
    )]
    pub cache_tokens: bool,

    /// Verbose output
    #[arg(
        long = "verbose",
        short = 'v',
        help = "Enable verbose output"
    )]
    pub verbose: bool,

    /// Quiet output
    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Only print errors"
    )]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate everything that can be checked without touching the network
    pub fn validate(&self) -> Result<()> {
        self.source_registry().validate()?;
        self.destination_registry().validate()?;

        RepositoryName::parse(&self.repository)?;
        RepositoryName::parse(self.destination_repository())?;
        for tag in &self.tags {
            validate_tag(tag)?;
        }

        self.source_auth().validate()?;
        self.destination_auth().validate()?;

        if self.source_registry().address == self.destination_registry().address
            && self.repository == self.destination_repository()
        {
            return Err(RegistryError::Validation(
                "Source and destination refer to the same repository".to_string(),
            ));
        }

        ValidationErrorHandler::validate_timeout(self.timeout)
    }

    pub fn destination_repository(&self) -> &str {
        self.destination_repository.as_deref().unwrap_or(&self.repository)
    }

    pub fn source_registry(&self) -> RegistryConfig {
        RegistryConfig::new(self.source.clone())
            .with_skip_tls(self.skip_tls)
            .with_timeout(self.timeout)
    }

    pub fn destination_registry(&self) -> RegistryConfig {
        RegistryConfig::new(self.destination.clone())
            .with_skip_tls(self.skip_tls)
            .with_timeout(self.timeout)
    }

    pub fn source_auth(&self) -> AuthConfig {
        AuthConfig::new(self.username.clone(), self.password.clone())
    }

    pub fn destination_auth(&self) -> AuthConfig {
        AuthConfig::new(self.destination_username.clone(), self.destination_password.clone())
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            skip_existing: self.skip_existing,
            cache_tokens: self.cache_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "registry-sync",
            "--source",
            "https://source.example",
            "--destination",
            "https://destination.example/",
            "--repository",
            "library/alpine",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert!(args.tags.is_empty());
        assert_eq!(args.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(args.destination_repository(), "library/alpine");
        assert_eq!(args.destination_registry().address, "https://destination.example");
        assert!(!args.sync_options().skip_existing);
        assert!(!args.sync_options().cache_tokens);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_repeated_tags_keep_order() {
        let args = parse(&["-t", "v2", "--tag", "v1", "--skip-existing", "--cache-tokens"]);
        assert_eq!(args.tags, vec!["v2", "v1"]);
        assert!(args.sync_options().skip_existing);
        assert!(args.sync_options().cache_tokens);
    }

    #[test]
    fn test_validation_failures() {
        assert!(parse(&["--tag", ".hidden"]).validate().is_err());
        assert!(parse(&["--destination-repository", "Upper"]).validate().is_err());
        assert!(parse(&["--timeout", "0"]).validate().is_err());
        assert!(parse(&["--destination-password", "secret"]).validate().is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let argv = [
            "registry-sync",
            "-s",
            "https://a.example",
            "-d",
            "https://b.example",
            "-r",
            "lib",
            "-v",
            "-q",
        ];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
