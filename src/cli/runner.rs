//! Runner wiring command-line arguments into a sync run

use crate::cli::args::Args;
use crate::config::{AuthConfig, RegistryConfig, SyncOptions};
use crate::error::Result;
use crate::logging::Logger;
use crate::registry::auth::TokenModifier;
use crate::registry::repository::Repository;
use crate::registry::token_cache::TokenCache;
use crate::registry::transport::{HttpTransport, Transport};
use crate::sync::orchestrator::{SyncReport, Syncer};
use std::sync::Arc;

pub struct Runner {
    args: Args,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Self { args, output }
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<SyncReport> {
        self.output.section("Registry Sync");
        self.args.validate()?;
        let options = self.args.sync_options();

        let source = self.repository(
            &self.args.source_registry(),
            &self.args.repository,
            Some(self.args.source_auth()),
            &options,
        )?;

        // Anonymous destinations are used undecorated: pinging upload requests
        // against a registry without auth would not answer 200 or 401.
        let destination_auth = self.args.destination_auth();
        let destination = self.repository(
            &self.args.destination_registry(),
            self.args.destination_repository(),
            destination_auth.has_credentials().then_some(destination_auth),
            &options,
        )?;

        self.output.info(&format!(
            "Source: {}/{}",
            self.args.source_registry().address,
            source.name()
        ));
        self.output.info(&format!(
            "Destination: {}/{}",
            self.args.destination_registry().address,
            destination.name()
        ));

        let syncer = Syncer::new(options, self.output.clone());
        let tags = syncer.resolve_tags(&source, &self.args.tags).await?;
        let report = syncer.sync(&source, &destination, &tags).await?;

        self.output.summary_kv(
            "Sync Summary",
            &[
                ("Tags", report.tags.join(", ")),
                ("Blobs copied", report.blobs_copied.to_string()),
                ("Blobs skipped", report.blobs_skipped.to_string()),
                ("Transferred", self.output.format_size(report.bytes_transferred)),
                ("Elapsed", self.output.format_duration(report.elapsed)),
            ],
        );

        Ok(report)
    }

    fn repository(
        &self,
        registry: &RegistryConfig,
        name: &str,
        auth: Option<AuthConfig>,
        options: &SyncOptions,
    ) -> Result<Repository> {
        let transport = self.transport(registry, auth, options)?;
        Repository::new(name, None, &registry.address, transport, self.output.clone())
    }

    /// HTTP client for `registry`, decorated with the bearer handshake when `auth`
    /// is given
    fn transport(
        &self,
        registry: &RegistryConfig,
        auth: Option<AuthConfig>,
        options: &SyncOptions,
    ) -> Result<Arc<dyn HttpTransport>> {
        let client: Arc<dyn HttpTransport> = Arc::new(registry.build_client()?);

        let Some(auth) = auth else {
            return Ok(client);
        };

        let modifier =
            TokenModifier::new(auth, client.clone(), self.output.clone()).with_cache(token_cache(options));

        Ok(Arc::new(
            Transport::new(client, self.output.clone()).with_modifier(Arc::new(modifier)),
        ))
    }
}

/// Shared cache for one transport's tokens, when caching is enabled
fn token_cache(options: &SyncOptions) -> Option<TokenCache> {
    options.cache_tokens.then(TokenCache::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cache_follows_options() {
        assert!(token_cache(&SyncOptions::default()).is_none());

        let options = SyncOptions {
            cache_tokens: true,
            ..Default::default()
        };
        assert!(token_cache(&options).is_some_and(|cache| cache.is_empty()));
    }
}
