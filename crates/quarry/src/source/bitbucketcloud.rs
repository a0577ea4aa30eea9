//! Bitbucket Cloud repository source.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use super::config::{ConnectionConfig, GitUrlType, parse_base_url};
use super::errors::SourceError;
use super::exclude::ExclusionFilter;
use super::fetch::{FetchOptions, Listing, fetch_all};
use super::progress::ProgressCallback;
use super::Source;
use crate::bitbucketcloud::{self, Client, SERVICE_TYPE};
use crate::extsvc::{ExternalRepoSpec, ExternalService};
use crate::http::{HttpTransport, IDLE_CONNECTION_TIMEOUT, ReqwestTransport};
use crate::rate_limit::ApiRateLimiter;
use crate::repo::{Repo, SourceInfo};
use crate::reposource::bitbucket_cloud_repo_name;
use crate::retry::RetryConfig;

/// Lists the repositories visible to one Bitbucket Cloud connection.
///
/// All configuration is validated by [`BitbucketCloudSource::new`]; listing
/// and mapping never fail on configuration.
#[derive(Debug)]
pub struct BitbucketCloudSource {
    svc: ExternalService,
    config: ConnectionConfig,
    /// Normalized web URL of the host.
    base_url: Url,
    /// Host name of `base_url`, lower-cased, without port. Used for repo
    /// names and SSH clone URLs.
    host: String,
    client: Client,
    filter: ExclusionFilter,
    options: FetchOptions,
}

impl BitbucketCloudSource {
    /// Build a source for `svc`.
    ///
    /// When `transport` is `None` a [`ReqwestTransport`] with the default idle
    /// connection timeout is created.
    pub fn new(
        svc: ExternalService,
        config: ConnectionConfig,
        transport: Option<Arc<dyn HttpTransport>>,
    ) -> Result<Self, SourceError> {
        let base_url = parse_base_url("url", &config.url)?;
        let api_url = parse_base_url("api_url", &config.api_url)?;
        let host = base_url.host_str().unwrap_or_default().to_string();

        if config.page_size == 0 {
            return Err(SourceError::InvalidPageSize);
        }

        let filter = ExclusionFilter::new(&config.exclude)?;

        let transport = match transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::with_idle_timeout(IDLE_CONNECTION_TIMEOUT)?),
        };

        let mut client = Client::new(api_url, &config.username, &config.app_password, transport);
        if let Some(rps) = config.requests_per_second {
            client = client.with_rate_limiter(ApiRateLimiter::new(rps));
        }

        let options = FetchOptions {
            page_size: config.page_size,
        };

        Ok(Self {
            svc,
            config,
            base_url,
            host,
            client,
            filter,
            options,
        })
    }

    /// Override how rate-limited page requests are retried.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.client = self.client.with_retry_config(retry);
        self
    }

    /// Normalized web URL of the host.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Queries walked on every listing.
    pub fn queries(&self) -> Vec<String> {
        self.config.queries()
    }

    /// List every unique, non-excluded git repository of this connection.
    ///
    /// Failed queries do not abort the listing; their errors are returned in
    /// [`Listing::error`] next to everything that was fetched.
    #[tracing::instrument(skip_all, fields(service = %self.svc.urn()))]
    pub async fn list_repos(
        &self,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Listing<Repo> {
        let queries = self.queries();
        let listing = fetch_all(
            Arc::new(self.client.clone()),
            &queries,
            &self.options,
            &self.filter,
            cancel,
            on_progress,
        )
        .await;

        info!(
            queries = queries.len(),
            repos = listing.repos.len(),
            errors = listing.error.as_ref().map_or(0, |e| e.len()),
            "Listed repositories"
        );

        listing.map(|entity| self.make_repo(&entity))
    }

    /// Map a provider repository to the canonical record.
    pub fn make_repo(&self, entity: &bitbucketcloud::Repo) -> Repo {
        let urn = self.svc.urn();

        let mut sources = BTreeMap::new();
        sources.insert(
            urn.clone(),
            SourceInfo {
                id: urn,
                clone_url: self.authenticated_remote_url(entity),
            },
        );

        Repo {
            name: bitbucket_cloud_repo_name(
                &self.config.repository_path_pattern,
                &self.host,
                &entity.full_name,
            ),
            uri: bitbucket_cloud_repo_name("", &self.host, &entity.full_name),
            description: entity.name.clone(),
            external_repo: ExternalRepoSpec {
                id: entity.uuid.clone(),
                service_type: SERVICE_TYPE.to_string(),
                service_id: self.base_url.to_string(),
            },
            fork: entity.parent.is_some(),
            enabled: true,
            sources,
            metadata: serde_json::to_value(entity).unwrap_or_default(),
        }
    }

    /// Clone URL for `entity` under the connection's clone style.
    ///
    /// SSH URLs never carry credentials. HTTPS URLs embed the username and
    /// app password when the provider supplies a usable `https` clone link,
    /// and fall back to an anonymous URL otherwise.
    pub fn authenticated_remote_url(&self, entity: &bitbucketcloud::Repo) -> String {
        match self.config.git_url_type {
            GitUrlType::Ssh => format!("git@{}:{}.git", self.host, entity.full_name),
            GitUrlType::Http => self.https_clone_url(entity).unwrap_or_else(|| {
                warn!(
                    repo = %entity.full_name,
                    link = ?entity.links.clone.https(),
                    "No usable HTTPS clone link, using anonymous URL"
                );
                self.anonymous_https_url(&entity.full_name)
            }),
        }
    }

    /// `https://<host>[:port]/<full_name>` on the configured web host,
    /// without credentials.
    fn anonymous_https_url(&self, full_name: &str) -> String {
        let mut url = self.base_url.clone();
        // Switching between special schemes cannot fail.
        let _ = url.set_scheme("https");
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_path(full_name);
        url.set_query(None);
        url.set_fragment(None);
        url.into()
    }

    fn https_clone_url(&self, entity: &bitbucketcloud::Repo) -> Option<String> {
        let href = entity.links.clone.https()?;
        let mut url = Url::parse(href).ok()?;
        url.set_username(&self.config.username).ok()?;
        url.set_password(Some(&self.config.app_password)).ok()?;
        Some(url.into())
    }
}

#[async_trait]
impl Source for BitbucketCloudSource {
    async fn list_repos(
        &self,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Listing<Repo> {
        BitbucketCloudSource::list_repos(self, cancel, on_progress).await
    }

    fn external_services(&self) -> Vec<ExternalService> {
        vec![self.svc.clone()]
    }
}
