use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument, warn};

use super::types::{FileChange, PullRequestRef, RepoId};
use super::{diff, PrError, PullRequestSource, SEARCH_RESULT_LIMIT};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.diff";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: u32 = 100;

/// GitHub REST client. Requests are sent one at a time; each is awaited
/// before the next goes out.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct PullSummary {
    number: u64,
    title: String,
    user: User,
    merged_at: Option<String>,
}

#[derive(Deserialize)]
struct SearchPullLink {
    merged_at: Option<String>,
}

#[derive(Deserialize)]
struct SearchItem {
    number: u64,
    title: String,
    user: User,
    pull_request: SearchPullLink,
}

#[derive(Deserialize)]
struct SearchPage {
    total_count: u64,
    items: Vec<SearchItem>,
}

impl From<PullSummary> for PullRequestRef {
    fn from(pull: PullSummary) -> Self {
        PullRequestRef {
            number: pull.number,
            author: pull.user.login,
            title: pull.title,
            merged: pull.merged_at.is_some(),
        }
    }
}

impl From<SearchItem> for PullRequestRef {
    fn from(item: SearchItem) -> Self {
        PullRequestRef {
            number: item.number,
            author: item.user.login,
            title: item.title,
            merged: item.pull_request.merged_at.is_some(),
        }
    }
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self, PrError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("github-fame/", env!("CARGO_PKG_VERSION")))
            .build()?;
        if token.is_none() {
            warn!("no GitHub token configured; unauthenticated requests are limited to 60 per hour");
        }
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, PrError> {
        let mut request = self
            .http
            .get(url)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        check_status(url, response.status(), response.headers())?;
        Ok(response)
    }

    /// Fetch one page of JSON along with the `Link` header, if any.
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<(T, Option<String>), PrError> {
        let response = self.get(url, JSON_MEDIA_TYPE).await?;
        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.json::<T>().await?;
        Ok((body, link))
    }

    /// Walk `rel="next"` links starting at `first_url`, one request at a time.
    async fn collect_pages<P, F>(
        &self,
        first_url: String,
        mut items_of: F,
    ) -> Result<Vec<PullRequestRef>, PrError>
    where
        P: DeserializeOwned,
        F: FnMut(P) -> Vec<PullRequestRef>,
    {
        let (first, link) = self.get_page::<P>(&first_url).await?;
        let remaining = link
            .as_deref()
            .and_then(last_page_number)
            .map_or(0, |last| last.saturating_sub(1));
        info!(remaining, "collecting paginated result");

        let mut pulls = items_of(first);
        let mut next = link.as_deref().and_then(next_page_url);
        while let Some(url) = next {
            let (page, link) = self.get_page::<P>(&url).await?;
            pulls.extend(items_of(page));
            debug!(collected = pulls.len(), "fetched page");
            next = link.as_deref().and_then(next_page_url);
        }
        Ok(pulls)
    }

    fn search_url(&self, repo: &RepoId, author: &str, per_page: u32) -> String {
        format!(
            "{}/search/issues?per_page={}&q=is:pr+repo:{}+author:{}",
            self.api_url, per_page, repo, author
        )
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn list_pull_requests(&self, repo: &RepoId) -> Result<Vec<PullRequestRef>, PrError> {
        info!("getting pull requests using the pulls API");
        let url = format!(
            "{}/repos/{}/pulls?state=all&per_page={}",
            self.api_url, repo, PER_PAGE
        );
        self.collect_pages(url, |page: Vec<PullSummary>| {
            page.into_iter().map(PullRequestRef::from).collect()
        })
        .await
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn search_pull_requests(
        &self,
        repo: &RepoId,
        author: &str,
    ) -> Result<Vec<PullRequestRef>, PrError> {
        let (count_page, _) = self
            .get_page::<SearchPage>(&self.search_url(repo, author, 1))
            .await?;
        check_search_ceiling(count_page.total_count)?;

        info!(total = count_page.total_count, "getting pull requests using the search API");
        self.collect_pages(self.search_url(repo, author, PER_PAGE), |page: SearchPage| {
            page.items.into_iter().map(PullRequestRef::from).collect()
        })
        .await
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn fetch_changes(&self, repo: &RepoId, number: u64) -> Result<Vec<FileChange>, PrError> {
        let url = format!("{}/repos/{}/pulls/{}", self.api_url, repo, number);
        let diff_text = self.get(&url, DIFF_MEDIA_TYPE).await?.text().await?;
        debug!(diff_bytes = diff_text.len(), "received PR diff");

        let files = diff::parse_diff(&diff_text)?;
        debug!(parsed_files = files.len(), "parsed diff");
        Ok(files)
    }
}

/// The search API only ever serves the first 1000 results of a query.
pub fn check_search_ceiling(total_count: u64) -> Result<(), PrError> {
    if total_count > SEARCH_RESULT_LIMIT {
        return Err(PrError::SearchOverflow { total_count });
    }
    Ok(())
}

/// Map a non-success response to the matching `PrError`.
fn check_status(url: &str, status: StatusCode, headers: &HeaderMap) -> Result<(), PrError> {
    if status.is_success() {
        return Ok(());
    }

    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
    };

    // Secondary rate limits come as 403 with retry-after and quota to spare.
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (header_u64("x-ratelimit-remaining") == Some(0)
                || headers.contains_key("retry-after")));
    if rate_limited {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let resets_in = header_u64("x-ratelimit-reset")
            .map(|reset| reset.saturating_sub(now))
            .or_else(|| header_u64("retry-after"));
        return Err(PrError::RateLimited {
            limit: header_u64("x-ratelimit-limit"),
            resets_in,
        });
    }

    let url = url.to_string();
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        Err(PrError::InsufficientPrivileges { url })
    } else if status == StatusCode::NOT_FOUND {
        Err(PrError::NotFound { url })
    } else {
        Err(PrError::Status { status, url })
    }
}

/// Pick the `rel="..."` target out of a `Link` header.
fn link_target<'a>(link: &'a str, rel: &str) -> Option<&'a str> {
    let wanted = format!("rel=\"{}\"", rel);
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|param| param.trim() == wanted) {
            return None;
        }
        target
            .trim()
            .strip_prefix('<')
            .and_then(|target| target.strip_suffix('>'))
    })
}

fn next_page_url(link: &str) -> Option<String> {
    link_target(link, "next").map(str::to_string)
}

fn last_page_number(link: &str) -> Option<u32> {
    let last = Url::parse(link_target(link, "last")?).ok()?;
    last.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse::<u32>().ok())
}
