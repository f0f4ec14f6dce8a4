//! Link-header pagination

use std::collections::HashSet;

use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::{
    api::GithubClient,
    error::{ClientError, Result},
    request::ApiRequest,
};

impl GithubClient {
    /// Fetch `first` and every page after it, concatenated in server order
    ///
    /// Each page goes through the retry loop on its own, so a transient error
    /// on page N re-sends page N only. A `next` link outside the configured base
    /// URL is rejected before the credential is sent to it.
    pub(crate) async fn paginate<T>(&self, first: Url) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| ClientError::config("base_url", e.to_string()))?;
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(first);
        let mut page: u32 = 0;

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                warn!(url = %url, "Next page points back to a page already fetched, stopping");
                break;
            }

            if page > 0 && !is_under_base(&base, &url) {
                warn!(url = %url, base = %base, "Next page link leaves the API base URL");
                return Err(ClientError::validation(format!(
                    "next page link {url} is outside {base}"
                )));
            }

            page += 1;
            let endpoint = url.path().to_owned();
            let response = self.execute(&ApiRequest::get(url)).await?;
            let batch: Vec<T> = response.decode(&endpoint)?;
            debug!(page, count = batch.len(), endpoint = %endpoint, "Fetched page");

            items.extend(batch);
            next = response.next_page;
        }

        Ok(items)
    }
}

/// Same scheme, host and port as `base`, and a path at or below its path
pub(crate) fn is_under_base(base: &Url, candidate: &Url) -> bool {
    if base.scheme() != candidate.scheme()
        || base.host_str() != candidate.host_str()
        || base.port_or_known_default() != candidate.port_or_known_default()
    {
        return false;
    }

    let prefix = base.path().trim_end_matches('/');
    let path = candidate.path();
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// The `rel="next"` target across all `Link` headers of a response
pub(crate) fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_next_link)
}

/// Extract the `rel="next"` URL from one `Link` header value
///
/// Targets are delimited by `<...>` rather than split on commas because query
/// strings may themselves contain commas.
pub(crate) fn parse_next_link(value: &str) -> Option<Url> {
    let mut rest = value;

    while let Some(open) = rest.find('<') {
        let after_open = &rest[open + 1..];
        let close = after_open.find('>')?;
        let target = &after_open[..close];

        let tail = &after_open[close + 1..];
        let params_end = tail.find('<').unwrap_or(tail.len());
        let params = &tail[..params_end];

        if params.split(';').any(is_rel_next) {
            return Url::parse(target.trim()).ok();
        }
        rest = &tail[params_end..];
    }

    None
}

fn is_rel_next(param: &str) -> bool {
    let Some((key, value)) = param.split_once('=') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("rel")
        && value
            .trim()
            .trim_end_matches(',')
            .trim_matches('"')
            .split_whitespace()
            .any(|rel| rel.eq_ignore_ascii_case("next"))
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn finds_next_among_other_relations() {
        let header = "<https://api.github.com/repositories/1/issues?page=1>; rel=\"prev\", \
                      <https://api.github.com/repositories/1/issues?page=3>; rel=\"next\", \
                      <https://api.github.com/repositories/1/issues?page=9>; rel=\"last\"";
        assert_eq!(
            parse_next_link(header).map(|u| u.to_string()),
            Some("https://api.github.com/repositories/1/issues?page=3".to_owned())
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let header = "<https://api.github.com/user/repos?page=1>; rel=\"first\", \
                      <https://api.github.com/user/repos?page=2>; rel=\"prev\"";
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn commas_inside_target_are_kept() {
        let header = "<https://api.github.com/user/repos?affiliation=owner,collaborator&page=2>; rel=\"next\"";
        let url = parse_next_link(header).unwrap();
        assert_eq!(url.query(), Some("affiliation=owner,collaborator&page=2"));
    }

    #[test]
    fn unquoted_and_multi_valued_rel_is_accepted() {
        assert!(parse_next_link("<https://example.com/a?page=2>; rel=next").is_some());
        assert!(parse_next_link("<https://example.com/a?page=2>; rel=\"next last\"").is_some());
    }

    #[test]
    fn next_links_must_stay_under_the_base_url() {
        let base = Url::parse("https://ghe.example.com/api/v3/").unwrap();
        let under = |raw: &str| is_under_base(&base, &Url::parse(raw).unwrap());

        assert!(under("https://ghe.example.com/api/v3/user/repos?page=2"));
        assert!(under("https://ghe.example.com:443/api/v3/user/repos?page=2"));
        assert!(!under("https://evil.example.com/api/v3/user/repos?page=2"));
        assert!(!under("http://ghe.example.com/api/v3/user/repos?page=2"));
        assert!(!under("https://ghe.example.com:8443/api/v3/user/repos?page=2"));
        assert!(!under("https://ghe.example.com/api/v30/user/repos"));
        assert!(!under("https://ghe.example.com/other"));

        let root = Url::parse("https://api.github.com").unwrap();
        assert!(is_under_base(&root, &Url::parse("https://api.github.com/user/repos?page=2").unwrap()));
    }

    #[test]
    fn reads_link_from_header_map() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("<https://api.github.com/user/repos?page=2>; rel=\"next\""),
        );
        assert!(next_page_url(&headers).is_some());
        assert!(next_page_url(&HeaderMap::new()).is_none());
    }
}
