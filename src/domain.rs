use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Serialize};

use crate::{
    client::ClientError,
    id::{IssueId, PullRequestId, RepositoryId, UserId},
};

/// Login GitHub shows for deleted accounts
const GHOST_LOGIN: &str = "ghost";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub login: CompactString,
    pub name: Option<CompactString>,
    pub email: Option<CompactString>,
    pub html_url: CompactString,
    pub public_repos: u32,
}

/// Snapshot of the core request quota
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub remaining: u64,
    pub used: u64,
    pub reset_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: CompactString,
    /// `owner/name`
    pub full_name: CompactString,
    pub description: Option<CompactString>,
    pub is_private: bool,
    pub html_url: CompactString,
    pub language: Option<CompactString>,
    pub star_count: u32,
    pub fork_count: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub id: IssueId,
    pub number: u64,
    pub title: CompactString,
    pub state: IssueState,
    pub author: CompactString,
    pub html_url: CompactString,
    pub labels: Vec<CompactString>,
    pub comments: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub id: PullRequestId,
    pub number: u64,
    pub title: CompactString,
    pub state: PullRequestState,
    pub author: CompactString,
    pub html_url: CompactString,
    pub draft: bool,
    pub head_ref: CompactString,
    pub base_ref: CompactString,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

/// Server-side `state` filter for issue and pull request listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

/// Options shared by issue and pull request listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub state: StateFilter,
}

impl ListOptions {
    pub fn with_state(mut self, state: StateFilter) -> Self {
        self.state = state;
        self
    }
}

impl StateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

impl FromStr for StateFilter {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "all" => Ok(Self::All),
            other => Err(ClientError::validation(format_compact!(
                "unknown state filter {other:?}, expected open, closed or all"
            ))),
        }
    }
}

impl std::fmt::Display for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PullRequestState {
    pub fn is_merged(self) -> bool {
        self == Self::Merged
    }
}

// Wire formats. Every DTO goes through a TryFrom that rejects values the
// typed records cannot hold.

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub login: CompactString,
    pub name: Option<CompactString>,
    pub email: Option<CompactString>,
    pub html_url: CompactString,
    #[serde(default)]
    pub public_repos: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRefDto {
    pub login: CompactString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateBucketDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateBucketDto {
    pub limit: u64,
    pub remaining: u64,
    #[serde(default)]
    pub used: u64,
    /// Epoch seconds
    pub reset: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionsDto {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub pull: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryDto {
    pub id: RepositoryId,
    pub name: CompactString,
    pub full_name: CompactString,
    pub description: Option<CompactString>,
    #[serde(default)]
    pub private: bool,
    pub html_url: CompactString,
    pub language: Option<CompactString>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    pub updated_at: DateTime<Utc>,
    pub owner: Option<UserRefDto>,
    pub permissions: Option<PermissionsDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelDto {
    pub name: CompactString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueDto {
    pub id: IssueId,
    pub number: u64,
    pub title: CompactString,
    pub state: CompactString,
    pub user: Option<UserRefDto>,
    pub html_url: CompactString,
    #[serde(default)]
    pub labels: Vec<LabelDto>,
    #[serde(default)]
    pub comments: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Present when the entry is a pull request
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRefDto {
    #[serde(rename = "ref")]
    pub name: CompactString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestDto {
    pub id: PullRequestId,
    pub number: u64,
    pub title: CompactString,
    pub state: CompactString,
    pub user: Option<UserRefDto>,
    pub html_url: CompactString,
    #[serde(default)]
    pub draft: bool,
    pub head: BranchRefDto,
    pub base: BranchRefDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl RepositoryDto {
    /// Push or admin permission for the authenticated user
    pub fn is_writable(&self) -> bool {
        self.permissions.as_ref().is_some_and(|p| p.admin || p.push)
    }

    /// Owner login matches, ignoring case as GitHub does
    pub fn is_owned_by(&self, login: &str) -> bool {
        self.owner.as_ref().is_some_and(|o| o.login.eq_ignore_ascii_case(login))
    }
}

impl IssueDto {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

fn author_login(user: Option<UserRefDto>) -> CompactString {
    user.map(|u| u.login).unwrap_or_else(|| GHOST_LOGIN.into())
}

fn parse_issue_state(state: &str) -> Result<IssueState, ClientError> {
    match state {
        "open" => Ok(IssueState::Open),
        "closed" => Ok(IssueState::Closed),
        other => Err(ClientError::validation(format_compact!("unknown issue state {other:?}"))),
    }
}

impl TryFrom<UserDto> for AuthenticatedUser {
    type Error = ClientError;

    fn try_from(dto: UserDto) -> Result<Self, Self::Error> {
        if dto.login.trim().is_empty() {
            return Err(ClientError::validation("authenticated user has an empty login"));
        }
        Ok(Self {
            id: dto.id,
            login: dto.login,
            name: dto.name,
            email: dto.email,
            html_url: dto.html_url,
            public_repos: dto.public_repos,
        })
    }
}

impl TryFrom<RateBucketDto> for RateLimitInfo {
    type Error = ClientError;

    fn try_from(dto: RateBucketDto) -> Result<Self, Self::Error> {
        if dto.remaining > dto.limit {
            return Err(ClientError::validation(format_compact!(
                "rate limit reports {} remaining of {}",
                dto.remaining,
                dto.limit
            )));
        }
        let reset_at = Utc.timestamp_opt(dto.reset, 0).single().ok_or_else(|| {
            ClientError::validation(format_compact!("invalid rate limit reset {}", dto.reset))
        })?;
        Ok(Self { limit: dto.limit, remaining: dto.remaining, used: dto.used, reset_at })
    }
}

impl TryFrom<RepositoryDto> for Repository {
    type Error = ClientError;

    fn try_from(dto: RepositoryDto) -> Result<Self, Self::Error> {
        let well_formed = dto
            .full_name
            .split_once('/')
            .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty());
        if !well_formed {
            return Err(ClientError::validation(format_compact!(
                "repository full_name {:?} is not owner/name",
                dto.full_name
            )));
        }
        Ok(Self {
            id: dto.id,
            name: dto.name,
            full_name: dto.full_name,
            description: dto.description,
            is_private: dto.private,
            html_url: dto.html_url,
            language: dto.language,
            star_count: dto.stargazers_count,
            fork_count: dto.forks_count,
            updated_at: dto.updated_at,
        })
    }
}

impl TryFrom<IssueDto> for Issue {
    type Error = ClientError;

    fn try_from(dto: IssueDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: dto.id,
            number: dto.number,
            state: parse_issue_state(&dto.state)?,
            title: dto.title,
            author: author_login(dto.user),
            html_url: dto.html_url,
            labels: dto.labels.into_iter().map(|l| l.name).collect(),
            comments: dto.comments,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
            closed_at: dto.closed_at,
        })
    }
}

impl TryFrom<PullRequestDto> for PullRequest {
    type Error = ClientError;

    fn try_from(dto: PullRequestDto) -> Result<Self, Self::Error> {
        let state = match (parse_issue_state(&dto.state)?, dto.merged_at) {
            (IssueState::Open, _) => PullRequestState::Open,
            (IssueState::Closed, Some(_)) => PullRequestState::Merged,
            (IssueState::Closed, None) => PullRequestState::Closed,
        };
        Ok(Self {
            id: dto.id,
            number: dto.number,
            title: dto.title,
            state,
            author: author_login(dto.user),
            html_url: dto.html_url,
            draft: dto.draft,
            head_ref: dto.head.name,
            base_ref: dto.base.name,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
            closed_at: dto.closed_at,
            merged_at: dto.merged_at,
        })
    }
}
