use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId {
    value: u64,
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId {
    value: u64,
}

/// Global id of an issue, distinct from its per-repository number
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId {
    value: u64,
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestId {
    value: u64,
}

impl UserId {
    pub fn new(id: u64) -> Self {
        Self { value: id }
    }

    pub fn value(self) -> u64 {
        self.value
    }
}

impl RepositoryId {
    pub fn new(id: u64) -> Self {
        Self { value: id }
    }

    pub fn value(self) -> u64 {
        self.value
    }
}

impl IssueId {
    pub fn new(id: u64) -> Self {
        Self { value: id }
    }

    pub fn value(self) -> u64 {
        self.value
    }
}

impl PullRequestId {
    pub fn new(id: u64) -> Self {
        Self { value: id }
    }

    pub fn value(self) -> u64 {
        self.value
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
