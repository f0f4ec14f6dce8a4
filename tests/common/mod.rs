#![allow(dead_code)]

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

use gh_client::client::{ClientConfig, GithubClient, Sleeper};
use serde_json::{Value, json};
use wiremock::MockServer;

/// Records requested waits and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.waits.lock().unwrap().push(duration);
        Box::pin(std::future::ready(()))
    }
}

pub fn config_for(server: &MockServer, max_retries: u32) -> ClientConfig {
    ClientConfig::new("test-token")
        .with_base_url(server.uri())
        .with_max_retries(max_retries)
        .with_retry_delay(Duration::from_millis(1))
}

pub fn client_for(server: &MockServer, max_retries: u32) -> (GithubClient, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = GithubClient::new(config_for(server, max_retries))
        .unwrap()
        .with_sleeper(sleeper.clone());
    (client, sleeper)
}

pub fn user_json(login: &str) -> Value {
    json!({
        "id": 583231,
        "login": login,
        "name": "The Octocat",
        "email": null,
        "html_url": format!("https://github.com/{login}"),
        "public_repos": 8
    })
}

pub fn repo_json(id: u64, owner: &str, name: &str, push: bool) -> Value {
    json!({
        "owner": { "login": owner },
        "id": id,
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "description": null,
        "private": false,
        "html_url": format!("https://github.com/{owner}/{name}"),
        "language": "Rust",
        "stargazers_count": 3,
        "forks_count": 1,
        "updated_at": "2024-05-01T12:00:00Z",
        "permissions": { "admin": false, "push": push, "pull": true }
    })
}

pub fn issue_json(number: u64, is_pull_request: bool) -> Value {
    let mut issue = json!({
        "id": 1000 + number,
        "number": number,
        "title": format!("Issue {number}"),
        "state": "open",
        "user": { "login": "octocat" },
        "html_url": format!("https://github.com/octo/hello/issues/{number}"),
        "labels": [{ "name": "bug" }],
        "comments": 2,
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-02T12:00:00Z",
        "closed_at": null
    });
    if is_pull_request {
        issue["pull_request"] = json!({ "url": format!("https://api.github.com/repos/octo/hello/pulls/{number}") });
    }
    issue
}

pub fn pull_json(number: u64, state: &str, merged_at: Option<&str>) -> Value {
    json!({
        "id": 2000 + number,
        "number": number,
        "title": format!("Pull {number}"),
        "state": state,
        "user": { "login": "octocat" },
        "html_url": format!("https://github.com/octo/hello/pull/{number}"),
        "draft": false,
        "head": { "ref": "feature" },
        "base": { "ref": "main" },
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-02T12:00:00Z",
        "closed_at": merged_at,
        "merged_at": merged_at
    })
}

/// `Link` header pointing at `path_and_query` on the mock server
pub fn next_link(server: &MockServer, path_and_query: &str) -> String {
    format!("<{}{path_and_query}>; rel=\"next\"", server.uri())
}
