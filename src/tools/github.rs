use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::CapabilityError;
use crate::shared::config::ToolsConfig;
use crate::tools::model::{
    ApiReply, Capability, CapabilityOutput, ParameterSchema, Parameters, param_str, param_u64,
};

const DEFAULT_LIMIT: u64 = 5;
const MAX_LIMIT: u64 = 50;

/// Repository search and lookup against the GitHub REST API.
pub struct GitHubTool {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubTool {
    pub fn new(config: &ToolsConfig) -> Result<Self, CapabilityError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("opsagent"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = &config.github_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| CapabilityError::Other(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiReply, CapabilityError> {
        let url = format!("{}{}", self.api_url, path);
        debug!(%url, "GitHub request");
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| CapabilityError::Decode(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed");
            return Ok(ApiReply::Rejected(format!(
                "GitHub API error ({}): {}",
                status.as_u16(),
                message
            )));
        }
        Ok(ApiReply::Body(body))
    }

    async fn search_repos(
        &self,
        parameters: &Parameters,
    ) -> Result<CapabilityOutput, CapabilityError> {
        let Some(query) = param_str(parameters, "query") else {
            return Ok(CapabilityOutput::failure("Query parameter is required"));
        };
        let sort = param_str(parameters, "sort").unwrap_or("stars");
        let limit = param_u64(parameters, "limit")
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        let mut search = query.to_string();
        if let Some(language) = param_str(parameters, "language") {
            search.push_str(&format!(" language:{language}"));
        }

        let body = match self
            .get_json(
                "/search/repositories",
                &[
                    ("q", search),
                    ("sort", sort.to_string()),
                    ("order", "desc".to_string()),
                    ("per_page", limit.to_string()),
                ],
            )
            .await?
        {
            ApiReply::Body(body) => body,
            ApiReply::Rejected(message) => return Ok(CapabilityOutput::failure(message)),
        };

        let repositories: Vec<Value> = body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().take(limit as usize).map(repo_summary).collect())
            .unwrap_or_default();

        Ok(CapabilityOutput::ok(json!({
            "action": "search_repos",
            "query": query,
            "count": repositories.len(),
            "repositories": repositories,
        })))
    }

    async fn get_repo_info(
        &self,
        parameters: &Parameters,
    ) -> Result<CapabilityOutput, CapabilityError> {
        let Some(repo_name) = param_str(parameters, "repo_name").filter(|r| r.contains('/')) else {
            return Ok(CapabilityOutput::failure(
                "repo_name parameter is required in the form 'owner/repo'",
            ));
        };

        let repo = match self.get_json(&format!("/repos/{repo_name}"), &[]).await? {
            ApiReply::Body(body) => body,
            ApiReply::Rejected(message) => return Ok(CapabilityOutput::failure(message)),
        };

        let mut repository = repo_summary(&repo);
        if let Some(summary) = repository.as_object_mut() {
            let extra = [
                "watchers_count",
                "open_issues_count",
                "created_at",
                "updated_at",
                "topics",
            ];
            for key in extra {
                summary.insert(
                    key.trim_end_matches("_count").to_string(),
                    repo.get(key).cloned().unwrap_or(Value::Null),
                );
            }
        }

        Ok(CapabilityOutput::ok(json!({
            "action": "get_repo_info",
            "repository": repository,
        })))
    }

    async fn get_user_info(
        &self,
        parameters: &Parameters,
    ) -> Result<CapabilityOutput, CapabilityError> {
        let Some(username) = param_str(parameters, "username") else {
            return Ok(CapabilityOutput::failure("username parameter is required"));
        };

        let user = match self.get_json(&format!("/users/{username}"), &[]).await? {
            ApiReply::Body(body) => body,
            ApiReply::Rejected(message) => return Ok(CapabilityOutput::failure(message)),
        };

        Ok(CapabilityOutput::ok(json!({
            "action": "get_user_info",
            "user": {
                "username": user.get("login"),
                "name": user.get("name"),
                "bio": user.get("bio"),
                "company": user.get("company"),
                "location": user.get("location"),
                "public_repos": user.get("public_repos"),
                "followers": user.get("followers"),
                "following": user.get("following"),
                "created_at": user.get("created_at"),
                "url": user.get("html_url"),
            }
        })))
    }
}

fn repo_summary(repo: &Value) -> Value {
    json!({
        "name": repo.get("name"),
        "full_name": repo.get("full_name"),
        "description": repo.get("description"),
        "stars": repo.get("stargazers_count"),
        "forks": repo.get("forks_count"),
        "language": repo.get("language"),
        "url": repo.get("html_url"),
        "owner": repo.pointer("/owner/login"),
    })
}

#[async_trait]
impl Capability for GitHubTool {
    fn name(&self) -> &str {
        "github"
    }

    fn description(&self) -> &str {
        "Search GitHub repositories, get repository details, stars, and descriptions"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .param("action", "Action to perform: 'search_repos', 'get_repo_info', 'get_user_info'")
            .param("query", "Search query (for search_repos)")
            .param("repo_name", "Repository full name like 'owner/repo' (for get_repo_info)")
            .param("username", "GitHub username (for get_user_info)")
            .param("language", "Filter by programming language (optional)")
            .param("sort", "Sort by: 'stars', 'forks', 'updated' (default: stars)")
            .param("limit", "Maximum number of results (default: 5)")
    }

    async fn invoke(&self, parameters: &Parameters) -> Result<CapabilityOutput, CapabilityError> {
        match param_str(parameters, "action").unwrap_or("search_repos") {
            "search_repos" => self.search_repos(parameters).await,
            "get_repo_info" => self.get_repo_info(parameters).await,
            "get_user_info" => self.get_user_info(parameters).await,
            other => Ok(CapabilityOutput::failure(format!("Unknown action: {other}"))),
        }
    }
}
