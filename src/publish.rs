//! Facebook Graph API client: page feed publishing, post updates, and the
//! token exchange helpers used to obtain page credentials.
//!
//! Any non-2xx Graph response carries a structured error object; its type
//! and code are surfaced as [`PublishError::Authentication`], the error kind
//! the reconciler falls back on.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info};

use crate::contract::{Publisher, PublishError};

const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com";

/// Publishes to a single page's feed using a page access token.
pub struct GraphPublisher {
    client: Client,
    api_base: String,
    page_id: String,
    page_token: String,
}

impl GraphPublisher {
    pub fn new(page_id: String, page_token: String) -> Self {
        Self::with_api_base(page_id, page_token, DEFAULT_GRAPH_BASE.to_string())
    }

    /// Point the client at a different Graph base, for tests against a stub.
    pub fn with_api_base(page_id: String, page_token: String, api_base: String) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            page_id,
            page_token,
        }
    }
}

/// Map a failed Graph response to the error kind callers match on. The
/// error body carries `type` and `code` fields describing the failure.
async fn graph_error(res: reqwest::Response) -> PublishError {
    let body: serde_json::Value = match res.json().await {
        Ok(body) => body,
        Err(e) => return PublishError::Http(e),
    };
    let err = &body["error"];
    PublishError::Authentication {
        kind: err
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        code: err.get("code").map(|v| v.to_string()).unwrap_or_default(),
    }
}

#[async_trait]
impl Publisher for GraphPublisher {
    async fn create_post(&self, message: &str) -> Result<String, PublishError> {
        if self.page_id.is_empty() {
            return Err(PublishError::MissingParameter("page_id"));
        }
        let url = format!("{}/{}/feed", self.api_base, self.page_id);
        let res = self
            .client
            .post(&url)
            .form(&[("message", message), ("access_token", &self.page_token)])
            .send()
            .await?;

        if !res.status().is_success() {
            error!("Failed to post");
            return Err(graph_error(res).await);
        }
        let body: serde_json::Value = res.json().await?;
        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PublishError::Api("feed response had no id".to_string()))?
            .to_string();
        // The returned id is "<page>_<post>"; the second token is the
        // public post id.
        let post_id = id.split('_').nth(1).unwrap_or(&id);
        info!(
            link = %format!("https://www.facebook.com/{post_id}"),
            "Posted content to facebook"
        );
        Ok(id)
    }

    async fn update_post(&self, post_id: &str, message: &str) -> Result<(), PublishError> {
        if post_id.is_empty() {
            return Err(PublishError::MissingParameter("post_id"));
        }
        let url = format!("{}/{}", self.api_base, post_id);
        let res = self
            .client
            .post(&url)
            .form(&[("message", message), ("access_token", &self.page_token)])
            .send()
            .await?;

        if !res.status().is_success() {
            error!("Failed to update post");
            return Err(graph_error(res).await);
        }
        let body: serde_json::Value = res.json().await?;
        if body.get("success").and_then(|v| v.as_bool()) == Some(true) {
            info!(post_id, "Updated content");
            Ok(())
        } else {
            error!(post_id, "Update call did not report success");
            Err(PublishError::Api(format!(
                "failed updating the content at https://www.facebook.com/{post_id}"
            )))
        }
    }
}

/// How a page token is obtained from a user token.
#[derive(Debug, Clone, Copy)]
pub enum TokenMethod {
    /// Directly from the page object (requires the page id).
    Page,
    /// From the user's managed-pages listing (requires the user id).
    User,
}

/// Exchange a user access token for a page access token.
pub async fn get_page_token(
    api_base: &str,
    user_access_token: &str,
    method: TokenMethod,
    page_id: &str,
    user_id: &str,
) -> Result<String, PublishError> {
    match method {
        TokenMethod::User => get_page_token_user(api_base, user_access_token, user_id).await,
        TokenMethod::Page => get_page_token_page(api_base, user_access_token, page_id).await,
    }
}

/// Page token straight from the page object.
pub async fn get_page_token_page(
    api_base: &str,
    user_access_token: &str,
    page_id: &str,
) -> Result<String, PublishError> {
    if page_id.is_empty() {
        return Err(PublishError::MissingParameter("page_id"));
    }
    let url = format!("{}/{}", api_base.trim_end_matches('/'), page_id);
    let res = Client::new()
        .get(&url)
        .query(&[("fields", "access_token"), ("access_token", user_access_token)])
        .send()
        .await?;

    if !res.status().is_success() {
        error!("Failed to get page token");
        return Err(graph_error(res).await);
    }
    info!("Received a page token");
    let body: serde_json::Value = res.json().await?;
    body.get("access_token")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| PublishError::Api("page response had no access_token".to_string()))
}

/// Page token via the user's accounts listing; the first managed page wins.
pub async fn get_page_token_user(
    api_base: &str,
    user_access_token: &str,
    user_id: &str,
) -> Result<String, PublishError> {
    if user_id.is_empty() {
        return Err(PublishError::MissingParameter("user_id"));
    }
    let url = format!("{}/{}/accounts", api_base.trim_end_matches('/'), user_id);
    let res = Client::new()
        .get(&url)
        .query(&[
            ("fields", "name,access_token"),
            ("access_token", user_access_token),
        ])
        .send()
        .await?;

    if !res.status().is_success() {
        error!("Failed to get page token from accounts listing");
        return Err(graph_error(res).await);
    }
    let body: serde_json::Value = res.json().await?;
    let token = body
        .get("data")
        .and_then(|v| v.as_array())
        .and_then(|pages| {
            pages
                .iter()
                .filter(|page| page.get("id").is_some())
                .find_map(|page| page.get("access_token").and_then(|v| v.as_str()))
        })
        .map(str::to_string);
    match token {
        Some(token) => {
            info!("Received a page token");
            Ok(token)
        }
        None => Err(PublishError::Api(
            "user manages no pages with an access token".to_string(),
        )),
    }
}

/// Exchange a short-lived user token for a long-lived one via the
/// `fb_exchange_token` OAuth grant.
pub async fn get_long_term_token(
    api_base: &str,
    user_access_token: &str,
    app_id: &str,
    app_secret: &str,
) -> Result<String, PublishError> {
    if app_id.is_empty() || app_secret.is_empty() {
        return Err(PublishError::MissingParameter("app_id and app_secret"));
    }
    let url = format!("{}/oauth/access_token", api_base.trim_end_matches('/'));
    let res = Client::new()
        .get(&url)
        .query(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", app_id),
            ("client_secret", app_secret),
            ("fb_exchange_token", user_access_token),
        ])
        .send()
        .await?;

    if !res.status().is_success() {
        error!("Failed to get long term token");
        return Err(graph_error(res).await);
    }
    info!("Received a long-term token");
    let body: serde_json::Value = res.json().await?;
    body.get("access_token")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| PublishError::Api("oauth response had no access_token".to_string()))
}
