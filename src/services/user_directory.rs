use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use crate::errors::{CoreResult, UserDirectoryError};

/// Lookup of user ids owned by the identity service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(false)` when the id is unknown, `Err` when the directory could not
    /// answer.
    async fn user_exists(&self, user_id: &str) -> Result<bool, UserDirectoryError>;
}

/// Verifies that a user id is known, failing closed when the directory does
/// not answer.
pub async fn verify_user(directory: &dyn UserDirectory, user_id: &str) -> CoreResult<()> {
    match directory.user_exists(user_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(UserDirectoryError::UnknownUser(user_id.to_string()).into()),
        Err(err) => {
            warn!("User lookup for {} failed: {}", user_id, err);
            Err(err.into())
        }
    }
}

/// Accepts every user id. Used when no user service is configured.
#[derive(Debug, Default, Clone)]
pub struct AllowAllUsers;

#[async_trait]
impl UserDirectory for AllowAllUsers {
    async fn user_exists(&self, _user_id: &str) -> Result<bool, UserDirectoryError> {
        Ok(true)
    }
}

/// Fixed set of known users.
#[derive(Debug, Default, Clone)]
pub struct StaticUserDirectory {
    users: HashSet<String>,
}

impl StaticUserDirectory {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn user_exists(&self, user_id: &str) -> Result<bool, UserDirectoryError> {
        Ok(self.users.contains(user_id))
    }
}

/// Remote directory answering `GET {base_url}/users/{id}` with 200 or 404.
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// `{base_url}/users/{id}` with the id escaped as a single path segment.
    fn user_url(&self, user_id: &str) -> Result<Url, UserDirectoryError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| UserDirectoryError::Transport(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                UserDirectoryError::Transport(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .push("users")
            .push(user_id);
        Ok(url)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn user_exists(&self, user_id: &str) -> Result<bool, UserDirectoryError> {
        let url = self.user_url(user_id)?;
        debug!("Verifying user via {}", url);

        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| UserDirectoryError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| UserDirectoryError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(UserDirectoryError::UnexpectedStatus(status.as_u16())),
        }
    }
}
