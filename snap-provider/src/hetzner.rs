//! Hetzner Cloud adapter.
//!
//! Talks to the v1 REST API with a blocking client. Only the endpoints the
//! snapshot job needs are wrapped: image listing (paginated), server image
//! creation, server action lookup and image deletion.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use snap_config::HetznerSettings;
use snap_core::{Result, SnapError};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::models::{parse_timestamp, Action, ActionStatus, ImageType, Snapshot};
use crate::CloudProvider;

const PER_PAGE: u32 = 50;

pub struct HetznerProvider {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesPage {
    #[serde(default)]
    images: Vec<ImageRecord>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ImageRecord {
    id: u64,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type")]
    image_type: ImageType,
    #[serde(default)]
    created_from: Option<CreatedFrom>,
    created: String,
}

#[derive(Debug, Deserialize)]
struct CreatedFrom {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ActionRecord {
    id: u64,
    status: String,
    #[serde(default)]
    progress: u64,
}

#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    #[serde(default)]
    action: Option<ActionRecord>,
}

#[derive(Debug, Serialize)]
struct CreateImageRequest<'a> {
    description: &'a str,
    #[serde(rename = "type")]
    image_type: &'a str,
}

impl From<ActionRecord> for Action {
    fn from(record: ActionRecord) -> Self {
        Action::new(
            record.id,
            ActionStatus::from(record.status.as_str()),
            record.progress,
        )
    }
}

impl ImageRecord {
    fn into_snapshot(self) -> Option<Snapshot> {
        let Some(created) = parse_timestamp(&self.created) else {
            warn!(
                snapshot_id = self.id,
                created = %self.created,
                "Skipping image with unreadable creation date"
            );
            return None;
        };

        Some(Snapshot {
            id: self.id,
            description: self.description.unwrap_or_default(),
            image_type: self.image_type,
            created_from: self.created_from.map(|c| c.id),
            created,
        })
    }
}

impl HetznerProvider {
    pub const NAME: &'static str = "hetzner";

    pub fn new(settings: &HetznerSettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cloudsnap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base_url = settings.api_base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            api_token: settings.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn token(&self) -> Result<&str> {
        self.api_token.as_deref().ok_or_else(|| {
            SnapError::Config(
                "Hetzner API token is missing (set HCLOUD_TOKEN or providers.hetzner.api_token)"
                    .to_string(),
            )
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, url).bearer_auth(self.token()?))
    }

    /// Turns a non-success response into a provider error with its body.
    fn ensure_success(response: Response, operation: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, error = %error_text, "{} failed", operation);
        Err(SnapError::Provider(format!(
            "{} failed: {} - {}",
            operation, status, error_text
        )))
    }
}

impl CloudProvider for HetznerProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_ready(&self) -> Result<()> {
        self.token().map(|_| ())
    }

    fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .request(reqwest::Method::GET, "images")?
                .query(&[("type", "snapshot"), ("status", "available")])
                .query(&[("page", page), ("per_page", PER_PAGE)])
                .send()?;
            let body: ImagesPage = Self::ensure_success(response, "List images")?.json()?;

            debug!(page, count = body.images.len(), "Fetched image page");
            snapshots.extend(
                body.images
                    .into_iter()
                    .filter_map(ImageRecord::into_snapshot),
            );

            match body.meta.and_then(|m| m.pagination.next_page) {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(snapshots)
    }

    fn create_snapshot(
        &self,
        instance_id: u64,
        description: &str,
        image_type: &ImageType,
    ) -> Result<Option<Action>> {
        let path = format!("servers/{}/actions/create_image", instance_id);
        let response = self
            .request(reqwest::Method::POST, &path)?
            .json(&CreateImageRequest {
                description,
                image_type: image_type.as_str(),
            })
            .send()?;

        // A refused request is reported as "no action", not as a transport fault.
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(instance_id, status = %status, error = %error_text, "Create image request refused");
            return Ok(None);
        }

        let envelope: ActionEnvelope = response.json()?;
        Ok(envelope.action.map(Action::from))
    }

    fn get_server_action(&self, instance_id: u64, action_id: u64) -> Result<Action> {
        let path = format!("servers/{}/actions/{}", instance_id, action_id);
        let response = self.request(reqwest::Method::GET, &path)?.send()?;
        let envelope: ActionEnvelope =
            Self::ensure_success(response, "Get server action")?.json()?;

        envelope.action.map(Action::from).ok_or_else(|| {
            SnapError::Provider(format!(
                "Server action #{} response did not contain an action",
                action_id
            ))
        })
    }

    fn delete_snapshot(&self, snapshot_id: u64) -> Result<bool> {
        let path = format!("images/{}", snapshot_id);
        let response = self.request(reqwest::Method::DELETE, &path)?.send()?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            return Ok(true);
        }

        let error_text = response.text().unwrap_or_default();
        warn!(snapshot_id, status = %status, error = %error_text, "Image deletion refused");
        Ok(false)
    }
}
