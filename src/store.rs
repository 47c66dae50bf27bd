//! Store: the remote hierarchical object-store seam.
//!
//! This module defines a single trait ([`Store`]) covering the collaborator
//! operations the mirror engine invokes — container find/create/list, item
//! list/create, content upload, metadata attachment and deletion — plus
//! [`GirderStore`], the concrete client for the Girder REST API.
//!
//! The trait is annotated for `mockall` so tests can run the engine against
//! deterministic mocks without a live server. All methods are async and
//! return boxed error trait objects; a failed call is fatal to the run, the
//! engine never retries.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Error type for store calls (boxed trait object, uniform across clients).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A remote hierarchical grouping node (folder analogue).
#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// A remote leaf node holding at most one content blob plus optional metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// Synchronous-per-call, one-call-per-entity interface to the remote store.
/// Implemented by real clients and by test mocks/fakes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a child container by exact name under a parent.
    async fn find_container(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<Container>, StoreError>;

    /// Create a child container under a parent.
    async fn create_container(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Container, StoreError>;

    /// List all child containers of a parent.
    async fn list_containers(&self, parent_id: &str) -> Result<Vec<Container>, StoreError>;

    /// List all items directly inside a container.
    async fn list_items(&self, container_id: &str) -> Result<Vec<Item>, StoreError>;

    /// Create an empty item in a container.
    async fn create_item(&self, container_id: &str, name: &str) -> Result<Item, StoreError>;

    /// Upload (or replace) the content blob of an item.
    async fn upload_content(
        &self,
        item_id: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;

    /// Attach a metadata document to an item (whole-document upsert).
    async fn set_item_metadata(&self, item_id: &str, document: &Value) -> Result<(), StoreError>;

    /// Attach a metadata document to a container (whole-document upsert).
    async fn set_container_metadata(
        &self,
        container_id: &str,
        document: &Value,
    ) -> Result<(), StoreError>;

    /// Delete an item by id.
    async fn delete_item(&self, item_id: &str) -> Result<(), StoreError>;

    /// Delete a container by id. The caller is responsible for emptying it
    /// first; see `reset::empty_container`.
    async fn delete_container(&self, container_id: &str) -> Result<(), StoreError>;
}

#[derive(Deserialize)]
struct TokenEnvelope {
    #[serde(rename = "authToken")]
    auth_token: AuthToken,
}

#[derive(Deserialize)]
struct AuthToken {
    token: String,
}

#[derive(Deserialize)]
struct Upload {
    #[serde(rename = "_id")]
    id: String,
}

/// Girder REST client. Holds an already-exchanged session token; the engine
/// treats credentials as opaque and only ever sees this handle.
pub struct GirderStore {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GirderStore {
    /// Authenticate against a Girder instance by exchanging an API key for a
    /// session token (`POST /api_key/token`).
    pub async fn connect(api_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let api_url = api_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::new();

        let resp = http
            .post(format!("{api_url}/api_key/token"))
            .query(&[("key", api_key)])
            .send()
            .await?;
        let envelope: TokenEnvelope = check_status(resp).await?.json().await?;

        info!(api_url = %api_url, "authenticated against girder");
        Ok(GirderStore {
            http,
            api_url,
            token: envelope.auth_token.token,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .header("Girder-Token", &self.token)
    }
}

/// Girder reports failures as non-2xx responses with a JSON body; fold the
/// status and body into the error so the run report names the failing call.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(format!("girder returned {status}: {body}").into())
}

#[async_trait]
impl Store for GirderStore {
    async fn find_container(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<Container>, StoreError> {
        let resp = self
            .request(Method::GET, "/folder")
            .query(&[
                ("parentType", "folder"),
                ("parentId", parent_id),
                ("name", name),
                ("limit", "1"),
            ])
            .send()
            .await?;
        let folders: Vec<Container> = check_status(resp).await?.json().await?;
        Ok(folders.into_iter().next())
    }

    async fn create_container(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Container, StoreError> {
        let resp = self
            .request(Method::POST, "/folder")
            .query(&[
                ("parentType", "folder"),
                ("parentId", parent_id),
                ("name", name),
            ])
            .send()
            .await?;
        let folder: Container = check_status(resp).await?.json().await?;
        debug!(folder_id = %folder.id, name = %folder.name, "created girder folder");
        Ok(folder)
    }

    async fn list_containers(&self, parent_id: &str) -> Result<Vec<Container>, StoreError> {
        let resp = self
            .request(Method::GET, "/folder")
            .query(&[
                ("parentType", "folder"),
                ("parentId", parent_id),
                ("limit", "0"),
            ])
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn list_items(&self, container_id: &str) -> Result<Vec<Item>, StoreError> {
        let resp = self
            .request(Method::GET, "/item")
            .query(&[("folderId", container_id), ("limit", "0")])
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn create_item(&self, container_id: &str, name: &str) -> Result<Item, StoreError> {
        let resp = self
            .request(Method::POST, "/item")
            .query(&[("folderId", container_id), ("name", name)])
            .send()
            .await?;
        let item: Item = check_status(resp).await?.json().await?;
        debug!(item_id = %item.id, name = %item.name, "created girder item");
        Ok(item)
    }

    async fn upload_content(
        &self,
        item_id: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        // Girder's upload protocol wants the size up front; zero-byte
        // uploads complete on creation and must not send a chunk.
        let size = bytes.len().to_string();
        let resp = self
            .request(Method::POST, "/file")
            .query(&[
                ("parentType", "item"),
                ("parentId", item_id),
                ("name", name),
                ("size", size.as_str()),
            ])
            .send()
            .await?;
        let upload: Upload = check_status(resp).await?.json().await?;

        if !bytes.is_empty() {
            let resp = self
                .request(Method::POST, "/file/chunk")
                .query(&[("uploadId", upload.id.as_str()), ("offset", "0")])
                .body(bytes)
                .send()
                .await?;
            check_status(resp).await?;
        }
        debug!(item_id, name, size = %size, "uploaded content");
        Ok(())
    }

    async fn set_item_metadata(&self, item_id: &str, document: &Value) -> Result<(), StoreError> {
        let resp = self
            .request(Method::PUT, &format!("/item/{item_id}/metadata"))
            .json(document)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn set_container_metadata(
        &self,
        container_id: &str,
        document: &Value,
    ) -> Result<(), StoreError> {
        let resp = self
            .request(Method::PUT, &format!("/folder/{container_id}/metadata"))
            .json(document)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn delete_item(&self, item_id: &str) -> Result<(), StoreError> {
        let resp = self
            .request(Method::DELETE, &format!("/item/{item_id}"))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn delete_container(&self, container_id: &str) -> Result<(), StoreError> {
        let resp = self
            .request(Method::DELETE, &format!("/folder/{container_id}"))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
