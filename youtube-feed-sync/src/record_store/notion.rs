use super::{ContentBlock, StoreRecord};
use crate::error::SyncError;
use crate::traits::RecordStore;
use crate::utils::url::is_web_url;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

pub const NOTION_API_URL: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";

const TITLE_PROPERTY: &str = "Title";
const CHANNEL_PROPERTY: &str = "Channel";
const PUBLISHED_PROPERTY: &str = "Published";
const KEY_PROPERTY: &str = "Video ID";
const STATUS_PROPERTY: &str = "Status";
/// Notion accepts at most this many children per request.
pub const MAX_CHILDREN_PER_REQUEST: usize = 100;

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Deserialize)]
struct CreatedPage {
    id: String,
}

/// Notion database used as the record store. One page per record.
pub struct NotionStore {
    client: Client,
    base_url: String,
    api_key: String,
    database_id: String,
    date_property: Option<String>,
}

impl NotionStore {
    pub fn new(api_key: impl Into<String>, database_id: impl Into<String>) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: NOTION_API_URL.to_string(),
            api_key: api_key.into(),
            database_id: database_id.into(),
            date_property: None,
        })
    }

    /// Also fill this date property with each record's full timestamp.
    pub fn with_date_property(mut self, name: impl Into<String>) -> Self {
        self.date_property = Some(name.into());
        self
    }

    /// Point the client at another host, e.g. a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn query_payload(key: &str) -> Value {
        json!({
            "filter": {
                "property": KEY_PROPERTY,
                "rich_text": { "equals": key }
            },
            "page_size": 1
        })
    }

    /// Page creation body. Only the first [`MAX_CHILDREN_PER_REQUEST`] blocks
    /// are included; `create` appends the rest.
    pub fn page_payload(&self, record: &StoreRecord) -> Value {
        let mut properties = json!({
            TITLE_PROPERTY: { "title": [text_object(&record.title)] },
            CHANNEL_PROPERTY: { "rich_text": [text_object(&record.channel)] },
            PUBLISHED_PROPERTY: { "date": { "start": record.published.format("%Y-%m-%d").to_string() } },
            KEY_PROPERTY: { "rich_text": [text_object(&record.key)] },
            STATUS_PROPERTY: { "select": { "name": record.status } }
        });
        if let Some(name) = &self.date_property {
            properties[name.as_str()] = json!({ "date": { "start": record.timestamp.to_rfc3339() } });
        }

        json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
            "children": record
                .blocks
                .iter()
                .take(MAX_CHILDREN_PER_REQUEST)
                .map(block_json)
                .collect::<Vec<_>>()
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Response, SyncError> {
        self.send(self.client.post(format!("{}{}", self.base_url, path)), body).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Response, SyncError> {
        self.send(self.client.patch(format!("{}{}", self.base_url, path)), body).await
    }

    async fn send(&self, request: reqwest::RequestBuilder, body: &Value) -> Result<Response, SyncError> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl RecordStore for NotionStore {
    fn store_name(&self) -> String {
        format!("notion database {}", self.database_id)
    }

    async fn exists(&self, key: &str) -> Result<bool, SyncError> {
        let path = format!("/v1/databases/{}/query", self.database_id);
        let response = self.post(&path, &Self::query_payload(key)).await?;
        let body: QueryResponse = response.json().await.map_err(|e| SyncError::Decode(e.to_string()))?;
        debug!("Notion query for {} returned {} results", key, body.results.len());
        Ok(!body.results.is_empty())
    }

    async fn create(&self, record: &StoreRecord) -> Result<(), SyncError> {
        let response = self.post("/v1/pages", &self.page_payload(record)).await?;
        if record.blocks.len() <= MAX_CHILDREN_PER_REQUEST {
            return Ok(());
        }

        let page: CreatedPage = response.json().await.map_err(|e| SyncError::Decode(e.to_string()))?;
        let path = format!("/v1/blocks/{}/children", page.id);
        for batch in record.blocks[MAX_CHILDREN_PER_REQUEST..].chunks(MAX_CHILDREN_PER_REQUEST) {
            let body = json!({ "children": batch.iter().map(block_json).collect::<Vec<_>>() });
            self.patch(&path, &body).await?;
        }
        info!("Appended {} extra blocks to page {}", record.blocks.len() - MAX_CHILDREN_PER_REQUEST, page.id);
        Ok(())
    }
}

/// Server errors and throttling count as the store being unreachable; other
/// non-success codes mean the request itself was refused.
async fn check_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() || status.as_u16() == 429 {
        Err(SyncError::Unreachable(format!("HTTP {}: {}", status.as_u16(), body)))
    } else {
        Err(SyncError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn text_object(content: &str) -> Value {
    json!({ "type": "text", "text": { "content": content } })
}

/// Text linked to `url`, or plain text when Notion would refuse the link.
fn linked_text_object(content: &str, url: &str) -> Value {
    if is_web_url(url) {
        json!({ "type": "text", "text": { "content": content, "link": { "url": url } } })
    } else {
        text_object(content)
    }
}

fn block_json(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Heading(text) => json!({
            "object": "block",
            "type": "heading_2",
            "heading_2": { "rich_text": [text_object(text)] }
        }),
        ContentBlock::Subheading { text, url } => {
            let title = match url {
                Some(url) => linked_text_object(text, url),
                None => text_object(text),
            };
            json!({
                "object": "block",
                "type": "heading_3",
                "heading_3": { "rich_text": [title] }
            })
        }
        ContentBlock::Paragraph(text) => json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": { "rich_text": [text_object(text)] }
        }),
        ContentBlock::Bullet(text) => json!({
            "object": "block",
            "type": "bulleted_list_item",
            "bulleted_list_item": { "rich_text": [text_object(text)] }
        }),
        ContentBlock::Link { label, url } => json!({
            "object": "block",
            "type": "bulleted_list_item",
            "bulleted_list_item": {
                "rich_text": [
                    {
                        "type": "text",
                        "text": { "content": format!("{}: ", label) },
                        "annotations": { "bold": true }
                    },
                    linked_text_object(url, url)
                ]
            }
        }),
        ContentBlock::Image(url) => json!({
            "object": "block",
            "type": "image",
            "image": { "type": "external", "external": { "url": url } }
        }),
        ContentBlock::Video(url) => json!({
            "object": "block",
            "type": "video",
            "video": { "type": "external", "external": { "url": url } }
        }),
        ContentBlock::Divider => json!({
            "object": "block",
            "type": "divider",
            "divider": {}
        }),
    }
}
