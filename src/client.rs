//! This module provides a client to connect to a CalDAV server

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::traits::DavTransport;

/// Requests that take longer than this fail
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static TASKS_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
    <d:propfind xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">
        <d:prop>
            <d:getetag/>
            <cal:calendar-data/>
        </d:prop>
    </d:propfind>
"#;


/// A CalDAV transport that talks HTTP to an actual server
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl DavTransport for Client {
    async fn fetch(&self, collection: &Resource) -> Result<Vec<u8>> {
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|err| Error::Network(err.to_string()))?;

        log::debug!("Fetching {}", collection.url());
        let response = self.http
            .request(method, collection.url().clone())
            .header("Depth", 1)
            .header(CONTENT_TYPE, "application/xml")
            .basic_auth(collection.username(), Some(collection.password()))
            .body(TASKS_BODY)
            .send()
            .await?;
        check_status(response.status())?;

        let content_type = response.headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(content_type) = content_type {
            if content_type.contains("xml") == false {
                return Err(Error::Parse(format!("Unexpected content type {:?}, expected XML", content_type)));
            }
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }

    async fn put(&self, item: &Resource, ical: String) -> Result<()> {
        log::debug!("Uploading {}", item.url());
        let response = self.http
            .put(item.url().clone())
            .header(CONTENT_TYPE, "text/calendar; charset=utf-8")
            .header(CONTENT_LENGTH, ical.len())
            .basic_auth(item.username(), Some(item.password()))
            .body(ical)
            .send()
            .await?;
        check_status(response.status())
    }

    async fn delete(&self, item: &Resource) -> Result<()> {
        log::debug!("Deleting {}", item.url());
        let response = self.http
            .delete(item.url().clone())
            .basic_auth(item.username(), Some(item.password()))
            .send()
            .await?;
        check_status(response.status())
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() == false {
        return Err(Error::Network(format!("Unexpected HTTP status code {:?}", status)));
    }
    Ok(())
}
