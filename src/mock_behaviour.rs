//! This module provides an in-memory CalDAV server, that can be tweaked to return errors on some tests
#![cfg(test)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::traits::DavTransport;

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    pub fetch_behaviour: (u32, u32),
    pub put_behaviour: (u32, u32),
    pub delete_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            fetch_behaviour: (0, n_fails),
            put_behaviour: (0, n_fails),
            delete_behaviour: (0, n_fails),
        }
    }

    pub fn can_fetch(&mut self) -> Result<()> {
        decrement(&mut self.fetch_behaviour, "fetch")
    }
    pub fn can_put(&mut self) -> Result<()> {
        decrement(&mut self.put_behaviour, "put")
    }
    pub fn can_delete(&mut self) -> Result<()> {
        decrement(&mut self.delete_behaviour, "delete")
    }
}

/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<()> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 -= 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else if remaining_failures > 0 {
        value.1 -= 1;
        log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
        Err(Error::Network(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
    } else {
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    }
}


#[derive(Default)]
struct MockServerState {
    items: BTreeMap<Url, String>,
    behaviour: MockBehaviour,
    /// When set, returned as-is instead of a listing of `items`
    raw_listing: Option<Vec<u8>>,
    calls: Vec<String>,
}

/// A transport to a fake server that keeps its items in memory
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockServerState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        self.state.lock().unwrap().behaviour = behaviour;
    }

    pub fn set_raw_listing(&self, listing: Option<Vec<u8>>) {
        self.state.lock().unwrap().raw_listing = listing;
    }

    /// Store an item directly on the server
    pub fn insert(&self, url: Url, ical: &str) {
        self.state.lock().unwrap().items.insert(url, ical.to_string());
    }

    pub fn item(&self, url: &Url) -> Option<String> {
        self.state.lock().unwrap().items.get(url).cloned()
    }

    pub fn n_items(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Every request received so far, e.g. `DELETE https://...`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn listing(collection: &Url, items: &BTreeMap<Url, String>) -> String {
        let mut body = String::from(r#"<?xml version="1.0"?><d:multistatus xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">"#);
        body.push_str(&format!("<d:response><d:href>{}</d:href><d:propstat><d:prop/><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>",
            collection.path()));
        for (url, ical) in items {
            body.push_str(&format!(
                "<d:response><d:href>{}</d:href><d:propstat><d:prop><d:getetag>\"1\"</d:getetag><cal:calendar-data>{}</cal:calendar-data></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>",
                url.path(), xml_escape(ical)));
        }
        body.push_str("</d:multistatus>");
        body
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[async_trait]
impl DavTransport for MockTransport {
    async fn fetch(&self, collection: &Resource) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("PROPFIND {}", collection.url()));
        state.behaviour.can_fetch()?;
        if let Some(raw) = &state.raw_listing {
            return Ok(raw.clone());
        }
        Ok(Self::listing(collection.url(), &state.items).into_bytes())
    }

    async fn put(&self, item: &Resource, ical: String) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("PUT {}", item.url()));
        state.behaviour.can_put()?;
        state.items.insert(item.url().clone(), ical);
        Ok(())
    }

    async fn delete(&self, item: &Resource) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("DELETE {}", item.url()));
        state.behaviour.can_delete()?;
        match state.items.remove(item.url()) {
            Some(_) => Ok(()),
            None => Err(Error::Network("Unexpected HTTP status code 404".to_string())),
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        assert!(ok.can_fetch().is_ok());
        assert!(ok.can_fetch().is_ok());
        assert!(ok.can_put().is_ok());

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_fetch().is_err());
        assert!(now.can_put().is_err());
        assert!(now.can_put().is_err());
        assert!(now.can_fetch().is_err());
        assert!(now.can_fetch().is_ok());
        assert!(now.can_put().is_ok());

        let mut custom = MockBehaviour{
            delete_behaviour: (1,2),
            ..MockBehaviour::default()
        };
        assert!(custom.can_delete().is_ok());
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_ok());
        assert!(custom.can_fetch().is_ok());
    }
}
