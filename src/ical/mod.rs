//! This module handles conversion between iCal files and internal representations
//!
//! It is a wrapper around different Rust third-party libraries, since I haven't find any complete library that is able to parse _and_ generate iCal files

mod parser;
pub use parser::{parse, parse_date_time};
mod builder;
pub use builder::build_from;

use crate::config::{ORG_NAME, PRODUCT_NAME};
use crate::multistatus::DavResponse;
use crate::task::Task;

pub fn default_prod_id() -> String {
    let org = ORG_NAME.lock().map(|name| name.clone()).unwrap_or_default();
    let product = PRODUCT_NAME.lock().map(|name| name.clone()).unwrap_or_default();
    format!("-//{}//{}//EN", org, product)
}

/// Decode every `VTODO` embedded in a multi-status listing.
///
/// Items that cannot be decoded are logged and skipped, they do not prevent the other ones from being decoded.
pub fn decode_responses(responses: &[DavResponse]) -> Vec<Task> {
    let mut tasks = Vec::new();
    for response in responses {
        let content = match &response.calendar_data {
            None => continue,
            Some(content) => content,
        };
        for result in parse(content) {
            match result {
                Ok(task) => tasks.push(task),
                Err(err) => log::warn!("Ignoring an item of {}: {}", response.href, err),
            }
        }
    }
    tasks
}

/// Reverse of [`ics::escape_text`] (RFC5545 section 3.3.11)
fn unescape_text(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => unescaped.push('\n'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}
