//! This crate keeps a hierarchical to-do list in sync with a CalDAV task collection (e.g. a Nextcloud "Tasks" calendar).
//!
//! It provides a CalDAV client in the [`client`] module, that fetches, uploads and deletes tasks. It can be replaced by any other
//! implementation of [`DavTransport`](traits::DavTransport).
//!
//! Fetched listings are decoded by the [`ical`] and [`multistatus`] modules, and turned into displayable rows by the [`tree`] module.
//!
//! Because the connection to the server may be slow, and a user-frendly app may want to quicky display cached data on startup, this crate also provides a local cache of the last listing in the [`cache`] module.
//!
//! Everything is tied together by a [`Provider`](provider::Provider), that owns the displayed state and applies user commands.

pub mod error;
pub use error::{Error, Result};
pub mod traits;
pub mod config;

mod item;
pub use item::TaskId;
pub mod task;
pub use task::{Priority, Task, TaskFields, TaskStatus};
pub mod resource;
pub use resource::Resource;

pub mod multistatus;
pub mod ical;
pub mod href_index;
pub mod tree;
pub use tree::RenderRow;

pub mod provider;
pub use provider::Provider;

pub mod client;
pub mod cache;

pub mod utils;

#[cfg(test)]
mod mock_behaviour;
