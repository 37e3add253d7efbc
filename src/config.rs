//! Support for library configuration options

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::resource::Resource;

/// Part of the ProdID string that describes the organization (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static ORG_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("sickmitch".to_string())));

/// Part of the ProdID string that describes the product name (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static PRODUCT_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("NCTasks".to_string())));

/// Name of the task collection when none is configured
pub const DEFAULT_COLLECTION: &str = "tasks";

/// Where to reach the server, and where to keep the local cache
#[derive(Clone, Default, Deserialize)]
pub struct Config {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub collection: Option<String>,
    pub cache_file: Option<PathBuf>,
}

impl Config {
    /// Read a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = match std::fs::File::open(path) {
            Err(err) => {
                return Err(Error::Config(format!("Unable to open file {:?}: {}", path, err)));
            },
            Ok(file) => file,
        };
        Ok(serde_json::from_reader(file)?)
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| v.is_empty() == false);
        Self {
            base_url: var("BASE_URL"),
            username: var("USERNAME"),
            password: var("API_KEY"),
            collection: var("COLLECTION"),
            cache_file: var("ROOT_DIR").map(|dir| PathBuf::from(dir).join("tasks")),
        }
    }

    /// Check that every required value is there. All the missing ones are reported at once
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if is_blank(&self.base_url) { missing.push("base URL"); }
        if is_blank(&self.username) { missing.push("username"); }
        if is_blank(&self.password) { missing.push("password"); }
        if missing.is_empty() == false {
            return Err(Error::Config(format!("Missing required values: {}", missing.join(", "))));
        }
        Ok(())
    }

    /// The task collection, e.g. `https://cloud.example.com/remote.php/dav/calendars/john/tasks/`, with the credentials to access it
    pub fn collection_resource(&self) -> Result<Resource> {
        self.validate()?;
        let base = self.base_url.clone().unwrap_or_default();
        let username = self.username.clone().unwrap_or_default();
        let password = self.password.clone().unwrap_or_default();
        let collection = self.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);

        let url = Url::parse(&format!("{}/remote.php/dav/calendars/{}/{}/",
            base.trim_end_matches('/'), username, collection.trim_matches('/')))?;
        Ok(Resource::new(url, username, password))
    }

    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true)
}
