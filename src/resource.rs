use url::Url;

use crate::item::TaskId;

/// Just a wrapper around a URL and credentials
#[derive(Clone)]
pub struct Resource {
    url: Url,
    username: String,
    password: String,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .finish()
    }
}

impl Resource {
    pub fn new(url: Url, username: String, password: String) -> Self {
        Self { url, username, password }
    }

    pub fn url(&self) -> &Url { &self.url }
    pub fn username(&self) -> &String { &self.username }
    pub fn password(&self) -> &String { &self.password }

    /// Build a new Resource pointing to another URL, with the same credentials
    pub fn with_url(&self, url: Url) -> Resource {
        Resource { url, username: self.username.clone(), password: self.password.clone() }
    }

    /// The URL a brand new task is created at, inside this collection: `<collection>/<id>.ics`
    pub fn item_url(&self, id: &TaskId) -> Url {
        let mut url = self.url.clone();
        let path = format!("{}/{}.ics", url.path().trim_end_matches('/'), id);
        url.set_path(&path);
        url
    }
}
