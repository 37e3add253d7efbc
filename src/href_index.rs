//! Where tasks live on the server

use std::collections::HashMap;

use url::Url;

use crate::error::{Error, Result};
use crate::item::TaskId;
use crate::multistatus::DavResponse;

/// Maps task UIDs to the URL of the resource that contains them.
///
/// It is rebuilt from scratch from every successfully fetched listing, and is used to know where to `PUT` or `DELETE` existing tasks.
#[derive(Clone, Debug, Default)]
pub struct HrefIndex {
    locations: HashMap<TaskId, Url>,
}

impl HrefIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a multi-status listing of `collection`.
    ///
    /// Only the `UID`s are read here, so that a task whose other fields are invalid can still be located.
    pub fn build(responses: &[DavResponse], collection: &Url) -> Self {
        let mut locations = HashMap::new();
        for response in responses {
            let content = match &response.calendar_data {
                None => continue,
                Some(content) => content,
            };
            let url = match collection.join(&response.href) {
                Err(err) => {
                    log::warn!("Invalid href {:?} ({}), ignoring it", response.href, err);
                    continue;
                },
                Ok(url) => url,
            };

            for uid in todo_uids(content) {
                if let Some(previous) = locations.insert(uid.clone(), url.clone()) {
                    log::warn!("Task {} is found both at {} and {}", uid, previous, url);
                }
            }
        }
        Self { locations }
    }

    pub fn get(&self, id: &TaskId) -> Option<&Url> {
        self.locations.get(id)
    }

    /// Same as [`Self::get`], but a miss is an error
    pub fn locate(&self, id: &TaskId) -> Result<&Url> {
        self.get(id).ok_or_else(|| Error::Lookup(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

fn todo_uids(content: &str) -> Vec<TaskId> {
    let mut uids = Vec::new();
    for calendar in ical::IcalParser::new(content.as_bytes()) {
        let calendar = match calendar {
            Err(_) => break,
            Ok(calendar) => calendar,
        };
        for todo in &calendar.todos {
            let uid = todo.properties.iter()
                .find(|prop| prop.name.eq_ignore_ascii_case("UID"))
                .and_then(|prop| prop.value.as_deref())
                .map(str::trim)
                .filter(|uid| uid.is_empty() == false);
            if let Some(uid) = uid {
                uids.push(TaskId::from(uid));
            }
        }
    }
    uids
}
