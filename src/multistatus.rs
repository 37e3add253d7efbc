//! Parsing of WebDAV multi-status (`207`) bodies

use minidom::Element;

use crate::error::{Error, Result};
use crate::utils::{find_elem, find_elems};

/// The part of a `<response>` element this crate cares about
#[derive(Clone, Debug, PartialEq)]
pub struct DavResponse {
    /// The server path of this resource, as given by the server (usually absolute, without scheme nor host)
    pub href: String,
    /// The iCal document of this resource, when the server returned it successfully
    pub calendar_data: Option<String>,
}

/// Parse a multi-status body.
///
/// Malformed XML (or XML that is not a `<multistatus>`) fails as a whole. Individual `<response>`s without an `href` are skipped.
pub fn parse(body: &[u8]) -> Result<Vec<DavResponse>> {
    let text = std::str::from_utf8(body)
        .map_err(|err| Error::Parse(format!("response is not valid UTF-8 ({})", err)))?;
    let root: Element = text.trim().parse()?;
    if root.name() != "multistatus" {
        return Err(Error::Parse(format!("expected a <multistatus> element, got <{}>", root.name())));
    }

    let mut responses = Vec::new();
    for response in find_elems(&root, "response") {
        let href = match find_elem(response, "href") {
            None => {
                log::warn!("Unable to extract HREF");
                continue;
            },
            Some(elem) => elem.text().trim().to_string(),
        };

        responses.push(DavResponse {
            calendar_data: calendar_data(response),
            href,
        });
    }
    Ok(responses)
}

/// Returns the `calendar-data` of the successful `propstat`, if any
fn calendar_data(response: &Element) -> Option<String> {
    let propstats = find_elems(response, "propstat");
    let data = if propstats.is_empty() {
        find_elem(response, "calendar-data")
    } else {
        propstats.into_iter()
            .filter(|propstat| {
                find_elem(propstat, "status")
                    .map(|status| is_success(&status.text()))
                    .unwrap_or(false)
            })
            .find_map(|propstat| find_elem(propstat, "calendar-data"))
    };

    data.map(|elem| elem.text())
        .filter(|text| text.trim().is_empty() == false)
}

/// e.g. `HTTP/1.1 200 OK`
fn is_success(status_line: &str) -> bool {
    status_line.split_whitespace()
        .nth(1)
        .map(|code| code.starts_with('2'))
        .unwrap_or(false)
}
