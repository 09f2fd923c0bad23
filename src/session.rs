//! HTTP session with an on-disk cookie store.
//!
//! The add-on process is re-invoked by the host for every navigation
//! action, so cookies must survive process exit: the store is written back
//! to `<save_path>/cookies` after every request. Redirects are suppressed
//! because the vendor delivers auth tokens in redirect response headers
//! that callers must read rather than follow.

use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::redirect;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::VueError;

const IPAD_USER_AGENT: &str =
    "Mozilla/5.0 (iPad; CPU OS 12_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 PS Vue/2.6.1";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// Request payload variants used by the vendor endpoints.
pub enum Payload<'a> {
    /// Key/value pairs: sent as query parameters on get/put, form data on post
    Params(&'a [(&'a str, String)]),
    /// Raw JSON body; the caller supplies the Content-Type header
    Json(String),
}

pub struct HttpSession {
    client: reqwest::Client,
    cookie_file: PathBuf,
    cookies: Mutex<HashMap<String, String>>,
}

impl HttpSession {
    pub fn new(save_path: &Path, verify_ssl: bool) -> Result<Self, VueError> {
        let client = reqwest::Client::builder()
            .user_agent(IPAD_USER_AGENT)
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(!verify_ssl)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let cookie_file = save_path.join("cookies");
        let cookies = match fs::read_to_string(&cookie_file) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!(error = %err, "cookie file is corrupt; starting with an empty store");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            client,
            cookie_file,
            cookies: Mutex::new(cookies),
        })
    }

    /// Make an HTTP request and return the full response.
    ///
    /// Stored cookies ride along as a `Cookie` header; `Set-Cookie` headers
    /// on the response are captured into the store, which is then persisted.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        payload: Option<Payload<'_>>,
        headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, VueError> {
        debug!(%url, ?method, "request");

        let mut builder = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        };

        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }
        if let Some(cookie_header) = self.cookie_header() {
            builder = builder.header(COOKIE, cookie_header);
        }

        match payload {
            Some(Payload::Params(params)) => {
                builder = match method {
                    Method::Post => builder.form(params),
                    _ => builder.query(params),
                };
            }
            Some(Payload::Json(body)) => {
                builder = builder.body(body);
            }
            None => {}
        }

        let response = builder.send().await?;
        debug!(status = %response.status(), %url, "response");

        self.store_response_cookies(response.headers());
        if let Err(err) = self.persist_cookies() {
            warn!(error = %err, "failed to persist cookie store");
        }

        Ok(response)
    }

    /// Look up a stored cookie by name.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .ok()
            .and_then(|cookies| cookies.get(name).cloned())
    }

    fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.lock().ok()?;
        if cookies.is_empty() {
            return None;
        }

        let mut header = String::new();
        for (name, value) in cookies.iter() {
            if !header.is_empty() {
                header.push_str("; ");
            }
            header.push_str(name);
            header.push('=');
            header.push_str(value);
        }
        Some(header)
    }

    fn store_response_cookies(&self, headers: &HeaderMap) {
        let Ok(mut cookies) = self.cookies.lock() else {
            return;
        };
        for value in headers.get_all(SET_COOKIE).iter() {
            let Ok(cookie_str) = value.to_str() else {
                continue;
            };
            let Some(cookie_part) = cookie_str.split(';').next() else {
                continue;
            };
            let Some((name, value)) = cookie_part.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            debug!(cookie = name, "storing cookie");
            cookies.insert(name.to_owned(), value.to_owned());
        }
    }

    fn persist_cookies(&self) -> Result<(), VueError> {
        let Ok(cookies) = self.cookies.lock() else {
            return Ok(());
        };
        let text = serde_json::to_string(&*cookies)?;
        fs::write(&self.cookie_file, text)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn insert_cookie(&self, name: &str, value: &str) {
        if let Ok(mut cookies) = self.cookies.lock() {
            cookies.insert(name.to_string(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let session = HttpSession::new(dir.path(), true).unwrap();
            session.insert_cookie("reqPayload", "abc123");
            session.persist_cookies().unwrap();
        }
        let session = HttpSession::new(dir.path(), true).unwrap();
        assert_eq!(session.cookie("reqPayload").as_deref(), Some("abc123"));
        assert_eq!(session.cookie("missing"), None);
    }

    #[test]
    fn corrupt_cookie_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cookies"), "not json at all").unwrap();
        let session = HttpSession::new(dir.path(), true).unwrap();
        assert_eq!(session.cookie("anything"), None);
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let session = HttpSession::new(dir.path(), true).unwrap();
        assert_eq!(session.cookie_header(), None);
        session.insert_cookie("a", "1");
        let header = session.cookie_header().unwrap();
        assert_eq!(header, "a=1");
    }
}
