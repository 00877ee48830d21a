//! Expected request sequences.

use crate::SERVICE_ROOT;
use odsync_changeset::{Changeset, HttpMethod, WireRequest};
use pretty_assertions::assert_eq;

/// Expected `(method, uri)` sequence.
///
/// URIs are written relative to the service root; `$<n>` references are
/// written as they are.
#[derive(Debug, Default)]
pub struct Expect {
    requests: Vec<(HttpMethod, String)>,
}

impl Expect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(self, uri: &str) -> Self {
        self.request(HttpMethod::Post, uri)
    }

    pub fn patch(self, uri: &str) -> Self {
        self.request(HttpMethod::Patch, uri)
    }

    pub fn put(self, uri: &str) -> Self {
        self.request(HttpMethod::Put, uri)
    }

    pub fn delete(self, uri: &str) -> Self {
        self.request(HttpMethod::Delete, uri)
    }

    fn request(mut self, method: HttpMethod, uri: &str) -> Self {
        self.requests.push((method, uri.to_string()));
        self
    }

    /// Compare against the parts of a changeset, in content-id order.
    pub fn check_changeset(&self, changeset: &Changeset) {
        let requests: Vec<&WireRequest> = changeset.parts.iter().map(|p| &p.request).collect();
        self.check(&requests);
    }

    /// Compare against requests executed one by one.
    pub fn check_requests(&self, requests: &[WireRequest]) {
        let requests: Vec<&WireRequest> = requests.iter().collect();
        self.check(&requests);
    }

    fn check(&self, requests: &[&WireRequest]) {
        let actual: Vec<(HttpMethod, String)> = requests
            .iter()
            .map(|r| {
                let uri = r.uri.strip_prefix(SERVICE_ROOT).unwrap_or(&r.uri);
                (r.method, uri.to_string())
            })
            .collect();
        assert_eq!(actual, self.requests);
    }
}
