//! Runtime phrase lookup for widgets that need localized strings

use log::debug;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::http::{read_json, ScreenClient};

/// Phrase ids mapped to their named placeholder ("pin") values
pub type PhraseRequest = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone)]
pub struct PhraseClient {
    client: ScreenClient,
}

impl PhraseClient {
    pub fn new(client: ScreenClient) -> Self {
        Self { client }
    }

    /// Resolve `phrases` on the server.
    ///
    /// With `text_only` the server returns plain text instead of markup.
    pub async fn lookup(
        &self,
        phrases: &PhraseRequest,
        text_only: bool,
    ) -> Result<HashMap<String, String>> {
        let mut url = self.client.config().cgi_url("/ajax/phrase");
        if text_only {
            url.push_str("?textonly=1");
        }
        debug!("phrase_lookup: {} ids", phrases.len());
        let response = self.client.post_json_body(&url, phrases).await?;
        read_json(response).await
    }

    /// Resolve a single phrase without placeholders
    pub async fn phrase(&self, id: &str) -> Result<Option<String>> {
        let mut request = PhraseRequest::new();
        request.insert(id.to_string(), BTreeMap::new());
        let mut resolved = self.lookup(&request, true).await?;
        Ok(resolved.remove(id))
    }
}

/// Build a request from `(phrase id, [(pin, value)])` pairs
pub fn phrase_request<'a, I, P>(entries: I) -> PhraseRequest
where
    I: IntoIterator<Item = (&'a str, P)>,
    P: IntoIterator<Item = (&'a str, &'a str)>,
{
    entries
        .into_iter()
        .map(|(id, pins)| {
            (
                id.to_string(),
                pins.into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        })
        .collect()
}
