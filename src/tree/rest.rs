use serde_json::Value;

use super::*;

/// A hierarchical JSON database spoken to over REST:
/// `GET`/`PUT <base>/<path>.json`, with an optional `auth` query parameter.
pub struct RestTree {
    client: reqwest::Client,
    base: String,
    auth: Option<String>,
}

impl RestTree {
    pub fn new(base: &str, auth: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_owned(),
            auth,
        }
    }

    fn node_url(&self, path: &str) -> TreeResult<String> {
        let segments = segments(path)?;
        Ok(format!("{}/{}.json", self.base, segments.join("/")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(auth) => request.query(&[("auth", auth)]),
            None => request,
        }
    }
}

#[rocket::async_trait]
impl Tree for RestTree {
    async fn get(&self, path: &str) -> TreeResult<Option<Value>> {
        let url = self.node_url(path)?;
        let value: Value = self
            .authorize(self.client.get(&url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Some(value).filter(|value| !value.is_null()))
    }

    async fn set(&self, path: &str, value: Value) -> TreeResult<()> {
        let url = self.node_url(path)?;
        self.authorize(self.client.put(&url))
            .json(&value)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
