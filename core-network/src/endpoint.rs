//! Typed endpoints
//!
//! An [`Endpoint`] describes one API call and the JSON shape of its response,
//! so callers get a decoded value from [`ApiClient::send`](crate::ApiClient::send).
//!
//! ```ignore
//! struct Profile;
//!
//! impl Endpoint for Profile {
//!     type Response = ProfileDto;
//!
//!     fn method(&self) -> HttpMethod { HttpMethod::Get }
//!     fn path(&self) -> String { "users/me".to_string() }
//! }
//!
//! let profile: ProfileDto = client.send(&Profile).await?;
//! ```

use crate::error::{NetworkError, Result};
use bridge_traits::http::{HttpMethod, HttpRequest};
use serde::de::DeserializeOwned;

pub trait Endpoint: Send + Sync {
    type Response: DeserializeOwned;

    fn method(&self) -> HttpMethod;

    /// Path relative to the client's base URL, or an absolute URL.
    fn path(&self) -> String;

    fn query(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// JSON request body.
    fn body(&self) -> Option<serde_json::Value> {
        None
    }

    fn to_request(&self) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(self.method(), self.path());

        for (key, value) in self.query() {
            request = request.query(key, value);
        }
        for (key, value) in self.headers() {
            request = request.header(key, value);
        }
        if let Some(body) = self.body() {
            request = request.json(&body).map_err(NetworkError::Transport)?;
        }

        Ok(request)
    }
}

/// Decodes a JSON response body. An empty body decodes as `null`, so
/// endpoints answering `204 No Content` can use `()` as their response.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.is_empty() { b"null".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| NetworkError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct CreateNote {
        text: &'static str,
    }

    impl Endpoint for CreateNote {
        type Response = ();

        fn method(&self) -> HttpMethod {
            HttpMethod::Post
        }

        fn path(&self) -> String {
            "notes".to_string()
        }

        fn query(&self) -> Vec<(String, String)> {
            vec![("draft".to_string(), "true".to_string())]
        }

        fn body(&self) -> Option<serde_json::Value> {
            Some(json!({ "text": self.text }))
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Note {
        id: u32,
    }

    #[test]
    fn test_to_request() {
        let request = CreateNote { text: "hello" }.to_request().unwrap();

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "notes");
        assert_eq!(request.query, vec![("draft".to_string(), "true".to_string())]);
        assert_eq!(request.header_value("content-type"), Some("application/json"));
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(request.body.as_deref().unwrap()).unwrap(),
            json!({ "text": "hello" })
        );
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode::<Note>(br#"{"id":7}"#).unwrap(), Note { id: 7 });
        decode::<()>(b"").unwrap();
        assert!(matches!(decode::<Note>(b"<html>"), Err(NetworkError::Decode(_))));
    }
}
