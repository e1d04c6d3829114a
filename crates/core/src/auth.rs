//! Request authenticators for REST tools.
//!
//! An authenticator is a pure `HttpRequest -> HttpRequest` transform applied
//! right before the request is handed to the runtime. Any
//! `Fn(HttpRequest) -> HttpRequest` closure is an authenticator too.

use crate::runtime::HttpRequest;

pub trait Authenticator: Send + Sync {
    fn apply(&self, request: HttpRequest) -> HttpRequest;
}

impl<F> Authenticator for F
where
    F: Fn(HttpRequest) -> HttpRequest + Send + Sync,
{
    fn apply(&self, request: HttpRequest) -> HttpRequest {
        self(request)
    }
}

/// Sets `Authorization: <format> <token>`.
#[derive(Clone)]
pub struct BearerAuthenticator {
    token: String,
    format: String,
}

impl BearerAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_format(token, "Bearer")
    }

    pub fn with_format(token: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            format: format.into(),
        }
    }
}

impl std::fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthenticator")
            .field("token", &"[REDACTED]")
            .field("format", &self.format)
            .finish()
    }
}

impl Authenticator for BearerAuthenticator {
    fn apply(&self, mut request: HttpRequest) -> HttpRequest {
        request.headers.insert(
            "Authorization".into(),
            format!("{} {}", self.format, self.token),
        );
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request() -> HttpRequest {
        HttpRequest {
            url: "https://api.example.com/v1/latest?from=USD".into(),
            method: "GET".into(),
            headers: BTreeMap::from([("Accept".to_string(), "application/json".to_string())]),
            body: Some("{}".into()),
        }
    }

    #[test]
    fn bearer_sets_authorization_only() {
        let before = request();
        let after = BearerAuthenticator::new("secret").apply(before.clone());
        assert_eq!(after.headers["Authorization"], "Bearer secret");
        assert_eq!(after.headers["Accept"], "application/json");
        assert_eq!(after.url, before.url);
        assert_eq!(after.method, before.method);
        assert_eq!(after.body, before.body);
    }

    #[test]
    fn custom_format() {
        let after = BearerAuthenticator::with_format("abc", "token").apply(request());
        assert_eq!(after.headers["Authorization"], "token abc");
    }

    #[test]
    fn closures_compose_like_authenticators() {
        let api_key = |mut req: HttpRequest| {
            req.headers.insert("X-Api-Key".into(), "k".into());
            req
        };
        let chain: Vec<Box<dyn Authenticator>> =
            vec![Box::new(api_key), Box::new(BearerAuthenticator::new("t"))];
        let out = chain.iter().fold(request(), |req, auth| auth.apply(req));
        assert_eq!(out.headers["X-Api-Key"], "k");
        assert_eq!(out.headers["Authorization"], "Bearer t");
    }

    #[test]
    fn debug_redacts_token() {
        let text = format!("{:?}", BearerAuthenticator::new("secret"));
        assert!(!text.contains("secret"));
    }
}
