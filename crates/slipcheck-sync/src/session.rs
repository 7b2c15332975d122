//! Session provider: the one place the client reads the signed-in user's token.

/// Source of the bearer token issued by the auth service.
pub trait SessionProvider: Send + Sync {
    /// Current access token, or `None` when nobody is signed in.
    fn access_token(&self) -> Option<String>;
}

/// A token fixed at startup, typically from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    pub fn new(token: Option<String>) -> Self {
        let token = token
            .map(|t| t.trim().trim_start_matches("Bearer ").trim().to_string())
            .filter(|t| !t.is_empty());
        Self { token }
    }

    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

impl SessionProvider for StaticSession {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}
