use serde::{Deserialize, Serialize};

/// A local account the NTLM provider accepts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
}

impl User {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    /// Account names compare case-insensitively, as Windows does.
    pub fn matches(&self, username: &str) -> bool {
        self.username.to_uppercase() == username.to_uppercase()
    }
}
