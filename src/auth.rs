use crate::error::{Result, UploaderError};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Credentials of the logged-in user, passed explicitly to every request.
/// Read-only once established.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct AuthSession {
    username: String,
    #[derivative(Debug = "ignore")]
    password: String,
}

impl AuthSession {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// JSON body of `POST /login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a AuthSession> for LoginRequest<'a> {
    fn from(session: &'a AuthSession) -> Self {
        Self {
            username: &session.username,
            password: &session.password,
        }
    }
}

/// Only a JSON object without an `error` field establishes a session. An
/// empty or unparsable body is a refusal as well.
pub fn check_login_response(body: &str) -> Result<()> {
    let fields = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        _ => return Err(unexpected_login_response(body)),
    };
    match fields.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(message)) => Err(UploaderError::Auth(message.clone())),
        Some(other) => Err(UploaderError::Auth(other.to_string())),
    }
}

fn unexpected_login_response(body: &str) -> UploaderError {
    if body.trim().is_empty() {
        UploaderError::Auth("Login failed: empty response from server".to_string())
    } else {
        UploaderError::Auth(format!("Login failed: unexpected response from server: {}", body.trim()))
    }
}

/// A destination project the user may upload to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub number: String,
}
