//! This module resolves the `token_auth` sent with every replayed request.
//!
//! The collector only honours the `cdt` and `cip` overrides of authenticated
//! requests. The token is either fixed by the user or requested from the
//! host system through a [`TokenSource`]. A requested token is cached by the
//! [`AuthToken`] owned by each replay, so concurrent replays never share
//! state.

use std::fmt;
use std::process::Command;
use std::sync::Arc;

use crate::error::TokenError;

/// Something able to hand out an auth token, e.g. the host system of the
/// collector.
pub trait TokenSource: Send + Sync {
    /// Requests a new auth token.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no token can be obtained.
    fn request_token(&self) -> Result<String, TokenError>;
}

/// A [`TokenSource`] running a shell command and reading the token from its
/// standard output, e.g. a console command of the collector generating a
/// temporary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTokenSource {
    /// The command line, run with `sh -c`.
    command: String,
}

impl CommandTokenSource {
    /// Creates a source running `command`.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        CommandTokenSource {
            command: command.into(),
        }
    }
}

impl TokenSource for CommandTokenSource {
    fn request_token(&self) -> Result<String, TokenError> {
        tracing::debug!(command = %self.command, "Requesting auth token");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .map_err(|source| TokenError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TokenError::CommandFailed {
                command: self.command.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let token = String::from_utf8(output.stdout)?.trim().to_string();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(token)
    }
}

/// How the auth token of a replay is obtained.
#[derive(Clone)]
pub enum TokenAuth {
    /// A token supplied by the user.
    Fixed(String),

    /// A token requested from a [`TokenSource`] on first use.
    Requested(Arc<dyn TokenSource>),
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenAuth::Fixed(_) => f.write_str("Fixed(<redacted>)"),
            TokenAuth::Requested(_) => f.write_str("Requested(..)"),
        }
    }
}

/// The auth token of one replay.
///
/// A requested token is cached after the first successful request.
#[derive(Clone)]
pub struct AuthToken {
    /// Where the token comes from.
    auth: TokenAuth,

    /// The token requested from the source.
    cached: Option<String>,
}

impl AuthToken {
    /// Creates a new `AuthToken`. No token is requested until
    /// [`AuthToken::resolve`] is called.
    #[must_use]
    pub fn new(auth: TokenAuth) -> Self {
        AuthToken { auth, cached: None }
    }

    /// Returns the token, requesting it from the source the first time.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the token source fails. The failure is not cached:
    /// the next call asks the source again.
    pub fn resolve(&mut self) -> Result<&str, TokenError> {
        match &self.auth {
            TokenAuth::Fixed(token) => Ok(token.as_str()),
            TokenAuth::Requested(source) => {
                if self.cached.is_none() {
                    self.cached = Some(source.request_token()?);
                }
                Ok(self.cached.as_deref().unwrap_or_default())
            }
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("auth", &self.auth)
            .field("cached", &self.cached.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSource {
        requests: AtomicUsize,
    }

    impl TokenSource for CountingSource {
        fn request_token(&self) -> Result<String, TokenError> {
            let request = self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{request}"))
        }
    }

    #[test]
    fn test_fixed_token() {
        let mut token = AuthToken::new(TokenAuth::Fixed("abc".to_string()));
        assert_eq!(token.resolve().unwrap(), "abc");
    }

    #[test]
    fn test_requested_token_is_cached() {
        let source = Arc::new(CountingSource {
            requests: AtomicUsize::new(0),
        });
        let mut token = AuthToken::new(TokenAuth::Requested(source.clone()));

        assert_eq!(token.resolve().unwrap(), "token-0");
        assert_eq!(token.resolve().unwrap(), "token-0");
        assert_eq!(source.requests.load(Ordering::SeqCst), 1);

        // Every replay owns its cache.
        let mut other = AuthToken::new(TokenAuth::Requested(source.clone()));
        assert_eq!(other.resolve().unwrap(), "token-1");
    }

    #[test]
    fn test_command_token_source() {
        let source = CommandTokenSource::new("echo '  0123abcd  '");
        assert_eq!(source.request_token().unwrap(), "0123abcd");
    }

    #[test]
    fn test_command_token_source_failure() {
        let source = CommandTokenSource::new("echo oops >&2; exit 3");
        let error = source.request_token().unwrap_err();
        assert!(matches!(error, TokenError::CommandFailed { ref stderr, .. } if stderr == "oops"));

        let source = CommandTokenSource::new("true");
        assert!(matches!(source.request_token(), Err(TokenError::Empty)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = TokenAuth::Fixed("secret".to_string());
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
