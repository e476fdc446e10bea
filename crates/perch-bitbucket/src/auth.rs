//! Credentials for the Bitbucket Cloud API.

use secrecy::SecretString;

use crate::error::{Error, Result};

/// Environment variable holding an OAuth consumer key.
pub const ENV_OAUTH_KEY: &str = "BITBUCKET_OAUTH_KEY";
/// Environment variable holding an OAuth consumer secret.
pub const ENV_OAUTH_SECRET: &str = "BITBUCKET_OAUTH_SECRET";
/// Environment variable holding an account username.
pub const ENV_USERNAME: &str = "BITBUCKET_USERNAME";
/// Environment variable holding an app password.
pub const ENV_PASSWORD: &str = "BITBUCKET_PASSWORD";
/// Environment variable holding a repository or workspace access token.
pub const ENV_ACCESS_TOKEN: &str = "BITBUCKET_ACCESS_TOKEN";
/// Environment variable holding the bot account UUID.
pub const ENV_UUID: &str = "BITBUCKET_UUID";

/// How requests are authenticated.
#[derive(Clone)]
pub enum Method {
    /// Username and app password, sent as HTTP basic auth.
    Password {
        /// Account username.
        username: String,
        /// App password.
        password: SecretString,
    },
    /// OAuth consumer exchanged for a bearer token on first use.
    OAuth {
        /// Consumer key.
        key: String,
        /// Consumer secret.
        secret: SecretString,
    },
    /// Repository or workspace access token, sent as a bearer token.
    AccessToken(SecretString),
}

/// Bitbucket credentials plus the UUID of the account they act as.
#[derive(Clone)]
pub struct Credentials {
    method: Method,
    uuid: Option<String>,
}

impl Credentials {
    /// Username and app password.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            method: Method::Password {
                username: username.into(),
                password: SecretString::from(password.into()),
            },
            uuid: None,
        }
    }

    /// OAuth consumer key and secret.
    #[must_use]
    pub fn oauth(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            method: Method::OAuth {
                key: key.into(),
                secret: SecretString::from(secret.into()),
            },
            uuid: None,
        }
    }

    /// Repository or workspace access token.
    #[must_use]
    pub fn access_token(token: impl Into<String>) -> Self {
        Self {
            method: Method::AccessToken(SecretString::from(token.into())),
            uuid: None,
        }
    }

    /// Set the account UUID used to recognize comments this tool wrote.
    ///
    /// # Errors
    /// Returns error if the UUID is not wrapped in braces.
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Result<Self> {
        let uuid = uuid.into();
        if !(uuid.starts_with('{') && uuid.ends_with('}')) {
            return Err(Error::Credentials(format!(
                "{ENV_UUID} must be wrapped in braces, got '{uuid}'"
            )));
        }
        self.uuid = Some(uuid);
        Ok(self)
    }

    /// Read credentials from the process environment.
    ///
    /// # Errors
    /// Returns error if no credentials are set or a required partner
    /// variable is missing.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    ///
    /// OAuth takes precedence over a username, which takes precedence over
    /// an access token. Empty values count as unset.
    ///
    /// # Errors
    /// Returns error if no credentials are set or a required partner
    /// variable is missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let credentials = if let Some(key) = var(ENV_OAUTH_KEY) {
            let secret = var(ENV_OAUTH_SECRET)
                .ok_or_else(|| Error::Credentials(format!("{ENV_OAUTH_SECRET} is not set")))?;
            Self::oauth(key, secret)
        } else if let Some(username) = var(ENV_USERNAME) {
            let password = var(ENV_PASSWORD)
                .ok_or_else(|| Error::Credentials(format!("{ENV_PASSWORD} is not set")))?;
            Self::password(username, password)
        } else if let Some(token) = var(ENV_ACCESS_TOKEN) {
            Self::access_token(token)
        } else {
            return Err(Error::Credentials(format!(
                "one of {ENV_OAUTH_KEY}, {ENV_USERNAME} or {ENV_ACCESS_TOKEN} must be set"
            )));
        };

        match var(ENV_UUID) {
            Some(uuid) => credentials.with_uuid(uuid),
            None => Ok(credentials),
        }
    }

    /// The configured account UUID, if any.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub(crate) const fn method(&self) -> &Method {
        &self.method
    }

    /// Short label for the authentication method.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self.method {
            Method::Password { .. } => "password",
            Method::OAuth { .. } => "oauth",
            Method::AccessToken(_) => "access-token",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Credentials");
        s.field("kind", &self.kind());
        if let Method::Password { username, .. } = &self.method {
            s.field("username", username);
        }
        s.field("secret", &"[redacted]")
            .field("uuid", &self.uuid)
            .finish()
    }
}
