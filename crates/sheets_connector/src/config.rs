use std::fmt;

use crate::errors::{Result, SheetsError};

/// Environment variable consulted for the account name when none is given
/// explicitly.
pub const USER_ENV_VAR: &str = "GOOGLE_USER";

/// Environment variable consulted for the account password when none is
/// given explicitly.
pub const PASSWORD_ENV_VAR: &str = "GOOGLE_PASSWORD";

/// A value that must not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Sensitive(String);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Account credentials used to log in to both remote services.
///
/// Resolved once when constructed: explicit values win, the environment
/// fills in whatever was left out. The connection never goes back to the
/// environment afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    user: Option<String>,
    password: Option<Sensitive>,
}

impl Credentials {
    /// Credentials built only from explicit values.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(Sensitive::new(password)),
        }
    }

    /// Credentials taken entirely from the environment.
    pub fn from_env() -> Self {
        Self::resolve(None, None)
    }

    /// Explicit values, falling back to `GOOGLE_USER` / `GOOGLE_PASSWORD`.
    pub fn resolve(user: Option<String>, password: Option<String>) -> Self {
        Self::resolve_with(user, password, |key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::resolve`] but reads fallbacks through `lookup`.
    pub fn resolve_with<F>(user: Option<String>, password: Option<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = non_empty(user).or_else(|| non_empty(lookup(USER_ENV_VAR)));
        let password = non_empty(password).or_else(|| non_empty(lookup(PASSWORD_ENV_VAR)));

        Self {
            user,
            password: password.map(Sensitive::new),
        }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&Sensitive> {
        self.password.as_ref()
    }

    /// Return the user and password, erroring if either is missing.
    pub fn require(&self) -> Result<(&str, &str)> {
        let user = self.user().ok_or_else(|| {
            SheetsError::InvalidConnectionParameters(format!(
                "account name is required, pass it explicitly or set {USER_ENV_VAR}"
            ))
        })?;
        let password = self.password().ok_or_else(|| {
            SheetsError::InvalidConnectionParameters(format!(
                "password is required, pass it explicitly or set {PASSWORD_ENV_VAR}"
            ))
        })?;
        Ok((user, password.expose()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_overrides_environment() {
        let creds = Credentials::resolve_with(
            Some("ann@example.com".to_string()),
            None,
            env(&[
                (USER_ENV_VAR, "env@example.com"),
                (PASSWORD_ENV_VAR, "hunter2"),
            ]),
        );

        assert_eq!(Some("ann@example.com"), creds.user());
        assert_eq!("hunter2", creds.password().unwrap().expose());
    }

    #[test]
    fn empty_explicit_value_falls_back() {
        let creds = Credentials::resolve_with(
            Some(String::new()),
            Some("secret".to_string()),
            env(&[(USER_ENV_VAR, "env@example.com")]),
        );
        assert_eq!(Some("env@example.com"), creds.user());
    }

    #[test]
    fn missing_credentials_error() {
        let creds = Credentials::resolve_with(None, None, env(&[]));
        let err = creds.require().unwrap_err();
        assert!(matches!(err, SheetsError::InvalidConnectionParameters(_)));
        assert!(err.to_string().contains(USER_ENV_VAR));

        let creds = Credentials::resolve_with(Some("ann".to_string()), None, env(&[]));
        let err = creds.require().unwrap_err();
        assert!(err.to_string().contains(PASSWORD_ENV_VAR));
    }

    #[test]
    fn password_is_redacted() {
        let creds = Credentials::new("ann", "hunter2");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }
}
