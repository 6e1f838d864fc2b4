//! Finding a credential to talk to Palette with.

use std::fmt;

use tracing::debug;

use crate::errors::Error;

/// Name of the cookie the Palette console keeps its session token in.
pub const SESSION_COOKIE: &str = "Authorization";

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Token(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credential::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// Somewhere cookies can be looked up.
pub trait CookieJar {
    /// Value of the first cookie called `name` whose domain ends with
    /// `domain_suffix`.
    fn find(&self, domain_suffix: &str, name: &str) -> anyhow::Result<Option<String>>;
}

/// Cookies stored by the browsers installed for the current user. Reading
/// them may prompt for the OS keyring.
pub struct BrowserCookies;

impl CookieJar for BrowserCookies {
    fn find(&self, domain_suffix: &str, name: &str) -> anyhow::Result<Option<String>> {
        let domain = domain_filter(domain_suffix);
        let cookies =
            rookie::load(Some(vec![domain.to_owned()])).map_err(|err| anyhow::anyhow!("{err}"))?;
        Ok(cookies
            .into_iter()
            .find(|cookie| cookie.name == name && cookie.domain.ends_with(domain_suffix))
            .map(|cookie| cookie.value))
    }
}

/// Domain handed to the cookie store so only the host's cookies are read.
fn domain_filter(domain_suffix: &str) -> &str {
    domain_suffix.trim_start_matches('.')
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pick a credential: API key, then token, then the browser session cookie
/// for `host`.
pub fn resolve(
    api_key: Option<&str>,
    token: Option<&str>,
    host: &str,
    jar: &dyn CookieJar,
) -> anyhow::Result<Credential> {
    if let Some(key) = non_empty(api_key) {
        debug!("using API key");
        return Ok(Credential::ApiKey(key.to_owned()));
    }
    if let Some(token) = non_empty(token) {
        debug!("using token");
        return Ok(Credential::Token(token.to_owned()));
    }

    let suffix = format!(".{host}");
    match jar.find(&suffix, SESSION_COOKIE) {
        Ok(Some(value)) if !value.is_empty() => {
            debug!(domain = %suffix, "using browser session cookie");
            Ok(Credential::Token(value))
        }
        Ok(_) => Err(Error::NoCredential {
            host: host.to_owned(),
        }
        .into()),
        Err(err) => {
            debug!("could not read browser cookies: {err:#}");
            Err(Error::NoCredential {
                host: host.to_owned(),
            }
            .into())
        }
    }
}
