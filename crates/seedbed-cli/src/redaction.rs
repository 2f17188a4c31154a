use serde::{Deserialize, Serialize};

const SECRET_PARAMS: &[&str] = &["password", "sslpassword", "sslkey", "token", "secret"];

/// Database URL metadata safe to persist in run artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub scheme: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Mask the password and secret-bearing query parameters of `url`.
pub fn redact_connection(url: &str) -> RedactedConnection {
    let Some((scheme, rest)) = url.split_once("://") else {
        return RedactedConnection {
            scheme: None,
            user: None,
            host: None,
            port: None,
            database: None,
            redacted: "***".to_string(),
        };
    };

    let (location, query) = match rest.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (rest, None),
    };
    let (userinfo, hostpath) = match location.rsplit_once('@') {
        Some((userinfo, hostpath)) => (Some(userinfo), hostpath),
        None => (None, location),
    };
    let (authority, database) = match hostpath.split_once('/') {
        Some((authority, path)) if !path.is_empty() => (authority, Some(path.to_string())),
        Some((authority, _)) => (authority, None),
        None => (hostpath, None),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().ok()),
        None => (authority, None),
    };

    let (user, masked_userinfo) = match userinfo {
        Some(info) => match info.split_once(':') {
            Some((user, _)) => (Some(user.to_string()), format!("{user}:***@")),
            None => (Some(info.to_string()), format!("{info}@")),
        },
        None => (None, String::new()),
    };

    let mut redacted = format!("{scheme}://{masked_userinfo}{hostpath}");
    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&mask_query(query));
    }

    RedactedConnection {
        scheme: Some(scheme.to_string()),
        user,
        host: (!host.is_empty()).then(|| host.to_string()),
        port,
        database,
        redacted,
    }
}

fn mask_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SECRET_PARAMS.contains(&key.to_ascii_lowercase().as_str()) => {
                format!("{key}=***")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
