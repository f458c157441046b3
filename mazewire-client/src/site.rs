//! Active site context and site roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An operator's role on a site, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteRole {
    #[default]
    None,
    Subscriber,
    Author,
    Editor,
    Admin,
    Owner,
    /// Not granted per site; implies every other role.
    Super,
}

impl SiteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteRole::None => "",
            SiteRole::Subscriber => "subscriber",
            SiteRole::Author => "author",
            SiteRole::Editor => "editor",
            SiteRole::Admin => "admin",
            SiteRole::Owner => "owner",
            SiteRole::Super => "super",
        }
    }
}

impl fmt::Display for SiteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteRole {
    type Err = std::convert::Infallible;

    /// Unknown role names parse as [`SiteRole::None`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "subscriber" => SiteRole::Subscriber,
            "author" => SiteRole::Author,
            "editor" => SiteRole::Editor,
            "admin" => SiteRole::Admin,
            "owner" => SiteRole::Owner,
            "super" => SiteRole::Super,
            _ => SiteRole::None,
        })
    }
}

/// The site the operator is currently acting on.
///
/// Id 0 means "the site served by the API host"; any other id is attached
/// to outgoing payloads as `site`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveSite {
    pub id: i64,
    pub domain: String,
    pub name: String,
    pub logo: String,
    pub favicon: String,
    pub role: SiteRole,
}

impl ActiveSite {
    /// The default site for the given host.
    pub fn for_host(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_role(mut self, role: SiteRole) -> Self {
        self.role = role;
        self
    }

    pub fn is_default(&self) -> bool {
        self.id == 0
    }

    /// Says whether the operator's role here is at least `role`.
    ///
    /// Having no role satisfies nothing, and only [`SiteRole::Super`]
    /// satisfies a request for [`SiteRole::None`].
    pub fn at_least(&self, role: SiteRole) -> bool {
        match self.role {
            SiteRole::Super => true,
            SiteRole::None => false,
            actual => role != SiteRole::None && actual >= role,
        }
    }
}
