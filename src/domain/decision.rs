//! The outcome of resolving one visit to a short link.

use std::fmt;

/// Why a visit could not be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// No link matches the code or alias.
    NotFound,
    /// The link is inactive or past its expiry.
    Expired,
    /// Storage failure while loading the link.
    Internal,
}

impl ResolveErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveErrorKind::NotFound => "not_found",
            ResolveErrorKind::Expired => "expired",
            ResolveErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of the redirect pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send the visitor to `url` with an HTTP redirect.
    Redirect { url: String },
    /// The link is password protected and no valid password was supplied.
    PasswordRequired,
    /// Serve an intermediate page that loads the destination.
    Cloaked { html: String, content_type: String },
    Error { kind: ResolveErrorKind },
}

impl Decision {
    pub fn error(kind: ResolveErrorKind) -> Self {
        Decision::Error { kind }
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Redirect { .. } => "redirect",
            Decision::PasswordRequired => "password_required",
            Decision::Cloaked { .. } => "cloaked",
            Decision::Error { kind } => kind.as_str(),
        }
    }
}
