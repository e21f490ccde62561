//! Caller identity as forwarded by the edge gateway.

use serde::{Deserialize, Serialize};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// Identity headers set by the gateway after authentication.
///
/// The pipeline records these verbatim and makes no authorisation decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    /// Builds an identity from `(name, value)` header pairs.
    ///
    /// Header names are matched case-insensitively. Returns `None` when no
    /// non-empty user id header is present.
    pub fn from_headers<'a, I>(headers: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut user_id = None;
        let mut roles = Vec::new();

        for (name, value) in headers {
            if name.eq_ignore_ascii_case(USER_ID_HEADER) {
                let value = value.trim();
                if !value.is_empty() {
                    user_id = Some(value.to_string());
                }
            } else if name.eq_ignore_ascii_case(USER_ROLES_HEADER) {
                roles.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_string),
                );
            }
        }

        user_id.map(|user_id| Self { user_id, roles })
    }
}
