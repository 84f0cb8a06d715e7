//! Session cookies loaded from a JSON file.
//!
//! The file is a flat object of cookie name to value, written by whatever
//! external process signs in to the scoreboard.  This crate never
//! re-authenticates; it only attaches the cookies it was given and reports
//! whether they still work.

use std::path::Path;

use tally_roster::FetchError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionJar {
    cookies: Vec<(String, String)>,
}

impl SessionJar {
    /// An empty jar; requests go out unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Load cookies from the JSON file at `path`.  Null values are skipped;
    /// anything other than a JSON object is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Unavailable(format!("reading {}: {e}", path.display())))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| FetchError::Structure(format!("session file {}: {e}", path.display())))?;
        let object = value.as_object().ok_or_else(|| {
            FetchError::Structure(format!(
                "session file {} is not a JSON object",
                path.display()
            ))
        })?;

        let mut cookies = Vec::new();
        for (name, value) in object {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => cookies.push((name.clone(), s.clone())),
                other => {
                    return Err(FetchError::Structure(format!(
                        "session cookie {name:?} has non-string value {other}"
                    )));
                }
            }
        }
        Ok(Self { cookies })
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// `Cookie` header value, `None` when the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
