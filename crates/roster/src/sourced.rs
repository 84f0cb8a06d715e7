/// Per-attribute cache tracking which side has produced a value so far.
///
/// Transitions only ever add knowledge:
///
/// ```text
/// Unset ── set_remote ──▶ Remote ──┐
///   │                              ├─▶ Both
///   └─── set_persisted ▶ Persisted ┘
/// ```
///
/// Nothing removes a cached value; once `Both`, diffing the attribute is
/// legal.  Re-setting a side overwrites that side only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sourced<T> {
    Unset,
    Remote(T),
    Persisted(T),
    Both { remote: T, persisted: T },
}

impl<T> Default for Sourced<T> {
    fn default() -> Self {
        Sourced::Unset
    }
}

impl<T> Sourced<T> {
    /// Best-known value: remote when present, else persisted.
    pub fn best(&self) -> Option<&T> {
        match self {
            Sourced::Unset => None,
            Sourced::Remote(v) | Sourced::Persisted(v) => Some(v),
            Sourced::Both { remote, .. } => Some(remote),
        }
    }

    pub fn remote(&self) -> Option<&T> {
        match self {
            Sourced::Remote(v) | Sourced::Both { remote: v, .. } => Some(v),
            _ => None,
        }
    }

    pub fn persisted(&self) -> Option<&T> {
        match self {
            Sourced::Persisted(v) | Sourced::Both { persisted: v, .. } => Some(v),
            _ => None,
        }
    }

    pub fn set_remote(&mut self, value: T) {
        *self = match std::mem::take(self) {
            Sourced::Unset | Sourced::Remote(_) => Sourced::Remote(value),
            Sourced::Persisted(persisted) | Sourced::Both { persisted, .. } => Sourced::Both {
                remote: value,
                persisted,
            },
        };
    }

    pub fn set_persisted(&mut self, value: T) {
        *self = match std::mem::take(self) {
            Sourced::Unset | Sourced::Persisted(_) => Sourced::Persisted(value),
            Sourced::Remote(remote) | Sourced::Both { remote, .. } => Sourced::Both {
                remote,
                persisted: value,
            },
        };
    }

    pub fn has_remote(&self) -> bool {
        matches!(self, Sourced::Remote(_) | Sourced::Both { .. })
    }

    pub fn has_persisted(&self) -> bool {
        matches!(self, Sourced::Persisted(_) | Sourced::Both { .. })
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Sourced::Unset)
    }

    pub fn is_both(&self) -> bool {
        matches!(self, Sourced::Both { .. })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
