use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::error::{Error, ErrorKind, Result};

/// Handler bound to a failure classification.
///
/// Returning `Ok(())` absorbs the error. Returning `Err` propagates it out
/// of the terminal call.
pub type Catcher = Arc<dyn Fn(Error) -> Result<()> + Send + Sync>;

/// Key a catcher is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatchKey {
    /// Exact HTTP status of a failed response.
    Status(u16),
    /// Transport error kind.
    Kind(ErrorKind),
    /// Any status or transport error no more specific catcher matched.
    Any,
}

impl CatchKey {
    pub const BAD_REQUEST: CatchKey = CatchKey::Status(400);
    pub const UNAUTHORIZED: CatchKey = CatchKey::Status(401);
    pub const FORBIDDEN: CatchKey = CatchKey::Status(403);
    pub const NOT_FOUND: CatchKey = CatchKey::Status(404);
    pub const TIMEOUT: CatchKey = CatchKey::Status(408);
    pub const INTERNAL_ERROR: CatchKey = CatchKey::Status(500);
    pub const FETCH_ERROR: CatchKey = CatchKey::Kind(ErrorKind::Fetch);
    pub const ABORT_ERROR: CatchKey = CatchKey::Kind(ErrorKind::Abort);

    /// Key an error is looked up under before falling back to [`CatchKey::Any`].
    ///
    /// Only status and transport errors have one. Everything else bypasses
    /// the catchers, the wildcard included.
    pub fn of(error: &Error) -> Option<CatchKey> {
        match error {
            Error::Http(e) => Some(CatchKey::Status(e.status.as_u16())),
            Error::Transport(e) => Some(CatchKey::Kind(e.kind().clone())),
            _ => None,
        }
    }
}

impl From<u16> for CatchKey {
    fn from(status: u16) -> Self {
        CatchKey::Status(status)
    }
}

impl From<StatusCode> for CatchKey {
    fn from(status: StatusCode) -> Self {
        CatchKey::Status(status.as_u16())
    }
}

impl From<ErrorKind> for CatchKey {
    fn from(kind: ErrorKind) -> Self {
        CatchKey::Kind(kind)
    }
}

/// `"*"` is the wildcard. Any other name is an error kind.
impl From<&str> for CatchKey {
    fn from(name: &str) -> Self {
        match name {
            "*" => CatchKey::Any,
            kind => CatchKey::Kind(ErrorKind::from(kind)),
        }
    }
}

impl fmt::Display for CatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatchKey::Status(status) => write!(f, "{status}"),
            CatchKey::Kind(kind) => write!(f, "{kind}"),
            CatchKey::Any => f.write_str("*"),
        }
    }
}

/// Mapping from catch key to handler.
#[derive(Clone, Default)]
pub struct Catchers {
    map: HashMap<CatchKey, Catcher>,
}

impl fmt::Debug for Catchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

impl Catchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: CatchKey, catcher: Catcher) {
        self.map.insert(key, catcher);
    }

    pub fn contains(&self, key: &CatchKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Copy of `self` with every entry of `overrides` laid on top.
    pub fn overridden_by(&self, overrides: &Catchers) -> Catchers {
        let mut merged = self.clone();
        merged
            .map
            .extend(overrides.map.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        merged
    }

    /// Catcher for `error`: its exact key first, then the wildcard.
    pub fn find(&self, error: &Error) -> Option<(CatchKey, Catcher)> {
        let key = CatchKey::of(error)?;
        [key, CatchKey::Any]
            .into_iter()
            .find_map(|key| self.map.get(&key).map(|c| (key, Arc::clone(c))))
    }
}
