use mpath_core::{Error, Result};

const MAX_IDENTIFIER_LEN: usize = 48;

/// How concurrent subtree moves on one table are kept apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoveLocking {
    /// Transaction-scoped advisory lock keyed by the table name. Moves queue up behind each
    /// other; plain inserts and reads are not blocked.
    #[default]
    AdvisoryLock,
    /// Run moves at `SERIALIZABLE` isolation. Losers fail with a serialization error
    /// (`Error::Storage`) and must be retried by the caller.
    Serializable,
}

/// Name and settings of one materialized-path table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeTable {
    name: String,
    locking: MoveLocking,
}

impl TreeTable {
    /// `name` is interpolated into SQL, so it must be a plain lowercase identifier:
    /// `[a-z_][a-z0-9_]*`, short enough that derived constraint names stay under the
    /// 63-byte identifier limit.
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_head || !valid_tail || name.len() > MAX_IDENTIFIER_LEN {
            return Err(Error::Validation(format!("invalid table name {name:?}")));
        }
        Ok(Self {
            name: name.to_string(),
            locking: MoveLocking::default(),
        })
    }

    pub fn with_locking(mut self, locking: MoveLocking) -> Self {
        self.locking = locking;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locking(&self) -> MoveLocking {
        self.locking
    }

    pub fn check_constraint(&self) -> String {
        format!("{}__check_path", self.name)
    }

    pub fn path_index(&self) -> String {
        format!("{}__path_gist", self.name)
    }

    pub fn parent_index(&self) -> String {
        format!("{}__parent_gist", self.name)
    }

    /// Advisory lock key for moves on this table, stable across processes.
    pub fn lock_key(&self) -> i64 {
        let hash = blake3::hash(self.name.as_bytes());
        let mut key = [0u8; 8];
        key.copy_from_slice(&hash.as_bytes()[..8]);
        i64::from_be_bytes(key)
    }
}
