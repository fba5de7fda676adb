use crate::core::{Gid, OdbError, Result};
use im::OrdMap;
use std::ops::Bound;

/// Rows of one entity kind plus the id generator state for that kind.
///
/// Tables are persistent values: every "mutation" returns a new table sharing
/// structure with the old one, so a snapshot holding the old table never sees
/// the change.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<I: Gid, A: Clone> {
    last_id: u64,
    rows: OrdMap<I, A>,
}

impl<I: Gid, A: Clone> Default for Table<I, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Gid, A: Clone> Table<I, A> {
    pub fn new() -> Self {
        Self {
            last_id: 0,
            rows: OrdMap::new(),
        }
    }

    /// The highest id issued so far, if any.
    pub fn last_id(&self) -> Option<I> {
        I::from_value(self.last_id)
    }

    /// Issues an id never issued before, whatever has been deleted since.
    pub fn next_unused(&self) -> Result<(Self, I)> {
        let next = self
            .last_id
            .checked_add(1)
            .and_then(I::from_value)
            .ok_or_else(|| OdbError::Internal(format!("{} id space exhausted", I::KIND)))?;
        let mut table = self.clone();
        table.last_id = next.value();
        Ok((table, next))
    }

    /// Marks a caller-chosen id as used.
    ///
    /// Returns `None` when the id is already present, in which case the caller
    /// is expected to fall back to [`Table::next_unused`].
    pub fn claim(&self, id: I) -> Option<Self> {
        if self.rows.contains_key(&id) {
            return None;
        }
        let mut table = self.clone();
        table.last_id = table.last_id.max(id.value());
        Some(table)
    }

    /// True once the id has been handed out by `next_unused` or `claim`.
    pub fn is_issued(&self, id: I) -> bool {
        id.value() <= self.last_id
    }

    pub fn get(&self, id: &I) -> Option<&A> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &I) -> bool {
        self.rows.contains_key(id)
    }

    /// Inserts or replaces a row. The id must have been issued.
    pub fn with_row(&self, id: I, row: A) -> Result<Self> {
        if !self.is_issued(id) {
            return Err(OdbError::Internal(format!(
                "{} {} was never issued",
                I::KIND,
                id
            )));
        }
        Ok(Self {
            last_id: self.last_id,
            rows: self.rows.update(id, row),
        })
    }

    /// Rows in ascending id order.
    pub fn rows(&self) -> impl Iterator<Item = (&I, &A)> {
        self.rows.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &A> {
        self.rows.values()
    }

    /// Rows with an id strictly greater than `after`, ascending.
    pub fn rows_after(&self, after: Option<I>) -> impl Iterator<Item = (&I, &A)> {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        self.rows.range((lower, Bound::Unbounded))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
