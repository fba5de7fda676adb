use crate::core::{OdbError, Result};
use crate::storage::{Entity, Table};
use serde::Serialize;

/// One page of a paged select.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage<M> {
    pub matches: Vec<M>,
    pub has_more: bool,
}

impl<M: Entity> ResultPage<M> {
    /// Id to pass as `after` to fetch the following page.
    pub fn cursor(&self) -> Option<M::Id> {
        self.matches.last().map(Entity::id)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Rows after `after` in id order that pass the existence check and
/// `predicate`, truncated to `limit`.
pub fn page<M: Entity>(
    table: &Table<M::Id, M>,
    limit: Option<usize>,
    after: Option<M::Id>,
    include_deleted: bool,
    predicate: impl Fn(&M) -> bool,
) -> Result<ResultPage<M>> {
    if limit == Some(0) {
        return Err(OdbError::input("count must be positive"));
    }
    let mut rows = table
        .rows_after(after)
        .map(|(_, m)| m)
        .filter(|m| include_deleted || m.is_present())
        .filter(|m| predicate(m));

    let matches: Vec<M> = match limit {
        Some(n) => rows.by_ref().take(n).cloned().collect(),
        None => rows.by_ref().cloned().collect(),
    };
    let has_more = rows.next().is_some();
    Ok(ResultPage { matches, has_more })
}
