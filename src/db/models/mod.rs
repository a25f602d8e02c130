pub mod employee;
pub mod material;
pub mod teacher;

use std::collections::HashMap;
use std::hash::Hash;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serializer};
use utoipa::ToSchema;

use crate::utils::error::AppError;

/// Body of the delete endpoints: `{ "id": 3 }`.
#[derive(Deserialize, ToSchema, Debug)]
pub struct IdRequest {
    pub id: Option<i32>,
}

impl IdRequest {
    /// The id, rejecting a missing or zero value with `message`.
    pub fn required(&self, message: &str) -> Result<i32, AppError> {
        truthy_id(self.id).ok_or_else(|| AppError::validation(message))
    }
}

pub fn truthy_id(id: Option<i32>) -> Option<i32> {
    id.filter(|id| *id != 0)
}

/// Writes a `NUMERIC(12,2)` value with exactly two decimals. The driver
/// decodes in base-10000 groups, so `9.99` can arrive as `9.9900` and
/// `85000.00` as `85000`.
pub fn serialize_money<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&value.with_scale(2))
}

/// Folds joined parent/child rows into one record per parent, keeping the
/// order in which parents first appear.
pub fn fold_rows<R, K, P>(
    rows: impl IntoIterator<Item = R>,
    key: impl Fn(&R) -> K,
    mut start: impl FnMut(&R) -> P,
    mut absorb: impl FnMut(&mut P, R),
) -> Vec<P>
where
    K: Eq + Hash,
{
    let mut records: Vec<P> = Vec::new();
    let mut positions: HashMap<K, usize> = HashMap::new();

    for row in rows {
        let slot = match positions.get(&key(&row)) {
            Some(slot) => *slot,
            None => {
                records.push(start(&row));
                positions.insert(key(&row), records.len() - 1);
                records.len() - 1
            }
        };
        absorb(&mut records[slot], row);
    }

    records
}
