//!
//! Bulk interval shifts within one tree. Both shifts touch `lft` and `rgt` through two
//! independent updates, so a row whose bounds straddle the shift point only has its
//! `rgt` moved. This is what widens (or narrows) every ancestor of the shift point.
//!

use crate::model::{
    stores::{NodeFilter, NodeStore, RowUpdate},
    RootId,
};
use nestedset_core::trace;
use nestedset_database::prelude::StoreError;

/// Adds `delta` to every `lft >= first` and, independently, to every `rgt >= first` of tree `root_id`
pub fn shift_values(store: &mut dyn NodeStore, first: i64, delta: i64, root_id: RootId) -> Result<(), StoreError> {
    if delta == 0 {
        return Ok(());
    }
    let lefts = store.update_where(&NodeFilter::in_root(root_id).lft_ge(first), &RowUpdate::default().shift_lft(delta))?;
    let rights = store.update_where(&NodeFilter::in_root(root_id).rgt_ge(first), &RowUpdate::default().shift_rgt(delta))?;
    trace!("shift_values: root {root_id}, from {first} by {delta} ({lefts} lft, {rights} rgt)");
    Ok(())
}

/// Like [`shift_values`], restricted to bounds lying in `[first, last]`. Slides a contiguous
/// block without disturbing rows outside of it.
pub fn shift_range(store: &mut dyn NodeStore, first: i64, last: i64, delta: i64, root_id: RootId) -> Result<(), StoreError> {
    if delta == 0 {
        return Ok(());
    }
    let lefts =
        store.update_where(&NodeFilter::in_root(root_id).lft_between(first, last), &RowUpdate::default().shift_lft(delta))?;
    let rights =
        store.update_where(&NodeFilter::in_root(root_id).rgt_between(first, last), &RowUpdate::default().shift_rgt(delta))?;
    trace!("shift_range: root {root_id}, [{first}, {last}] by {delta} ({lefts} lft, {rights} rgt)");
    Ok(())
}
