//! The per-operator builder catalog.
//!
//! One unit struct per supported NNAPI operation kind, grouped by family.
//! Builders are stateless; everything operation-specific flows through the
//! [`OpCtx`](crate::builder::OpCtx) handed to each call.

pub(crate) mod compare;
pub(crate) mod conv;
pub(crate) mod elementwise;
pub(crate) mod normalization;
pub(crate) mod pool;
pub(crate) mod quantize;
pub(crate) mod reduce;
pub(crate) mod resize;
pub(crate) mod rnn;
pub(crate) mod shape;
pub(crate) mod softmax;
pub(crate) mod topk;
pub(crate) mod unary;

use crate::builder::OpCtx;
use crate::error::TranslateError;
use crate::primitives::normalize_axis;

/// Parses an axis-list tensor parameter, normalizing every entry against
/// `rank` (negative axes wrap Python-style), sorted ascending and deduped.
pub(crate) fn normalized_axes(
    ctx: &OpCtx,
    slot: usize,
    rank: usize,
) -> Result<Vec<usize>, TranslateError> {
    let raw: Vec<i32> = ctx.parse(slot)?;
    let mut axes = Vec::with_capacity(raw.len());
    for a in raw {
        axes.push(normalize_axis(a, rank)?);
    }
    axes.sort_unstable();
    axes.dedup();
    Ok(axes)
}
