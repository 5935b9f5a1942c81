use crate::aggregate::AggregateMerge;
use crate::merge_at_destination::{merge_at_destination, BitmapCache};
use array_model::{Address, ArrayDesc, AttributeDesc};
use chunk::MemArray;
use scatter_gather::PullSgArrayBlocking;
use std::sync::Arc;

fn to_stream_error(err: crate::error::Error) -> stream_array::Error {
    stream_array::Error::Transport { source: Box::new(err) }
}

/// The attribute pull order for a redistribute: the empty-indicator
/// attribute first (if the schema has one), so its bitmap is cached before
/// sibling data attributes reach the same position within the same round
/// (§4.5: bitmap synthesized "from the bitmap-attribute chunk previously
/// received for the same position").
fn pull_order(desc: &ArrayDesc) -> (Option<u32>, Vec<u32>) {
    let bitmap_attr = desc.empty_indicator_attr().map(AttributeDesc::id);
    let data_attrs: Vec<u32> = desc.data_attributes().map(AttributeDesc::id).collect();
    (bitmap_attr, data_attrs)
}

/// `redistributeToArray` (§4.5): drain `pull` to completion, merging each
/// received chunk into `output` at the position it names, and return the
/// set of positions written (as attribute-0 addresses, one per distinct
/// chunk position touched).
pub async fn redistribute_to_array(
    pull: &mut PullSgArrayBlocking,
    desc: &ArrayDesc,
    output: &Arc<MemArray>,
    aggregate: Option<&Arc<dyn AggregateMerge>>,
) -> crate::error::Result<Vec<Address>> {
    let (bitmap_attr, data_attrs) = pull_order(desc);
    let mut attrs: Vec<u32> = bitmap_attr.into_iter().collect();
    attrs.extend(data_attrs);

    let bitmap_cache = BitmapCache::new();
    let mut written = Vec::new();

    let result = pull
        .pull_attributes(&attrs, |attr_id, chunk| {
            let pos = chunk.first_pos().clone();
            bitmap_cache.observe(&pos, chunk.as_ref());

            let address = Address::new(attr_id, pos);
            let existing = output.get_chunk(&address);
            let agg = if Some(attr_id) == bitmap_attr {
                None
            } else {
                aggregate.map(|a| a.as_ref())
            };
            let merged = merge_at_destination(existing.as_deref(), chunk.as_ref(), agg, bitmap_cache.as_ref())
                .map_err(to_stream_error)?;
            output.insert_chunk(merged);
            written.push(address);
            Ok(())
        })
        .await;

    result?;
    Ok(written)
}

/// `redistributeAggregate` (§4.5): `redistributeToArray` with an aggregate
/// merge hook applied to every data attribute's overlapping contributions.
pub async fn redistribute_aggregate(
    pull: &mut PullSgArrayBlocking,
    desc: &ArrayDesc,
    output: &Arc<MemArray>,
    aggregate: Arc<dyn AggregateMerge>,
) -> crate::error::Result<Vec<Address>> {
    redistribute_to_array(pull, desc, output, Some(&aggregate)).await
}

/// `redistributeToRandomAccess` (§4.5): materialize into a fresh `MemArray`
/// so the caller gets `RANDOM` access regardless of `toScheme`.
pub async fn redistribute_to_random_access(
    pull: &mut PullSgArrayBlocking,
    desc: &ArrayDesc,
) -> crate::error::Result<Arc<MemArray>> {
    let output = MemArray::new(desc.clone());
    redistribute_to_array(pull, desc, &output, None).await?;
    Ok(output)
}
