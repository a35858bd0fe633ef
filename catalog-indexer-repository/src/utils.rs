//! Utility functions for the catalog indexer repository.

use catalog_indexer_shared::ModelId;

/// Split a list of IDs into chunks of at most `chunk_size` elements.
///
/// Used to bound the size of `= ANY($1)` parameter arrays and bulk request bodies
/// regardless of how many IDs a flush carries. A `chunk_size` of zero is treated as one.
///
/// # Example
///
/// ```
/// use catalog_indexer_repository::chunk_ids;
///
/// let chunks = chunk_ids(&[1, 2, 3, 4, 5], 2);
/// assert_eq!(chunks, vec![vec![1, 2], vec![3, 4], vec![5]]);
/// ```
pub fn chunk_ids(ids: &[ModelId], chunk_size: usize) -> Vec<Vec<ModelId>> {
    ids.chunks(chunk_size.max(1)).map(|c| c.to_vec()).collect()
}
