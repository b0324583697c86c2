use crate::catalog::store::EmbeddingStore;
use crate::catalog::types::Page;
use crate::error::{Error, Result};

/// Fetch page `page` (1-based) of `page_size` records in insertion order.
///
/// Pages past the end come back with no records; `total` is the record count
/// seen by the same read.
pub fn page(store: &EmbeddingStore, page: usize, page_size: usize) -> Result<Page> {
    if page == 0 {
        return Err(Error::InvalidInput("page numbers start at 1".into()));
    }
    if page_size == 0 {
        return Err(Error::InvalidInput("page_size must be at least 1".into()));
    }

    let offset = (page - 1).saturating_mul(page_size);
    let (records, total) = store.page_slice(offset, page_size)?;

    Ok(Page {
        records,
        total,
        page,
        page_size,
    })
}
