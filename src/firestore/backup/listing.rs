use crate::firestore::backup::options::{ListingOptions, RetrySettings};
use crate::firestore::backup::retry::retry_on_deadline;
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{CollectionKey, DocumentKey};
use crate::firestore::query::CollectionQuery;
use crate::firestore::remote::datastore::Datastore;

/// How the documents of a collection are enumerated.
///
/// `Filtered` transfers less data on large collections but never reports
/// documents that have no fields of their own (documents that only own
/// sub-collections); `Full` reports them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingMode {
    Full,
    Filtered,
}

impl ListingMode {
    /// Picks filtered pagination when clauses are configured and the collection
    /// path contains one of the configured substrings.
    pub fn for_collection(collection: &CollectionKey, options: &ListingOptions) -> Self {
        if options.where_clauses.is_empty() {
            return ListingMode::Full;
        }
        let path = collection.path().canonical_string();
        if options
            .where_paths
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
        {
            ListingMode::Filtered
        } else {
            ListingMode::Full
        }
    }
}

/// Enumerates the documents of `collection` using the mode chosen by
/// [`ListingMode::for_collection`]. Every remote call goes through the
/// deadline retry policy.
pub async fn list_documents(
    datastore: &dyn Datastore,
    collection: &CollectionKey,
    options: &ListingOptions,
    retry: &RetrySettings,
) -> FirestoreResult<Vec<DocumentKey>> {
    let mode = ListingMode::for_collection(collection, options);
    log::debug!("listing {collection} in {mode:?} mode");

    match mode {
        ListingMode::Full => {
            let label = format!("list documents of {collection}");
            retry_on_deadline(retry, &label, move || datastore.list_documents(collection)).await
        }
        ListingMode::Filtered => list_filtered(datastore, collection, options, retry).await,
    }
}

async fn list_filtered(
    datastore: &dyn Datastore,
    collection: &CollectionKey,
    options: &ListingOptions,
    retry: &RetrySettings,
) -> FirestoreResult<Vec<DocumentKey>> {
    let page_size = options.page_size.max(1);
    let label = format!("query page of {collection}");
    let mut keys = Vec::new();
    let mut cursor: Option<DocumentKey> = None;

    loop {
        let query = CollectionQuery::new(collection.clone())
            .with_filters(options.where_clauses.clone())
            .with_limit(page_size)
            .with_start_after(cursor.take());
        let query = &query;
        let page = retry_on_deadline(retry, &label, move || datastore.run_query(query)).await?;
        let page_len = page.len();

        keys.extend(page.into_iter().map(|snapshot| snapshot.document_key().clone()));
        if page_len < page_size as usize {
            return Ok(keys);
        }
        cursor = keys.last().cloned();
    }
}
