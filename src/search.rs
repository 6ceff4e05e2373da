use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Document, doc},
};
use tracing::debug;

use crate::{
    error::Result,
    query::{FilterSet, normalize_package, resolve_limit},
};

/// The outcome of one search: matching documents, newest first, plus a
/// display summary of the filters that produced them.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub documents: Vec<Document>,
    pub summary: String,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Execute the full search pipeline.
///
/// 1. Build the store predicate from the filter set
/// 2. Resolve the limit string to a cap or unbounded
/// 3. Fetch with the given projection, newest first, capped
/// 4. Re-check the package threshold client-side (units normalized)
/// 5. Summarize the active filters for display
pub async fn run(
    collection: &Collection<Document>,
    filters: &FilterSet,
    limit_input: &str,
    projection: Document,
) -> Result<SearchOutcome> {
    let predicate = filters.predicate();
    let limit = resolve_limit(limit_input);

    let mut find = collection
        .find(predicate)
        .projection(projection)
        .sort(doc! { "_id": -1 });
    if let Some(cap) = limit {
        find = find.limit(cap);
    }
    let fetched: Vec<Document> = find.await?.try_collect().await?;
    let fetched_count = fetched.len();

    let documents = match filters.package_threshold() {
        Some(threshold) => apply_package_threshold(fetched, threshold),
        None => fetched,
    };

    debug!(
        fetched = fetched_count,
        kept = documents.len(),
        limit = ?limit,
        "search complete"
    );

    Ok(SearchOutcome {
        documents,
        summary: filters.summary(),
    })
}

/// Keep documents whose normalized package value is at or above the
/// normalized threshold. Documents with a missing, empty, or
/// non-numeric package are retained: absence of a figure is not
/// grounds for exclusion.
pub fn apply_package_threshold(documents: Vec<Document>, threshold: f64) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|doc| match doc.get_str("package") {
            Ok(text) if !text.is_empty() => match normalize_package(text) {
                Some(value) => value >= threshold,
                None => true,
            },
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packages(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.get_str("package").unwrap()).collect()
    }

    #[test]
    fn threshold_drops_lower_lpa_values() {
        let docs = vec![
            doc! { "company_name": "A", "package": "6 LPA" },
            doc! { "company_name": "B", "package": "12 LPA" },
            doc! { "company_name": "C", "package": "9 LPA" },
        ];
        let threshold = normalize_package("8").unwrap();
        let kept = apply_package_threshold(docs, threshold);
        assert_eq!(packages(&kept), vec!["12 LPA", "9 LPA"]);
    }

    #[test]
    fn threshold_compares_mixed_units() {
        let docs = vec![
            doc! { "package": "600000" },
            doc! { "package": "9 LPA" },
            doc! { "package": "1200000" },
        ];
        let threshold = normalize_package("8").unwrap();
        let kept = apply_package_threshold(docs, threshold);
        assert_eq!(packages(&kept), vec!["9 LPA", "1200000"]);
    }

    #[test]
    fn missing_package_is_retained() {
        let docs = vec![
            doc! { "company_name": "NO FIELD" },
            doc! { "company_name": "EMPTY", "package": "" },
            doc! { "company_name": "LOW", "package": "2 LPA" },
        ];
        let threshold = normalize_package("8").unwrap();
        let kept = apply_package_threshold(docs, threshold);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|d| {
            d.get_str("package").map(|p| p.is_empty()).unwrap_or(true)
        }));
    }

    #[test]
    fn unparsable_package_is_retained() {
        let docs = vec![
            doc! { "package": "COMPETITIVE" },
            doc! { "package": "4 LPA" },
        ];
        let threshold = normalize_package("8").unwrap();
        let kept = apply_package_threshold(docs, threshold);
        assert_eq!(packages(&kept), vec!["COMPETITIVE"]);
    }

    #[test]
    fn summary_carries_package_filter() {
        let filters = crate::company::search_filters("", "", "", "").package("8");
        assert_eq!(filters.summary(), "Package: 8");
    }
}
