//! Constraints and indices the pipeline relies on. All statements are `IF NOT EXISTS`,
//! so running them again is a no-op.

use crate::traits::graph_store::GraphQuery;

/// Node keys of the document hierarchy
const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT IF NOT EXISTS FOR (n:Directory) REQUIRE n.id IS NODE KEY",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (n:File) REQUIRE n.id IS NODE KEY",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (n:Page) REQUIRE n.id IS NODE KEY",
];

/// Text indices: `(index name, label, property)`
const TEXT_INDICES: &[(&str, &str, &str)] = &[
    ("node_entity_name", "Entity", "name"),
    ("node_entity_label", "Entity", "_label_llm"),
    ("per_name", "Person", "name"),
    ("org_name", "Organization", "name"),
    ("fac_name", "Facility", "name"),
    ("loc_name", "Location", "name"),
    ("substance_name", "Substance", "name"),
    ("health_name", "HealthFactor", "name"),
    ("product_name", "Product", "name"),
    ("event_name", "Event", "name"),
];

/// Fulltext indices: `(index name, label, property)`
const FULLTEXT_INDICES: &[(&str, &str, &str)] = &[
    ("pageTexts", "Page", "text"),
    ("fileNames", "File", "name"),
    ("entityNames", "Entity", "name"),
    ("perNames", "Person", "name"),
    ("orgNames", "Organization", "name"),
    ("facNames", "Facility", "name"),
    ("locNames", "Location", "name"),
    ("substanceNames", "Substance", "name"),
    ("healthNames", "HealthFactor", "name"),
    ("productNames", "Product", "name"),
];

pub fn index_queries() -> Vec<GraphQuery> {
    let constraints = CONSTRAINTS.iter().map(|q| GraphQuery::new(*q));
    let text = TEXT_INDICES.iter().map(|(name, label, property)| {
        GraphQuery::new(format!(
            "CREATE TEXT INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{})",
            name, label, property
        ))
    });
    let fulltext = FULLTEXT_INDICES.iter().map(|(name, label, property)| {
        GraphQuery::new(format!(
            "CREATE FULLTEXT INDEX {} IF NOT EXISTS FOR (n:{}) ON EACH [n.{}]",
            name, label, property
        ))
    });
    constraints.chain(text).chain(fulltext).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_queries() {
        let queries = index_queries();
        assert_eq!(queries.len(), 23);
        assert!(queries.iter().all(|q| q.query.contains("IF NOT EXISTS") && q.params.is_none()));
        assert_eq!(
            queries[3].query,
            "CREATE TEXT INDEX node_entity_name IF NOT EXISTS FOR (n:Entity) ON (n.name)"
        );
        assert_eq!(
            queries[13].query,
            "CREATE FULLTEXT INDEX pageTexts IF NOT EXISTS FOR (n:Page) ON EACH [n.text]"
        );
    }
}
