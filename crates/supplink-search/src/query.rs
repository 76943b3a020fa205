use supplink_core::DEFAULT_QUERY_TEMPLATES;

/// Expands query templates for a brand + item pair.
///
/// Templates are kept in the order given; the collector issues queries in
/// that order and stops early once a brand is capped, so the most specific
/// templates belong first.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    templates: Vec<String>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TEMPLATES.iter().map(|t| (*t).to_owned()))
    }
}

impl QueryBuilder {
    pub fn new(templates: impl IntoIterator<Item = String>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Substitutes `{brand}` and `{item}` into every template. Identical
    /// expansions are issued once.
    #[must_use]
    pub fn build(&self, brand: &str, item: &str) -> Vec<String> {
        let brand = brand.trim();
        let item = item.trim();
        let mut queries: Vec<String> = Vec::with_capacity(self.templates.len());
        for template in &self.templates {
            let query = template.replace("{brand}", brand).replace("{item}", item);
            let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
            if !query.is_empty() && !queries.contains(&query) {
                queries.push(query);
            }
        }
        queries
    }
}

/// Expands the default templates.
#[must_use]
pub fn build_queries(brand: &str, item: &str) -> Vec<String> {
    QueryBuilder::default().build(brand, item)
}
