//! Source table column catalog.

/// A single source column as reported by schema introspection.
///
/// Immutable once fetched; the catalog's order defines the positional
/// mapping between source row tuples and the target insert template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name as reported by the source.
    pub name: String,

    /// Raw, dialect-specific type name (e.g. `int`, `varchar`).
    pub source_type: String,

    /// Whether the column participates in the primary key.
    pub is_primary_key: bool,
}

/// Ordered sequence of source columns, fetched once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnCatalog {
    columns: Vec<ColumnDefinition>,
}

impl ColumnCatalog {
    /// Create a catalog from introspection results, preserving order.
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }

    /// All columns in introspection order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Names of the primary-key columns, in catalog order.
    pub fn primary_keys(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Case-insensitive column lookup, used to validate order-by lists.
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: &str, pk: bool) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            source_type: ty.to_string(),
            is_primary_key: pk,
        }
    }

    #[test]
    fn test_primary_keys_preserve_order() {
        let catalog = ColumnCatalog::new(vec![
            col("tenant_id", "int", true),
            col("name", "varchar", false),
            col("id", "bigint", true),
        ]);
        assert_eq!(catalog.primary_keys(), vec!["tenant_id", "id"]);
    }

    #[test]
    fn test_contains_ignore_case() {
        let catalog = ColumnCatalog::new(vec![col("CreatedAt", "datetime", false)]);
        assert!(catalog.contains_ignore_case("createdat"));
        assert!(catalog.contains_ignore_case("CREATEDAT"));
        assert!(!catalog.contains_ignore_case("updated_at"));
    }
}
