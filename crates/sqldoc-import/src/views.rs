//! Map/reduce view-definition synthesis.
//!
//! View source is generated by literal text substitution from table metadata.
//! Table and column names are substituted verbatim: a name containing the
//! view language's quote or brace characters yields invalid function source.
//! This mirrors the importer's historical behavior and is a documented
//! limitation, not something the synthesizer tries to repair.

use serde::{Deserialize, Serialize};

/// Design document holding every per-run view.
pub const GLOBAL_DESIGN_DOC: &str = "all";

/// View name for the per-table primary-key lookup.
pub const BY_PK_VIEW: &str = "by_pk";

/// View name for the global type lookup.
pub const BY_TYPE_VIEW: &str = "by_type";

/// Fixed count-aggregator reduce function.
pub const COUNT_REDUCE: &str = "_count";

/// A named, persisted pair of map and reduce functions defining a secondary
/// index over stored documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    /// Design document the view is stored under.
    pub design_doc: String,
    /// View name.
    pub name: String,
    /// Map function source.
    pub map: String,
    /// Reduce function name.
    pub reduce: String,
}

/// Synthesize the by-primary-key view for a table.
///
/// `type_name` and `pk_columns` are expected pre-folded with the configured
/// field-case policy; `table` names the design document and is used as-is.
/// With one primary-key column the map function emits that field's scalar
/// value; with several it emits an ordered array. A table with no primary
/// key yields a well-formed map function that emits nothing.
#[must_use]
pub fn by_primary_key(table: &str, type_name: &str, pk_columns: &[String]) -> ViewDefinition {
    let mut map = String::new();
    map.push_str("function (doc, meta) {\n");
    map.push_str("  var idx = (meta.id).indexOf(\":\");\n");
    map.push_str("  var docType = (meta.id).substring(0, idx);\n");

    if !pk_columns.is_empty() {
        let guards: Vec<String> = pk_columns.iter().map(|c| format!("doc.{c}")).collect();
        map.push_str(&format!(
            "  if (meta.type == 'json' && docType == '{type_name}' && {}) {{\n",
            guards.join(" && ")
        ));
        if pk_columns.len() == 1 {
            map.push_str(&format!("    emit(doc.{});\n", pk_columns[0]));
        } else {
            map.push_str(&format!("    emit([{}]);\n", guards.join(", ")));
        }
        map.push_str("  }\n");
    }
    map.push_str("}\n");

    ViewDefinition {
        design_doc: table.to_string(),
        name: BY_PK_VIEW.to_string(),
        map,
        reduce: COUNT_REDUCE.to_string(),
    }
}

/// Synthesize the global by-type view: for every structured document, emit
/// the identifier's prefix before the first `:`.
#[must_use]
pub fn by_type() -> ViewDefinition {
    let map = concat!(
        "function (doc, meta) {\n",
        "  if (meta.type == \"json\") {\n",
        "    var idx = (meta.id).indexOf(\":\");\n",
        "    emit((meta.id).substring(0, idx));\n",
        "  }\n",
        "}\n",
    )
    .to_string();

    ViewDefinition {
        design_doc: GLOBAL_DESIGN_DOC.to_string(),
        name: BY_TYPE_VIEW.to_string(),
        map,
        reduce: COUNT_REDUCE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pk_emits_scalar() {
        let view = by_primary_key("orders", "orders", &["id".to_string()]);
        assert_eq!(view.design_doc, "orders");
        assert_eq!(view.name, "by_pk");
        assert_eq!(view.reduce, "_count");
        assert!(view
            .map
            .contains("if (meta.type == 'json' && docType == 'orders' && doc.id)"));
        assert!(view.map.contains("emit(doc.id);"));
        assert!(!view.map.contains("emit(["));
    }

    #[test]
    fn test_composite_pk_emits_ordered_array() {
        let view = by_primary_key("lines", "lines", &["a".to_string(), "b".to_string()]);
        assert!(view
            .map
            .contains("docType == 'lines' && doc.a && doc.b"));
        assert!(view.map.contains("emit([doc.a, doc.b]);"));
    }

    #[test]
    fn test_no_pk_is_well_formed_and_emits_nothing() {
        let view = by_primary_key("log", "log", &[]);
        assert!(!view.map.contains("emit"));
        assert!(!view.map.contains("if ("));
        // Balanced braces: one opening function brace, one closing.
        let opens = view.map.matches('{').count();
        let closes = view.map.matches('}').count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn test_case_folded_names_flow_through() {
        let view = by_primary_key("ORDERS", "orders", &["order_id".to_string()]);
        assert_eq!(view.design_doc, "ORDERS");
        assert!(view.map.contains("docType == 'orders'"));
        assert!(view.map.contains("doc.order_id"));
    }

    #[test]
    fn test_by_type_view() {
        let view = by_type();
        assert_eq!(view.design_doc, "all");
        assert_eq!(view.name, "by_type");
        assert_eq!(view.reduce, "_count");
        assert!(view.map.contains("meta.type == \"json\""));
        assert!(view.map.contains("emit((meta.id).substring(0, idx));"));
        let opens = view.map.matches('{').count();
        assert_eq!(opens, view.map.matches('}').count());
    }

    #[test]
    fn test_map_source_is_deterministic() {
        let a = by_primary_key("t", "t", &["x".to_string()]);
        let b = by_primary_key("t", "t", &["x".to_string()]);
        assert_eq!(a, b);
    }
}
