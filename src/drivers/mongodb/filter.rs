//! Predicate translation to MongoDB query documents.

use mongodb::bson::{doc, Document};

use crate::traits::{parse_number, Comparator, FilterPredicate, PredicateTranslator, Translation};

fn query_operator(op: Comparator) -> &'static str {
    match op {
        Comparator::Eq => "$eq",
        Comparator::Ne => "$ne",
        Comparator::Gt => "$gt",
        Comparator::Ge => "$gte",
        Comparator::Lt => "$lt",
        Comparator::Le => "$lte",
    }
}

/// Translates predicates into a single `$and` query document.
///
/// Cells are stored as strings, so every comparison the server runs is a
/// string comparison. Ordering predicates with a numeric comparand are
/// returned as a residual and checked on each fetched document.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentTranslator;

impl DocumentTranslator {
    fn condition(predicate: &FilterPredicate, op: Comparator) -> Document {
        let column = predicate.column.as_str();
        let comparand = predicate.comparand.as_str();

        match op {
            Comparator::Eq => doc! { column: comparand },
            // `$ne` alone also matches documents without the field.
            Comparator::Ne => doc! { column: { "$ne": comparand, "$exists": true } },
            _ => doc! { column: { query_operator(op): comparand } },
        }
    }
}

impl PredicateTranslator for DocumentTranslator {
    type Fragment = Document;

    fn translate(&self, filters: &[FilterPredicate]) -> Translation<Document> {
        let mut conditions = Vec::new();
        let mut residual = Vec::new();

        for predicate in filters {
            let Some(op) = predicate.comparator else {
                continue;
            };
            if op.is_ordering() && parse_number(&predicate.comparand).is_some() {
                residual.push(predicate.clone());
            } else {
                conditions.push(Self::condition(predicate, op));
            }
        }

        // MongoDB rejects an empty `$and`.
        let native = if conditions.is_empty() {
            Document::new()
        } else {
            doc! { "$and": conditions }
        };

        if residual.is_empty() {
            Translation::Native(native)
        } else {
            Translation::Split { native, residual }
        }
    }
}
