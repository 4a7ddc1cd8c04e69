//! Flat per-path statistics over a batch of documents.
//!
//! Every path reachable by walking a document is recorded under its dotted
//! path. Values inside arrays are tracked under the array's path with an
//! [`ARRAY_MARKER`] suffix, so `tags` counts the field itself while `tags[]`
//! counts the elements it held. Objects found inside arrays are walked with the
//! marked path as their parent (`items[].sku`).
//!
//! An aggregator is owned by a single collection worker and is dropped once
//! the schema has been built from it, so it needs no synchronization.

use std::collections::HashMap;

use bson::{Bson, Document};

use crate::analyzers::classifier::{classify_value, TypeTag};

/// Suffix appended to an array field's path for statistics about its elements.
pub const ARRAY_MARKER: &str = "[]";

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// Occurrence and type counters for one dotted path.
#[derive(Debug, Clone, Default)]
pub struct FieldStat {
    /// Number of values observed at this path. Array-element paths count
    /// once per element.
    pub occurrences: u64,
    /// Number of distinct documents in which the path occurred.
    pub documents: u64,
    /// Type counts in first-seen order.
    types: Vec<(TypeTag, u64)>,
    last_document: Option<usize>,
}

impl FieldStat {
    fn record(&mut self, tag: TypeTag, document: usize) {
        self.occurrences += 1;
        if self.last_document != Some(document) {
            self.last_document = Some(document);
            self.documents += 1;
        }

        match self.types.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, count)) => *count += 1,
            None => self.types.push((tag, 1)),
        }
    }

    /// Observed types with their counts, in first-seen order.
    pub fn types(&self) -> &[(TypeTag, u64)] {
        &self.types
    }

    /// Number of values of the given type.
    pub fn count_of(&self, tag: &TypeTag) -> u64 {
        self.types
            .iter()
            .find(|(t, _)| t == tag)
            .map_or(0, |(_, count)| *count)
    }

    /// Whether the path was ever observed holding an embedded document.
    pub fn is_object_carrier(&self) -> bool {
        self.types.iter().any(|(t, _)| t.is_object())
    }
}

/// Builds the path → [`FieldStat`] mapping for a batch of documents.
#[derive(Debug, Default)]
pub struct FieldAggregator {
    stats: HashMap<String, FieldStat>,
    documents: u64,
}

impl FieldAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate every document of a batch.
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut aggregator = Self::new();
        for document in documents {
            aggregator.observe(document);
        }
        aggregator
    }

    /// Record all paths of one document.
    pub fn observe(&mut self, document: &Document) {
        let index = self.documents as usize;
        self.documents += 1;
        self.extract_fields(document, None, index);
    }

    /// Number of documents observed so far.
    pub fn document_count(&self) -> u64 {
        self.documents
    }

    pub fn get(&self, path: &str) -> Option<&FieldStat> {
        self.stats.get(path)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Iterate over all recorded paths and their statistics.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldStat)> {
        self.stats.iter().map(|(path, stat)| (path.as_str(), stat))
    }

    fn extract_fields(&mut self, document: &Document, prefix: Option<&str>, index: usize) {
        for (key, value) in document {
            let path = match prefix {
                Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{key}"),
                None => key.clone(),
            };

            self.record(&path, classify_value(value), index);

            match value {
                Bson::Document(nested) => self.extract_fields(nested, Some(&path), index),
                Bson::Array(items) => self.extract_elements(items, &path, index),
                _ => {}
            }
        }
    }

    fn extract_elements(&mut self, items: &[Bson], path: &str, index: usize) {
        let element_path = format!("{path}{ARRAY_MARKER}");

        for item in items {
            self.record(&element_path, classify_value(item), index);
            if let Bson::Document(nested) = item {
                self.extract_fields(nested, Some(&element_path), index);
            }
        }
    }

    fn record(&mut self, path: &str, tag: TypeTag, index: usize) {
        if let Some(stat) = self.stats.get_mut(path) {
            stat.record(tag, index);
            return;
        }

        let mut stat = FieldStat::default();
        stat.record(tag, index);
        self.stats.insert(path.to_string(), stat);
    }
}
