//! Reconstruction of the nested field tree from flat path statistics.
//!
//! The builder turns the output of a [`FieldAggregator`] into [`Field`]
//! descriptors: type distributions, the dominant type, presence, and nested
//! children. Children hang off their direct parent only, and only when the
//! parent was observed holding an embedded document.

use std::collections::HashMap;

use tracing::trace;

use crate::analyzers::aggregator::{FieldAggregator, FieldStat, PATH_SEPARATOR};
use crate::types::{CollectionAnalysis, Field, TypeFrequency};

/// A type must exceed this frequency to be reported as the inferred type.
pub const DOMINANCE_THRESHOLD: f64 = 75.0;

/// Top-level fields below this presence are reported as rare.
pub const RARE_FIELD_THRESHOLD: f64 = 5.0;

/// Identity field that always sorts first among top-level fields.
pub const IDENTITY_FIELD: &str = "_id";

/// Inferred type of a field without a dominant type.
pub const MIXED_TYPE: &str = "mixed";

/// Inferred type of a field without any observed value.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Round to two decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Determine the inferred type from a distribution sorted by frequency.
pub fn infer_type(types: &[TypeFrequency]) -> String {
    match types.first() {
        None => UNKNOWN_TYPE.to_string(),
        Some(top) if top.frequency_percent > DOMINANCE_THRESHOLD => top.type_name.clone(),
        Some(_) => MIXED_TYPE.to_string(),
    }
}

/// Mean of dominant frequency × presence over the given fields, as a percentage.
pub fn schema_confidence(fields: &[Field]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }

    let total: f64 = fields
        .iter()
        .map(|f| (f.dominant_frequency() / 100.0) * (f.presence_percent / 100.0))
        .sum();

    round2(total / fields.len() as f64 * 100.0)
}

/// Builds a [`CollectionAnalysis`] from aggregated statistics.
pub struct SchemaBuilder<'a> {
    aggregator: &'a FieldAggregator,
    children: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(aggregator: &'a FieldAggregator) -> Self {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for (path, _) in aggregator.iter() {
            if let Some((parent, _)) = path.rsplit_once(PATH_SEPARATOR) {
                children.entry(parent).or_default().push(path);
            }
        }

        Self {
            aggregator,
            children,
        }
    }

    /// Build the field tree, schema confidence and rare-field list.
    pub fn build(&self) -> CollectionAnalysis {
        let mut fields: Vec<Field> = self
            .aggregator
            .iter()
            .filter(|(path, _)| !path.contains(PATH_SEPARATOR))
            .map(|(path, stat)| self.build_field(path, path, stat))
            .collect();

        fields.sort_by(|a, b| {
            let a_id = a.path == IDENTITY_FIELD;
            let b_id = b.path == IDENTITY_FIELD;
            b_id.cmp(&a_id).then_with(|| a.path.cmp(&b.path))
        });

        let rare_fields = fields
            .iter()
            .filter(|f| f.presence_percent < RARE_FIELD_THRESHOLD)
            .map(|f| f.path.clone())
            .collect();

        let schema_confidence = schema_confidence(&fields);

        trace!(
            fields = fields.len(),
            confidence = schema_confidence,
            "built schema tree"
        );

        CollectionAnalysis {
            fields,
            schema_confidence,
            rare_fields,
        }
    }

    fn build_field(&self, full_path: &str, relative_path: &str, stat: &FieldStat) -> Field {
        let types = type_distribution(stat);
        let inferred_type = infer_type(&types);

        let total_docs = self.aggregator.document_count();
        let presence_percent = if total_docs == 0 {
            0.0
        } else {
            round2(stat.documents as f64 / total_docs as f64 * 100.0)
        };

        let nested_fields = stat
            .is_object_carrier()
            .then(|| self.build_children(full_path));

        Field {
            path: relative_path.to_string(),
            types,
            inferred_type,
            presence_percent,
            nested_fields,
        }
    }

    fn build_children(&self, parent: &str) -> Vec<Field> {
        let Some(paths) = self.children.get(parent) else {
            return Vec::new();
        };

        let mut nested: Vec<Field> = paths
            .iter()
            .filter_map(|path| {
                let stat = self.aggregator.get(path)?;
                let relative = &path[parent.len() + 1..];
                Some(self.build_field(path, relative, stat))
            })
            .collect();

        nested.sort_by(|a, b| a.path.cmp(&b.path));
        nested
    }
}

fn type_distribution(stat: &FieldStat) -> Vec<TypeFrequency> {
    let total: u64 = stat.types().iter().map(|(_, count)| count).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut types: Vec<TypeFrequency> = stat
        .types()
        .iter()
        .map(|(tag, count)| TypeFrequency {
            type_name: tag.to_string(),
            frequency_percent: round2(*count as f64 / total as f64 * 100.0),
        })
        .collect();

    // Stable, so ties keep first-seen order.
    types.sort_by(|a, b| b.frequency_percent.total_cmp(&a.frequency_percent));
    types
}
