//! Property-based tests for the schema analyzer.
//!
//! Documents are generated from a small vocabulary of keys and value shapes so
//! that paths collide often and every code path of the aggregator (scalars,
//! embedded documents, arrays of scalars and arrays of documents) is reached.

use bson::{Bson, Document};
use docscan::analyzers::{analyze_documents, plan_sample_size};
use docscan::types::Field;
use proptest::prelude::*;

const KEYS: [&str; 5] = ["_id", "name", "meta", "tags", "score"];

fn scalar() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any::<i32>().prop_map(Bson::Int32),
        any::<i64>().prop_map(Bson::Int64),
        "[a-z]{0,6}".prop_map(Bson::String),
        any::<bool>().prop_map(Bson::Boolean),
        Just(Bson::Null),
    ]
}

fn value() -> impl Strategy<Value = Bson> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Bson::Array),
            prop::collection::vec((prop::sample::select(KEYS.to_vec()), inner), 0..4).prop_map(
                |pairs| {
                    let mut doc = Document::new();
                    for (key, value) in pairs {
                        doc.insert(key, value);
                    }
                    Bson::Document(doc)
                }
            ),
        ]
    })
}

fn document() -> impl Strategy<Value = Document> {
    prop::collection::vec((prop::sample::select(KEYS.to_vec()), value()), 0..6).prop_map(|pairs| {
        let mut doc = Document::new();
        for (key, value) in pairs {
            doc.insert(key, value);
        }
        doc
    })
}

fn visit<'a>(fields: &'a [Field], out: &mut Vec<&'a Field>) {
    for field in fields {
        out.push(field);
        visit(field.children(), out);
    }
}

fn all_fields(fields: &[Field]) -> Vec<&Field> {
    let mut out = Vec::new();
    visit(fields, &mut out);
    out
}

proptest! {
    #[test]
    fn prop_presence_within_bounds(docs in prop::collection::vec(document(), 1..20)) {
        let analysis = analyze_documents(&docs);
        for field in all_fields(&analysis.fields) {
            prop_assert!(field.presence_percent > 0.0, "{} has no presence", field.path);
            prop_assert!(field.presence_percent <= 100.0, "{} above 100%", field.path);
        }
    }

    #[test]
    fn prop_frequencies_sum_to_hundred(docs in prop::collection::vec(document(), 1..20)) {
        let analysis = analyze_documents(&docs);
        for field in all_fields(&analysis.fields) {
            // Half-up rounding drifts by at most 0.005 per entry.
            let tolerance = 0.005 * field.types.len() as f64 + 1e-9;
            let sum: f64 = field.types.iter().map(|t| t.frequency_percent).sum();
            prop_assert!((sum - 100.0).abs() <= tolerance, "{}: sum {}", field.path, sum);
        }
    }

    #[test]
    fn prop_types_sorted_and_inferred_consistently(docs in prop::collection::vec(document(), 1..20)) {
        let analysis = analyze_documents(&docs);
        for field in all_fields(&analysis.fields) {
            let freqs: Vec<f64> = field.types.iter().map(|t| t.frequency_percent).collect();
            prop_assert!(freqs.windows(2).all(|w| w[0] >= w[1]));

            let top = &field.types[0];
            if top.frequency_percent > 75.0 {
                prop_assert_eq!(&field.inferred_type, &top.type_name);
            } else {
                prop_assert_eq!(field.inferred_type.as_str(), "mixed");
            }
        }
    }

    #[test]
    fn prop_identity_first_then_sorted(docs in prop::collection::vec(document(), 1..20)) {
        let analysis = analyze_documents(&docs);
        let paths: Vec<&str> = analysis.fields.iter().map(|f| f.path.as_str()).collect();

        let rest = match paths.iter().position(|p| *p == "_id") {
            Some(pos) => {
                prop_assert_eq!(pos, 0);
                &paths[1..]
            }
            None => &paths[..],
        };
        prop_assert!(rest.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_children_only_under_objects(docs in prop::collection::vec(document(), 1..20)) {
        let analysis = analyze_documents(&docs);
        for field in all_fields(&analysis.fields) {
            if field.nested_fields.is_some() {
                prop_assert!(field.types.iter().any(|t| t.type_name == "object"));
            }
        }
    }

    #[test]
    fn prop_confidence_within_bounds(docs in prop::collection::vec(document(), 0..20)) {
        let analysis = analyze_documents(&docs);
        prop_assert!(analysis.schema_confidence >= 0.0);
        prop_assert!(analysis.schema_confidence <= 100.0);
    }

    #[test]
    fn prop_sample_size_is_capped(count in any::<u64>(), cap in 0u64..500_000) {
        let size = plan_sample_size(count, cap);
        let effective_cap = if cap == 0 { 75_000 } else { cap };
        prop_assert!(size <= effective_cap);
        prop_assert!(size <= count.max(50_000));
    }
}
