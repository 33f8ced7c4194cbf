//! Heuristic metrics over a raw extraction reply
//!
//! Scores work on the reply as untyped JSON so that a reply with the wrong
//! shape still gets a (low) consistency score instead of failing outright.

use graphscribe_domain::{Metric, MetricScore, SchemaSpec};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Characters that end one information unit of the source text
const UNIT_SEPARATORS: &[char] = &[
    '。', '！', '？', '；', '，', '、', '：', '.', '!', '?', ';', ',', ':', '\n', '\r',
];

fn array_at<'a>(reply: &'a Value, key: &str) -> &'a [Value] {
    reply
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn nodes(reply: &Value) -> &[Value] {
    array_at(reply, "nodes")
}

fn relationships(reply: &Value) -> &[Value] {
    array_at(reply, "relationships")
}

fn str_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn string_array(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

/// Lowercased, with every non-alphanumeric character removed
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split source text into clause-level information units
pub fn information_units(text: &str) -> Vec<&str> {
    text.split(UNIT_SEPARATORS)
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
        .collect()
}

/// Every name, alias and attribute value in the reply, lowercased
fn surface_strings(reply: &Value) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes(reply) {
        if let Some(name) = str_field(node, "name") {
            out.push(name.to_lowercase());
        }
        if let Some(aliases) = node.get("aliases").and_then(string_array) {
            out.extend(aliases.into_iter().map(str::to_lowercase));
        }
        if let Some(attributes) = node.get("attributes").and_then(Value::as_object) {
            for values in attributes.values().filter_map(string_array) {
                out.extend(values.into_iter().map(str::to_lowercase));
            }
        }
    }
    out.retain(|s| !s.trim().is_empty());
    out
}

/// Share of information units that mention any extracted surface string
pub fn completeness(reply: &Value, text: &str) -> MetricScore {
    let units = information_units(text);
    if units.is_empty() {
        return MetricScore::new(0.0, "source text has no information units");
    }

    let surfaces = surface_strings(reply);
    let covered = units
        .iter()
        .filter(|unit| {
            let unit = unit.to_lowercase();
            surfaces.iter().any(|s| unit.contains(s.as_str()))
        })
        .count();

    MetricScore::new(
        covered as f64 / units.len() as f64,
        format!("{}/{} information units covered", covered, units.len()),
    )
}

/// Share of relationships whose relation type is allowed by the schema
///
/// The note also counts relationships whose endpoint node types match a full
/// triplet; that count does not affect the score.
pub fn accuracy(reply: &Value, schema: &SchemaSpec) -> MetricScore {
    let relationships = relationships(reply);
    if relationships.is_empty() {
        return MetricScore::new(0.0, "no relationships extracted");
    }

    let allowed_relations: HashSet<String> = schema.allowed_relations().into_iter().collect();
    let node_types: HashMap<&str, &str> = nodes(reply)
        .iter()
        .filter_map(|n| Some((str_field(n, "id")?, str_field(n, "type")?)))
        .collect();

    let mut allowed = 0;
    let mut typed_matches = 0;
    for rel in relationships {
        let Some(relation) = str_field(rel, "type") else {
            continue;
        };
        if !allowed_relations.contains(relation) {
            continue;
        }
        allowed += 1;

        let endpoint_types = str_field(rel, "source")
            .and_then(|id| node_types.get(id))
            .zip(str_field(rel, "target").and_then(|id| node_types.get(id)));
        if let Some((source_type, target_type)) = endpoint_types {
            if schema.allows(source_type, relation, target_type) {
                typed_matches += 1;
            }
        }
    }

    MetricScore::new(
        allowed as f64 / relationships.len() as f64,
        format!(
            "{}/{} relationships use an allowed relation, {} match a full triplet",
            allowed,
            relationships.len(),
            typed_matches
        ),
    )
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn node_conforms(node: &Value) -> bool {
    let Some(obj) = node.as_object() else {
        return false;
    };
    let required = ["id", "name", "type"].iter().all(|k| non_empty_str(obj, k));
    let aliases_ok = obj
        .get("aliases")
        .map_or(true, |v| string_array(v).is_some());
    let definition_ok = obj.get("definition").map_or(true, Value::is_string);
    let attributes_ok = obj.get("attributes").map_or(true, |v| {
        v.as_object()
            .is_some_and(|attrs| attrs.values().all(|vals| string_array(vals).is_some()))
    });
    required && aliases_ok && definition_ok && attributes_ok
}

fn relationship_conforms(rel: &Value, node_ids: &HashSet<&str>) -> bool {
    let Some(obj) = rel.as_object() else {
        return false;
    };
    let endpoint_ok = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .is_some_and(|id| node_ids.contains(id))
    };
    endpoint_ok("source") && endpoint_ok("target") && non_empty_str(obj, "type")
}

/// Share of nodes and relationships that have the required JSON shape
pub fn consistency(reply: &Value) -> MetricScore {
    let well_formed = reply.is_object()
        && reply.get("nodes").is_some_and(Value::is_array)
        && reply.get("relationships").is_some_and(Value::is_array);
    if !well_formed {
        return MetricScore::new(
            0.0,
            "reply is not an object with nodes and relationships arrays",
        );
    }

    let nodes = nodes(reply);
    let relationships = relationships(reply);
    let total = nodes.len() + relationships.len();
    if total == 0 {
        return MetricScore::new(0.0, "empty extraction");
    }

    let node_ids: HashSet<&str> = nodes.iter().filter_map(|n| str_field(n, "id")).collect();
    let conforming = nodes.iter().filter(|n| node_conforms(n)).count()
        + relationships
            .iter()
            .filter(|r| relationship_conforms(r, &node_ids))
            .count();

    MetricScore::new(
        conforming as f64 / total as f64,
        format!("{}/{} items conform to the output shape", conforming, total),
    )
}

fn node_relevance(node: &Value, text_lower: &str, text_squashed: &str) -> f64 {
    let Some(name) = str_field(node, "name") else {
        return 0.0;
    };
    let aliases = node.get("aliases").and_then(string_array).unwrap_or_default();

    let verbatim = std::iter::once(name).chain(aliases).any(|candidate| {
        let lower = candidate.trim().to_lowercase();
        let squashed = squash(candidate);
        (!lower.is_empty() && text_lower.contains(&lower))
            || (!squashed.is_empty() && text_squashed.contains(&squashed))
    });
    if verbatim {
        return 1.0;
    }

    let partial = name
        .split_whitespace()
        .map(str::to_lowercase)
        .any(|token| text_lower.contains(&token));
    if partial {
        0.5
    } else {
        0.0
    }
}

/// How well node names are grounded in the source text
///
/// Each node scores 1.0 when its name or an alias appears in the text (ignoring
/// case, or ignoring whitespace and punctuation), 0.5 when only one word of
/// its name does, and 0 otherwise.
pub fn relevance(reply: &Value, text: &str) -> MetricScore {
    let nodes = nodes(reply);
    if nodes.is_empty() {
        return MetricScore::new(0.0, "no nodes extracted");
    }

    let text_lower = text.to_lowercase();
    let text_squashed = squash(text);
    let total: f64 = nodes
        .iter()
        .map(|n| node_relevance(n, &text_lower, &text_squashed))
        .sum();
    let grounded = nodes
        .iter()
        .filter(|n| node_relevance(n, &text_lower, &text_squashed) >= 1.0)
        .count();

    MetricScore::new(
        total / nodes.len() as f64,
        format!("{}/{} nodes found verbatim in the text", grounded, nodes.len()),
    )
}

/// Score one metric
pub fn score(metric: Metric, reply: &Value, text: &str, schema: &SchemaSpec) -> MetricScore {
    match metric {
        Metric::Completeness => completeness(reply, text),
        Metric::Accuracy => accuracy(reply, schema),
        Metric::Consistency => consistency(reply),
        Metric::Relevance => relevance(reply, text),
    }
}
