//! Extraction schemas: allowed `source_type-relation->target_type` triplets

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Schema passed with each extraction or evaluation request
///
/// Serialized as `{"schema": "<domain>", "triplet": ["A-rel->B", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Domain name (e.g. "人物关系", "crime")
    #[serde(rename = "schema")]
    pub name: String,

    /// Allowed triplet patterns, in request order
    #[serde(rename = "triplet", default)]
    pub triplets: Vec<String>,
}

/// One parsed triplet pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triplet {
    /// Source entity type
    pub source_type: String,
    /// Relation type
    pub relation: String,
    /// Target entity type
    pub target_type: String,
}

/// A triplet string that does not follow `source-relation->target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripletError {
    /// The offending pattern
    pub pattern: String,
    /// What is wrong with it
    pub reason: &'static str,
}

impl fmt::Display for TripletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid triplet '{}': {}", self.pattern, self.reason)
    }
}

impl std::error::Error for TripletError {}

impl Triplet {
    /// Parse `source_type-relation->target_type`
    ///
    /// # Examples
    ///
    /// ```
    /// use graphscribe_domain::Triplet;
    ///
    /// let t = Triplet::parse("人物-毕业院校->学校").unwrap();
    /// assert_eq!(t.source_type, "人物");
    /// assert_eq!(t.relation, "毕业院校");
    /// assert_eq!(t.target_type, "学校");
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, TripletError> {
        let err = |reason| TripletError {
            pattern: pattern.to_string(),
            reason,
        };

        let (head, target) = pattern.split_once("->").ok_or_else(|| err("missing '->'"))?;
        let (source, relation) = head
            .split_once('-')
            .ok_or_else(|| err("missing '-' between source type and relation"))?;

        let (source, relation, target) = (source.trim(), relation.trim(), target.trim());
        if source.is_empty() {
            return Err(err("empty source type"));
        }
        if relation.is_empty() {
            return Err(err("empty relation"));
        }
        if target.is_empty() {
            return Err(err("empty target type"));
        }

        Ok(Self {
            source_type: source.to_string(),
            relation: relation.to_string(),
            target_type: target.to_string(),
        })
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}->{}", self.source_type, self.relation, self.target_type)
    }
}

impl SchemaSpec {
    /// Create a schema from a domain name and triplet patterns
    pub fn new(name: impl Into<String>, triplets: Vec<String>) -> Self {
        Self {
            name: name.into(),
            triplets,
        }
    }

    /// Parse every triplet, failing on the first malformed one
    pub fn parse_triplets(&self) -> Result<Vec<Triplet>, TripletError> {
        self.triplets.iter().map(|p| Triplet::parse(p)).collect()
    }

    /// Sorted, de-duplicated source and target types
    pub fn allowed_node_types(&self) -> Vec<String> {
        let mut types = BTreeSet::new();
        for triplet in self.triplets.iter().filter_map(|p| Triplet::parse(p).ok()) {
            types.insert(triplet.source_type);
            types.insert(triplet.target_type);
        }
        types.into_iter().collect()
    }

    /// Sorted, de-duplicated relation types
    pub fn allowed_relations(&self) -> Vec<String> {
        self.triplets
            .iter()
            .filter_map(|p| Triplet::parse(p).ok())
            .map(|t| t.relation)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// True if `(source_type, relation, target_type)` is one of the allowed triplets
    pub fn allows(&self, source_type: &str, relation: &str, target_type: &str) -> bool {
        self.triplets
            .iter()
            .filter_map(|p| Triplet::parse(p).ok())
            .any(|t| {
                t.source_type == source_type
                    && t.relation == relation
                    && t.target_type == target_type
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_schema() -> SchemaSpec {
        SchemaSpec::new(
            "人物关系",
            vec![
                "人物-毕业院校->学校".to_string(),
                "人物-工作单位->公司".to_string(),
            ],
        )
    }

    #[test]
    fn test_parse_ascii_triplet() {
        let t = Triplet::parse("Person-HAS_PHONE->Phone").unwrap();
        assert_eq!(t.source_type, "Person");
        assert_eq!(t.relation, "HAS_PHONE");
        assert_eq!(t.target_type, "Phone");
        assert_eq!(t.to_string(), "Person-HAS_PHONE->Phone");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let t = Triplet::parse(" Person - knows -> Person ").unwrap();
        assert_eq!(t.relation, "knows");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Triplet::parse("Person knows Person").is_err());
        assert!(Triplet::parse("Person->Phone").is_err());
        assert!(Triplet::parse("-rel->Phone").is_err());
        assert!(Triplet::parse("Person-rel->").is_err());
        assert!(Triplet::parse("Person-->Phone").is_err());
    }

    #[test]
    fn test_allowed_lists_are_sorted_and_unique() {
        let schema = people_schema();
        assert_eq!(schema.allowed_node_types(), vec!["人物", "公司", "学校"]);
        assert_eq!(schema.allowed_relations(), vec!["工作单位", "毕业院校"]);
    }

    #[test]
    fn test_allows_requires_full_triplet() {
        let schema = people_schema();
        assert!(schema.allows("人物", "毕业院校", "学校"));
        assert!(!schema.allows("人物", "毕业院校", "公司"));
        assert!(!schema.allows("公司", "工作单位", "人物"));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"schema":"人物关系","triplet":["人物-毕业院校->学校"]}"#;
        let schema: SchemaSpec = serde_json::from_str(json).unwrap();
        assert_eq!(schema.name, "人物关系");
        assert_eq!(schema.triplets.len(), 1);
        assert_eq!(serde_json::to_string(&schema).unwrap(), json);
    }
}
