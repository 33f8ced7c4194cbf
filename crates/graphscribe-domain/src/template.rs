//! Prompt templates and the record set that owns them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a stored template (UUIDv7 string form)
pub type TemplateId = String;

/// Current time as Unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A versioned prompt template
///
/// `content` is template text with placeholders such as `{{ text }}` and
/// `{% for triplet in allowed_triplets %}`. `version` starts at 1 and grows by
/// one on every update. The `active` flag mirrors the language slot held by
/// [`TemplateSet`] and is never authoritative on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Unique identifier
    pub id: TemplateId,

    /// Human-readable name, unique per language
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Language tag (e.g. "zh", "en")
    pub language: String,

    /// Template text
    pub content: String,

    /// Ordered tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Version counter
    pub version: u32,

    /// Whether this is the active template for its language
    #[serde(default)]
    pub active: bool,

    /// Creation time (Unix seconds)
    pub created_at: u64,

    /// Last modification time (Unix seconds)
    pub updated_at: u64,
}

impl PromptTemplate {
    /// Create a new inactive template at version 1 with a fresh id
    ///
    /// # Examples
    ///
    /// ```
    /// use graphscribe_domain::PromptTemplate;
    ///
    /// let template = PromptTemplate::new("basic", "en", "Extract from: {{ text }}");
    /// assert_eq!(template.version, 1);
    /// assert!(!template.active);
    /// ```
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = unix_now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            description: String::new(),
            language: language.into(),
            content: content.into(),
            tags: Vec::new(),
            metadata: Map::new(),
            version: 1,
            active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive keyword match against name and description
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.name.to_lowercase().contains(&keyword)
            || self.description.to_lowercase().contains(&keyword)
    }

    /// True if the template carries at least one of `tags`
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }
}

/// The persisted template record set
///
/// Templates are kept in insertion order. The `active` map is the per-language
/// slot naming the one active template of each language; every mutation goes
/// through methods that keep the templates' `active` flags in line with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateSet {
    #[serde(default)]
    templates: Vec<PromptTemplate>,

    #[serde(default)]
    active: BTreeMap<String, TemplateId>,
}

impl TemplateSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True if the set holds no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.iter()
    }

    /// Look up a template by id
    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Id of the active template for `language`
    pub fn active_id(&self, language: &str) -> Option<&str> {
        self.active.get(language).map(String::as_str)
    }

    /// The active template for `language`
    pub fn active_template(&self, language: &str) -> Option<&PromptTemplate> {
        self.active_id(language).and_then(|id| self.get(id))
    }

    /// All language slots (`language -> template id`)
    pub fn active_slots(&self) -> &BTreeMap<String, TemplateId> {
        &self.active
    }

    /// True if another template of `language` already uses `name`
    pub fn name_taken(&self, name: &str, language: &str, except: Option<&str>) -> bool {
        self.templates.iter().any(|t| {
            t.name == name && t.language == language && Some(t.id.as_str()) != except
        })
    }

    /// Append a template
    ///
    /// A template inserted with `active = true` takes over its language slot.
    pub fn insert(&mut self, template: PromptTemplate) {
        if template.active {
            self.active
                .insert(template.language.clone(), template.id.clone());
        }
        self.templates.push(template);
        self.sync_flags(None);
    }

    /// Replace the stored template with the same id, keeping its position
    ///
    /// Returns the previous version, or `None` if the id is unknown. If the
    /// replacement moves an active template to another language, the old
    /// language slot is cleared.
    pub fn replace(&mut self, template: PromptTemplate) -> Option<PromptTemplate> {
        let idx = self.templates.iter().position(|t| t.id == template.id)?;
        let previous = std::mem::replace(&mut self.templates[idx], template);
        if previous.language != self.templates[idx].language
            && self.active_id(&previous.language) == Some(previous.id.as_str())
        {
            self.active.remove(&previous.language);
        }
        self.sync_flags(None);
        Some(previous)
    }

    /// Remove a template, clearing its language slot if it held it
    pub fn remove(&mut self, id: &str) -> Option<PromptTemplate> {
        let idx = self.templates.iter().position(|t| t.id == id)?;
        let removed = self.templates.remove(idx);
        if self.active_id(&removed.language) == Some(id) {
            self.active.remove(&removed.language);
        }
        Some(removed)
    }

    /// Make `id` the active template of its language
    ///
    /// Every sibling of the same language is deactivated. Templates whose flag
    /// changes get `updated_at = now`. Returns `false` if the id is unknown.
    pub fn activate(&mut self, id: &str, now: u64) -> bool {
        let Some(language) = self.get(id).map(|t| t.language.clone()) else {
            return false;
        };
        self.active.insert(language, id.to_string());
        self.sync_flags(Some(now));
        true
    }

    /// Repair a set read from storage
    ///
    /// Drops slots that point at unknown ids or at a template of another
    /// language, adopts the first flagged template for languages without a
    /// slot, then re-derives every flag from the slots.
    pub fn normalize(&mut self) {
        let templates = &self.templates;
        self.active.retain(|language, id| {
            templates
                .iter()
                .any(|t| &t.id == id && &t.language == language)
        });

        for template in &self.templates {
            if template.active && !self.active.contains_key(&template.language) {
                self.active
                    .insert(template.language.clone(), template.id.clone());
            }
        }

        self.sync_flags(None);
    }

    fn sync_flags(&mut self, touched_at: Option<u64>) {
        for template in &mut self.templates {
            let should_be_active =
                self.active.get(&template.language) == Some(&template.id);
            if template.active != should_be_active {
                template.active = should_be_active;
                if let Some(now) = touched_at {
                    template.updated_at = now;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str, language: &str) -> PromptTemplate {
        PromptTemplate::new(name, language, "{{ text }}")
    }

    #[test]
    fn test_new_template_defaults() {
        let t = template("a", "zh");
        assert_eq!(t.version, 1);
        assert!(!t.active);
        assert!(!t.id.is_empty());
        assert_eq!(t.created_at, t.updated_at);
    }

    #[test]
    fn test_activate_deactivates_siblings() {
        let mut set = TemplateSet::new();
        let a = template("a", "zh");
        let b = template("b", "zh");
        let c = template("c", "en");
        let (a_id, b_id, c_id) = (a.id.clone(), b.id.clone(), c.id.clone());
        set.insert(a);
        set.insert(b);
        set.insert(c);

        assert!(set.activate(&a_id, 10));
        assert!(set.activate(&c_id, 10));
        assert!(set.get(&a_id).unwrap().active);

        assert!(set.activate(&b_id, 20));
        assert!(!set.get(&a_id).unwrap().active);
        assert!(set.get(&b_id).unwrap().active);
        assert!(set.get(&c_id).unwrap().active);
        assert_eq!(set.active_id("zh"), Some(b_id.as_str()));
        assert_eq!(set.get(&a_id).unwrap().updated_at, 20);
    }

    #[test]
    fn test_activate_unknown_id() {
        let mut set = TemplateSet::new();
        assert!(!set.activate("missing", 0));
        assert!(set.active_slots().is_empty());
    }

    #[test]
    fn test_insert_active_takes_slot() {
        let mut set = TemplateSet::new();
        let mut a = template("a", "zh");
        a.active = true;
        let mut b = template("b", "zh");
        b.active = true;
        let b_id = b.id.clone();
        let a_id = a.id.clone();
        set.insert(a);
        set.insert(b);

        assert_eq!(set.active_id("zh"), Some(b_id.as_str()));
        assert!(!set.get(&a_id).unwrap().active);
    }

    #[test]
    fn test_remove_clears_slot() {
        let mut set = TemplateSet::new();
        let a = template("a", "zh");
        let a_id = a.id.clone();
        set.insert(a);
        set.activate(&a_id, 1);

        let removed = set.remove(&a_id).unwrap();
        assert_eq!(removed.id, a_id);
        assert!(set.active_id("zh").is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut set = TemplateSet::new();
        let a = template("a", "zh");
        let b = template("b", "zh");
        let a_id = a.id.clone();
        set.insert(a);
        set.insert(b);

        let mut edited = set.get(&a_id).unwrap().clone();
        edited.content = "changed".to_string();
        let previous = set.replace(edited).unwrap();

        assert_eq!(previous.content, "{{ text }}");
        assert_eq!(set.iter().next().unwrap().content, "changed");
    }

    #[test]
    fn test_name_taken_is_per_language() {
        let mut set = TemplateSet::new();
        let a = template("shared", "zh");
        let a_id = a.id.clone();
        set.insert(a);

        assert!(set.name_taken("shared", "zh", None));
        assert!(!set.name_taken("shared", "en", None));
        assert!(!set.name_taken("shared", "zh", Some(&a_id)));
    }

    #[test]
    fn test_normalize_repairs_flags_and_slots() {
        let mut a = template("a", "zh");
        a.active = true;
        let mut b = template("b", "zh");
        b.active = true;
        let a_id = a.id.clone();
        let b_id = b.id.clone();

        let json = serde_json::json!({
            "templates": [a, b],
            "active": { "en": "dangling" }
        });
        let mut set: TemplateSet = serde_json::from_value(json).unwrap();
        set.normalize();

        assert!(set.active_id("en").is_none());
        assert_eq!(set.active_id("zh"), Some(a_id.as_str()));
        assert!(set.get(&a_id).unwrap().active);
        assert!(!set.get(&b_id).unwrap().active);
    }

    #[test]
    fn test_keyword_and_tag_matching() {
        let mut t = template("Medical Extraction", "en");
        t.description = "Diseases and drugs".to_string();
        t.tags = vec!["medical".to_string()];

        assert!(t.matches_keyword("medical"));
        assert!(t.matches_keyword("DRUGS"));
        assert!(!t.matches_keyword("finance"));
        assert!(t.has_any_tag(&["x".to_string(), "medical".to_string()]));
        assert!(!t.has_any_tag(&[]));
    }
}
