//! Template manager: CRUD, activation, duplication and rendering

use crate::defaults::default_templates;
use crate::error::ManagerError;
use crate::render::JinjaRenderer;
use crate::types::{
    LanguageStats, NewTemplate, TemplatePage, TemplateQuery, TemplateStatistics, TemplateUpdate,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use graphscribe_domain::traits::TemplateStore;
use graphscribe_domain::{
    unix_now, PromptTemplate, PromptVariables, SchemaSpec, TemplateRenderer, TemplateSet,
};
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Window for the "recent" statistics counters
const RECENT_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted language tag
const MAX_LANGUAGE_LEN: usize = 35;

struct Inner<S> {
    set: TemplateSet,
    store: S,
}

/// Owns the template set and its store
///
/// Every mutation runs under one lock: it edits a copy of the set, persists
/// the copy, and only then swaps it in. A failed persist leaves the in-memory
/// set untouched.
pub struct TemplateManager<S: TemplateStore> {
    inner: Mutex<Inner<S>>,
    renderer: Box<dyn TemplateRenderer>,
}

fn required(field: &str, value: &str) -> Result<String, ManagerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ManagerError::Validation(format!("{} must not be blank", field)));
    }
    Ok(trimmed.to_string())
}

fn check_language(language: &str) -> Result<String, ManagerError> {
    let language = required("language", language)?;
    let well_formed = language.len() <= MAX_LANGUAGE_LEN
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !well_formed {
        return Err(ManagerError::Validation(format!(
            "malformed language tag '{}'",
            language
        )));
    }
    Ok(language)
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

impl<S> TemplateManager<S>
where
    S: TemplateStore,
    S::Error: Display,
{
    /// Load the set from `store` and render with [`JinjaRenderer`]
    pub fn open(store: S) -> Result<Self, ManagerError> {
        Self::with_renderer(store, Box::new(JinjaRenderer::new()))
    }

    /// Load the set from `store` and render with `renderer`
    pub fn with_renderer(store: S, renderer: Box<dyn TemplateRenderer>) -> Result<Self, ManagerError> {
        let set = store
            .load()
            .map_err(|e| ManagerError::Store(e.to_string()))?;
        info!(
            "Template manager opened with {} templates, {} active languages",
            set.len(),
            set.active_slots().len()
        );
        Ok(Self {
            inner: Mutex::new(Inner { set, store }),
            renderer,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<S>>, ManagerError> {
        self.inner
            .lock()
            .map_err(|_| ManagerError::Store("template state lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&TemplateSet) -> T) -> Result<T, ManagerError> {
        let inner = self.lock()?;
        Ok(f(&inner.set))
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut TemplateSet) -> Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        let mut inner = self.lock()?;
        let mut next = inner.set.clone();
        let out = f(&mut next)?;
        Self::commit(&mut inner, next)?;
        Ok(out)
    }

    fn commit(inner: &mut Inner<S>, next: TemplateSet) -> Result<(), ManagerError> {
        inner
            .store
            .persist(&next)
            .map_err(|e| ManagerError::Store(e.to_string()))?;
        inner.set = next;
        Ok(())
    }

    fn check_content(&self, content: &str) -> Result<(), ManagerError> {
        if content.trim().is_empty() {
            return Err(ManagerError::Validation("content must not be blank".to_string()));
        }
        self.renderer.validate(content).map_err(|e| {
            ManagerError::Validation(format!("content does not parse: {}", e.message))
        })
    }

    /// Create a template at version 1, inactive
    pub fn create(&self, new: NewTemplate) -> Result<PromptTemplate, ManagerError> {
        let name = required("name", &new.name)?;
        let language = check_language(&new.language)?;
        self.check_content(&new.content)?;

        let mut template = PromptTemplate::new(name, language, new.content);
        template.description = new.description;
        template.tags = clean_tags(new.tags);
        template.metadata = new.metadata;

        let created = self.mutate(|set| {
            if set.name_taken(&template.name, &template.language, None) {
                return Err(ManagerError::Conflict(format!(
                    "template '{}' already exists for language '{}'",
                    template.name, template.language
                )));
            }
            set.insert(template.clone());
            Ok(template)
        })?;

        info!(
            "Created template {} ('{}', {})",
            created.id, created.name, created.language
        );
        Ok(created)
    }

    /// Fetch a template by id
    pub fn get(&self, id: &str) -> Result<PromptTemplate, ManagerError> {
        self.read(|set| set.get(id).cloned())?
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))
    }

    /// Filtered, paged listing in insertion order
    pub fn list(&self, query: &TemplateQuery) -> Result<TemplatePage, ManagerError> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(ManagerError::Validation("page must be at least 1".to_string()));
        }
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ManagerError::Validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let (templates, total) = self.read(|set| {
            let matching: Vec<&PromptTemplate> = set.iter().filter(|t| query.matches(t)).collect();
            let total = matching.len();
            let templates = matching
                .into_iter()
                .skip((page - 1).saturating_mul(page_size))
                .take(page_size)
                .cloned()
                .collect::<Vec<_>>();
            (templates, total)
        })?;

        debug!("Listed {} of {} matching templates", templates.len(), total);
        Ok(TemplatePage {
            templates,
            total,
            page,
            page_size,
        })
    }

    /// Apply a partial update; bumps the version by one
    pub fn update(&self, id: &str, update: TemplateUpdate) -> Result<PromptTemplate, ManagerError> {
        if update.is_empty() {
            return Err(ManagerError::Validation("no fields to update".to_string()));
        }
        let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
        if let Some(content) = &update.content {
            self.check_content(content)?;
        }

        let updated = self.mutate(|set| {
            let mut template = set
                .get(id)
                .cloned()
                .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;

            if let Some(name) = name {
                if set.name_taken(&name, &template.language, Some(id)) {
                    return Err(ManagerError::Conflict(format!(
                        "template '{}' already exists for language '{}'",
                        name, template.language
                    )));
                }
                template.name = name;
            }
            if let Some(description) = update.description {
                template.description = description;
            }
            if let Some(content) = update.content {
                template.content = content;
            }
            if let Some(tags) = update.tags {
                template.tags = clean_tags(tags);
            }
            if let Some(metadata) = update.metadata {
                template.metadata = metadata;
            }
            template.version += 1;
            template.updated_at = unix_now();

            set.replace(template.clone());
            Ok(template)
        })?;

        info!("Updated template {} to version {}", updated.id, updated.version);
        Ok(updated)
    }

    /// Make `id` the active template of its language
    pub fn activate(&self, id: &str) -> Result<PromptTemplate, ManagerError> {
        let activated = self.mutate(|set| {
            if !set.activate(id, unix_now()) {
                return Err(ManagerError::NotFound(id.to_string()));
            }
            set.get(id)
                .cloned()
                .ok_or_else(|| ManagerError::NotFound(id.to_string()))
        })?;

        info!(
            "Activated template {} for language '{}'",
            activated.id, activated.language
        );
        Ok(activated)
    }

    /// Copy a template under a new name, as a fresh inactive version 1
    pub fn duplicate(&self, id: &str, new_name: &str) -> Result<PromptTemplate, ManagerError> {
        let new_name = required("new_name", new_name)?;

        let copy = self.mutate(|set| {
            let original = set
                .get(id)
                .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;
            if set.name_taken(&new_name, &original.language, None) {
                return Err(ManagerError::Conflict(format!(
                    "template '{}' already exists for language '{}'",
                    new_name, original.language
                )));
            }

            let mut copy = PromptTemplate::new(
                new_name,
                original.language.clone(),
                original.content.clone(),
            );
            copy.description = format!("Copied from: {}", original.name);
            copy.tags = original.tags.clone();
            copy.metadata = original.metadata.clone();

            set.insert(copy.clone());
            Ok(copy)
        })?;

        info!("Duplicated template {} as {} ('{}')", id, copy.id, copy.name);
        Ok(copy)
    }

    /// Hard-delete a template
    ///
    /// The active template of a language cannot be deleted; activate a
    /// replacement first.
    pub fn delete(&self, id: &str) -> Result<PromptTemplate, ManagerError> {
        let removed = self.mutate(|set| {
            let template = set
                .get(id)
                .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;
            if set.active_id(&template.language) == Some(id) {
                return Err(ManagerError::Conflict(format!(
                    "template {} is the active template for language '{}'",
                    id, template.language
                )));
            }
            set.remove(id)
                .ok_or_else(|| ManagerError::NotFound(id.to_string()))
        })?;

        info!("Deleted template {} ('{}')", removed.id, removed.name);
        Ok(removed)
    }

    /// The active template for `language`
    pub fn active_for(&self, language: &str) -> Result<PromptTemplate, ManagerError> {
        self.read(|set| set.active_template(language).cloned())?
            .ok_or_else(|| ManagerError::NoActiveTemplate(language.to_string()))
    }

    /// Summary counts, with "recent" measured from now
    pub fn statistics(&self) -> Result<TemplateStatistics, ManagerError> {
        self.statistics_at(unix_now())
    }

    /// Summary counts, with "recent" measured from `now`
    pub fn statistics_at(&self, now: u64) -> Result<TemplateStatistics, ManagerError> {
        self.read(|set| {
            let mut stats = TemplateStatistics {
                total_templates: set.len(),
                active_templates: set.active_slots().len(),
                ..TemplateStatistics::default()
            };
            for template in set.iter() {
                let entry: &mut LanguageStats =
                    stats.languages.entry(template.language.clone()).or_default();
                entry.total += 1;
                if template.active {
                    entry.active += 1;
                }
                if now.saturating_sub(template.created_at) <= RECENT_WINDOW_SECS {
                    stats.recent_created += 1;
                }
                if now.saturating_sub(template.updated_at) <= RECENT_WINDOW_SECS {
                    stats.recent_updated += 1;
                }
            }
            stats
        })
    }

    /// Add and activate the built-in templates if the set is empty
    ///
    /// Returns the number of templates added.
    pub fn seed_defaults(&self) -> Result<usize, ManagerError> {
        let mut inner = self.lock()?;
        if !inner.set.is_empty() {
            return Ok(0);
        }

        let mut next = inner.set.clone();
        let defaults = default_templates();
        let added = defaults.len();
        for template in defaults {
            next.insert(template);
        }
        Self::commit(&mut inner, next)?;

        info!("Seeded {} built-in templates", added);
        Ok(added)
    }

    /// Render `template` with `text` and the schema bindings
    pub fn render(
        &self,
        template: &PromptTemplate,
        text: &str,
        schema: &SchemaSpec,
    ) -> Result<String, ManagerError> {
        let vars = PromptVariables::new(text, schema);
        let rendered = self.renderer.render(&template.content, &vars)?;
        debug!(
            "Rendered template {} v{} to {} chars",
            template.id,
            template.version,
            rendered.chars().count()
        );
        Ok(rendered)
    }

    /// Number of stored templates
    pub fn len(&self) -> Result<usize, ManagerError> {
        self.read(TemplateSet::len)
    }

    /// True if no template is stored
    pub fn is_empty(&self) -> Result<bool, ManagerError> {
        self.read(TemplateSet::is_empty)
    }
}
