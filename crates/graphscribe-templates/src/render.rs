//! Jinja-syntax rendering through `minijinja`

use graphscribe_domain::{PromptVariables, RenderError, TemplateRenderer};
use minijinja::Environment;

/// [`TemplateRenderer`] for Jinja template text
///
/// Undefined variables render as empty strings; the trailing newline of the
/// template is kept.
///
/// # Examples
///
/// ```
/// use graphscribe_domain::{PromptVariables, SchemaSpec, TemplateRenderer};
/// use graphscribe_templates::JinjaRenderer;
///
/// let renderer = JinjaRenderer::new();
/// let schema = SchemaSpec::new("org", vec!["Person-WORKS_AT->Company".to_string()]);
/// let vars = PromptVariables::new("Alice works at Acme.", &schema);
///
/// let out = renderer
///     .render("{% for t in allowed_triplets %}[{{ t }}]{% endfor %} {{ text }}", &vars)
///     .unwrap();
/// assert_eq!(out, "[Person-WORKS_AT->Company] Alice works at Acme.");
/// ```
pub struct JinjaRenderer {
    env: Environment<'static>,
}

impl JinjaRenderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self {
            env: Self::environment(),
        }
    }

    fn environment<'a>() -> Environment<'a> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env
    }
}

impl Default for JinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn render_error(e: minijinja::Error) -> RenderError {
    RenderError::new(e.to_string())
}

impl TemplateRenderer for JinjaRenderer {
    fn validate(&self, source: &str) -> Result<(), RenderError> {
        let env = Self::environment();
        env.template_from_str(source).map(|_| ()).map_err(render_error)
    }

    fn render(&self, source: &str, vars: &PromptVariables) -> Result<String, RenderError> {
        self.env.render_str(source, vars).map_err(render_error)
    }
}
