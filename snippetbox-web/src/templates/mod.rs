//! HTML page templates
//!
//! Pages are [maud](https://maud.lambda.xyz/) functions collected into a
//! [`TemplateCache`] once at startup and looked up by name when a handler
//! renders. Dynamic values are escaped by maud.

mod pages;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use maud::Markup;
use snippetbox_core::{Snippet, Validator};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("the template {0} does not exist")]
    NotFound(String),
}

/// Anything that can turn a page name and its data into HTML
pub trait Templates: Send + Sync {
    fn render(&self, page: &str, data: &TemplateData) -> Result<String, TemplateError>;
}

/// Submitted form values plus the validation outcome, for re-rendering
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub values: HashMap<&'static str, String>,
    pub validator: Validator,
}

impl FormData {
    pub fn with_value(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.validator.field_error(key)
    }
}

/// Everything a page may show
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    pub form: FormData,
}

type PageFn = fn(&TemplateData) -> Markup;

/// Page templates resolved once at startup
pub struct TemplateCache {
    pages: HashMap<&'static str, PageFn>,
}

impl TemplateCache {
    pub fn new() -> Self {
        let mut map: HashMap<&'static str, PageFn> = HashMap::new();
        map.insert("home", pages::home);
        map.insert("view", pages::view);
        map.insert("create", pages::create);
        map.insert("signup", pages::signup);
        map.insert("login", pages::login);
        Self { pages: map }
    }

    pub fn page_names(&self) -> impl Iterator<Item = &&'static str> {
        self.pages.keys()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Templates for TemplateCache {
    fn render(&self, page: &str, data: &TemplateData) -> Result<String, TemplateError> {
        let page_fn = self
            .pages
            .get(page)
            .ok_or_else(|| TemplateError::NotFound(page.to_string()))?;
        Ok(page_fn(data).into_string())
    }
}

/// Format a timestamp like `17 Mar 2024 at 10:15`, in UTC
pub fn human_date(t: DateTime<Utc>) -> String {
    t.format("%d %b %Y at %H:%M").to_string()
}
