use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchQueryDto {
    pub q: Option<String>,
    pub category: Option<String>,
}

impl SearchQueryDto {
    pub fn category_slug(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
    }
}

/// Body of `/admin/reorder`. `order` is kept loose so a non-list value
/// reaches the service check instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ReorderDto {
    #[serde(default)]
    pub order: Value,
}

impl ReorderDto {
    /// The ids when `order` is a list of strings, `None` otherwise.
    pub fn ids(&self) -> Option<Vec<String>> {
        self.order
            .as_array()?
            .iter()
            .map(|value| value.as_str().map(str::to_string))
            .collect()
    }
}
