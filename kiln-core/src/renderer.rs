use std::collections::HashSet;

use serde_json::Value;

use crate::data::DataContext;
use crate::template::{TemplateError, TemplateRenderer};

const MAX_LAYOUT_DEPTH: usize = 10;

/// A page's resolved layouts with their front matter, innermost first.
///
/// A layout may name a further layout in its own front matter.
#[derive(Debug, Default)]
pub struct LayoutChain {
    layouts: Vec<(String, DataContext)>,
}

impl LayoutChain {
    pub fn resolve(templates: &TemplateRenderer, layout: Option<&str>) -> Result<Self, TemplateError> {
        let mut layouts = Vec::new();
        let mut seen = HashSet::new();
        let mut next = layout.map(str::to_string);

        while let Some(layout) = next.take() {
            let name = templates
                .resolve_layout(&layout)
                .ok_or_else(|| TemplateError::MissingLayout(layout.clone()))?;
            if !seen.insert(name.clone()) {
                return Err(TemplateError::LayoutCycle(name));
            }
            if seen.len() > MAX_LAYOUT_DEPTH {
                return Err(TemplateError::LayoutTooDeep(MAX_LAYOUT_DEPTH));
            }

            let layout_data = templates.include_data(&name).cloned().unwrap_or_default();
            next = layout_data.get("layout").and_then(Value::as_str).map(str::to_string);
            layouts.push((name, layout_data));
        }

        Ok(Self { layouts })
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Front matter of the whole chain, inner layouts over outer ones.
    pub fn data(&self) -> DataContext {
        let mut data = DataContext::new();
        for (_, layout_data) in self.layouts.iter().rev() {
            data.extend(layout_data.clone());
        }
        data
    }

    /// Wrap rendered `content` in each layout in turn, binding the inner
    /// output to `content`.
    pub fn apply(
        &self,
        templates: &TemplateRenderer,
        mut content: String,
        scope: &DataContext,
    ) -> Result<String, TemplateError> {
        if self.is_empty() {
            return Ok(content);
        }

        let mut context = scope.clone();
        for (name, _) in &self.layouts {
            context.insert("content".to_string(), Value::String(content));
            content = templates.render(name, &context)?;
        }

        Ok(content)
    }
}
