//! Embedded reference to an externally stored form.

use crate::block::Block;
use crate::errors::BlockError;
use crate::form::{Control, SettingsForm};
use crate::markup::{close_root, escape_html, open_root, InlineStyle};
use crate::resource::{ExternalResource, ResourceState};
use crate::settings::{expect_str, to_settings, typed, Settings};
use crate::variant::{BlockVariant, Category, FieldSpec, RenderContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormSettings {
    pub form_id: String,
    pub show_title: bool,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            form_id: String::new(),
            show_title: true,
        }
    }
}

#[derive(Debug)]
pub struct Form;

impl Form {
    /// Resolution state, ignoring states that belong to another form id
    fn current<'a>(settings: &FormSettings, ctx: &RenderContext<'a>) -> Option<&'a ResourceState> {
        ctx.resource.filter(|state| state.reference() == settings.form_id)
    }

    fn render_resolved(block: &Block, settings: &FormSettings, resource: &ExternalResource) -> String {
        let mut out = String::from("<div class=\"sc-form\">");
        if settings.show_title {
            out.push_str(&format!("<h3 class=\"sc-form-title\">{}</h3>", escape_html(&resource.name)));
        }
        for field in &resource.fields {
            let label = if field.label.is_empty() { &field.name } else { &field.label };
            out.push_str(&format!(
                "<label class=\"sc-field\"><span>{}{}</span><input type=\"{}\" name=\"{}\" data-field-key=\"{}/{}\"{}></label>",
                escape_html(label),
                if field.required { " *" } else { "" },
                escape_html(&field.field_type),
                escape_html(&field.name),
                escape_html(block.id.as_str()),
                escape_html(&field.name),
                if field.required { " required" } else { "" }
            ));
        }
        out.push_str("</div>");
        out
    }
}

impl BlockVariant for Form {
    fn kind(&self) -> &'static str {
        "form"
    }

    fn display_name(&self) -> &'static str {
        "Form"
    }

    fn icon(&self) -> &'static str {
        "clipboard-list"
    }

    fn category(&self) -> Category {
        Category::Advanced
    }

    fn default_settings(&self) -> Settings {
        to_settings(&FormSettings::default())
    }

    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        let s: FormSettings = typed(&block.settings);

        let body = if s.form_id.is_empty() {
            "<div class=\"sc-form sc-form-unset\" data-action=\"open-settings\">Select a form</div>".to_string()
        } else {
            match Form::current(&s, ctx) {
                Some(ResourceState::Resolved(resource)) => Form::render_resolved(block, &s, resource),
                Some(ResourceState::Unavailable { reason, .. }) => format!(
                    "<div class=\"sc-form sc-error\">Form unavailable: {}<button type=\"button\" data-action=\"retry-resource\">Retry</button></div>",
                    escape_html(reason)
                ),
                Some(ResourceState::Loading { .. }) | None => {
                    "<div class=\"sc-form sc-loading\">Loading form...</div>".to_string()
                }
            }
        };

        format!("{}{}{}", open_root(block, &InlineStyle::new()), body, close_root())
    }

    fn settings_form(&self, settings: &Settings) -> SettingsForm {
        SettingsForm::new()
            .field(settings, "formId", "Form", Control::ResourcePicker { resource: "form".to_string() })
            .field(settings, "showTitle", "Show form title", Control::Toggle)
    }

    fn validate_setting(&self, key: &str, value: &Value) -> Result<(), BlockError> {
        match key {
            "formId" => expect_str(key, value).map(|_| ()),
            "showTitle" => super::validate_bool(key, value),
            _ => Ok(()),
        }
    }

    fn external_reference(&self, settings: &Settings) -> Option<String> {
        let s: FormSettings = typed(settings);
        (!s.form_id.is_empty()).then_some(s.form_id)
    }

    fn needs_configuration(&self, block: &Block) -> bool {
        self.external_reference(&block.settings).is_none()
    }

    fn fields(&self, block: &Block, ctx: &RenderContext<'_>) -> Vec<FieldSpec> {
        let s: FormSettings = typed(&block.settings);
        match Form::current(&s, ctx) {
            Some(ResourceState::Resolved(resource)) => resource
                .fields
                .iter()
                .map(|field| FieldSpec {
                    key: format!("{}/{}", block.id, field.name),
                    label: if field.label.is_empty() { field.name.clone() } else { field.label.clone() },
                    required: field.required,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockId;
    use crate::resource::ResourceField;

    fn newsletter() -> ExternalResource {
        ExternalResource {
            id: "42".to_string(),
            name: "Newsletter".to_string(),
            fields: vec![ResourceField {
                name: "email".to_string(),
                label: "Email".to_string(),
                field_type: "email".to_string(),
                required: true,
            }],
            definition: Value::Null,
        }
    }

    fn form_block(form_id: &str) -> Block {
        let mut block = Block::new("form");
        block.id = BlockId::from("f1");
        block.settings = Form.default_settings();
        block.set_setting("formId", form_id);
        block
    }

    #[test]
    fn test_render_states() {
        let block = form_block("42");

        let loading = ResourceState::Loading { reference: "42".to_string() };
        let html = Form.render(&block, &RenderContext::with_resource(Some(&loading)));
        assert!(html.contains("sc-loading"));

        let resolved = ResourceState::Resolved(newsletter());
        let html = Form.render(&block, &RenderContext::with_resource(Some(&resolved)));
        assert!(html.contains("Newsletter"));
        assert!(html.contains("data-field-key=\"f1/email\""));

        let failed = ResourceState::Unavailable {
            reference: "42".to_string(),
            reason: "not found".to_string(),
        };
        let html = Form.render(&block, &RenderContext::with_resource(Some(&failed)));
        assert!(html.contains("retry-resource"));
    }

    #[test]
    fn test_stale_state_is_ignored() {
        let block = form_block("7");
        let resolved = ResourceState::Resolved(newsletter());
        let ctx = RenderContext::with_resource(Some(&resolved));

        assert!(Form.render(&block, &ctx).contains("sc-loading"));
        assert!(Form.fields(&block, &ctx).is_empty());
    }

    #[test]
    fn test_fields_from_resolved_form() {
        let block = form_block("42");
        let resolved = ResourceState::Resolved(newsletter());
        let fields = Form.fields(&block, &RenderContext::with_resource(Some(&resolved)));

        assert_eq!(
            fields,
            vec![FieldSpec {
                key: "f1/email".to_string(),
                label: "Email".to_string(),
                required: true
            }]
        );
    }

    #[test]
    fn test_needs_configuration_until_form_chosen() {
        let mut block = Block::new("form");
        block.settings = Form.default_settings();
        assert!(Form.needs_configuration(&block));
        assert_eq!(Form.external_reference(&block.settings), None);

        block.set_setting("formId", "42");
        assert!(!Form.needs_configuration(&block));
        assert_eq!(Form.external_reference(&block.settings), Some("42".to_string()));
    }
}
