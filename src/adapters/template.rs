use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

pub const TEXT_TEMPLATE: &str = "Dear {first_name},

Wishing you a very happy birthday! May this special day bring you joy, happiness, success, and fulfillment.

We hope you have a fantastic day celebrating!

Best regards,
Team {company_name}

---
© {year} {company_name}. All rights reserved.
";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unknown placeholder {{{0}}} in template")]
    UnknownPlaceholder(String),

    #[error("placeholder pattern failed to compile")]
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateValues<'a> {
    pub first_name: &'a str,
    pub company_name: &'a str,
    pub year: i32,
}

/// Substitutes `{first_name}`, `{company_name}` and `{year}` literally.
///
/// Any other `{identifier}` is an error. Braces that do not wrap a bare
/// identifier, such as CSS blocks, pass through untouched.
pub fn render(template: &str, values: &TemplateValues<'_>) -> Result<String, RenderError> {
    let pattern = PLACEHOLDER.as_ref().ok_or(RenderError::Pattern)?;

    if let Some(unknown) = pattern
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .find(|name| !matches!(name.as_str(), "first_name" | "company_name" | "year"))
    {
        return Err(RenderError::UnknownPlaceholder(unknown));
    }

    let year = values.year.to_string();
    Ok(pattern
        .replace_all(template, |caps: &regex::Captures| match &caps[1] {
            "first_name" => values.first_name.to_string(),
            "company_name" => values.company_name.to_string(),
            _ => year.clone(),
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> TemplateValues<'static> {
        TemplateValues {
            first_name: "Jane",
            company_name: "Acme",
            year: 2026,
        }
    }

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let html = render("<h1>Happy birthday {first_name}!</h1><p>{company_name} {year}</p>", &values()).unwrap();
        assert_eq!(html, "<h1>Happy birthday Jane!</h1><p>Acme 2026</p>");
    }

    #[test]
    fn test_css_blocks_pass_through() {
        let html = render("<style>p { color: red; }</style><p>{first_name}</p>", &values()).unwrap();
        assert_eq!(html, "<style>p { color: red; }</style><p>Jane</p>");
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        assert_eq!(
            render("Hi {nickname}", &values()),
            Err(RenderError::UnknownPlaceholder("nickname".to_string()))
        );
    }

    #[test]
    fn test_text_template_renders() {
        let text = render(TEXT_TEMPLATE, &values()).unwrap();
        assert!(text.starts_with("Dear Jane,"));
        assert!(text.contains("Team Acme"));
        assert!(text.contains("© 2026 Acme."));
    }
}
