//! HTML pages that load the destination without exposing it in a redirect.

use askama::Template;

use crate::domain::entities::{CloakType, CloakingConfig};

pub const CLOAKED_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const DEFAULT_TITLE: &str = "Redirecting";

#[derive(Template)]
#[template(path = "cloak_iframe.html")]
struct IframePage<'a> {
    destination: &'a str,
    title: &'a str,
    favicon: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "cloak_meta_refresh.html")]
struct MetaRefreshPage<'a> {
    destination: &'a str,
    title: &'a str,
    favicon: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "cloak_js_redirect.html")]
struct JsRedirectPage<'a> {
    destination: &'a str,
    destination_js: String,
    title: &'a str,
    favicon: Option<&'a str>,
}

#[derive(Debug, thiserror::Error)]
pub enum CloakRenderError {
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    #[error("failed to encode destination: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Renders the cloaking page for `destination`.
///
/// HTML attributes and text go through the template's HTML escaping. The
/// JavaScript variant embeds the destination as a JSON string literal with
/// `<`, `>` and `&` escaped so it cannot close the surrounding script element.
pub fn render_cloaked(config: &CloakingConfig, destination: &str) -> Result<String, CloakRenderError> {
    let title = config
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_TITLE);
    let favicon = config.favicon.as_deref().filter(|f| !f.trim().is_empty());

    let html = match config.cloak_type {
        CloakType::Iframe => IframePage {
            destination,
            title,
            favicon,
        }
        .render()?,
        CloakType::MetaRefresh => MetaRefreshPage {
            destination,
            title,
            favicon,
        }
        .render()?,
        CloakType::JsRedirect => JsRedirectPage {
            destination,
            destination_js: script_string_literal(destination)?,
            title,
            favicon,
        }
        .render()?,
    };

    Ok(html)
}

fn script_string_literal(value: &str) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}
