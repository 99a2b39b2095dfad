use crate::config::{DocsUi, OpenApiConfig};

/// The HTML page of the configured docs UI, pointed at the spec endpoint.
pub(crate) fn docs_page(config: &OpenApiConfig) -> String {
    let title = escape(&config.title);
    let spec_url = escape(&config.spec_path);
    let ui = &config.ui;
    let favicon = escape(&ui.favicon);

    let (head, body) = match config.docs_ui {
        DocsUi::SwaggerUi => (
            format!(r#"<link rel="stylesheet" href="{}">"#, escape(&ui.swagger_ui_css)),
            format!(
                r##"<div id="swagger-ui"></div>
<script src="{bundle}"></script>
<script src="{preset}"></script>
<script>
  window.onload = function () {{
    window.ui = SwaggerUIBundle({{
      url: "{spec_url}",
      dom_id: "#swagger-ui",
      deepLinking: true,
      presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
      plugins: [SwaggerUIBundle.plugins.DownloadUrl],
      layout: "{layout}"
    }});
  }};
</script>"##,
                bundle = escape(&ui.swagger_ui_bundle_js),
                preset = escape(&ui.swagger_ui_standalone_preset_js),
                layout = escape(&ui.swagger_ui_layout),
            ),
        ),
        DocsUi::Redoc => (
            r#"<style>body { margin: 0; padding: 0; }</style>"#.to_string(),
            format!(
                r#"<redoc spec-url="{spec_url}"></redoc>
<script src="{}"></script>"#,
                escape(&ui.redoc_js)
            ),
        ),
        DocsUi::Elements => (
            format!(
                r#"<script src="{}"></script>
<link rel="stylesheet" href="{}">"#,
                escape(&ui.elements_js),
                escape(&ui.elements_css)
            ),
            format!(
                r#"<elements-api apiDescriptionUrl="{spec_url}" router="hash" layout="{}"></elements-api>"#,
                escape(&ui.elements_layout)
            ),
        ),
        DocsUi::Rapidoc => (
            format!(r#"<script type="module" src="{}"></script>"#, escape(&ui.rapidoc_js)),
            format!(
                r#"<rapi-doc spec-url="{spec_url}" theme="{}" show-header="false"></rapi-doc>"#,
                escape(&ui.rapidoc_theme)
            ),
        ),
        DocsUi::Rapipdf => (
            format!(r#"<script src="{}"></script>"#, escape(&ui.rapipdf_js)),
            format!(r#"<rapi-pdf spec-url="{spec_url}"></rapi-pdf>"#),
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} - API Docs</title>
<link rel="icon" type="image/png" href="{favicon}">
{head}
</head>
<body>
{body}
</body>
</html>"#
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ui_points_at_the_spec() {
        for ui in [
            DocsUi::SwaggerUi,
            DocsUi::Redoc,
            DocsUi::Elements,
            DocsUi::Rapidoc,
            DocsUi::Rapipdf,
        ] {
            let config = OpenApiConfig::new("Pets", "1.0")
                .with_spec_path("/spec.json")
                .with_docs_ui(ui);
            let page = docs_page(&config);
            assert!(page.contains("/spec.json"), "{ui:?}");
            assert!(page.contains("<title>Pets - API Docs</title>"));
        }
    }

    #[test]
    fn swagger_ui_mounts_on_its_element() {
        let page = docs_page(&OpenApiConfig::new("Pets", "1.0"));
        assert!(page.contains(r#"<div id="swagger-ui"></div>"#));
        assert!(page.contains(r##"dom_id: "#swagger-ui""##));
        assert!(page.contains(r#"layout: "BaseLayout""#));
    }

    #[test]
    fn title_is_escaped() {
        let config = OpenApiConfig::new("<Pets>", "1.0");
        assert!(docs_page(&config).contains("&lt;Pets&gt;"));
    }
}
