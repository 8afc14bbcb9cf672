use handlebars::Handlebars;
use serde::Serialize;

use crate::error::AppError;

/// Renders the routing glue files
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, AppError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // output is server configuration, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        Self::register_templates(&mut handlebars)?;

        Ok(Self { handlebars })
    }

    fn register_templates(handlebars: &mut Handlebars) -> Result<(), AppError> {
        handlebars.register_template_string("netlify_redirects", NETLIFY_REDIRECTS_TEMPLATE)?;
        handlebars.register_template_string("netlify_headers", NETLIFY_HEADERS_TEMPLATE)?;

        handlebars.register_template_string("caddyfile", CADDYFILE_TEMPLATE)?;
        handlebars.register_template_string("caddy_downloads", CADDY_DOWNLOADS_TEMPLATE)?;

        Ok(())
    }

    pub fn render<T: Serialize>(&self, template_name: &str, data: &T) -> Result<String, AppError> {
        Ok(self.handlebars.render(template_name, data)?)
    }
}

/// Route prefixes without their trailing slash
#[derive(Debug, Clone, Serialize)]
pub struct RouteData {
    pub providers: String,
    pub modules: String,
}

/// One module download route and the go-getter address it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRoute {
    pub path: String,
    pub location: String,
}

const NETLIFY_REDIRECTS_TEMPLATE: &str = r#"# generated by tfstaticregistry

# redirect the individual version requests
{{providers}}/:namespace/:name/:version/download/:os/:arch	{{providers}}/:namespace/:name/:version-:os-:arch.json	200

# redirect the versions list request
{{providers}}/:namespace/:name/versions	{{providers}}/:namespace/:name/versions.json	200

# module versions and download locations
{{modules}}/:namespace/:name/:provider/versions	{{modules}}/:namespace/:name/:provider/versions/index.json	200
{{modules}}/:namespace/:name/:provider/:version/download	{{modules}}/:namespace/:name/:provider/:version/download.json	200
"#;

const NETLIFY_HEADERS_TEMPLATE: &str = r#"# generated by tfstaticregistry
{{#each downloads}}
{{path}}
  X-Terraform-Get: {{location}}
{{/each}}
"#;

const CADDYFILE_TEMPLATE: &str = r#"
# replace this with whatever host name you want to use
{{host}}

# registries must use TLS
# generated with mkcert
tls {{host}}.pem {{host}}-key.pem

# setup logging as you see fit or any other Caddyfile additions
log stdout

# block requests to Caddyfile, secrets, and imports
status 404 /Caddyfile
status 404 /caddy-imports
status 404 /secrets

# import additional generated rules
import ./caddy-imports/downloads

# provider version listings and download documents
rewrite {
	r ^{{providers}}/([^/]+)/([^/]+)/versions$
	to {{providers}}/{1}/{2}/versions.json
}
rewrite {
	r ^{{providers}}/([^/]+)/([^/]+)/([^/]+)/download/([^/]+)/([^/]+)$
	to {{providers}}/{1}/{2}/{3}-{4}-{5}.json
}

# default documents are assumed to be index.json
rewrite {
	to {path} {path}/index.json
}
# all content is written to the "public" directory
root .
"#;

const CADDY_DOWNLOADS_TEMPLATE: &str = r#"{{#each downloads}}
header {{path}} X-Terraform-Get {{location}}
status 204 {{path}}
{{/each}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locations_are_not_escaped() {
        let engine = TemplateEngine::new().unwrap();
        let out = engine
            .render(
                "caddy_downloads",
                &json!({"downloads": [{
                    "path": "/v1/modules/acme/vpc/aws/1.2.3/download",
                    "location": "https://registry.example.com/downloads/ab.tar.gz//*?archive=tar.gz"
                }]}),
            )
            .unwrap();
        assert!(out.contains(
            "header /v1/modules/acme/vpc/aws/1.2.3/download X-Terraform-Get https://registry.example.com/downloads/ab.tar.gz//*?archive=tar.gz"
        ));
        assert!(out.contains("status 204 /v1/modules/acme/vpc/aws/1.2.3/download"));
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let engine = TemplateEngine::new().unwrap();
        let err = engine.render("caddyfile", &json!({})).unwrap_err();
        assert!(matches!(err, AppError::Template { .. }));
    }
}
