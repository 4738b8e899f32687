//! Template Engine
//!
//! Handles HTML template rendering using minijinja.

use minijinja::{Environment, Error as MiniJinjaError};

/// Template manager
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Create a new template manager
    pub fn new() -> Self {
        let mut env = Environment::new();

        // Values interpolated into pages can come from request paths
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::Html);

        // Register templates
        env.add_template("docs", include_str!("../templates/docs.html"))
            .expect("Failed to add docs template");
        env.add_template("subdomain_404", include_str!("../templates/subdomain_404.html"))
            .expect("Failed to add subdomain_404 template");
        env.add_template("resolver_error", include_str!("../templates/resolver_error.html"))
            .expect("Failed to add resolver_error template");
        env.add_template("cname_bound", include_str!("../templates/cname_bound.html"))
            .expect("Failed to add cname_bound template");
        env.add_template("cname_error", include_str!("../templates/cname_error.html"))
            .expect("Failed to add cname_error template");
        env.add_template("dns_info", include_str!("../templates/dns_info.html"))
            .expect("Failed to add dns_info template");
        env.add_template("link_error", include_str!("../templates/link_error.html"))
            .expect("Failed to add link_error template");

        Self { env }
    }

    /// Render a template with context
    pub fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, MiniJinjaError> {
        let template = self.env.get_template(name)?;
        template.render(context)
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}
