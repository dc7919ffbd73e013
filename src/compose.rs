//! Post composition
//!
//! Turns an (organization, repository) pair into a ready-to-send payload by
//! rendering the post template and attaching link card metadata.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::github::RepoRecord;
use crate::roster::OrgEntry;

/// Default post template compiled into the binary. `TEMPLATE_PATH` points at
/// a replacement without rebuilding.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/post.mustache");

/// The fixed variable set exposed to post templates.
#[derive(Debug, Clone)]
pub struct TemplateVars<'a> {
    pub org_name: &'a str,
    pub repo_name: &'a str,
    pub description: &'a str,
    pub repo_url: &'a str,
    pub language: &'a str,
}

impl<'a> TemplateVars<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        match name {
            "org_name" => Some(self.org_name),
            "repo_name" => Some(self.repo_name),
            "description" => Some(self.description),
            "repo_url" => Some(self.repo_url),
            "language" => Some(self.language),
            _ => None,
        }
    }
}

/// Pluggable template renderer.
///
/// Post text stays externally customizable: the composer hands the template
/// string and the variable set to this seam and uses whatever comes back.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, vars: &TemplateVars<'_>) -> Result<String>;
}

/// Built-in renderer for Mustache-style `{{name}}` placeholders.
///
/// Unknown names render as empty strings, matching Mustache's treatment of
/// missing variables. Blank-line runs left behind by empty variables are
/// collapsed and the result is trimmed.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

impl Renderer for PlaceholderRenderer {
    fn render(&self, template: &str, vars: &TemplateVars<'_>) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                bail!("Unterminated '{{{{' placeholder in post template");
            };
            let name = after[..end].trim();
            out.push_str(vars.lookup(name).unwrap_or(""));
            rest = &after[end + 2..];
        }
        out.push_str(rest);

        Ok(squeeze_blank_lines(&out).trim().to_string())
    }
}

/// Collapse three or more consecutive newlines down to one blank line.
fn squeeze_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out
}

/// A fully rendered announcement ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPayload {
    /// Body text of the post.
    pub text: String,
    /// Link card title.
    pub link_title: String,
    /// Link card description. Empty when the repository has none.
    pub link_description: String,
    /// Link card target, the repository home page.
    pub link_url: String,
}

/// Builds post payloads for (organization, repository) pairs.
pub struct Composer {
    template: String,
    renderer: Box<dyn Renderer>,
}

impl Composer {
    /// Composer with the built-in placeholder renderer.
    pub fn new(template: String) -> Self {
        Self::with_renderer(template, Box::new(PlaceholderRenderer))
    }

    /// Composer with a custom rendering backend.
    pub fn with_renderer(template: String, renderer: Box<dyn Renderer>) -> Self {
        Self { template, renderer }
    }

    /// Load the template from `path` when given, else use the built-in one.
    pub fn from_template_path(path: Option<&Path>) -> Result<Self> {
        let template = match path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template file {}", path.display()))?,
            None => DEFAULT_TEMPLATE.to_string(),
        };
        Ok(Self::new(template))
    }

    /// Render one announcement.
    ///
    /// Deterministic for a given pair. The only failure mode is a template
    /// defect, which callers treat as fatal to this item alone.
    pub fn compose(&self, org: &OrgEntry, repo: &RepoRecord) -> Result<PostPayload> {
        let vars = TemplateVars {
            org_name: &org.display_name,
            repo_name: &repo.name,
            description: &repo.description,
            repo_url: &repo.url,
            language: &repo.language,
        };
        let text = self.renderer.render(&self.template, &vars)?;

        Ok(PostPayload {
            text,
            link_title: repo.name.clone(),
            link_description: repo.description.clone(),
            link_url: repo.url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn org() -> OrgEntry {
        OrgEntry {
            handle: "acme".to_string(),
            display_name: "Acme News".to_string(),
        }
    }

    fn repo() -> RepoRecord {
        RepoRecord {
            name: "election-scraper".to_string(),
            description: "Scrapes county election results".to_string(),
            url: "https://github.com/acme/election-scraper".to_string(),
            language: "Python".to_string(),
            created_at: Utc::now(),
        }
    }

    fn vars<'a>(org: &'a OrgEntry, repo: &'a RepoRecord) -> TemplateVars<'a> {
        TemplateVars {
            org_name: &org.display_name,
            repo_name: &repo.name,
            description: &repo.description,
            repo_url: &repo.url,
            language: &repo.language,
        }
    }

    #[test]
    fn test_renderer_substitutes_all_variables() {
        let org = org();
        let repo = repo();
        let rendered = PlaceholderRenderer
            .render(
                "{{org_name}}: {{repo_name}} ({{language}})\n{{description}}\n{{repo_url}}",
                &vars(&org, &repo),
            )
            .unwrap();

        assert_eq!(
            rendered,
            "Acme News: election-scraper (Python)\n\
             Scrapes county election results\n\
             https://github.com/acme/election-scraper"
        );
    }

    #[test]
    fn test_renderer_handles_whitespace_and_unknown_names() {
        let org = org();
        let repo = repo();
        let rendered = PlaceholderRenderer
            .render("{{ repo_name }}[{{nonsense}}]", &vars(&org, &repo))
            .unwrap();
        assert_eq!(rendered, "election-scraper[]");
    }

    #[test]
    fn test_renderer_rejects_unterminated_placeholder() {
        let org = org();
        let repo = repo();
        let err = PlaceholderRenderer
            .render("{{repo_name", &vars(&org, &repo))
            .unwrap_err();
        assert!(err.to_string().contains("Unterminated"));
    }

    #[test]
    fn test_renderer_collapses_blank_lines_from_empty_variables() {
        let org = org();
        let mut repo = repo();
        repo.description = String::new();

        let rendered = PlaceholderRenderer
            .render("{{repo_name}}\n\n{{description}}\n\n{{repo_url}}\n", &vars(&org, &repo))
            .unwrap();
        assert_eq!(
            rendered,
            "election-scraper\n\nhttps://github.com/acme/election-scraper"
        );
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = Composer::new(DEFAULT_TEMPLATE.to_string());
        let org = org();
        let repo = repo();

        let first = composer.compose(&org, &repo).unwrap();
        let second = composer.compose(&org, &repo).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compose_fills_link_card_from_repository() {
        let composer = Composer::new(DEFAULT_TEMPLATE.to_string());
        let org = org();
        let repo = repo();

        let payload = composer.compose(&org, &repo).unwrap();
        assert_eq!(payload.link_title, "election-scraper");
        assert_eq!(payload.link_description, "Scrapes county election results");
        assert_eq!(payload.link_url, "https://github.com/acme/election-scraper");
        assert!(payload.text.contains("Acme News"));
        assert!(payload.text.contains("election-scraper"));
    }

    #[test]
    fn test_compose_leaves_empty_description_empty() {
        let composer = Composer::new(DEFAULT_TEMPLATE.to_string());
        let org = org();
        let mut repo = repo();
        repo.description = String::new();

        let payload = composer.compose(&org, &repo).unwrap();
        assert_eq!(payload.link_description, "");
        assert!(!payload.text.to_lowercase().contains("no description"));
    }

    #[test]
    fn test_template_file_override() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "NEW: {{{{repo_name}}}} by {{{{org_name}}}}").unwrap();

        let composer = Composer::from_template_path(Some(file.path())).unwrap();
        let payload = composer.compose(&org(), &repo()).unwrap();
        assert_eq!(payload.text, "NEW: election-scraper by Acme News");
    }

    #[test]
    fn test_missing_template_file_is_an_error() {
        let err = Composer::from_template_path(Some(Path::new("/nonexistent/post.mustache")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("template"));
    }

    #[test]
    fn test_custom_renderer_seam() {
        struct Upper;
        impl Renderer for Upper {
            fn render(&self, template: &str, _vars: &TemplateVars<'_>) -> Result<String> {
                Ok(template.to_uppercase())
            }
        }

        let composer = Composer::with_renderer("shout".to_string(), Box::new(Upper));
        let payload = composer.compose(&org(), &repo()).unwrap();
        assert_eq!(payload.text, "SHOUT");
    }
}
