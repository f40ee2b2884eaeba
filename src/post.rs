use std::fmt;
use std::fmt::{Display, Formatter};

use serde_json::json;

use crate::metadata_store::Metadata;

/// Site wide values used when describing a post to search engines.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub base_url: String,
    pub author: String,
}

/// A blog entry, built once per load from its markdown file.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub markdown: Vec<u8>,
    pub plain_text: String,
    /// Trusted markup, embedded as is by the page templates.
    pub html: String,
    pub metadata: Metadata,
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "id={}, created={}, updated={}\ntitle={}",
               self.id,
               self.metadata.created_at,
               self.metadata.updated_at,
               self.title(),
        )
    }
}

impl Post {
    /// The override title, else the first line of prose, else the id made
    /// readable (`my-first-post` becomes `My first post`).
    pub fn title(&self) -> String {
        if let Some(ref title) = self.metadata.override_title {
            if !title.trim().is_empty() {
                return title.clone();
            }
        }

        let first_line = self.plain_text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty());
        if let Some(line) = first_line {
            return line.to_string();
        }

        Self::title_from_id(&self.id)
    }

    pub fn snippet(&self) -> String {
        let first_paragraph = self.plain_text.split("\n\n").next().unwrap_or("");

        if let Some((_, rest)) = first_paragraph.split_once('\n') {
            return rest.trim().to_string();
        }

        if !first_paragraph.is_empty() {
            return first_paragraph.trim().to_string();
        }

        self.title()
    }

    /// JSON-LD `BlogPosting` describing the post.
    pub fn structured_data(&self, site: &SiteInfo) -> String {
        let base_url = site.base_url.trim_end_matches('/');
        json!({
            "@context": "http://schema.org",
            "@type": "BlogPosting",
            "mainEntityOfPage": {
                "@type": "WebPage",
                "@id": format!("{}/p/{}", base_url, self.id),
            },
            "headline": self.title(),
            "datePublished": self.metadata.created_at,
            "dateModified": self.metadata.updated_at,
            "author": {
                "@type": "Person",
                "name": site.author,
            },
            "publisher": {
                "@type": "Person",
                "name": site.author,
            },
        }).to_string()
    }

    fn title_from_id(id: &str) -> String {
        let title = id.replace('-', " ");
        let mut chars = title.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => title,
        }
    }
}
