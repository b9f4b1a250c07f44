//! Field extraction against a rendered DOM snapshot.
//!
//! Every strategy yields an `Option<String>`; a field is the first non-empty
//! value in declaration order, or the profile fallback.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;
use utoipa::ToSchema;

use crate::profiles::{SiteProfile, Strategy};

/// The four product fields, after trimming and fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProductFields {
    pub title: String,
    pub price: String,
    /// Absolute URL or `None`, never empty.
    pub image: Option<String>,
    pub description: String,
}

/// Applies a profile's strategies to one parsed document.
pub struct FieldExtractor<'a> {
    document: &'a Html,
    base_url: Option<Url>,
}

impl<'a> FieldExtractor<'a> {
    /// `page_url` is the final URL of the page; relative `src`/`href` values
    /// are resolved against it.
    pub fn new(document: &'a Html, page_url: &str) -> Self {
        Self {
            document,
            base_url: Url::parse(page_url).ok(),
        }
    }

    pub fn extract(&self, profile: &SiteProfile) -> Result<ProductFields> {
        let title = match self.first_text(&profile.title)? {
            Some(title) => title,
            None => {
                tracing::debug!(source = profile.name, "title fallback used");
                profile.fallbacks.title.to_string()
            }
        };

        let price = match self.first_text(&profile.price)? {
            Some(raw) => profile.price_format.apply(&raw),
            None => {
                tracing::debug!(source = profile.name, "price fallback used");
                profile.fallbacks.price.to_string()
            }
        };

        let image = self.first_url(&profile.image)?;

        let description = match self.first_text(&profile.description)? {
            Some(description) => description,
            None => {
                tracing::debug!(source = profile.name, "description fallback used");
                profile.fallbacks.description.to_string()
            }
        };

        Ok(ProductFields {
            title,
            price,
            image,
            description,
        })
    }

    fn first_text(&self, strategies: &[Strategy]) -> Result<Option<String>> {
        for strategy in strategies {
            if let Some(value) = self.apply(strategy)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Like `first_text`, but a candidate only wins if it is a usable URL.
    fn first_url(&self, strategies: &[Strategy]) -> Result<Option<String>> {
        for strategy in strategies {
            if let Some(url) = self.apply(strategy)?.and_then(|v| self.absolute_url(&v)) {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    /// Runs one strategy. Empty or whitespace-only results are `None`.
    fn apply(&self, strategy: &Strategy) -> Result<Option<String>> {
        let raw = match strategy {
            Strategy::Meta(key) => {
                let css = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
                self.select_first(&css)?
                    .and_then(|el| el.value().attr("content").map(str::to_string))
            }
            Strategy::Text(css) => self.select_first(css)?.map(text_content),
            Strategy::Attr { selector, attr } => self
                .select_first(selector)?
                .and_then(|el| el.value().attr(attr).map(str::to_string)),
            Strategy::DocumentTitle => self.document_title()?,
        };
        Ok(non_empty(raw))
    }

    /// First match in document order, as `querySelector` would return it.
    fn select_first(&self, css: &str) -> Result<Option<ElementRef<'a>>> {
        let selector =
            Selector::parse(css).map_err(|e| anyhow!("invalid selector `{}`: {:?}", css, e))?;
        Ok(self.document.select(&selector).next())
    }

    /// Mirrors `document.title`: the first `<title>` in the HTML namespace
    /// (SVG titles are icon labels), with whitespace collapsed.
    fn document_title(&self) -> Result<Option<String>> {
        let selector =
            Selector::parse("title").map_err(|e| anyhow!("invalid selector `title`: {:?}", e))?;
        Ok(self
            .document
            .select(&selector)
            .find(|el| &*el.value().name.ns == HTML_NAMESPACE)
            .map(|el| collapse_whitespace(&text_content(el))))
    }

    fn absolute_url(&self, value: &str) -> Option<String> {
        let resolved = match &self.base_url {
            Some(base) => base.join(value),
            None => Url::parse(value),
        };
        resolved.ok().map(String::from)
    }
}

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Convenience wrapper: parse `html` and extract with `profile`.
pub fn extract_html(html: &str, page_url: &str, profile: &SiteProfile) -> Result<ProductFields> {
    let document = Html::parse_document(html);
    FieldExtractor::new(&document, page_url).extract(profile)
}
