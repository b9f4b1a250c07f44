//! Site profiles module.
//!
//! A profile is pure data: ordered extraction strategies per field plus the
//! timings and fallbacks for one marketplace. Every profile is consumed by the
//! same first-match-wins algorithm in [`crate::extractor`].

use once_cell::sync::Lazy;
use std::time::Duration;

/// Default bound on navigation plus network-idle wait.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// One way of pulling a field out of the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// `content` of `meta[property=KEY]` or `meta[name=KEY]`
    Meta(&'static str),
    /// Trimmed text of the first element matching the selector
    Text(&'static str),
    /// Attribute of the first element matching the selector.
    /// `src` and `href` values are resolved against the page URL.
    Attr {
        selector: &'static str,
        attr: &'static str,
    },
    /// The document `<title>`
    DocumentTitle,
}

impl Strategy {
    pub const fn src(selector: &'static str) -> Self {
        Strategy::Attr { selector, attr: "src" }
    }
}

/// Post-processing applied to a price that was actually found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceFormat {
    Verbatim,
    /// `"199"` -> `"R$ 199"`
    CurrencyPrefix(&'static str),
}

impl PriceFormat {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            PriceFormat::Verbatim => raw.to_string(),
            PriceFormat::CurrencyPrefix(symbol) => format!("{} {}", symbol, raw),
        }
    }
}

/// Sentinels used when every strategy for a field comes back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallbacks {
    pub title: &'static str,
    pub price: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Also reported as `source` in results.
    pub name: &'static str,
    pub title: Vec<Strategy>,
    pub price: Vec<Strategy>,
    pub image: Vec<Strategy>,
    pub description: Vec<Strategy>,
    pub price_format: PriceFormat,
    pub fallbacks: Fallbacks,
    /// Wait after network idle so client-side rendering can finish.
    pub settle_delay: Duration,
    pub navigation_timeout: Duration,
}

pub const TITLE_NOT_FOUND: &str = "Título não encontrado";
pub const PRICE_NOT_FOUND: &str = "Preço não encontrado";
pub const PRICE_UNAVAILABLE: &str = "Preço não disponível";
pub const DESCRIPTION_NOT_FOUND: &str = "Descrição não encontrada";

fn build_generic() -> SiteProfile {
    SiteProfile {
        name: "web",
        title: vec![
            Strategy::Meta("og:title"),
            Strategy::Text("h1"),
            Strategy::DocumentTitle,
        ],
        price: vec![
            Strategy::Meta("product:price:amount"),
            Strategy::Meta("og:price:amount"),
            Strategy::Text(r#"[class*="price" i]"#),
        ],
        image: vec![
            Strategy::Meta("og:image"),
            Strategy::src(r#"img[src*="product"], img[class*="product"]"#),
        ],
        description: vec![
            Strategy::Meta("og:description"),
            Strategy::Meta("description"),
            Strategy::Text(r#"p[class*="description"], div[class*="description"]"#),
        ],
        price_format: PriceFormat::Verbatim,
        fallbacks: Fallbacks {
            title: TITLE_NOT_FOUND,
            price: PRICE_NOT_FOUND,
            description: DESCRIPTION_NOT_FOUND,
        },
        settle_delay: Duration::from_millis(3000),
        navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
    }
}

// Shopee A/B-tests its obfuscated class names, so each field keeps several
// known alternates.
fn build_shopee() -> SiteProfile {
    SiteProfile {
        name: "shopee",
        title: vec![
            Strategy::Text(".KL4AiJ"),
            Strategy::Text(".WBVL_7"),
            Strategy::Text(".VCNVHn"),
            Strategy::Text("._44qnta"),
            Strategy::Text("h1"),
            Strategy::DocumentTitle,
        ],
        price: vec![
            Strategy::Text("._3e_UQT"),
            Strategy::Text(".pqTWkA"),
            Strategy::Text("._3c5u7X"),
            Strategy::Text("._2Shl1j"),
        ],
        image: vec![
            Strategy::src(".qBOG5M img"),
            Strategy::src(".V2CF6t img"),
            Strategy::src("._2GcUzQ img"),
            Strategy::src(r#"img[src*="shopee"]"#),
        ],
        description: vec![
            Strategy::Text(".product-detail"),
            Strategy::Text("._2u0jt9"),
            Strategy::Text("._2aZyWI"),
        ],
        price_format: PriceFormat::Verbatim,
        fallbacks: Fallbacks {
            title: TITLE_NOT_FOUND,
            price: PRICE_UNAVAILABLE,
            description: "Descrição do produto Shopee",
        },
        // Shopee hydrates slowly
        settle_delay: Duration::from_millis(5000),
        navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
    }
}

fn build_mercado_livre() -> SiteProfile {
    SiteProfile {
        name: "mercadolivre",
        title: vec![Strategy::Text(".ui-pdp-title"), Strategy::DocumentTitle],
        price: vec![Strategy::Text(".andes-money-amount__fraction")],
        image: vec![
            Strategy::src(".ui-pdp-image__element"),
            Strategy::src(".ui-pdp-gallery__figure__image"),
        ],
        description: vec![Strategy::Text(".ui-pdp-description__content")],
        price_format: PriceFormat::CurrencyPrefix("R$"),
        fallbacks: Fallbacks {
            title: TITLE_NOT_FOUND,
            price: PRICE_UNAVAILABLE,
            description: "Descrição do produto Mercado Livre",
        },
        settle_delay: Duration::from_millis(3000),
        navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
    }
}

static GENERIC: Lazy<SiteProfile> = Lazy::new(build_generic);
static SHOPEE: Lazy<SiteProfile> = Lazy::new(build_shopee);
static MERCADO_LIVRE: Lazy<SiteProfile> = Lazy::new(build_mercado_livre);

pub fn generic() -> &'static SiteProfile {
    &GENERIC
}

pub fn shopee() -> &'static SiteProfile {
    &SHOPEE
}

pub fn mercado_livre() -> &'static SiteProfile {
    &MERCADO_LIVRE
}

/// All registered profiles, generic first.
pub fn all() -> [&'static SiteProfile; 3] {
    [generic(), shopee(), mercado_livre()]
}

/// Look a profile up by its source name.
pub fn get(name: &str) -> Option<&'static SiteProfile> {
    all().into_iter().find(|p| p.name == name)
}
