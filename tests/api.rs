use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use product_scraper::api::{self, AppState, ScrapeQuery};
use product_scraper::browser::{BrowserEngine, BrowserSession, RenderedPage};
use product_scraper::error::ScrapeError;
use product_scraper::orchestrator::ScrapeOrchestrator;

/// Serves a fixed page for every URL, or times out when `hang` is set.
struct FixtureEngine {
    html: &'static str,
    hang: bool,
    launches: AtomicUsize,
}

struct FixtureSession {
    html: &'static str,
    hang: bool,
    url: String,
}

#[async_trait]
impl BrowserEngine for FixtureEngine {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureSession {
            html: self.html,
            hang: self.hang,
            url: String::new(),
        }))
    }
}

#[async_trait]
impl BrowserSession for FixtureSession {
    async fn set_user_agent(&mut self, _user_agent: &str) -> Result<()> {
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        if self.hang {
            tokio::time::sleep(timeout).await;
            return Err(ScrapeError::NavigationTimeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<RenderedPage> {
        if self.url.is_empty() {
            return Err(anyhow!("no page loaded"));
        }
        Ok(RenderedPage {
            html: self.html.to_string(),
            url: self.url.clone(),
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

const GENERIC_PAGE: &str = r#"<html><head>
    <title>Widget X - Loja</title>
    <meta property="og:title" content="Widget X">
</head><body></body></html>"#;

const MERCADO_LIVRE_PAGE: &str = r#"<html><head><title>Mercado Livre</title></head><body>
    <h1 class="ui-pdp-title">Fone Bluetooth</h1>
    <span class="andes-money-amount__fraction">199</span>
    <img class="ui-pdp-image__element" src="https://http2.mlstatic.com/D_NQ_NP_1.webp">
    <p class="ui-pdp-description__content"> Fone sem fio com estojo. </p>
</body></html>"#;

fn state(html: &'static str, hang: bool) -> (Arc<AppState>, Arc<FixtureEngine>) {
    let engine = Arc::new(FixtureEngine {
        html,
        hang,
        launches: AtomicUsize::new(0),
    });
    let state = Arc::new(AppState {
        orchestrator: ScrapeOrchestrator::new(engine.clone()),
    });
    (state, engine)
}

fn query(url: Option<&str>) -> Query<ScrapeQuery> {
    Query(ScrapeQuery {
        url: url.map(str::to_string),
    })
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let response = api::index().await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["endpoints"]["scrape"], "/api/scrape?url=URL_DO_PRODUTO");
    assert_eq!(body["endpoints"]["shopee"], "/api/shopee?url=URL_SHOPEE");
    assert_eq!(body["endpoints"]["mercadolivre"], "/api/mercadolivre?url=URL_ML");
}

#[tokio::test]
async fn test_missing_url_is_rejected_on_every_route() {
    let (state, engine) = state(GENERIC_PAGE, false);

    let responses = vec![
        api::scrape_generic(State(state.clone()), query(None)).await.into_response(),
        api::scrape_shopee(State(state.clone()), query(None)).await.into_response(),
        api::scrape_mercado_livre(State(state.clone()), query(None)).await.into_response(),
        api::scrape_generic(State(state.clone()), query(Some("   "))).await.into_response(),
    ];

    for response in responses {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "URL é obrigatória" })
        );
    }
    assert_eq!(engine.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_generic_scrape_degrades_to_sentinels() {
    let (state, _) = state(GENERIC_PAGE, false);
    let response = api::scrape_generic(State(state), query(Some("https://loja.example.com/widget")))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        serde_json::json!({
            "success": true,
            "title": "Widget X",
            "price": "Preço não encontrado",
            "image": null,
            "description": "Descrição não encontrada",
            "url": "https://loja.example.com/widget",
            "source": "web"
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_mercado_livre_price_gets_currency() {
    let (state, _) = state(MERCADO_LIVRE_PAGE, false);
    let response = api::scrape_mercado_livre(
        State(state),
        query(Some("https://produto.mercadolivre.com.br/MLB-123")),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Fone Bluetooth");
    assert_eq!(body["price"], "R$ 199");
    assert_eq!(body["image"], "https://http2.mlstatic.com/D_NQ_NP_1.webp");
    assert_eq!(body["description"], "Fone sem fio com estojo.");
    assert_eq!(body["source"], "mercadolivre");
}

#[tokio::test(start_paused = true)]
async fn test_shopee_source_and_fallbacks() {
    let (state, _) = state(GENERIC_PAGE, false);
    let response = api::scrape_shopee(State(state), query(Some("https://shopee.com.br/item-i.1.2")))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["source"], "shopee");
    assert_eq!(body["title"], "Widget X - Loja");
    assert_eq!(body["price"], "Preço não disponível");
    assert_eq!(body["description"], "Descrição do produto Shopee");
}

#[tokio::test(start_paused = true)]
async fn test_navigation_timeout_is_500() {
    let (state, engine) = state(GENERIC_PAGE, true);
    let response = api::scrape_generic(State(state), query(Some("https://slow.example.com")))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("timeout"));
    assert_eq!(body["message"], "Erro ao processar a URL. Tente novamente.");
    assert_eq!(engine.launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_router_builds_with_docs() {
    let (state, _) = state(GENERIC_PAGE, false);
    let _router = api::router(state);

    use utoipa::OpenApi;
    let doc = serde_json::to_value(api::ApiDoc::openapi()).unwrap();
    for path in ["/", "/api/scrape", "/api/shopee", "/api/mercadolivre"] {
        assert!(doc["paths"].get(path).is_some(), "missing {}", path);
    }
}
