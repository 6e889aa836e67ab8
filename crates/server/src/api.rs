//! JSON endpoints of the price-suggestion service.
//!
//! - `GET  /get_filters`      : distinct filter values from the reference platform
//! - `GET  /search_products`  : exact matches, cross-brand products and suggestions
//! - `POST /genai_suggestions`: generated pricing rationale for missing platforms

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use spi_core::domain::report::ListedPrice;
use spi_core::{
    enumerate_filters, ApplicationError, DomainError, FilterOptions, FilterSelection,
    InterfaceError, Platform, PriceQueryReport, PriceQueryRuntime, ProductSpec, SuggestionAdvice,
    SuggestionAdvisor, SuggestionRequest,
};

#[derive(Clone)]
pub struct ApiState {
    pub runtime: Arc<PriceQueryRuntime>,
    pub advisor: SuggestionAdvisor,
    pub filter_platform: Platform,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/get_filters", get(get_filters))
        .route("/search_products", get(search_products))
        .route("/genai_suggestions", post(genai_suggestions))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub brand: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub processor_series: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionPayload {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub storage: String,
    #[serde(default)]
    pub processor_series: String,
    /// Price per platform name, or `"Missing"`.
    #[serde(default)]
    pub platform_prices: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            detail: self.0.to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn reject(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiError {
    let mapped = error.into().into_interface(correlation_id);
    warn!(
        event_name = "http.request.rejected",
        correlation_id = %correlation_id,
        error = %mapped,
        "request rejected"
    );
    ApiError(mapped)
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn get_filters(
    State(state): State<ApiState>,
    Query(selection): Query<FilterSelection>,
) -> Result<Json<FilterOptions>, ApiError> {
    let correlation_id = correlation_id();
    let options = enumerate_filters(state.runtime.catalog(), state.filter_platform, &selection)
        .await
        .map_err(|error| reject(error, &correlation_id))?;

    info!(
        event_name = "http.filters.listed",
        correlation_id = %correlation_id,
        platform = %state.filter_platform,
        brands = options.brands.len(),
        "filter values listed"
    );
    Ok(Json(options))
}

pub async fn search_products(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PriceQueryReport>, ApiError> {
    let correlation_id = correlation_id();
    let spec = ProductSpec::new(
        params.brand.unwrap_or_default(),
        params.ram.unwrap_or_default(),
        params.storage.unwrap_or_default(),
        params.processor_series.unwrap_or_default(),
    )
    .map_err(|error| reject(error, &correlation_id))?;

    let report = state.runtime.query(&spec).await;
    info!(
        event_name = "http.search.completed",
        correlation_id = %correlation_id,
        found_in_catalog = report.found_in_catalog,
        suggestions = report.suggestions.len(),
        "product search completed"
    );
    Ok(Json(report))
}

pub async fn genai_suggestions(
    State(state): State<ApiState>,
    Json(payload): Json<SuggestionPayload>,
) -> Result<Json<SuggestionAdvice>, ApiError> {
    let correlation_id = correlation_id();
    let spec =
        ProductSpec::new(payload.brand, payload.ram, payload.storage, payload.processor_series)
            .map_err(|error| reject(error, &correlation_id))?;
    let listed_prices = listed_prices_from_payload(&payload.platform_prices)
        .map_err(|error| reject(error, &correlation_id))?;

    let advice = state.advisor.advise(&SuggestionRequest::new(spec, listed_prices)).await;
    info!(
        event_name = "http.suggestions.completed",
        correlation_id = %correlation_id,
        entries = advice.structured.len(),
        degraded = advice.warning.is_some(),
        "suggestion request completed"
    );
    Ok(Json(advice))
}

/// Every platform appears in the result; platforms absent from the payload
/// are missing. Unparsable amounts count as missing too.
///
/// A value may be a bare amount, a `listed_prices` entry from
/// `/search_products`, or a catalog product object (`"Product Name"`, `"Price"`).
fn listed_prices_from_payload(
    raw: &BTreeMap<String, Value>,
) -> Result<BTreeMap<Platform, ListedPrice>, DomainError> {
    let mut listed: BTreeMap<Platform, ListedPrice> =
        Platform::ALL.into_iter().map(|platform| (platform, ListedPrice::Missing)).collect();

    for (name, value) in raw {
        let platform =
            Platform::parse(name).ok_or_else(|| DomainError::UnknownPlatform(name.clone()))?;
        if let Some(entry) = listed_price_from_value(value) {
            listed.insert(platform, entry);
        }
    }
    Ok(listed)
}

fn listed_price_from_value(value: &Value) -> Option<ListedPrice> {
    match value {
        Value::Object(fields) => {
            if fields.get("status").and_then(Value::as_str) == Some("missing") {
                return None;
            }
            let price = fields.get("price").or_else(|| fields.get("Price")).and_then(amount)?;
            let product_name = fields
                .get("product_name")
                .or_else(|| fields.get("Product Name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(ListedPrice::Listed { product_name, price: Some(price) })
        }
        other => amount(other)
            .map(|price| ListedPrice::Listed { product_name: String::new(), price: Some(price) }),
    }
}

fn amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => {
            let cleaned: String =
                text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}
