use rocket::serde::json::Json;
use rocket::{get, post, State};
use std::sync::Arc;
use crate::web::dto::{QuoteToRatioRequest, QuoteToRatioResponse};
use crate::engine::service::quote_to_ratio_async;
use crate::bootstrap::AppState;

#[post("/api/v1/quote-to-ratio", format = "json", data = "<request>")]
pub async fn quote_to_ratio(
    request: Json<QuoteToRatioRequest>,
    app_state: &State<Arc<AppState>>,
) -> Json<QuoteToRatioResponse> {
    let params = request.into_inner().into_params();

    match quote_to_ratio_async(
        app_state.provider.clone(),
        app_state.gas_costs,
        app_state.config.clone(),
        params,
    ).await {
        Ok(quote) => Json(QuoteToRatioResponse::from_quote(&quote)),
        Err(e) => {
            log::error!("Failed to quote swap to ratio: {:#}", e);
            Json(QuoteToRatioResponse::error(format!("{:#}", e)))
        }
    }
}

#[get("/health")]
pub fn health(app_state: &State<Arc<AppState>>) -> String {
    format!("OK block={} pools={}", app_state.block_number, app_state.pool_count)
}
