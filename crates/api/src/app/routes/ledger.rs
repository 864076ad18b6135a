use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response, Sse, sse::Event as SseEvent},
    routing::{get, post},
};

use agrichain_actors::{Actor, ActorType};
use agrichain_core::{Address, Amount, ProductId};
use agrichain_products::{NewProduct, ProduceType, ProductState};

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/actors", post(register_actor).get(list_actors))
        .route("/actors/:address", get(get_actor))
        .route("/actors/:address/products", get(actor_products))
        .route("/products", post(create_product).get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/history", get(product_history))
        .route("/products/:id/ownership", get(product_ownership))
        .route("/products/:id/expired", get(product_expired))
        .route("/products/:id/transfer", post(transfer_product))
        .route("/products/:id/state", post(change_product_state))
        .route("/products/:id/certificates", post(add_quality_certificate))
        .route("/products/:id/purchase", post(purchase_product))
        .route("/accounts/:address", get(get_balance))
        .route("/stream", get(stream))
}

fn parse_product_id(raw: &str) -> Result<ProductId, Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

fn parse_address(raw: &str) -> Result<Address, Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

// ---- actors -------------------------------------------------------------------------

pub async fn register_actor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::RegisterActorRequest>,
) -> Response {
    let actor_type: ActorType = match body.actor_type.parse() {
        Ok(t) => t,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .ledger()
        .register_actor(caller.address(), &body.name, &body.location, actor_type)
    {
        Ok(actor) => (StatusCode::CREATED, Json(dto::actor_to_json(&actor))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_actors(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let ledger = services.ledger();
    let (actors, total) = match (ledger.get_all_actors(), ledger.get_total_actors()) {
        (Ok(actors), Ok(total)) => (actors, total),
        (Err(e), _) | (_, Err(e)) => return errors::ledger_error_to_response(e),
    };

    let items = actors.iter().map(dto::actor_to_json).collect::<Vec<_>>();
    (
        StatusCode::OK,
        Json(serde_json::json!({ "items": items, "total": total })),
    )
        .into_response()
}

/// Unknown identities render as the inactive default record, never 404.
pub async fn get_actor(
    Extension(services): Extension<Arc<AppServices>>,
    Path(address): Path<String>,
) -> Response {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    match services.ledger().get_actor(&address) {
        Ok(actor) => {
            let actor = actor.unwrap_or_else(|| Actor::empty(address));
            (StatusCode::OK, Json(dto::actor_to_json(&actor))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn actor_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(address): Path<String>,
) -> Response {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    match services.ledger().get_actor_products(&address) {
        Ok(ids) => (
            StatusCode::OK,
            Json(serde_json::json!({ "address": address, "product_ids": ids })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

// ---- products -----------------------------------------------------------------------

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> Response {
    let produce_type: ProduceType = match body.produce_type.parse() {
        Ok(t) => t,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let price: Amount = match body.price.parse() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let details = NewProduct {
        name: body.name,
        description: body.description,
        produce_type,
        quantity: body.quantity,
        price,
        expiry_date: body.expiry_date,
        origin_farm: body.origin_farm,
    };

    match services.ledger().create_product(caller.address(), details) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "product_id": id })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let ledger = services.ledger();
    let (ids, total) = match (ledger.get_all_products(), ledger.get_total_products()) {
        (Ok(ids), Ok(total)) => (ids, total),
        (Err(e), _) | (_, Err(e)) => return errors::ledger_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({ "items": ids, "total": total })),
    )
        .into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    product_response(&services, id)
}

pub async fn product_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger().get_product_history(id) {
        Ok(history) => {
            let items = history.iter().map(dto::state_change_to_json).collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "product_id": id, "items": items })),
            )
                .into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn product_ownership(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger().get_product_ownership_history(id) {
        Ok(owners) => (
            StatusCode::OK,
            Json(serde_json::json!({ "product_id": id, "owners": owners })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn product_expired(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger().is_product_expired(id) {
        Ok(expired) => (
            StatusCode::OK,
            Json(serde_json::json!({ "product_id": id, "expired": expired })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn transfer_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransferProductRequest>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let new_owner = match parse_address(&body.new_owner) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    if let Err(e) = services
        .ledger()
        .transfer_product(caller.address(), id, new_owner)
    {
        return errors::ledger_error_to_response(e);
    }
    product_response(&services, id)
}

pub async fn change_product_state(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeStateRequest>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let new_state: ProductState = match body.new_state.parse() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) =
        services
            .ledger()
            .change_product_state(caller.address(), id, new_state, &body.notes)
    {
        return errors::ledger_error_to_response(e);
    }
    product_response(&services, id)
}

pub async fn add_quality_certificate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddCertificateRequest>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Err(e) =
        services
            .ledger()
            .add_quality_certificate(caller.address(), id, &body.certificate)
    {
        return errors::ledger_error_to_response(e);
    }
    product_response(&services, id)
}

/// The caller is the buyer; registration is not required.
pub async fn purchase_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PurchaseRequest>,
) -> Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let value: Amount = match body.value.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger().purchase_product(caller.address(), id, value) {
        Ok(purchase) => (StatusCode::OK, Json(dto::purchase_to_json(&purchase))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

fn product_response(services: &AppServices, id: ProductId) -> Response {
    match services.ledger().get_product(id) {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

// ---- accounts & stream --------------------------------------------------------------

pub async fn get_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(address): Path<String>,
) -> Response {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    match services.ledger().balance_of(&address) {
        Ok(balance) => {
            (StatusCode::OK, Json(dto::balance_to_json(address, balance))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::ledger_sse_stream(services)
}
