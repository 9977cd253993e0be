use axum::Json;

use super::schema::ModelList;

/// `GET /v1/models`
pub async fn list_models() -> Json<ModelList> {
    Json(ModelList::supported())
}
