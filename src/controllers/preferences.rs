use actix_web::{get, post, put, web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::preferences::Preferences;
use crate::services::preferences::PreferenceStore;
use crate::utils::error::AppError;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserIdResponse {
    pub user_id: String,
}

/// 发放新的用户 ID
#[utoipa::path(
    post,
    path = "/user-id",
    tag = "Preferences",
    responses((status = 200, description = "新的用户 ID (UUID v4)", body = UserIdResponse))
)]
#[post("/user-id")]
pub async fn issue_user_id() -> HttpResponse {
    HttpResponse::Ok().json(UserIdResponse {
        user_id: uuid::Uuid::new_v4().to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/preferences/{user_id}",
    tag = "Preferences",
    params(("user_id" = String, Path, description = "用户 ID")),
    responses((status = 200, description = "保存的设置，没有时为默认值", body = Preferences))
)]
#[get("/preferences/{user_id}")]
pub async fn get_preferences(
    user_id: web::Path<String>,
    store: web::Data<PreferenceStore>,
) -> Result<HttpResponse, AppError> {
    let prefs = store.load(&user_id).await?;
    Ok(HttpResponse::Ok().json(prefs))
}

#[utoipa::path(
    put,
    path = "/preferences/{user_id}",
    tag = "Preferences",
    params(("user_id" = String, Path, description = "用户 ID")),
    request_body = Preferences,
    responses((status = 200, description = "整理后实际保存的设置", body = Preferences))
)]
#[put("/preferences/{user_id}")]
pub async fn put_preferences(
    user_id: web::Path<String>,
    body: web::Json<Preferences>,
    store: web::Data<PreferenceStore>,
) -> Result<HttpResponse, AppError> {
    let saved = store.save(&user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(saved))
}
