use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::services::profile::{validate_player_id, FetchError, ProfileService};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScorelogQuery {
    /// OngekiScoreLog 上のユーザーID
    pub id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScorelogResponse {
    pub html: String,
}

/// 玩家 rating 页面代理
///
/// 原样返回上游页面，解析交给调用方。错误体保持 `{error}` 的简单形式。
#[utoipa::path(
    get,
    path = "/api/scorelog",
    tag = "Proxy",
    params(ScorelogQuery),
    responses(
        (status = 200, description = "页面 HTML", body = ScorelogResponse),
        (status = 400, description = "ID 不合法", example = json!({"error": "Invalid id"})),
        (status = 502, description = "上游返回非成功状态", example = json!({"error": "Failed to fetch"})),
        (status = 500, description = "网络错误", example = json!({"error": "Unexpected error during fetch"}))
    )
)]
#[get("/api/scorelog")]
pub async fn scorelog(
    query: web::Query<ScorelogQuery>,
    profile_service: web::Data<ProfileService>,
) -> HttpResponse {
    let Some(id) = query
        .id
        .as_deref()
        .filter(|id| validate_player_id(id).is_ok())
    else {
        return HttpResponse::BadRequest().json(json!({"error": "Invalid id"}));
    };

    match profile_service.fetch_html(id).await {
        Ok(html) => HttpResponse::Ok().json(ScorelogResponse { html }),
        Err(FetchError::Upstream(status)) => {
            log::warn!("scorelog 代理: 上游返回 HTTP {status}, id={id}");
            HttpResponse::BadGateway().json(json!({"error": "Failed to fetch"}))
        }
        Err(FetchError::Network(e)) => {
            log::error!("scorelog 代理: 请求失败, id={id}: {e}");
            HttpResponse::InternalServerError()
                .json(json!({"error": "Unexpected error during fetch"}))
        }
    }
}
