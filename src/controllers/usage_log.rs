use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::usage_log::{InsertLogResponse, UsageLogEntry};
use crate::services::usage_log::UsageLogService;

/// 追加一行利用ログ
///
/// 这里的失败会返回给调用方；页面处理内部的记录走 `UsageNotifier`，不会报错。
#[utoipa::path(
    post,
    path = "/api/insertLog",
    tag = "Log",
    request_body = UsageLogEntry,
    responses(
        (status = 200, description = "写入成功", body = InsertLogResponse),
        (status = 405, description = "非 POST 请求", example = json!({"error": "Method not allowed"})),
        (status = 500, description = "写入失败", example = json!({"error": "..."}))
    )
)]
pub async fn insert_log(
    entry: web::Json<UsageLogEntry>,
    usage_log: web::Data<UsageLogService>,
) -> HttpResponse {
    match usage_log.append(&entry).await {
        Ok(()) => HttpResponse::Ok().json(InsertLogResponse { success: true }),
        Err(e) => {
            log::error!("利用ログの書き込みに失敗: {e}");
            HttpResponse::InternalServerError().json(json!({"error": e.to_string()}))
        }
    }
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(json!({"error": "Method not allowed"}))
}

/// `/api/insertLog` 只接受 POST
pub fn insert_log_resource() -> actix_web::Resource {
    web::resource("/api/insertLog")
        .route(web::post().to(insert_log))
        .default_service(web::route().to(method_not_allowed))
}
