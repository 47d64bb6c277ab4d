pub mod health;
pub mod listing;
pub mod preferences;
pub mod recommend;
pub mod scorelog;
pub mod usage_log;

pub use health::health_check;
pub use listing::{database, database_image, ranking, ranking_image};
pub use preferences::{get_preferences, issue_user_id, put_preferences};
pub use usage_log::insert_log_resource;

use actix_web::{http::header, web, HttpRequest};

use crate::utils::error::AppError;

/// 请求体 JSON 解析失败时同样返回 `{error, message}`
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        log::debug!("请求体解析失败 {}: {err}", req.path());
        AppError::ValidationError(err.to_string()).into()
    })
}

/// 请求头里的 User-Agent，用于利用ログ
pub(crate) fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
