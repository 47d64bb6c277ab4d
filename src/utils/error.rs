use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("プレイヤーIDが不正です: {0}")]
    InvalidPlayerId(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("レベルが選択されていません")]
    NoLevelSelected,

    #[error("該当する譜面が多すぎます ({0}件)。条件を絞り込んでください")]
    TooManyRows(usize),

    // 上游返回非 2xx，或者页面里找不到必要信息，对用户只给一条统一提示
    #[error("データ取得に失敗しました")]
    UpstreamUnavailable(u16),

    #[error("データ取得に失敗しました")]
    ProfileParseFailed(String),

    #[error("データ取得に失敗しました")]
    FetchFailed(String),

    #[error("譜面データの読み込みに失敗しました: {0}")]
    CatalogError(String),

    #[error("画像の生成に失敗しました")]
    RenderError(String),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP请求错误: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Serde JSON错误: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Serde YAML错误: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error),

    #[error("CSV错误: {0}")]
    CsvError(#[from] csv::Error),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    fn status_and_kind(&self) -> (actix_web::http::StatusCode, &'static str) {
        use actix_web::http::StatusCode;
        match self {
            AppError::InvalidPlayerId(_) => (StatusCode::BAD_REQUEST, "invalid_player_id"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NoLevelSelected => (StatusCode::BAD_REQUEST, "no_level_selected"),
            AppError::TooManyRows(_) => (StatusCode::BAD_REQUEST, "too_many_rows"),
            AppError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
            AppError::ProfileParseFailed(_) => (StatusCode::BAD_GATEWAY, "profile_parse_failed"),
            AppError::FetchFailed(_) => (StatusCode::BAD_GATEWAY, "fetch_failed"),
            AppError::CatalogError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "catalog_error"),
            AppError::RenderError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
            AppError::IoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            AppError::ReqwestError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "request_error"),
            AppError::SerdeJsonError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::SerdeYamlError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::CsvError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "csv_error"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AppError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.status_and_kind().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status_code, error_type) = self.status_and_kind();

        // 细节只进日志，返回给用户的是 Display 里的统一文案
        match self {
            AppError::UpstreamUnavailable(status) => {
                log::warn!("上游页面不可用: HTTP {status}");
            }
            AppError::ProfileParseFailed(detail) | AppError::FetchFailed(detail) => {
                log::warn!("玩家数据获取失败: {detail}");
            }
            AppError::RenderError(detail) => {
                log::error!("图片渲染失败: {detail}");
            }
            _ => {}
        }

        HttpResponse::build(status_code).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        })
    }
}
