use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 利用ログ 1 行分。前端发来的字段名是 camelCase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// 客户端时间戳，只做透传，记录时间以服务器为准
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
}

impl UsageLogEntry {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_option(mut self, option: Option<String>) -> Self {
        self.option = option;
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InsertLogResponse {
    pub success: bool,
}
