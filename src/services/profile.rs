use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::player::PlayerProfile;
use crate::utils::error::{AppError, AppResult};
use crate::utils::profile_parser::ProfileParser;

/// 抓取玩家页面时的失败原因
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    #[error("上游返回 HTTP {0}")]
    Upstream(u16),
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Network(err) => AppError::FetchFailed(err.to_string()),
            FetchError::Upstream(status) => AppError::UpstreamUnavailable(status),
        }
    }
}

/// 玩家 ID 只能是 1~5 位数字，不合法时不发请求
pub fn validate_player_id(id: &str) -> AppResult<()> {
    let valid = (1..=5).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidPlayerId(id.to_string()))
    }
}

/// 共用的 HTTP 客户端，带 User-Agent 和超时
pub fn build_http_client(config: &AppConfig) -> AppResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(config.profile_user_agent.clone())
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?)
}

pub struct ProfileService {
    client: reqwest::Client,
    base_url: String,
    parser: ProfileParser,
}

impl ProfileService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            parser: ProfileParser::new()?,
        })
    }

    pub fn rating_page_url(&self, id: &str) -> String {
        format!("{}/user/{}/rating", self.base_url, id)
    }

    /// 取回玩家 rating 页面原文。不重试
    pub async fn fetch_html(&self, id: &str) -> Result<String, FetchError> {
        let url = self.rating_page_url(id);
        log::debug!("请求玩家页面: {url}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("玩家页面返回非成功状态: id={id}, HTTP {}", status.as_u16());
            return Err(FetchError::Upstream(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// 校验 ID、抓取并解析
    pub async fn fetch_profile(&self, id: &str) -> AppResult<PlayerProfile> {
        validate_player_id(id)?;
        let html = self.fetch_html(id).await?;
        self.parser.parse(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <div class="player-name">TESTER</div>
        <table><tr><th>レーティング</th><td>15.00</td></tr></table>
        <table class="platinum-score"><tbody>
          <tr><td>1</td><td>Song</td><td>MAS</td><td>14</td><td>☆4</td><td>1.2</td></tr>
        </tbody></table>
        </body></html>"#;

    #[test]
    fn player_id_shape() {
        for ok in ["1", "12345", "00042"] {
            assert!(validate_player_id(ok).is_ok(), "{ok}");
        }
        for bad in ["", "123456", "12a", " 123", "１２３", "-1"] {
            assert!(validate_player_id(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn fetches_rating_page_with_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/123/rating"))
            .and(header("user-agent", "pongeki-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .user_agent("pongeki-test")
            .build()
            .unwrap();
        let svc = ProfileService::new(client, format!("{}/", server.uri())).unwrap();
        let profile = svc.fetch_profile("123").await.unwrap();
        assert_eq!(profile.name, "TESTER");
        assert_eq!(profile.slots[0].star, Some(4));
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let svc = ProfileService::new(reqwest::Client::new(), server.uri()).unwrap();
        let err = svc.fetch_html("1").await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(404)));
        assert!(matches!(AppError::from(err), AppError::UpstreamUnavailable(404)));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // 端口 1 上没有服务
        let svc = ProfileService::new(reqwest::Client::new(), "http://127.0.0.1:1").unwrap();
        let err = svc.fetch_html("1").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[tokio::test]
    async fn invalid_id_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let svc = ProfileService::new(reqwest::Client::new(), server.uri()).unwrap();
        let err = svc.fetch_profile("abc").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidPlayerId(_)));
    }
}
