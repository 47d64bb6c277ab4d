use moka::future::Cache;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::models::chart::ChartRecord;
use crate::utils::error::{AppError, AppResult};

/// 谱面数据服务
///
/// 数据源可以是 http(s) 地址，也可以是本地 JSON 文件。整份数据在 TTL 内只加载一次。
/// 每次重新加载都会得到新的代号，下游缓存以此区分数据版本。
pub struct CatalogService {
    source: String,
    client: reqwest::Client,
    cache: Cache<(), (u64, Arc<Vec<ChartRecord>>)>,
    generation: AtomicU64,
}

impl CatalogService {
    pub fn new(source: impl Into<String>, ttl: Duration, client: reqwest::Client) -> Self {
        Self {
            source: source.into(),
            client,
            // 只有一份数据，容量 1 即可
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        Self::new(
            config.catalog_source.clone(),
            Duration::from_secs(config.catalog_cache_ttl_secs),
            client,
        )
    }

    pub async fn load(&self) -> AppResult<Arc<Vec<ChartRecord>>> {
        Ok(self.load_with_generation().await?.1)
    }

    /// 返回 (代号, 数据)
    pub async fn load_with_generation(&self) -> AppResult<(u64, Arc<Vec<ChartRecord>>)> {
        self.cache
            .try_get_with((), async {
                let start = std::time::Instant::now();
                let records = self.fetch().await?;
                let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                log::info!(
                    "谱面数据加载完成: {} 条, 来源 {}, 代号 {generation}, 耗时 {:?}",
                    records.len(),
                    self.source,
                    start.elapsed()
                );
                Ok::<_, AppError>((generation, Arc::new(records)))
            })
            .await
            .map_err(|e: Arc<AppError>| match e.as_ref() {
                AppError::CatalogError(msg) => AppError::CatalogError(msg.clone()),
                other => AppError::CatalogError(other.to_string()),
            })
    }

    async fn fetch(&self) -> AppResult<Vec<ChartRecord>> {
        let bytes = if is_url(&self.source) {
            let response = self
                .client
                .get(&self.source)
                .send()
                .await
                .map_err(|e| AppError::CatalogError(format!("请求失败: {e}")))?;
            let status = response.status();
            if !status.is_success() {
                return Err(AppError::CatalogError(format!("HTTP {}", status.as_u16())));
            }
            response
                .bytes()
                .await
                .map_err(|e| AppError::CatalogError(format!("读取响应失败: {e}")))?
                .to_vec()
        } else {
            tokio::fs::read(&self.source).await.map_err(|e| {
                AppError::CatalogError(format!("无法读取文件 '{}': {e}", self.source))
            })?
        };
        parse_catalog(&bytes)
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// 顶层必须是数组。无法识别的元素跳过，不影响其余数据
pub fn parse_catalog(bytes: &[u8]) -> AppResult<Vec<ChartRecord>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::CatalogError(format!("JSON 解析失败: {e}")))?;
    let Value::Array(items) = value else {
        return Err(AppError::CatalogError("顶层不是数组".to_string()));
    };

    let total = items.len();
    let records: Vec<ChartRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<ChartRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("跳过第 {i} 条谱面数据: {e}");
                None
            }
        })
        .collect();

    if records.len() < total {
        log::warn!("谱面数据共 {total} 条，其中 {} 条无法识别", total - records.len());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = r#"[
        {"musicName": "A", "difficulty": "MASTER", "level": "14", "chartConst": 14.2, "ps5Rating": 1.5, "ps5TotalCount": "12"},
        {"musicName": "B", "difficulty": "EXPERT", "level": 13, "techFlag": null},
        "garbage"
    ]"#;

    fn service(source: &str) -> CatalogService {
        CatalogService::new(source, Duration::from_secs(60), reqwest::Client::new())
    }

    #[tokio::test]
    async fn loads_local_file_leniently() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let catalog = service(file.path().to_str().unwrap()).load().await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].ps5_total_count, 12);
        assert_eq!(catalog[1].level, "13");
        assert!(!catalog[1].tech_flag);
        assert_eq!(catalog[1].chart_const, 0.0);
    }

    #[tokio::test]
    async fn non_array_is_a_catalog_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"musicName": "A"}"#).unwrap();
        let err = service(file.path().to_str().unwrap()).load().await.unwrap_err();
        assert!(matches!(err, AppError::CatalogError(_)));
    }

    #[tokio::test]
    async fn missing_file_is_a_catalog_error() {
        let err = service("/no/such/data.json").load().await.unwrap_err();
        assert!(matches!(err, AppError::CatalogError(_)));
    }

    #[tokio::test]
    async fn url_source_is_fetched_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .expect(1)
            .mount(&server)
            .await;

        let svc = service(&format!("{}/data.json", server.uri()));
        let first = svc.load().await.unwrap();
        let second = svc.load().await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn reload_after_ttl_bumps_generation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .expect(2)
            .mount(&server)
            .await;

        let svc = CatalogService::new(
            format!("{}/data.json", server.uri()),
            Duration::from_millis(50),
            reqwest::Client::new(),
        );
        let (first, _) = svc.load_with_generation().await.unwrap();
        let (cached, _) = svc.load_with_generation().await.unwrap();
        assert_eq!(first, cached);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let (reloaded, charts) = svc.load_with_generation().await.unwrap();
        assert!(reloaded > first);
        assert_eq!(charts.len(), 2);
    }

    #[tokio::test]
    async fn url_error_status_is_a_catalog_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = service(&format!("{}/data.json", server.uri())).load().await.unwrap_err();
        assert!(matches!(err, AppError::CatalogError(_)));
    }
}
