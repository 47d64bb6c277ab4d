use chrono::{FixedOffset, Utc};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::usage_log::UsageLogEntry;
use crate::utils::error::{AppError, AppResult};

const JST_OFFSET_SECS: i32 = 9 * 3600;
const HEADER: [&str; 5] = ["time", "action", "userAgent", "userId", "option"];

/// 利用ログ。CSV 文件追加写入，每次一行
pub struct UsageLogService {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UsageLogService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub async fn append(&self, entry: &UsageLogEntry) -> AppResult<()> {
        let row = log_row(entry)?;
        let path = self.path.clone();

        let _guard = self.lock.lock().await;
        tokio::task::spawn_blocking(move || append_row(&path, &row))
            .await
            .map_err(|e| AppError::InternalError(format!("Blocking task join error: {e}")))?
    }
}

/// 日本时间 "YYYY-MM-DD HH:MM:SS"
pub fn jst_now() -> AppResult<String> {
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS)
        .ok_or_else(|| AppError::InternalError("无效的时区偏移".to_string()))?;
    Ok(Utc::now()
        .with_timezone(&jst)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string())
}

fn log_row(entry: &UsageLogEntry) -> AppResult<[String; 5]> {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    Ok([
        jst_now()?,
        field(&entry.action),
        field(&entry.user_agent),
        field(&entry.user_id),
        field(&entry.option),
    ])
}

fn append_row(path: &Path, row: &[String; 5]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record(HEADER)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

/// 页面处理里用的尽力而为的记录器
///
/// `notify` 立即返回，写入在后台任务里完成，失败只记日志。
#[derive(Clone)]
pub struct UsageNotifier {
    sink: Arc<UsageLogService>,
}

impl UsageNotifier {
    pub fn new(sink: Arc<UsageLogService>) -> Self {
        Self { sink }
    }

    pub fn notify(&self, entry: UsageLogEntry) -> tokio::task::JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.append(&entry).await {
                log::warn!("利用ログの書き込みに失敗 (已忽略): {e}");
            }
        })
    }
}
