use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::preferences::Preferences;
use crate::utils::error::{AppError, AppResult};

const MAX_USER_ID_LEN: usize = 64;

/// 用户设置存储，一个 JSON 文件，按用户 ID 分键
pub struct PreferenceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 没保存过或内容损坏时返回默认设置
    pub async fn load(&self, user_id: &str) -> AppResult<Preferences> {
        validate_user_id(user_id)?;
        let _guard = self.lock.lock().await;
        let all = read_all(&self.path).await?;
        Ok(all
            .get(user_id)
            .map(Preferences::from_stored)
            .unwrap_or_default())
    }

    pub async fn save(&self, user_id: &str, prefs: Preferences) -> AppResult<Preferences> {
        validate_user_id(user_id)?;
        let prefs = prefs.normalized();

        let _guard = self.lock.lock().await;
        let mut all = read_all(&self.path).await?;
        all.insert(user_id.to_string(), serde_json::to_value(&prefs)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // 先写临时文件再改名，避免写到一半的文件
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(all))?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        log::debug!("已保存用户设置: {user_id}");
        Ok(prefs)
    }
}

fn validate_user_id(user_id: &str) -> AppResult<()> {
    let ok = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(AppError::ValidationError("ユーザーIDが不正です".to_string()))
    }
}

async fn read_all(path: &Path) -> AppResult<Map<String, Value>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
            log::warn!("设置文件格式异常，按空文件处理: {}", path.display());
            Ok(Map::new())
        }
    }
}
