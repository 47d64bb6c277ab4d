use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::chart::{ChartRecord, StarTier};
use crate::models::player::{PlayerProfile, RatingBand};
use crate::utils::error::{AppError, AppResult};

pub const MIN_RESULT_COUNT: u32 = 1;
pub const MAX_RESULT_COUNT: u32 = 100;
pub const DEFAULT_RESULT_COUNT: u32 = 10;

/// おすすめ曲選出のリクエスト
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecommendRequest {
    /// OngekiScoreLog 上のユーザーID (1〜5桁の数字)
    pub player_id: String,
    #[serde(default)]
    pub exclude_technical: bool,
    /// 件数。数字か数字の文字列
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub count: Option<Value>,
    /// 3 / 4 / 5。省略時は全て
    #[serde(default)]
    pub tier: Option<u8>,
    /// 手動で指定する rating 下限
    #[serde(default)]
    pub band_floor: Option<f64>,
    /// 下から除外する件数
    #[serde(default)]
    pub exclude_lowest: Option<usize>,
    /// 利用ログ用のユーザー識別子
    #[serde(default)]
    pub user_id: Option<String>,
}

/// 校验后的选项
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendOptions {
    pub exclude_technical: bool,
    pub count: u32,
    pub tiers: Vec<StarTier>,
    pub band_floor: Option<f64>,
    pub exclude_lowest: Option<usize>,
}

/// 件数：数字或数字字符串，范围 1..=100
pub fn parse_count(raw: Option<&Value>) -> AppResult<u32> {
    let invalid = || {
        AppError::ValidationError(format!(
            "件数は{MIN_RESULT_COUNT}〜{MAX_RESULT_COUNT}の整数で指定してください"
        ))
    };
    let n = match raw {
        None | Some(Value::Null) => return Ok(DEFAULT_RESULT_COUNT),
        // 数字输入框可能给出 5.0 这样的整数值浮点数
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && (0.0..=MAX_RESULT_COUNT as f64).contains(f))
                    .map(|f| f as u64)
            })
            .ok_or_else(invalid)?,
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };
    if !(MIN_RESULT_COUNT as u64..=MAX_RESULT_COUNT as u64).contains(&n) {
        return Err(invalid());
    }
    Ok(n as u32)
}

impl RecommendRequest {
    pub fn options(&self) -> AppResult<RecommendOptions> {
        let count = parse_count(self.count.as_ref())?;
        let tiers = match self.tier {
            Some(t) => vec![StarTier::try_from(t).map_err(AppError::ValidationError)?],
            None => StarTier::ALL_DESC.to_vec(),
        };
        if let Some(floor) = self.band_floor {
            if !floor.is_finite() {
                return Err(AppError::ValidationError("下限が不正です".to_string()));
            }
        }
        Ok(RecommendOptions {
            exclude_technical: self.exclude_technical,
            count,
            tiers,
            band_floor: self.band_floor,
            exclude_lowest: self.exclude_lowest,
        })
    }
}

/// 选出结果中的一项
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RecommendationEntry {
    pub chart: ChartRecord,
    /// 目标星级对应的 rating
    pub tier_rating: f64,
    pub expected_rise: f64,
    /// 带符号、三位小数，例如 "+0.002"
    pub expected_rise_text: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TierRecommendation {
    #[schema(value_type = u8)]
    pub tier: StarTier,
    pub entries: Vec<RecommendationEntry>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecommendResponse {
    pub player: PlayerProfile,
    pub band: RatingBand,
    pub tiers: Vec<TierRecommendation>,
}
