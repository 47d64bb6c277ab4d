use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::chart::difficulty_prefix;
use crate::utils::error::{AppError, AppResult};

/// 玩家 P 分数枠中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlayerSlotEntry {
    pub rank: u32,
    pub title: String,
    /// 页面上的缩写，例如 MAS / EXP
    pub difficulty: String,
    pub level: String,
    /// 已达成的星级，页面上没有时为 None
    pub star: Option<u8>,
    pub rating: Option<f64>,
}

impl PlayerSlotEntry {
    pub fn slot_key(&self) -> (String, String) {
        (self.title.clone(), difficulty_prefix(&self.difficulty))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlayerProfile {
    pub name: String,
    pub rating: f64,
    pub slots: Vec<PlayerSlotEntry>,
}

/// 玩家当前 P 分数枠的 rating 区间 [min, max]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingBand {
    pub min: f64,
    pub max: f64,
}

impl RatingBand {
    /// 由枠内所有有效 rating 求出区间；一个都没有时返回 None
    pub fn from_slots(slots: &[PlayerSlotEntry]) -> Option<Self> {
        Self::from_ratings(slots.iter().filter_map(|s| s.rating))
    }

    fn from_ratings<I: IntoIterator<Item = f64>>(ratings: I) -> Option<Self> {
        ratings
            .into_iter()
            .filter(|r| r.is_finite())
            .fold(None, |band: Option<RatingBand>, r| match band {
                None => Some(RatingBand { min: r, max: r }),
                Some(b) => Some(RatingBand {
                    min: b.min.min(r),
                    max: b.max.max(r),
                }),
            })
    }

    /// 排除最低的 n 个 rating 后重新计算下限（异常值排除）
    pub fn excluding_lowest(slots: &[PlayerSlotEntry], n: usize) -> AppResult<Self> {
        let mut ratings: Vec<f64> = slots
            .iter()
            .filter_map(|s| s.rating)
            .filter(|r| r.is_finite())
            .collect();
        if n >= ratings.len() {
            return Err(AppError::ValidationError(format!(
                "除外する件数が多すぎます (枠内 {} 件)",
                ratings.len()
            )));
        }
        ratings.sort_by(|a, b| a.total_cmp(b));
        Self::from_ratings(ratings.into_iter().skip(n))
            .ok_or_else(|| AppError::InternalError("rating 区间为空".to_string()))
    }

    /// 手动收窄下限，只能在 [min, max] 之内
    pub fn with_floor(self, floor: f64) -> AppResult<Self> {
        if !floor.is_finite() || floor < self.min || floor > self.max {
            return Err(AppError::ValidationError(format!(
                "下限は {:.3} ～ {:.3} の範囲で指定してください",
                self.min, self.max
            )));
        }
        Ok(RatingBand { min: floor, max: self.max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(rank: u32, rating: Option<f64>) -> PlayerSlotEntry {
        PlayerSlotEntry {
            rank,
            title: format!("Song {rank}"),
            difficulty: "MAS".to_string(),
            level: "14".to_string(),
            star: Some(3),
            rating,
        }
    }

    #[test]
    fn band_ignores_missing_ratings() {
        let slots = vec![slot(1, Some(1.6)), slot(2, None), slot(3, Some(1.0))];
        let band = RatingBand::from_slots(&slots).unwrap();
        assert_eq!(band, RatingBand { min: 1.0, max: 1.6 });
        assert!(RatingBand::from_slots(&[slot(1, None)]).is_none());
    }

    #[test]
    fn excluding_lowest_raises_the_floor() {
        let slots = vec![slot(1, Some(1.6)), slot(2, Some(0.2)), slot(3, Some(1.0))];
        let band = RatingBand::excluding_lowest(&slots, 1).unwrap();
        assert_eq!(band, RatingBand { min: 1.0, max: 1.6 });
        assert!(RatingBand::excluding_lowest(&slots, 3).is_err());
    }

    #[test]
    fn floor_must_stay_inside_band() {
        let band = RatingBand { min: 1.0, max: 1.6 };
        assert_eq!(band.with_floor(1.2).unwrap().min, 1.2);
        assert!(band.with_floor(0.9).is_err());
        assert!(band.with_floor(1.7).is_err());
        assert!(band.with_floor(f64::NAN).is_err());
    }

    #[test]
    fn slot_key_uses_difficulty_prefix() {
        let mut s = slot(1, Some(1.0));
        s.difficulty = "master".to_string();
        assert_eq!(s.slot_key(), ("Song 1".to_string(), "MAS".to_string()));
    }
}
