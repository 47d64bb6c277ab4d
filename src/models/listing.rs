use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::chart::ChartRecord;

/// 选择画面上的等级一览，按从高到低排列
pub const LEVELS: [&str; 25] = [
    "15+", "15", "14+", "14", "13+", "13", "12+", "12", "11+", "11", "10+", "10", "9+", "9", "8+",
    "8", "7+", "7", "6", "5", "4", "3", "2", "1", "0",
];

/// 一览图最多行数，超过时要求用户缩小范围
pub const MAX_LISTING_ROWS: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingSort {
    /// ☆5 获得人数优先
    #[default]
    Star,
    /// 谱面定数优先
    Const,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ListingQuery {
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub sort: ListingSort,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub exclude_technical: bool,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RankingKind {
    /// テクニカルスコア 1 位の理論値回数
    Ts1,
    /// P スコア理論値の達成人数
    Ps,
}

impl RankingKind {
    pub fn count_of(self, chart: &ChartRecord) -> u32 {
        match self {
            RankingKind::Ts1 => chart.ts1_theory_count,
            RankingKind::Ps => chart.ps_theory_count,
        }
    }

    /// 进入排行所需的最低次数
    pub fn threshold(self) -> u32 {
        match self {
            RankingKind::Ts1 => 10,
            RankingKind::Ps => 1,
        }
    }

    pub fn count_header(self) -> &'static str {
        match self {
            RankingKind::Ts1 => "TS1 Count",
            RankingKind::Ps => "PS-MAX Count",
        }
    }

    pub fn log_action(self) -> &'static str {
        match self {
            RankingKind::Ts1 => "TS1位理論値回数ランキングを表示",
            RankingKind::Ps => "PS理論値人数ランキングを表示",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RankingEntry {
    pub rank: usize,
    pub chart: ChartRecord,
    pub count: u32,
}
