use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::chart::{ChartRecord, StarTier};
use crate::models::player::{PlayerSlotEntry, RatingBand};
use crate::models::recommend::RecommendationEntry;

/// 下限之上至少要高出这么多才推荐，否则上升量显示为 +0.000
pub const RATING_MARGIN: f64 = 0.25;

/// 单曲 rating 差值换算为总 rating 上升量的除数
pub const RISE_DIVISOR: f64 = 250.0;

/// 预计上升量，向下取整到小数点后 3 位
pub fn expected_rise(tier_rating: f64, band_min: f64) -> f64 {
    let raw = (tier_rating - band_min) / RISE_DIVISOR;
    // 加一点 epsilon 防止 0.002 被算成 0.0019999...
    let floored = ((raw * 1000.0) + 1e-9).floor() / 1000.0;
    if floored == 0.0 {
        0.0
    } else {
        floored
    }
}

/// 总是带符号，三位小数
pub fn format_rise(rise: f64) -> String {
    format!("{rise:+.3}")
}

/// 选出参数
pub struct SelectionInput<'a> {
    pub catalog: &'a [ChartRecord],
    pub slots: &'a [PlayerSlotEntry],
    pub band: RatingBand,
    pub tier: StarTier,
    pub exclude_technical: bool,
    pub count: usize,
}

/// P 分数枠推荐曲选出
///
/// 1. 目标星级 rating 落在 (min + margin, max] 内
/// 2. 按需排除テクチャレ对象曲
/// 3. 排除枠内已达成目标星级的谱面
/// 4. 排除ソロver.
/// 5. ☆5 人数降序、定数降序的稳定排序
/// 6. 截取前 count 项
pub fn select_recommendations(input: &SelectionInput<'_>) -> Vec<RecommendationEntry> {
    let SelectionInput {
        catalog,
        slots,
        band,
        tier,
        exclude_technical,
        count,
    } = *input;

    let satisfied: HashSet<(String, String)> = slots
        .iter()
        .filter(|s| s.star.is_some_and(|star| star >= tier.value()))
        .map(PlayerSlotEntry::slot_key)
        .collect();

    let lower = band.min + RATING_MARGIN;
    let mut picked: Vec<&ChartRecord> = catalog
        .iter()
        .filter(|c| {
            let r = c.tier_rating(tier);
            r > lower && r <= band.max
        })
        .filter(|c| !(exclude_technical && c.tech_flag))
        .filter(|c| !satisfied.contains(&c.slot_key()))
        .filter(|c| !c.is_solo_variant())
        .collect();

    log::debug!(
        "☆{} 推荐候选: 区间 ({:.3}, {:.3}] 内共 {} 项",
        tier.value(),
        lower,
        band.max,
        picked.len()
    );

    // sort_by 是稳定排序，完全相同的项保持原顺序
    picked.sort_by(|a, b| {
        b.ps5_total_count
            .cmp(&a.ps5_total_count)
            .then_with(|| {
                b.chart_const
                    .partial_cmp(&a.chart_const)
                    .unwrap_or(Ordering::Equal)
            })
    });

    picked
        .into_iter()
        .take(count)
        .map(|chart| {
            let tier_rating = chart.tier_rating(tier);
            let rise = expected_rise(tier_rating, band.min);
            RecommendationEntry {
                chart: chart.clone(),
                tier_rating,
                expected_rise: rise,
                expected_rise_text: format_rise(rise),
            }
        })
        .collect()
}
