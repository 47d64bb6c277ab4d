use std::sync::Arc;

use crate::models::player::{PlayerProfile, RatingBand};
use crate::models::recommend::{
    RecommendOptions, RecommendRequest, RecommendResponse, TierRecommendation,
};
use crate::services::catalog::CatalogService;
use crate::services::profile::{validate_player_id, ProfileService};
use crate::utils::error::{AppError, AppResult};
use crate::utils::rating_utils::{select_recommendations, SelectionInput};

/// P 分数枠推荐曲服务
///
/// 流程：校验 -> 抓取玩家页面 -> 解析 -> 求 rating 区间 -> 加载谱面 -> 按星级选出。
/// 任何一步失败都直接返回错误，不给部分结果。
pub struct RecommendService {
    catalog: Arc<CatalogService>,
    profile: Arc<ProfileService>,
}

impl RecommendService {
    pub fn new(catalog: Arc<CatalogService>, profile: Arc<ProfileService>) -> Self {
        Self { catalog, profile }
    }

    pub async fn recommend(&self, request: &RecommendRequest) -> AppResult<RecommendResponse> {
        // 网络请求之前先把输入校验完
        let options = request.options()?;
        validate_player_id(&request.player_id)?;

        let player = self.profile.fetch_profile(&request.player_id).await?;
        let band = derive_band(&player, &options)?;

        let catalog = self.catalog.load().await?;
        let tiers = options
            .tiers
            .iter()
            .map(|&tier| TierRecommendation {
                tier,
                entries: select_recommendations(&SelectionInput {
                    catalog: &catalog,
                    slots: &player.slots,
                    band,
                    tier,
                    exclude_technical: options.exclude_technical,
                    count: options.count as usize,
                }),
            })
            .collect::<Vec<_>>();

        log::info!(
            "推荐曲选出完成: player={}, band=[{:.3}, {:.3}], {}",
            player.name,
            band.min,
            band.max,
            tiers
                .iter()
                .map(|t| format!("☆{}:{}", t.tier.value(), t.entries.len()))
                .collect::<Vec<_>>()
                .join(" ")
        );

        Ok(RecommendResponse {
            player,
            band,
            tiers,
        })
    }
}

/// 先做异常值排除，再应用手动下限
pub fn derive_band(player: &PlayerProfile, options: &RecommendOptions) -> AppResult<RatingBand> {
    let band = match options.exclude_lowest {
        Some(n) if n > 0 => RatingBand::excluding_lowest(&player.slots, n)?,
        _ => RatingBand::from_slots(&player.slots).ok_or_else(|| {
            AppError::ProfileParseFailed(format!("玩家 '{}' 的枠内没有 rating", player.name))
        })?,
    };
    match options.band_floor {
        Some(floor) => band.with_floor(floor),
        None => Ok(band),
    }
}
