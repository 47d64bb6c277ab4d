use utoipa::OpenApi;

use crate::controllers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Pongeki Backend API", description = "O.N.G.E.K.I. 谱面数据与 P 分数枠推荐"),
    paths(
        controllers::health::health_check,
        controllers::scorelog::scorelog,
        controllers::usage_log::insert_log,
        controllers::recommend::recommend,
        controllers::recommend::recommend_image,
        controllers::listing::database,
        controllers::listing::database_image,
        controllers::listing::ranking,
        controllers::listing::ranking_image,
        controllers::preferences::issue_user_id,
        controllers::preferences::get_preferences,
        controllers::preferences::put_preferences,
    ),
    components(schemas(
        models::ChartRecord,
        models::PlayerSlotEntry,
        models::PlayerProfile,
        models::RatingBand,
        models::RecommendRequest,
        models::RecommendationEntry,
        models::TierRecommendation,
        models::RecommendResponse,
        models::ListingQuery,
        models::ListingSort,
        models::SortOrder,
        models::RankingKind,
        models::RankingEntry,
        models::UsageLogEntry,
        models::InsertLogResponse,
        models::Preferences,
        models::RecommendPreferences,
        models::MapPreferences,
        controllers::scorelog::ScorelogResponse,
        controllers::preferences::UserIdResponse,
    )),
    tags(
        (name = "Status"),
        (name = "Proxy", description = "OngekiScoreLog 页面代理"),
        (name = "Log", description = "利用ログ"),
        (name = "Recommend", description = "P 分数枠推荐曲"),
        (name = "Listing", description = "☆人数一览与理论值排行"),
        (name = "Image", description = "表格图片"),
        (name = "Preferences", description = "用户设置"),
    )
)]
pub struct ApiDoc;
