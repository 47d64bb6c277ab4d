use actix_web::{get, post, web, HttpRequest, HttpResponse};

use crate::controllers::user_agent;
use crate::models::chart::ChartRecord;
use crate::models::listing::{ListingQuery, RankingEntry, RankingKind};
use crate::models::usage_log::UsageLogEntry;
use crate::services::image_service::ImageService;
use crate::services::listing::ListingService;
use crate::services::usage_log::UsageNotifier;
use crate::utils::error::AppError;

const DATABASE_ACTION: &str = "☆獲得人数一覧を表示";

fn notify_database(notifier: &UsageNotifier, http: &HttpRequest, query: &ListingQuery) {
    let option = serde_json::to_string(query).ok();
    notifier.notify(
        UsageLogEntry::new(DATABASE_ACTION)
            .with_user_agent(user_agent(http))
            .with_user_id(query.user_id.clone())
            .with_option(option),
    );
}

fn notify_ranking(notifier: &UsageNotifier, http: &HttpRequest, kind: RankingKind) {
    notifier.notify(UsageLogEntry::new(kind.log_action()).with_user_agent(user_agent(http)));
}

/// ☆获得人数一览
#[utoipa::path(
    post,
    path = "/database",
    tag = "Listing",
    request_body = ListingQuery,
    responses(
        (status = 200, description = "谱面一览", body = Vec<ChartRecord>),
        (status = 400, description = "未选择等级，或结果超过上限")
    )
)]
#[post("/database")]
pub async fn database(
    http: HttpRequest,
    query: web::Json<ListingQuery>,
    listing_service: web::Data<ListingService>,
    notifier: web::Data<UsageNotifier>,
) -> Result<HttpResponse, AppError> {
    let rows = listing_service.database(&query).await?;
    notify_database(&notifier, &http, &query);
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    post,
    path = "/image/database",
    tag = "Image",
    request_body = ListingQuery,
    responses(
        (status = 200, description = "一览图片", content_type = "image/png", body = Vec<u8>),
        (status = 400, description = "未选择等级，或结果超过上限")
    )
)]
#[post("/database")]
pub async fn database_image(
    http: HttpRequest,
    query: web::Json<ListingQuery>,
    listing_service: web::Data<ListingService>,
    image_service: web::Data<ImageService>,
    notifier: web::Data<UsageNotifier>,
) -> Result<HttpResponse, AppError> {
    let rows = listing_service.database(&query).await?;
    let png = image_service.database_image(&rows).await?;
    notify_database(&notifier, &http, &query);
    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}

/// 理论值排行
#[utoipa::path(
    get,
    path = "/ranking/{kind}",
    tag = "Listing",
    params(("kind" = RankingKind, Path, description = "ts1 或 ps")),
    responses((status = 200, description = "排行", body = Vec<RankingEntry>))
)]
#[get("/ranking/{kind}")]
pub async fn ranking(
    http: HttpRequest,
    kind: web::Path<RankingKind>,
    listing_service: web::Data<ListingService>,
    notifier: web::Data<UsageNotifier>,
) -> Result<HttpResponse, AppError> {
    let kind = kind.into_inner();
    let entries = listing_service.ranking(kind).await?;
    notify_ranking(&notifier, &http, kind);
    Ok(HttpResponse::Ok().json(entries))
}

#[utoipa::path(
    get,
    path = "/image/ranking/{kind}",
    tag = "Image",
    params(("kind" = RankingKind, Path, description = "ts1 或 ps")),
    responses((status = 200, description = "排行图片", content_type = "image/png", body = Vec<u8>))
)]
#[get("/ranking/{kind}")]
pub async fn ranking_image(
    http: HttpRequest,
    kind: web::Path<RankingKind>,
    listing_service: web::Data<ListingService>,
    image_service: web::Data<ImageService>,
    notifier: web::Data<UsageNotifier>,
) -> Result<HttpResponse, AppError> {
    let kind = kind.into_inner();
    let (generation, entries) = listing_service.ranking_with_generation(kind).await?;
    let png = image_service.ranking_image(kind, generation, entries).await?;
    notify_ranking(&notifier, &http, kind);
    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}
