use actix_web::{post, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::controllers::user_agent;
use crate::models::chart::StarTier;
use crate::models::recommend::{RecommendRequest, RecommendResponse};
use crate::models::usage_log::UsageLogEntry;
use crate::services::image_service::ImageService;
use crate::services::recommend::RecommendService;
use crate::services::usage_log::UsageNotifier;
use crate::utils::error::AppError;

const LOG_ACTION: &str = "Pスコア枠おすすめ曲選出";

fn log_option(request: &RecommendRequest) -> String {
    json!({
        "tier": request.tier,
        "count": request.count,
        "exclude_technical": request.exclude_technical,
        "band_floor": request.band_floor,
        "exclude_lowest": request.exclude_lowest,
    })
    .to_string()
}

fn notify(notifier: &UsageNotifier, http: &HttpRequest, request: &RecommendRequest) {
    notifier.notify(
        UsageLogEntry::new(LOG_ACTION)
            .with_user_agent(user_agent(http))
            .with_user_id(request.user_id.clone())
            .with_option(Some(log_option(request))),
    );
}

/// P 分数枠推荐曲选出
///
/// 未指定 tier 时对 ☆5 / ☆4 / ☆3 分别选出。
#[utoipa::path(
    post,
    path = "/recommend",
    tag = "Recommend",
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "选出结果", body = RecommendResponse),
        (status = 400, description = "输入不合法"),
        (status = 502, description = "玩家数据获取失败")
    )
)]
#[post("/recommend")]
pub async fn recommend(
    http: HttpRequest,
    body: web::Json<RecommendRequest>,
    recommend_service: web::Data<RecommendService>,
    notifier: web::Data<UsageNotifier>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let response = recommend_service.recommend(&request).await?;
    notify(&notifier, &http, &request);
    Ok(HttpResponse::Ok().json(response))
}

/// 推荐曲表格图片，只画一个星级（默认 ☆5）
#[utoipa::path(
    post,
    path = "/image/recommend",
    tag = "Image",
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "表格图片", content_type = "image/png", body = Vec<u8>),
        (status = 400, description = "输入不合法"),
        (status = 502, description = "玩家数据获取失败")
    )
)]
#[post("/recommend")]
pub async fn recommend_image(
    http: HttpRequest,
    body: web::Json<RecommendRequest>,
    recommend_service: web::Data<RecommendService>,
    image_service: web::Data<ImageService>,
    notifier: web::Data<UsageNotifier>,
) -> Result<HttpResponse, AppError> {
    let mut request = body.into_inner();
    let tier_value = *request.tier.get_or_insert(StarTier::Five.value());
    let tier = StarTier::try_from(tier_value).map_err(AppError::ValidationError)?;

    let response = recommend_service.recommend(&request).await?;
    let png = image_service.recommend_image(&response, tier).await?;
    notify(&notifier, &http, &request);

    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::CatalogService;
    use crate::services::profile::ProfileService;
    use crate::services::usage_log::UsageLogService;
    use actix_web::{test, App};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body><span class="player-name">P</span>
        <table><tr><th>レーティング</th><td>15.0</td></tr></table>
        <table class="platinum-score"><tbody>
          <tr><td>1</td><td>X</td><td>MAS</td><td>14</td><td>☆5</td><td>1.6</td></tr>
          <tr><td>2</td><td>Y</td><td>MAS</td><td>14</td><td></td><td>1.0</td></tr>
        </tbody></table></body></html>"#;

    const CATALOG: &str = r#"[{"musicName": "A", "difficulty": "MASTER", "level": "14", "ps5Rating": 1.5, "ps5TotalCount": 3}]"#;

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/42/rating"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CATALOG))
            .mount(&server)
            .await;
        server
    }

    fn services(server: &MockServer, log_dir: &Path) -> (RecommendService, ImageService, UsageNotifier) {
        let client = reqwest::Client::new();
        let catalog = Arc::new(CatalogService::new(
            format!("{}/data.json", server.uri()),
            Duration::from_secs(60),
            client.clone(),
        ));
        let profile = Arc::new(ProfileService::new(client, server.uri()).unwrap());
        let notifier = UsageNotifier::new(Arc::new(UsageLogService::new(log_dir.join("usage.csv"))));
        (
            RecommendService::new(catalog, profile),
            ImageService::new(Path::new("/nonexistent-fonts"), 1, Duration::from_secs(60)),
            notifier,
        )
    }

    #[actix_web::test]
    async fn json_endpoint_returns_tiers() {
        let server = server().await;
        let dir = tempfile::tempdir().unwrap();
        let (rec, img, notifier) = services(&server, dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(rec))
                .app_data(web::Data::new(img))
                .app_data(web::Data::new(notifier))
                .service(recommend),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(json!({"player_id": "42", "count": "5"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tiers"].as_array().unwrap().len(), 3);
        assert_eq!(body["tiers"][0]["tier"], 5);
        assert_eq!(body["tiers"][0]["entries"][0]["expected_rise_text"], "+0.002");
        assert_eq!(body["band"]["min"], 1.0);
    }

    #[actix_web::test]
    async fn bad_count_is_bad_request() {
        let server = server().await;
        let dir = tempfile::tempdir().unwrap();
        let (rec, _, notifier) = services(&server, dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(rec))
                .app_data(web::Data::new(notifier))
                .service(recommend),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(json!({"player_id": "42", "count": 0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn malformed_body_gets_json_error() {
        let server = server().await;
        let dir = tempfile::tempdir().unwrap();
        let (rec, _, notifier) = services(&server, dir.path());
        let app = test::init_service(
            App::new()
                .app_data(crate::controllers::json_config())
                .app_data(web::Data::new(rec))
                .app_data(web::Data::new(notifier))
                .service(recommend),
        )
        .await;

        for body in [
            json!({"player_id": 42}),
            json!({"player_id": "42", "tier": "5"}),
            json!({"player_id": "42", "exclude_lowest": -1}),
        ] {
            let req = test::TestRequest::post().uri("/recommend").set_json(&body).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status().as_u16(), 400, "{body}");
            let err: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(err["error"], "validation_error");
            assert!(err["message"].is_string());
        }
    }

    #[actix_web::test]
    async fn image_endpoint_returns_png() {
        let server = server().await;
        let dir = tempfile::tempdir().unwrap();
        let (rec, img, notifier) = services(&server, dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(rec))
                .app_data(web::Data::new(img))
                .app_data(web::Data::new(notifier))
                .service(web::scope("/image").service(recommend_image)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/image/recommend")
            .set_json(json!({"player_id": "42"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
        let body = test::read_body(resp).await;
        assert_eq!(&body[..4], b"\x89PNG");
    }
}
