use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use env_logger::Env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api_doc;
mod config;
mod controllers;
mod models;
mod routes;
mod services;
mod utils;

use api_doc::ApiDoc;
use config::CONFIG;
use services::profile::build_http_client;
use services::{
    CatalogService, ImageService, ListingService, PreferenceStore, ProfileService,
    RecommendService, UsageLogService, UsageNotifier,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 加载.env文件
    dotenv().ok();

    // 初始化日志
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = CONFIG.clone();
    log::info!("谱面数据来源: {}", config.catalog_source);
    log::info!("玩家页面: {}", config.profile_base_url);

    let client = build_http_client(&config).context("创建 HTTP 客户端失败")?;

    let catalog = Arc::new(CatalogService::from_config(&config, client.clone()));
    let profile = Arc::new(
        ProfileService::new(client, config.profile_base_url.clone())
            .context("初始化玩家页面解析器失败")?,
    );
    let usage_log = Arc::new(UsageLogService::new(&config.usage_log_path));

    // 预热谱面缓存，失败不影响启动，首个请求会再试
    match catalog.load().await {
        Ok(records) => log::info!("谱面数据预加载完成: {} 条", records.len()),
        Err(e) => log::warn!("谱面数据预加载失败: {e}"),
    }

    let recommend_service = web::Data::new(RecommendService::new(catalog.clone(), profile.clone()));
    let listing_service = web::Data::new(ListingService::new(catalog));
    let profile_service = web::Data::from(profile);
    let notifier = web::Data::new(UsageNotifier::new(usage_log.clone()));
    let usage_log_service = web::Data::from(usage_log);
    let image_service = web::Data::new(ImageService::new(
        Path::new(&config.fonts_dir),
        config.max_concurrent_renders,
        Duration::from_secs(config.catalog_cache_ttl_secs),
    ));
    let preference_store = web::Data::new(PreferenceStore::new(&config.preferences_path));

    let openapi = ApiDoc::openapi();

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    // 创建并启动HTTP服务器
    HttpServer::new(move || {
        // 配置CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(recommend_service.clone())
            .app_data(listing_service.clone())
            .app_data(profile_service.clone())
            .app_data(notifier.clone())
            .app_data(usage_log_service.clone())
            .app_data(image_service.clone())
            .app_data(preference_store.clone())
            .app_data(controllers::json_config())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
            .configure(routes::configure)
    })
    .bind((config.host.clone(), config.port))
    .with_context(|| format!("无法绑定 {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
