use actix_web::web;

use crate::controllers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // 状态
        .service(controllers::health_check)       // GET /health
        // 上游代理与利用ログ
        .service(controllers::scorelog::scorelog) // GET /api/scorelog
        .service(controllers::insert_log_resource()) // POST /api/insertLog
        // 推荐曲
        .service(controllers::recommend::recommend) // POST /recommend
        // 一览与排行
        .service(controllers::database)           // POST /database
        .service(controllers::ranking)            // GET /ranking/{kind}
        // 用户设置
        .service(controllers::issue_user_id)      // POST /user-id
        .service(controllers::get_preferences)    // GET /preferences/{user_id}
        .service(controllers::put_preferences);   // PUT /preferences/{user_id}

    // 图片路由
    cfg.service(
        web::scope("/image")
            .service(controllers::recommend::recommend_image) // POST /image/recommend
            .service(controllers::database_image)   // POST /image/database
            .service(controllers::ranking_image),   // GET /image/ranking/{kind}
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn every_route_is_registered() {
        let app = test::init_service(App::new().configure(configure)).await;
        let routes = [
            test::TestRequest::get().uri("/health"),
            test::TestRequest::get().uri("/api/scorelog?id=1"),
            test::TestRequest::post().uri("/api/insertLog"),
            test::TestRequest::post().uri("/recommend"),
            test::TestRequest::post().uri("/database"),
            test::TestRequest::get().uri("/ranking/ps"),
            test::TestRequest::post().uri("/user-id"),
            test::TestRequest::get().uri("/preferences/u"),
            test::TestRequest::put().uri("/preferences/u"),
            test::TestRequest::post().uri("/image/recommend"),
            test::TestRequest::post().uri("/image/database"),
            test::TestRequest::get().uri("/image/ranking/ts1"),
        ];
        for req in routes {
            let req = req.to_request();
            let path = req.path().to_string();
            let resp = test::call_service(&app, req).await;
            // 没有注入服务时会是 4xx/5xx，但不能是 404
            assert_ne!(resp.status().as_u16(), 404, "{path}");
        }
    }
}
