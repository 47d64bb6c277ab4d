use actix_web::{get, HttpResponse, Responder};

/// 健康检查
///
/// 只表示进程能响应请求，不检查谱面数据和上游页面。
#[utoipa::path(
    get,
    path = "/health",
    tag = "Status",
    responses(
        (status = 200, description = "服务正常", body = String, example = json!("OK"))
    )
)]
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain; charset=utf-8").body("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn health_returns_ok() {
        let app = test::init_service(App::new().service(health_check)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
        assert_eq!(test::read_body(resp).await, "OK");
    }
}
