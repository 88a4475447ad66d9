//! Payment API Module
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/payments/initiate | POST | 发起网关支付 | 无 |
//! | /api/payments/callback | GET/POST | 网关浏览器回调（重定向） | 签名 |
//! | /api/payments/status/{order_id} | GET | 支付状态轮询 | 无 |
//!
//! 回调路径永远以浏览器重定向收尾，不返回 JSON —— 顾客的浏览器没有
//! 其他恢复手段。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Payment router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/initiate", post(handler::initiate))
        // Gateways redirect with GET or POST depending on integration
        .route(
            "/callback",
            get(handler::callback_get).post(handler::callback_post),
        )
        .route("/status/{order_id}", get(handler::status))
}
