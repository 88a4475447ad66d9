use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db;
use crate::fanout::FanoutHub;
use crate::orders::OrderService;
use crate::payments::{GatewayClient, PaymentReconciler};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | hub | Arc<FanoutHub> | 事件扇出中心 |
/// | jwt_service | Arc<JwtService> | JWT 校验服务 |
/// | gateway | Arc<GatewayClient> | 支付网关客户端 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 事件扇出中心
    pub hub: Arc<FanoutHub>,
    /// JWT 校验服务
    pub jwt_service: Arc<JwtService>,
    /// 支付网关客户端
    pub gateway: Arc<GatewayClient>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic —— 没有存储就没有可运行的服务
    pub async fn initialize(config: &Config) -> Self {
        let db = db::connect(&config.work_dir)
            .await
            .expect("Failed to initialize database");

        Self {
            config: config.clone(),
            db,
            hub: Arc::new(FanoutHub::new()),
            jwt_service: Arc::new(JwtService::new(&config.jwt)),
            gateway: Arc::new(GatewayClient::new(config.gateway.clone())),
        }
    }

    /// 订单服务（浅拷贝构造）
    pub fn order_service(&self) -> OrderService {
        OrderService::new(self.db.clone(), self.hub.clone())
    }

    /// 支付对账服务（浅拷贝构造）
    pub fn reconciler(&self) -> PaymentReconciler {
        PaymentReconciler::new(self.db.clone(), self.order_service(), self.gateway.clone())
    }
}
