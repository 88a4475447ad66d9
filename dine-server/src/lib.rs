//! Dine Server - 餐厅点餐与支付工作流服务
//!
//! # 架构概述
//!
//! 本模块是 Dine Server 的主入口，提供以下核心功能：
//!
//! - **订单生命周期** (`orders`): 状态机驱动的订单流转，CAS 单订单串行化
//! - **支付对账** (`payments`): 网关回调验签、金额核对、幂等结算
//! - **事件扇出** (`fanout`): 主题订阅 + TCP 实时推送
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//! - **认证** (`auth`): JWT 员工身份校验
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! dine-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 校验、请求上下文
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层
//! ├── orders/        # 订单状态机
//! ├── payments/      # 网关客户端 + 对账
//! ├── fanout/        # 事件扇出 + 实时推送
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod fanout;
pub mod orders;
pub mod payments;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState, setup_environment};
pub use fanout::{FanoutHub, FeedServer};
pub use orders::OrderService;
pub use payments::{GatewayClient, PaymentReconciler};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ____  _
   / __ \(_)___  ___
  / / / / / __ \/ _ \
 / /_/ / / / / /  __/
/_____/_/_/ /_/\___/
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
