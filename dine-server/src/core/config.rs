use crate::auth::JwtConfig;
use crate::payments::GatewayConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/dine | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | FEED_PORT | 8081 | 实时推送 TCP 端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | JWT_SECRET | (dev secret) | 员工令牌共享密钥 |
/// | VNP_TMN_CODE | DINEDEMO | 网关商户号 |
/// | VNP_HASH_SECRET | (dev secret) | 网关 HMAC 密钥 |
/// | VNP_PAY_URL | (sandbox) | 网关收银台地址 |
/// | VNP_RETURN_URL | (localhost) | 本服务回调地址 |
/// | PAY_LANDING_SUCCESS | (localhost) | 支付成功落地页 |
/// | PAY_LANDING_FAILURE | (localhost) | 支付失败落地页 |
/// | PAY_LANDING_ERROR | (localhost) | 支付异常落地页 |
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 实时推送 TCP 端口
    pub feed_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 支付网关配置
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let gateway_defaults = GatewayConfig::default();
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/dine".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            feed_port: std::env::var("FEED_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8081),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            jwt: JwtConfig::default(),
            gateway: GatewayConfig {
                tmn_code: std::env::var("VNP_TMN_CODE")
                    .unwrap_or(gateway_defaults.tmn_code),
                hash_secret: std::env::var("VNP_HASH_SECRET")
                    .unwrap_or(gateway_defaults.hash_secret),
                pay_url: std::env::var("VNP_PAY_URL").unwrap_or(gateway_defaults.pay_url),
                return_url: std::env::var("VNP_RETURN_URL")
                    .unwrap_or(gateway_defaults.return_url),
                landing_success: std::env::var("PAY_LANDING_SUCCESS")
                    .unwrap_or(gateway_defaults.landing_success),
                landing_failure: std::env::var("PAY_LANDING_FAILURE")
                    .unwrap_or(gateway_defaults.landing_failure),
                landing_error: std::env::var("PAY_LANDING_ERROR")
                    .unwrap_or(gateway_defaults.landing_error),
            },
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// 设置运行环境 (dotenv, 工作目录, 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    // .env 不存在时静默忽略
    let _ = dotenv::dotenv();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/dine".into());
    std::fs::create_dir_all(format!("{work_dir}/database"))?;
    std::fs::create_dir_all(format!("{work_dir}/logs"))?;

    crate::utils::logger::init_logger_with_file(None, Some(&format!("{work_dir}/logs")));
    Ok(())
}
