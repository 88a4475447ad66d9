//! Database Module
//!
//! 嵌入式 SurrealDB 存储：RocksDB 后端（生产），内存引擎（测试）。
//! 启动时定义唯一索引 —— `payment.txn_ref` 的 UNIQUE 索引是回调幂等
//! 处理的持久化保障。

pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "dine";
const DATABASE: &str = "core";

/// Open the embedded database under `{work_dir}/database/dine.db`
pub async fn connect(work_dir: &str) -> Result<Surreal<Db>, AppError> {
    let path = format!("{work_dir}/database/dine.db");
    let db = Surreal::new::<RocksDb>(path.as_str())
        .await
        .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

    db.use_ns(NAMESPACE)
        .use_db(DATABASE)
        .await
        .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

    define_schema(&db).await?;
    tracing::info!(path = %path, "Database connection established (SurrealDB/RocksDB)");
    Ok(db)
}

/// Open an in-memory database (unit tests)
#[cfg(test)]
pub async fn connect_memory() -> Result<Surreal<Db>, AppError> {
    use surrealdb::engine::local::Mem;

    let db = Surreal::new::<Mem>(())
        .await
        .map_err(|e| AppError::database(format!("Failed to open memory database: {e}")))?;
    db.use_ns(NAMESPACE)
        .use_db(DATABASE)
        .await
        .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;
    define_schema(&db).await?;
    Ok(db)
}

/// Define indexes
///
/// 业务 id 即记录键（`orders:<i64>`），唯一性由记录本身保证；
/// 这里只补充二级查询路径：
/// - `payment.txn_ref` UNIQUE：回调幂等的持久化保障
/// - `order_detail.order_id` / `payment.order_id`：按订单取行项目与支付
async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        r#"
        DEFINE INDEX IF NOT EXISTS idx_order_detail_order ON TABLE order_detail COLUMNS order_id;
        DEFINE INDEX IF NOT EXISTS idx_payment_txn_ref ON TABLE payment COLUMNS txn_ref UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_payment_order ON TABLE payment COLUMNS order_id;
        "#,
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?
    .check()
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;
    Ok(())
}
