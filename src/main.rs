// ==========================================
// 石材车间加工系统 - 命令行入口
// ==========================================
// 子命令:
//   init                 初始化数据库与默认工艺
//   processes [--all]    列出工艺
//   orders [state]       列出加工单（可按状态过滤）
//   history <order_id>   加工单操作记录
//   stats                看板统计
//   lots <product_id>    产品在内部库位的可用批次
// 输出: JSON
// ==========================================

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use stone_workshop::app::{get_default_db_path, AppState};
use stone_workshop::OrderState;

#[derive(Parser)]
#[command(name = "stone-workshop")]
#[command(about = "石材车间加工单与库存移动", long_about = None)]
struct Cli {
    /// 数据库路径（默认取 STONE_WORKSHOP_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化数据库结构、默认工艺与加工单序列
    Init,

    /// 列出工艺
    Processes {
        /// 包含已归档工艺
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// 列出加工单
    Orders {
        /// draft | confirmed | in_progress | done | cancel
        state: Option<String>,
    },

    /// 加工单操作记录
    History { order_id: i64 },

    /// 看板统计（不含已取消）
    Stats,

    /// 产品在内部库位的可用批次
    Lots { product_id: i64 },
}

fn run(cli: Cli) -> Result<Value> {
    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let value = match cli.cmd {
        Commands::Init => serde_json::json!({
            "db_path": state.db_path,
            "config": state.config,
        }),
        Commands::Processes { all } => serde_json::to_value(state.process_api.list_processes(!all)?)?,
        Commands::Orders { state: filter } => {
            let filter = filter
                .map(|raw| OrderState::parse(&raw).ok_or_else(|| anyhow!("未知的加工单状态: {}", raw)))
                .transpose()?;
            serde_json::to_value(state.order_api.list_orders(filter)?)?
        }
        Commands::History { order_id } => serde_json::to_value(
            state
                .order_api
                .order_history(order_id)
                .with_context(|| format!("读取加工单 {} 的操作记录失败", order_id))?,
        )?,
        Commands::Stats => serde_json::to_value(state.order_api.order_stats()?)?,
        Commands::Lots { product_id } => serde_json::to_value(state.order_api.available_lots(product_id)?)?,
    };
    Ok(value)
}

fn main() -> Result<()> {
    stone_workshop::logging::init_from_env();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", stone_workshop::APP_NAME, stone_workshop::VERSION);
    tracing::info!("==================================================");

    let cli = Cli::parse();
    let value = run(cli)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_state_is_optional() {
        let cli = Cli::try_parse_from(["stone-workshop", "orders"]).unwrap();
        assert!(matches!(cli.cmd, Commands::Orders { state: None }));

        let cli = Cli::try_parse_from(["stone-workshop", "orders", "in_progress"]).unwrap();
        assert!(matches!(cli.cmd, Commands::Orders { state: Some(ref s) } if s == "in_progress"));
    }

    #[test]
    fn test_history_requires_numeric_order_id() {
        let cli = Cli::try_parse_from(["stone-workshop", "history", "42"]).unwrap();
        assert!(matches!(cli.cmd, Commands::History { order_id: 42 }));

        assert!(Cli::try_parse_from(["stone-workshop", "history"]).is_err());
        assert!(Cli::try_parse_from(["stone-workshop", "history", "WS/00001"]).is_err());
    }

    #[test]
    fn test_global_db_flag_and_processes_all() {
        let cli = Cli::try_parse_from(["stone-workshop", "processes", "--all", "--db", "/tmp/ws.db"]).unwrap();
        assert_eq!(cli.db.as_deref(), Some("/tmp/ws.db"));
        assert!(matches!(cli.cmd, Commands::Processes { all: true }));
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ws.db").to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["stone-workshop", "--db", &db, "orders", "archived"]).unwrap();
        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("archived"));
    }
}
