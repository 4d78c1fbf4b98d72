use anyhow::{Context, Result};
use clap::Parser;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use evm_bridge::db::{RedbLedger, StoredEvent};
use evm_bridge::events::MemoryEventChannel;
use evm_bridge::{BridgeConfig, EvmBridge, Invocation, RevmEngine};

/// EVM 桥接命令行
///
/// 在本地 redb 账本上执行一次调用：
///   evm-bridge --creator Org1MSP:user1 account
///   evm-bridge --creator Org1MSP:user1 0000000000000000000000000000000000000000 <init code>
///   evm-bridge --creator Org1MSP:user1 <contract> <input> ['{"k":"v"}']
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 账本数据库路径
    #[arg(long, default_value = "./data/evm-ledger.redb")]
    db: String,

    /// 调用者凭证
    #[arg(long)]
    creator: String,

    /// 交易 ID（默认按当前时间生成）
    #[arg(long)]
    tx_id: Option<String>,

    /// 每次执行的 gas 上限
    #[arg(long, default_value_t = evm_bridge::config::DEFAULT_GAS_LIMIT)]
    gas_limit: u64,

    /// 调用参数
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn generate_tx_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("tx-{:x}", nanos)
}

fn main() -> Result<()> {
    // 初始化日志
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let tx_id = args.tx_id.clone().unwrap_or_else(generate_tx_id);

    let config = BridgeConfig::default().with_gas_limit(args.gas_limit);
    let bridge = EvmBridge::new(RevmEngine::new(config.spec_id), config);

    let mut ledger = RedbLedger::open(&args.db)
        .with_context(|| format!("failed to open ledger at {}", args.db))?;
    info!("📂 Ledger opened: {}", args.db);

    let invocation = Invocation::new(args.args.iter().map(String::as_str), tx_id.as_str(), args.creator.as_bytes());
    let mut channel = MemoryEventChannel::new();

    ledger.begin_transaction()?;
    let payload = match bridge.invoke(&invocation, &mut ledger, &mut channel) {
        Ok(payload) => {
            ledger.commit_transaction()?;
            payload
        }
        Err(e) => {
            ledger.rollback_transaction()?;
            error!("❌ Transaction {} failed ({:?}): {}", tx_id, e.kind(), e);
            return Err(e.into());
        }
    };

    for event in channel.take() {
        println!("event {}: {}", event.name, String::from_utf8_lossy(&event.payload));
        ledger.save_event(&tx_id, &StoredEvent { name: event.name, payload: event.payload })?;
    }

    info!("✅ Transaction {} committed", tx_id);
    println!("{}", String::from_utf8_lossy(&payload));

    Ok(())
}
