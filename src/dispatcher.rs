//! 调用调度器
//!
//! 对一次账本调用进行分类（查询地址 / 读代码 / 部署 / 调用），
//! 为每笔交易构建新的账户缓存与事件收集器，驱动执行引擎，
//! 并按 执行 -> 发布事件 -> 同步账户 的顺序提交。
//!
//! 注意：事件发布先于账户同步。同步失败时已发布的事件不会撤回，
//! 需要由宿主账本的事务回滚来兜底。

use alloy_primitives::{Address, Bytes, U256};
use thiserror::Error;
use tracing::{debug, info};

use crate::address::{tx_nonce, AddressResolver, KeccakResolver, ResolveError};
use crate::config::BridgeConfig;
use crate::db::StateStore;
use crate::events::{EventChannel, EventCollector, EventError, FlushOutcome};
use crate::executor::{CallMessage, EngineError, ExecutionEngine};
use crate::schema::{EventContext, CONTRACT_PERMISSIONS};
use crate::state::{AccountCache, CacheError, VmState};

/// 查询调用者地址
pub const ACCOUNT_ARG: &str = "account";
/// 读取合约代码
pub const GET_CODE_ARG: &str = "getCode";

/// 调用调度时事件名取 input 参数的前缀长度（函数选择器的 hex 长度）
const SELECTOR_HEX_LEN: usize = 8;
/// 部署时事件名取合约地址的前缀字节数
const ADDRESS_PREFIX_LEN: usize = 4;
const ADDRESS_LEN: usize = 20;

/// 失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Arguments,
    Decode,
    Resolution,
    Cache,
    Engine,
    Flush,
    Sync,
}

/// 调度错误类型
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("expects 2 args, got {count} : {first}")]
    ArgumentCount { count: usize, first: String },

    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("failed to resolve caller address: {0}")]
    Resolution(#[from] ResolveError),

    #[error("account cache error: {0}")]
    Cache(CacheError),

    #[error("execution failed: {0}")]
    Engine(#[from] EngineError),

    #[error("contract deployment at {0} returned no runtime code")]
    NilBytecode(Address),

    #[error("failed to flush events: {0}")]
    Flush(#[from] EventError),

    #[error("failed to sync account cache: {0}")]
    Sync(CacheError),
}

impl InvokeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            InvokeError::ArgumentCount { .. } => FailureKind::Arguments,
            InvokeError::Decode { .. } => FailureKind::Decode,
            InvokeError::Resolution(_) => FailureKind::Resolution,
            InvokeError::Cache(_) => FailureKind::Cache,
            InvokeError::Engine(_) | InvokeError::NilBytecode(_) => FailureKind::Engine,
            InvokeError::Flush(_) => FailureKind::Flush,
            InvokeError::Sync(_) => FailureKind::Sync,
        }
    }
}

/// 账本交易上下文
pub trait TxContext {
    /// 有序的字节参数
    fn args(&self) -> &[Vec<u8>];

    /// 交易 ID
    fn tx_id(&self) -> &str;

    /// 调用者凭证
    fn caller_credential(&self) -> Result<Vec<u8>, ResolveError>;
}

/// 一次调用请求
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub args: Vec<Vec<u8>>,
    pub tx_id: String,
    pub creator: Option<Vec<u8>>,
}

impl Invocation {
    pub fn new<I, A>(args: I, tx_id: impl Into<String>, creator: impl Into<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            tx_id: tx_id.into(),
            creator: Some(creator.into()),
        }
    }
}

impl TxContext for Invocation {
    fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn caller_credential(&self) -> Result<Vec<u8>, ResolveError> {
        self.creator
            .clone()
            .ok_or_else(|| ResolveError::Credential("transaction carries no creator".to_string()))
    }
}

/// EVM 桥接调度器
pub struct EvmBridge<E, R = KeccakResolver> {
    engine: E,
    resolver: R,
    config: BridgeConfig,
}

impl<E: ExecutionEngine> EvmBridge<E, KeccakResolver> {
    pub fn new(engine: E, config: BridgeConfig) -> Self {
        Self::with_resolver(engine, KeccakResolver, config)
    }
}

impl<E: ExecutionEngine, R: AddressResolver> EvmBridge<E, R> {
    pub fn with_resolver(engine: E, resolver: R, config: BridgeConfig) -> Self {
        Self { engine, resolver, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// 处理一次调用
    ///
    /// 仅在执行、事件发布、账户同步全部成功时返回 Ok；
    /// 执行失败时通道与存储都不会观察到任何写入
    pub fn invoke<T, S, C>(&self, ctx: &T, store: S, channel: &mut C) -> Result<Vec<u8>, InvokeError>
    where
        T: TxContext + ?Sized,
        S: StateStore,
        C: EventChannel + ?Sized,
    {
        let args = ctx.args();

        if args.len() == 1 && args[0] == ACCOUNT_ARG.as_bytes() {
            let caller = self.resolve_caller(ctx)?;
            return Ok(hex::encode(caller).into_bytes());
        }

        if args.len() != 2 && args.len() != 3 {
            return Err(InvokeError::ArgumentCount {
                count: args.len(),
                first: args.first().map(|a| String::from_utf8_lossy(a).into_owned()).unwrap_or_default(),
            });
        }

        if args[0] == GET_CODE_ARG.as_bytes() {
            return self.get_code(&args[1], store);
        }

        let context = if args.len() == 3 {
            parse_context(&args[2])
        } else {
            EventContext::new()
        };

        let callee = decode_address(&args[0])?;
        let caller = self.resolve_caller(ctx)?;
        let input = decode_hex("input", &args[1])?;

        let cache = AccountCache::new(store);
        let collector = EventCollector::with_context(context);

        if callee == Address::ZERO {
            self.deploy(ctx.tx_id(), caller, input, cache, collector, channel)
        } else {
            // 事件名直接使用原始 input 参数的前缀
            let prefix = &args[1][..args[1].len().min(SELECTOR_HEX_LEN)];
            let event_name = String::from_utf8_lossy(prefix).into_owned();
            self.call(caller, callee, input, &event_name, cache, collector, channel)
        }
    }

    fn resolve_caller<T: TxContext + ?Sized>(&self, ctx: &T) -> Result<Address, InvokeError> {
        let credential = ctx.caller_credential()?;
        Ok(self.resolver.identity_to_address(&credential)?)
    }

    /// 只读：返回代码的小写 hex，账户不存在时返回空
    fn get_code<S: StateStore>(&self, arg: &[u8], store: S) -> Result<Vec<u8>, InvokeError> {
        let address = decode_address(arg)?;
        let mut cache = AccountCache::new(store);
        let code = cache.get_code(&address).map_err(InvokeError::Cache)?;
        Ok(hex::encode(code).into_bytes())
    }

    fn deploy<S, C>(
        &self,
        tx_id: &str,
        caller: Address,
        input: Bytes,
        mut cache: AccountCache<S>,
        mut collector: EventCollector,
        channel: &mut C,
    ) -> Result<Vec<u8>, InvokeError>
    where
        S: StateStore,
        C: EventChannel + ?Sized,
    {
        let nonce = tx_nonce(&caller, tx_id);
        let contract = self.resolver.new_contract_address(&caller, &nonce);
        info!("Deploying contract {} from {}", contract, caller);

        cache.create_account(&contract).map_err(InvokeError::Cache)?;
        cache
            .set_permission(&contract, CONTRACT_PERMISSIONS, true)
            .map_err(InvokeError::Cache)?;

        let msg = CallMessage {
            caller,
            callee: contract,
            code: input.clone(),
            input,
            value: U256::ZERO,
            gas_limit: self.config.gas_limit,
        };
        let runtime = self
            .engine
            .call(&mut cache, &mut collector, msg)?
            .ok_or(InvokeError::NilBytecode(contract))?;

        cache.init_code(&contract, runtime).map_err(InvokeError::Cache)?;

        let event_name = hex::encode(&contract[..ADDRESS_PREFIX_LEN]);
        self.commit(&event_name, cache, collector, channel)?;

        Ok(hex::encode(contract).into_bytes())
    }

    #[allow(clippy::too_many_arguments)]
    fn call<S, C>(
        &self,
        caller: Address,
        callee: Address,
        input: Bytes,
        event_name: &str,
        mut cache: AccountCache<S>,
        mut collector: EventCollector,
        channel: &mut C,
    ) -> Result<Vec<u8>, InvokeError>
    where
        S: StateStore,
        C: EventChannel + ?Sized,
    {
        let code = cache.get_code(&callee).map_err(InvokeError::Cache)?;
        debug!("Calling {} ({} bytes of code) from {}", callee, code.len(), caller);

        let msg = CallMessage {
            caller,
            callee,
            code,
            input,
            value: U256::ZERO,
            gas_limit: self.config.gas_limit,
        };
        let output = self.engine.call(&mut cache, &mut collector, msg)?;

        self.commit(event_name, cache, collector, channel)?;

        Ok(output.map(Vec::from).unwrap_or_default())
    }

    /// 发布事件，然后同步账户
    fn commit<S, C>(
        &self,
        event_name: &str,
        cache: AccountCache<S>,
        collector: EventCollector,
        channel: &mut C,
    ) -> Result<(), InvokeError>
    where
        S: StateStore,
        C: EventChannel + ?Sized,
    {
        match collector.flush(event_name, channel)? {
            FlushOutcome::Empty => {}
            FlushOutcome::Emitted { name, records } => {
                debug!("Emitted event {} with {} records", name, records);
            }
        }

        let report = cache.sync().map_err(InvokeError::Sync)?;
        debug!(accounts = report.accounts, slots = report.slots, "transaction committed");
        Ok(())
    }
}

/// 解析调用上下文；格式错误时记录日志并使用空上下文
fn parse_context(raw: &[u8]) -> EventContext {
    match serde_json::from_slice::<EventContext>(raw) {
        Ok(context) => context,
        Err(e) => {
            info!("Failed to parse invocation context, ignoring it: {}", e);
            EventContext::new()
        }
    }
}

fn decode_hex(what: &'static str, raw: &[u8]) -> Result<Bytes, InvokeError> {
    hex::decode(raw)
        .map(Bytes::from)
        .map_err(|e| InvokeError::Decode { what, reason: e.to_string() })
}

/// 解析 hex 地址（大小写均可）
fn decode_address(raw: &[u8]) -> Result<Address, InvokeError> {
    let bytes = decode_hex("address", raw)?;
    if bytes.len() != ADDRESS_LEN {
        return Err(InvokeError::Decode {
            what: "address",
            reason: format!("expected 20 bytes, got {}", bytes.len()),
        });
    }
    Ok(Address::from_slice(&bytes))
}
