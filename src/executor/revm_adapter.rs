//! REVM 执行引擎适配器
//!
//! 将交易级账户缓存适配为 REVM 的 Database trait，执行消息调用后
//! 把状态变更写回缓存、把日志交给事件收集器

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use revm::{
    primitives::{
        Account as RevmAccount, AccountInfo, Bytecode, EVMError,
        ExecutionResult as RevmExecutionResult, Output, SpecId, SuccessReason, TransactTo,
        TxEnv,
    },
    Database, Evm,
};
use std::collections::HashMap;
use tracing::debug;

use crate::events::LogSink;
use crate::executor::{CallMessage, EngineError, ExecutionEngine};
use crate::schema::{CONTRACT_PERMISSIONS, EMPTY_CODE_HASH};
use crate::state::{CacheError, VmState};

/// 账户缓存的 REVM 视图
///
/// 对 callee 地址返回调用方指定的代码：部署时构造代码在预先创建的
/// 合约账户上执行，而不是走 REVM 自己的 CREATE 地址规则
///
/// 调用者的序号不随交易递增：REVM 为每笔交易给 caller 加的 nonce 在写回时忽略
pub struct StateView<'a> {
    state: &'a mut dyn VmState,
    caller: Address,
    /// 执行前 caller 的 nonce
    caller_nonce: u64,
    callee: Address,
    callee_code: Bytes,
    /// 已交给 REVM 的字节码（按哈希索引）
    codes: HashMap<B256, Bytecode>,
}

impl<'a> StateView<'a> {
    pub fn new(
        state: &'a mut dyn VmState,
        caller: Address,
        callee: Address,
        callee_code: Bytes,
    ) -> Result<Self, CacheError> {
        let caller_nonce = state.get_nonce(&caller)?;
        Ok(Self {
            state,
            caller,
            caller_nonce,
            callee,
            callee_code,
            codes: HashMap::new(),
        })
    }

    /// 将 REVM 的状态变更写回账户缓存
    fn commit<I>(&mut self, changes: I) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = (Address, RevmAccount)>,
    {
        for (address, account) in changes {
            if !account.is_touched() {
                continue;
            }

            if account.is_selfdestructed() {
                if self.state.account_exists(&address)? {
                    self.state.remove_account(&address)?;
                }
                continue;
            }

            let info = &account.info;
            let nonce = if address == self.caller { self.caller_nonce } else { info.nonce };

            if !self.state.account_exists(&address)? {
                // 被触碰但仍为空的账户不落盘；callee 的代码来自覆盖，不计入
                let no_code = address == self.callee || info.code_hash == EMPTY_CODE_HASH;
                let empty = info.balance.is_zero() && nonce == 0 && no_code;
                if empty && !account.is_created() {
                    continue;
                }
                self.state.create_account(&address)?;
            }

            if self.state.get_balance(&address)? != info.balance {
                self.state.set_balance(&address, info.balance)?;
            }
            if self.state.get_nonce(&address)? != nonce {
                self.state.set_nonce(&address, nonce)?;
            }

            // 嵌套 CREATE 创建的合约
            if account.is_created() {
                if let Some(ref code) = info.code {
                    self.state.init_code(&address, code.original_bytes())?;
                }
                self.state.set_permission(&address, CONTRACT_PERMISSIONS, true)?;
            }

            for (slot, value) in &account.storage {
                if value.is_changed() {
                    self.state.set_storage(&address, *slot, value.present_value())?;
                }
            }
        }
        Ok(())
    }
}

impl Database for StateView<'_> {
    type Error = CacheError;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        let is_callee = address == self.callee;
        let (balance, nonce, code) = match self.state.get_account(&address)? {
            Some(acc) if is_callee => (acc.balance, acc.nonce, self.callee_code.clone()),
            Some(acc) => (acc.balance, acc.nonce, acc.code),
            None if is_callee && !self.callee_code.is_empty() => {
                (U256::ZERO, 0, self.callee_code.clone())
            }
            None => return Ok(None),
        };

        let code_hash = keccak256(&code);
        let bytecode = Bytecode::new_raw(code);
        self.codes.insert(code_hash, bytecode.clone());

        Ok(Some(AccountInfo {
            balance,
            nonce,
            code_hash,
            code: Some(bytecode),
        }))
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytecode, Self::Error> {
        if code_hash == EMPTY_CODE_HASH {
            return Ok(Bytecode::new());
        }
        Ok(self.codes.get(&code_hash).cloned().unwrap_or_else(Bytecode::new))
    }

    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
        self.state.get_storage(&address, index)
    }

    fn block_hash(&mut self, number: u64) -> Result<B256, Self::Error> {
        Err(CacheError::BlockHashUnsupported(number))
    }
}

/// 基于 REVM 的执行引擎
#[derive(Debug, Clone, Copy)]
pub struct RevmEngine {
    spec_id: SpecId,
}

impl RevmEngine {
    pub fn new(spec_id: SpecId) -> Self {
        Self { spec_id }
    }

    pub fn spec_id(&self) -> SpecId {
        self.spec_id
    }
}

impl Default for RevmEngine {
    /// 使用 Shanghai 规范（在 EIP-3607 之前的行为）
    fn default() -> Self {
        Self::new(SpecId::SHANGHAI)
    }
}

impl ExecutionEngine for RevmEngine {
    fn call(
        &self,
        state: &mut dyn VmState,
        sink: &mut dyn LogSink,
        msg: CallMessage,
    ) -> Result<Option<Bytes>, EngineError> {
        let mut view = StateView::new(state, msg.caller, msg.callee, msg.code)?;

        let mut tx_env = TxEnv::default();
        tx_env.caller = msg.caller;
        tx_env.transact_to = TransactTo::Call(msg.callee);
        tx_env.data = msg.input;
        tx_env.value = msg.value;
        tx_env.gas_limit = msg.gas_limit;
        tx_env.gas_price = U256::ZERO;
        tx_env.nonce = None;

        let outcome = {
            let mut evm = Evm::builder()
                .with_db(&mut view)
                .with_spec_id(self.spec_id)
                .build();
            evm.context.evm.env.tx = tx_env;
            evm.transact()
        };

        let result_and_state = outcome.map_err(|e| match e {
            EVMError::Database(e) => EngineError::State(e),
            other => EngineError::Evm(format!("{:?}", other)),
        })?;

        match result_and_state.result {
            RevmExecutionResult::Success { reason, output, gas_used, logs, .. } => {
                view.commit(result_and_state.state)?;
                for log in &logs {
                    sink.log(log)?;
                }

                let data = match output {
                    Output::Call(data) => data,
                    Output::Create(data, _) => data,
                };
                debug!(gas_used, logs = logs.len(), output_len = data.len(), "evm call succeeded");

                // 显式 RETURN 即使长度为零也算有返回值；只有 STOP 之类的结束才是 None
                Ok(match reason {
                    SuccessReason::Return => Some(data),
                    _ if data.is_empty() => None,
                    _ => Some(data),
                })
            }
            RevmExecutionResult::Revert { output, gas_used } => {
                debug!(gas_used, "evm call reverted");
                Err(EngineError::Reverted(output))
            }
            RevmExecutionResult::Halt { reason, gas_used } => Err(EngineError::Halted {
                reason: format!("{:?}", reason),
                gas_used,
            }),
        }
    }
}
