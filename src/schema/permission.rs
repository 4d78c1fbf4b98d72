//! 账户权限位

use serde::{Deserialize, Serialize};

/// 权限标志（位掩码）
pub type PermFlag = u64;

pub const ROOT: PermFlag = 1 << 0;
pub const SEND: PermFlag = 1 << 1;
pub const CALL: PermFlag = 1 << 2;
pub const CREATE_CONTRACT: PermFlag = 1 << 3;
pub const CREATE_ACCOUNT: PermFlag = 1 << 4;

/// 新部署合约获得的权限集合
pub const CONTRACT_PERMISSIONS: PermFlag = CALL | SEND | CREATE_CONTRACT;

/// 账户基础权限
///
/// `perms` 为权限取值，`set_bit` 标记哪些位被显式设置过
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permissions {
    pub perms: PermFlag,
    pub set_bit: PermFlag,
}

impl Permissions {
    /// 设置（或清除）权限位，同时标记为已设置
    pub fn set(&mut self, flag: PermFlag, value: bool) {
        self.set_bit |= flag;
        if value {
            self.perms |= flag;
        } else {
            self.perms &= !flag;
        }
    }

    /// 查询权限位；未显式设置过的位返回 None
    pub fn get(&self, flag: PermFlag) -> Option<bool> {
        if self.set_bit & flag != flag {
            return None;
        }
        Some(self.perms & flag == flag)
    }

    /// 是否拥有全部给定权限
    pub fn has(&self, flag: PermFlag) -> bool {
        self.get(flag).unwrap_or(false)
    }
}

impl From<PermFlag> for Permissions {
    fn from(flags: PermFlag) -> Self {
        Self { perms: flags, set_bit: flags }
    }
}
