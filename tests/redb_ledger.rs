use alloy_primitives::{Address, U256};
use evm_bridge::address::{AddressResolver, KeccakResolver};
use evm_bridge::db::{RedbLedger, StateStore, StoredEvent};
use evm_bridge::events::MemoryEventChannel;
use evm_bridge::state::{AccountCache, VmState};
use evm_bridge::{BridgeConfig, EvmBridge, Invocation, RevmEngine};
use tempfile::TempDir;

const CREATOR: &[u8] = b"Org1MSP:user1";
const INIT_SILENT: &str = "601780600b6000396000f3600035600055602a600052600160206000a160206000f3";
const TRANSFER_INPUT: &str = "a9059cbb00000000000000000000000000000000000000000000000000000005";

fn create_test_db() -> (RedbLedger, TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("ledger.redb").to_str().unwrap().to_string();
    let db = RedbLedger::open(&db_path).unwrap();
    (db, temp_dir, db_path)
}

fn bridge() -> EvmBridge<RevmEngine> {
    EvmBridge::new(RevmEngine::default(), BridgeConfig::default())
}

#[test]
fn test_committed_deploy_survives_reopen() {
    let (mut ledger, _temp_dir, path) = create_test_db();
    let bridge = bridge();
    let zero = hex::encode(Address::ZERO);

    ledger.begin_transaction().unwrap();
    let mut channel = MemoryEventChannel::new();
    let contract = bridge
        .invoke(&Invocation::new([zero.as_str(), INIT_SILENT], "tx-1", CREATOR), &mut ledger, &mut channel)
        .unwrap();
    ledger.commit_transaction().unwrap();
    let contract = String::from_utf8(contract).unwrap();

    ledger.begin_transaction().unwrap();
    let mut channel = MemoryEventChannel::new();
    bridge
        .invoke(&Invocation::new([contract.as_str(), TRANSFER_INPUT], "tx-2", CREATOR), &mut ledger, &mut channel)
        .unwrap();
    ledger.commit_transaction().unwrap();

    let emitted = channel.take().remove(0);
    ledger
        .save_event("tx-2", &StoredEvent { name: emitted.name.clone(), payload: emitted.payload })
        .unwrap();
    drop(ledger);

    let mut ledger = RedbLedger::open(&path).unwrap();
    assert_eq!(ledger.get_event("tx-2").unwrap().map(|e| e.name), Some("a9059cbb".to_string()));

    let address: Address = contract.parse().unwrap();
    let mut cache = AccountCache::new(&mut ledger);
    assert!(cache.account_exists(&address).unwrap());
    assert!(!cache.get_code(&address).unwrap().is_empty());
    assert_ne!(cache.get_storage(&address, U256::ZERO).unwrap(), U256::ZERO);
}

#[test]
fn test_failed_invocation_rolls_back() {
    let (mut ledger, _temp_dir, _path) = create_test_db();
    let bridge = bridge();
    let zero = hex::encode(Address::ZERO);

    ledger.begin_transaction().unwrap();
    let mut channel = MemoryEventChannel::new();
    let err = bridge.invoke(&Invocation::new([zero.as_str(), "60006000fd"], "tx-1", CREATOR), &mut ledger, &mut channel);
    assert!(err.is_err());
    ledger.rollback_transaction().unwrap();

    assert!(!ledger.in_transaction());
    let caller_key = hex::encode(
        KeccakResolver
            .identity_to_address(CREATOR)
            .unwrap(),
    );
    assert_eq!(ledger.get_state(&caller_key).unwrap(), None);
}
