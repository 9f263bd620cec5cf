//! User Decryption Integration Tests
//!
//! The signed decryption protocol end to end: ephemeral keys, oracle
//! checks, sealed responses, on the mock and the TFHE backends.

use miner::node::{LocalNode, NodeConfig};
use miner::prelude::*;
use miner_client::{signing_domain, KmsOracle, KMS_VERIFIER_LABEL};
use miner_contracts::{functions, ManualClock};
use miner_fhe::FHEConfig;
use proptest::prelude::*;
use std::sync::Arc;

const NOW: u64 = 1_700_000_000;

fn authorizer<B: FheBackend + 'static>(
    store: Arc<ConfidentialValueStore<B>>,
    clock: Arc<ManualClock>,
) -> DecryptionAuthorizer {
    let config = ClientConfig::default();
    let domain = signing_domain(
        &config.decryption.domain_name,
        &config.decryption.domain_version,
        config.chain_id,
        Address::from_label(KMS_VERIFIER_LABEL),
    );
    let oracle = Arc::new(KmsOracle::new(
        store,
        clock.clone(),
        domain,
        config.decryption.max_validity_days,
    ));
    DecryptionAuthorizer::new(oracle, clock, &config)
}

async fn power_handle<B: FheBackend + 'static>(node: &LocalNode<B>, token: TokenId) -> Handle {
    use miner_client::ChainReader;
    node.provider()
        .read_field(
            node.deployment().miner,
            functions::GET_MINER_POWER,
            vec![CallArg::TokenId(token)],
        )
        .await
        .unwrap()
        .as_handle()
        .unwrap()
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_owner_decrypts_power() {
    let node = LocalNode::start(MockBackend, NodeConfig::local()).unwrap();
    let alice = Wallet::from_seed([1u8; 32]);
    let receipt = node.devnet().submit(alice.address(), Call::MintMiner).wait();
    assert!(receipt.is_success());

    let handle = power_handle(&node, 1).await;
    let pair = HandleContractPair::new(handle, node.deployment().miner);
    let values = node.authorizer().user_decrypt(&alice, &[pair]).await.unwrap();

    let power = values.get(&handle).unwrap();
    assert!((20..=100).contains(&power));
}

#[tokio::test]
async fn test_other_account_cannot_decrypt() {
    let node = LocalNode::start(MockBackend, NodeConfig::local()).unwrap();
    let alice = Wallet::from_seed([1u8; 32]);
    let mallory = Wallet::from_seed([66u8; 32]);
    node.devnet().submit(alice.address(), Call::MintMiner).wait();

    let handle = power_handle(&node, 1).await;
    let pair = HandleContractPair::new(handle, node.deployment().miner);
    let err = node.authorizer().user_decrypt(&mallory, &[pair]).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthorizationRejected(_)));
    assert!(err.is_protocol_failure());
}

#[tokio::test]
async fn test_power_attributed_to_gold_rejected() {
    let node = LocalNode::start(MockBackend, NodeConfig::local()).unwrap();
    let alice = Wallet::from_seed([1u8; 32]);
    node.devnet().submit(alice.address(), Call::MintMiner).wait();

    let handle = power_handle(&node, 1).await;
    let pair = HandleContractPair::new(handle, node.deployment().gold);
    let err = node.authorizer().user_decrypt(&alice, &[pair]).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthorizationRejected(_)));
}

// ============================================================================
// Encrypted arithmetic through the protocol
// ============================================================================

#[derive(Clone, Debug)]
enum Op {
    AddScalar(u64),
    AddEncrypted(u64),
    Multiply(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..1000).prop_map(Op::AddScalar),
        (0u64..1000).prop_map(Op::AddEncrypted),
        (0u64..50).prop_map(Op::Multiply),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: a chain of encrypted operations decrypts to the plaintext result
    #[test]
    fn encrypted_arithmetic_decrypts_to_plaintext(
        start in 0u64..1000,
        ops in prop::collection::vec(op(), 0..6),
    ) {
        let store = Arc::new(ConfidentialValueStore::with_seed(MockBackend, [3u8; 32]));
        let clock = Arc::new(ManualClock::new(NOW));
        let contract = Address::from_label("calculator");
        let wallet = Wallet::from_seed([8u8; 32]);

        let mut handle = store.trivial(contract, start).unwrap();
        let mut expected = start;
        for op in &ops {
            match op {
                Op::AddScalar(k) => {
                    handle = store.add_scalar(contract, handle, *k).unwrap();
                    expected += k;
                }
                Op::AddEncrypted(k) => {
                    let other = store.trivial(contract, *k).unwrap();
                    handle = store.add(contract, handle, other).unwrap();
                    expected += k;
                }
                Op::Multiply(k) => {
                    handle = store.scalar_multiply(contract, handle, *k).unwrap();
                    expected *= k;
                }
            }
        }
        store.allow(contract, handle, wallet.address()).unwrap();

        let authorizer = authorizer(store, clock);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let values = runtime
            .block_on(authorizer.user_decrypt(&wallet, &[HandleContractPair::new(handle, contract)]))
            .unwrap();

        prop_assert_eq!(values.get(&handle), Some(expected));
    }
}

// ============================================================================
// TFHE end to end
// ============================================================================

#[tokio::test]
async fn test_tfhe_mint_and_decrypt() {
    let backend = TfheBackend::generate(&FHEConfig::default()).unwrap();
    let node = LocalNode::start(backend, NodeConfig::local()).unwrap();
    let client = node.orchestrator();
    client.set_account(Some(AccountSession::connected(Arc::new(Wallet::from_seed([1u8; 32])))));

    client.mint().await.unwrap();

    let dashboard = client.dashboard();
    let power = dashboard.wallet[0].power.value().unwrap();
    assert!((20..=100).contains(&power));
    assert_eq!(dashboard.gold_balance, Plaintext::Known(0));
}
