// ==========================================
// DDP 关税与余额扣款集成测试
// ==========================================
// 测试目标:
// - 单票触发条件与状态机
// - 过期响应丢弃
// - 批量报价、余额校验、确认扣款（幂等 / 在途互斥 / 失败不改余额）
// ==========================================

mod helpers;

use bulk_shipping::api::ApiError;
use bulk_shipping::domain::{DdpState, DraftId, ShippingTerms};
use bulk_shipping::engine::{can_afford, PipelineError, PipelineEvent};
use helpers::fake_services::{FakeBalance, FakeDdp, Gate};
use helpers::test_data_builder::{us_ddp_row, RowBuilder};
use helpers::{wait_until, HarnessBuilder, TestHarness};

fn ids(harness: &TestHarness) -> Vec<DraftId> {
    harness
        .api
        .snapshot()
        .expect("读取快照失败")
        .drafts
        .iter()
        .map(|d| d.id)
        .collect()
}

// ==========================================
// 单票 DDP
// ==========================================

#[tokio::test]
async fn test_dap_terms_never_trigger_ddp() {
    let harness = TestHarness::new();
    harness
        .api
        .ingest_rows(&[RowBuilder::new("Alice", "United States")
            .hs("6109.10.00")
            .value("50.00")
            .terms("dap")
            .build()])
        .unwrap();
    let id = ids(&harness)[0];

    let draft = harness.api.calculate_ddp(id).await.unwrap();
    assert_eq!(draft.ddp_state, DdpState::Idle);
    assert!(draft.ddp_calculation.is_none());
    assert_eq!(harness.ddp.single_calls(), 0);

    // 切换为 DDP 后立即计算
    let draft = harness.api.set_shipping_terms(id, ShippingTerms::Ddp).await.unwrap();
    assert_eq!(harness.ddp.single_calls(), 1);
    assert_eq!(draft.ddp_state, DdpState::Available);
    assert_eq!(draft.ddp_calculation.map(|c| c.total), Some(6.0));
}

#[tokio::test]
async fn test_single_ddp_outcome_states() {
    let harness = TestHarness::new();
    harness
        .api
        .ingest_rows(&[
            us_ddp_row("Alice", "50.00"),
            RowBuilder::new("Bob", "United States").hs("9903.88.01").value("20.00").terms("ddp").build(),
            RowBuilder::new("Cleo", "United States").hs("0012.34.56").value("20.00").terms("ddp").build(),
        ])
        .unwrap();
    let ids = ids(&harness);

    let alice = harness.api.calculate_ddp(ids[0]).await.unwrap();
    assert_eq!(alice.ddp_state, DdpState::Available);
    let calc = alice.ddp_calculation.unwrap();
    assert_eq!(calc.base_duty, 5.0);
    assert_eq!(calc.ddp_processing_fee, 1.0);
    assert_eq!(calc.formatted_total, "$6.00");

    let bob = harness.api.calculate_ddp(ids[1]).await.unwrap();
    assert_eq!(bob.ddp_state, DdpState::Unavailable);
    let calc = bob.ddp_calculation.unwrap();
    assert!(!calc.available);
    assert!(calc.error_message.is_some());

    let cleo = harness.api.calculate_ddp(ids[2]).await.unwrap();
    assert!(matches!(cleo.ddp_state, DdpState::Error { .. }));
    assert!(cleo.ddp_calculation.is_none());

    assert_eq!(harness.ddp.single_calls(), 3);
}

#[tokio::test]
async fn test_non_us_destination_skips_ddp() {
    let harness = TestHarness::new();
    harness
        .api
        .ingest_rows(&[RowBuilder::new("Anna", "Germany")
            .hs("6109.10.00")
            .value("50.00")
            .terms("ddp")
            .build()])
        .unwrap();
    let id = ids(&harness)[0];

    let draft = harness.api.calculate_ddp(id).await.unwrap();
    assert_eq!(draft.ddp_state, DdpState::Idle);
    assert_eq!(harness.ddp.single_calls(), 0);

    // 改目的国只清除旧结果，不触发计算
    let draft = harness.api.update_receiver_country(id, "USA").await.unwrap();
    assert_eq!(draft.ddp_state, DdpState::Idle);
    assert_eq!(harness.ddp.single_calls(), 0);

    // 显式计算时满足条件
    let draft = harness.api.calculate_ddp(id).await.unwrap();
    assert_eq!(draft.ddp_state, DdpState::Available);
    assert_eq!(harness.ddp.single_calls(), 1);
}

#[tokio::test]
async fn test_stale_ddp_response_is_discarded() {
    let gate = Gate::closed();
    let harness = HarnessBuilder::new()
        .ddp(FakeDdp::new().gated(gate.clone()))
        .build();
    harness.api.ingest_rows(&[us_ddp_row("Alice", "50.00")]).unwrap();
    let id = ids(&harness)[0];

    let api = harness.api.clone();
    let flight = tokio::spawn(async move { api.calculate_ddp(id).await });
    let ddp = harness.ddp.clone();
    wait_until(|| ddp.single_calls() == 1).await;
    assert_eq!(harness.api.draft(id).unwrap().ddp_state, DdpState::Calculating);

    // 在途期间改为 DAP：旧请求作废
    harness.api.set_shipping_terms(id, ShippingTerms::Dap).await.unwrap();

    gate.release(1);
    let draft = flight.await.unwrap().unwrap();
    assert_eq!(draft.ddp_state, DdpState::Idle);
    assert!(draft.ddp_calculation.is_none());
}

// ==========================================
// 批量报价与扣款
// ==========================================

#[tokio::test]
async fn test_insufficient_balance_blocks_deduction() {
    let harness = HarnessBuilder::new().balance(FakeBalance::new(3000)).build();
    // $415.00 × 10% + $1.00 = $42.50
    harness.api.ingest_rows(&[us_ddp_row("Alice", "415.00")]).unwrap();

    let quote = harness.api.quote_batch_ddp().await.unwrap();
    assert_eq!(quote.total_ddp_amount, 42.5);
    assert_eq!(quote.total_minor(), 4250);
    assert_eq!(quote.balance_minor, 3000);
    assert!(!quote.can_afford);
    assert_eq!(harness.api.cached_balance(), Some(3000));

    let err = harness.api.confirm_ddp_deduction(&quote).await.unwrap_err();
    match err {
        ApiError::Pipeline(PipelineError::InsufficientBalance { required_minor, balance_minor }) => {
            assert_eq!(required_minor, 4250);
            assert_eq!(balance_minor, 3000);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(harness.balance.deduct_calls(), 0);
    assert!(can_afford(4250, 42.5));
}

#[tokio::test]
async fn test_successful_deduction_uses_server_balance() {
    let harness = TestHarness::new();
    harness
        .api
        .ingest_rows(&[
            us_ddp_row("Alice", "50.00"),
            us_ddp_row("Bob", "100.00"),
            RowBuilder::new("Cleo", "United States").hs("9903.88.01").value("20.00").terms("ddp").build(),
            RowBuilder::new("Dan", "United States").hs("6109.10.00").value("20.00").terms("dap").build(),
        ])
        .unwrap();
    let ids = ids(&harness);

    let quote = harness.api.quote_batch_ddp().await.unwrap();
    assert_eq!(harness.ddp.bulk_calls(), 1);
    // 6.00 + 11.00；无适用税率的条目不计入
    assert_eq!(quote.lines.len(), 2);
    assert_eq!(quote.total_ddp_amount, 17.0);
    assert!(quote.can_afford);

    // 报价结果写回草稿
    assert_eq!(harness.api.draft(ids[0]).unwrap().ddp_state, DdpState::Available);
    assert_eq!(harness.api.draft(ids[2]).unwrap().ddp_state, DdpState::Unavailable);
    assert_eq!(harness.api.draft(ids[3]).unwrap().ddp_state, DdpState::Idle);

    let new_balance = harness.api.confirm_ddp_deduction(&quote).await.unwrap();
    assert_eq!(new_balance, 8300);
    assert_eq!(harness.api.cached_balance(), Some(8300));

    let requests = harness.balance.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].idempotency_key, quote.confirmation_id);
    assert_eq!(requests[0].shipment_details.len(), 2);
    assert!(harness
        .events
        .events()
        .contains(&PipelineEvent::BalanceInvalidated { new_balance_minor: 8300 }));

    // 同一报价不能再次扣款
    let err = harness.api.confirm_ddp_deduction(&quote).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Pipeline(PipelineError::QuoteAlreadyConfirmed(_))
    ));
    assert_eq!(harness.balance.deduct_calls(), 1);
}

#[tokio::test]
async fn test_failed_deduction_keeps_cached_balance() {
    let harness = HarnessBuilder::new()
        .balance(FakeBalance::new(10_000).rejecting())
        .build();
    harness.api.ingest_rows(&[us_ddp_row("Alice", "50.00")]).unwrap();

    let quote = harness.api.quote_batch_ddp().await.unwrap();
    let err = harness.api.confirm_ddp_deduction(&quote).await.unwrap_err();
    assert!(matches!(err, ApiError::Pipeline(PipelineError::DeductionFailed(_))));

    assert_eq!(harness.api.cached_balance(), Some(10_000));
    assert_eq!(harness.balance.current(), 10_000);
    assert!(harness
        .events
        .events()
        .iter()
        .all(|e| !matches!(e, PipelineEvent::BalanceInvalidated { .. })));
}

#[tokio::test]
async fn test_concurrent_confirmation_is_rejected() {
    let gate = Gate::closed();
    let harness = HarnessBuilder::new()
        .balance(FakeBalance::new(10_000).gated(gate.clone()))
        .build();
    harness.api.ingest_rows(&[us_ddp_row("Alice", "50.00")]).unwrap();
    let quote = harness.api.quote_batch_ddp().await.unwrap();

    let api = harness.api.clone();
    let in_flight_quote = quote.clone();
    let flight = tokio::spawn(async move { api.confirm_ddp_deduction(&in_flight_quote).await });
    let balance = harness.balance.clone();
    wait_until(|| balance.deduct_calls() == 1).await;

    let err = harness.api.confirm_ddp_deduction(&quote).await.unwrap_err();
    assert!(matches!(err, ApiError::Pipeline(PipelineError::DeductionInFlight)));

    gate.release(1);
    assert_eq!(flight.await.unwrap().unwrap(), 9400);
    assert_eq!(harness.balance.deduct_calls(), 1);
}

#[tokio::test]
async fn test_edit_after_quote_requires_requote() {
    let harness = TestHarness::new();
    harness.api.ingest_rows(&[us_ddp_row("Alice", "50.00")]).unwrap();
    let id = ids(&harness)[0];

    let quote = harness.api.quote_batch_ddp().await.unwrap();
    harness.api.set_tax_id(id, Some("US-123".to_string())).unwrap();

    let err = harness.api.confirm_ddp_deduction(&quote).await.unwrap_err();
    match err {
        ApiError::Pipeline(PipelineError::StaleQuote { quote_version, current_version }) => {
            assert_eq!(quote_version, quote.store_version);
            assert!(current_version > quote_version);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(harness.balance.deduct_calls(), 0);
    assert_eq!(harness.api.cached_balance(), Some(10_000));

    // 重新报价后可以扣款
    let fresh = harness.api.quote_batch_ddp().await.unwrap();
    assert_ne!(fresh.confirmation_id, quote.confirmation_id);
    assert_eq!(harness.api.confirm_ddp_deduction(&fresh).await.unwrap(), 9400);
    assert_eq!(harness.balance.deduct_calls(), 1);
}

#[tokio::test]
async fn test_quote_without_eligible_drafts() {
    let harness = TestHarness::new();
    harness
        .api
        .ingest_rows(&[RowBuilder::new("Alice", "United States").value("50.00").terms("ddp").build()])
        .unwrap();

    let err = harness.api.quote_batch_ddp().await.unwrap_err();
    assert!(matches!(err, ApiError::Pipeline(PipelineError::NothingToCalculate)));
    assert_eq!(harness.ddp.bulk_calls(), 0);
}
