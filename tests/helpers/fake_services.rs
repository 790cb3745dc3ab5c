// ==========================================
// 外部服务替身
// ==========================================
// 说明:
// - 所有替身记录调用次数 / 请求内容
// - gate 为 0 许可的信号量；测试通过 release() 放行在途请求
// ==========================================

use async_trait::async_trait;
use bulk_shipping::domain::{to_minor_units, FinalizedShipment};
use bulk_shipping::engine::{
    BalanceService, BatchCreationReceipt, BulkDdpResponse, BulkDdpShipment, DdpCalculationRecord,
    DdpResponse, DdpService, DeductionRequest, DeductionResponse, InsuranceQuote,
    InsuranceService, OrderCreator, PipelineEvent, PipelineEventPublisher, PricingDuties,
    PricingRequest, PricingResponse, PricingService, ServiceError, ServiceQuote,
};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

// ==========================================
// Gate - 请求闸门
// ==========================================
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn closed() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    pub fn release(&self, n: usize) {
        self.0.add_permits(n);
    }

    async fn pass(&self) {
        self.0.acquire().await.expect("gate closed").forget();
    }
}

async fn pass_gate(gate: &Option<Gate>) {
    if let Some(g) = gate {
        g.pass().await;
    }
}

// ==========================================
// FakePricing - 计价服务
// ==========================================
// 固定返回 ECO + EXPRESS 两个选项；目的国在失败列表中时返回网络错误
pub struct FakePricing {
    calls: AtomicUsize,
    requests: Mutex<Vec<PricingRequest>>,
    fail_countries: Vec<String>,
    gate: Option<Gate>,
}

impl FakePricing {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            fail_countries: Vec::new(),
            gate: None,
        }
    }

    pub fn failing_for(mut self, country: &str) -> Self {
        self.fail_countries.push(country.to_string());
        self
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PricingRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PricingService for FakePricing {
    async fn price(&self, request: PricingRequest) -> Result<PricingResponse, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        pass_gate(&self.gate).await;

        if self.fail_countries.contains(&request.country) {
            return Err(ServiceError::Network("connection reset".to_string()));
        }

        let base = request.package_weight * 4.0;
        Ok(PricingResponse {
            success: true,
            options: vec![
                ServiceQuote {
                    id: "eco".to_string(),
                    name: "Economy".to_string(),
                    service_type: "ECO".to_string(),
                    total_price: base,
                    price_without_insurance: base,
                    estimated_delivery_days: Some("8-12".to_string()),
                    carrier: "USPS".to_string(),
                },
                ServiceQuote {
                    id: "express".to_string(),
                    name: "Express".to_string(),
                    service_type: "EXPRESS".to_string(),
                    total_price: base * 2.0,
                    price_without_insurance: base * 2.0,
                    estimated_delivery_days: Some("2-3".to_string()),
                    carrier: "DHL".to_string(),
                },
            ],
            duties: Some(PricingDuties { total: 1.25 }),
            error: None,
            // 回显中的尺寸被篡改，合并时必须忽略
            echo: Some(PricingRequest {
                package_length: 1.0,
                package_width: 1.0,
                package_height: 1.0,
                ..request
            }),
        })
    }
}

// ==========================================
// FakeInsurance - 保险服务
// ==========================================
pub struct FakeInsurance {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeInsurance {
    /// 远端报价为保额的 2%
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsuranceService for FakeInsurance {
    async fn insurance_cost(&self, insurance_value_minor: i64) -> Result<InsuranceQuote, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::Network("insurance offline".to_string()));
        }
        Ok(InsuranceQuote {
            cost: insurance_value_minor * 2 / 100,
        })
    }
}

// ==========================================
// FakeDdp - 关税服务
// ==========================================
// 规则: 税率 10%，手续费 $1.00；HS 以 "99" 开头无适用税率，以 "00" 开头返回网络错误
pub struct FakeDdp {
    single_calls: AtomicUsize,
    bulk_calls: AtomicUsize,
    gate: Option<Gate>,
}

impl FakeDdp {
    pub fn new() -> Self {
        Self {
            single_calls: AtomicUsize::new(0),
            bulk_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    fn record(index: usize, hs_code: &str, customs_value: i64) -> DdpCalculationRecord {
        if hs_code.starts_with("99") {
            return DdpCalculationRecord {
                shipment_index: index,
                hs_code: hs_code.to_string(),
                customs_value,
                duty_percentage: 0.0,
                base_duty: 0.0,
                ddp_processing_fee: 0.0,
                total: 0.0,
                formatted_total: "$0.00".to_string(),
                available: false,
                message: Some("No duty rate for HS code".to_string()),
            };
        }
        let base_duty = (customs_value as f64 / 100.0 * 0.10 * 100.0).round() / 100.0;
        let total = base_duty + 1.0;
        DdpCalculationRecord {
            shipment_index: index,
            hs_code: hs_code.to_string(),
            customs_value,
            duty_percentage: 10.0,
            base_duty,
            ddp_processing_fee: 1.0,
            total,
            formatted_total: format!("${:.2}", total),
            available: true,
            message: None,
        }
    }
}

#[async_trait]
impl DdpService for FakeDdp {
    async fn calculate_ddp(&self, index: usize, hs_code: &str, customs_value: i64) -> Result<DdpResponse, ServiceError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        pass_gate(&self.gate).await;
        if hs_code.starts_with("00") {
            return Err(ServiceError::Network("duty service timeout".to_string()));
        }
        Ok(DdpResponse {
            calculations: vec![Self::record(index, hs_code, customs_value)],
        })
    }

    async fn calculate_bulk_ddp(
        &self,
        shipments: Vec<BulkDdpShipment>,
        _user_id: &str,
    ) -> Result<BulkDdpResponse, ServiceError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let calculations: Vec<DdpCalculationRecord> = shipments
            .iter()
            .map(|s| Self::record(s.shipment_index, &s.hs_code, s.customs_value))
            .collect();
        let total = calculations.iter().filter(|c| c.available).map(|c| c.total).sum();
        Ok(BulkDdpResponse {
            success: true,
            calculations,
            total_ddp_amount: total,
            error: None,
        })
    }
}

// ==========================================
// FakeBalance - 余额服务
// ==========================================
pub struct FakeBalance {
    balance: Mutex<i64>,
    deduct_calls: AtomicUsize,
    requests: Mutex<Vec<DeductionRequest>>,
    reject: bool,
    gate: Option<Gate>,
}

impl FakeBalance {
    pub fn new(balance_minor: i64) -> Self {
        Self {
            balance: Mutex::new(balance_minor),
            deduct_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            reject: false,
            gate: None,
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn deduct_calls(&self) -> usize {
        self.deduct_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DeductionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn current(&self) -> i64 {
        *self.balance.lock().unwrap()
    }
}

#[async_trait]
impl BalanceService for FakeBalance {
    async fn balance(&self, _user_id: &str) -> Result<i64, ServiceError> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn deduct_ddp_balance(&self, request: DeductionRequest) -> Result<DeductionResponse, ServiceError> {
        self.deduct_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        pass_gate(&self.gate).await;

        if self.reject {
            return Err(ServiceError::Rejected("payment gateway unavailable".to_string()));
        }
        let mut balance = self.balance.lock().unwrap();
        *balance -= to_minor_units(request.ddp_amount);
        Ok(DeductionResponse {
            success: true,
            new_balance: *balance,
            message: None,
        })
    }
}

// ==========================================
// RecordingOrderCreator - 下单服务
// ==========================================
#[derive(Default)]
pub struct RecordingOrderCreator {
    batches: Mutex<Vec<Vec<FinalizedShipment>>>,
}

impl RecordingOrderCreator {
    pub fn batches(&self) -> Vec<Vec<FinalizedShipment>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl OrderCreator for RecordingOrderCreator {
    async fn create_orders(&self, shipments: Vec<FinalizedShipment>) -> Result<BatchCreationReceipt, ServiceError> {
        let mut batches = self.batches.lock().unwrap();
        let receipt = BatchCreationReceipt {
            batch_id: format!("BATCH-{}", batches.len() + 1),
            created_count: shipments.len(),
        };
        batches.push(shipments);
        Ok(receipt)
    }
}

// ==========================================
// RecordingPublisher - 事件记录
// ==========================================
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::PricingSummary { .. }))
            .count()
    }
}

impl PipelineEventPublisher for RecordingPublisher {
    fn publish(&self, event: PipelineEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
