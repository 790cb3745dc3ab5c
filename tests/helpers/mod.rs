// ==========================================
// 集成测试辅助模块
// ==========================================
// 职责: 外部服务替身、测试数据构建、BatchApi 装配
// ==========================================

#![allow(dead_code)]

pub mod fake_services;
pub mod test_data_builder;

use bulk_shipping::api::{BatchApi, BatchServices};
use bulk_shipping::config::PipelineConfig;
use bulk_shipping::engine::{OptionalEventPublisher, StaticCountryClassifier};
use bulk_shipping::repository::TemplateRepository;
use fake_services::*;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub const TEST_USER: &str = "user-001";

/// 装配好的测试环境（持有所有替身以便断言）
pub struct TestHarness {
    pub api: Arc<BatchApi>,
    pub pricing: Arc<FakePricing>,
    pub insurance: Arc<FakeInsurance>,
    pub ddp: Arc<FakeDdp>,
    pub balance: Arc<FakeBalance>,
    pub orders: Arc<RecordingOrderCreator>,
    pub events: Arc<RecordingPublisher>,
    pub templates: Arc<TemplateRepository>,
}

pub struct HarnessBuilder {
    config: PipelineConfig,
    pricing: FakePricing,
    insurance: FakeInsurance,
    ddp: FakeDdp,
    balance: FakeBalance,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            pricing: FakePricing::new(),
            insurance: FakeInsurance::new(),
            ddp: FakeDdp::new(),
            balance: FakeBalance::new(10_000),
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pricing(mut self, pricing: FakePricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn insurance(mut self, insurance: FakeInsurance) -> Self {
        self.insurance = insurance;
        self
    }

    pub fn ddp(mut self, ddp: FakeDdp) -> Self {
        self.ddp = ddp;
        self
    }

    pub fn balance(mut self, balance: FakeBalance) -> Self {
        self.balance = balance;
        self
    }

    pub fn build(self) -> TestHarness {
        bulk_shipping::logging::init_test();

        let pricing = Arc::new(self.pricing);
        let insurance = Arc::new(self.insurance);
        let ddp = Arc::new(self.ddp);
        let balance = Arc::new(self.balance);
        let orders = Arc::new(RecordingOrderCreator::default());
        let events = Arc::new(RecordingPublisher::default());

        let conn = Connection::open_in_memory().expect("打开内存数据库失败");
        let templates = Arc::new(
            TemplateRepository::new(Arc::new(Mutex::new(conn))).expect("创建模板仓储失败"),
        );

        let services = BatchServices {
            pricing: pricing.clone(),
            insurance: insurance.clone(),
            ddp: ddp.clone(),
            balance: balance.clone(),
            classifier: Arc::new(StaticCountryClassifier),
            orders: orders.clone(),
            templates: templates.clone(),
        };

        let api = BatchApi::new(
            self.config,
            services,
            OptionalEventPublisher::with_publisher(events.clone()),
            TEST_USER,
        );

        TestHarness {
            api: Arc::new(api),
            pricing,
            insurance,
            ddp,
            balance,
            orders,
            events,
            templates,
        }
    }
}

impl TestHarness {
    pub fn new() -> Self {
        HarnessBuilder::new().build()
    }
}

/// 让出执行权直到条件满足（current_thread 运行时下驱动已 spawn 的任务）
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("等待条件超时");
}
