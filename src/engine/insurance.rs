// ==========================================
// 批量发货系统 - 保险费计算
// ==========================================
// 两条路径（口径不一致，保持原样）:
// - 开关 / 保额编辑: 本地费率 round(v × 1%)，不调用远端
// - 申报价值编辑: 优先远端报价，失败兜底 max(round(v × 1%), 100)
// 单位: 均为最小货币单位
// ==========================================

use crate::config::PipelineConfig;
use crate::engine::services::InsuranceService;
use std::sync::Arc;

pub struct InsuranceCalculator {
    service: Arc<dyn InsuranceService>,
    rate: f64,
    min_fee_minor: i64,
}

impl InsuranceCalculator {
    pub fn new(service: Arc<dyn InsuranceService>, config: &PipelineConfig) -> Self {
        Self {
            service,
            rate: config.insurance_rate,
            min_fee_minor: config.insurance_min_fee_minor,
        }
    }

    /// 本地规则；保额 ≤ 0 时保费为 0
    pub fn local_cost(&self, insurance_value_minor: i64) -> i64 {
        local_insurance_cost(insurance_value_minor, self.rate)
    }

    /// 远端兜底规则（含最低保费）
    pub fn fallback_cost(&self, insurance_value_minor: i64) -> i64 {
        if insurance_value_minor <= 0 {
            return 0;
        }
        self.local_cost(insurance_value_minor).max(self.min_fee_minor)
    }

    /// 申报价值编辑路径: 远端优先，失败时兜底
    pub async fn remote_cost(&self, insurance_value_minor: i64) -> i64 {
        if insurance_value_minor <= 0 {
            return 0;
        }
        match self.service.insurance_cost(insurance_value_minor).await {
            Ok(quote) => quote.cost.max(0),
            Err(e) => {
                let cost = self.fallback_cost(insurance_value_minor);
                tracing::warn!(
                    value = insurance_value_minor,
                    fallback = cost,
                    error = %e,
                    "远端保费查询失败，使用兜底费率"
                );
                cost
            }
        }
    }
}

/// 本地费率保费: round(v × rate)，v ≤ 0 时为 0
pub fn local_insurance_cost(insurance_value_minor: i64, rate: f64) -> i64 {
    if insurance_value_minor <= 0 {
        return 0;
    }
    (insurance_value_minor as f64 * rate).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::services::{InsuranceQuote, ServiceError};
    use async_trait::async_trait;

    struct Remote(Result<i64, ServiceError>);

    #[async_trait]
    impl InsuranceService for Remote {
        async fn insurance_cost(&self, _value: i64) -> Result<InsuranceQuote, ServiceError> {
            self.0.clone().map(|cost| InsuranceQuote { cost })
        }
    }

    fn calculator(remote: Result<i64, ServiceError>) -> InsuranceCalculator {
        InsuranceCalculator::new(Arc::new(Remote(remote)), &PipelineConfig::default())
    }

    #[test]
    fn test_local_rule_one_percent() {
        let calc = calculator(Ok(0));
        // $50.00 → $0.50
        assert_eq!(calc.local_cost(5000), 50);
        assert_eq!(calc.local_cost(1234), 12);
        assert_eq!(calc.local_cost(0), 0);
        assert_eq!(calc.local_cost(-10), 0);
    }

    #[test]
    fn test_fallback_has_minimum() {
        let calc = calculator(Ok(0));
        assert_eq!(calc.fallback_cost(5000), 100);
        assert_eq!(calc.fallback_cost(25000), 250);
        assert_eq!(calc.fallback_cost(0), 0);
    }

    #[tokio::test]
    async fn test_remote_preferred() {
        let calc = calculator(Ok(77));
        assert_eq!(calc.remote_cost(5000).await, 77);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let calc = calculator(Err(ServiceError::Network("down".to_string())));
        assert_eq!(calc.remote_cost(5000).await, 100);
        assert_eq!(calc.remote_cost(0).await, 0);
    }
}
