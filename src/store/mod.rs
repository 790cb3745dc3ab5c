// ==========================================
// 批量发货系统 - 草稿存储层
// ==========================================
// 职责: 持有整批运单草稿，统一受理编辑与引擎补丁
// 红线: 组件只读快照、返回补丁，不直接改动集合
// ==========================================

pub mod draft_store;
pub mod patch;

pub use draft_store::{DraftSnapshot, DraftStore};
pub use patch::{
    DdpOutcome, DdpTicket, DimensionsPatch, MergeMode, MergeReport, PricingPatch,
    PricingPatchOutcome,
};
