//! Risk scoring
//!
//! - `morosidad`: payment delinquency score of a tenant (renter)

pub mod morosidad;

pub use morosidad::{
    features_from_payments, score, MorosidadFeatures, MorosidadScore, RiskLevel, ScoreComponents, TenantRisk,
};
