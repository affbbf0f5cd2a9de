//! Membership Service
//!
//! Scheme administration and benefit entitlement generation for health
//! insurance memberships:
//! - Payers, plans, policies, categories and the benefit catalog
//! - Benefits with sub-benefits and their configuration rules
//! - Beneficiaries grouped into families under a principal
//! - Eligibility evaluation and entitlement publishing to the benefit service
//! - Incremental reprocessing and category changes

pub mod config;
pub mod eligibility;
pub mod entitlement;
pub mod error;
pub mod models;
pub mod processing;
pub mod publisher;
pub mod repository;
pub mod service;
pub mod validation;

pub use self::config::{DownstreamConfig, MembershipConfig, ENV_PREFIX};
pub use entitlement::*;
pub use error::*;
pub use models::*;
pub use processing::*;
pub use publisher::*;
pub use repository::*;
pub use service::*;
