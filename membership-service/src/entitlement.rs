use crate::error::{MembershipError, MembershipResult};
use crate::models::{
    ApplicableGender, ApplicableMember, Beneficiary, BeneficiaryType, Benefit, BenefitTree, Category, Gender,
    Payer, Policy,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ACTIVE_STATUS: &str = "ACTIVE";

/// Outbound entitlement document accepted by the benefit-management system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementPayload {
    pub aggregate_id: String,
    pub benefit_name: String,
    pub sub_benefits: Vec<SubBenefitEntitlement>,
    pub beneficiaries: Vec<EntitledBeneficiary>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub suspension_threshold: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub policy_number: String,
    pub payer: PayerRef,
    pub category_id: i64,
    pub benefit_id: i64,
    pub catalog_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBenefitEntitlement {
    pub name: String,
    pub status: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub suspension_threshold: Decimal,
    pub benefit_id: i64,
    pub gender: ApplicableGender,
    pub member_type: ApplicableMember,
    pub catalog_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitledBeneficiary {
    pub id: i64,
    pub name: String,
    pub member_number: String,
    pub beneficiary_type: BeneficiaryType,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Gender,
    pub jic_entity_id: Option<i32>,
    pub apa_entity_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerRef {
    pub payer_id: i64,
    pub payer_name: String,
}

/// Body of suspend, activate and deactivate calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitStatusRequest {
    pub beneficiary_id: i64,
    pub category_id: i64,
}

impl From<&Beneficiary> for EntitledBeneficiary {
    fn from(member: &Beneficiary) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            member_number: member.member_number.clone(),
            beneficiary_type: member.beneficiary_type,
            email: member.email.clone(),
            phone_number: member.phone_number.clone(),
            gender: member.gender,
            jic_entity_id: member.jic_entity_id,
            apa_entity_id: member.apa_entity_id,
        }
    }
}

impl EntitlementPayload {
    pub fn member_numbers(&self) -> Vec<String> {
        self.beneficiaries.iter().map(|b| b.member_number.clone()).collect()
    }
}

/// Assembles entitlement payloads for one policy category. Pure, no I/O.
pub struct EntitlementBuilder<'a> {
    policy: &'a Policy,
    category: &'a Category,
}

impl<'a> EntitlementBuilder<'a> {
    pub fn new(policy: &'a Policy, category: &'a Category) -> Self {
        Self { policy, category }
    }

    /// Build the payload for `tree` covering `beneficiaries`.
    ///
    /// `aggregate_id` is reused when given, otherwise a fresh UUID v4 is issued.
    pub fn build(
        &self,
        tree: &BenefitTree,
        payer: &Payer,
        beneficiaries: &[&Beneficiary],
        aggregate_id: Option<&str>,
    ) -> MembershipResult<EntitlementPayload> {
        let main = &tree.main;
        let sub_benefits = tree
            .subs
            .iter()
            .map(|sub| self.sub_entitlement(main, sub))
            .collect::<MembershipResult<Vec<_>>>()?;

        Ok(EntitlementPayload {
            aggregate_id: aggregate_id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string),
            benefit_name: main.name.clone(),
            sub_benefits,
            beneficiaries: beneficiaries.iter().map(|m| EntitledBeneficiary::from(*m)).collect(),
            start_date: self.start_date(main)?,
            end_date: self.policy.end_date,
            status: ACTIVE_STATUS.to_string(),
            suspension_threshold: main.suspension_threshold,
            balance: main.limit,
            policy_number: self.policy.policy_number.clone(),
            payer: PayerRef {
                payer_id: payer.id,
                payer_name: payer.name.clone(),
            },
            category_id: self.category.id,
            benefit_id: main.id,
            catalog_id: main.catalog_id,
        })
    }

    fn sub_entitlement(&self, main: &Benefit, sub: &Benefit) -> MembershipResult<SubBenefitEntitlement> {
        if sub.parent_id != Some(main.id) {
            return Err(MembershipError::BenefitRule(format!(
                "Benefit [{}] is not a sub-benefit of [{}]",
                sub.name, main.name
            )));
        }
        Ok(SubBenefitEntitlement {
            name: sub.name.clone(),
            status: ACTIVE_STATUS.to_string(),
            balance: sub.limit,
            // sub-benefit waiting periods also run from the policy start
            start_date: self.start_date(sub)?,
            end_date: self.policy.end_date,
            suspension_threshold: sub.suspension_threshold,
            benefit_id: sub.id,
            gender: sub.applicable_gender,
            member_type: sub.applicable_member,
            catalog_id: sub.catalog_id,
        })
    }

    fn start_date(&self, benefit: &Benefit) -> MembershipResult<NaiveDate> {
        benefit.waiting_period.apply(self.policy.start_date).ok_or_else(|| {
            MembershipError::BenefitRule(format!(
                "Waiting period of [{}] overflows the policy start date",
                benefit.name
            ))
        })
    }
}
