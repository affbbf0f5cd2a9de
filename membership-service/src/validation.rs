//! Construction-time invariants for benefits, policies and beneficiaries.
//!
//! Every rule here runs before anything is persisted and again over each
//! benefit tree before a processing pass publishes anything.

use crate::error::{MembershipError, MembershipResult};
use crate::models::{
    ApplicableGender, ApplicableMember, Beneficiary, BeneficiaryType, Benefit, BenefitDistribution,
    BenefitTree, Policy, PreAuthType,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Co-payment amount must be positive exactly when co-payment is required
pub fn validate_copay(required: bool, amount: Decimal) -> MembershipResult<()> {
    if required && amount <= Decimal::ZERO {
        return Err(MembershipError::BenefitRule(
            "Co-payment is required, therefore co-payment amount must be greater than Zero".to_string(),
        ));
    }
    if !required && amount > Decimal::ZERO {
        return Err(MembershipError::BenefitRule(
            "Co-payment is not required, therefore co-payment amount must be Zero".to_string(),
        ));
    }
    Ok(())
}

/// Whether a sub-benefit's member scope fits inside its parent's
pub fn member_scope_compatible(parent: ApplicableMember, child: ApplicableMember) -> bool {
    match parent {
        ApplicableMember::All => true,
        ApplicableMember::PrincipalAndSpouse => matches!(
            child,
            ApplicableMember::Principal | ApplicableMember::Spouse | ApplicableMember::PrincipalAndSpouse
        ),
        exact => exact == child,
    }
}

/// Rules that hold for any benefit on its own
pub fn validate_benefit_fields(benefit: &Benefit) -> MembershipResult<()> {
    if benefit.name.trim().is_empty() {
        return Err(MembershipError::Validation("Benefit name cannot be blank".to_string()));
    }
    if benefit.limit < Decimal::ZERO {
        return Err(MembershipError::BenefitRule("Benefit limit cannot be negative".to_string()));
    }
    validate_copay(benefit.co_payment_required, benefit.co_payment_amount)?;
    if benefit.suspension_threshold > benefit.limit {
        return Err(MembershipError::BenefitRule(
            "Suspension threshold should not be greater than benefit limit".to_string(),
        ));
    }
    Ok(())
}

/// Rules between a sub-benefit and its parent
pub fn validate_sub_benefit(parent: &Benefit, sub: &Benefit) -> MembershipResult<()> {
    if sub.parent_id != Some(parent.id) {
        return Err(MembershipError::BenefitRule(format!(
            "Benefit [{}] is not a sub-benefit of [{}]",
            sub.name, parent.name
        )));
    }
    if !parent.is_main() {
        return Err(MembershipError::BenefitRule(format!(
            "Benefit [{}] is itself a sub-benefit and cannot have sub-benefits",
            parent.name
        )));
    }
    if sub.category_id != parent.category_id {
        return Err(MembershipError::BenefitRule(
            "Main benefit and sub-benefit must belong to the same category".to_string(),
        ));
    }
    if parent.pre_auth_type != PreAuthType::None && sub.pre_auth_type != parent.pre_auth_type {
        return Err(MembershipError::BenefitRule(
            "Pre-authorization type for main and sub-benefit are in conflict".to_string(),
        ));
    }
    if !member_scope_compatible(parent.applicable_member, sub.applicable_member) {
        return Err(MembershipError::BenefitRule(
            "Applicable member for main and sub-benefit are in conflict".to_string(),
        ));
    }
    if parent.applicable_gender != ApplicableGender::All && sub.applicable_gender != parent.applicable_gender {
        return Err(MembershipError::BenefitRule(
            "Applicable gender for main and sub-benefit are in conflict".to_string(),
        ));
    }
    if parent.sharing != BenefitDistribution::Family && sub.sharing != parent.sharing {
        return Err(MembershipError::BenefitRule(
            "Benefit sharing for main and sub-benefit are in conflict".to_string(),
        ));
    }
    if sub.limit > parent.limit {
        return Err(MembershipError::BenefitRule(
            "Main benefit limit should be greater than sub-benefit limit".to_string(),
        ));
    }
    if sub.payer_id != parent.payer_id {
        return Err(MembershipError::BenefitRule(
            "Main benefit payer should be the same as sub-benefit payer".to_string(),
        ));
    }
    Ok(())
}

/// Full check of a benefit about to be stored, given its parent if any
pub fn validate_benefit(benefit: &Benefit, parent: Option<&Benefit>) -> MembershipResult<()> {
    validate_benefit_fields(benefit)?;
    match (benefit.parent_id, parent) {
        (None, None) => Ok(()),
        (Some(_), Some(parent)) => validate_sub_benefit(parent, benefit),
        (Some(id), None) => Err(MembershipError::NotFound(format!("Parent benefit {id} not found"))),
        (None, Some(_)) => Err(MembershipError::BenefitRule(format!(
            "Benefit [{}] has no parent reference",
            benefit.name
        ))),
    }
}

/// Re-check a whole tree, including that every offset date is representable
pub fn validate_benefit_tree(tree: &BenefitTree, policy: &Policy) -> MembershipResult<()> {
    validate_benefit(&tree.main, None)?;
    for sub in &tree.subs {
        validate_benefit(sub, Some(&tree.main))?;
    }
    for benefit in std::iter::once(&tree.main).chain(tree.subs.iter()) {
        if benefit.waiting_period.apply(policy.start_date).is_none() {
            return Err(MembershipError::BenefitRule(format!(
                "Waiting period of [{}] overflows the policy start date",
                benefit.name
            )));
        }
    }
    Ok(())
}

pub fn validate_policy_dates(start: NaiveDate, end: NaiveDate) -> MembershipResult<()> {
    if start >= end {
        return Err(MembershipError::Validation(
            "Policy start date must come before end date".to_string(),
        ));
    }
    Ok(())
}

/// Closed-interval overlap
pub fn periods_overlap(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start <= b_end && b_start <= a_end
}

pub fn validate_not_blank(what: &str, value: &str) -> MembershipResult<()> {
    if value.trim().is_empty() {
        return Err(MembershipError::Validation(format!("{what} cannot be blank")));
    }
    Ok(())
}

/// Principal linkage and date of birth rules for a new or updated member
pub fn validate_beneficiary(
    beneficiary: &Beneficiary,
    principal: Option<&Beneficiary>,
    today: NaiveDate,
) -> MembershipResult<()> {
    if beneficiary.dob > today {
        return Err(MembershipError::Validation("Date of birth cannot be in the future".to_string()));
    }

    match (beneficiary.beneficiary_type, beneficiary.principal_id, principal) {
        (BeneficiaryType::Principal, None, None) => Ok(()),
        (BeneficiaryType::Principal, _, _) => Err(MembershipError::Validation(format!(
            "Dependency is incorrectly mapped for {}, a principal cannot have a principal",
            beneficiary.member_number
        ))),
        (_, None, _) => Err(MembershipError::Validation(format!(
            "Dependency is incorrectly mapped for {}, a dependant must reference a principal",
            beneficiary.member_number
        ))),
        (_, Some(id), None) => Err(MembershipError::NotFound(format!("Principal {id} not found"))),
        (_, Some(_), Some(principal)) => {
            if principal.beneficiary_type != BeneficiaryType::Principal || principal.principal_id.is_some() {
                return Err(MembershipError::Validation(format!(
                    "Dependency is incorrectly mapped for {}, {} is not a principal",
                    beneficiary.member_number, principal.member_number
                )));
            }
            if principal.category_id != beneficiary.category_id {
                return Err(MembershipError::Validation(format!(
                    "Dependency is incorrectly mapped for {}, principal belongs to another category",
                    beneficiary.member_number
                )));
            }
            Ok(())
        }
    }
}
