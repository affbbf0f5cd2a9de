#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use membership_service::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Publisher that records every call and fails on request
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<EntitlementPayload>>,
    suspended: Mutex<Vec<BenefitStatusRequest>>,
    failing_benefits: Mutex<HashSet<String>>,
    fail_suspensions: AtomicBool,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<EntitlementPayload> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_for(&self, benefit_name: &str) -> Vec<EntitlementPayload> {
        self.published()
            .into_iter()
            .filter(|p| p.benefit_name == benefit_name)
            .collect()
    }

    pub fn suspended(&self) -> Vec<BenefitStatusRequest> {
        self.suspended.lock().unwrap().clone()
    }

    pub fn fail_benefit(&self, name: &str) {
        self.failing_benefits.lock().unwrap().insert(name.to_string());
    }

    pub fn recover_benefit(&self, name: &str) {
        self.failing_benefits.lock().unwrap().remove(name);
    }

    pub fn fail_suspensions(&self, fail: bool) {
        self.fail_suspensions.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BenefitPublisher for RecordingPublisher {
    async fn publish(&self, payload: &EntitlementPayload) -> MembershipResult<()> {
        if self.failing_benefits.lock().unwrap().contains(&payload.benefit_name) {
            return Err(MembershipError::Downstream("benefit service unavailable".to_string()));
        }
        self.published.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn suspend_benefits(&self, request: &BenefitStatusRequest) -> MembershipResult<()> {
        if self.fail_suspensions.load(Ordering::SeqCst) {
            return Err(MembershipError::Downstream("suspension rejected".to_string()));
        }
        self.suspended.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn activate_benefits(&self, _request: &BenefitStatusRequest) -> MembershipResult<()> {
        Ok(())
    }

    async fn deactivate_benefits(&self, _request: &BenefitStatusRequest) -> MembershipResult<()> {
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A service wired to an in-memory store with one payer, plan and 2024 policy
pub struct Scheme {
    pub service: MembershipService,
    pub publisher: Arc<RecordingPublisher>,
    pub payer: Payer,
    pub policy: Policy,
}

impl Scheme {
    pub async fn setup() -> Self {
        let publisher = Arc::new(RecordingPublisher::default());
        let service = MembershipService::new(Arc::new(InMemoryMembershipStore::new()), publisher.clone());

        let payer = service
            .add_payer(NewPayer {
                name: "Jubilee Insurance".to_string(),
                contact: Some("claims@jubilee.example".to_string()),
                payer_type: PayerType::Underwriter,
            })
            .await
            .unwrap();
        let plan = service
            .add_plan(NewPlan {
                name: "Corporate Gold".to_string(),
                plan_type: PlanType::Scheme,
                access_mode: BenefitAccessMode::Card,
            })
            .await
            .unwrap();
        let policy = service
            .add_policy(NewPolicy {
                plan_id: plan.id,
                policy_number: "POL-2024-001".to_string(),
                start_date: date(2024, 1, 1),
                end_date: date(2024, 12, 31),
            })
            .await
            .unwrap();

        Self {
            service,
            publisher,
            payer,
            policy,
        }
    }

    pub async fn category(&self, name: &str) -> Category {
        self.service
            .add_categories(NewCategories {
                policy_id: self.policy.id,
                categories: vec![NewCategory {
                    name: name.to_string(),
                    description: None,
                    jic_scheme_code: None,
                    apa_scheme_code: None,
                    policy_payer_code: None,
                }],
            })
            .await
            .unwrap()
            .remove(0)
    }

    /// Catalog entry named after the benefit, reused when it already exists
    async fn catalog_for(&self, name: &str) -> BenefitCatalog {
        let code = name.to_uppercase().replace(' ', "_");
        let existing = self.service.catalog_by_group(ServiceGroup::Outpatient).await.unwrap();
        if let Some(entry) = existing.into_iter().find(|c| c.code == code) {
            return entry;
        }
        self.service
            .add_catalog_entry(NewCatalogEntry {
                code,
                name: name.to_string(),
                service_group: ServiceGroup::Outpatient,
            })
            .await
            .unwrap()
    }

    pub fn benefit_request(&self, category_id: i64, catalog_id: i64, name: &str, sharing: BenefitDistribution) -> NewBenefit {
        NewBenefit {
            category_id,
            parent_id: None,
            catalog_id,
            payer_id: self.payer.id,
            name: name.to_string(),
            limit: Decimal::new(100_000, 0),
            suspension_threshold: Decimal::new(10_000, 0),
            applicable_gender: ApplicableGender::All,
            applicable_member: ApplicableMember::All,
            sharing,
            co_payment_required: false,
            co_payment_amount: Decimal::ZERO,
            pre_auth_type: PreAuthType::None,
            waiting_period: WaitingPeriod::ZeroDays,
        }
    }

    pub async fn benefit(&self, category_id: i64, name: &str, sharing: BenefitDistribution) -> Benefit {
        let catalog = self.catalog_for(name).await;
        self.service
            .add_benefit(self.benefit_request(category_id, catalog.id, name, sharing))
            .await
            .unwrap()
    }

    pub async fn sub_benefit(&self, parent: &Benefit, name: &str, limit: i64, waiting_period: WaitingPeriod) -> Benefit {
        let catalog = self.catalog_for(name).await;
        let mut request = self.benefit_request(parent.category_id, catalog.id, name, parent.sharing);
        request.parent_id = Some(parent.id);
        request.limit = Decimal::new(limit, 0);
        request.suspension_threshold = Decimal::new(limit / 10, 0);
        request.waiting_period = waiting_period;
        self.service.add_benefit(request).await.unwrap()
    }

    pub fn member_request(
        &self,
        category_id: i64,
        member_number: &str,
        beneficiary_type: BeneficiaryType,
        gender: Gender,
        principal_id: Option<i64>,
    ) -> NewBeneficiary {
        NewBeneficiary {
            category_id,
            principal_id,
            name: format!("Member {member_number}"),
            member_number: member_number.to_string(),
            beneficiary_type,
            gender,
            dob: date(1988, 3, 14),
            phone_number: Some("+254712345678".to_string()),
            email: None,
            nhif_number: None,
            jic_entity_id: None,
            apa_entity_id: None,
        }
    }

    pub async fn principal(&self, category_id: i64, member_number: &str, gender: Gender) -> Beneficiary {
        self.service
            .add_beneficiary(self.member_request(category_id, member_number, BeneficiaryType::Principal, gender, None))
            .await
            .unwrap()
    }

    pub async fn dependant(
        &self,
        principal: &Beneficiary,
        member_number: &str,
        beneficiary_type: BeneficiaryType,
        gender: Gender,
    ) -> Beneficiary {
        self.service
            .add_beneficiary(self.member_request(
                principal.category_id,
                member_number,
                beneficiary_type,
                gender,
                Some(principal.id),
            ))
            .await
            .unwrap()
    }
}
