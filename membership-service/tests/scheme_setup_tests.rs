mod common;

use common::{date, Scheme};
use error_common::{ErrorKind, ServiceResult};
use membership_service::*;
use rust_decimal::Decimal;
use tokio_test::{assert_err, assert_ok};

fn category(name: &str) -> NewCategory {
    NewCategory {
        name: name.to_string(),
        description: Some(format!("{name} staff")),
        jic_scheme_code: None,
        apa_scheme_code: None,
        policy_payer_code: None,
    }
}

#[tokio::test]
async fn test_category_batch_is_all_or_nothing() {
    let scheme = Scheme::setup().await;

    let err = assert_err!(
        scheme
            .service
            .add_categories(NewCategories {
                policy_id: scheme.policy.id,
                categories: vec![category("Gold"), category("Silver"), category(" gold ")],
            })
            .await
    );
    assert!(matches!(err, MembershipError::Conflict(_)));
    assert!(scheme.service.categories_by_policy(scheme.policy.id).await.unwrap().is_empty());

    let saved = assert_ok!(
        scheme
            .service
            .add_categories(NewCategories {
                policy_id: scheme.policy.id,
                categories: vec![category("Gold"), category("Silver")],
            })
            .await
    );
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|c| c.status == CategoryStatus::Unprocessed));
}

#[tokio::test]
async fn test_category_names_are_unique_per_policy() {
    let scheme = Scheme::setup().await;
    scheme.category("Gold").await;

    let err = assert_err!(
        scheme
            .service
            .add_categories(NewCategories {
                policy_id: scheme.policy.id,
                categories: vec![category("GOLD")],
            })
            .await
    );
    assert!(matches!(err, MembershipError::Conflict(_)));
}

#[tokio::test]
async fn test_policy_dates_must_be_ordered() {
    let scheme = Scheme::setup().await;
    let err = assert_err!(
        scheme
            .service
            .add_policy(NewPolicy {
                plan_id: scheme.policy.plan_id,
                policy_number: "POL-BACKWARDS".to_string(),
                start_date: date(2025, 12, 31),
                end_date: date(2025, 1, 1),
            })
            .await
    );
    assert!(matches!(err, MembershipError::Validation(_)));
}

#[tokio::test]
async fn test_benefit_name_and_catalog_are_unique_per_category() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let dental = scheme.benefit(gold.id, "Dental", BenefitDistribution::Individual).await;

    let same_name = scheme.benefit_request(gold.id, dental.catalog_id, "dental", BenefitDistribution::Individual);
    let err = assert_err!(scheme.service.add_benefit(same_name).await);
    assert!(matches!(err, MembershipError::Conflict(_)));

    let same_catalog = scheme.benefit_request(gold.id, dental.catalog_id, "Dental Care", BenefitDistribution::Individual);
    let err = assert_err!(scheme.service.add_benefit(same_catalog).await);
    assert!(err.message().contains("has already been setup for this category"));

    let silver = scheme.category("Silver").await;
    let elsewhere = scheme.benefit_request(silver.id, dental.catalog_id, "Dental", BenefitDistribution::Individual);
    assert_ok!(scheme.service.add_benefit(elsewhere).await);
}

#[tokio::test]
async fn test_sub_benefit_limit_above_parent_is_rejected() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let outpatient = scheme.benefit(gold.id, "Outpatient", BenefitDistribution::Individual).await;
    let catalog = scheme
        .service
        .add_catalog_entry(NewCatalogEntry {
            code: "PHYSIO".to_string(),
            name: "Physiotherapy".to_string(),
            service_group: ServiceGroup::Outpatient,
        })
        .await
        .unwrap();

    let mut request = scheme.benefit_request(gold.id, catalog.id, "Physiotherapy", BenefitDistribution::Individual);
    request.parent_id = Some(outpatient.id);
    request.limit = outpatient.limit + Decimal::ONE;

    let err = assert_err!(scheme.service.add_benefit(request).await);
    assert!(matches!(err, MembershipError::BenefitRule(_)));
    assert_eq!(scheme.service.benefits_by_category(gold.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_copay_amount_is_cleared_when_not_required() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let catalog = scheme
        .service
        .add_catalog_entry(NewCatalogEntry {
            code: "OPT".to_string(),
            name: "Optical".to_string(),
            service_group: ServiceGroup::Optical,
        })
        .await
        .unwrap();

    let mut request = scheme.benefit_request(gold.id, catalog.id, "Optical", BenefitDistribution::Individual);
    request.co_payment_amount = Decimal::new(500, 0);
    let benefit = assert_ok!(scheme.service.add_benefit(request.clone()).await);
    assert_eq!(benefit.co_payment_amount, Decimal::ZERO);

    let silver = scheme.category("Silver").await;
    request.category_id = silver.id;
    request.co_payment_required = true;
    request.co_payment_amount = Decimal::ZERO;
    let err = assert_err!(scheme.service.add_benefit(request).await);
    assert!(matches!(err, MembershipError::BenefitRule(_)));
}

#[tokio::test]
async fn test_beneficiary_principal_linkage_rules() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let principal = scheme.principal(gold.id, "LCT-001", Gender::Male).await;

    let principal_with_principal = scheme.member_request(
        gold.id,
        "LCT-002",
        BeneficiaryType::Principal,
        Gender::Male,
        Some(principal.id),
    );
    assert_err!(scheme.service.add_beneficiary(principal_with_principal).await);

    let orphan = scheme.member_request(gold.id, "LCT-003", BeneficiaryType::Child, Gender::Male, None);
    assert_err!(scheme.service.add_beneficiary(orphan).await);

    let dependant = scheme
        .dependant(&principal, "LCT-001-01", BeneficiaryType::Spouse, Gender::Female)
        .await;
    let nested = scheme.member_request(
        gold.id,
        "LCT-001-01-01",
        BeneficiaryType::Child,
        Gender::Male,
        Some(dependant.id),
    );
    assert_err!(scheme.service.add_beneficiary(nested).await);

    let family = scheme.service.family_of(principal.id).await.unwrap();
    assert_eq!(family.len(), 2);
    assert_err!(scheme.service.family_of(dependant.id).await);
}

#[tokio::test]
async fn test_member_numbers_are_unique_per_category() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    scheme.principal(gold.id, "LCT-001", Gender::Male).await;

    let duplicate = scheme.member_request(gold.id, "lct-001", BeneficiaryType::Principal, Gender::Female, None);
    let err = assert_err!(scheme.service.add_beneficiary(duplicate).await);
    assert!(matches!(err, MembershipError::Conflict(_)));

    let silver = scheme.category("Silver").await;
    scheme.principal(silver.id, "LCT-001", Gender::Female).await;
}

#[tokio::test]
async fn test_future_date_of_birth_is_rejected() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let mut request = scheme.member_request(gold.id, "LCT-009", BeneficiaryType::Principal, Gender::Male, None);
    request.dob = date(2999, 1, 1);
    assert_err!(scheme.service.add_beneficiary(request).await);
}

#[tokio::test]
async fn test_new_member_reopens_processed_category() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    scheme.benefit(gold.id, "Dental", BenefitDistribution::Individual).await;
    scheme.principal(gold.id, "LCT-001", Gender::Male).await;
    assert_ok!(scheme.service.process_category(gold.id).await);
    assert_eq!(
        scheme.service.find_category(gold.id).await.unwrap().status,
        CategoryStatus::Processed
    );

    scheme.principal(gold.id, "LCT-002", Gender::Female).await;
    assert_eq!(
        scheme.service.find_category(gold.id).await.unwrap().status,
        CategoryStatus::PartiallyProcessed
    );
}

#[tokio::test]
async fn test_member_update_changes_only_given_fields() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let principal = scheme.principal(gold.id, "LCT-001", Gender::Male).await;

    let updated = assert_ok!(
        scheme
            .service
            .update_member(
                principal.id,
                MemberUpdate {
                    email: Some("jane.doe@example.com".to_string()),
                    ..MemberUpdate::default()
                },
            )
            .await
    );
    assert_eq!(updated.email.as_deref(), Some("jane.doe@example.com"));
    assert_eq!(updated.name, principal.name);
    assert_eq!(updated.phone_number, principal.phone_number);

    let invalid = MemberUpdate {
        email: Some("not-an-email".to_string()),
        ..MemberUpdate::default()
    };
    let err = assert_err!(scheme.service.update_member(principal.id, invalid).await);
    assert!(matches!(err, MembershipError::Validation(_)));
}

#[tokio::test]
async fn test_member_status_follows_downstream_call() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let principal = scheme.principal(gold.id, "LCT-001", Gender::Male).await;

    let member = assert_ok!(scheme.service.deactivate_member(principal.id).await);
    assert_eq!(member.status, MemberStatus::Inactive);
    let member = assert_ok!(scheme.service.activate_member(principal.id).await);
    assert_eq!(member.status, MemberStatus::Active);
}

#[tokio::test]
async fn test_catalog_codes_and_names_are_unique() {
    let scheme = Scheme::setup().await;
    let entries = assert_ok!(
        scheme
            .service
            .add_catalog_entries(vec![
                NewCatalogEntry {
                    code: "OP".to_string(),
                    name: "Outpatient".to_string(),
                    service_group: ServiceGroup::Outpatient,
                },
                NewCatalogEntry {
                    code: "IP".to_string(),
                    name: "Inpatient".to_string(),
                    service_group: ServiceGroup::Inpatient,
                },
            ])
            .await
    );
    assert_eq!(entries.len(), 2);

    let err = assert_err!(
        scheme
            .service
            .add_catalog_entry(NewCatalogEntry {
                code: "op".to_string(),
                name: "General Outpatient".to_string(),
                service_group: ServiceGroup::Outpatient,
            })
            .await
    );
    assert!(matches!(err, MembershipError::Conflict(_)));
    assert_eq!(scheme.service.catalog_by_group(ServiceGroup::Inpatient).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_service_result_carries_error_kind() {
    let scheme = Scheme::setup().await;

    let missing: ServiceResult<Category> = scheme.service.find_category(404).await.into();
    assert!(!missing.is_success());
    assert_eq!(missing.kind, Some(ErrorKind::NotFound));
    assert_eq!(missing.msg.as_deref(), Some("Category 404 not found"));

    let found: ServiceResult<Payer> = scheme.service.find_payer(scheme.payer.id).await.into();
    assert!(found.is_success());
    assert_eq!(found.data.map(|p| p.name), Some("Jubilee Insurance".to_string()));
}

#[tokio::test]
async fn test_payer_benefit_codes_are_unique_per_catalog_entry() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let dental = scheme.benefit(gold.id, "Dental", BenefitDistribution::Individual).await;

    let mapping = assert_ok!(
        scheme
            .service
            .add_benefit_mapping(NewPayerBenefitMapping {
                payer_id: scheme.payer.id,
                catalog_id: dental.catalog_id,
                code: " JUB-DEN-01 ".to_string(),
            })
            .await
    );
    assert_eq!(mapping.code, "JUB-DEN-01");

    let err = assert_err!(
        scheme
            .service
            .add_benefit_mapping(NewPayerBenefitMapping {
                payer_id: scheme.payer.id,
                catalog_id: dental.catalog_id,
                code: "JUB-DEN-02".to_string(),
            })
            .await
    );
    assert!(matches!(err, MembershipError::Conflict(_)));

    let blank = NewPayerBenefitMapping {
        payer_id: scheme.payer.id,
        catalog_id: dental.catalog_id,
        code: "   ".to_string(),
    };
    assert!(matches!(
        scheme.service.add_benefit_mapping(blank).await,
        Err(MembershipError::Validation(_))
    ));

    let mappings = assert_ok!(scheme.service.benefit_mappings_of(scheme.payer.id).await);
    assert_eq!(mappings, vec![mapping.clone()]);

    let code = assert_ok!(scheme.service.benefit_code(scheme.payer.id, dental.id).await);
    assert_eq!(code.map(|m| m.code), Some("JUB-DEN-01".to_string()));

    let optical = scheme.benefit(gold.id, "Optical", BenefitDistribution::Individual).await;
    assert_eq!(assert_ok!(scheme.service.benefit_code(scheme.payer.id, optical.id).await), None);

    let err = assert_err!(scheme.service.benefit_code(scheme.payer.id, 9_999).await);
    assert!(matches!(err, MembershipError::NotFound(_)));
}

#[tokio::test]
async fn test_payers_of_benefits_skips_unknown_ids() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let dental = scheme.benefit(gold.id, "Dental", BenefitDistribution::Individual).await;
    let optical = scheme.benefit(gold.id, "Optical", BenefitDistribution::Individual).await;

    let payers = assert_ok!(
        scheme
            .service
            .payers_of_benefits(&[dental.id, optical.id, 9_999])
            .await
    );
    assert_eq!(payers.len(), 2);
    assert!(payers.iter().all(|p| p.payer.id == scheme.payer.id));
    assert_eq!(payers[0].benefit_name, "Dental");
}

#[tokio::test]
async fn test_plans_by_payer_follow_funded_benefits() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;

    assert!(assert_ok!(scheme.service.plans_by_payer(scheme.payer.id).await).is_empty());

    scheme.benefit(gold.id, "Dental", BenefitDistribution::Individual).await;
    scheme
        .service
        .add_plan(NewPlan {
            name: "Retail Silver".to_string(),
            plan_type: PlanType::Retail,
            access_mode: BenefitAccessMode::Cardless,
        })
        .await
        .unwrap();

    let plans = assert_ok!(scheme.service.plans_by_payer(scheme.payer.id).await);
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].id, scheme.policy.plan_id);

    let err = assert_err!(scheme.service.plans_by_payer(9_999).await);
    assert!(matches!(err, MembershipError::NotFound(_)));
}

#[tokio::test]
async fn test_member_search_matches_name_or_number_of_active_members() {
    let scheme = Scheme::setup().await;
    let gold = scheme.category("Gold").await;
    let mut request = scheme.member_request(gold.id, "LCT-2024-001", BeneficiaryType::Principal, Gender::Female, None);
    request.name = "Grace Achieng".to_string();
    let grace = scheme.service.add_beneficiary(request).await.unwrap();
    let other = scheme.principal(gold.id, "LCT-2024-002", Gender::Male).await;

    let by_name = assert_ok!(scheme.service.search_members("  achieng ").await);
    assert_eq!(by_name.iter().map(|m| m.id).collect::<Vec<_>>(), vec![grace.id]);

    let by_number = assert_ok!(scheme.service.search_members("lct-2024").await);
    assert_eq!(by_number.len(), 2);

    scheme.service.deactivate_member(other.id).await.unwrap();
    let active = assert_ok!(scheme.service.search_members("LCT-2024").await);
    assert_eq!(active.iter().map(|m| m.id).collect::<Vec<_>>(), vec![grace.id]);

    let err = assert_err!(scheme.service.search_members(" ab ").await);
    assert!(matches!(err, MembershipError::Validation(_)));
}

#[tokio::test]
async fn test_catalog_search_by_name() {
    let scheme = Scheme::setup().await;
    scheme
        .service
        .add_catalog_entries(vec![
            NewCatalogEntry {
                code: "OP".to_string(),
                name: "General Outpatient".to_string(),
                service_group: ServiceGroup::Outpatient,
            },
            NewCatalogEntry {
                code: "SOP".to_string(),
                name: "Specialist Outpatient".to_string(),
                service_group: ServiceGroup::Outpatient,
            },
            NewCatalogEntry {
                code: "IP".to_string(),
                name: "Inpatient".to_string(),
                service_group: ServiceGroup::Inpatient,
            },
        ])
        .await
        .unwrap();

    let found = assert_ok!(scheme.service.search_catalog("outpatient").await);
    assert_eq!(found.len(), 2);
    assert!(assert_ok!(scheme.service.search_catalog("dental").await).is_empty());
    assert!(matches!(
        scheme.service.search_catalog("  ").await,
        Err(MembershipError::Validation(_))
    ));
}
