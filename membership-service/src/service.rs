use crate::config::MembershipConfig;
use crate::entitlement::BenefitStatusRequest;
use crate::error::{MembershipError, MembershipResult};
use crate::models::*;
use crate::processing::{BenefitProcessor, ChangeCategorySummary, ProcessingSummary, SuspensionRetrySummary};
use crate::publisher::{BenefitPublisher, HttpBenefitPublisher};
use crate::repository::{InMemoryMembershipStore, MembershipStore, PgMembershipStore};
use crate::validation;
use chrono::Utc;
use itertools::Itertools;
use logger_redacted::redacted_info;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Shortest member search term accepted
pub const MIN_MEMBER_SEARCH_LENGTH: usize = 3;

/// Everything recorded as published for one member
#[derive(Debug, Clone, Serialize)]
pub struct MemberEntitlements {
    pub beneficiary_id: i64,
    pub receipts: Vec<EntitlementReceipt>,
    pub trackers: Vec<SharedBenefitTracker>,
}

/// Membership administration service
///
/// Owns scheme setup (payers, plans, policies, categories, catalog), benefit
/// and beneficiary registration, and delegates entitlement generation to
/// [`BenefitProcessor`].
pub struct MembershipService {
    store: Arc<dyn MembershipStore>,
    publisher: Arc<dyn BenefitPublisher>,
    processor: BenefitProcessor,
}

impl MembershipService {
    pub fn new(store: Arc<dyn MembershipStore>, publisher: Arc<dyn BenefitPublisher>) -> Self {
        let processor = BenefitProcessor::new(store.clone(), publisher.clone());
        Self {
            store,
            publisher,
            processor,
        }
    }

    /// Build the store and publisher described by `config`.
    ///
    /// Without a `database_url` the service runs on the in-memory store.
    pub async fn from_config(config: &MembershipConfig) -> MembershipResult<Self> {
        let store: Arc<dyn MembershipStore> = match &config.database_url {
            Some(url) => {
                let store = PgMembershipStore::from_connection_string(url).await?;
                if config.run_migrations {
                    store.migrate().await?;
                }
                info!("Using PostgreSQL membership store");
                Arc::new(store)
            }
            None => {
                warn!("No database_url configured, using in-memory membership store");
                Arc::new(InMemoryMembershipStore::new())
            }
        };
        let publisher = Arc::new(HttpBenefitPublisher::new(config.downstream.clone())?);
        Ok(Self::new(store, publisher))
    }

    pub fn store(&self) -> &Arc<dyn MembershipStore> {
        &self.store
    }

    pub fn processor(&self) -> &BenefitProcessor {
        &self.processor
    }

    // ========================================================================
    // PAYERS
    // ========================================================================

    pub async fn add_payer(&self, request: NewPayer) -> MembershipResult<Payer> {
        request.validate()?;
        let name = request.name.split_whitespace().join(" ");
        validation::validate_not_blank("Payer name", &name)?;

        if self.store.find_payer_by_name(&name).await?.is_some() {
            return Err(MembershipError::Conflict(format!("Payer {name} already exists")));
        }

        let payer = self
            .store
            .insert_payer(Payer {
                id: 0,
                name,
                contact: request.contact,
                payer_type: request.payer_type,
                created_at: Utc::now(),
            })
            .await?;
        info!(payer_id = payer.id, payer_type = ?payer.payer_type, "Payer added");
        Ok(payer)
    }

    pub async fn list_payers(&self) -> MembershipResult<Vec<Payer>> {
        self.store.list_payers().await
    }

    pub async fn find_payer(&self, id: i64) -> MembershipResult<Payer> {
        self.store
            .find_payer(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Payer {id} not found")))
    }

    pub async fn payers_by_type(&self, payer_type: PayerType) -> MembershipResult<Vec<Payer>> {
        self.store.payers_by_type(payer_type).await
    }

    /// Record the code a payer uses for a catalog entry. One code per payer and entry.
    pub async fn add_benefit_mapping(&self, request: NewPayerBenefitMapping) -> MembershipResult<PayerBenefitMapping> {
        request.validate()?;
        let code = request.code.trim().to_string();
        validation::validate_not_blank("Benefit code", &code)?;

        let payer = self
            .store
            .find_payer(request.payer_id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("No payer with ID {} was found", request.payer_id)))?;
        let catalog = self.find_catalog_entry(request.catalog_id).await?;

        if let Some(existing) = self.store.find_benefit_mapping(payer.id, catalog.id).await? {
            return Err(MembershipError::Conflict(format!(
                "{} already maps {} to code {}",
                payer.name, catalog.name, existing.code
            )));
        }

        let mapping = self
            .store
            .insert_benefit_mapping(PayerBenefitMapping {
                id: 0,
                payer_id: payer.id,
                catalog_id: catalog.id,
                code,
            })
            .await?;
        info!(payer_id = payer.id, catalog_id = catalog.id, "Payer benefit code added");
        Ok(mapping)
    }

    pub async fn benefit_mappings_of(&self, payer_id: i64) -> MembershipResult<Vec<PayerBenefitMapping>> {
        self.find_payer(payer_id).await?;
        self.store.benefit_mappings_by_payer(payer_id).await
    }

    /// The payer's code for the catalog entry behind `benefit_id`, if one is mapped
    pub async fn benefit_code(&self, payer_id: i64, benefit_id: i64) -> MembershipResult<Option<PayerBenefitMapping>> {
        self.find_payer(payer_id).await?;
        let benefit = self
            .store
            .find_benefit(benefit_id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("No benefit with ID {benefit_id} was found")))?;
        self.store.find_benefit_mapping(payer_id, benefit.catalog_id).await
    }

    /// Funding payer of each known benefit; unknown ids are skipped
    pub async fn payers_of_benefits(&self, benefit_ids: &[i64]) -> MembershipResult<Vec<BenefitPayer>> {
        let benefits = self.store.benefits_by_ids(benefit_ids).await?;
        let mut payers = HashMap::new();
        let payer_ids: Vec<i64> = benefits.iter().map(|b| b.payer_id).unique().collect();
        for payer_id in payer_ids {
            payers.insert(payer_id, self.find_payer(payer_id).await?);
        }

        Ok(benefits
            .into_iter()
            .filter_map(|benefit| {
                payers.get(&benefit.payer_id).map(|payer| BenefitPayer {
                    benefit_id: benefit.id,
                    benefit_name: benefit.name,
                    payer: payer.clone(),
                })
            })
            .collect())
    }

    // ========================================================================
    // PLANS AND POLICIES
    // ========================================================================

    pub async fn add_plan(&self, request: NewPlan) -> MembershipResult<Plan> {
        request.validate()?;
        let name = request.name.trim().to_string();
        validation::validate_not_blank("Plan name", &name)?;

        if self.store.find_plan_by_name(&name).await?.is_some() {
            return Err(MembershipError::Conflict(format!("Plan [{name}] already exists")));
        }

        let plan = self
            .store
            .insert_plan(Plan {
                id: 0,
                name,
                plan_type: request.plan_type,
                access_mode: request.access_mode,
                created_at: Utc::now(),
            })
            .await?;
        info!(plan_id = plan.id, "Plan added");
        Ok(plan)
    }

    pub async fn list_plans(&self) -> MembershipResult<Vec<Plan>> {
        self.store.list_plans().await
    }

    pub async fn find_plan(&self, id: i64) -> MembershipResult<Plan> {
        self.store
            .find_plan(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Plan {id} not found")))
    }

    /// Plans under which the payer funds at least one benefit
    pub async fn plans_by_payer(&self, payer_id: i64) -> MembershipResult<Vec<Plan>> {
        self.find_payer(payer_id).await?;
        self.store.plans_by_payer(payer_id).await
    }

    /// Scheme plans may not carry two policies with overlapping periods
    pub async fn add_policy(&self, request: NewPolicy) -> MembershipResult<Policy> {
        request.validate()?;
        validation::validate_policy_dates(request.start_date, request.end_date)?;

        let plan = self.find_plan(request.plan_id).await?;
        let policy_number = request.policy_number.trim().to_string();
        if self.store.find_policy_by_number(&policy_number).await?.is_some() {
            return Err(MembershipError::Conflict(format!(
                "Policy number {policy_number} already exists"
            )));
        }

        if plan.plan_type == PlanType::Scheme {
            let existing = self.store.policies_by_plan(plan.id).await?;
            if let Some(clash) = existing.iter().find(|p| {
                validation::periods_overlap(p.start_date, p.end_date, request.start_date, request.end_date)
            }) {
                return Err(MembershipError::Validation(format!(
                    "Policy period overlaps with existing policy {}",
                    clash.policy_number
                )));
            }
        }

        let policy = self
            .store
            .insert_policy(Policy {
                id: 0,
                plan_id: plan.id,
                policy_number,
                start_date: request.start_date,
                end_date: request.end_date,
                created_at: Utc::now(),
            })
            .await?;
        info!(policy_id = policy.id, plan_id = plan.id, "Policy added");
        Ok(policy)
    }

    pub async fn policies_by_plan(&self, plan_id: i64) -> MembershipResult<Vec<Policy>> {
        self.find_plan(plan_id).await?;
        self.store.policies_by_plan(plan_id).await
    }

    pub async fn find_policy(&self, id: i64) -> MembershipResult<Policy> {
        self.store
            .find_policy(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Policy {id} not found")))
    }

    // ========================================================================
    // CATEGORIES
    // ========================================================================

    /// Add several categories to a policy. Either all are saved or none.
    pub async fn add_categories(&self, request: NewCategories) -> MembershipResult<Vec<Category>> {
        let policy = self.find_policy(request.policy_id).await?;
        if request.categories.is_empty() {
            return Err(MembershipError::Validation("At least one category is required".to_string()));
        }

        let existing: HashSet<String> = self
            .store
            .categories_by_policy(policy.id)
            .await?
            .into_iter()
            .map(|c| c.name.to_lowercase())
            .collect();

        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(request.categories.len());
        for new in request.categories {
            let name = new.name.trim().to_string();
            validation::validate_not_blank("Category name", &name)?;
            let key = name.to_lowercase();
            if existing.contains(&key) || !seen.insert(key) {
                return Err(MembershipError::Conflict(format!(
                    "Category {name} already exists for policy {}",
                    policy.policy_number
                )));
            }
            categories.push(Category {
                id: 0,
                policy_id: policy.id,
                name,
                description: new.description,
                status: CategoryStatus::Unprocessed,
                jic_scheme_code: new.jic_scheme_code,
                apa_scheme_code: new.apa_scheme_code,
                policy_payer_code: new.policy_payer_code,
                created_at: Utc::now(),
            });
        }

        let saved = self.store.insert_categories(categories).await?;
        info!(policy_id = policy.id, count = saved.len(), "Categories added");
        Ok(saved)
    }

    pub async fn categories_by_policy(&self, policy_id: i64) -> MembershipResult<Vec<Category>> {
        self.find_policy(policy_id).await?;
        self.store.categories_by_policy(policy_id).await
    }

    pub async fn find_category(&self, id: i64) -> MembershipResult<Category> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Category {id} not found")))
    }

    // ========================================================================
    // BENEFIT CATALOG
    // ========================================================================

    pub async fn add_catalog_entry(&self, request: NewCatalogEntry) -> MembershipResult<BenefitCatalog> {
        self.add_catalog_entries(vec![request])
            .await?
            .pop()
            .ok_or_else(|| MembershipError::Storage("Catalog insert returned no rows".to_string()))
    }

    /// Codes and names are unique across the catalog, case-insensitive
    pub async fn add_catalog_entries(&self, requests: Vec<NewCatalogEntry>) -> MembershipResult<Vec<BenefitCatalog>> {
        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        let mut entries = Vec::with_capacity(requests.len());

        for request in requests {
            request.validate()?;
            let code = request.code.trim().to_string();
            let name = request.name.split_whitespace().join(" ");

            let duplicate_in_batch = !codes.insert(code.to_lowercase()) || !names.insert(name.to_lowercase());
            if duplicate_in_batch || self.store.find_catalog_by_code_or_name(&code, &name).await?.is_some() {
                return Err(MembershipError::Conflict(format!(
                    "Catalog entry {code} ({name}) already exists"
                )));
            }
            entries.push(BenefitCatalog {
                id: 0,
                code,
                name,
                service_group: request.service_group,
            });
        }

        self.store.insert_catalog_entries(entries).await
    }

    pub async fn catalog_by_group(&self, group: ServiceGroup) -> MembershipResult<Vec<BenefitCatalog>> {
        self.store.catalog_by_group(group).await
    }

    pub async fn find_catalog_entry(&self, id: i64) -> MembershipResult<BenefitCatalog> {
        self.store
            .find_catalog_entry(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Catalog entry {id} not found")))
    }

    /// Catalog entries whose name contains `term`
    pub async fn search_catalog(&self, term: &str) -> MembershipResult<Vec<BenefitCatalog>> {
        let term = term.trim();
        validation::validate_not_blank("Search term", term)?;
        self.store.search_catalog(term).await
    }

    // ========================================================================
    // BENEFITS
    // ========================================================================

    #[instrument(skip(self, request), fields(category_id = request.category_id, name = %request.name))]
    pub async fn add_benefit(&self, request: NewBenefit) -> MembershipResult<Benefit> {
        request.validate()?;
        let category = self.find_category(request.category_id).await?;
        self.find_payer(request.payer_id).await?;
        let catalog = self.find_catalog_entry(request.catalog_id).await?;

        let parent = match request.parent_id {
            Some(parent_id) => Some(
                self.store
                    .find_benefit(parent_id)
                    .await?
                    .ok_or_else(|| MembershipError::NotFound(format!("Parent benefit {parent_id} not found")))?,
            ),
            None => None,
        };

        let name = request.name.trim().to_string();
        let existing = self.store.benefits_by_category(category.id).await?;
        if existing.iter().any(|b| b.name.to_lowercase() == name.to_lowercase()) {
            return Err(MembershipError::Conflict(format!(
                "Benefit [{name}] already exists for this category"
            )));
        }
        if existing.iter().any(|b| b.catalog_id == catalog.id) {
            return Err(MembershipError::Conflict(format!(
                "{} has already been setup for this category",
                catalog.name
            )));
        }

        let co_payment_amount = if request.co_payment_required {
            request.co_payment_amount
        } else {
            Decimal::ZERO
        };

        let benefit = Benefit {
            id: 0,
            category_id: category.id,
            parent_id: request.parent_id,
            catalog_id: catalog.id,
            payer_id: request.payer_id,
            name,
            limit: request.limit,
            suspension_threshold: request.suspension_threshold,
            applicable_gender: request.applicable_gender,
            applicable_member: request.applicable_member,
            sharing: request.sharing,
            co_payment_required: request.co_payment_required,
            co_payment_amount,
            pre_auth_type: request.pre_auth_type,
            waiting_period: request.waiting_period,
            processed: false,
            processed_time: None,
            created_at: Utc::now(),
        };
        validation::validate_benefit(&benefit, parent.as_ref())?;

        let benefit = self.store.insert_benefit(benefit).await?;
        if benefit.is_main() {
            self.reopen(&category).await?;
        }
        info!(benefit_id = benefit.id, main = benefit.is_main(), "Benefit added");
        Ok(benefit)
    }

    pub async fn benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        self.find_category(category_id).await?;
        self.store.benefits_by_category(category_id).await
    }

    pub async fn main_benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        self.find_category(category_id).await?;
        self.store.main_benefits_by_category(category_id).await
    }

    // ========================================================================
    // BENEFICIARIES
    // ========================================================================

    #[instrument(skip(self, request), fields(category_id = request.category_id))]
    pub async fn add_beneficiary(&self, request: NewBeneficiary) -> MembershipResult<Beneficiary> {
        request.validate()?;
        let category = self.find_category(request.category_id).await?;

        let member_number = request.member_number.trim().to_string();
        if self.store.find_member(category.id, &member_number).await?.is_some() {
            return Err(MembershipError::Conflict(format!(
                "Member number {member_number} already exists in category {}",
                category.name
            )));
        }

        let principal = match request.principal_id {
            Some(id) => self.store.find_beneficiary(id).await?,
            None => None,
        };

        let beneficiary = Beneficiary {
            id: 0,
            category_id: category.id,
            principal_id: request.principal_id,
            name: request.name.trim().to_string(),
            member_number,
            beneficiary_type: request.beneficiary_type,
            gender: request.gender,
            dob: request.dob,
            phone_number: request.phone_number,
            email: request.email,
            nhif_number: request.nhif_number,
            jic_entity_id: request.jic_entity_id,
            apa_entity_id: request.apa_entity_id,
            status: MemberStatus::Active,
            processed: false,
            processed_time: None,
            pending_suspension_category_id: None,
            created_at: Utc::now(),
        };
        validation::validate_beneficiary(&beneficiary, principal.as_ref(), Utc::now().date_naive())?;

        let beneficiary = self.store.insert_beneficiary(beneficiary).await?;
        self.reopen(&category).await?;
        info!(
            beneficiary_id = beneficiary.id,
            beneficiary_type = ?beneficiary.beneficiary_type,
            "Beneficiary added"
        );
        Ok(beneficiary)
    }

    pub async fn find_beneficiary(&self, id: i64) -> MembershipResult<Beneficiary> {
        self.store
            .find_beneficiary(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Beneficiary {id} not found")))
    }

    pub async fn beneficiaries_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        self.find_category(category_id).await?;
        self.store.beneficiaries_by_category(category_id).await
    }

    pub async fn principals_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        self.find_category(category_id).await?;
        self.store.principals_by_category(category_id).await
    }

    /// Active members whose name or member number contains `term`
    pub async fn search_members(&self, term: &str) -> MembershipResult<Vec<Beneficiary>> {
        let term = term.trim();
        if term.chars().count() < MIN_MEMBER_SEARCH_LENGTH {
            return Err(MembershipError::Validation(format!(
                "Search term must be at least {MIN_MEMBER_SEARCH_LENGTH} characters"
            )));
        }
        self.store.search_members(term).await
    }

    /// Principal followed by their dependants
    pub async fn family_of(&self, principal_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        let principal = self.find_beneficiary(principal_id).await?;
        if principal.principal_id.is_some() {
            return Err(MembershipError::Validation(format!(
                "Beneficiary {} is not a principal",
                principal.member_number
            )));
        }
        let mut family = vec![principal];
        family.extend(self.store.dependants_of(principal_id).await?);
        Ok(family)
    }

    pub async fn update_member(&self, id: i64, update: MemberUpdate) -> MembershipResult<Beneficiary> {
        update.validate()?;
        let mut member = self.find_beneficiary(id).await?;

        if let Some(name) = update.name {
            member.name = name.trim().to_string();
        }
        if let Some(dob) = update.dob {
            if dob > Utc::now().date_naive() {
                return Err(MembershipError::Validation("Date of birth cannot be in the future".to_string()));
            }
            member.dob = dob;
        }
        if update.phone_number.is_some() || update.email.is_some() {
            if update.phone_number.is_some() {
                member.phone_number = update.phone_number;
            }
            if update.email.is_some() {
                member.email = update.email;
            }
            redacted_info!(
                "Contact details of {} updated to {} / {}",
                member.member_number,
                member.email.as_deref().unwrap_or("-"),
                member.phone_number.as_deref().unwrap_or("-")
            );
        }

        self.store.save_beneficiary(&member).await?;
        Ok(member)
    }

    /// Reactivate a member's benefits downstream, then locally
    pub async fn activate_member(&self, id: i64) -> MembershipResult<Beneficiary> {
        self.set_member_status(id, MemberStatus::Active).await
    }

    pub async fn deactivate_member(&self, id: i64) -> MembershipResult<Beneficiary> {
        self.set_member_status(id, MemberStatus::Inactive).await
    }

    async fn set_member_status(&self, id: i64, status: MemberStatus) -> MembershipResult<Beneficiary> {
        let mut member = self.find_beneficiary(id).await?;
        let request = BenefitStatusRequest {
            beneficiary_id: member.id,
            category_id: member.category_id,
        };
        match status {
            MemberStatus::Active => self.publisher.activate_benefits(&request).await?,
            MemberStatus::Inactive => self.publisher.deactivate_benefits(&request).await?,
        }

        member.status = status;
        self.store.save_beneficiary(&member).await?;
        info!(beneficiary_id = id, status = ?status, "Member status changed");
        Ok(member)
    }

    pub async fn entitlements_of(&self, beneficiary_id: i64) -> MembershipResult<MemberEntitlements> {
        self.find_beneficiary(beneficiary_id).await?;
        Ok(MemberEntitlements {
            beneficiary_id,
            receipts: self.store.receipts_by_beneficiary(beneficiary_id).await?,
            trackers: self.store.trackers_by_beneficiary(beneficiary_id).await?,
        })
    }

    // ========================================================================
    // PROCESSING
    // ========================================================================

    pub async fn process_category(&self, category_id: i64) -> MembershipResult<ProcessingSummary> {
        self.processor.process_category(category_id).await
    }

    pub async fn change_category(&self, request: ChangeCategoryRequest) -> MembershipResult<ChangeCategorySummary> {
        self.processor.change_category(&request).await
    }

    pub async fn retry_pending_suspensions(&self) -> MembershipResult<SuspensionRetrySummary> {
        self.processor.retry_pending_suspensions().await
    }

    /// New work in a processed category drops it back to partially processed
    async fn reopen(&self, category: &Category) -> MembershipResult<()> {
        if category.status == CategoryStatus::Processed {
            self.store
                .set_category_status(category.id, CategoryStatus::PartiallyProcessed)
                .await?;
            info!(category_id = category.id, "Category reopened for processing");
        }
        Ok(())
    }
}
