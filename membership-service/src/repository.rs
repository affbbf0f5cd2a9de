pub mod postgres;

use crate::error::{MembershipError, MembershipResult};
use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use itertools::Itertools;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub use postgres::PgMembershipStore;

/// Payers, plans, policies, categories and the benefit catalog
#[async_trait]
pub trait SchemeRepository: Send + Sync {
    async fn insert_payer(&self, payer: Payer) -> MembershipResult<Payer>;
    async fn find_payer(&self, id: i64) -> MembershipResult<Option<Payer>>;
    /// Case-insensitive
    async fn find_payer_by_name(&self, name: &str) -> MembershipResult<Option<Payer>>;
    async fn list_payers(&self) -> MembershipResult<Vec<Payer>>;
    async fn payers_by_type(&self, payer_type: PayerType) -> MembershipResult<Vec<Payer>>;

    async fn insert_plan(&self, plan: Plan) -> MembershipResult<Plan>;
    async fn find_plan(&self, id: i64) -> MembershipResult<Option<Plan>>;
    /// Case-insensitive
    async fn find_plan_by_name(&self, name: &str) -> MembershipResult<Option<Plan>>;
    async fn list_plans(&self) -> MembershipResult<Vec<Plan>>;
    /// Plans with at least one benefit funded by the payer
    async fn plans_by_payer(&self, payer_id: i64) -> MembershipResult<Vec<Plan>>;

    async fn insert_policy(&self, policy: Policy) -> MembershipResult<Policy>;
    async fn find_policy(&self, id: i64) -> MembershipResult<Option<Policy>>;
    async fn find_policy_by_number(&self, policy_number: &str) -> MembershipResult<Option<Policy>>;
    async fn policies_by_plan(&self, plan_id: i64) -> MembershipResult<Vec<Policy>>;

    /// All-or-nothing batch insert
    async fn insert_categories(&self, categories: Vec<Category>) -> MembershipResult<Vec<Category>>;
    async fn find_category(&self, id: i64) -> MembershipResult<Option<Category>>;
    async fn categories_by_policy(&self, policy_id: i64) -> MembershipResult<Vec<Category>>;
    async fn set_category_status(&self, id: i64, status: CategoryStatus) -> MembershipResult<()>;

    async fn insert_catalog_entries(&self, entries: Vec<BenefitCatalog>) -> MembershipResult<Vec<BenefitCatalog>>;
    async fn find_catalog_entry(&self, id: i64) -> MembershipResult<Option<BenefitCatalog>>;
    /// Entry whose code or name matches, case-insensitive
    async fn find_catalog_by_code_or_name(&self, code: &str, name: &str) -> MembershipResult<Option<BenefitCatalog>>;
    async fn catalog_by_group(&self, group: ServiceGroup) -> MembershipResult<Vec<BenefitCatalog>>;
    /// Entries whose name contains `term`, case-insensitive
    async fn search_catalog(&self, term: &str) -> MembershipResult<Vec<BenefitCatalog>>;

    async fn insert_benefit_mapping(&self, mapping: PayerBenefitMapping) -> MembershipResult<PayerBenefitMapping>;
    async fn benefit_mappings_by_payer(&self, payer_id: i64) -> MembershipResult<Vec<PayerBenefitMapping>>;
    async fn find_benefit_mapping(&self, payer_id: i64, catalog_id: i64) -> MembershipResult<Option<PayerBenefitMapping>>;
}

#[async_trait]
pub trait BenefitRepository: Send + Sync {
    async fn insert_benefit(&self, benefit: Benefit) -> MembershipResult<Benefit>;
    async fn find_benefit(&self, id: i64) -> MembershipResult<Option<Benefit>>;
    async fn benefits_by_ids(&self, ids: &[i64]) -> MembershipResult<Vec<Benefit>>;
    async fn benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>>;
    async fn main_benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>>;
    async fn sub_benefits_of(&self, parent_id: i64) -> MembershipResult<Vec<Benefit>>;
    async fn unprocessed_main_benefits(&self, category_id: i64) -> MembershipResult<Vec<Benefit>>;
    async fn mark_benefit_processed(&self, id: i64, at: DateTime<Utc>) -> MembershipResult<()>;
}

#[async_trait]
pub trait BeneficiaryRepository: Send + Sync {
    async fn insert_beneficiary(&self, beneficiary: Beneficiary) -> MembershipResult<Beneficiary>;
    async fn find_beneficiary(&self, id: i64) -> MembershipResult<Option<Beneficiary>>;
    async fn find_member(&self, category_id: i64, member_number: &str) -> MembershipResult<Option<Beneficiary>>;
    async fn beneficiaries_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>>;
    async fn principals_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>>;
    async fn dependants_of(&self, principal_id: i64) -> MembershipResult<Vec<Beneficiary>>;
    async fn unprocessed_beneficiaries(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>>;
    async fn mark_beneficiaries_processed(&self, ids: &[i64], at: DateTime<Utc>) -> MembershipResult<()>;
    /// Overwrite every mutable column of an existing member
    async fn save_beneficiary(&self, beneficiary: &Beneficiary) -> MembershipResult<()>;
    async fn pending_suspensions(&self) -> MembershipResult<Vec<Beneficiary>>;
    /// Active members whose name or member number contains `term`, case-insensitive
    async fn search_members(&self, term: &str) -> MembershipResult<Vec<Beneficiary>>;
}

/// Shared-benefit trackers and entitlement receipts
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    async fn find_tracker(&self, beneficiary_id: i64, benefit_id: i64) -> MembershipResult<Option<SharedBenefitTracker>>;
    async fn insert_tracker(&self, tracker: SharedBenefitTracker) -> MembershipResult<SharedBenefitTracker>;
    async fn trackers_by_beneficiary(&self, beneficiary_id: i64) -> MembershipResult<Vec<SharedBenefitTracker>>;
    async fn has_receipt(&self, beneficiary_id: i64, benefit_id: i64) -> MembershipResult<bool>;
    async fn insert_receipts(&self, receipts: Vec<EntitlementReceipt>) -> MembershipResult<()>;
    async fn receipts_by_beneficiary(&self, beneficiary_id: i64) -> MembershipResult<Vec<EntitlementReceipt>>;
    /// Drop receipts of `beneficiary_ids` for `benefit_ids`, returning how many were removed
    async fn delete_receipts(&self, beneficiary_ids: &[i64], benefit_ids: &[i64]) -> MembershipResult<u64>;
    async fn delete_trackers(&self, beneficiary_id: i64, benefit_ids: &[i64]) -> MembershipResult<u64>;
}

/// Everything the service and processor need from storage
pub trait MembershipStore: SchemeRepository + BenefitRepository + BeneficiaryRepository + EntitlementRepository {}

impl<T> MembershipStore for T where T: SchemeRepository + BenefitRepository + BeneficiaryRepository + EntitlementRepository {}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory store for testing and development
pub struct InMemoryMembershipStore {
    sequence: Arc<AtomicI64>,
    payers: Arc<DashMap<i64, Payer>>,
    plans: Arc<DashMap<i64, Plan>>,
    policies: Arc<DashMap<i64, Policy>>,
    categories: Arc<DashMap<i64, Category>>,
    catalog: Arc<DashMap<i64, BenefitCatalog>>,
    mappings: Arc<DashMap<(i64, i64), PayerBenefitMapping>>,
    benefits: Arc<DashMap<i64, Benefit>>,
    beneficiaries: Arc<DashMap<i64, Beneficiary>>,
    trackers: Arc<DashMap<(i64, i64), SharedBenefitTracker>>,
    receipts: Arc<DashMap<(i64, i64), EntitlementReceipt>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self {
            sequence: Arc::new(AtomicI64::new(1)),
            payers: Arc::new(DashMap::new()),
            plans: Arc::new(DashMap::new()),
            policies: Arc::new(DashMap::new()),
            categories: Arc::new(DashMap::new()),
            catalog: Arc::new(DashMap::new()),
            mappings: Arc::new(DashMap::new()),
            benefits: Arc::new(DashMap::new()),
            beneficiaries: Arc::new(DashMap::new()),
            trackers: Arc::new(DashMap::new()),
            receipts: Arc::new(DashMap::new()),
        }
    }

    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    fn select<K, V, F>(table: &DashMap<K, V>, predicate: F) -> Vec<V>
    where
        K: std::hash::Hash + Eq,
        V: Clone + Keyed,
        F: Fn(&V) -> bool,
    {
        table
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .sorted_by_key(Keyed::key)
            .collect()
    }

    fn first<K, V, F>(table: &DashMap<K, V>, predicate: F) -> Option<V>
    where
        K: std::hash::Hash + Eq,
        V: Clone + Keyed,
        F: Fn(&V) -> bool,
    {
        Self::select(table, predicate).into_iter().next()
    }
}

impl Default for InMemoryMembershipStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Row id used to return rows in insertion order
trait Keyed {
    fn key(&self) -> i64;
}

macro_rules! keyed {
    ($($ty:ty),* $(,)?) => {
        $(impl Keyed for $ty {
            fn key(&self) -> i64 {
                self.id
            }
        })*
    };
}

keyed!(Payer, Plan, Policy, Category, BenefitCatalog, PayerBenefitMapping, Benefit, Beneficiary, SharedBenefitTracker, EntitlementReceipt);

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// `term` is expected lowercased
fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.to_lowercase().contains(term)
}

#[async_trait]
impl SchemeRepository for InMemoryMembershipStore {
    async fn insert_payer(&self, mut payer: Payer) -> MembershipResult<Payer> {
        payer.id = self.next_id();
        self.payers.insert(payer.id, payer.clone());
        Ok(payer)
    }

    async fn find_payer(&self, id: i64) -> MembershipResult<Option<Payer>> {
        Ok(self.payers.get(&id).map(|p| p.clone()))
    }

    async fn find_payer_by_name(&self, name: &str) -> MembershipResult<Option<Payer>> {
        Ok(Self::first(&self.payers, |p| same_name(&p.name, name)))
    }

    async fn list_payers(&self) -> MembershipResult<Vec<Payer>> {
        Ok(Self::select(&self.payers, |_| true))
    }

    async fn payers_by_type(&self, payer_type: PayerType) -> MembershipResult<Vec<Payer>> {
        Ok(Self::select(&self.payers, |p| p.payer_type == payer_type))
    }

    async fn insert_plan(&self, mut plan: Plan) -> MembershipResult<Plan> {
        plan.id = self.next_id();
        self.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn find_plan(&self, id: i64) -> MembershipResult<Option<Plan>> {
        Ok(self.plans.get(&id).map(|p| p.clone()))
    }

    async fn find_plan_by_name(&self, name: &str) -> MembershipResult<Option<Plan>> {
        Ok(Self::first(&self.plans, |p| same_name(&p.name, name)))
    }

    async fn list_plans(&self) -> MembershipResult<Vec<Plan>> {
        Ok(Self::select(&self.plans, |_| true))
    }

    async fn plans_by_payer(&self, payer_id: i64) -> MembershipResult<Vec<Plan>> {
        let plan_ids: HashSet<i64> = self
            .benefits
            .iter()
            .filter(|b| b.payer_id == payer_id)
            .filter_map(|b| self.categories.get(&b.category_id).map(|c| c.policy_id))
            .filter_map(|policy_id| self.policies.get(&policy_id).map(|p| p.plan_id))
            .collect();
        Ok(Self::select(&self.plans, |p| plan_ids.contains(&p.id)))
    }

    async fn insert_policy(&self, mut policy: Policy) -> MembershipResult<Policy> {
        policy.id = self.next_id();
        self.policies.insert(policy.id, policy.clone());
        Ok(policy)
    }

    async fn find_policy(&self, id: i64) -> MembershipResult<Option<Policy>> {
        Ok(self.policies.get(&id).map(|p| p.clone()))
    }

    async fn find_policy_by_number(&self, policy_number: &str) -> MembershipResult<Option<Policy>> {
        Ok(Self::first(&self.policies, |p| p.policy_number == policy_number))
    }

    async fn policies_by_plan(&self, plan_id: i64) -> MembershipResult<Vec<Policy>> {
        Ok(Self::select(&self.policies, |p| p.plan_id == plan_id))
    }

    async fn insert_categories(&self, categories: Vec<Category>) -> MembershipResult<Vec<Category>> {
        let saved: Vec<Category> = categories
            .into_iter()
            .map(|mut category| {
                category.id = self.next_id();
                category
            })
            .collect();
        for category in &saved {
            self.categories.insert(category.id, category.clone());
        }
        Ok(saved)
    }

    async fn find_category(&self, id: i64) -> MembershipResult<Option<Category>> {
        Ok(self.categories.get(&id).map(|c| c.clone()))
    }

    async fn categories_by_policy(&self, policy_id: i64) -> MembershipResult<Vec<Category>> {
        Ok(Self::select(&self.categories, |c| c.policy_id == policy_id))
    }

    async fn set_category_status(&self, id: i64, status: CategoryStatus) -> MembershipResult<()> {
        let mut category = self
            .categories
            .get_mut(&id)
            .ok_or_else(|| MembershipError::NotFound(format!("Category {id} not found")))?;
        category.status = status;
        Ok(())
    }

    async fn insert_catalog_entries(&self, entries: Vec<BenefitCatalog>) -> MembershipResult<Vec<BenefitCatalog>> {
        let saved: Vec<BenefitCatalog> = entries
            .into_iter()
            .map(|mut entry| {
                entry.id = self.next_id();
                entry
            })
            .collect();
        for entry in &saved {
            self.catalog.insert(entry.id, entry.clone());
        }
        Ok(saved)
    }

    async fn find_catalog_entry(&self, id: i64) -> MembershipResult<Option<BenefitCatalog>> {
        Ok(self.catalog.get(&id).map(|c| c.clone()))
    }

    async fn find_catalog_by_code_or_name(&self, code: &str, name: &str) -> MembershipResult<Option<BenefitCatalog>> {
        Ok(Self::first(&self.catalog, |c| same_name(&c.code, code) || same_name(&c.name, name)))
    }

    async fn catalog_by_group(&self, group: ServiceGroup) -> MembershipResult<Vec<BenefitCatalog>> {
        Ok(Self::select(&self.catalog, |c| c.service_group == group))
    }

    async fn search_catalog(&self, term: &str) -> MembershipResult<Vec<BenefitCatalog>> {
        let term = term.to_lowercase();
        Ok(Self::select(&self.catalog, |c| contains_term(&c.name, &term)))
    }

    async fn insert_benefit_mapping(&self, mut mapping: PayerBenefitMapping) -> MembershipResult<PayerBenefitMapping> {
        let key = (mapping.payer_id, mapping.catalog_id);
        if self.mappings.contains_key(&key) {
            return Err(MembershipError::Conflict(format!(
                "Payer {} already has a code for catalog entry {}",
                key.0, key.1
            )));
        }
        mapping.id = self.next_id();
        self.mappings.insert(key, mapping.clone());
        Ok(mapping)
    }

    async fn benefit_mappings_by_payer(&self, payer_id: i64) -> MembershipResult<Vec<PayerBenefitMapping>> {
        Ok(Self::select(&self.mappings, |m| m.payer_id == payer_id))
    }

    async fn find_benefit_mapping(&self, payer_id: i64, catalog_id: i64) -> MembershipResult<Option<PayerBenefitMapping>> {
        Ok(self.mappings.get(&(payer_id, catalog_id)).map(|m| m.clone()))
    }
}

#[async_trait]
impl BenefitRepository for InMemoryMembershipStore {
    async fn insert_benefit(&self, mut benefit: Benefit) -> MembershipResult<Benefit> {
        benefit.id = self.next_id();
        self.benefits.insert(benefit.id, benefit.clone());
        Ok(benefit)
    }

    async fn find_benefit(&self, id: i64) -> MembershipResult<Option<Benefit>> {
        Ok(self.benefits.get(&id).map(|b| b.clone()))
    }

    async fn benefits_by_ids(&self, ids: &[i64]) -> MembershipResult<Vec<Benefit>> {
        Ok(Self::select(&self.benefits, |b| ids.contains(&b.id)))
    }

    async fn benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(Self::select(&self.benefits, |b| b.category_id == category_id))
    }

    async fn main_benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(Self::select(&self.benefits, |b| b.category_id == category_id && b.is_main()))
    }

    async fn sub_benefits_of(&self, parent_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(Self::select(&self.benefits, |b| b.parent_id == Some(parent_id)))
    }

    async fn unprocessed_main_benefits(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(Self::select(&self.benefits, |b| {
            b.category_id == category_id && b.is_main() && !b.processed
        }))
    }

    async fn mark_benefit_processed(&self, id: i64, at: DateTime<Utc>) -> MembershipResult<()> {
        let mut benefit = self
            .benefits
            .get_mut(&id)
            .ok_or_else(|| MembershipError::NotFound(format!("Benefit {id} not found")))?;
        benefit.processed = true;
        benefit.processed_time = Some(at);
        Ok(())
    }
}

#[async_trait]
impl BeneficiaryRepository for InMemoryMembershipStore {
    async fn insert_beneficiary(&self, mut beneficiary: Beneficiary) -> MembershipResult<Beneficiary> {
        beneficiary.id = self.next_id();
        self.beneficiaries.insert(beneficiary.id, beneficiary.clone());
        Ok(beneficiary)
    }

    async fn find_beneficiary(&self, id: i64) -> MembershipResult<Option<Beneficiary>> {
        Ok(self.beneficiaries.get(&id).map(|b| b.clone()))
    }

    async fn find_member(&self, category_id: i64, member_number: &str) -> MembershipResult<Option<Beneficiary>> {
        Ok(Self::first(&self.beneficiaries, |b| {
            b.category_id == category_id && same_name(&b.member_number, member_number)
        }))
    }

    async fn beneficiaries_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(Self::select(&self.beneficiaries, |b| b.category_id == category_id))
    }

    async fn principals_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(Self::select(&self.beneficiaries, |b| {
            b.category_id == category_id && b.beneficiary_type == BeneficiaryType::Principal
        }))
    }

    async fn dependants_of(&self, principal_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(Self::select(&self.beneficiaries, |b| b.principal_id == Some(principal_id)))
    }

    async fn unprocessed_beneficiaries(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(Self::select(&self.beneficiaries, |b| b.category_id == category_id && !b.processed))
    }

    async fn mark_beneficiaries_processed(&self, ids: &[i64], at: DateTime<Utc>) -> MembershipResult<()> {
        for id in ids {
            if let Some(mut member) = self.beneficiaries.get_mut(id) {
                member.processed = true;
                member.processed_time = Some(at);
            }
        }
        Ok(())
    }

    async fn save_beneficiary(&self, beneficiary: &Beneficiary) -> MembershipResult<()> {
        let mut stored = self
            .beneficiaries
            .get_mut(&beneficiary.id)
            .ok_or_else(|| MembershipError::NotFound(format!("Beneficiary {} not found", beneficiary.id)))?;
        *stored = beneficiary.clone();
        Ok(())
    }

    async fn pending_suspensions(&self) -> MembershipResult<Vec<Beneficiary>> {
        Ok(Self::select(&self.beneficiaries, |b| b.pending_suspension_category_id.is_some()))
    }

    async fn search_members(&self, term: &str) -> MembershipResult<Vec<Beneficiary>> {
        let term = term.to_lowercase();
        Ok(Self::select(&self.beneficiaries, |b| {
            b.status == MemberStatus::Active
                && (contains_term(&b.name, &term) || contains_term(&b.member_number, &term))
        }))
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryMembershipStore {
    async fn find_tracker(&self, beneficiary_id: i64, benefit_id: i64) -> MembershipResult<Option<SharedBenefitTracker>> {
        Ok(self.trackers.get(&(beneficiary_id, benefit_id)).map(|t| t.clone()))
    }

    async fn insert_tracker(&self, mut tracker: SharedBenefitTracker) -> MembershipResult<SharedBenefitTracker> {
        let key = (tracker.beneficiary_id, tracker.benefit_id);
        if self.trackers.contains_key(&key) {
            return Err(MembershipError::Conflict(format!(
                "Tracker for beneficiary {} and benefit {} already exists",
                key.0, key.1
            )));
        }
        tracker.id = self.next_id();
        self.trackers.insert(key, tracker.clone());
        Ok(tracker)
    }

    async fn trackers_by_beneficiary(&self, beneficiary_id: i64) -> MembershipResult<Vec<SharedBenefitTracker>> {
        Ok(Self::select(&self.trackers, |t| t.beneficiary_id == beneficiary_id))
    }

    async fn has_receipt(&self, beneficiary_id: i64, benefit_id: i64) -> MembershipResult<bool> {
        Ok(self.receipts.contains_key(&(beneficiary_id, benefit_id)))
    }

    async fn insert_receipts(&self, receipts: Vec<EntitlementReceipt>) -> MembershipResult<()> {
        for mut receipt in receipts {
            let key = (receipt.beneficiary_id, receipt.benefit_id);
            if !self.receipts.contains_key(&key) {
                receipt.id = self.next_id();
                self.receipts.insert(key, receipt);
            }
        }
        Ok(())
    }

    async fn receipts_by_beneficiary(&self, beneficiary_id: i64) -> MembershipResult<Vec<EntitlementReceipt>> {
        Ok(Self::select(&self.receipts, |r| r.beneficiary_id == beneficiary_id))
    }

    async fn delete_receipts(&self, beneficiary_ids: &[i64], benefit_ids: &[i64]) -> MembershipResult<u64> {
        let mut removed = 0;
        self.receipts.retain(|(beneficiary_id, benefit_id), _| {
            let matched = beneficiary_ids.contains(beneficiary_id) && benefit_ids.contains(benefit_id);
            removed += u64::from(matched);
            !matched
        });
        Ok(removed)
    }

    async fn delete_trackers(&self, beneficiary_id: i64, benefit_ids: &[i64]) -> MembershipResult<u64> {
        let mut removed = 0;
        self.trackers.retain(|(owner_id, benefit_id), _| {
            let matched = *owner_id == beneficiary_id && benefit_ids.contains(benefit_id);
            removed += u64::from(matched);
            !matched
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::fixtures::{benefit, member};

    #[tokio::test]
    async fn test_in_memory_unprocessed_queries() {
        let store = InMemoryMembershipStore::new();

        let main = store.insert_benefit(benefit(0, None)).await.unwrap();
        let _sub = store.insert_benefit(benefit(0, Some(main.id))).await.unwrap();

        let pending = store.unprocessed_main_benefits(1).await.unwrap();
        assert_eq!(pending.len(), 1);

        store.mark_benefit_processed(main.id, Utc::now()).await.unwrap();
        assert!(store.unprocessed_main_benefits(1).await.unwrap().is_empty());
        assert_eq!(store.sub_benefits_of(main.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_member_lookup_is_case_insensitive() {
        let store = InMemoryMembershipStore::new();
        let mut principal = member(0, BeneficiaryType::Principal, Gender::Male, None);
        principal.member_number = "lct-001".to_string();
        let saved = store.insert_beneficiary(principal).await.unwrap();

        let found = store.find_member(1, "LCT-001").await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(saved.id));
    }

    #[tokio::test]
    async fn test_tracker_is_unique_per_member_and_benefit() {
        let store = InMemoryMembershipStore::new();
        let tracker = SharedBenefitTracker {
            id: 0,
            beneficiary_id: 1,
            benefit_id: 2,
            aggregate_id: "agg".to_string(),
            created_at: Utc::now(),
        };
        store.insert_tracker(tracker.clone()).await.unwrap();
        assert!(matches!(store.insert_tracker(tracker).await, Err(MembershipError::Conflict(_))));
    }
}
