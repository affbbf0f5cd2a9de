//! Benefit processing orchestrator
//!
//! Drives a category through entitlement generation:
//! - partitions beneficiaries into families (principal plus dependants)
//! - evaluates every family member against each main benefit
//! - publishes one payload per member (INDIVIDUAL) or per family (FAMILY)
//! - records receipts, trackers and processed flags only after the downstream acknowledges
//!
//! The first pass, the incremental pass and change of category all go through
//! [`BenefitProcessor::run_family_pass`].

use crate::eligibility;
use crate::entitlement::{BenefitStatusRequest, EntitlementBuilder, EntitlementPayload};
use crate::error::{MembershipError, MembershipResult};
use crate::models::*;
use crate::publisher::BenefitPublisher;
use crate::repository::MembershipStore;
use crate::validation;
use chrono::Utc;
use dashmap::DashMap;
use itertools::Itertools;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// In-process registry allowing one orchestrator run per category at a time
#[derive(Clone, Default)]
pub struct CategoryLocks {
    inner: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl CategoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails fast instead of queueing behind a running pass. Callers check the
    /// category exists first so the registry only holds real category ids.
    pub fn try_acquire(&self, category_id: i64) -> MembershipResult<OwnedMutexGuard<()>> {
        let lock = self.inner.entry(category_id).or_default().value().clone();
        lock.try_lock_owned()
            .map_err(|_| MembershipError::ProcessingInProgress(category_id))
    }

    /// Number of categories with a registered lock
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A principal and the dependants registered under them
#[derive(Debug, Clone, PartialEq)]
pub struct Family {
    pub principal_id: i64,
    /// Principal first, then dependants by id
    pub members: Vec<Beneficiary>,
}

impl Family {
    pub fn has_unprocessed(&self) -> bool {
        self.members.iter().any(|m| !m.processed)
    }

    fn unprocessed_ids(&self) -> Vec<i64> {
        self.members.iter().filter(|m| !m.processed).map(|m| m.id).collect()
    }
}

/// Partition members of one category into families, ordered by principal id
pub fn group_families(members: Vec<Beneficiary>) -> Vec<Family> {
    members
        .into_iter()
        .into_group_map_by(Beneficiary::family_id)
        .into_iter()
        .sorted_by_key(|(principal_id, _)| *principal_id)
        .map(|(principal_id, mut members)| {
            members.sort_by_key(|m| (m.beneficiary_type != BeneficiaryType::Principal, m.id));
            Family { principal_id, members }
        })
        .collect()
}

/// Which processed flags a pass is allowed to set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOptions {
    pub mark_benefits: bool,
    pub mark_members: bool,
}

impl PassOptions {
    pub const FULL: Self = Self { mark_benefits: true, mark_members: true };
    pub const BENEFITS_ONLY: Self = Self { mark_benefits: true, mark_members: false };
    pub const MEMBERS_ONLY: Self = Self { mark_benefits: false, mark_members: true };
    pub const NONE: Self = Self { mark_benefits: false, mark_members: false };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishFailure {
    pub benefit_id: i64,
    pub benefit_name: String,
    pub principal_id: i64,
    pub member_numbers: Vec<String>,
    pub reason: String,
}

/// Accumulated result of one or more family passes
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassOutcome {
    pub published: usize,
    pub failures: Vec<PublishFailure>,
}

impl PassOutcome {
    /// Whether the family's unit for this benefit already failed in this run
    fn has_failed(&self, principal_id: i64, benefit_id: i64) -> bool {
        self.failures
            .iter()
            .any(|f| f.principal_id == principal_id && f.benefit_id == benefit_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    pub category_id: i64,
    pub category_name: String,
    pub status: CategoryStatus,
    pub published: usize,
    pub failures: Vec<PublishFailure>,
}

impl ProcessingSummary {
    pub fn message(&self) -> String {
        format!("Completed processing benefits for category {}", self.category_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeCategorySummary {
    pub old_category_id: i64,
    pub new_category_id: i64,
    pub moved_members: Vec<String>,
    pub published: usize,
    pub failures: Vec<PublishFailure>,
    /// Members whose old-category suspension must be retried
    pub pending_suspensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuspensionRetrySummary {
    pub attempted: usize,
    pub cleared: Vec<String>,
    pub still_pending: Vec<String>,
}

/// Shared inputs of a family pass over one category
pub struct PassContext<'a> {
    builder: EntitlementBuilder<'a>,
    payers: &'a HashMap<i64, Payer>,
}

pub struct BenefitProcessor {
    store: Arc<dyn MembershipStore>,
    publisher: Arc<dyn BenefitPublisher>,
    locks: CategoryLocks,
}

impl BenefitProcessor {
    pub fn new(store: Arc<dyn MembershipStore>, publisher: Arc<dyn BenefitPublisher>) -> Self {
        Self {
            store,
            publisher,
            locks: CategoryLocks::new(),
        }
    }

    pub fn locks(&self) -> &CategoryLocks {
        &self.locks
    }

    /// Generate and publish entitlements for everything still pending in a category
    #[instrument(skip(self))]
    pub async fn process_category(&self, category_id: i64) -> MembershipResult<ProcessingSummary> {
        self.require_category(category_id).await?;
        let _guard = self.locks.try_acquire(category_id)?;

        // Re-read under the lock; a run that just finished may have moved the status
        let category = self.require_category(category_id).await?;
        let policy = self.require_policy(category.policy_id).await?;
        let trees = self.load_trees(&category, &policy).await?;
        let payers = self.load_payers(&trees).await?;
        let families = group_families(self.store.beneficiaries_by_category(category_id).await?);

        let ctx = PassContext {
            builder: EntitlementBuilder::new(&policy, &category),
            payers: &payers,
        };
        let all_families: Vec<&Family> = families.iter().collect();
        let pending: Vec<&BenefitTree> = trees.iter().filter(|t| !t.main.processed).collect();
        let mut outcome = PassOutcome::default();

        if category.status == CategoryStatus::Unprocessed {
            info!(
                category_id,
                families = families.len(),
                benefits = pending.len(),
                "Running first benefit pass"
            );
            self.run_family_pass(&all_families, &pending, &ctx, PassOptions::FULL, &mut outcome)
                .await?;
        } else {
            if !pending.is_empty() {
                info!(category_id, benefits = pending.len(), "Entitling all families to new benefits");
                self.run_family_pass(&all_families, &pending, &ctx, PassOptions::BENEFITS_ONLY, &mut outcome)
                    .await?;
            }

            let touched: Vec<&Family> = families.iter().filter(|f| f.has_unprocessed()).collect();
            if !touched.is_empty() {
                info!(category_id, families = touched.len(), "Entitling new members");
                let all_trees: Vec<&BenefitTree> = trees.iter().collect();
                self.run_family_pass(&touched, &all_trees, &ctx, PassOptions::MEMBERS_ONLY, &mut outcome)
                    .await?;
            }
        }

        let status = self.refresh_status(&category).await?;
        info!(
            category_id,
            published = outcome.published,
            failed = outcome.failures.len(),
            status = ?status,
            "Benefit processing finished"
        );

        Ok(ProcessingSummary {
            category_id,
            category_name: category.name,
            status,
            published: outcome.published,
            failures: outcome.failures,
        })
    }

    /// Move a family to another category: entitle it there, then suspend the old benefits
    #[instrument(skip(self, request), fields(member_number = %request.member_number))]
    pub async fn change_category(&self, request: &ChangeCategoryRequest) -> MembershipResult<ChangeCategorySummary> {
        let old = self.store.find_category(request.old_category_id).await?.ok_or_else(|| {
            MembershipError::NotFound(format!(
                "No previous category with ID {} was found",
                request.old_category_id
            ))
        })?;
        let new = self.store.find_category(request.new_category_id).await?.ok_or_else(|| {
            MembershipError::NotFound(format!("No new category with ID {} was found", request.new_category_id))
        })?;
        if old.id == new.id {
            return Err(MembershipError::Validation(format!(
                "Member {} is already in category {}",
                request.member_number, new.name
            )));
        }

        let _new_guard = self.locks.try_acquire(new.id)?;
        let _old_guard = self.locks.try_acquire(old.id)?;

        let family = self.load_family(&old, &request.member_number).await?;
        let member_ids: Vec<i64> = family.members.iter().map(|m| m.id).collect();
        for member in &family.members {
            if self.store.find_member(new.id, &member.member_number).await?.is_some() {
                return Err(MembershipError::Conflict(format!(
                    "Member number {} already exists in category {}",
                    member.member_number, new.name
                )));
            }
        }

        let policy = self.require_policy(new.policy_id).await?;
        let trees = self.load_trees(&new, &policy).await?;
        let payers = self.load_payers(&trees).await?;
        let ctx = PassContext {
            builder: EntitlementBuilder::new(&policy, &new),
            payers: &payers,
        };
        let all_trees: Vec<&BenefitTree> = trees.iter().collect();
        let mut outcome = PassOutcome::default();
        self.run_family_pass(&[&family], &all_trees, &ctx, PassOptions::NONE, &mut outcome)
            .await?;

        let entitled = outcome.failures.is_empty();
        let now = Utc::now();
        let mut moved_members = Vec::with_capacity(family.members.len());
        let mut pending_suspensions = Vec::new();

        for mut member in family.members {
            let suspend = BenefitStatusRequest {
                beneficiary_id: member.id,
                category_id: old.id,
            };
            if let Err(error) = self.publisher.suspend_benefits(&suspend).await {
                warn!(
                    beneficiary_id = member.id,
                    old_category_id = old.id,
                    error = %error,
                    "Suspending old benefits failed, recording for retry"
                );
                member.pending_suspension_category_id = Some(old.id);
                pending_suspensions.push(member.member_number.clone());
            }

            member.category_id = new.id;
            member.processed = entitled;
            if entitled {
                member.processed_time = Some(now);
            }
            self.store.save_beneficiary(&member).await?;
            moved_members.push(member.member_number);
        }

        // Entitlements held in the old category are gone once suspended; a later
        // return must publish again under a fresh aggregate
        let old_benefit_ids: Vec<i64> = self
            .store
            .benefits_by_category(old.id)
            .await?
            .iter()
            .map(|b| b.id)
            .collect();
        let receipts = self.store.delete_receipts(&member_ids, &old_benefit_ids).await?;
        let trackers = self.store.delete_trackers(family.principal_id, &old_benefit_ids).await?;
        debug!(
            old_category_id = old.id,
            principal_id = family.principal_id,
            receipts,
            trackers,
            "Cleared old category entitlements"
        );

        for category in [&old, &new] {
            if category.status != CategoryStatus::Unprocessed {
                self.refresh_status(category).await?;
            }
        }

        info!(
            old_category_id = old.id,
            new_category_id = new.id,
            moved = moved_members.len(),
            pending = pending_suspensions.len(),
            "Category change completed"
        );

        Ok(ChangeCategorySummary {
            old_category_id: old.id,
            new_category_id: new.id,
            moved_members,
            published: outcome.published,
            failures: outcome.failures,
            pending_suspensions,
        })
    }

    /// Re-send suspensions that failed during earlier category changes
    pub async fn retry_pending_suspensions(&self) -> MembershipResult<SuspensionRetrySummary> {
        let pending = self.store.pending_suspensions().await?;
        let mut summary = SuspensionRetrySummary {
            attempted: pending.len(),
            ..SuspensionRetrySummary::default()
        };

        for mut member in pending {
            let Some(category_id) = member.pending_suspension_category_id else {
                continue;
            };
            let request = BenefitStatusRequest {
                beneficiary_id: member.id,
                category_id,
            };
            match self.publisher.suspend_benefits(&request).await {
                Ok(()) => {
                    member.pending_suspension_category_id = None;
                    self.store.save_beneficiary(&member).await?;
                    summary.cleared.push(member.member_number);
                }
                Err(error) => {
                    warn!(beneficiary_id = member.id, category_id, error = %error, "Suspension retry failed");
                    summary.still_pending.push(member.member_number);
                }
            }
        }

        Ok(summary)
    }

    /// Evaluate `families` against `trees`, publish, and set the flags `options` allows.
    ///
    /// A member is marked only when every unit of its family succeeded; a benefit
    /// only when no family failed on it. Units that already failed earlier in the
    /// same run are not attempted again.
    pub(crate) async fn run_family_pass(
        &self,
        families: &[&Family],
        trees: &[&BenefitTree],
        ctx: &PassContext<'_>,
        options: PassOptions,
        outcome: &mut PassOutcome,
    ) -> MembershipResult<()> {
        let mut failed_benefits = HashSet::new();

        for family in families {
            let mut family_ok = true;
            for tree in trees {
                let failed_earlier = outcome.has_failed(family.principal_id, tree.main.id);
                if failed_earlier || !self.entitle_family(family, tree, ctx, outcome).await? {
                    family_ok = false;
                    failed_benefits.insert(tree.main.id);
                }
            }

            if options.mark_members && family_ok {
                let ids = family.unprocessed_ids();
                if !ids.is_empty() {
                    self.store.mark_beneficiaries_processed(&ids, Utc::now()).await?;
                }
            }
        }

        if options.mark_benefits {
            let now = Utc::now();
            let to_mark: Vec<&&BenefitTree> = trees
                .iter()
                .filter(|t| !t.main.processed && !failed_benefits.contains(&t.main.id))
                .collect();
            for tree in to_mark {
                self.store.mark_benefit_processed(tree.main.id, now).await?;
            }
        }

        Ok(())
    }

    /// Publish whatever this family still lacks for one benefit. `Ok(false)` on a failed publish.
    async fn entitle_family(
        &self,
        family: &Family,
        tree: &BenefitTree,
        ctx: &PassContext<'_>,
        outcome: &mut PassOutcome,
    ) -> MembershipResult<bool> {
        let benefit = &tree.main;

        let mut candidates = Vec::new();
        for member in eligibility::eligible_members(&family.members, benefit) {
            if !self.store.has_receipt(member.id, benefit.id).await? {
                candidates.push(member);
            }
        }
        if candidates.is_empty() {
            return Ok(true);
        }

        let payer = ctx
            .payers
            .get(&benefit.payer_id)
            .ok_or_else(|| MembershipError::NotFound(format!("Payer {} not found", benefit.payer_id)))?;

        match benefit.sharing {
            BenefitDistribution::Individual => {
                let mut all_ok = true;
                for member in candidates {
                    let payload = ctx.builder.build(tree, payer, &[member], None)?;
                    if self.publish_unit(&payload, family, outcome).await {
                        self.record_receipts(&payload).await?;
                    } else {
                        all_ok = false;
                    }
                }
                Ok(all_ok)
            }
            BenefitDistribution::Family => {
                let tracker = self.store.find_tracker(family.principal_id, benefit.id).await?;
                let aggregate_id = tracker.as_ref().map(|t| t.aggregate_id.as_str());
                let payload = ctx.builder.build(tree, payer, &candidates, aggregate_id)?;

                if !self.publish_unit(&payload, family, outcome).await {
                    return Ok(false);
                }
                if tracker.is_none() {
                    self.store
                        .insert_tracker(SharedBenefitTracker {
                            id: 0,
                            beneficiary_id: family.principal_id,
                            benefit_id: benefit.id,
                            aggregate_id: payload.aggregate_id.clone(),
                            created_at: Utc::now(),
                        })
                        .await?;
                }
                self.record_receipts(&payload).await?;
                Ok(true)
            }
        }
    }

    async fn publish_unit(&self, payload: &EntitlementPayload, family: &Family, outcome: &mut PassOutcome) -> bool {
        match self.publisher.publish(payload).await {
            Ok(()) => {
                outcome.published += 1;
                debug!(
                    benefit_id = payload.benefit_id,
                    aggregate_id = %payload.aggregate_id,
                    principal_id = family.principal_id,
                    "Entitlement acknowledged"
                );
                true
            }
            Err(error) => {
                warn!(
                    benefit_id = payload.benefit_id,
                    aggregate_id = %payload.aggregate_id,
                    principal_id = family.principal_id,
                    error = %error,
                    "Entitlement publish failed"
                );
                outcome.failures.push(PublishFailure {
                    benefit_id: payload.benefit_id,
                    benefit_name: payload.benefit_name.clone(),
                    principal_id: family.principal_id,
                    member_numbers: payload.member_numbers(),
                    reason: error.message(),
                });
                false
            }
        }
    }

    async fn record_receipts(&self, payload: &EntitlementPayload) -> MembershipResult<()> {
        let published_at = Utc::now();
        let receipts = payload
            .beneficiaries
            .iter()
            .map(|b| EntitlementReceipt {
                id: 0,
                beneficiary_id: b.id,
                benefit_id: payload.benefit_id,
                aggregate_id: payload.aggregate_id.clone(),
                published_at,
            })
            .collect();
        self.store.insert_receipts(receipts).await
    }

    async fn refresh_status(&self, category: &Category) -> MembershipResult<CategoryStatus> {
        let benefits_left = !self.store.unprocessed_main_benefits(category.id).await?.is_empty();
        let members_left = !self.store.unprocessed_beneficiaries(category.id).await?.is_empty();
        let status = if benefits_left || members_left {
            CategoryStatus::PartiallyProcessed
        } else {
            CategoryStatus::Processed
        };

        if status != category.status {
            self.store.set_category_status(category.id, status).await?;
        }
        Ok(status)
    }

    async fn require_category(&self, id: i64) -> MembershipResult<Category> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Category {id} not found")))
    }

    async fn require_policy(&self, id: i64) -> MembershipResult<Policy> {
        self.store
            .find_policy(id)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("Policy {id} not found")))
    }

    /// Main benefits with their sub-benefits, every tree validated before anything is published
    async fn load_trees(&self, category: &Category, policy: &Policy) -> MembershipResult<Vec<BenefitTree>> {
        let mut trees = Vec::new();
        for main in self.store.main_benefits_by_category(category.id).await? {
            let subs = self.store.sub_benefits_of(main.id).await?;
            let tree = BenefitTree { main, subs };
            validation::validate_benefit_tree(&tree, policy).map_err(|e| {
                MembershipError::BenefitRule(format!(
                    "Benefit [{}] in category [{}] is invalid: {}",
                    tree.main.name,
                    category.name,
                    e.message()
                ))
            })?;
            trees.push(tree);
        }
        Ok(trees)
    }

    async fn load_payers(&self, trees: &[BenefitTree]) -> MembershipResult<HashMap<i64, Payer>> {
        let mut payers = HashMap::new();
        let payer_ids: Vec<i64> = trees.iter().map(|t| t.main.payer_id).unique().collect();
        for payer_id in payer_ids {
            let payer = self
                .store
                .find_payer(payer_id)
                .await?
                .ok_or_else(|| MembershipError::NotFound(format!("Payer {payer_id} not found")))?;
            payers.insert(payer_id, payer);
        }
        Ok(payers)
    }

    /// Principal of `member_number` and the dependants still in `category`
    async fn load_family(&self, category: &Category, member_number: &str) -> MembershipResult<Family> {
        let member = self.store.find_member(category.id, member_number).await?.ok_or_else(|| {
            MembershipError::NotFound(format!(
                "Member {member_number} not found in category {}",
                category.name
            ))
        })?;

        let principal = match member.principal_id {
            None => member,
            Some(principal_id) => self
                .store
                .find_beneficiary(principal_id)
                .await?
                .ok_or_else(|| MembershipError::NotFound(format!("Principal {principal_id} not found")))?,
        };

        let mut members = vec![principal.clone()];
        members.extend(
            self.store
                .dependants_of(principal.id)
                .await?
                .into_iter()
                .filter(|d| d.category_id == category.id),
        );

        Ok(Family {
            principal_id: principal.id,
            members,
        })
    }
}
