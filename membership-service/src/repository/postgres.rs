//! PostgreSQL-backed membership store
//!
//! Enum columns are stored as TEXT in their wire spelling, and uniqueness
//! rules (payer/plan names, member numbers per category, trackers) are
//! backed by unique indexes so concurrent writers cannot slip past the
//! service-level checks.

use crate::error::{MembershipError, MembershipResult};
use crate::models::*;
use crate::repository::{BeneficiaryRepository, BenefitRepository, EntitlementRepository, SchemeRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

/// PostgreSQL membership store
#[derive(Clone)]
pub struct PgMembershipStore {
    pool: PgPool,
}

impl PgMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create with connection string
    pub async fn from_connection_string(connection_string: &str) -> MembershipResult<Self> {
        let pool = PgPool::connect(connection_string)
            .await
            .map_err(|e| MembershipError::Storage(format!("Failed to connect: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> MembershipResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MembershipError::Storage(format!("Migration failed: {e}")))?;
        info!("Membership schema is up to date");
        Ok(())
    }
}

// ============================================================================
// SCHEME SETUP
// ============================================================================

#[async_trait]
impl SchemeRepository for PgMembershipStore {
    async fn insert_payer(&self, payer: Payer) -> MembershipResult<Payer> {
        let payer = sqlx::query_as::<_, Payer>(
            r#"
            INSERT INTO payers (name, contact, payer_type, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&payer.name)
        .bind(&payer.contact)
        .bind(payer.payer_type)
        .bind(payer.created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(payer_id = payer.id, "Payer stored");
        Ok(payer)
    }

    async fn find_payer(&self, id: i64) -> MembershipResult<Option<Payer>> {
        Ok(sqlx::query_as::<_, Payer>("SELECT * FROM payers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_payer_by_name(&self, name: &str) -> MembershipResult<Option<Payer>> {
        Ok(sqlx::query_as::<_, Payer>("SELECT * FROM payers WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_payers(&self) -> MembershipResult<Vec<Payer>> {
        Ok(sqlx::query_as::<_, Payer>("SELECT * FROM payers ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn payers_by_type(&self, payer_type: PayerType) -> MembershipResult<Vec<Payer>> {
        Ok(sqlx::query_as::<_, Payer>("SELECT * FROM payers WHERE payer_type = $1 ORDER BY id")
            .bind(payer_type)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_plan(&self, plan: Plan) -> MembershipResult<Plan> {
        Ok(sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (name, plan_type, access_mode, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&plan.name)
        .bind(plan.plan_type)
        .bind(plan.access_mode)
        .bind(plan.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_plan(&self, id: i64) -> MembershipResult<Option<Plan>> {
        Ok(sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_plan_by_name(&self, name: &str) -> MembershipResult<Option<Plan>> {
        Ok(sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_plans(&self) -> MembershipResult<Vec<Plan>> {
        Ok(sqlx::query_as::<_, Plan>("SELECT * FROM plans ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn plans_by_payer(&self, payer_id: i64) -> MembershipResult<Vec<Plan>> {
        Ok(sqlx::query_as::<_, Plan>(
            r#"
            SELECT * FROM plans
            WHERE id IN (
                SELECT p.plan_id FROM policies p
                JOIN categories c ON c.policy_id = p.id
                JOIN benefits b ON b.category_id = c.id
                WHERE b.payer_id = $1
            )
            ORDER BY id
            "#,
        )
        .bind(payer_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_policy(&self, policy: Policy) -> MembershipResult<Policy> {
        Ok(sqlx::query_as::<_, Policy>(
            r#"
            INSERT INTO policies (plan_id, policy_number, start_date, end_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(policy.plan_id)
        .bind(&policy.policy_number)
        .bind(policy.start_date)
        .bind(policy.end_date)
        .bind(policy.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_policy(&self, id: i64) -> MembershipResult<Option<Policy>> {
        Ok(sqlx::query_as::<_, Policy>("SELECT * FROM policies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_policy_by_number(&self, policy_number: &str) -> MembershipResult<Option<Policy>> {
        Ok(sqlx::query_as::<_, Policy>("SELECT * FROM policies WHERE policy_number = $1")
            .bind(policy_number)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn policies_by_plan(&self, plan_id: i64) -> MembershipResult<Vec<Policy>> {
        Ok(sqlx::query_as::<_, Policy>("SELECT * FROM policies WHERE plan_id = $1 ORDER BY id")
            .bind(plan_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_categories(&self, categories: Vec<Category>) -> MembershipResult<Vec<Category>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(categories.len());

        for category in categories {
            let row = sqlx::query_as::<_, Category>(
                r#"
                INSERT INTO categories (
                    policy_id, name, description, status,
                    jic_scheme_code, apa_scheme_code, policy_payer_code, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(category.policy_id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.status)
            .bind(category.jic_scheme_code)
            .bind(&category.apa_scheme_code)
            .bind(category.policy_payer_code)
            .bind(category.created_at)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        debug!(count = saved.len(), "Categories stored");
        Ok(saved)
    }

    async fn find_category(&self, id: i64) -> MembershipResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn categories_by_policy(&self, policy_id: i64) -> MembershipResult<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE policy_id = $1 ORDER BY id")
            .bind(policy_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_category_status(&self, id: i64, status: CategoryStatus) -> MembershipResult<()> {
        let result = sqlx::query("UPDATE categories SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MembershipError::NotFound(format!("Category {id} not found")));
        }
        Ok(())
    }

    async fn insert_catalog_entries(&self, entries: Vec<BenefitCatalog>) -> MembershipResult<Vec<BenefitCatalog>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(entries.len());

        for entry in entries {
            let row = sqlx::query_as::<_, BenefitCatalog>(
                r#"
                INSERT INTO benefit_catalog (code, name, service_group)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(&entry.code)
            .bind(&entry.name)
            .bind(entry.service_group)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_catalog_entry(&self, id: i64) -> MembershipResult<Option<BenefitCatalog>> {
        Ok(sqlx::query_as::<_, BenefitCatalog>("SELECT * FROM benefit_catalog WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_catalog_by_code_or_name(&self, code: &str, name: &str) -> MembershipResult<Option<BenefitCatalog>> {
        Ok(sqlx::query_as::<_, BenefitCatalog>(
            "SELECT * FROM benefit_catalog WHERE LOWER(code) = LOWER($1) OR LOWER(name) = LOWER($2) ORDER BY id LIMIT 1",
        )
        .bind(code)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn catalog_by_group(&self, group: ServiceGroup) -> MembershipResult<Vec<BenefitCatalog>> {
        Ok(sqlx::query_as::<_, BenefitCatalog>("SELECT * FROM benefit_catalog WHERE service_group = $1 ORDER BY id")
            .bind(group)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn search_catalog(&self, term: &str) -> MembershipResult<Vec<BenefitCatalog>> {
        Ok(sqlx::query_as::<_, BenefitCatalog>(
            "SELECT * FROM benefit_catalog WHERE name ILIKE '%' || $1 || '%' ORDER BY id",
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_benefit_mapping(&self, mapping: PayerBenefitMapping) -> MembershipResult<PayerBenefitMapping> {
        let mapping = sqlx::query_as::<_, PayerBenefitMapping>(
            r#"
            INSERT INTO payer_benefit_mappings (payer_id, catalog_id, code)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(mapping.payer_id)
        .bind(mapping.catalog_id)
        .bind(&mapping.code)
        .fetch_one(&self.pool)
        .await?;

        debug!(payer_id = mapping.payer_id, catalog_id = mapping.catalog_id, "Payer benefit code stored");
        Ok(mapping)
    }

    async fn benefit_mappings_by_payer(&self, payer_id: i64) -> MembershipResult<Vec<PayerBenefitMapping>> {
        Ok(sqlx::query_as::<_, PayerBenefitMapping>(
            "SELECT * FROM payer_benefit_mappings WHERE payer_id = $1 ORDER BY id",
        )
        .bind(payer_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_benefit_mapping(&self, payer_id: i64, catalog_id: i64) -> MembershipResult<Option<PayerBenefitMapping>> {
        Ok(sqlx::query_as::<_, PayerBenefitMapping>(
            "SELECT * FROM payer_benefit_mappings WHERE payer_id = $1 AND catalog_id = $2",
        )
        .bind(payer_id)
        .bind(catalog_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

// ============================================================================
// BENEFITS
// ============================================================================

#[async_trait]
impl BenefitRepository for PgMembershipStore {
    async fn insert_benefit(&self, benefit: Benefit) -> MembershipResult<Benefit> {
        let benefit = sqlx::query_as::<_, Benefit>(
            r#"
            INSERT INTO benefits (
                category_id, parent_id, catalog_id, payer_id, name,
                benefit_limit, suspension_threshold, applicable_gender, applicable_member,
                sharing, co_payment_required, co_payment_amount, pre_auth_type,
                waiting_period, processed, processed_time, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(benefit.category_id)
        .bind(benefit.parent_id)
        .bind(benefit.catalog_id)
        .bind(benefit.payer_id)
        .bind(&benefit.name)
        .bind(benefit.limit)
        .bind(benefit.suspension_threshold)
        .bind(benefit.applicable_gender)
        .bind(benefit.applicable_member)
        .bind(benefit.sharing)
        .bind(benefit.co_payment_required)
        .bind(benefit.co_payment_amount)
        .bind(benefit.pre_auth_type)
        .bind(benefit.waiting_period)
        .bind(benefit.processed)
        .bind(benefit.processed_time)
        .bind(benefit.created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(benefit_id = benefit.id, category_id = benefit.category_id, "Benefit stored");
        Ok(benefit)
    }

    async fn find_benefit(&self, id: i64) -> MembershipResult<Option<Benefit>> {
        Ok(sqlx::query_as::<_, Benefit>("SELECT * FROM benefits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn benefits_by_ids(&self, ids: &[i64]) -> MembershipResult<Vec<Benefit>> {
        Ok(sqlx::query_as::<_, Benefit>("SELECT * FROM benefits WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(sqlx::query_as::<_, Benefit>("SELECT * FROM benefits WHERE category_id = $1 ORDER BY id")
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn main_benefits_by_category(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(sqlx::query_as::<_, Benefit>(
            "SELECT * FROM benefits WHERE category_id = $1 AND parent_id IS NULL ORDER BY id",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn sub_benefits_of(&self, parent_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(sqlx::query_as::<_, Benefit>("SELECT * FROM benefits WHERE parent_id = $1 ORDER BY id")
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn unprocessed_main_benefits(&self, category_id: i64) -> MembershipResult<Vec<Benefit>> {
        Ok(sqlx::query_as::<_, Benefit>(
            r#"
            SELECT * FROM benefits
            WHERE category_id = $1 AND parent_id IS NULL AND NOT processed
            ORDER BY id
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_benefit_processed(&self, id: i64, at: DateTime<Utc>) -> MembershipResult<()> {
        sqlx::query("UPDATE benefits SET processed = TRUE, processed_time = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// BENEFICIARIES
// ============================================================================

#[async_trait]
impl BeneficiaryRepository for PgMembershipStore {
    async fn insert_beneficiary(&self, beneficiary: Beneficiary) -> MembershipResult<Beneficiary> {
        let beneficiary = sqlx::query_as::<_, Beneficiary>(
            r#"
            INSERT INTO beneficiaries (
                category_id, principal_id, name, member_number, beneficiary_type,
                gender, dob, phone_number, email, nhif_number, jic_entity_id,
                apa_entity_id, status, processed, processed_time,
                pending_suspension_category_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(beneficiary.category_id)
        .bind(beneficiary.principal_id)
        .bind(&beneficiary.name)
        .bind(&beneficiary.member_number)
        .bind(beneficiary.beneficiary_type)
        .bind(beneficiary.gender)
        .bind(beneficiary.dob)
        .bind(&beneficiary.phone_number)
        .bind(&beneficiary.email)
        .bind(&beneficiary.nhif_number)
        .bind(beneficiary.jic_entity_id)
        .bind(beneficiary.apa_entity_id)
        .bind(beneficiary.status)
        .bind(beneficiary.processed)
        .bind(beneficiary.processed_time)
        .bind(beneficiary.pending_suspension_category_id)
        .bind(beneficiary.created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(beneficiary_id = beneficiary.id, category_id = beneficiary.category_id, "Beneficiary stored");
        Ok(beneficiary)
    }

    async fn find_beneficiary(&self, id: i64) -> MembershipResult<Option<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>("SELECT * FROM beneficiaries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_member(&self, category_id: i64, member_number: &str) -> MembershipResult<Option<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>(
            "SELECT * FROM beneficiaries WHERE category_id = $1 AND LOWER(member_number) = LOWER($2)",
        )
        .bind(category_id)
        .bind(member_number)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn beneficiaries_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>("SELECT * FROM beneficiaries WHERE category_id = $1 ORDER BY id")
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn principals_by_category(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>(
            "SELECT * FROM beneficiaries WHERE category_id = $1 AND beneficiary_type = 'PRINCIPAL' ORDER BY id",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn dependants_of(&self, principal_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>("SELECT * FROM beneficiaries WHERE principal_id = $1 ORDER BY id")
            .bind(principal_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn unprocessed_beneficiaries(&self, category_id: i64) -> MembershipResult<Vec<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>(
            "SELECT * FROM beneficiaries WHERE category_id = $1 AND NOT processed ORDER BY id",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_beneficiaries_processed(&self, ids: &[i64], at: DateTime<Utc>) -> MembershipResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE beneficiaries SET processed = TRUE, processed_time = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_beneficiary(&self, beneficiary: &Beneficiary) -> MembershipResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE beneficiaries SET
                category_id = $2,
                principal_id = $3,
                name = $4,
                phone_number = $5,
                email = $6,
                dob = $7,
                status = $8,
                processed = $9,
                processed_time = $10,
                pending_suspension_category_id = $11
            WHERE id = $1
            "#,
        )
        .bind(beneficiary.id)
        .bind(beneficiary.category_id)
        .bind(beneficiary.principal_id)
        .bind(&beneficiary.name)
        .bind(&beneficiary.phone_number)
        .bind(&beneficiary.email)
        .bind(beneficiary.dob)
        .bind(beneficiary.status)
        .bind(beneficiary.processed)
        .bind(beneficiary.processed_time)
        .bind(beneficiary.pending_suspension_category_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MembershipError::NotFound(format!("Beneficiary {} not found", beneficiary.id)));
        }
        Ok(())
    }

    async fn pending_suspensions(&self) -> MembershipResult<Vec<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>(
            "SELECT * FROM beneficiaries WHERE pending_suspension_category_id IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn search_members(&self, term: &str) -> MembershipResult<Vec<Beneficiary>> {
        Ok(sqlx::query_as::<_, Beneficiary>(
            r#"
            SELECT * FROM beneficiaries
            WHERE status = 'ACTIVE'
              AND (name ILIKE '%' || $1 || '%' OR member_number ILIKE '%' || $1 || '%')
            ORDER BY id
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?)
    }
}

// ============================================================================
// ENTITLEMENT BOOKKEEPING
// ============================================================================

#[async_trait]
impl EntitlementRepository for PgMembershipStore {
    async fn find_tracker(&self, beneficiary_id: i64, benefit_id: i64) -> MembershipResult<Option<SharedBenefitTracker>> {
        Ok(sqlx::query_as::<_, SharedBenefitTracker>(
            "SELECT * FROM shared_benefit_trackers WHERE beneficiary_id = $1 AND benefit_id = $2",
        )
        .bind(beneficiary_id)
        .bind(benefit_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_tracker(&self, tracker: SharedBenefitTracker) -> MembershipResult<SharedBenefitTracker> {
        Ok(sqlx::query_as::<_, SharedBenefitTracker>(
            r#"
            INSERT INTO shared_benefit_trackers (beneficiary_id, benefit_id, aggregate_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tracker.beneficiary_id)
        .bind(tracker.benefit_id)
        .bind(&tracker.aggregate_id)
        .bind(tracker.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn trackers_by_beneficiary(&self, beneficiary_id: i64) -> MembershipResult<Vec<SharedBenefitTracker>> {
        Ok(sqlx::query_as::<_, SharedBenefitTracker>(
            "SELECT * FROM shared_benefit_trackers WHERE beneficiary_id = $1 ORDER BY id",
        )
        .bind(beneficiary_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn has_receipt(&self, beneficiary_id: i64, benefit_id: i64) -> MembershipResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM entitlement_receipts WHERE beneficiary_id = $1 AND benefit_id = $2)",
        )
        .bind(beneficiary_id)
        .bind(benefit_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_receipts(&self, receipts: Vec<EntitlementReceipt>) -> MembershipResult<()> {
        let mut tx = self.pool.begin().await?;
        for receipt in &receipts {
            sqlx::query(
                r#"
                INSERT INTO entitlement_receipts (beneficiary_id, benefit_id, aggregate_id, published_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (beneficiary_id, benefit_id) DO NOTHING
                "#,
            )
            .bind(receipt.beneficiary_id)
            .bind(receipt.benefit_id)
            .bind(&receipt.aggregate_id)
            .bind(receipt.published_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn receipts_by_beneficiary(&self, beneficiary_id: i64) -> MembershipResult<Vec<EntitlementReceipt>> {
        Ok(sqlx::query_as::<_, EntitlementReceipt>(
            "SELECT * FROM entitlement_receipts WHERE beneficiary_id = $1 ORDER BY id",
        )
        .bind(beneficiary_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_receipts(&self, beneficiary_ids: &[i64], benefit_ids: &[i64]) -> MembershipResult<u64> {
        let result = sqlx::query(
            "DELETE FROM entitlement_receipts WHERE beneficiary_id = ANY($1) AND benefit_id = ANY($2)",
        )
        .bind(beneficiary_ids)
        .bind(benefit_ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_trackers(&self, beneficiary_id: i64, benefit_ids: &[i64]) -> MembershipResult<u64> {
        let result = sqlx::query(
            "DELETE FROM shared_benefit_trackers WHERE beneficiary_id = $1 AND benefit_id = ANY($2)",
        )
        .bind(beneficiary_id)
        .bind(benefit_ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
