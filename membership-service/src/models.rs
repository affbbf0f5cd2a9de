use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// ENUMERATIONS
// ============================================================================

/// Payer role in a scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayerType {
    Underwriter,
    Corporate,
    Intermediary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Scheme,
    Retail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BenefitAccessMode {
    Card,
    Cardless,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceGroup {
    Outpatient,
    Inpatient,
    Dental,
    Optical,
    Covid,
    Maternity,
}

/// Category lifecycle. `Unprocessed` is never re-entered once left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryStatus {
    Unprocessed,
    PartiallyProcessed,
    Processed,
}

/// Delay between policy start and benefit start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitingPeriod {
    ZeroDays,
    ThirtyDays,
    SixtyDays,
    NinetyDays,
    OneHundredEightyDays,
    NineMonths,
}

impl WaitingPeriod {
    /// Calendar offset from `start`. `None` only on date overflow.
    pub fn apply(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            WaitingPeriod::ZeroDays => Some(start),
            WaitingPeriod::ThirtyDays => start.checked_add_days(chrono::Days::new(30)),
            WaitingPeriod::SixtyDays => start.checked_add_days(chrono::Days::new(60)),
            WaitingPeriod::NinetyDays => start.checked_add_days(chrono::Days::new(90)),
            WaitingPeriod::OneHundredEightyDays => start.checked_add_days(chrono::Days::new(180)),
            WaitingPeriod::NineMonths => start.checked_add_months(Months::new(9)),
        }
    }
}

/// How a benefit's balance is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BenefitDistribution {
    /// One balance for the whole family
    Family,
    /// One balance per member
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreAuthType {
    Hr,
    Payer,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicableGender {
    Male,
    Female,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicableMember {
    Principal,
    Spouse,
    Child,
    Parent,
    PrincipalAndSpouse,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeneficiaryType {
    Principal,
    Spouse,
    Child,
    Parent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Inactive,
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Underwriter, corporate or intermediary paying for benefits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payer {
    pub id: i64,
    pub name: String,
    pub contact: Option<String>,
    pub payer_type: PayerType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub plan_type: PlanType,
    pub access_mode: BenefitAccessMode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Policy {
    pub id: i64,
    pub plan_id: i64,
    pub policy_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub policy_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: CategoryStatus,
    pub jic_scheme_code: Option<i32>,
    pub apa_scheme_code: Option<String>,
    pub policy_payer_code: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Service taxonomy entry a benefit is set up against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BenefitCatalog {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub service_group: ServiceGroup,
}

/// Payer-specific code for a catalog entry, unique per (payer, catalog entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PayerBenefitMapping {
    pub id: i64,
    pub payer_id: i64,
    pub catalog_id: i64,
    pub code: String,
}

/// A benefit together with the payer that funds it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenefitPayer {
    pub benefit_id: i64,
    pub benefit_name: String,
    pub payer: Payer,
}

/// A main benefit (`parent_id == None`) or one of its sub-benefits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Benefit {
    pub id: i64,
    pub category_id: i64,
    pub parent_id: Option<i64>,
    pub catalog_id: i64,
    pub payer_id: i64,
    pub name: String,
    #[sqlx(rename = "benefit_limit")]
    pub limit: Decimal,
    pub suspension_threshold: Decimal,
    pub applicable_gender: ApplicableGender,
    pub applicable_member: ApplicableMember,
    pub sharing: BenefitDistribution,
    pub co_payment_required: bool,
    pub co_payment_amount: Decimal,
    pub pre_auth_type: PreAuthType,
    pub waiting_period: WaitingPeriod,
    pub processed: bool,
    pub processed_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Benefit {
    pub fn is_main(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A main benefit together with its sub-benefits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenefitTree {
    pub main: Benefit,
    pub subs: Vec<Benefit>,
}

/// A principal member or one of their dependants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Beneficiary {
    pub id: i64,
    pub category_id: i64,
    pub principal_id: Option<i64>,
    pub name: String,
    pub member_number: String,
    pub beneficiary_type: BeneficiaryType,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub nhif_number: Option<String>,
    pub jic_entity_id: Option<i32>,
    pub apa_entity_id: Option<i32>,
    pub status: MemberStatus,
    pub processed: bool,
    pub processed_time: Option<DateTime<Utc>>,
    /// Old category whose benefits still need suspending after a category change
    pub pending_suspension_category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Beneficiary {
    /// Id of the family this member belongs to
    pub fn family_id(&self) -> i64 {
        self.principal_id.unwrap_or(self.id)
    }
}

/// Aggregate id used for a FAMILY benefit, keyed to the family principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SharedBenefitTracker {
    pub id: i64,
    pub beneficiary_id: i64,
    pub benefit_id: i64,
    pub aggregate_id: String,
    pub created_at: DateTime<Utc>,
}

/// Proof that a member was included in an acknowledged entitlement publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EntitlementReceipt {
    pub id: i64,
    pub beneficiary_id: i64,
    pub benefit_id: i64,
    pub aggregate_id: String,
    pub published_at: DateTime<Utc>,
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPayer {
    #[validate(length(min = 1, message = "Payer name cannot be blank"))]
    pub name: String,
    pub contact: Option<String>,
    pub payer_type: PayerType,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPlan {
    #[validate(length(min = 1, message = "Plan name cannot be blank"))]
    pub name: String,
    pub plan_type: PlanType,
    pub access_mode: BenefitAccessMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPolicy {
    pub plan_id: i64,
    #[validate(length(min = 1, message = "Policy number cannot be blank"))]
    pub policy_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub jic_scheme_code: Option<i32>,
    pub apa_scheme_code: Option<String>,
    pub policy_payer_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategories {
    pub policy_id: i64,
    pub categories: Vec<NewCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCatalogEntry {
    #[validate(length(min = 1, message = "Catalog code cannot be blank"))]
    pub code: String,
    #[validate(length(min = 1, message = "Catalog name cannot be blank"))]
    pub name: String,
    pub service_group: ServiceGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPayerBenefitMapping {
    pub payer_id: i64,
    pub catalog_id: i64,
    #[validate(length(min = 1, message = "Benefit code cannot be blank"))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBenefit {
    pub category_id: i64,
    pub parent_id: Option<i64>,
    pub catalog_id: i64,
    pub payer_id: i64,
    #[validate(length(min = 1, message = "Benefit name cannot be blank"))]
    pub name: String,
    pub limit: Decimal,
    pub suspension_threshold: Decimal,
    pub applicable_gender: ApplicableGender,
    pub applicable_member: ApplicableMember,
    pub sharing: BenefitDistribution,
    pub co_payment_required: bool,
    #[serde(default)]
    pub co_payment_amount: Decimal,
    pub pre_auth_type: PreAuthType,
    pub waiting_period: WaitingPeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBeneficiary {
    pub category_id: i64,
    pub principal_id: Option<i64>,
    #[validate(length(min = 1, message = "Member name cannot be blank"))]
    pub name: String,
    #[validate(length(min = 1, message = "Member number cannot be blank"))]
    pub member_number: String,
    pub beneficiary_type: BeneficiaryType,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub phone_number: Option<String>,
    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,
    pub nhif_number: Option<String>,
    pub jic_entity_id: Option<i32>,
    pub apa_entity_id: Option<i32>,
}

/// Editable member details. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MemberUpdate {
    #[validate(length(min = 1, message = "Member name cannot be blank"))]
    pub name: Option<String>,
    pub phone_number: Option<String>,
    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeCategoryRequest {
    pub old_category_id: i64,
    pub new_category_id: i64,
    pub member_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_waiting_period_offsets() {
        let start = date(2024, 1, 1);
        assert_eq!(WaitingPeriod::ZeroDays.apply(start), Some(start));
        assert_eq!(WaitingPeriod::ThirtyDays.apply(start), Some(date(2024, 1, 31)));
        assert_eq!(WaitingPeriod::NinetyDays.apply(start), Some(date(2024, 3, 31)));
        assert_eq!(WaitingPeriod::NineMonths.apply(start), Some(date(2024, 10, 1)));
    }

    #[test]
    fn test_nine_months_clamps_to_month_end() {
        assert_eq!(WaitingPeriod::NineMonths.apply(date(2023, 5, 31)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&ApplicableMember::PrincipalAndSpouse).unwrap(),
            "\"PRINCIPAL_AND_SPOUSE\""
        );
        assert_eq!(serde_json::to_string(&PreAuthType::Hr).unwrap(), "\"HR\"");
        assert_eq!(
            serde_json::from_str::<WaitingPeriod>("\"ONE_HUNDRED_EIGHTY_DAYS\"").unwrap(),
            WaitingPeriod::OneHundredEightyDays
        );
    }
}
