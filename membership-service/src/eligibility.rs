use crate::models::{ApplicableGender, ApplicableMember, Beneficiary, BeneficiaryType, Benefit, Gender};

/// Whether a member's relationship fits the benefit's member scope
pub fn member_matches(applicable: ApplicableMember, member: BeneficiaryType) -> bool {
    match applicable {
        ApplicableMember::All => true,
        ApplicableMember::PrincipalAndSpouse => {
            matches!(member, BeneficiaryType::Principal | BeneficiaryType::Spouse)
        }
        ApplicableMember::Principal => member == BeneficiaryType::Principal,
        ApplicableMember::Spouse => member == BeneficiaryType::Spouse,
        ApplicableMember::Child => member == BeneficiaryType::Child,
        ApplicableMember::Parent => member == BeneficiaryType::Parent,
    }
}

pub fn gender_matches(applicable: ApplicableGender, gender: Gender) -> bool {
    match applicable {
        ApplicableGender::All => true,
        ApplicableGender::Male => gender == Gender::Male,
        ApplicableGender::Female => gender == Gender::Female,
    }
}

/// A beneficiary qualifies for a benefit when both member scope and gender match
pub fn passes(beneficiary: &Beneficiary, benefit: &Benefit) -> bool {
    member_matches(benefit.applicable_member, beneficiary.beneficiary_type)
        && gender_matches(benefit.applicable_gender, beneficiary.gender)
}

/// Members of `family` that qualify for `benefit`, in input order
pub fn eligible_members<'a>(family: &'a [Beneficiary], benefit: &Benefit) -> Vec<&'a Beneficiary> {
    family.iter().filter(|member| passes(member, benefit)).collect()
}
