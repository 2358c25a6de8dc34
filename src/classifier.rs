use crate::model::MembershipTier;

/// Keyword precedence is fixed: a detail string naming several tiers resolves
/// to the earliest match in this list.
const TIER_KEYWORDS: [(&str, MembershipTier); 4] = [
    ("basic", MembershipTier::Basic),
    ("pro", MembershipTier::Pro),
    ("professional", MembershipTier::Pro),
    ("volunteer", MembershipTier::Volunteer),
];

/// Maps free-text payment details to a membership tier. Total and pure:
/// every input, including missing/blank, maps to exactly one tier.
pub fn classify(detail: Option<&str>) -> MembershipTier {
    let Some(detail) = detail else {
        return MembershipTier::None;
    };
    let lower = detail.to_lowercase();

    for (keyword, tier) in TIER_KEYWORDS {
        if lower.contains(keyword) {
            return tier;
        }
    }
    MembershipTier::None
}
