use crate::models::{FundingRequest, InvestorProfile, MatchResult};

/// Geographic focus entry that matches any country.
pub const GLOBAL_FOCUS: &str = "Global";

/// Weights for the five match factors. Each factor is awarded in full or not
/// at all; the natural maximum is exactly 100.
///
/// Scoring formula:
/// score = industry (30)       # investor lists the request's category
///       + stage (25)          # investor lists the derived stage
///       + company_type (15)   # investor lists the company's legal structure
///       + funding_range (20)  # amount within the investor's range
///       + geography (10)      # investor covers the country, or "Global"
#[derive(Debug, Clone, Copy)]
pub struct MatchWeights {
    pub industry: u8,
    pub stage: u8,
    pub company_type: u8,
    pub funding_range: u8,
    pub geography: u8,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            industry: 30,
            stage: 25,
            company_type: 15,
            funding_range: 20,
            geography: 10,
        }
    }
}

/// Score one funding request against one investor profile.
///
/// Pure and total: no I/O, no failure modes for well-formed input, identical
/// inputs always yield an identical result. Reasons are emitted in factor
/// order (industry, stage, company type, funding range, geography).
pub fn score_match(
    request: &FundingRequest,
    investor: &InvestorProfile,
    weights: &MatchWeights,
) -> MatchResult {
    let mut score: u32 = 0;
    let mut reasons = Vec::new();

    // Industry: literal containment, so an empty preference list matches nothing.
    if investor
        .preferred_industries
        .iter()
        .any(|industry| industry == &request.category)
    {
        score += weights.industry as u32;
        reasons.push("Industry match".to_string());
    }

    // Stage
    if investor.preferred_stages.contains(&request.investment_stage) {
        score += weights.stage as u32;
        reasons.push("Stage alignment".to_string());
    }

    // Company type
    if investor
        .preferred_company_types
        .contains(&request.company_type)
    {
        score += weights.company_type as u32;
        reasons.push("Company type preference".to_string());
    }

    // Funding range: an unset maximum means unbounded.
    if request.funding_required >= investor.investment_range_min
        && investor
            .investment_range_max
            .map_or(true, |max| request.funding_required <= max)
    {
        score += weights.funding_range as u32;
        reasons.push("Funding range match".to_string());
    }

    // Geography: exact country tag, or the "Global" wildcard.
    if investor
        .geographic_focus
        .iter()
        .any(|focus| focus == &request.country || focus == GLOBAL_FOCUS)
    {
        score += weights.geography as u32;
        reasons.push("Geographic focus".to_string());
    }

    MatchResult {
        score: score.min(100) as u8,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyType, InvestmentStage, InvestorType};
    use uuid::Uuid;

    fn technology_request() -> FundingRequest {
        FundingRequest {
            company_type: CompanyType::Llc,
            category: "Technology".to_string(),
            funding_required: 1_000_000,
            investment_stage: InvestmentStage::Seed,
            country: "United States".to_string(),
        }
    }

    fn seed_vc() -> InvestorProfile {
        InvestorProfile {
            id: Uuid::new_v4(),
            name: "Seed Capital".to_string(),
            investor_type: InvestorType::Vc,
            email: None,
            website: None,
            description: None,
            investment_range_min: 500_000,
            investment_range_max: Some(5_000_000),
            preferred_stages: vec![InvestmentStage::Seed, InvestmentStage::SeriesA],
            preferred_industries: vec!["Technology".to_string()],
            preferred_company_types: vec![CompanyType::Llc],
            geographic_focus: vec!["United States".to_string()],
            is_active: true,
        }
    }

    #[test]
    fn test_full_match_scores_100() {
        let result = score_match(&technology_request(), &seed_vc(), &MatchWeights::default());

        assert_eq!(result.score, 100);
        assert_eq!(
            result.reasons,
            vec![
                "Industry match",
                "Stage alignment",
                "Company type preference",
                "Funding range match",
                "Geographic focus",
            ]
        );
    }

    #[test]
    fn test_geography_mismatch_drops_10() {
        let mut investor = seed_vc();
        investor.geographic_focus = vec!["Canada".to_string()];

        let result = score_match(&technology_request(), &investor, &MatchWeights::default());
        assert_eq!(result.score, 90);
        assert_eq!(result.reasons.len(), 4);
    }

    #[test]
    fn test_global_wildcard_matches_any_country() {
        let mut investor = seed_vc();
        investor.geographic_focus = vec![GLOBAL_FOCUS.to_string()];

        let result = score_match(&technology_request(), &investor, &MatchWeights::default());
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_unbounded_range_max() {
        let mut investor = seed_vc();
        investor.investment_range_max = None;

        let mut request = technology_request();
        request.funding_required = 80_000_000;
        request.investment_stage = InvestmentStage::LateStage;

        let result = score_match(&request, &investor, &MatchWeights::default());
        // Range still matches; stage no longer does.
        assert!(result.reasons.iter().any(|r| r == "Funding range match"));
        assert!(!result.reasons.iter().any(|r| r == "Stage alignment"));
    }

    #[test]
    fn test_below_range_min_not_awarded() {
        let mut request = technology_request();
        request.funding_required = 100_000;
        request.investment_stage = InvestmentStage::PreSeed;

        let result = score_match(&request, &seed_vc(), &MatchWeights::default());
        assert!(!result.reasons.iter().any(|r| r == "Funding range match"));
    }

    #[test]
    fn test_empty_preference_sets_score_zero_factors() {
        let investor = InvestorProfile {
            preferred_stages: vec![],
            preferred_industries: vec![],
            preferred_company_types: vec![],
            geographic_focus: vec![],
            investment_range_min: 5_000_000,
            investment_range_max: None,
            ..seed_vc()
        };

        let result = score_match(&technology_request(), &investor, &MatchWeights::default());
        assert_eq!(result.score, 0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_determinism() {
        let request = technology_request();
        let investor = seed_vc();
        let weights = MatchWeights::default();

        let first = score_match(&request, &investor, &weights);
        let second = score_match(&request, &investor, &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn test_monotonicity_adding_factor() {
        let mut investor = seed_vc();
        investor.preferred_industries = vec!["Healthcare & Wellness".to_string()];
        let before = score_match(&technology_request(), &investor, &MatchWeights::default());

        investor
            .preferred_industries
            .push("Technology".to_string());
        let after = score_match(&technology_request(), &investor, &MatchWeights::default());

        assert!(after.score >= before.score);
        assert_eq!(after.score, before.score + 30);
    }

    #[test]
    fn test_score_is_sum_of_weight_subset() {
        let weights = [30u8, 25, 15, 20, 10];
        let investor = seed_vc();

        // Knock factors out one at a time and check the score stays a sum of
        // a subset of the weights.
        let variants: Vec<InvestorProfile> = vec![
            investor.clone(),
            InvestorProfile {
                preferred_industries: vec![],
                ..investor.clone()
            },
            InvestorProfile {
                preferred_stages: vec![],
                ..investor.clone()
            },
            InvestorProfile {
                preferred_company_types: vec![],
                ..investor.clone()
            },
            InvestorProfile {
                investment_range_min: 2_000_000,
                ..investor.clone()
            },
            InvestorProfile {
                geographic_focus: vec![],
                ..investor
            },
        ];

        let mut subset_sums = std::collections::HashSet::new();
        for mask in 0u32..32 {
            let sum: u32 = weights
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, w)| *w as u32)
                .sum();
            subset_sums.insert(sum as u8);
        }

        for variant in &variants {
            let result = score_match(&technology_request(), variant, &MatchWeights::default());
            assert!(result.score <= 100);
            assert!(subset_sums.contains(&result.score));
        }
    }
}
