use crate::models::{FundingRequest, InvestorProfile, RankedMatch};
use crate::core::scoring::{score_match, MatchWeights};

/// A match is "qualifying" when its score is strictly above this threshold.
pub const QUALIFYING_THRESHOLD: u8 = 50;

/// Result of ranking one funding request against a set of investors.
#[derive(Debug)]
pub struct RankingResult {
    pub matches: Vec<RankedMatch>,
    pub total_candidates: usize,
}

/// Ranks investors against a funding request.
///
/// # Pipeline
/// 1. Skip inactive investors
/// 2. Score every remaining candidate
/// 3. Keep qualifying matches (score > 50)
/// 4. Sort by score descending; equal scores keep their input order
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: MatchWeights,
    threshold: u8,
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            weights: MatchWeights::default(),
            threshold: QUALIFYING_THRESHOLD,
        }
    }

    /// Rank `investors` against `request`.
    ///
    /// Returns qualifying matches only; `total_candidates` is the size of the
    /// input before filtering.
    pub fn rank(&self, request: &FundingRequest, investors: Vec<InvestorProfile>) -> RankingResult {
        let total_candidates = investors.len();

        let mut matches: Vec<RankedMatch> = investors
            .into_iter()
            .filter(|investor| investor.is_active)
            .filter_map(|investor| {
                let result = score_match(request, &investor, &self.weights);

                if result.score > self.threshold {
                    Some(RankedMatch {
                        investor_id: investor.id,
                        investor_name: investor.name,
                        score: result.score,
                        reasons: result.reasons,
                    })
                } else {
                    None
                }
            })
            .collect();

        // std's sort_by is stable, so equal scores keep their input order.
        matches.sort_by(|a, b| b.score.cmp(&a.score));

        RankingResult {
            matches,
            total_candidates,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyType, InvestmentStage, InvestorType};
    use uuid::Uuid;

    fn seed_request() -> FundingRequest {
        FundingRequest {
            company_type: CompanyType::Llc,
            category: "Technology".to_string(),
            funding_required: 1_000_000,
            investment_stage: InvestmentStage::Seed,
            country: "United States".to_string(),
        }
    }

    fn investor(name: &str, industries: Vec<&str>, countries: Vec<&str>) -> InvestorProfile {
        InvestorProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            investor_type: InvestorType::Vc,
            email: None,
            website: None,
            description: None,
            investment_range_min: 500_000,
            investment_range_max: Some(5_000_000),
            preferred_stages: vec![InvestmentStage::Seed],
            preferred_industries: industries.into_iter().map(String::from).collect(),
            preferred_company_types: vec![CompanyType::Llc],
            geographic_focus: countries.into_iter().map(String::from).collect(),
            is_active: true,
        }
    }

    #[test]
    fn test_rank_filters_below_threshold() {
        let matcher = Matcher::new();

        // Stage (25) + company type (15) = 40, below the threshold.
        let mut weak = investor("Weak", vec![], vec![]);
        weak.investment_range_min = 2_000_000;

        let candidates = vec![
            investor("Full", vec!["Technology"], vec!["United States"]), // 100
            weak,
        ];

        let result = matcher.rank(&seed_request(), candidates);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].investor_name, "Full");
        assert_eq!(result.matches[0].score, 100);
        assert_eq!(result.total_candidates, 2);
    }

    #[test]
    fn test_score_exactly_50_not_qualifying() {
        let matcher = Matcher::new();

        // Industry (30) + funding range (20) only = 50.
        let mut candidate = investor("Borderline", vec!["Technology"], vec![]);
        candidate.preferred_stages = vec![];
        candidate.preferred_company_types = vec![];

        let result = matcher.rank(&seed_request(), vec![candidate]);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let matcher = Matcher::new();

        // A and B both score 90 (no geography), C scores lower but qualifying.
        let a = investor("A", vec!["Technology"], vec![]);
        let b = investor("B", vec!["Technology"], vec![]);
        let mut c = investor("C", vec!["Technology"], vec![]);
        c.preferred_company_types = vec![]; // 75

        let result = matcher.rank(&seed_request(), vec![a, b, c]);

        let names: Vec<&str> = result
            .matches
            .iter()
            .map(|m| m.investor_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_inactive_investors_skipped() {
        let matcher = Matcher::new();

        let mut dormant = investor("Dormant", vec!["Technology"], vec!["United States"]);
        dormant.is_active = false;

        let result = matcher.rank(&seed_request(), vec![dormant]);
        assert!(result.matches.is_empty());
        assert_eq!(result.total_candidates, 1);
    }
}
