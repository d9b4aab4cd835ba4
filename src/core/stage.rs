use crate::models::InvestmentStage;

/// Derive the investment stage from the requested funding amount.
///
/// Applied once when a funding request is created; the stage is never
/// user-chosen. Bands (inclusive upper bounds, whole dollars):
///
/// | Amount          | Stage      |
/// |-----------------|------------|
/// | <= 500,000      | pre-seed   |
/// | <= 2,000,000    | seed       |
/// | <= 10,000,000   | series-a   |
/// | <= 50,000,000   | series-b   |
/// | > 50,000,000    | late-stage |
pub fn stage_for_amount(amount: i64) -> InvestmentStage {
    if amount <= 500_000 {
        InvestmentStage::PreSeed
    } else if amount <= 2_000_000 {
        InvestmentStage::Seed
    } else if amount <= 10_000_000 {
        InvestmentStage::SeriesA
    } else if amount <= 50_000_000 {
        InvestmentStage::SeriesB
    } else {
        InvestmentStage::LateStage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_boundaries() {
        assert_eq!(stage_for_amount(0), InvestmentStage::PreSeed);
        assert_eq!(stage_for_amount(500_000), InvestmentStage::PreSeed);
        assert_eq!(stage_for_amount(500_001), InvestmentStage::Seed);
        assert_eq!(stage_for_amount(2_000_000), InvestmentStage::Seed);
        assert_eq!(stage_for_amount(2_000_001), InvestmentStage::SeriesA);
        assert_eq!(stage_for_amount(10_000_000), InvestmentStage::SeriesA);
        assert_eq!(stage_for_amount(10_000_001), InvestmentStage::SeriesB);
        assert_eq!(stage_for_amount(50_000_000), InvestmentStage::SeriesB);
        assert_eq!(stage_for_amount(50_000_001), InvestmentStage::LateStage);
    }
}
