use super::error::{LifestyleError, Result};
use super::types::{Gender, SuperStrategy, Tier};

/// Mortality tables are anchored to this calendar year.
pub const REFERENCE_YEAR: i32 = 2018;

/// Modest single lifestyle as a fraction of median income.
pub const MODEST_THRESHOLD: f64 = 0.56;
/// Comfortable lifestyle, roughly the median income itself.
pub const COMFORTABLE_THRESHOLD: f64 = 1.0;

pub fn calculate_working_years(start_super_age: i32, retirement_age: i32) -> i32 {
    retirement_age - start_super_age
}

pub fn calculate_death_age(birth_year: i32, gender: Gender) -> i32 {
    let age_now = REFERENCE_YEAR - birth_year;
    match gender {
        Gender::Male => 79 + age_now / 20,
        Gender::Other => 83 + age_now / 30,
    }
}

pub fn calculate_retirement_years(death_age: i32, retirement_age: i32) -> i32 {
    death_age - retirement_age
}

pub fn performance(strategy: &str) -> Result<f64> {
    strategy.parse::<SuperStrategy>().map(SuperStrategy::growth_factor)
}

/// Compounds yearly contributions (a percentage of median salary) under the
/// strategy's growth factor. The result is measured in median salaries.
pub fn calculate_super_balance(
    working_years: i32,
    strategy: &str,
    contribution_percent: i32,
) -> Result<f64> {
    if working_years <= 0 {
        return Ok(0.0);
    }

    let growth = performance(strategy)?;
    let contribution = contribution_percent as f64 / 100.0;
    let mut balance = 0.0;
    for _ in 0..working_years {
        balance = balance * growth + contribution;
    }
    Ok(balance)
}

pub fn calculate_lifestyle(retirement_years: i32, super_balance: f64) -> Result<f64> {
    if retirement_years <= 0 {
        return Err(LifestyleError::DivisionByZero { retirement_years });
    }
    Ok(super_balance / retirement_years as f64)
}

pub fn classify(ratio: f64) -> Tier {
    if ratio < MODEST_THRESHOLD {
        Tier::Poverty
    } else if ratio < COMFORTABLE_THRESHOLD {
        Tier::Modest
    } else {
        Tier::Comfortable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn performance_matches_strategy_table_case_insensitively() {
        assert_approx(performance("growth").expect("known"), 1.045);
        assert_approx(performance("Balanced").expect("known"), 1.035);
        assert_approx(performance("CONSERVATIVE").expect("known"), 1.025);
        assert_approx(performance("cash").expect("known"), 1.01);
    }

    #[test]
    fn performance_rejects_unknown_strategy() {
        let err = performance("crypto").expect_err("must reject");
        assert!(matches!(err, LifestyleError::UnknownStrategy(name) if name == "crypto"));
    }

    #[test]
    fn death_age_uses_gender_specific_tables() {
        assert_eq!(calculate_death_age(1980, Gender::Male), 80);
        assert_eq!(calculate_death_age(1980, Gender::Other), 84);
        assert_eq!(calculate_death_age(2018, Gender::Male), 79);
        assert_eq!(calculate_death_age(1928, Gender::Other), 86);
    }

    #[test]
    fn working_and_retirement_years_allow_negative_spans() {
        assert_eq!(calculate_working_years(25, 65), 40);
        assert_eq!(calculate_working_years(70, 60), -10);
        assert_eq!(calculate_retirement_years(80, 65), 15);
        assert_eq!(calculate_retirement_years(75, 80), -5);
    }

    #[test]
    fn super_balance_is_zero_without_working_years() {
        assert_approx(calculate_super_balance(0, "growth", 9).expect("ok"), 0.0);
        assert_approx(calculate_super_balance(-3, "growth", 9).expect("ok"), 0.0);
        assert_approx(calculate_super_balance(0, "not-a-strategy", 9).expect("ok"), 0.0);
    }

    #[test]
    fn super_balance_follows_recurrence() {
        assert_approx(calculate_super_balance(1, "growth", 10).expect("ok"), 0.10);
        assert_approx(calculate_super_balance(2, "growth", 10).expect("ok"), 0.2045);
        assert_approx(calculate_super_balance(3, "cash", 100).expect("ok"), 3.0301);
    }

    #[test]
    fn super_balance_rejects_unknown_strategy_when_compounding() {
        let err = calculate_super_balance(5, "yolo", 10).expect_err("must reject");
        assert!(matches!(err, LifestyleError::UnknownStrategy(_)));
    }

    #[test]
    fn lifestyle_divides_balance_over_retirement_years() {
        assert_approx(calculate_lifestyle(15, 12.0).expect("ok"), 0.8);
    }

    #[test]
    fn lifestyle_rejects_non_positive_retirement_years() {
        assert!(matches!(
            calculate_lifestyle(0, 5.0),
            Err(LifestyleError::DivisionByZero { retirement_years: 0 })
        ));
        assert!(matches!(
            calculate_lifestyle(-2, 5.0),
            Err(LifestyleError::DivisionByZero { retirement_years: -2 })
        ));
    }

    #[test]
    fn classify_uses_inclusive_upper_tiers() {
        assert_eq!(classify(0.3), Tier::Poverty);
        assert_eq!(classify(0.8), Tier::Modest);
        assert_eq!(classify(1.2), Tier::Comfortable);
        assert_eq!(classify(0.56), Tier::Modest);
        assert_eq!(classify(1.0), Tier::Comfortable);
        assert_eq!(classify(0.5599), Tier::Poverty);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_working_years_is_plain_difference(start in any::<i16>(), retire in any::<i16>()) {
            let (start, retire) = (start as i32, retire as i32);
            prop_assert_eq!(calculate_working_years(start, retire), retire - start);
        }

        #[test]
        fn prop_super_balance_grows_with_each_working_year(
            years in 1i32..60,
            contribution in 1i32..30,
            strategy_idx in 0usize..4
        ) {
            let name = SuperStrategy::ALL[strategy_idx].name();
            let shorter = calculate_super_balance(years - 1, name, contribution).expect("known");
            let longer = calculate_super_balance(years, name, contribution).expect("known");
            let growth = performance(name).expect("known");
            prop_assert!(longer > shorter);
            prop_assert!((longer - (shorter * growth + contribution as f64 / 100.0)).abs() < 1e-9);
        }

        #[test]
        fn prop_unrecognized_strategy_names_are_rejected(name in "[a-z]{1,12}") {
            let known = SuperStrategy::ALL.iter().any(|s| s.name() == name);
            prop_assert_eq!(performance(&name).is_ok(), known);
        }

        #[test]
        fn prop_classify_is_monotonic(a in 0.0f64..3.0, b in 0.0f64..3.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify(lo) as u8 <= classify(hi) as u8);
        }
    }
}
