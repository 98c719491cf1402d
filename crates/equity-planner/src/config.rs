use anyhow::{Context, Result};
use recommendation_engine::RecommendationPolicy;
use scenario_evaluator::SensitivityConfig;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Plan file used when no path argument is given
    pub plan_path: Option<PathBuf>,
    pub policy: RecommendationPolicy,
    pub sensitivity: SensitivityConfig,
    pub pretty_json: bool,
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            plan_path: lookup("EQUITY_PLAN_PATH").map(PathBuf::from),

            policy: RecommendationPolicy {
                full_exercise_threshold: var("RECOMMEND_FULL_THRESHOLD", "0.75")
                    .parse()
                    .context("RECOMMEND_FULL_THRESHOLD is not a number")?,
                partial_exercise_threshold: var("RECOMMEND_PARTIAL_THRESHOLD", "0.60")
                    .parse()
                    .context("RECOMMEND_PARTIAL_THRESHOLD is not a number")?,
                minimum_exercise_threshold: var("RECOMMEND_MINIMUM_THRESHOLD", "0.45")
                    .parse()
                    .context("RECOMMEND_MINIMUM_THRESHOLD is not a number")?,
                expiration_urgency_months: var("EXPIRATION_URGENCY_MONTHS", "6")
                    .parse()
                    .context("EXPIRATION_URGENCY_MONTHS is not a number")?,
            },

            sensitivity: SensitivityConfig {
                multiples: parse_list(&var("SENSITIVITY_MULTIPLES", "0.5,1,2,3,5,10"))
                    .context("SENSITIVITY_MULTIPLES")?,
                holding_years: parse_list(&var("SENSITIVITY_YEARS", "0.5,1,2,3,5"))
                    .context("SENSITIVITY_YEARS")?,
            },

            pretty_json: var("PRETTY_JSON", "true")
                .parse()
                .context("PRETTY_JSON must be true or false")?,
        };

        config.policy.validate()?;
        config.sensitivity.validate()?;

        Ok(config)
    }
}

fn parse_list(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().with_context(|| format!("invalid number '{}'", s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<PlannerConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PlannerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]).unwrap();
        assert!(config.plan_path.is_none());
        assert_eq!(config.policy, RecommendationPolicy::default());
        assert_eq!(config.sensitivity.multiples, SensitivityConfig::default().multiples);
        assert_eq!(config.sensitivity.holding_years, SensitivityConfig::default().holding_years);
        assert!(config.pretty_json);
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("EQUITY_PLAN_PATH", "plans/mine.json"),
            ("RECOMMEND_FULL_THRESHOLD", "0.8"),
            ("SENSITIVITY_MULTIPLES", "1, 2 ,4"),
            ("PRETTY_JSON", "false"),
        ])
        .unwrap();
        assert_eq!(config.plan_path, Some(PathBuf::from("plans/mine.json")));
        assert_eq!(config.policy.full_exercise_threshold, 0.8);
        assert_eq!(config.sensitivity.multiples, vec![1.0, 2.0, 4.0]);
        assert!(!config.pretty_json);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(from_map(&[("SENSITIVITY_YEARS", "1,two")]).is_err());
        assert!(from_map(&[("RECOMMEND_PARTIAL_THRESHOLD", "0.9")]).is_err());
    }
}
