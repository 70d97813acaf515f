//! Extract schema validation and period detection.

use crate::config::{AmbiguousPeriod, ExtractColumns, PeriodPolicy, ReconConfig, TensionClass};
use crate::error::{ReconError, ReconWarning, Result};
use crate::period::PeriodTag;
use crate::table::Table;

/// Check that `extract` carries every required role column for `tension`.
///
/// Returns the column set to use: the configured one, with the consumption
/// column dropped when the extract does not have it.
pub fn validate(extract: &Table, tension: TensionClass, config: &ReconConfig) -> Result<ExtractColumns> {
    let configured = &config.tension(tension).extract;

    let missing: Vec<String> = [&configured.identifier, &configured.amount, &configured.period]
        .into_iter()
        .filter(|c| !extract.has_column(c))
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(ReconError::Schema {
            missing,
            present: extract.columns().to_vec(),
        });
    }

    let mut columns = configured.clone();
    if let Some(conso) = &columns.consumption {
        if !extract.has_column(conso) {
            log::debug!("extract has no '{conso}' column, consumption left untouched");
            columns.consumption = None;
        }
    }
    Ok(columns)
}

/// Period carried by an extract, plus the warning raised while detecting it.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDetection {
    pub tag: PeriodTag,
    pub warning: Option<ReconWarning>,
}

/// Single period tag shared by every row of the extract.
pub fn extract_period_tag(
    extract: &Table,
    columns: &ExtractColumns,
    policy: &PeriodPolicy,
) -> Result<PeriodDetection> {
    let values = extract.distinct(&columns.period);

    match values.as_slice() {
        [] => {
            let tag = PeriodTag::current(&policy.default_format);
            log::warn!("no value in '{}', defaulting period to {tag}", columns.period);
            Ok(PeriodDetection {
                warning: Some(ReconWarning::MissingPeriod {
                    column: columns.period.clone(),
                    default: tag.to_string(),
                }),
                tag,
            })
        }
        [only] => Ok(PeriodDetection {
            tag: PeriodTag::new(only.as_str()),
            warning: None,
        }),
        [first, ..] => match policy.on_ambiguous {
            AmbiguousPeriod::Fail => Err(ReconError::AmbiguousPeriod {
                column: columns.period.clone(),
                values: values.clone(),
            }),
            AmbiguousPeriod::First => {
                let tag = PeriodTag::new(first.as_str());
                log::warn!("{} periods in '{}', keeping {tag}", values.len(), columns.period);
                Ok(PeriodDetection {
                    warning: Some(ReconWarning::AmbiguousPeriodResolved {
                        column: columns.period.clone(),
                        kept: tag.to_string(),
                        values: values.clone(),
                    }),
                    tag,
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn high_extract(periods: &[&str]) -> Table {
        let mut t = Table::new(["refraccord", "montfact", "caract"]);
        for (i, p) in periods.iter().enumerate() {
            t.push_row(vec![Cell::from(i as i64), Cell::Number(10.0), Cell::from(*p)]);
        }
        t
    }

    #[test]
    fn missing_columns_are_all_listed() {
        let extract = Table::new(["refraccord", "conso"]);
        let err = validate(&extract, TensionClass::High, &ReconConfig::default()).unwrap_err();
        match err {
            ReconError::Schema { missing, present } => {
                assert_eq!(missing, vec!["montfact", "caract"]);
                assert_eq!(present, vec!["refraccord", "conso"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn consumption_is_optional() {
        let extract = high_extract(&["05/2024"]);
        let columns = validate(&extract, TensionClass::High, &ReconConfig::default()).unwrap();
        assert_eq!(columns.consumption, None);
        assert_eq!(columns.identifier, "refraccord");
    }

    #[test]
    fn single_period() {
        let extract = high_extract(&["05/2024", "05/2024", ""]);
        let config = ReconConfig::default();
        let columns = validate(&extract, TensionClass::High, &config).unwrap();
        let detected = extract_period_tag(&extract, &columns, &config.period).unwrap();
        assert_eq!(detected.tag.as_str(), "05/2024");
        assert_eq!(detected.warning, None);
    }

    #[test]
    fn empty_period_defaults_with_warning() {
        let extract = high_extract(&["", ""]);
        let config = ReconConfig::default();
        let columns = validate(&extract, TensionClass::High, &config).unwrap();
        let detected = extract_period_tag(&extract, &columns, &config.period).unwrap();
        assert!(detected.tag.month().is_some());
        assert!(matches!(detected.warning, Some(ReconWarning::MissingPeriod { .. })));
    }

    #[test]
    fn ambiguous_period_fails_by_default() {
        let extract = high_extract(&["05/2024", "06/2024"]);
        let config = ReconConfig::default();
        let columns = validate(&extract, TensionClass::High, &config).unwrap();
        let err = extract_period_tag(&extract, &columns, &config.period).unwrap_err();
        assert!(matches!(err, ReconError::AmbiguousPeriod { ref values, .. } if values.len() == 2));
    }

    #[test]
    fn ambiguous_period_first_policy() {
        let extract = high_extract(&["05/2024", "06/2024", "05/2024"]);
        let mut config = ReconConfig::default();
        config.period.on_ambiguous = AmbiguousPeriod::First;
        let columns = validate(&extract, TensionClass::High, &config).unwrap();
        let detected = extract_period_tag(&extract, &columns, &config.period).unwrap();
        assert_eq!(detected.tag.as_str(), "05/2024");
        assert!(matches!(
            detected.warning,
            Some(ReconWarning::AmbiguousPeriodResolved { ref kept, .. }) if kept == "05/2024"
        ));
    }
}
