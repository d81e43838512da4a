//! Loading hints derived from a container and its balance report.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{BalanceReport, Container};

/// Weight difference between left and right above which the load is flagged (kg).
pub const LATERAL_DIFFERENCE_LIMIT: f64 = 500.0;
/// Weight difference between front and rear above which the load is flagged (kg).
pub const LONGITUDINAL_DIFFERENCE_LIMIT: f64 = 2000.0;
/// Share of a difference limit above which a hint is issued.
pub const DIFFERENCE_WARNING_RATIO: f64 = 0.5;
/// Utilization below which the layout is considered sparse (%).
pub const LOW_UTILIZATION_PERCENT: f64 = 60.0;
/// Utilization above which the layout is considered dense (%).
pub const HIGH_UTILIZATION_PERCENT: f64 = 95.0;

/// One hint about the current load.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    LateralDifferenceExceeded { difference: f64 },
    LateralDifferenceHigh { difference: f64 },
    LongitudinalDifferenceExceeded { difference: f64 },
    LongitudinalDifferenceHigh { difference: f64 },
    LowUtilization { percent: f64 },
    HighUtilization { percent: f64 },
    Balanced,
    Unbalanced,
}

impl Suggestion {
    pub fn code(&self) -> &'static str {
        match self {
            Suggestion::LateralDifferenceExceeded { .. } => "lateral_difference_exceeded",
            Suggestion::LateralDifferenceHigh { .. } => "lateral_difference_high",
            Suggestion::LongitudinalDifferenceExceeded { .. } => "longitudinal_difference_exceeded",
            Suggestion::LongitudinalDifferenceHigh { .. } => "longitudinal_difference_high",
            Suggestion::LowUtilization { .. } => "low_utilization",
            Suggestion::HighUtilization { .. } => "high_utilization",
            Suggestion::Balanced => "balanced",
            Suggestion::Unbalanced => "unbalanced",
        }
    }

    /// Whether the hint asks for a change to the layout.
    pub fn is_warning(&self) -> bool {
        !matches!(
            self,
            Suggestion::HighUtilization { .. } | Suggestion::Balanced
        )
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suggestion::LateralDifferenceExceeded { difference } => write!(
                f,
                "⚠️ Left/right weight difference of {:.0} kg exceeds {:.0} kg",
                difference, LATERAL_DIFFERENCE_LIMIT
            ),
            Suggestion::LateralDifferenceHigh { difference } => write!(
                f,
                "⚡ Left/right weight difference of {:.0} kg is close to the limit",
                difference
            ),
            Suggestion::LongitudinalDifferenceExceeded { difference } => write!(
                f,
                "⚠️ Front/rear weight difference of {:.0} kg exceeds {:.0} kg",
                difference, LONGITUDINAL_DIFFERENCE_LIMIT
            ),
            Suggestion::LongitudinalDifferenceHigh { difference } => write!(
                f,
                "⚡ Front/rear weight difference of {:.0} kg is close to the limit",
                difference
            ),
            Suggestion::LowUtilization { percent } => write!(
                f,
                "📦 Floor utilization is low ({:.1}%), consider a denser layout",
                percent
            ),
            Suggestion::HighUtilization { percent } => {
                write!(f, "✅ Floor utilization is high ({:.1}%)", percent)
            }
            Suggestion::Balanced => write!(f, "✅ Weight distribution is balanced"),
            Suggestion::Unbalanced => write!(f, "⚠️ Weight distribution is unbalanced"),
        }
    }
}

/// Collects the hints for a container, in display order:
/// lateral difference, longitudinal difference, utilization, balance.
pub fn suggestions(container: &Container, report: &BalanceReport) -> Vec<Suggestion> {
    let mut hints = Vec::new();

    let lateral = report.lateral_weight_difference();
    if lateral > LATERAL_DIFFERENCE_LIMIT {
        hints.push(Suggestion::LateralDifferenceExceeded {
            difference: lateral,
        });
    } else if lateral > LATERAL_DIFFERENCE_LIMIT * DIFFERENCE_WARNING_RATIO {
        hints.push(Suggestion::LateralDifferenceHigh {
            difference: lateral,
        });
    }

    let longitudinal = report.longitudinal_weight_difference();
    if longitudinal > LONGITUDINAL_DIFFERENCE_LIMIT {
        hints.push(Suggestion::LongitudinalDifferenceExceeded {
            difference: longitudinal,
        });
    } else if longitudinal > LONGITUDINAL_DIFFERENCE_LIMIT * DIFFERENCE_WARNING_RATIO {
        hints.push(Suggestion::LongitudinalDifferenceHigh {
            difference: longitudinal,
        });
    }

    let percent = container.utilization_percent();
    if percent < LOW_UTILIZATION_PERCENT {
        hints.push(Suggestion::LowUtilization { percent });
    } else if percent > HIGH_UTILIZATION_PERCENT {
        hints.push(Suggestion::HighUtilization { percent });
    }

    hints.push(if report.is_balanced {
        Suggestion::Balanced
    } else {
        Suggestion::Unbalanced
    });
    hints
}
