//! Aggregate functions understood by the platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An aggregate function applied per granularity bucket.
///
/// Parsing accepts the platform's short aliases (`avg`, `cv`, `dv`, `int`,
/// `step`, `tv`); serialization always writes the canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Aggregate {
    Average,
    Count,
    ContinuousVariance,
    DiscreteVariance,
    Interpolation,
    Max,
    Min,
    StepInterpolation,
    Sum,
    TotalVariation,
}

impl Aggregate {
    pub const ALL: [Aggregate; 10] = [
        Aggregate::Average,
        Aggregate::Count,
        Aggregate::ContinuousVariance,
        Aggregate::DiscreteVariance,
        Aggregate::Interpolation,
        Aggregate::Max,
        Aggregate::Min,
        Aggregate::StepInterpolation,
        Aggregate::Sum,
        Aggregate::TotalVariation,
    ];

    /// Canonical name, also the column name of aggregated values.
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Average => "average",
            Aggregate::Count => "count",
            Aggregate::ContinuousVariance => "continuousvariance",
            Aggregate::DiscreteVariance => "discretevariance",
            Aggregate::Interpolation => "interpolation",
            Aggregate::Max => "max",
            Aggregate::Min => "min",
            Aggregate::StepInterpolation => "stepinterpolation",
            Aggregate::Sum => "sum",
            Aggregate::TotalVariation => "totalvariation",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown aggregate `{0}`")]
pub struct UnknownAggregate(pub String);

impl FromStr for Aggregate {
    type Err = UnknownAggregate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let aggregate = match s {
            "avg" | "average" => Aggregate::Average,
            "count" => Aggregate::Count,
            "cv" | "continuousvariance" => Aggregate::ContinuousVariance,
            "dv" | "discretevariance" => Aggregate::DiscreteVariance,
            "int" | "interpolation" => Aggregate::Interpolation,
            "max" => Aggregate::Max,
            "min" => Aggregate::Min,
            "step" | "stepinterpolation" => Aggregate::StepInterpolation,
            "sum" => Aggregate::Sum,
            "tv" | "totalvariation" => Aggregate::TotalVariation,
            other => return Err(UnknownAggregate(other.to_string())),
        };
        Ok(aggregate)
    }
}

impl TryFrom<String> for Aggregate {
    type Error = UnknownAggregate;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Aggregate> for String {
    fn from(aggregate: Aggregate) -> Self {
        aggregate.name().to_string()
    }
}
