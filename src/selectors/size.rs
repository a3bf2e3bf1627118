use std::str::FromStr;

use crate::error::SelectError;
use crate::project::Project;

use super::{illegal_value, Candidate, FileSelector, When};

/// Size multiplier. Bare letters are decimal, `i` suffixed ones binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Bytes,
    Kilo,
    Kibi,
    Mega,
    Mebi,
    Giga,
    Gibi,
    Tera,
    Tebi,
}

impl Unit {
    pub fn multiplier(self) -> i64 {
        match self {
            Self::Bytes => 1,
            Self::Kilo => 1_000,
            Self::Kibi => 1 << 10,
            Self::Mega => 1_000_000,
            Self::Mebi => 1 << 20,
            Self::Giga => 1_000_000_000,
            Self::Gibi => 1 << 30,
            Self::Tera => 1_000_000_000_000,
            Self::Tebi => 1 << 40,
        }
    }
}

impl FromStr for Unit {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "b" | "B" => Ok(Self::Bytes),
            "k" | "K" => Ok(Self::Kilo),
            "ki" | "Ki" => Ok(Self::Kibi),
            "m" | "M" => Ok(Self::Mega),
            "mi" | "Mi" => Ok(Self::Mebi),
            "g" | "G" => Ok(Self::Giga),
            "gi" | "Gi" => Ok(Self::Gibi),
            "t" | "T" => Ok(Self::Tera),
            "ti" | "Ti" => Ok(Self::Tebi),
            _ => Err(illegal_value(s)),
        }
    }
}

/// Compares file size against `value * units`. Directories are always
/// selected.
#[derive(Debug, Clone, Default)]
pub struct SizeSelector {
    value: Option<i64>,
    units: Unit,
    when: When,
}

impl SizeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, value: i64) {
        self.value = Some(value);
    }

    pub fn set_units(&mut self, units: &str) -> Result<(), SelectError> {
        self.units = units.parse()?;
        Ok(())
    }

    pub fn set_when(&mut self, when: &str) -> Result<(), SelectError> {
        self.when = when.parse()?;
        Ok(())
    }

    fn limit(&self) -> Result<i64, SelectError> {
        match self.value {
            Some(v) if v >= 0 => v.checked_mul(self.units.multiplier()).ok_or_else(|| {
                SelectError::Validation(format!("size limit {v}{:?} overflows", self.units))
            }),
            _ => Err(SelectError::Validation(
                "The value attribute is required, and must be positive".into(),
            )),
        }
    }
}

impl FileSelector for SizeSelector {
    fn is_selected(&self, _project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let limit = self.limit()?;
        if candidate.resource.is_directory() {
            return Ok(true);
        }
        let size = candidate.resource.size.unwrap_or(0) as i64;
        Ok(match self.when {
            When::Less => size < limit,
            When::Equal => size == limit,
            When::More => size > limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_and_binary_units_differ() {
        assert_eq!(Unit::Kilo.multiplier(), 1000);
        assert_eq!(Unit::Kibi.multiplier(), 1024);
        assert_eq!(Unit::Tebi.multiplier(), 1_099_511_627_776);
    }

    #[test]
    fn unknown_unit_is_rejected_when_set() {
        let mut s = SizeSelector::new();
        assert!(s.set_units("KB").is_err());
        assert!(s.set_units("Mi").is_ok());
    }
}
