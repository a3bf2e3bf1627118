use chrono::{Local, NaiveDateTime, TimeZone};

use crate::error::SelectError;
use crate::project::Project;

use super::{default_granularity_millis, Candidate, FileSelector, When};

/// Format of the `datetime` attribute unless `pattern` overrides it.
pub const DEFAULT_DATE_PATTERN: &str = "%m/%d/%Y %I:%M %p";

/// Compares modification time against a fixed instant.
///
/// Times within `granularity` milliseconds of each other are equal, which
/// absorbs coarse filesystem timestamps.
#[derive(Debug, Clone)]
pub struct DateSelector {
    millis: Option<i64>,
    datetime: Option<String>,
    pattern: Option<String>,
    when: When,
    granularity: i64,
    check_dirs: bool,
}

impl Default for DateSelector {
    fn default() -> Self {
        Self {
            millis: None,
            datetime: None,
            pattern: None,
            when: When::Equal,
            granularity: default_granularity_millis(),
            check_dirs: false,
        }
    }
}

impl DateSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_millis(&mut self, millis: i64) {
        self.millis = Some(millis);
    }

    /// A local date and time in `pattern` format.
    pub fn set_datetime(&mut self, datetime: impl Into<String>) {
        self.datetime = Some(datetime.into());
    }

    /// A chrono format string for `datetime`.
    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = Some(pattern.into());
    }

    pub fn set_when(&mut self, when: &str) -> Result<(), SelectError> {
        self.when = when.parse()?;
        Ok(())
    }

    pub fn set_granularity(&mut self, millis: i64) {
        self.granularity = millis;
    }

    /// Also compare directories; by default they are always selected.
    pub fn set_check_dirs(&mut self, check: bool) {
        self.check_dirs = check;
    }

    /// The instant compared against, in milliseconds since the epoch.
    pub fn millis(&self) -> Result<i64, SelectError> {
        let millis = match (&self.datetime, self.millis) {
            (Some(datetime), _) => {
                let pattern = self.pattern.as_deref().unwrap_or(DEFAULT_DATE_PATTERN);
                let naive = NaiveDateTime::parse_from_str(datetime, pattern).map_err(|_| {
                    SelectError::Validation(format!(
                        "Date of {datetime} Cannot be parsed correctly. It should be in '{pattern}' format."
                    ))
                })?;
                let local = Local.from_local_datetime(&naive).earliest().ok_or_else(|| {
                    SelectError::Validation(format!("Date of {datetime} does not exist locally"))
                })?;
                let millis = local.timestamp_millis();
                if millis < 0 {
                    return Err(SelectError::Validation(format!(
                        "Date of {datetime} results in negative milliseconds value relative to epoch (January 1, 1970, 00:00:00 GMT)."
                    )));
                }
                millis
            }
            (None, Some(millis)) => millis,
            (None, None) => {
                return Err(SelectError::Validation(
                    "You must provide a datetime or the number of milliseconds.".into(),
                ))
            }
        };
        if millis < 0 {
            return Err(SelectError::Validation(format!(
                "Date of {millis} results in negative milliseconds value relative to epoch (January 1, 1970, 00:00:00 GMT)."
            )));
        }
        Ok(millis)
    }
}

impl FileSelector for DateSelector {
    fn is_selected(&self, _project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let millis = self.millis()?;
        if candidate.resource.is_directory() && !self.check_dirs {
            return Ok(true);
        }
        let modified = candidate.resource.last_modified_millis();
        let g = self.granularity;
        Ok(match self.when {
            When::Less => modified < millis - g,
            When::More => modified > millis + g,
            When::Equal => (modified - millis).abs() <= g,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_required() {
        let err = DateSelector::new().millis().unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must provide a datetime or the number of milliseconds."
        );
    }

    #[test]
    fn unparseable_datetime() {
        let mut s = DateSelector::new();
        s.set_datetime("not a date");
        assert!(s.millis().unwrap_err().to_string().contains("Cannot be parsed"));
    }

    #[test]
    fn pre_epoch_is_rejected() {
        let mut s = DateSelector::new();
        s.set_datetime("01/01/1900 12:00 AM");
        assert!(s.millis().unwrap_err().to_string().contains("negative milliseconds"));
    }

    #[test]
    fn pattern_may_be_set_after_datetime() {
        let mut s = DateSelector::new();
        s.set_datetime("2001-09-09 01:46");
        s.set_pattern("%Y-%m-%d %H:%M");
        assert!(s.millis().is_ok());
    }
}
