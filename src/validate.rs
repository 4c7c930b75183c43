use crate::error::ValidationFailure;
use crate::models::{ValidatedInput, MAX_YEAR, MIN_YEAR};

/// Field values as typed into the form. Every field may be empty.
#[derive(Debug, Clone, Default)]
pub struct RawForm {
    pub student_name: String,
    pub inep_code: String,
    pub class_name: String,
    pub month: String,
    pub year: String,
    pub days_attended: String,
    pub total_days: String,
    pub reason: String,
}

fn parse_number(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Checks the form rules in order and reports only the first that fails:
/// month, year range, days attended, total days, then days within total.
pub fn validate_form(raw: &RawForm) -> Result<ValidatedInput, ValidationFailure> {
    let month = match parse_number(&raw.month) {
        Some(m) if (1..=12).contains(&m) => m as u32,
        _ => return Err(ValidationFailure::MissingMonth),
    };

    let year = match parse_number(&raw.year) {
        Some(y) if (i64::from(MIN_YEAR)..=i64::from(MAX_YEAR)).contains(&y) => y as i32,
        _ => return Err(ValidationFailure::InvalidYear),
    };

    let days_attended =
        positive(&raw.days_attended).ok_or(ValidationFailure::InvalidDaysAttended)?;
    let total_days = positive(&raw.total_days).ok_or(ValidationFailure::InvalidTotalDays)?;

    if days_attended > total_days {
        return Err(ValidationFailure::DaysExceedTotal);
    }

    Ok(ValidatedInput {
        student_name: raw.student_name.trim().to_string(),
        inep_code: raw.inep_code.trim().to_string(),
        class_name: raw.class_name.trim().to_string(),
        month,
        year,
        days_attended,
        total_days,
        reason: raw.reason.trim().to_string(),
    })
}

fn positive(raw: &str) -> Option<u32> {
    parse_number(raw)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(month: &str, year: &str, days: &str, total: &str) -> RawForm {
        RawForm {
            student_name: " Ana Silva ".to_string(),
            month: month.to_string(),
            year: year.to_string(),
            days_attended: days.to_string(),
            total_days: total.to_string(),
            ..RawForm::default()
        }
    }

    #[test]
    fn accepts_and_normalizes_valid_form() {
        let input = validate_form(&form("3", "2024", "18", "20")).unwrap();
        assert_eq!(input.student_name, "Ana Silva");
        assert_eq!(input.month, 3);
        assert_eq!(input.year, 2024);
        assert_eq!(input.days_attended, 18);
        assert_eq!(input.total_days, 20);
        assert_eq!(input.inep_code, "");
    }

    #[test]
    fn rules_short_circuit_in_order() {
        // Everything is wrong; only the month is reported.
        assert_eq!(
            validate_form(&form("", "1999", "0", "-1")),
            Err(ValidationFailure::MissingMonth)
        );
        assert_eq!(
            validate_form(&form("3", "1999", "0", "-1")),
            Err(ValidationFailure::InvalidYear)
        );
        assert_eq!(
            validate_form(&form("3", "2024", "0", "-1")),
            Err(ValidationFailure::InvalidDaysAttended)
        );
        assert_eq!(
            validate_form(&form("3", "2024", "5", "-1")),
            Err(ValidationFailure::InvalidTotalDays)
        );
        assert_eq!(
            validate_form(&form("3", "2024", "21", "20")),
            Err(ValidationFailure::DaysExceedTotal)
        );
    }

    #[test]
    fn year_bounds_are_inclusive() {
        assert!(validate_form(&form("1", "2000", "1", "1")).is_ok());
        assert!(validate_form(&form("1", "2100", "1", "1")).is_ok());
        assert_eq!(
            validate_form(&form("1", "2101", "1", "1")),
            Err(ValidationFailure::InvalidYear)
        );
    }

    #[test]
    fn month_out_of_range_counts_as_missing() {
        assert_eq!(
            validate_form(&form("13", "2024", "1", "1")),
            Err(ValidationFailure::MissingMonth)
        );
        assert_eq!(
            validate_form(&form("abc", "2024", "1", "1")),
            Err(ValidationFailure::MissingMonth)
        );
    }

    #[test]
    fn failure_messages_are_user_facing() {
        assert_eq!(ValidationFailure::InvalidYear.to_string(), "Ano inválido");
        assert_eq!(
            ValidationFailure::DaysExceedTotal.to_string(),
            "Dias frequentados maior que o total"
        );
    }
}
