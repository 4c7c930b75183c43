use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frequency at or above this percentage counts as approved.
pub const APPROVAL_THRESHOLD: u32 = 75;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

pub const UNNAMED_STUDENT: &str = "Sem Nome";

const MONTHS: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Month name for a month number that was already validated (1..=12).
pub fn month_name(month: u32) -> &'static str {
    debug_assert!((1..=12).contains(&month), "month {month} out of range");
    MONTHS[month as usize - 1]
}

/// Integer division rounded half up, for a non-negative numerator.
///
/// Exact for every input, so 74.5% rounds to 75 and is approved.
pub fn round_ratio(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ((2 * numerator + denominator) / (2 * denominator)) as u32
}

pub fn compute_frequency(days_attended: u32, total_days: u32) -> u32 {
    round_ratio(u64::from(days_attended) * 100, u64::from(total_days))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub student_name: String,
    pub inep_code: String,
    pub class_name: String,
    pub month: u32,
    pub year: i32,
    pub days_attended: u32,
    pub total_days: u32,
    pub reason: String,
}

/// One student's attendance for a single month.
///
/// Records are never edited: deleting and re-adding is the only way to
/// change one. `frequency` is derived from the day counts at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    pub student_name: String,
    #[serde(default)]
    pub inep_code: String,
    #[serde(default)]
    pub class_name: String,
    pub month: u32,
    pub year: i32,
    pub days_attended: u32,
    pub total_days: u32,
    pub frequency: u32,
    #[serde(default)]
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn create(input: ValidatedInput) -> Self {
        let student_name = if input.student_name.trim().is_empty() {
            UNNAMED_STUDENT.to_string()
        } else {
            input.student_name
        };

        Record {
            id: Uuid::now_v7(),
            student_name,
            inep_code: input.inep_code,
            class_name: input.class_name,
            month: input.month,
            year: input.year,
            days_attended: input.days_attended,
            total_days: input.total_days,
            frequency: compute_frequency(input.days_attended, input.total_days),
            reason: input.reason,
            created_at: Utc::now(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.frequency >= APPROVAL_THRESHOLD
    }

    pub fn period_label(&self) -> String {
        format!("{}/{}", month_name(self.month), self.year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSummary {
    pub average_frequency: u32,
    pub approved_count: usize,
    pub total: usize,
    pub approval_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentGroup {
    pub student_name: String,
    pub records: Vec<Record>,
    pub summary: GroupSummary,
}

impl StudentGroup {
    /// The newest record of the group, used for the INEP code and class shown
    /// in report headers.
    pub fn latest(&self) -> Option<&Record> {
        self.records.first()
    }
}

#[cfg(test)]
pub(crate) fn sample_input(
    name: &str,
    month: u32,
    year: i32,
    days: u32,
    total: u32,
) -> ValidatedInput {
    ValidatedInput {
        student_name: name.to_string(),
        inep_code: "12345".to_string(),
        class_name: "5A".to_string(),
        month,
        year,
        days_attended: days,
        total_days: total,
        reason: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_at_threshold_is_approved() {
        let record = Record::create(sample_input("Ana", 3, 2024, 15, 20));
        assert_eq!(record.frequency, 75);
        assert!(record.is_approved());
    }

    #[test]
    fn half_attendance_is_not_approved() {
        let record = Record::create(sample_input("Ana", 3, 2024, 10, 20));
        assert_eq!(record.frequency, 50);
        assert!(!record.is_approved());
    }

    #[test]
    fn frequency_stays_within_bounds() {
        for total in 1..=31 {
            for days in 1..=total {
                let frequency = compute_frequency(days, total);
                let expected = ((days as f64) * 100.0 / (total as f64)).round() as u32;
                assert_eq!(frequency, expected, "{days}/{total}");
                assert!(frequency <= 100);
            }
        }
    }

    #[test]
    fn half_percent_rounds_up() {
        // 149 / 200 = 74.5%
        assert_eq!(compute_frequency(149, 200), 75);
        assert_eq!(round_ratio(5, 2), 3);
        assert_eq!(round_ratio(7, 0), 0);
    }

    #[test]
    fn blank_name_gets_sentinel() {
        let record = Record::create(sample_input("   ", 1, 2024, 1, 1));
        assert_eq!(record.student_name, UNNAMED_STUDENT);
    }

    #[test]
    fn ids_are_distinct_and_ordered() {
        let first = Record::create(sample_input("Ana", 1, 2024, 1, 1));
        let second = Record::create(sample_input("Ana", 1, 2024, 1, 1));
        assert!(first.id < second.id);
    }

    #[test]
    fn month_names_cover_the_year() {
        assert_eq!(month_name(1), "Janeiro");
        assert_eq!(month_name(12), "Dezembro");
    }

    #[test]
    #[should_panic]
    fn month_zero_is_not_a_month() {
        month_name(0);
    }

    #[test]
    fn persisted_shape_uses_camel_case() {
        let record = Record::create(sample_input("Ana", 3, 2024, 18, 20));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["studentName"], "Ana");
        assert_eq!(value["daysAttended"], 18);
        assert_eq!(value["frequency"], 90);
        assert!(value.get("createdAt").is_some());
    }
}
