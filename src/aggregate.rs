use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{round_ratio, GroupSummary, Record, StudentGroup};

/// Groups keyed by student name, iterated in first-seen order.
#[derive(Debug, Default)]
struct OrderedGroups {
    index: HashMap<String, usize>,
    groups: Vec<(String, Vec<Record>)>,
}

impl OrderedGroups {
    fn push(&mut self, record: Record) {
        match self.index.get(&record.student_name) {
            Some(&slot) => self.groups[slot].1.push(record),
            None => {
                self.index
                    .insert(record.student_name.clone(), self.groups.len());
                self.groups.push((record.student_name.clone(), vec![record]));
            }
        }
    }

    fn into_groups(self) -> Vec<(String, Vec<Record>)> {
        self.groups
    }
}

/// Newest period first; year dominates month.
pub fn by_period_desc(a: &Record, b: &Record) -> Ordering {
    b.year.cmp(&a.year).then_with(|| b.month.cmp(&a.month))
}

pub fn group_by_student(records: &[Record]) -> Vec<StudentGroup> {
    let mut ordered = OrderedGroups::default();
    for record in records {
        ordered.push(record.clone());
    }

    ordered
        .into_groups()
        .into_iter()
        .map(|(student_name, mut records)| {
            // Stable, so records sharing a period keep insertion order.
            records.sort_by(by_period_desc);
            let summary = summarize(&records);
            StudentGroup {
                student_name,
                records,
                summary,
            }
        })
        .collect()
}

pub fn summarize(records: &[Record]) -> GroupSummary {
    let total = records.len();
    let frequency_sum: u64 = records.iter().map(|r| u64::from(r.frequency)).sum();
    let approved_count = records.iter().filter(|r| r.is_approved()).count();

    GroupSummary {
        average_frequency: round_ratio(frequency_sum, total as u64),
        approved_count,
        total,
        approval_rate: round_ratio(100 * approved_count as u64, total as u64),
    }
}
