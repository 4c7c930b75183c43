use std::fmt::Write;

use chrono::NaiveDate;
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::error::AttendanceError;
use crate::models::{GroupSummary, Record, StudentGroup};

pub const CSV_HEADER: &str =
    "Nome,INEP,Turma,Mês,Ano,Dias Frequentados,Total de Dias,Frequência,Motivo";

/// Shown in place of an empty reason.
pub const REASON_PLACEHOLDER: &str = "-";

const PRINT_CSS: &str = r#"
body { font-family: Arial, Helvetica, sans-serif; color: #1f2937; margin: 24px; }
h1 { font-size: 22px; margin-bottom: 4px; }
.generated { color: #6b7280; font-size: 12px; margin-bottom: 24px; }
.student-section { page-break-inside: avoid; margin-bottom: 28px; border: 1px solid #d1d5db; border-radius: 6px; }
.student-header { background: #1e3a8a; color: #ffffff; padding: 10px 14px; }
.student-header h2 { font-size: 16px; margin: 0; }
.student-header .meta { font-size: 12px; margin-top: 4px; }
table { width: 100%; border-collapse: collapse; font-size: 12px; }
th, td { border-bottom: 1px solid #e5e7eb; padding: 6px 10px; text-align: left; }
th { background: #f3f4f6; }
.approved { color: #15803d; font-weight: bold; }
.warning { color: #b91c1c; font-weight: bold; }
.summary-grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 8px; padding: 10px 14px; background: #f9fafb; }
.summary-grid .label { font-size: 11px; color: #6b7280; }
.summary-grid .value { font-size: 15px; font-weight: bold; }
"#;

fn reason_or_placeholder(record: &Record) -> &str {
    if record.reason.is_empty() {
        REASON_PLACEHOLDER
    } else {
        &record.reason
    }
}

fn status_class(record: &Record) -> &'static str {
    if record.is_approved() {
        "approved"
    } else {
        "warning"
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub fn render_history(groups: &[StudentGroup]) -> Result<String, AttendanceError> {
    if groups.is_empty() {
        return Err(AttendanceError::NothingToExport);
    }

    let markup = html! {
        @for group in groups {
            div.student-card {
                h3 { (group.student_name) }
                table.records-table {
                    thead {
                        tr {
                            th { "Mês/Ano" }
                            th { "Dias" }
                            th { "Total" }
                            th { "Frequência" }
                            th { "Motivo" }
                            th { "Ação" }
                        }
                    }
                    tbody {
                        @for record in &group.records {
                            tr {
                                td { (record.period_label()) }
                                td { (record.days_attended) }
                                td { (record.total_days) }
                                td {
                                    span class={ "frequency-badge " (status_class(record)) } {
                                        (format!("{}%", record.frequency))
                                    }
                                }
                                td { (reason_or_placeholder(record)) }
                                td {
                                    button.delete-btn
                                        type="button"
                                        data-id=(record.id.to_string()) { "Excluir" }
                                }
                            }
                        }
                    }
                }
                (history_summary(&group.summary))
            }
        }
    };

    Ok(markup.into_string())
}

fn history_summary(summary: &GroupSummary) -> Markup {
    html! {
        div.student-summary {
            div { strong { "Média:" } " " (format!("{}%", summary.average_frequency)) }
            div {
                strong { "Aprovados:" }
                " " (format!("{}/{}", summary.approved_count, summary.total))
            }
            div { strong { "Taxa de aprovação:" } " " (format!("{}%", summary.approval_rate)) }
        }
    }
}

/// Sorted by name, then newest period first.
pub fn render_csv(records: &[Record]) -> Result<String, AttendanceError> {
    if records.is_empty() {
        return Err(AttendanceError::NothingToExport);
    }

    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        a.student_name
            .cmp(&b.student_name)
            .then_with(|| crate::aggregate::by_period_desc(a, b))
    });

    let mut output = String::new();
    let _ = writeln!(output, "{CSV_HEADER}");
    for record in &sorted {
        let _ = writeln!(
            output,
            "{},{},{},{},{},{},{},{},{}",
            quoted(&record.student_name),
            quoted(&record.inep_code),
            quoted(&record.class_name),
            record.month,
            record.year,
            record.days_attended,
            record.total_days,
            record.frequency,
            quoted(reason_or_placeholder(record)),
        );
    }

    Ok(output)
}

/// Self-contained HTML report meant to be printed or saved as PDF.
pub fn render_printable(
    groups: &[StudentGroup],
    generated_on: NaiveDate,
) -> Result<String, AttendanceError> {
    if groups.is_empty() {
        return Err(AttendanceError::NothingToExport);
    }

    let markup = html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="utf-8";
                title { "Relatório de Frequência Escolar" }
                style { (PreEscaped(PRINT_CSS)) }
            }
            body {
                h1 { "Relatório de Frequência Escolar" }
                p.generated { "Gerado em " (generated_on.format("%d/%m/%Y").to_string()) }
                @for group in groups {
                    (printable_section(group))
                }
            }
        }
    };

    Ok(markup.into_string())
}

fn printable_section(group: &StudentGroup) -> Markup {
    let inep = group
        .latest()
        .map(|r| r.inep_code.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(REASON_PLACEHOLDER);
    let class_name = group
        .latest()
        .map(|r| r.class_name.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(REASON_PLACEHOLDER);
    let summary = &group.summary;

    html! {
        section.student-section {
            div.student-header {
                h2 { (group.student_name) }
                div.meta {
                    "INEP: " (inep) " | Turma: " (class_name)
                }
            }
            table {
                thead {
                    tr {
                        th { "Mês/Ano" }
                        th { "Dias Frequentados" }
                        th { "Total de Dias" }
                        th { "Frequência" }
                        th { "Motivo" }
                    }
                }
                tbody {
                    @for record in &group.records {
                        tr {
                            td { (record.period_label()) }
                            td { (record.days_attended) }
                            td { (record.total_days) }
                            td class=(status_class(record)) {
                                (format!("{}%", record.frequency))
                            }
                            td { (reason_or_placeholder(record)) }
                        }
                    }
                }
            }
            div.summary-grid {
                div {
                    div.label { "Média de Frequência" }
                    div.value { (format!("{}%", summary.average_frequency)) }
                }
                div {
                    div.label { "Meses Aprovados" }
                    div.value { (format!("{}/{}", summary.approved_count, summary.total)) }
                }
                div {
                    div.label { "Taxa de Aprovação" }
                    div.value { (format!("{}%", summary.approval_rate)) }
                }
            }
        }
    }
}
