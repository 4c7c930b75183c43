use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod aggregate;
mod app;
mod db;
mod error;
mod import;
mod models;
mod report;
mod store;
mod validate;

use app::Attendance;
use error::AttendanceError;
use import::ImportMode;
use store::{Backend, FileBackend};
use validate::RawForm;

#[derive(Parser)]
#[command(name = "frequencia")]
#[command(about = "Student attendance records and frequency reports", long_about = None)]
struct Cli {
    /// Where the record collection is stored
    #[arg(long, value_enum, global = true, default_value_t = BackendKind::File)]
    backend: BackendKind,
    /// Directory for the file backend
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    File,
    Postgres,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Record one month of attendance for a student
    Add {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        inep: String,
        #[arg(long, default_value = "")]
        class: String,
        #[arg(long, default_value = "")]
        month: String,
        /// Defaults to the current year
        #[arg(long)]
        year: Option<String>,
        #[arg(long, default_value = "")]
        days: String,
        #[arg(long, default_value = "")]
        total: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Show records grouped by student
    History {
        /// Write the history cards as HTML instead of printing a summary
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Delete a single record
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Delete every record
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Export all records as CSV
    ExportCsv {
        #[arg(long, default_value = "frequencia.csv")]
        out: PathBuf,
    },
    /// Export a printable HTML report
    ExportPdf {
        #[arg(long, default_value = "relatorio_frequencia.html")]
        out: PathBuf,
    },
    /// Import records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Replace the stored records instead of appending to them
        #[arg(long)]
        replace: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.backend {
        BackendKind::File => {
            log::debug!("Using file storage in {}", cli.data_dir.display());
            let attendance = Attendance::new(FileBackend::new(cli.data_dir.clone()));
            match cli.command {
                Commands::InitDb => println!("File storage needs no schema."),
                command => run(&attendance, command).await?,
            }
        }
        BackendKind::Postgres => {
            let database_url = std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set to use the postgres backend")?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await
                .context("failed to connect to Postgres")?;

            match cli.command {
                Commands::InitDb => {
                    db::init_db(&pool).await?;
                    println!("Schema ready.");
                }
                command => run(&Attendance::new(db::PgBackend::new(pool)), command).await?,
            }
        }
    }

    Ok(())
}

async fn run<B: Backend>(attendance: &Attendance<B>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {}
        Commands::Add {
            name,
            inep,
            class,
            month,
            year,
            days,
            total,
            reason,
        } => {
            let raw = RawForm {
                student_name: name,
                inep_code: inep,
                class_name: class,
                month,
                year: year.unwrap_or_else(|| Local::now().year().to_string()),
                days_attended: days,
                total_days: total,
                reason,
            };
            match attendance.submit_form(&raw).await {
                Ok(record) => {
                    let status = if record.is_approved() {
                        "Aprovado"
                    } else {
                        "Atenção: frequência abaixo de 75%"
                    };
                    println!(
                        "{} ({}): {}% - {}",
                        record.student_name,
                        record.period_label(),
                        record.frequency,
                        status
                    );
                    println!("Registro {}", record.id);
                }
                Err(AttendanceError::Validation(reason)) => {
                    anyhow::bail!("{reason}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::History { html } => match html {
            Some(out) => match attendance.render_history().await {
                Ok(markup) => write_output(&out, &markup)?,
                Err(AttendanceError::NothingToExport) => {
                    println!("Nenhum registro no histórico.")
                }
                Err(e) => return Err(e.into()),
            },
            None => {
                let groups = attendance.request_history().await;
                if groups.is_empty() {
                    println!("Nenhum registro no histórico.");
                    return Ok(());
                }
                for group in &groups {
                    println!("{}", group.student_name);
                    for record in &group.records {
                        let reason = if record.reason.is_empty() {
                            "-"
                        } else {
                            record.reason.as_str()
                        };
                        println!(
                            "  {} {:>3}/{:<3} {:>3}%  {}  [{}]",
                            record.period_label(),
                            record.days_attended,
                            record.total_days,
                            record.frequency,
                            reason,
                            record.id
                        );
                    }
                    println!(
                        "  Média: {}% | Aprovados: {}/{} | Taxa de aprovação: {}%",
                        group.summary.average_frequency,
                        group.summary.approved_count,
                        group.summary.total,
                        group.summary.approval_rate
                    );
                }
            }
        },
        Commands::Delete { id } => {
            if attendance.delete_record(id).await? {
                println!("Registro {id} excluído.");
            } else {
                println!("Registro {id} não encontrado.");
            }
        }
        Commands::Clear { yes } => {
            if !yes {
                println!("Use --yes para confirmar a limpeza de todo o histórico.");
                return Ok(());
            }
            attendance.clear_all().await?;
            println!("Histórico limpo.");
        }
        Commands::ExportCsv { out } => match attendance.export_csv().await {
            Ok(csv) => write_output(&out, &csv)?,
            Err(AttendanceError::NothingToExport) => println!("Nenhum registro para exportar"),
            Err(e) => return Err(e.into()),
        },
        Commands::ExportPdf { out } => match attendance.export_printable().await {
            Ok(document) => write_output(&out, &document)?,
            Err(AttendanceError::NothingToExport) => println!("Nenhum registro para exportar"),
            Err(e) => return Err(e.into()),
        },
        Commands::Import { csv, replace } => {
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Append
            };
            let summary = attendance
                .import_file(&csv, mode)
                .await
                .with_context(|| format!("failed to import {}", csv.display()))?;
            println!(
                "Importação concluída: {} registros importados, {} erros.",
                summary.imported, summary.errors
            );
        }
    }

    Ok(())
}

fn write_output(out: &Path, contents: &str) -> anyhow::Result<()> {
    std::fs::write(out, contents)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("Arquivo gerado em {}.", out.display());
    Ok(())
}
