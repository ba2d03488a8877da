//! Export of the rental history as CSV.
//!
//! The ledger is read fresh from storage, ordered by pickup time and written
//! with one row per rental. Unreturned rentals leave `actual_return` empty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use shared::Rental;

use crate::domain::error::{RentalError, RentalResult};
use crate::domain::rental_ledger::RentalLedger;
use crate::storage::Connection;

const EXPORT: &str = "export";

#[derive(Debug, Serialize)]
struct RentalRow<'a> {
    rental_id: &'a str,
    plate: &'a str,
    vehicle: String,
    client_tax_id: &'a str,
    start: String,
    planned_return: String,
    actual_return: String,
    total: String,
}

impl<'a> RentalRow<'a> {
    fn from_rental(rental: &'a Rental) -> Self {
        Self {
            rental_id: &rental.id,
            plate: &rental.vehicle.plate,
            vehicle: rental.vehicle.display_name(),
            client_tax_id: &rental.client.tax_id,
            start: format_timestamp(&rental.start),
            planned_return: format_timestamp(&rental.planned_return),
            actual_return: rental
                .actual_return
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
            total: format!("{:.2}", rental.total),
        }
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M").to_string()
}

/// CSV produced for a ledger export
#[derive(Debug, Clone)]
pub struct RentalExport {
    pub csv_content: String,
    pub filename: String,
    pub rental_count: usize,
}

#[derive(Clone, Default)]
pub struct ExportService;

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    /// Render `rentals` as CSV in the order given
    pub fn rentals_csv(&self, rentals: &[Rental]) -> RentalResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for rental in rentals {
            writer
                .serialize(RentalRow::from_rental(rental))
                .map_err(|e| RentalError::persistence(EXPORT, e.into()))?;
        }
        // An empty ledger still gets a header row
        if rentals.is_empty() {
            writer
                .write_record([
                    "rental_id",
                    "plate",
                    "vehicle",
                    "client_tax_id",
                    "start",
                    "planned_return",
                    "actual_return",
                    "total",
                ])
                .map_err(|e| RentalError::persistence(EXPORT, e.into()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| RentalError::persistence(EXPORT, anyhow::anyhow!("{}", e)))?;
        String::from_utf8(bytes).map_err(|e| RentalError::persistence(EXPORT, e.into()))
    }

    pub fn export_ledger_csv<C: Connection>(
        &self,
        ledger: &mut RentalLedger<C>,
        now: DateTime<Utc>,
    ) -> RentalResult<RentalExport> {
        let mut rentals = ledger.all_rentals()?;
        rentals.sort_by_key(|r| r.start);

        let csv_content = self.rentals_csv(&rentals)?;
        let export = RentalExport {
            csv_content,
            filename: format!("rentals_{}.csv", now.format("%Y%m%d")),
            rental_count: rentals.len(),
        };

        info!(
            "Exported {} rentals ({} bytes) as {}",
            export.rental_count,
            export.csv_content.len(),
            export.filename
        );
        Ok(export)
    }

    /// Write the ledger export into `directory`, or the documents folder
    /// when no directory is given. Returns the written file's path.
    pub fn export_to_path<C: Connection>(
        &self,
        ledger: &mut RentalLedger<C>,
        directory: Option<&str>,
        now: DateTime<Utc>,
    ) -> RentalResult<PathBuf> {
        let export = self.export_ledger_csv(ledger, now)?;

        let export_dir = match directory {
            Some(custom) if !custom.trim().is_empty() => PathBuf::from(sanitize_path(custom)),
            _ => dirs::document_dir().or_else(dirs::home_dir).ok_or_else(|| {
                error!("Could not determine a default export directory");
                RentalError::InvalidInput("no export directory available".to_string())
            })?,
        };

        let file_path = export_dir.join(&export.filename);
        write_export(&file_path, &export.csv_content)?;

        info!("Wrote {} rentals to {}", export.rental_count, file_path.display());
        Ok(file_path)
    }
}

fn write_export(file_path: &Path, content: &str) -> RentalResult<()> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            error!("Failed to create export directory {:?}: {}", parent, e);
            RentalError::persistence(EXPORT, e.into())
        })?;
    }
    fs::write(file_path, content).map_err(|e| {
        error!("Failed to write export file {:?}: {}", file_path, e);
        RentalError::persistence(EXPORT, e.into())
    })
}

/// Clean up a user-typed directory: quotes, escaped spaces, trailing
/// separators and a leading `~`
fn sanitize_path(path: &str) -> String {
    let mut cleaned = path.trim().to_string();

    if cleaned.len() >= 2
        && ((cleaned.starts_with('"') && cleaned.ends_with('"'))
            || (cleaned.starts_with('\'') && cleaned.ends_with('\'')))
    {
        cleaned = cleaned[1..cleaned.len() - 1].trim().to_string();
    }

    cleaned = cleaned.replace("\\ ", " ");

    while cleaned.len() > 1 && (cleaned.ends_with('/') || cleaned.ends_with('\\')) {
        cleaned.pop();
    }

    if let Some(home) = dirs::home_dir() {
        if cleaned == "~" {
            cleaned = home.to_string_lossy().into_owned();
        } else if let Some(rest) = cleaned.strip_prefix("~/").or_else(|| cleaned.strip_prefix("~\\")) {
            cleaned = home.join(rest).to_string_lossy().into_owned();
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::BillingPolicy;
    use crate::domain::clock::SystemClock;
    use crate::storage::test_utils::{sample_car, sample_client, sample_rental, TestEnvironment};
    use crate::storage::RentalStorage;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn seeded_ledger(env: &TestEnvironment) -> RentalLedger<crate::storage::StoreConnection> {
        let client = sample_client("123", "ana@example.com", 0.0);
        let car = sample_car("CAR-1", "Fiat", 100.0);
        let second_car = sample_car("CAR-2", "Kia", 80.0);
        let first_start = Utc.with_ymd_and_hms(2025, 2, 1, 9, 30, 0).unwrap();

        let mut returned = sample_rental(&car, &client, first_start, 2);
        returned.actual_return = Some(first_start + Duration::days(2));
        let active = sample_rental(&second_car, &client, first_start + Duration::days(5), 1);

        // Stored out of order on purpose
        env.connection
            .create_rental_repository()
            .save_rentals(&[active, returned])
            .unwrap();

        RentalLedger::new(
            Arc::new(env.connection.clone()),
            Arc::new(SystemClock),
            BillingPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_export_ledger_csv() {
        let env = TestEnvironment::new().unwrap();
        let mut ledger = seeded_ledger(&env);
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();

        let export = ExportService::new().export_ledger_csv(&mut ledger, now).unwrap();
        assert_eq!(export.rental_count, 2);
        assert_eq!(export.filename, "rentals_20250304.csv");

        let lines: Vec<&str> = export.csv_content.lines().collect();
        assert_eq!(
            lines[0],
            "rental_id,plate,vehicle,client_tax_id,start,planned_return,actual_return,total"
        );
        assert!(lines[1].contains("CAR-1,Fiat Model,123,2025-02-01 09:30,2025-02-03 09:30,2025-02-03 09:30,200.00"));
        assert!(lines[2].ends_with("CAR-2,Kia Model,123,2025-02-06 09:30,2025-02-07 09:30,,80.00"));
    }

    #[test]
    fn test_empty_ledger_has_header() {
        let csv = ExportService::new().rentals_csv(&[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "rental_id,plate,vehicle,client_tax_id,start,planned_return,actual_return,total"
        );
    }

    #[test]
    fn test_export_to_path() {
        let env = TestEnvironment::new().unwrap();
        let mut ledger = seeded_ledger(&env);
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let target = env.base_path.join("exports");
        let quoted = format!("\"{}/\"", target.display());

        let written = ExportService::new()
            .export_to_path(&mut ledger, Some(&quoted), now)
            .unwrap();
        assert_eq!(written, target.join("rentals_20250304.csv"));
        let content = std::fs::read_to_string(written).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("  '/tmp/out/'  "), "/tmp/out");
        assert_eq!(sanitize_path("/tmp/my\\ exports"), "/tmp/my exports");
        assert_eq!(sanitize_path("/"), "/");
    }
}
