use rust_xlsxwriter::{Workbook, XlsxError};

use crate::models::Registration;

const HEADERS: [&str; 5] = [
    "Name",
    "Section",
    "Registration No",
    "Mobile",
    "Registration Date",
];

// Column widths matching the export layout admins expect.
const COLUMN_WIDTHS: [f64; 5] = [20.0, 10.0, 15.0, 12.0, 15.0];

/// Render an event's registrations as an .xlsx workbook with a single
/// "Registrations" sheet and fixed columns.
pub fn registrations_workbook(registrations: &[Registration]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Registrations")?;

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
        sheet.set_column_width(col as u16, COLUMN_WIDTHS[col])?;
    }

    for (i, reg) in registrations.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &reg.name)?;
        sheet.write_string(row, 1, &reg.section)?;
        sheet.write_string(row, 2, &reg.reg_no)?;
        sheet.write_string(row, 3, &reg.mobile)?;
        sheet.write_string(row, 4, reg.created_at.format("%d/%m/%Y").to_string())?;
    }

    workbook.save_to_buffer()
}

/// Event titles go into a Content-Disposition header; keep only characters
/// that are safe there.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "event".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(reg_no: &str) -> Registration {
        Registration {
            id: 1,
            name: "Asha Rao".to_string(),
            section: "B".to_string(),
            reg_no: reg_no.to_string(),
            mobile: "9876543210".to_string(),
            event_id: 7,
            status: "confirmed".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn workbook_is_a_zip_container() {
        let buffer = registrations_workbook(&[sample("21BCE1001"), sample("21BCE1002")]).unwrap();
        // xlsx is a zip archive; check the magic bytes
        assert!(buffer.len() > 4);
        assert_eq!(&buffer[..2], b"PK");
    }

    #[test]
    fn empty_export_still_produces_a_workbook() {
        let buffer = registrations_workbook(&[]).unwrap();
        assert!(!buffer.is_empty());
    }

    #[test]
    fn filenames_are_header_safe() {
        assert_eq!(sanitize_filename("Tech Fest 2025"), "Tech-Fest-2025");
        assert_eq!(sanitize_filename("a/b\\c\"d"), "a-b-c-d");
        assert_eq!(sanitize_filename("???"), "event");
    }
}
