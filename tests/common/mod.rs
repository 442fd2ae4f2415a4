#![allow(dead_code)]

use dashdeck::Dataset;
use std::io::Write;
use tempfile::NamedTempFile;

pub const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

/// 38 campaign rows; every sixth region cell is blank.
pub fn marketing_rows() -> Vec<(String, f64)> {
    (0..=38)
        .filter(|k| *k != 20)
        .enumerate()
        .map(|(i, k)| {
            let region = if i % 6 == 5 {
                String::new()
            } else {
                REGIONS[i % 4].to_string()
            };
            (region, 70.814 + k as f64)
        })
        .collect()
}

pub fn marketing_dataset() -> Dataset {
    let rows = marketing_rows()
        .into_iter()
        .map(|(region, amount)| vec![region, format!("{:.3}", amount)])
        .collect();
    Dataset::new(
        vec!["ADV_MARKETING_REGION".to_string(), "AMOUNT".to_string()],
        rows,
    )
    .unwrap()
}

pub fn marketing_csv() -> String {
    let mut out = String::from("ADV_MARKETING_REGION,AMOUNT\n");
    for (region, amount) in marketing_rows() {
        out.push_str(&format!("{},{:.3}\n", region, amount));
    }
    out
}

/// Two approved, three rejected and one blank status.
pub fn status_dataset() -> Dataset {
    let rows = [
        ("A-1", "APPROVED"),
        ("A-2", "REJECTED"),
        ("A-3", ""),
        ("A-4", "REJECTED"),
        ("A-5", "APPROVED"),
        ("A-6", "REJECTED"),
    ];
    Dataset::new(
        vec!["ID".to_string(), "STATUS".to_string()],
        rows.iter()
            .map(|(id, status)| vec![id.to_string(), status.to_string()])
            .collect(),
    )
    .unwrap()
}

/// Write `contents` to a temporary file with the given extension.
pub fn write_temp_file(contents: &str, extension: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
