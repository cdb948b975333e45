use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tsnd_device::{SavedEntryDescriptor, TelemetrySample, TelemetrySink};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print one serializable record: a JSON line, or `key: value` pairs.
pub fn print_record<T: Serialize>(record: &T, rows: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in rows {
                table.add_row(vec![field.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let width = rows.iter().map(|(field, _)| field.len()).max().unwrap_or(0);
            for (field, value) in rows {
                println!("{field:<width$}  {value}");
            }
        }
    }
}

#[derive(Serialize)]
struct EntryOutput {
    index: u8,
    start: String,
}

pub fn print_entries(entries: &[SavedEntryDescriptor], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<EntryOutput> = entries
                .iter()
                .map(|e| EntryOutput {
                    index: e.index,
                    start: e.start.to_string(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INDEX", "START"]);
            for entry in entries {
                table.add_row(vec![entry.index.to_string(), entry.start.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if entries.is_empty() {
                println!("no saved entries");
            }
            for entry in entries {
                println!("#{:<2} {}", entry.index, entry.start);
            }
        }
    }
}

/// Writes each inertial sample to stdout as it arrives.
///
/// JSON output is one object per line; the other formats print a compact
/// line in physical units, since a streaming table cannot be laid out ahead.
pub struct StdoutSink {
    format: OutputFormat,
    out: std::io::StdoutLock<'static>,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            out: std::io::stdout().lock(),
        }
    }
}

impl TelemetrySink for StdoutSink {
    fn write_sample(&mut self, sample: &TelemetrySample) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, sample)?;
                writeln!(self.out)
            }
            OutputFormat::Table | OutputFormat::Pretty => {
                writeln!(self.out, "{}", sample_line(sample))
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

pub fn sample_line(sample: &TelemetrySample) -> String {
    let [ax, ay, az] = sample.acc_g();
    let [gx, gy, gz] = sample.gyro_dps();
    let mut line = format!(
        "{:>10} ms  acc[g] {ax:>8.4} {ay:>8.4} {az:>8.4}  gyro[dps] {gx:>9.2} {gy:>9.2} {gz:>9.2}",
        sample.ms
    );
    if let Some([w, x, y, z]) = sample.quaternion {
        line.push_str(&format!("  q {w} {x} {y} {z}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_line_uses_physical_units() {
        let sample = TelemetrySample {
            ms: 1000,
            acc: [0, 0, 10_000],
            gyro: [100, 0, -100],
            quaternion: None,
        };
        let line = sample_line(&sample);
        assert!(line.contains("1000 ms"));
        assert!(line.contains("1.0000"));
        assert!(line.contains("-1.00"));
        assert!(!line.contains(" q "));
    }

    #[test]
    fn sample_line_appends_quaternion() {
        let sample = TelemetrySample {
            ms: 5,
            acc: [0; 3],
            gyro: [0; 3],
            quaternion: Some([10_000, 0, 0, -1]),
        };
        assert!(sample_line(&sample).ends_with("q 10000 0 0 -1"));
    }
}
