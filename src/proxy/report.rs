//! CSV report and end-of-run summary

use crate::proxy::error::Error;
use crate::proxy::models::{Locale, ProbeResult, StatusCode};
use crate::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Report columns, in order
pub const HEADER: [&str; 10] = [
    "name",
    "displayName",
    "port",
    "proxyAddress",
    "status",
    "remoteIP",
    "country",
    "city",
    "isp",
    "latencyMs",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    name: &'a str,
    display_name: &'a str,
    port: u16,
    proxy_address: String,
    status: &'static str,
    remote_ip: &'a str,
    country: &'a str,
    city: &'a str,
    isp: &'a str,
    latency_ms: String,
}

/// Writes probe results as CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWriter {
    locale: Locale,
    bom: bool,
}

impl ReportWriter {
    pub fn new(locale: Locale) -> Self {
        Self { locale, bom: false }
    }

    /// Prefix the file with a UTF-8 byte order mark
    pub fn with_bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    /// Write the report to `path`, replacing any existing file
    pub fn write<P: AsRef<Path>>(&self, results: &[ProbeResult], path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::write(path, e))?;
        self.write_to(results, file)
            .map_err(|e| Error::write(path, e))
    }

    /// Write the report to any writer
    pub fn write_to<W: Write>(&self, results: &[ProbeResult], mut out: W) -> io::Result<()> {
        if self.bom {
            out.write_all(UTF8_BOM)?;
        }

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
        writer.write_record(HEADER)?;
        for result in results {
            writer.serialize(self.row(result))?;
        }
        writer.flush()
    }

    fn row<'a>(&self, result: &'a ProbeResult) -> ReportRow<'a> {
        let descriptor = &result.descriptor;
        ReportRow {
            name: &descriptor.name,
            display_name: &descriptor.display_name,
            port: descriptor.port,
            proxy_address: descriptor.proxy_address(),
            status: result.status().label(self.locale),
            remote_ip: result.remote_ip().unwrap_or_default(),
            country: result.country().unwrap_or_default(),
            city: result.city().unwrap_or_default(),
            isp: result.isp().unwrap_or_default(),
            latency_ms: result
                .latency_ms()
                .map(|ms| format!("{:.2}", ms))
                .unwrap_or_default(),
        }
    }
}

/// Status counts for a finished batch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    counts: HashMap<StatusCode, usize>,
}

impl Summary {
    pub fn from_results(results: &[ProbeResult]) -> Self {
        let mut counts = HashMap::new();
        for result in results {
            *counts.entry(result.status()).or_insert(0) += 1;
        }
        Self {
            total: results.len(),
            counts,
        }
    }

    pub fn count(&self, status: StatusCode) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Share of `status` in percent
    pub fn rate(&self, status: StatusCode) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(status) as f64 * 100.0 / self.total as f64
    }

    /// Human readable summary, one status per line
    pub fn render(&self, locale: Locale) -> String {
        let mut out = format!("Total: {} proxies\n", self.total);
        for status in StatusCode::ALL {
            let count = self.count(status);
            if count == 0 && status != StatusCode::Success {
                continue;
            }
            let _ = writeln!(
                out,
                "{}: {} ({:.2}%)",
                status.label(locale),
                count,
                self.rate(status)
            );
        }
        out
    }
}

/// The first `n` successful results, in report order
pub fn top_successes(results: &[ProbeResult], n: usize) -> impl Iterator<Item = &ProbeResult> {
    results.iter().filter(|r| r.is_success()).take(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{Egress, ProxyDescriptor};

    fn sample_results() -> Vec<ProbeResult> {
        vec![
            ProbeResult::success(
                ProxyDescriptor::new("hk-01", 42000).with_display_name("Hong Kong, 01"),
                Egress {
                    remote_ip: "1.2.3.4".to_string(),
                    country: "HK".to_string(),
                    city: "Hong Kong".to_string(),
                    isp: "AS9269 Hong Kong Broadband Network Ltd.".to_string(),
                    latency_ms: 231.456,
                },
            ),
            ProbeResult::timeout(ProxyDescriptor::new("jp-01", 42001)),
            ProbeResult::connection_failed(ProxyDescriptor::new("us-01", 42002), "refused"),
            ProbeResult::lookup_failed(
                ProxyDescriptor::new("sg \"quoted\"", 42003),
                "HTTP status: 403",
            ),
        ]
    }

    fn write_to_string(writer: ReportWriter, results: &[ProbeResult]) -> String {
        let mut buf = Vec::new();
        writer.write_to(results, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_only_for_empty_results() {
        let csv = write_to_string(ReportWriter::new(Locale::En), &[]);
        assert_eq!(
            csv,
            "name,displayName,port,proxyAddress,status,remoteIP,country,city,isp,latencyMs\n"
        );
    }

    #[test]
    fn test_rows_round_trip() {
        let results = sample_results();
        let csv = write_to_string(ReportWriter::new(Locale::En), &results);

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), HEADER);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), results.len());

        for (row, result) in rows.iter().zip(&results) {
            assert_eq!(&row[0], result.descriptor.name);
            assert_eq!(&row[1], result.descriptor.display_name);
            assert_eq!(&row[2], result.descriptor.port.to_string());
            assert_eq!(&row[3], result.descriptor.proxy_address());
            assert_eq!(&row[4], result.status().label(Locale::En));
            assert_eq!(&row[5], result.remote_ip().unwrap_or(""));
            assert_eq!(&row[6], result.country().unwrap_or(""));
            assert_eq!(&row[7], result.city().unwrap_or(""));
            assert_eq!(&row[8], result.isp().unwrap_or(""));
        }

        assert_eq!(&rows[0][9], "231.46");
        assert_eq!(&rows[1][9], "");
        assert_eq!(&rows[1][4], "Timeout");
        assert_eq!(&rows[2][4], "Connection Failed");
        assert_eq!(&rows[3][4], "Lookup Failed");
    }

    #[test]
    fn test_embedded_commas_are_quoted() {
        let csv = write_to_string(ReportWriter::new(Locale::En), &sample_results());
        assert!(csv.contains("\"Hong Kong, 01\""));
        assert!(csv.contains("\"sg \"\"quoted\"\"\""));
    }

    #[test]
    fn test_localized_labels_and_bom() {
        let writer = ReportWriter::new(Locale::Zh).with_bom(true);
        let csv = write_to_string(writer, &sample_results());

        assert!(csv.starts_with('\u{feff}'));
        assert!(csv.contains(",成功,"));
        assert!(csv.contains(",超时,"));
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let path = std::env::temp_dir().join(format!("{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, "stale content that is longer than nothing\n".repeat(50)).unwrap();

        ReportWriter::new(Locale::En).write(&[], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("name,"));
    }

    #[test]
    fn test_unwritable_path() {
        let path = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("report.csv");

        let err = ReportWriter::new(Locale::En)
            .write(&sample_results(), &path)
            .unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[test]
    fn test_summary() {
        let results = sample_results();
        let summary = Summary::from_results(&results);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.count(StatusCode::Success), 1);
        assert_eq!(summary.count(StatusCode::Timeout), 1);
        assert_eq!(summary.rate(StatusCode::Success), 25.0);

        let rendered = summary.render(Locale::En);
        assert!(rendered.starts_with("Total: 4 proxies\n"));
        assert!(rendered.contains("Success: 1 (25.00%)"));
        assert!(rendered.contains("Lookup Failed: 1 (25.00%)"));
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = Summary::from_results(&[]);
        assert_eq!(summary.rate(StatusCode::Success), 0.0);
        assert_eq!(summary.render(Locale::En), "Total: 0 proxies\nSuccess: 0 (0.00%)\n");
    }

    #[test]
    fn test_top_successes() {
        let results = sample_results();
        let top: Vec<_> = top_successes(&results, 5).collect();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].descriptor.name, "hk-01");
    }
}
