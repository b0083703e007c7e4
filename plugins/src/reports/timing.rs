//! Final timing figures and slack histograms from a VPR analysis log.

use lazy_static::lazy_static;
use regex::Regex;

use fabflow_core::report::{Alignment, ReportColumn, TableReport};

lazy_static! {
    static ref FINAL_TIMING: Regex = Regex::new(r"^Final.*(Slack|MHz)").expect("valid regex");
    static ref FINAL_HISTOGRAM: Regex = Regex::new(r"^Final.*histogram:").expect("valid regex");
    static ref TIMING_VALUE: Regex =
        Regex::new(r"(\(?)(-?\d*\.?\d+(?:[eE][-+]?\d+)?) ?(ns|MHz)").expect("valid regex");
    static ref HISTOGRAM_ROW: Regex =
        Regex::new(r"^\[\s*(\S+):\s*(\S+)\)\s*(\d+)\s*\(\s*([\d.]+)%\)").expect("valid regex");
}

/// Names given, in log order, to the values found on `Final ...` lines.
const TIMING_FIELDS: [&str; 8] = [
    "Hold WNS",
    "Hold TNS",
    "Critical path delay (least slack)",
    "FMax",
    "Setup WNS",
    "Setup TNS",
    "Intra-domain period",
    "Fanout-weighted intra-domain period",
];

/// Values quoted in parentheses restate the previous one in other units.
fn timing_values(line: &str) -> impl Iterator<Item = String> + '_ {
    TIMING_VALUE
        .captures_iter(line)
        .filter(|caps| caps[1].is_empty())
        .map(|caps| format!("{} {}", &caps[2], &caps[3]))
}

pub fn timing_summary(log: &str) -> TableReport {
    let mut table = TableReport::new(
        "",
        vec![
            ReportColumn::new("Parameter", Alignment::Left),
            ReportColumn::new("Value", Alignment::Right),
        ],
    );
    let values = log
        .lines()
        .filter(|l| FINAL_TIMING.is_match(l) && !FINAL_HISTOGRAM.is_match(l))
        .flat_map(timing_values);
    for (field, value) in TIMING_FIELDS.iter().zip(values) {
        table.push_row([field.to_string(), value]);
    }
    table
}

/// One table per `Final ... histogram:` block, named after its header line.
pub fn histograms(log: &str) -> Vec<TableReport> {
    let columns = || {
        vec![
            ReportColumn::new("From", Alignment::Right),
            ReportColumn::new("To", Alignment::Right),
            ReportColumn::new("Paths", Alignment::Right),
            ReportColumn::new("%", Alignment::Right),
        ]
    };
    let mut tables = Vec::new();
    let mut current: Option<TableReport> = None;
    for line in log.lines() {
        if FINAL_HISTOGRAM.is_match(line) {
            tables.extend(current.take());
            current = Some(TableReport::new(line.trim(), columns()));
            continue;
        }
        let Some(table) = current.as_mut() else {
            continue;
        };
        match HISTOGRAM_ROW.captures(line) {
            Some(caps) => table.push_row([&caps[1], &caps[2], &caps[3], &caps[4]]),
            None => tables.extend(current.take()),
        }
    }
    tables.extend(current);
    tables
}

#[cfg(test)]
pub(crate) const SAMPLE_TIMING_LOG: &str = "\
Final hold Worst Negative Slack (hWNS): -0.5 ns
Final hold Total Negative Slack (hTNS): -1.25 ns
Final hold slack histogram:
[ -5e-10: -4e-10)  1 ( 25.0%) |*****
[ -4e-10:  3e-10)  3 ( 75.0%) |***************

Final critical path delay (least slack): 2.5 ns, Fmax: 400 MHz
Final setup Worst Negative Slack (sWNS): 0 ns
Final setup Total Negative Slack (sTNS): 0 ns
Final setup slack histogram:
[  1e-09:  2e-09)  4 (100.0%) |********************
Final geomean non-virtual intra-domain period: 2.5 ns (400 MHz)
Final fanout-weighted geomean non-virtual intra-domain period: 2.6 ns (384.6 MHz)
";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn final_lines_fill_fields_in_order() {
        let table = timing_summary(SAMPLE_TIMING_LOG);
        let rows: Vec<(&str, &str)> = table
            .rows
            .iter()
            .map(|r| (r[0].as_str(), r[1].as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Hold WNS", "-0.5 ns"),
                ("Hold TNS", "-1.25 ns"),
                ("Critical path delay (least slack)", "2.5 ns"),
                ("FMax", "400 MHz"),
                ("Setup WNS", "0 ns"),
                ("Setup TNS", "0 ns"),
                ("Intra-domain period", "2.5 ns"),
                ("Fanout-weighted intra-domain period", "2.6 ns"),
            ]
        );
    }

    #[test]
    fn histograms_are_split_per_header() {
        let tables = histograms(SAMPLE_TIMING_LOG);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "Final hold slack histogram:");
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1], vec!["-4e-10", "3e-10", "3", "75.0"]);
        assert_eq!(tables[1].rows.len(), 1);
    }
}
