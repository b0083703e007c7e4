//! VPR log sections shared by the placement, routing and timing reports.

use lazy_static::lazy_static;
use regex::Regex;

use fabflow_core::report::{Alignment, ReportColumn, TableReport};

lazy_static! {
    static ref BLOCKS_OF_TYPE: Regex =
        Regex::new(r"^\s*(\d+)\s+blocks of type:\s*(\S+)").expect("valid regex");
    static ref STAT_ENTRY: Regex = Regex::new(r"^\s+(.+?)\s*:\s*(\S+)\s*$").expect("valid regex");
}

const CIRCUIT_STATS: &str = "Circuit Statistics:";
const RESOURCE_USAGE: &str = "Resource usage...";

/// `Circuit Statistics:` block: one row per indented `key : value` line.
pub fn circuit_statistics(log: &str) -> TableReport {
    let mut table = TableReport::new(
        "",
        vec![
            ReportColumn::new("Block type", Alignment::Left),
            ReportColumn::new("Number of blocks", Alignment::Center),
        ],
    );
    let mut lines = log.lines().skip_while(|l| !l.trim_start().starts_with(CIRCUIT_STATS));
    if lines.next().is_none() {
        return table;
    }
    for line in lines {
        let Some(caps) = STAT_ENTRY.captures(line) else {
            break;
        };
        table.push_row([caps[1].to_string(), caps[2].to_string()]);
    }
    table
}

/// `Resource usage...` block: netlist demand against architecture supply per
/// block type.
pub fn resource_utilization(log: &str) -> TableReport {
    let mut table = TableReport::new(
        "",
        vec![
            ReportColumn::new("Logic", Alignment::Left),
            ReportColumn::new("Used", Alignment::Right),
            ReportColumn::new("Available", Alignment::Right),
            ReportColumn::new("%", Alignment::Right),
        ],
    );
    let mut lines = log.lines().skip_while(|l| !l.trim_start().starts_with(RESOURCE_USAGE));
    if lines.next().is_none() {
        return table;
    }

    // Entries come in Netlist/Architecture pairs; a blank line ends the block.
    let mut rows: Vec<(String, u64, Option<u64>)> = Vec::new();
    let mut in_netlist = true;
    for line in lines {
        let trimmed = line.trim();
        match trimmed {
            "" => break,
            "Netlist" => in_netlist = true,
            "Architecture" => in_netlist = false,
            _ => {
                let Some(caps) = BLOCKS_OF_TYPE.captures(line) else {
                    continue;
                };
                let count: u64 = caps[1].parse().unwrap_or(0);
                let block = caps[2].to_string();
                if in_netlist {
                    rows.push((block, count, None));
                } else if let Some(row) = rows.iter_mut().find(|r| r.0 == block) {
                    row.2 = Some(count);
                }
            }
        }
    }

    for (block, used, available) in rows {
        let (available, percent) = match available {
            Some(0) | None => (String::new(), String::new()),
            Some(a) => (a.to_string(), format!("{:.1}", used as f64 * 100.0 / a as f64)),
        };
        table.push_row([block, used.to_string(), available, percent]);
    }
    table
}

#[cfg(test)]
pub(crate) const SAMPLE_ROUTING_LOG: &str = "\
# Load circuit
Circuit Statistics:
  Blocks: 42
    .input :       5
    .output:       4
    6-LUT  :      28
  Nets  : 38
    Avg Fanout:     3.2

Resource usage...
\tNetlist
\t\t9\tblocks of type: io
\tArchitecture
\t\t96\tblocks of type: io
\tNetlist
\t\t3\tblocks of type: clb
\tArchitecture
\t\t16\tblocks of type: clb

Device Utilization: 0.08 (target 1.00)
";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn circuit_statistics_rows() {
        let table = circuit_statistics(SAMPLE_ROUTING_LOG);
        assert_eq!(table.rows.len(), 6);
        assert_eq!(table.rows[0], vec!["Blocks".to_string(), "42".to_string()]);
        assert_eq!(table.rows[3], vec!["6-LUT".to_string(), "28".to_string()]);
        assert_eq!(table.rows[5], vec!["Avg Fanout".to_string(), "3.2".to_string()]);
    }

    #[test]
    fn resource_utilization_pairs_netlist_and_architecture() {
        let table = resource_utilization(SAMPLE_ROUTING_LOG);
        assert_eq!(
            table.rows,
            vec![
                vec!["io".to_string(), "9".into(), "96".into(), "9.4".into()],
                vec!["clb".to_string(), "3".into(), "16".into(), "18.8".into()],
            ]
        );
    }

    #[test]
    fn missing_sections_give_empty_tables() {
        assert!(circuit_statistics("nothing here").is_empty());
        assert!(resource_utilization("").is_empty());
    }
}
