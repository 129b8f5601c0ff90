//! Turns the provider's comma separated rows into [`DeviceMetric`] records.
//!
//! Every field is parsed on its own: a value the provider could not report
//! (`N/A`, `[Not Supported]`, an empty column) becomes `None` for that field
//! and leaves the rest of the row intact. Rows that are too short to hold the
//! full field set are dropped without affecting the other rows.

use crate::data::DeviceMetric;
use log::debug;
use std::str::FromStr;

/// Fields requested from the provider, in the order it prints them.
pub const QUERY_FIELDS: [&str; 8] = [
    "index",
    "name",
    "utilization.gpu",
    "temperature.gpu",
    "memory.total",
    "memory.used",
    "power.draw",
    "fan.speed",
];

/// Number of positional fields after the name. The name may contain commas,
/// so these are always counted from the end of the row.
pub const TAIL_FIELDS: usize = QUERY_FIELDS.len() - 2;

/// Parses a trimmed field, mapping empty input or a parse failure to `None`.
pub fn parse_or_unknown<T: FromStr>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}

fn parse_percent(raw: &str) -> Option<u32> {
    parse_or_unknown::<u32>(raw).filter(|v| *v <= 100)
}

// `f64::from_str` accepts "nan" and "inf"; neither is a reading
fn parse_float(raw: &str) -> Option<f64> {
    parse_or_unknown::<f64>(raw).filter(|v| v.is_finite())
}

pub fn memory_percent(total_mib: Option<f64>, used_mib: Option<f64>) -> Option<f64> {
    match (total_mib, used_mib) {
        (Some(total), Some(used)) if total > 0.0 => Some(used * 100.0 / total),
        _ => None,
    }
}

/// Builds a record from the index column, the recovered name and the
/// positional tail `[utilization, temperature, memory.total, memory.used, power, fan]`.
pub fn normalize_record(index: &str, name: &str, tail: &[&str; TAIL_FIELDS]) -> DeviceMetric {
    let [util, temp, mem_total, mem_used, power, fan] = *tail;
    let memory_total_mib = parse_float(mem_total);
    let memory_used_mib = parse_float(mem_used);

    DeviceMetric {
        index: parse_or_unknown(index),
        name: name.trim().to_string(),
        utilization_percent: parse_percent(util),
        temperature_celsius: parse_or_unknown(temp),
        memory_total_mib,
        memory_used_mib,
        memory_percent: memory_percent(memory_total_mib, memory_used_mib),
        power_watts: parse_float(power),
        fan_percent: parse_percent(fan),
    }
}

/// Parses one provider row. Returns `None` when the row has fewer fields than
/// [`QUERY_FIELDS`].
pub fn parse_row(line: &str) -> Option<DeviceMetric> {
    let (index, rest) = line.split_once(',')?;

    // rsplitn yields the tail right to left, then whatever is left: the name
    let mut fields: Vec<&str> = rest.rsplitn(TAIL_FIELDS + 1, ',').collect();
    if fields.len() != TAIL_FIELDS + 1 {
        return None;
    }
    let name = fields.pop()?;
    fields.reverse();
    let tail: [&str; TAIL_FIELDS] = fields.try_into().ok()?;

    Some(normalize_record(index, name, &tail))
}

/// Parses the whole provider output, one device per non-empty line, keeping
/// input order.
pub fn parse_output(text: &str) -> Vec<DeviceMetric> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = parse_row(line);
            if parsed.is_none() {
                debug!("skipping malformed provider row: {line:?}");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_only_blanks_that_field() {
        let gpu = parse_row("0, Test GPU, 55, ,8192,4096,120.5,30").unwrap();
        assert_eq!(gpu.index, Some(0));
        assert_eq!(gpu.name, "Test GPU");
        assert_eq!(gpu.utilization_percent, Some(55));
        assert_eq!(gpu.temperature_celsius, None);
        assert_eq!(gpu.memory_total_mib, Some(8192.0));
        assert_eq!(gpu.memory_used_mib, Some(4096.0));
        assert_eq!(gpu.memory_percent, Some(50.0));
        assert_eq!(gpu.power_watts, Some(120.5));
        assert_eq!(gpu.fan_percent, Some(30));
    }

    #[test]
    fn name_with_commas_is_recovered_from_the_middle() {
        let gpu = parse_row("1, NVIDIA GeForce RTX, 4090, 70,60,16384,8192,250.0,45").unwrap();
        assert_eq!(gpu.index, Some(1));
        assert_eq!(gpu.name, "NVIDIA GeForce RTX, 4090");
        assert_eq!(gpu.utilization_percent, Some(70));
        assert_eq!(gpu.temperature_celsius, Some(60));
        assert_eq!(gpu.memory_total_mib, Some(16384.0));
        assert_eq!(gpu.memory_used_mib, Some(8192.0));
        assert_eq!(gpu.memory_percent, Some(50.0));
        assert_eq!(gpu.power_watts, Some(250.0));
        assert_eq!(gpu.fan_percent, Some(45));
    }

    #[test]
    fn tail_is_always_counted_from_the_end() {
        let gpu = parse_row("1, NVIDIA GeForce RTX, 4090, 12,70,60,16384,8192,250.0,45").unwrap();
        assert_eq!(gpu.name, "NVIDIA GeForce RTX, 4090, 12");
        assert_eq!(gpu.utilization_percent, Some(70));
        assert_eq!(gpu.fan_percent, Some(45));
    }

    #[test]
    fn passively_cooled_card_keeps_other_fields() {
        let gpu = parse_row("0, Tesla T4, 87, 61, 15360, 2048, 35.12, [N/A]").unwrap();
        assert_eq!(gpu.fan_percent, None);
        assert_eq!(gpu.utilization_percent, Some(87));
        assert_eq!(gpu.temperature_celsius, Some(61));
        assert_eq!(gpu.memory_used_mib, Some(2048.0));
        assert_eq!(gpu.power_watts, Some(35.12));
    }

    #[test]
    fn zero_total_memory_has_no_percent() {
        let gpu = parse_row("0, GPU, 1, 40, 0, 512, 10, 20").unwrap();
        assert_eq!(gpu.memory_total_mib, Some(0.0));
        assert_eq!(gpu.memory_used_mib, Some(512.0));
        assert_eq!(gpu.memory_percent, None);
    }

    #[test]
    fn missing_used_memory_has_no_percent() {
        let gpu = parse_row("0, GPU, 1, 40, 8192, N/A, 10, 20").unwrap();
        assert_eq!(gpu.memory_total_mib, Some(8192.0));
        assert_eq!(gpu.memory_percent, None);
    }

    #[test]
    fn non_finite_and_out_of_range_values_are_unknown() {
        let gpu = parse_row("x, GPU, 250, 40, nan, 10, inf, 101").unwrap();
        assert_eq!(gpu.index, None);
        assert_eq!(gpu.utilization_percent, None);
        assert_eq!(gpu.memory_total_mib, None);
        assert_eq!(gpu.memory_percent, None);
        assert_eq!(gpu.power_watts, None);
        assert_eq!(gpu.fan_percent, None);
        assert_eq!(gpu.temperature_celsius, Some(40));
    }

    #[test]
    fn short_rows_are_skipped() {
        assert!(parse_row("0, GPU, 1, 2, 3, 4, 5").is_none());
        assert!(parse_row("no commas at all").is_none());
    }

    #[test]
    fn output_keeps_row_order_and_skips_noise() {
        let text = "\n0, A, 1, 30, 100, 50, 10.0, 0\n\n  garbage line  \n\
                    1, B, 2, 31, 200, 50, 20.0, 5\r\n";
        let gpus = parse_output(text);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].name, "A");
        assert_eq!(gpus[1].name, "B");
        assert_eq!(gpus[1].memory_percent, Some(25.0));
    }

    #[test]
    fn n_rows_give_n_records() {
        for n in 0..5 {
            let text: String = (0..n)
                .map(|i| format!("{i}, GPU {i}, 10, 40, 1000, 100, 50.0, 30\n"))
                .collect();
            let gpus = parse_output(&text);
            assert_eq!(gpus.len(), n);
            for (i, gpu) in gpus.iter().enumerate() {
                assert_eq!(gpu.index, Some(i as u32));
            }
        }
    }

    #[test]
    fn tail_width_tracks_query() {
        assert_eq!(TAIL_FIELDS, 6);
        assert_eq!(QUERY_FIELDS[0], "index");
        assert_eq!(QUERY_FIELDS[1], "name");
    }
}
