use super::Summary;
use press_core::Outcome;
use std::io::{self, Write};
use std::time::Duration;

const BAR: char = '■';
const BAR_WIDTH: usize = 40;

const CSV_HEADER: [&str; 9] = [
    "response-time",
    "dns+dialup",
    "dns",
    "request-write",
    "response-delay",
    "response-read",
    "status-code",
    "content-length",
    "offset",
];

pub(super) fn summary(w: &mut impl Write, s: &Summary) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "Summary:")?;
    writeln!(w, "  Total:\t{:.4} secs", s.total)?;
    writeln!(w, "  Slowest:\t{:.4} secs", s.slowest)?;
    writeln!(w, "  Fastest:\t{:.4} secs", s.fastest)?;
    writeln!(w, "  Average:\t{:.4} secs", s.average)?;
    writeln!(w, "  Requests/sec:\t{:.4}", s.requests_per_sec)?;
    writeln!(w)?;
    writeln!(w, "  Total data:\t{} bytes", s.total_data)?;
    writeln!(w, "  Size/request:\t{} bytes", s.size_per_request)?;
    if let Some(expected) = s.expected.filter(|&expected| s.received < expected) {
        writeln!(w, "  Received:\t{} of {expected} requests", s.received)?;
    }

    if !s.histogram.is_empty() {
        let max = s.histogram.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        writeln!(w)?;
        writeln!(w, "Response time histogram:")?;
        for bucket in &s.histogram {
            let bar: String = std::iter::repeat(BAR)
                .take(bucket.count * BAR_WIDTH / max)
                .collect();
            writeln!(w, "  {:4.3} [{}]\t|{}", bucket.mark, bucket.count, bar)?;
        }
    }

    if !s.latency_distribution.is_empty() {
        writeln!(w)?;
        writeln!(w, "Latency distribution:")?;
        for p in &s.latency_distribution {
            writeln!(w, "  {}% in {:.4} secs", p.percentile, p.latency)?;
        }
    }

    if !s.status_codes.is_empty() {
        writeln!(w)?;
        writeln!(w, "Status code distribution:")?;
        for (code, count) in &s.status_codes {
            writeln!(w, "  [{code}]\t{count} responses")?;
        }
    }

    if !s.errors.is_empty() {
        writeln!(w)?;
        writeln!(w, "Error distribution:")?;
        for (err, count) in &s.errors {
            writeln!(w, "  [{count}]\t{err}")?;
        }
    }

    Ok(())
}

pub(super) fn csv(w: &mut impl Write, records: &[Outcome]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(CSV_HEADER)?;
    for r in records {
        let t = &r.timings;
        wtr.write_record([
            format!("{:.4}", r.duration.as_secs_f64()),
            format!("{:.4}", secs(t.connect)),
            format!("{:.4}", secs(t.dns)),
            format!("{:.4}", secs(t.request_write)),
            format!("{:.4}", secs(t.response_delay)),
            format!("{:.4}", secs(t.response_read)),
            r.status_code.to_string(),
            r.content_length.to_string(),
            format!("{:.4}", r.offset.as_secs_f64()),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn secs(timing: Option<Duration>) -> f64 {
    timing.map_or(0., |d| d.as_secs_f64())
}
