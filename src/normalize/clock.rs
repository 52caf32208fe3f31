use regex::Regex;
use std::sync::OnceLock;

fn clock_re() -> &'static Regex {
    static CLOCK_RE: OnceLock<Regex> = OnceLock::new();
    CLOCK_RE.get_or_init(|| {
        Regex::new(r"^PT(?<minutes>\d+)M(?<seconds>\d+(?:\.\d*)?)S$").expect("valid clock regex")
    })
}

/// Parses a `PT<minutes>M<seconds>S` game clock into decimal minutes.
pub fn minutes_remaining(clock: &str) -> Option<f64> {
    let caps = clock_re().captures(clock.trim())?;
    let minutes: f64 = caps["minutes"].parse().ok()?;
    let seconds: f64 = caps["seconds"].parse().ok()?;
    Some(minutes + seconds / 60.0)
}
