//! `latency("5s")` - delays the request phase by a fixed duration. Used in
//! tests to exercise admission-queue saturation deterministically.

use std::time::Duration;

use async_trait::async_trait;
use pingora_proxy::Session;

use crate::proxy::context::FilterContext;
use crate::route::{Filter, FilterError, FilterSpec, Value};

pub struct Latency {
    delay: Duration,
}

#[async_trait]
impl Filter for Latency {
    async fn request(&self, _session: &mut Session, _ctx: &mut FilterContext) -> pingora::Result<bool> {
        tokio::time::sleep(self.delay).await;
        Ok(false)
    }
}

pub struct LatencySpec;
impl FilterSpec for LatencySpec {
    fn name(&self) -> &str {
        "latency"
    }

    fn create_filter(&self, args: &[Value]) -> Result<std::sync::Arc<dyn Filter>, FilterError> {
        match args {
            [Value::Str(duration)] => {
                let delay = parse_duration(duration).ok_or_else(|| FilterError::InvalidArgument {
                    name: "latency".to_string(),
                    index: 0,
                    reason: format!("invalid duration: {duration:?}"),
                })?;
                Ok(std::sync::Arc::new(Latency { delay }))
            }
            _ => Err(FilterError::Arity {
                name: "latency".to_string(),
                expected: "1 string duration argument (e.g. \"5s\", \"250ms\")",
                got: args.len(),
            }),
        }
    }
}

/// Parses `"5s"`, `"250ms"`, `"2m"`. No fractional or compound durations -
/// one number, one unit.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split_at = s.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = s.split_at(split_at);
    let amount: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount * 60)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds_milliseconds_and_minutes() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn rejects_unknown_units_and_garbage() {
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration(""), None);
    }
}
