//! Current time and date, spoken in the kitchen's timezone.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use crate::tools::{CallContext, FunctionResult, Tool};

const DATE_FORMAT: &str = "%A, %B %-d, %Y";

fn timezone_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "timezone": {
                "type": "string",
                "description": "IANA timezone name, e.g. 'Europe/London' (defaults to the kitchen's timezone)"
            }
        }
    })
}

/// Resolve the requested timezone, falling back to the configured one.
fn requested_timezone(args: &Value, default: Tz) -> Result<Tz, String> {
    match args["timezone"].as_str().map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| format!("I don't recognise the timezone {}.", name)),
        None => Ok(default),
    }
}

pub fn format_in(now: DateTime<Utc>, tz: Tz, format: &str) -> String {
    now.with_timezone(&tz).format(format).to_string()
}

/// The `get_current_time` tool.
pub struct CurrentTime {
    pub timezone: Tz,
    pub format: String,
}

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time, useful for planning cooking and meal times"
    }

    fn parameters_schema(&self) -> Value {
        timezone_schema()
    }

    async fn execute(&self, args: Value, _call: &CallContext) -> anyhow::Result<FunctionResult> {
        let response = match requested_timezone(&args, self.timezone) {
            Ok(tz) => format!(
                "The current time in {} is {}.",
                tz.name(),
                format_in(Utc::now(), tz, &self.format)
            ),
            Err(message) => message,
        };
        Ok(FunctionResult::new(response))
    }
}

/// The `get_current_date` tool.
pub struct CurrentDate {
    pub timezone: Tz,
}

#[async_trait]
impl Tool for CurrentDate {
    fn name(&self) -> &str {
        "get_current_date"
    }

    fn description(&self) -> &str {
        "Get today's date"
    }

    fn parameters_schema(&self) -> Value {
        timezone_schema()
    }

    async fn execute(&self, args: Value, _call: &CallContext) -> anyhow::Result<FunctionResult> {
        let response = match requested_timezone(&args, self.timezone) {
            Ok(tz) => format!(
                "Today's date in {} is {}.",
                tz.name(),
                format_in(Utc::now(), tz, DATE_FORMAT)
            ),
            Err(message) => message,
        };
        Ok(FunctionResult::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_in_twelve_hour_clock() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 20, 5, 0).unwrap();
        assert_eq!(format_in(now, chrono_tz::America::New_York, "%I:%M %p"), "03:05 PM");
        assert_eq!(
            format_in(now, chrono_tz::America::New_York, DATE_FORMAT),
            "Monday, March 4, 2024"
        );
    }

    #[test]
    fn timezone_argument_overrides_default() {
        let tz = requested_timezone(&json!({"timezone": "Europe/London"}), chrono_tz::UTC).unwrap();
        assert_eq!(tz, chrono_tz::Europe::London);
        let tz = requested_timezone(&json!({}), chrono_tz::America::New_York).unwrap();
        assert_eq!(tz, chrono_tz::America::New_York);
        assert!(requested_timezone(&json!({"timezone": "Mars/Base"}), chrono_tz::UTC).is_err());
    }

    #[tokio::test]
    async fn unknown_timezone_is_spoken_not_failed() {
        let tool = CurrentTime {
            timezone: chrono_tz::America::New_York,
            format: "%I:%M %p".into(),
        };
        let result = tool
            .execute(json!({"timezone": "Nowhere/Land"}), &CallContext::default())
            .await
            .unwrap();
        assert_eq!(result.response, "I don't recognise the timezone Nowhere/Land.");

        let result = tool.execute(json!({}), &CallContext::default()).await.unwrap();
        assert!(result.response.starts_with("The current time in America/New_York is "));
    }
}
