//! Core data models for Dexcom Share readings and fetch outcomes.
//!
//! A [`Reading`] is derived once from the raw server record and never mutated.
//! Malformed server data degrades to defaults (absent timestamp, [`Trend::None`])
//! instead of failing: the widget would rather show a value without an arrow than
//! show nothing.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches the millisecond epoch embedded in the server's `WT` field,
/// e.g. `"Date(1462404576000)"`.
static WT_EPOCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid WT regex"));

// =============================================================================
// Trend
// =============================================================================

/// Glucose trend arrow, in the server's declared code order (0-9).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    #[default]
    None,
    DoubleUp,
    SingleUp,
    FortyFiveUp,
    Flat,
    FortyFiveDown,
    SingleDown,
    DoubleDown,
    NotComputable,
    RateOutOfRange,
}

impl Trend {
    /// All trends in code order; index equals the server's numeric code.
    pub const ALL: &'static [Self] = &[
        Self::None,
        Self::DoubleUp,
        Self::SingleUp,
        Self::FortyFiveUp,
        Self::Flat,
        Self::FortyFiveDown,
        Self::SingleDown,
        Self::DoubleDown,
        Self::NotComputable,
        Self::RateOutOfRange,
    ];

    /// Parse a trend code: numeric `"0"`..`"9"` or a case-insensitive string
    /// synonym (`"DoubleUp"`, `"NOT COMPUTABLE"`, ...). Unrecognized codes
    /// yield [`Trend::None`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.to_uppercase().as_str() {
            "0" | "NONE" => Self::None,
            "1" | "DOUBLEUP" => Self::DoubleUp,
            "2" | "SINGLEUP" => Self::SingleUp,
            "3" | "FORTYFIVEUP" => Self::FortyFiveUp,
            "4" | "FLAT" => Self::Flat,
            "5" | "FORTYFIVEDOWN" => Self::FortyFiveDown,
            "6" | "SINGLEDOWN" => Self::SingleDown,
            "7" | "DOUBLEDOWN" => Self::DoubleDown,
            "8" | "NOT COMPUTABLE" | "NOTCOMPUTABLE" => Self::NotComputable,
            "9" | "RATE OUT OF RANGE" | "RATEOUTOFRANGE" => Self::RateOutOfRange,
            _ => Self::None,
        }
    }
}

// =============================================================================
// Raw server record
// =============================================================================

/// Trend as the server sends it: newer API revisions use string codes, older
/// ones numeric codes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTrend {
    Number(i64),
    Text(String),
}

impl RawTrend {
    fn as_code(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// One raw glucose record from `ReadPublisherLatestGlucoseValues`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    /// Wall time, encoded as `"Date(<ms>)"`.
    #[serde(rename = "WT", default)]
    pub wt: String,

    /// Glucose value in mg/dL.
    #[serde(rename = "Value")]
    pub value: i32,

    #[serde(rename = "Trend", default)]
    pub trend: Option<RawTrend>,
}

// =============================================================================
// Reading
// =============================================================================

/// A normalized glucose reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// UTC wall time of the reading; absent when the `WT` field is malformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Glucose in mg/dL, verbatim from the server.
    pub mg_dl: i32,

    /// Glucose in mmol/L, truncated (not rounded) to one decimal.
    pub mmol_l: f64,

    pub trend: Trend,
}

impl Reading {
    /// Normalize a raw server record. Never fails: a malformed `WT` yields an
    /// absent timestamp and an unrecognized trend yields [`Trend::None`].
    #[must_use]
    pub fn from_raw(raw: &RawReading) -> Self {
        let timestamp = WT_EPOCH
            .captures(&raw.wt)
            .and_then(|caps| caps[1].parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);

        Self {
            timestamp,
            mg_dl: raw.value,
            mmol_l: mg_to_mmol(raw.value),
            trend: raw
                .trend
                .as_ref()
                .map_or(Trend::None, |t| Trend::from_code(&t.as_code())),
        }
    }
}

/// mg/dL to mmol/L with one-decimal truncation, matching the upstream display
/// convention (`floor(mg / 18 * 10) / 10`).
#[must_use]
pub fn mg_to_mmol(mg_dl: i32) -> f64 {
    (f64::from(mg_dl) / 18.0 * 10.0).floor() / 10.0
}

// =============================================================================
// ApiError
// =============================================================================

/// Classification of a failed fetch, for logging and display decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiErrorKind {
    /// No HTTP response at all (DNS, connect, per-request timeout).
    Transport,
    /// Response received with a non-200 status.
    Http,
    /// 200 response with a malformed body.
    Protocol,
    /// The watchdog fired before the fetch cycle completed.
    Timeout,
}

/// Error half of an [`ApiResponse`].
///
/// `status_code` is `-1` for transport-level failures (no response object),
/// otherwise the HTTP status of the failing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: i32,
    pub message: String,
    pub kind: ApiErrorKind,
}

/// Shape of the server's JSON error body.
#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Code")]
    code: Option<String>,
}

impl ApiError {
    /// Transport-level failure: the request never produced a response.
    #[must_use]
    pub fn transport(step: &str, detail: &str) -> Self {
        let message = if detail.is_empty() {
            format!("{step} failed")
        } else {
            format!("{step}: {detail}")
        };
        Self {
            status_code: -1,
            message,
            kind: ApiErrorKind::Transport,
        }
    }

    /// Non-200 response. The message prefers the server's JSON error body
    /// (`Message`, optionally `(Code)`), falling back to `"<step> failed"`.
    #[must_use]
    pub fn http(step: &str, status: u16, body: &str) -> Self {
        Self {
            status_code: i32::from(status),
            message: message_from_body(step, body),
            kind: ApiErrorKind::Http,
        }
    }

    /// 200 response whose body could not be interpreted.
    #[must_use]
    pub fn protocol(step: &str, status: u16, detail: &str) -> Self {
        Self {
            status_code: i32::from(status),
            message: format!("{step}: {detail}"),
            kind: ApiErrorKind::Protocol,
        }
    }

    /// Synthetic error emitted when the watchdog fires.
    #[must_use]
    pub fn timeout(seconds: u64) -> Self {
        Self {
            status_code: -1,
            message: format!("API request timed out after {seconds} seconds"),
            kind: ApiErrorKind::Timeout,
        }
    }

    /// Whether this error came from a pure transport failure, i.e. no HTTP
    /// status is available for display.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        self.status_code == -1
    }
}

fn message_from_body(step: &str, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ServerErrorBody>(body)
        && let Some(server_message) = parsed.message
    {
        return match parsed.code {
            Some(code) => format!("{step}: {server_message} ({code})"),
            None => format!("{step}: {server_message}"),
        };
    }
    format!("{step} failed")
}

// =============================================================================
// ApiResponse
// =============================================================================

/// Outcome of one fetch: readings on success, an [`ApiError`] otherwise.
/// Never both populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub readings: Vec<Reading>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// Successful response, possibly with an empty reading list.
    #[must_use]
    pub const fn ok(readings: Vec<Reading>) -> Self {
        Self {
            readings,
            error: None,
        }
    }

    /// Failed response; the reading list is always empty.
    #[must_use]
    pub const fn err(error: ApiError) -> Self {
        Self {
            readings: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub const fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(wt: &str, value: i32, trend: Option<RawTrend>) -> RawReading {
        RawReading {
            wt: wt.to_string(),
            value,
            trend,
        }
    }

    #[test]
    fn value_100_yields_5_5_mmol() {
        let reading = Reading::from_raw(&raw("Date(1462404576000)", 100, None));
        assert_eq!(reading.mg_dl, 100);
        assert!((reading.mmol_l - 5.5).abs() < f64::EPSILON);
    }

    #[test]
    fn mmol_is_truncated_not_rounded() {
        // 100 mg/dL is 5.555... mmol/L; rounding would give 5.6.
        assert!((mg_to_mmol(100) - 5.5).abs() < f64::EPSILON);
        // 178 mg/dL is 9.888...; rounding would give 9.9.
        assert!((mg_to_mmol(178) - 9.8).abs() < f64::EPSILON);
    }

    #[test]
    fn mmol_truncation_property() {
        for mg in 0..600 {
            let expected = (f64::from(mg) / 18.0 * 10.0).floor() / 10.0;
            assert!((mg_to_mmol(mg) - expected).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn wt_epoch_is_extracted() {
        let reading = Reading::from_raw(&raw("Date(1462404576000)", 120, None));
        let ts = reading.timestamp.expect("timestamp present");
        assert_eq!(ts.timestamp_millis(), 1_462_404_576_000);
    }

    #[test]
    fn malformed_wt_yields_absent_timestamp() {
        for wt in ["", "Date()", "Date(abc)", "1462404576000", "Date("] {
            let reading = Reading::from_raw(&raw(wt, 120, None));
            assert!(reading.timestamp.is_none(), "WT {wt:?} should not parse");
        }
    }

    #[test]
    fn numeric_and_string_trend_codes_agree() {
        let synonyms = [
            ("0", "None"),
            ("1", "DoubleUp"),
            ("2", "SingleUp"),
            ("3", "FortyFiveUp"),
            ("4", "Flat"),
            ("5", "FortyFiveDown"),
            ("6", "SingleDown"),
            ("7", "DoubleDown"),
            ("8", "NOT COMPUTABLE"),
            ("9", "RATE OUT OF RANGE"),
        ];
        for (i, (num, text)) in synonyms.iter().enumerate() {
            let expected = Trend::ALL[i];
            assert_eq!(Trend::from_code(num), expected);
            assert_eq!(Trend::from_code(text), expected);
            assert_eq!(Trend::from_code(&text.to_lowercase()), expected);
        }
    }

    #[test]
    fn absent_or_unknown_trend_is_none() {
        assert_eq!(Trend::from_code("sideways"), Trend::None);
        assert_eq!(Trend::from_code(""), Trend::None);
        let reading = Reading::from_raw(&raw("Date(1)", 100, None));
        assert_eq!(reading.trend, Trend::None);
    }

    #[test]
    fn raw_reading_accepts_numeric_and_string_trend() {
        let from_str: RawReading =
            serde_json::from_str(r#"{"WT":"Date(1462404576000)","Value":100,"Trend":"Flat"}"#)
                .expect("string trend");
        assert_eq!(Reading::from_raw(&from_str).trend, Trend::Flat);

        let from_num: RawReading =
            serde_json::from_str(r#"{"WT":"Date(1462404576000)","Value":100,"Trend":4}"#)
                .expect("numeric trend");
        assert_eq!(Reading::from_raw(&from_num).trend, Trend::Flat);

        let absent: RawReading =
            serde_json::from_str(r#"{"WT":"Date(1462404576000)","Value":100}"#)
                .expect("absent trend");
        assert_eq!(Reading::from_raw(&absent).trend, Trend::None);
    }

    #[test]
    fn http_error_prefers_server_message() {
        let err = ApiError::http(
            "Login",
            500,
            r#"{"Code":"SessionIdNotFound","Message":"Session not found"}"#,
        );
        assert_eq!(err.status_code, 500);
        assert_eq!(err.message, "Login: Session not found (SessionIdNotFound)");
        assert_eq!(err.kind, ApiErrorKind::Http);
    }

    #[test]
    fn http_error_without_code_omits_parenthetical() {
        let err = ApiError::http("Login", 500, r#"{"Message":"Session not found"}"#);
        assert_eq!(err.message, "Login: Session not found");
    }

    #[test]
    fn http_error_with_opaque_body_falls_back() {
        let err = ApiError::http("Fetch readings", 502, "<html>Bad Gateway</html>");
        assert_eq!(err.message, "Fetch readings failed");
        assert_eq!(err.status_code, 502);
    }

    #[test]
    fn transport_error_carries_minus_one() {
        let err = ApiError::transport("Authenticate", "dns error");
        assert_eq!(err.status_code, -1);
        assert_eq!(err.message, "Authenticate: dns error");
        assert!(err.is_transport());

        let bare = ApiError::transport("Authenticate", "");
        assert_eq!(bare.message, "Authenticate failed");
    }

    #[test]
    fn timeout_error_names_the_duration() {
        let err = ApiError::timeout(70);
        assert_eq!(err.status_code, -1);
        assert!(err.message.contains("70 seconds"));
        assert_eq!(err.kind, ApiErrorKind::Timeout);
    }

    #[test]
    fn response_is_readings_xor_error() {
        let ok = ApiResponse::ok(vec![]);
        assert!(!ok.is_err());

        let err = ApiResponse::err(ApiError::timeout(70));
        assert!(err.is_err());
        assert!(err.readings.is_empty());
    }
}
