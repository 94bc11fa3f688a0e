/// A telemetry reading as delivered by the transport.
///
/// The transport hands back either a scalar or a raw identifier buffer; the
/// decode and trim step lives here so the decision core never touches byte
/// buffers.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    Number(f64),
    Text(String),
}

impl TelemetryValue {
    /// Decodes an identifier buffer: lossy UTF-8, NUL padding and
    /// surrounding whitespace stripped.
    pub fn from_ident_bytes(raw: &[u8]) -> Self {
        let decoded = String::from_utf8_lossy(raw);
        Self::Text(decoded.trim_matches(['\0', ' ', '\t', '\r', '\n']).to_string())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t.as_str()),
            Self::Number(_) => None,
        }
    }

    /// Transports report flags as numeric 0/1.
    pub fn as_flag(&self) -> Option<bool> {
        self.as_number().map(|n| n != 0.0)
    }
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for TelemetryValue {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::TelemetryValue;

    #[test]
    fn ident_bytes_are_trimmed() {
        let v = TelemetryValue::from_ident_bytes(b"KJFK\0\0\0\0");
        assert_eq!(v.as_text(), Some("KJFK"));
        let padded = TelemetryValue::from_ident_bytes(b"  WP1 \0");
        assert_eq!(padded.as_text(), Some("WP1"));
    }

    #[test]
    fn kind_accessors_do_not_cross() {
        assert_eq!(TelemetryValue::from(4.0).as_number(), Some(4.0));
        assert_eq!(TelemetryValue::from(4.0).as_text(), None);
        assert_eq!(TelemetryValue::from("HOLD1").as_number(), None);
        assert_eq!(TelemetryValue::from(1.0).as_flag(), Some(true));
        assert_eq!(TelemetryValue::from(0.0).as_flag(), Some(false));
    }
}
