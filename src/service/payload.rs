use crate::error::AppError;
use crate::model::student::STUDENT_QR_TAG;

/// Extracts a student code from a scanned payload.
///
/// `STUDENT:<code>` is the canonical form (tag matched case-insensitively).
/// Anything else falls back to the first run of ASCII digits in the payload.
pub fn decode_student_code(payload: &str) -> Result<String, AppError> {
    let payload = payload.trim();

    if let Some((tag, code)) = payload.split_once(':') {
        let code = code.trim();
        if tag.trim().eq_ignore_ascii_case(STUDENT_QR_TAG) && !code.is_empty() {
            return Ok(code.to_string());
        }
    }

    first_digit_run(payload)
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidPayload("Invalid QR code: no student ID found".into()))
}

fn first_digit_run(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_payload_yields_code() {
        assert_eq!(decode_student_code("STUDENT:A123").unwrap(), "A123");
        assert_eq!(decode_student_code("  student: 2024-001 ").unwrap(), "2024-001");
    }

    #[test]
    fn falls_back_to_first_digit_run() {
        assert_eq!(decode_student_code("garbage42xyz").unwrap(), "42");
        assert_eq!(decode_student_code("id 7 and 99").unwrap(), "7");
        assert!(decode_student_code("STUDENT:").is_err());
        assert_eq!(decode_student_code("TEACHER:T9").unwrap(), "9");
    }

    #[test]
    fn payload_without_code_is_invalid() {
        assert!(matches!(decode_student_code(""), Err(AppError::InvalidPayload(_))));
        assert!(matches!(
            decode_student_code("no digits here"),
            Err(AppError::InvalidPayload(_))
        ));
    }
}
