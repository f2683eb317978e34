//! Intake validation for new orders.

use crate::errors::AppError;

pub const MIN_JOB_DESCRIPTION_CHARS: usize = 50;
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 10_000;
pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;
/// DOCX is not accepted: only PDF and plain text can be turned into resume text.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Returns the trimmed description if its length is within bounds.
pub fn validate_job_description(raw: &str) -> Result<String, AppError> {
    let text = raw.trim();
    let chars = text.chars().count();
    if chars < MIN_JOB_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "job_description must be at least {MIN_JOB_DESCRIPTION_CHARS} characters (got {chars})"
        )));
    }
    if chars > MAX_JOB_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "job_description must be at most {MAX_JOB_DESCRIPTION_CHARS} characters (got {chars})"
        )));
    }
    Ok(text.to_string())
}

pub fn validate_resume_file(file_name: &str, size: usize) -> Result<(), AppError> {
    if size == 0 {
        return Err(AppError::Validation("resume file is empty".to_string()));
    }
    if size > MAX_RESUME_BYTES {
        return Err(AppError::Validation(format!(
            "resume file must be smaller than {} (got {})",
            format_file_size(MAX_RESUME_BYTES as u64),
            format_file_size(size as u64)
        )));
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "resume must be one of: {}",
            ALLOWED_EXTENSIONS
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    Ok(())
}

/// Human-readable byte count, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description_is_rejected() {
        assert!(validate_job_description("Rust dev").is_err());
    }

    #[test]
    fn test_description_is_trimmed() {
        let raw = format!("   {}   ", "a".repeat(MIN_JOB_DESCRIPTION_CHARS));
        assert_eq!(validate_job_description(&raw).unwrap().len(), MIN_JOB_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_overlong_description_is_rejected() {
        let raw = "a".repeat(MAX_JOB_DESCRIPTION_CHARS + 1);
        assert!(validate_job_description(&raw).is_err());
    }

    #[test]
    fn test_pdf_and_text_are_accepted() {
        assert!(validate_resume_file("CV.PDF", 2048).is_ok());
        assert!(validate_resume_file("resume.txt", 10).is_ok());
        assert!(validate_resume_file("resume.md", 10).is_ok());
    }

    #[test]
    fn test_docx_and_extensionless_are_rejected() {
        assert!(validate_resume_file("resume.docx", 2048).is_err());
        assert!(validate_resume_file("resume", 2048).is_err());
    }

    #[test]
    fn test_size_limits() {
        assert!(validate_resume_file("resume.pdf", 0).is_err());
        assert!(validate_resume_file("resume.pdf", MAX_RESUME_BYTES).is_ok());
        assert!(validate_resume_file("resume.pdf", MAX_RESUME_BYTES + 1).is_err());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }
}
