use crate::errors::FileError;

/// Characters of a text file surfaced by the ad-hoc query path.
pub const TEXT_PREVIEW_CHARS: usize = 500;

pub fn decode_utf8(bytes: &[u8]) -> Result<String, FileError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| FileError::validation("File payload is not valid UTF-8."))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvSummary {
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Header names and data-row count. No parsing beyond line/comma splitting;
/// binary office formats never reach this path.
pub fn summarize_csv(text: &str) -> CsvSummary {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let headers = lines
        .next()
        .map(|line| {
            line.split(',')
                .map(|field| field.trim().to_string())
                .collect()
        })
        .unwrap_or_default();
    CsvSummary {
        headers,
        row_count: lines.count(),
    }
}

pub fn text_preview(text: &str) -> String {
    text.chars().take(TEXT_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_summary_counts_data_rows() {
        let summary = summarize_csv("name,age\nAlice,30\nBob,40\n");
        assert_eq!(summary.headers, vec!["name", "age"]);
        assert_eq!(summary.row_count, 2);
    }

    #[test]
    fn empty_csv_summarizes_to_nothing() {
        let summary = summarize_csv("");
        assert!(summary.headers.is_empty());
        assert_eq!(summary.row_count, 0);
    }

    #[test]
    fn preview_truncates_on_character_boundary() {
        let long = "あ".repeat(600);
        let preview = text_preview(&long);
        assert_eq!(preview.chars().count(), TEXT_PREVIEW_CHARS);
    }

    #[test]
    fn invalid_utf8_is_a_validation_error() {
        let err = decode_utf8(&[0xff, 0xfe]).unwrap_err();
        assert_eq!(err.0.code.0, "SCHEMA.VALIDATION");
    }
}
