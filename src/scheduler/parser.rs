//! Line-oriented extraction of job entries from `qstat` output.
//!
//! A typical listing looks like:
//!
//! ```text
//! job-ID  prior   name    user     state submit/start at     queue          slots
//! -----------------------------------------------------------------------------
//! 2379768 0.50000 python  kellys04 r     09/12/2017 13:42:05 all.q@node1    1
//! 2379769 0.00000 python  kellys04 qw    09/12/2017 13:42:00                1
//! ```
//!
//! The column count varies (queue is blank for waiting jobs, array task ids
//! are optional), so the state column is located relative to the job id
//! rather than by fixed offset.

/// Return the first line whose first whitespace-delimited field is `job_id`.
pub fn find_entry<'a>(snapshot: &'a str, job_id: &str) -> Option<&'a str> {
    if job_id.is_empty() {
        return None;
    }
    snapshot
        .lines()
        .find(|line| line.split_whitespace().next() == Some(job_id))
}

/// Extract the raw status token for `job_id`, if the job is listed.
pub fn parse_status<'a>(snapshot: &'a str, job_id: &str) -> Option<&'a str> {
    find_entry(snapshot, job_id).and_then(status_field)
}

/// Index of the state column: id, prior, name and user always precede it.
const STATE_COLUMN: usize = 4;

/// Pick the state column out of a single entry line.
///
/// Candidates are the fields from the state column onwards that still have
/// another field after them. The last purely alphabetic candidate wins:
/// dates and queue names with `.`/`@` come after the state. A line too short
/// to hold a state followed by the submit date yields `None`.
pub fn status_field(entry: &str) -> Option<&str> {
    let fields: Vec<&str> = entry.split_whitespace().collect();
    if fields.len() <= STATE_COLUMN + 1 {
        return None;
    }
    fields[STATE_COLUMN..fields.len() - 1]
        .iter()
        .rev()
        .find(|field| field.chars().all(|c| c.is_ascii_alphabetic()))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
job-ID  prior   name       user         state submit/start at     queue                          slots ja-task-ID
-----------------------------------------------------------------------------------------------------------------
2379768 0.50000 python     kellys04     r     09/12/2017 13:42:05 all.q@phn001.hpc.example.org       1
2379769 0.00000 python     kellys04     qw    09/12/2017 13:42:00                                    1
2379770 0.00000 align_1    kellys04     Eqw   09/12/2017 13:41:00                                    8
 2379771 0.00000 sleeper   kellys04     dr    09/12/2017 13:40:00 all.q@phn002.hpc.example.org       1
";

    #[test]
    fn finds_entry_by_first_field() {
        let entry = find_entry(LISTING, "2379769").unwrap();
        assert!(entry.starts_with("2379769"));
        assert!(entry.contains("qw"));
    }

    #[test]
    fn allows_leading_whitespace_before_id() {
        assert_eq!(parse_status(LISTING, "2379771"), Some("dr"));
    }

    #[test]
    fn does_not_match_id_prefix_or_other_columns() {
        assert!(find_entry(LISTING, "237976").is_none());
        assert!(find_entry(LISTING, "kellys04").is_none());
        assert!(find_entry(LISTING, "").is_none());
    }

    #[test]
    fn extracts_state_column_with_variable_trailing_fields() {
        assert_eq!(parse_status(LISTING, "2379768"), Some("r"));
        assert_eq!(parse_status(LISTING, "2379769"), Some("qw"));
        assert_eq!(parse_status(LISTING, "2379770"), Some("Eqw"));
    }

    #[test]
    fn absent_job_has_no_status() {
        assert_eq!(parse_status(LISTING, "9999999"), None);
        assert_eq!(parse_status("", "2379768"), None);
    }

    #[test]
    fn first_matching_entry_wins() {
        let listing = "42 0.5 job user r 01/01/2020 10:00:00 q@h 1\n42 0.5 job user Eqw 01/01/2020 10:00:00 1\n";
        assert_eq!(parse_status(listing, "42"), Some("r"));
    }

    #[test]
    fn truncated_entry_has_no_status() {
        assert_eq!(status_field("42"), None);
        assert_eq!(status_field("42 r"), None);
        assert_eq!(status_field("42 0.5 1"), None);
    }

    #[test]
    fn name_and_user_are_never_the_state() {
        assert_eq!(parse_status("42 0.5 job user r\n", "42"), None);
        assert_eq!(status_field("42 0.5 job user r 01/01/2020"), Some("r"));
        // a purely alphabetic name still sits before the state column
        assert_eq!(status_field("42 0.5 job user 01/01/2020 10:00:00 1"), None);
    }
}
