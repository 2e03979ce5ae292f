use crate::error::{AppError, MissingColumn};
use crate::models::{normalize_column_name, KeyValue, Table};
use crate::services::excel::utils::detect_column_type;
use serde::Serialize;
use std::collections::HashSet;

pub const MAJORS_LABEL: &str = "majors";
pub const ATTENDEES_LABEL: &str = "attendees";

/// Header fragments that mark a likely identifier column, in priority order.
const KEY_HINTS: [&str; 4] = ["bronco id", "id", "student id", "student_id"];
const NAME_HINT: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub total_attendees: usize,
    pub total_majors: usize,
    pub majors_at_event: usize,
    pub non_major_attendees: usize,
}

/// Raised when the two key columns hold different kinds of values. The
/// comparison still runs on literal equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyWarning {
    pub kind: &'static str,
    pub message: String,
    pub majors_column: String,
    pub majors_type: &'static str,
    pub attendees_column: String,
    pub attendees_type: &'static str,
    /// Unmatched attendee rows whose key equals a majors key once both are read as text.
    pub coercible_matches: usize,
}

/// Who among the attendees is a major: names when the attendee sheet has a
/// name column, otherwise their key values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendingMajors {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug)]
pub struct Comparison {
    pub unmatched: Table,
    pub summary: ComparisonSummary,
    pub attending_majors: AttendingMajors,
    pub warnings: Vec<KeyWarning>,
}

impl Comparison {
    pub fn all_attendees_matched(&self) -> bool {
        self.unmatched.row_count() == 0 && self.summary.total_attendees > 0
    }
}

/// Finds `key` (normalized like a header) in `table`.
pub fn resolve_key(table: &Table, label: &str, key: &str) -> Result<usize, MissingColumn> {
    let column = normalize_column_name(key);
    table.column_index(&column).ok_or_else(|| MissingColumn {
        table: label.to_string(),
        column,
        available_columns: table.columns().to_vec(),
    })
}

/// Picks the first column equal to `preferred` or containing an identifier
/// hint such as "id" or "student id".
pub fn suggest_key(table: &Table, preferred: Option<&str>) -> Option<String> {
    let preferred = preferred.map(normalize_column_name);
    table
        .columns()
        .iter()
        .find(|column| {
            preferred.as_deref() == Some(column.as_str())
                || KEY_HINTS.iter().any(|hint| column.contains(hint))
        })
        .cloned()
}

/// Keeps the attendee rows whose key value does not occur in the majors key column.
pub fn compare(
    majors: &Table,
    majors_key: &str,
    attendees: &Table,
    attendees_key: &str,
) -> Result<Comparison, AppError> {
    let (majors_idx, attendees_idx) = match (
        resolve_key(majors, MAJORS_LABEL, majors_key),
        resolve_key(attendees, ATTENDEES_LABEL, attendees_key),
    ) {
        (Ok(majors_idx), Ok(attendees_idx)) => (majors_idx, attendees_idx),
        (majors_res, attendees_res) => {
            let missing = [majors_res.err(), attendees_res.err()]
                .into_iter()
                .flatten()
                .collect();
            return Err(AppError::MissingColumns(missing));
        }
    };

    let major_keys: HashSet<KeyValue> = majors.column_values(majors_idx).map(|v| v.key()).collect();

    let (matched, unmatched) =
        attendees.partition_rows(|row| major_keys.contains(&row[attendees_idx].key()));

    let summary = ComparisonSummary {
        total_attendees: attendees.row_count(),
        total_majors: majors.row_count(),
        majors_at_event: matched.row_count(),
        non_major_attendees: unmatched.row_count(),
    };

    let display_idx = matched.find_column_containing(NAME_HINT).unwrap_or(attendees_idx);
    let attending_majors = AttendingMajors {
        column: matched.columns()[display_idx].clone(),
        values: matched.column_values(display_idx).map(|v| v.to_string()).collect(),
    };

    let warnings = type_mismatch(majors, majors_idx, attendees, &unmatched, attendees_idx)
        .into_iter()
        .collect::<Vec<_>>();
    for warning in &warnings {
        tracing::warn!("{}", warning.message);
    }

    tracing::info!(
        "Compared {} attendees against {} majors: {} majors at event, {} non-major attendees",
        summary.total_attendees,
        summary.total_majors,
        summary.majors_at_event,
        summary.non_major_attendees
    );

    Ok(Comparison {
        unmatched,
        summary,
        attending_majors,
        warnings,
    })
}

fn type_mismatch(
    majors: &Table,
    majors_idx: usize,
    attendees: &Table,
    unmatched: &Table,
    attendees_idx: usize,
) -> Option<KeyWarning> {
    let majors_type = detect_column_type(majors.column_values(majors_idx));
    let attendees_type = detect_column_type(attendees.column_values(attendees_idx));
    if majors_type == "empty" || attendees_type == "empty" || majors_type == attendees_type {
        return None;
    }

    let major_text: HashSet<String> = majors
        .column_values(majors_idx)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string().trim().to_string())
        .collect();
    let coercible_matches = unmatched
        .column_values(attendees_idx)
        .filter(|v| !v.is_empty())
        .filter(|v| major_text.contains(v.to_string().trim()))
        .count();

    let majors_column = majors.columns()[majors_idx].clone();
    let attendees_column = attendees.columns()[attendees_idx].clone();
    let message = format!(
        "Key column '{}' in {} looks {} but '{}' in {} looks {}; values are compared as-is \
         and {} unmatched attendee rows would match if compared as text",
        majors_column,
        MAJORS_LABEL,
        majors_type,
        attendees_column,
        ATTENDEES_LABEL,
        attendees_type,
        coercible_matches
    );

    Some(KeyWarning {
        kind: "type_mismatch",
        message,
        majors_column,
        majors_type,
        attendees_column,
        attendees_type,
        coercible_matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn int(i: i64) -> CellValue {
        CellValue::Int(i)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn ids(values: Vec<CellValue>) -> Table {
        Table::new(vec!["id".into()], values.into_iter().map(|v| vec![v]).collect())
    }

    fn people(rows: Vec<(CellValue, &str)>) -> Table {
        Table::new(
            vec!["id".into(), "name".into()],
            rows.into_iter().map(|(id, name)| vec![id, text(name)]).collect(),
        )
    }

    #[test]
    fn drops_attendees_found_in_majors() {
        let majors = ids(vec![int(1), int(2)]);
        let attendees = people(vec![(int(1), "X"), (int(3), "Y")]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched, people(vec![(int(3), "Y")]));
        assert_eq!(result.summary.majors_at_event, 1);
        assert_eq!(result.summary.non_major_attendees, 1);
        assert_eq!(result.attending_majors.values, ["X"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn empty_majors_pass_everything_through() {
        let majors = ids(vec![]);
        let attendees = people(vec![(int(5), "Z")]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched, attendees);
        assert!(!result.all_attendees_matched());
    }

    #[test]
    fn empty_attendees_give_empty_result() {
        let majors = ids(vec![int(1)]);
        let attendees = people(vec![]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched.row_count(), 0);
        assert_eq!(result.unmatched.columns(), attendees.columns());
        assert_eq!(result.summary.total_attendees, 0);
    }

    #[test]
    fn counts_partition_the_attendees() {
        let majors = ids(vec![int(1), int(1), int(4), text("A7")]);
        let attendees = people(vec![
            (int(1), "a"),
            (int(1), "a again"),
            (int(2), "b"),
            (text("A7"), "c"),
            (int(4), "d"),
            (int(9), "e"),
        ]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        let s = &result.summary;
        assert_eq!(s.majors_at_event + s.non_major_attendees, s.total_attendees);
        assert_eq!(s.non_major_attendees, 2);

        let major_keys: HashSet<KeyValue> = majors.column_values(0).map(|v| v.key()).collect();
        for row in result.unmatched.rows() {
            assert!(attendees.rows().contains(row));
            assert!(!major_keys.contains(&row[0].key()));
        }
    }

    #[test]
    fn duplicate_attendees_are_kept() {
        let majors = ids(vec![int(1)]);
        let attendees = people(vec![(int(2), "b"), (int(2), "b")]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched.row_count(), 2);
    }

    #[test]
    fn empty_keys_match_literally() {
        let majors = ids(vec![CellValue::Empty, int(1)]);
        let attendees = people(vec![(CellValue::Empty, "no id"), (int(2), "b")]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched, people(vec![(int(2), "b")]));
    }

    #[test]
    fn empty_key_in_attendees_kept_without_empty_major() {
        let majors = ids(vec![int(1)]);
        let attendees = people(vec![(CellValue::Empty, "no id")]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched.row_count(), 1);
    }

    #[test]
    fn different_key_names_per_table() {
        let majors = Table::new(vec!["bronco id".into()], vec![vec![int(10)]]);
        let attendees = Table::new(
            vec!["student".into(), "name".into()],
            vec![vec![int(10), text("a")], vec![int(11), text("b")]],
        );

        let result = compare(&majors, "Bronco ID ", &attendees, "STUDENT").unwrap();
        assert_eq!(result.unmatched.rows(), [vec![int(11), text("b")]]);
    }

    #[test]
    fn missing_majors_key_is_rejected() {
        let majors = ids(vec![int(1)]);
        let attendees = people(vec![(int(1), "X")]);

        match compare(&majors, "bronco id", &attendees, "id") {
            Err(AppError::MissingColumns(missing)) => {
                assert_eq!(
                    missing,
                    vec![MissingColumn {
                        table: "majors".to_string(),
                        column: "bronco id".to_string(),
                        available_columns: vec!["id".to_string()],
                    }]
                );
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn missing_attendees_key_is_rejected() {
        let majors = ids(vec![int(1)]);
        let attendees = people(vec![(int(1), "X")]);

        match compare(&majors, "id", &attendees, "email").unwrap_err() {
            AppError::MissingColumns(missing) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].table, "attendees");
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn both_missing_keys_are_reported() {
        let majors = ids(vec![int(1)]);
        let attendees = people(vec![(int(1), "X")]);

        match compare(&majors, "bronco id", &attendees, "email").unwrap_err() {
            AppError::MissingColumns(missing) => {
                let tables: Vec<&str> = missing.iter().map(|m| m.table.as_str()).collect();
                assert_eq!(tables, ["majors", "attendees"]);
                assert_eq!(missing[1].column, "email");
                assert_eq!(missing[1].available_columns, ["id", "name"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn attending_majors_listed_by_name() {
        let majors = ids(vec![int(1), int(3)]);
        let attendees = Table::new(
            vec!["id".into(), "first name".into()],
            vec![
                vec![int(1), text("Ann")],
                vec![int(2), text("Bo")],
                vec![int(3), text("Cy")],
            ],
        );

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(
            result.attending_majors,
            AttendingMajors {
                column: "first name".to_string(),
                values: vec!["Ann".to_string(), "Cy".to_string()],
            }
        );
    }

    #[test]
    fn attending_majors_fall_back_to_keys() {
        let majors = ids(vec![int(7)]);
        let attendees = Table::new(
            vec!["email".into(), "student id".into()],
            vec![vec![text("a@x.edu"), int(7)], vec![text("b@x.edu"), int(8)]],
        );

        let result = compare(&majors, "id", &attendees, "student id").unwrap();
        assert_eq!(result.attending_majors.column, "student id");
        assert_eq!(result.attending_majors.values, ["7"]);
    }

    #[test]
    fn suggests_identifier_columns() {
        let table = Table::new(vec!["name".into(), "student id".into(), "email".into()], vec![]);
        assert_eq!(suggest_key(&table, None).as_deref(), Some("student id"));

        let no_hint = Table::new(vec!["name".into(), "email".into()], vec![]);
        assert_eq!(suggest_key(&no_hint, None), None);
        assert_eq!(suggest_key(&no_hint, Some("Email")).as_deref(), Some("email"));
    }

    #[test]
    fn suggestion_takes_the_first_candidate_column() {
        let table = Table::new(vec!["bronco".into(), "badge".into(), "bronco id".into()], vec![]);
        assert_eq!(suggest_key(&table, Some("badge")).as_deref(), Some("badge"));
        assert_eq!(suggest_key(&table, None).as_deref(), Some("bronco id"));
    }

    #[test]
    fn text_and_numeric_keys_warn_without_coercing() {
        let majors = ids(vec![text("123"), text("456")]);
        let attendees = people(vec![(int(123), "X"), (int(789), "Y")]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched.row_count(), 2);

        let warning = &result.warnings[0];
        assert_eq!(warning.kind, "type_mismatch");
        assert_eq!(warning.majors_type, "string");
        assert_eq!(warning.attendees_type, "numeric");
        assert_eq!(warning.coercible_matches, 1);
    }

    #[test]
    fn integers_match_floats() {
        let majors = ids(vec![CellValue::Float(1001.0)]);
        let attendees = people(vec![(int(1001), "X")]);

        let result = compare(&majors, "id", &attendees, "id").unwrap();
        assert_eq!(result.unmatched.row_count(), 0);
        assert!(result.all_attendees_matched());
        assert!(result.warnings.is_empty());
    }
}
