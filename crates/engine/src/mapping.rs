use jobfill_vault::ProfileField;

/// One row of the field mapping table: a profile field and the name
/// substrings tried against form controls, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: ProfileField,
    pub candidates: &'static [&'static str],
}

/// The canonical mapping table, one row per field in canonical field order.
/// Candidates are matched case-insensitively and must stay lowercase.
pub static FIELD_MAPPINGS: [FieldMapping; 15] = [
    FieldMapping {
        field: ProfileField::Name,
        candidates: &["name", "full-name", "fullname"],
    },
    FieldMapping {
        field: ProfileField::Email,
        candidates: &["email", "e-mail"],
    },
    FieldMapping {
        field: ProfileField::Phone,
        candidates: &["phone", "telephone", "mobile"],
    },
    FieldMapping {
        field: ProfileField::Address,
        candidates: &["address", "street-address"],
    },
    FieldMapping {
        field: ProfileField::City,
        candidates: &["city", "town"],
    },
    FieldMapping {
        field: ProfileField::State,
        candidates: &["state", "province"],
    },
    FieldMapping {
        field: ProfileField::Zip,
        candidates: &["zip", "postal-code", "zipcode"],
    },
    FieldMapping {
        field: ProfileField::JobTitle,
        candidates: &["job-title", "position", "desired-position"],
    },
    FieldMapping {
        field: ProfileField::Salary,
        candidates: &["salary", "desired-salary", "expected-salary"],
    },
    FieldMapping {
        field: ProfileField::StartDate,
        candidates: &["start-date", "availability", "available-start-date"],
    },
    FieldMapping {
        field: ProfileField::Resume,
        candidates: &["resume", "cv", "upload-resume"],
    },
    FieldMapping {
        field: ProfileField::Country,
        candidates: &["country", "nation"],
    },
    FieldMapping {
        field: ProfileField::Education,
        candidates: &["education", "degree", "school"],
    },
    FieldMapping {
        field: ProfileField::Experience,
        candidates: &["experience", "work-history", "employment"],
    },
    FieldMapping {
        field: ProfileField::Skills,
        candidates: &["skills", "qualifications"],
    },
];

/// Candidate substrings for a field, in the order they are tried
pub fn candidates(field: ProfileField) -> &'static [&'static str] {
    FIELD_MAPPINGS
        .iter()
        .find(|mapping| mapping.field == field)
        .map(|mapping| mapping.candidates)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_row_per_field_in_canonical_order() {
        let fields: Vec<_> = FIELD_MAPPINGS.iter().map(|m| m.field).collect();
        assert_eq!(fields, ProfileField::ALL.to_vec());
    }

    #[test]
    fn test_candidates_are_lowercase_and_non_empty() {
        for mapping in &FIELD_MAPPINGS {
            assert!(!mapping.candidates.is_empty(), "{} has no candidates", mapping.field);
            for candidate in mapping.candidates {
                assert!(!candidate.is_empty());
                assert_eq!(*candidate, candidate.to_lowercase());
            }
        }
    }

    #[test]
    fn test_first_candidate_is_the_field_key() {
        for field in ProfileField::ALL {
            assert_eq!(candidates(field)[0], field.as_str());
        }
    }
}
