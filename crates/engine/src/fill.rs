use jobfill_vault::{Profile, ProfileField, SharedStore};
use serde::Serialize;

use crate::document::{ControlId, FormSurface};
use crate::mapping::FIELD_MAPPINGS;
use crate::{EngineError, Result};

/// Why a field was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Skip {
    /// The profile has no non-empty value for the field
    NoValue,
    /// No control matched any candidate
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FieldOutcome {
    Filled {
        field: ProfileField,
        candidate: &'static str,
        control: ControlId,
    },
    Skipped {
        field: ProfileField,
        reason: Skip,
    },
}

/// What one fill pass did, field by field in table order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub outcomes: Vec<FieldOutcome>,
}

impl FillReport {
    pub fn filled(&self) -> impl Iterator<Item = (ProfileField, ControlId)> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FieldOutcome::Filled { field, control, .. } => Some((*field, *control)),
            FieldOutcome::Skipped { .. } => None,
        })
    }

    pub fn filled_count(&self) -> usize {
        self.filled().count()
    }

    pub fn skipped(&self, reason: Skip) -> impl Iterator<Item = ProfileField> + '_ {
        self.outcomes.iter().filter_map(move |outcome| match outcome {
            FieldOutcome::Skipped { field, reason: r } if *r == reason => Some(*field),
            _ => None,
        })
    }
}

/// Run one fill pass of `profile` over `surface`.
///
/// For every field with a value, the candidates are tried in table order and
/// the first matching control gets the value followed by a `change` event.
/// Fields without a value or without a match are skipped silently. Controls
/// are not claimed, so a later field can overwrite what an earlier one wrote.
pub fn fill_form<S>(profile: &Profile, surface: &mut S) -> Result<FillReport>
where
    S: FormSurface + ?Sized,
{
    let mut report = FillReport::default();

    for mapping in &FIELD_MAPPINGS {
        let field = mapping.field;
        let Some(value) = profile.get(field) else {
            report.outcomes.push(FieldOutcome::Skipped {
                field,
                reason: Skip::NoValue,
            });
            continue;
        };

        let matched = mapping
            .candidates
            .iter()
            .find_map(|candidate| surface.find_by_name(candidate).map(|id| (*candidate, id)));

        match matched {
            Some((candidate, control)) => {
                surface.set_value(control, value)?;
                surface.dispatch_change(control)?;
                tracing::trace!(%field, candidate, %control, "filled");
                report.outcomes.push(FieldOutcome::Filled {
                    field,
                    candidate,
                    control,
                });
            }
            None => report.outcomes.push(FieldOutcome::Skipped {
                field,
                reason: Skip::NoMatch,
            }),
        }
    }

    tracing::debug!(
        filled = report.filled_count(),
        unmatched = report.skipped(Skip::NoMatch).count(),
        "fill pass complete"
    );
    Ok(report)
}

/// Fill pass driven by whatever profile is cached in `store`.
/// An empty store behaves like an empty profile.
pub fn fill_from_storage<S>(store: &SharedStore, surface: &mut S) -> Result<FillReport>
where
    S: FormSurface + ?Sized,
{
    let cached = {
        let store = store
            .lock()
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        store.load()?
    };

    let profile = match cached {
        Some(entry) => entry.profile,
        None => {
            tracing::debug!("no cached profile, nothing to fill");
            Profile::new()
        }
    };

    fill_form(&profile, surface)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DomMutation, FormDocument};
    use jobfill_vault::{shared, InMemoryStore, Provenance, StoredProfile};

    fn ana() -> Profile {
        Profile::new()
            .with(ProfileField::Name, "Ana")
            .with(ProfileField::Email, "a@x.com")
    }

    #[test]
    fn test_name_and_email_scenario() {
        let mut doc = FormDocument::new();
        let name = doc.push_input("full-name", "text");
        let email = doc.push_input("email-field", "text");

        let report = fill_form(&ana(), &mut doc).unwrap();

        assert_eq!(
            doc.journal(),
            &[
                DomMutation::ValueSet {
                    control: name,
                    value: "Ana".to_string()
                },
                DomMutation::Event {
                    control: name,
                    event: "change".to_string(),
                    bubbles: true
                },
                DomMutation::ValueSet {
                    control: email,
                    value: "a@x.com".to_string()
                },
                DomMutation::Event {
                    control: email,
                    event: "change".to_string(),
                    bubbles: true
                },
            ]
        );
        assert_eq!(
            report.filled().collect::<Vec<_>>(),
            vec![(ProfileField::Name, name), (ProfileField::Email, email)]
        );
    }

    #[test]
    fn test_empty_profile_touches_nothing() {
        let mut doc =
            FormDocument::parse_html(r#"<input name="name"><input name="email">"#).unwrap();
        let report = fill_form(&Profile::new(), &mut doc).unwrap();

        assert!(doc.journal().is_empty());
        assert_eq!(report.filled_count(), 0);
        assert_eq!(report.skipped(Skip::NoValue).count(), ProfileField::ALL.len());
    }

    #[test]
    fn test_empty_value_skips_matching_control() {
        let profile = Profile::new()
            .with(ProfileField::Phone, "")
            .with(ProfileField::City, "Porto");
        let mut doc = FormDocument::new();
        doc.push_input("phone", "tel");
        let city = doc.push_input("city", "text");

        let report = fill_form(&profile, &mut doc).unwrap();

        assert_eq!(doc.value_of("phone"), Some(""));
        assert_eq!(report.filled().collect::<Vec<_>>(), vec![(ProfileField::City, city)]);
    }

    #[test]
    fn test_unmatched_field_is_reported_not_written() {
        let profile = ana().with(ProfileField::Salary, "100k");
        let mut doc = FormDocument::new();
        doc.push_input("email", "email");

        let report = fill_form(&profile, &mut doc).unwrap();

        assert_eq!(doc.value_of("email"), Some("a@x.com"));
        let unmatched: Vec<_> = report.skipped(Skip::NoMatch).collect();
        assert_eq!(unmatched, vec![ProfileField::Name, ProfileField::Salary]);
    }

    #[test]
    fn test_case_insensitive_match() {
        let mut doc = FormDocument::parse_html(r#"<input name="Email">"#).unwrap();
        fill_form(&ana(), &mut doc).unwrap();
        assert_eq!(doc.value_of("Email"), Some("a@x.com"));
    }

    #[test]
    fn test_first_candidate_wins_over_later_ones() {
        let profile = Profile::new().with(ProfileField::Phone, "555-0100");
        let mut doc = FormDocument::new();
        let mobile = doc.push_input("mobile", "tel");
        let phone = doc.push_input("home-phone", "tel");

        let report = fill_form(&profile, &mut doc).unwrap();

        assert_eq!(report.filled().collect::<Vec<_>>(), vec![(ProfileField::Phone, phone)]);
        assert_eq!(doc.control(mobile).map(|c| c.value.as_str()), Some(""));
    }

    #[test]
    fn test_commented_out_control_is_not_filled() {
        let mut doc = FormDocument::parse_html(
            r#"<form><!-- old field: <input name="email"> --><input name="email-field"></form>"#,
        )
        .unwrap();

        fill_form(&ana(), &mut doc).unwrap();

        assert_eq!(doc.controls().len(), 1);
        assert_eq!(doc.value_of("email-field"), Some("a@x.com"));
        assert!(doc.is_modified());
        assert_eq!(
            doc.render_html(),
            r#"<form><!-- old field: <input name="email"> --><input name="email-field" value="a@x.com"></form>"#
        );
    }

    #[test]
    fn test_first_control_in_document_order_wins() {
        let profile = Profile::new().with(ProfileField::City, "Porto");
        let mut doc = FormDocument::new();
        let first = doc.push_input("city", "text");
        let second = doc.push_input("billing-city", "text");

        fill_form(&profile, &mut doc).unwrap();

        assert_eq!(doc.control(first).map(|c| c.value.as_str()), Some("Porto"));
        assert_eq!(doc.control(second).map(|c| c.value.as_str()), Some(""));
    }

    #[test]
    fn test_resume_goes_to_text_control_not_file_input() {
        let profile = Profile::new().with(ProfileField::Resume, "Ten years of Rust");
        let mut doc = FormDocument::new();
        let upload = doc.push_input("upload-resume", "file");
        let text = doc.push_textarea("resume-text");

        fill_form(&profile, &mut doc).unwrap();

        assert_eq!(doc.control(upload).map(|c| c.value.as_str()), Some(""));
        assert_eq!(
            doc.control(text).map(|c| c.value.as_str()),
            Some("Ten years of Rust")
        );
    }

    #[test]
    fn test_fill_from_storage_uses_cached_profile() {
        let store = shared(InMemoryStore::with_profile(StoredProfile {
            profile: ana(),
            provenance: Provenance::imported(None),
        }));
        let mut doc = FormDocument::parse_html(r#"<input name="fullname">"#).unwrap();

        let report = fill_from_storage(&store, &mut doc).unwrap();

        assert_eq!(report.filled_count(), 1);
        assert_eq!(doc.value_of("fullname"), Some("Ana"));
    }

    #[test]
    fn test_fill_from_empty_storage_is_a_no_op() {
        let store = shared(InMemoryStore::new());
        let mut doc = FormDocument::parse_html(r#"<input name="fullname">"#).unwrap();

        let report = fill_from_storage(&store, &mut doc).unwrap();

        assert_eq!(report.filled_count(), 0);
        assert!(doc.journal().is_empty());
    }
}
