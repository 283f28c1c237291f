//! Release form extraction and locator resolution.

use serde_json::Value;
use url::Url;

use crate::error::NormalizeError;
use crate::request::VehicleRequest;

/// Resolves release form references to retrievable URLs.
///
/// Absolute `http(s)` references are used as-is. Anything else is treated as
/// a path relative to the configured file source.
#[derive(Debug, Clone, Default)]
pub struct LocatorResolver {
    base: Option<Url>,
}

impl LocatorResolver {
    /// Creates a resolver for relative references under `base`.
    pub fn new(base: Option<Url>) -> Self {
        // Url::join replaces the last segment unless the base ends with '/'
        let base = base.map(|mut url| {
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            url
        });
        Self { base }
    }

    pub fn resolve(&self, reference: &str) -> Result<Url, NormalizeError> {
        let invalid = |reason: String| NormalizeError::InvalidReference {
            reference: reference.to_string(),
            reason,
        };

        let reference = reference.trim();
        if let Ok(url) = Url::parse(reference) {
            return match url.scheme() {
                "http" | "https" => Ok(url),
                other => Err(invalid(format!("unsupported scheme '{other}'"))),
            };
        }

        let base = self
            .base
            .as_ref()
            .ok_or_else(|| invalid("relative reference without a file source".to_string()))?;
        base.join(reference.trim_start_matches('/'))
            .map_err(|e| invalid(e.to_string()))
    }

    /// Resolves a raw `ReleaseForm` value. Only strings are references.
    pub fn resolve_form(&self, form: &Value) -> Result<Url, NormalizeError> {
        match form {
            Value::String(reference) => self.resolve(reference),
            other => Err(NormalizeError::InvalidReference {
                reference: other.to_string(),
                reason: "not a string".to_string(),
            }),
        }
    }
}

/// Returns the release form reference of a vehicle, if it carries one.
///
/// `None`, empty strings and the literal string `"null"` all mean "no form".
/// Any other value is returned and left to [`LocatorResolver::resolve_form`].
pub fn release_form(vehicle: &VehicleRequest) -> Option<&Value> {
    vehicle.release_form.as_ref().filter(|form| match form {
        Value::Null => false,
        Value::String(reference) => {
            let reference = reference.trim();
            !reference.is_empty() && reference != "null"
        }
        _ => true,
    })
}

/// Collects the resolved release forms of all vehicles, in vehicle order.
///
/// Fails as a whole if any present reference cannot be resolved.
pub fn normalize_release_forms(
    vehicles: &[VehicleRequest],
    resolver: &LocatorResolver,
) -> Result<Vec<Url>, NormalizeError> {
    vehicles
        .iter()
        .filter_map(release_form)
        .map(|form| resolver.resolve_form(form))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(release_form: Option<&str>) -> VehicleRequest {
        VehicleRequest {
            make: "Ford".to_string(),
            release_form: release_form.map(Value::from),
            ..VehicleRequest::default()
        }
    }

    fn resolver() -> LocatorResolver {
        LocatorResolver::new(Some(
            Url::parse("https://files.example.com/release-forms").unwrap(),
        ))
    }

    #[test]
    fn drops_missing_empty_and_null_string_forms() {
        let vehicles = vec![
            vehicle(None),
            vehicle(Some("")),
            vehicle(Some("null")),
            vehicle(Some("https://cdn.example.com/a.pdf")),
            vehicle(Some("b.pdf")),
        ];

        let forms = normalize_release_forms(&vehicles, &resolver()).unwrap();
        let forms: Vec<&str> = forms.iter().map(Url::as_str).collect();
        assert_eq!(
            forms,
            vec![
                "https://cdn.example.com/a.pdf",
                "https://files.example.com/release-forms/b.pdf"
            ]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let vehicles = vec![
            vehicle(Some("x.pdf")),
            vehicle(None),
            vehicle(Some("y.pdf")),
        ];
        let first = normalize_release_forms(&vehicles, &resolver()).unwrap();
        let second = normalize_release_forms(&vehicles, &resolver()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn no_forms_yields_empty_set() {
        let vehicles = vec![vehicle(None), vehicle(Some("null"))];
        assert!(
            normalize_release_forms(&vehicles, &LocatorResolver::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn relative_reference_without_base_fails() {
        let vehicles = vec![vehicle(Some("forms/a.pdf"))];
        let result = normalize_release_forms(&vehicles, &LocatorResolver::default());
        assert!(matches!(
            result,
            Err(NormalizeError::InvalidReference { .. })
        ));
    }

    #[test]
    fn non_string_form_is_an_invalid_reference() {
        let vehicles = vec![
            vehicle(Some("a.pdf")),
            VehicleRequest {
                release_form: Some(Value::from(12345)),
                ..VehicleRequest::default()
            },
        ];
        let result = normalize_release_forms(&vehicles, &resolver());
        assert!(matches!(
            result,
            Err(NormalizeError::InvalidReference { ref reference, .. }) if reference == "12345"
        ));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let result = resolver().resolve("ftp://files.example.com/a.pdf");
        assert!(result.is_err());
    }

    #[test]
    fn leading_slash_stays_under_base() {
        let url = resolver().resolve("/2025/a.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "https://files.example.com/release-forms/2025/a.pdf"
        );
    }
}
