//! Attribution of analyzer metrics and smells to refactored files.

use std::collections::BTreeSet;

use quarry_core::SourceEntry;

/// A metric attributed to a file, and optionally to a method within it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    /// Metric name as reported by the analyzer.
    pub metric_type: String,
    /// File the metric belongs to.
    pub file_path: String,
    /// Measured value.
    pub value: f64,
    /// Unqualified method name for method-level metrics; `None` for
    /// file-level metrics.
    pub method_name: Option<String>,
}

/// A smell attributed to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmellRow {
    /// Smell name as reported by the analyzer.
    pub smell: String,
    /// File the smell belongs to.
    pub file_path: String,
}

/// Metrics and smells extracted from one analyzer report.
#[derive(Debug, Default)]
pub struct Attribution {
    /// Flattened metric rows.
    pub metrics: Vec<MetricRow>,
    /// Flattened smell rows.
    pub smells: Vec<SmellRow>,
}

/// Extract the metric and smell entries attributable to the files in
/// `interest`.
///
/// Entries whose file path is outside the interest set are dropped entirely:
/// the analyzer reports on the whole source tree, but only the files touched
/// by refactorings matter here. Entries missing their `sourceFile` are
/// skipped as malformed. Method-level rows carry the method's unqualified
/// name — the last dot-separated segment of its fully qualified name, or the
/// empty string when the qualified name is absent. Method-level smells are
/// attributed to the enclosing file, matching the persisted schema.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use quarry_analysis::extract;
/// use quarry_core::AnalyzerReport;
///
/// let report: AnalyzerReport = serde_json::from_str(
///     r#"[{
///         "sourceFile": {"fileRelativePath": "src/A.java"},
///         "methods": [{
///             "fullyQualifiedName": "com.x.Foo.bar",
///             "metricsValues": {"CYCLO": 4}
///         }]
///     }]"#,
/// )
/// .unwrap();
///
/// let interest: BTreeSet<String> = ["src/A.java".to_string()].into();
/// let attribution = extract(&report, &interest);
/// assert_eq!(attribution.metrics[0].method_name.as_deref(), Some("bar"));
/// ```
pub fn extract(report: &[SourceEntry], interest: &BTreeSet<String>) -> Attribution {
    let mut attribution = Attribution::default();

    for entry in report {
        let Some(source) = &entry.source_file else {
            continue;
        };
        let path = &source.file_relative_path;
        if !interest.contains(path) {
            continue;
        }

        if let Some(metrics) = &entry.metrics_values {
            for (name, value) in metrics {
                let Some(value) = value.as_f64() else {
                    continue;
                };
                attribution.metrics.push(MetricRow {
                    metric_type: name.clone(),
                    file_path: path.clone(),
                    value,
                    method_name: None,
                });
            }
        }

        if let Some(smells) = &entry.smells {
            for smell in smells {
                attribution.smells.push(SmellRow {
                    smell: smell.name.clone(),
                    file_path: path.clone(),
                });
            }
        }

        for method in entry.methods.iter().flatten() {
            let method_name = method
                .fully_qualified_name
                .as_deref()
                .map(unqualified_name)
                .unwrap_or("")
                .to_string();

            if let Some(metrics) = &method.metrics_values {
                for (name, value) in metrics {
                    let Some(value) = value.as_f64() else {
                        continue;
                    };
                    attribution.metrics.push(MetricRow {
                        metric_type: name.clone(),
                        file_path: path.clone(),
                        value,
                        method_name: Some(method_name.clone()),
                    });
                }
            }

            if let Some(smells) = &method.smells {
                for smell in smells {
                    attribution.smells.push(SmellRow {
                        smell: smell.name.clone(),
                        file_path: path.clone(),
                    });
                }
            }
        }
    }

    attribution
}

fn unqualified_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}
