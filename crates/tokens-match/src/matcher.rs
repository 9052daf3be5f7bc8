//! Running a set of templates against one input and choosing the best.

use crate::binder::JsonTarget;
use crate::engine;
use crate::result::TokenizeResult;
use crate::TokenizeError;
use serde_json::Value as Json;
use std::cmp::Reverse;
use thiserror::Error;
use tokens_template::Template;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("template {template}: {source}")]
    Template {
        template: String,
        #[source]
        source: TokenizeError,
    },
}

/// One template's outcome.
#[derive(Debug, Clone)]
pub struct TemplateResult {
    /// Position of the template in the matcher.
    pub index: usize,
    pub name: Option<String>,
    /// The object built from the matches.
    pub value: Json,
    pub result: TokenizeResult,
}

#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// One entry per template that passed the tag filter, in order.
    pub results: Vec<TemplateResult>,
    best: Option<usize>,
}

impl MatchReport {
    /// The successful result with the most matched hints, then the most
    /// matches. Ties go to the earlier template.
    pub fn best(&self) -> Option<&TemplateResult> {
        self.best.and_then(|i| self.results.get(i))
    }

    pub fn successes(&self) -> impl Iterator<Item = &TemplateResult> {
        self.results.iter().filter(|r| r.result.success)
    }
}

/// An ordered collection of compiled templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateMatcher {
    templates: Vec<Template>,
}

impl TemplateMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, template: Template) -> &mut Self {
        self.templates.push(template);
        self
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Runs every template carrying all of `tags` against `input`. An empty
    /// tag list selects every template.
    ///
    /// A template that raises an error stops the run.
    pub fn match_input<S: AsRef<str>>(
        &self,
        input: &str,
        tags: &[S],
    ) -> Result<MatchReport, MatcherError> {
        let mut report = MatchReport::default();

        for (index, template) in self.templates.iter().enumerate() {
            if !tags.is_empty() && !template.has_tags(tags) {
                log::trace!("template {} skipped by tag filter", label(index, template));
                continue;
            }
            let mut target = JsonTarget::new();
            let result = engine::tokenize(template, input, &mut target).map_err(|source| {
                MatcherError::Template {
                    template: label(index, template),
                    source,
                }
            })?;
            report.results.push(TemplateResult {
                index,
                name: template.name.clone(),
                value: target.into_value(),
                result,
            });
        }

        report.best = report
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.result.success)
            .min_by_key(|(_, r)| {
                (
                    Reverse(r.result.hints.matches.len()),
                    Reverse(r.result.matches.len()),
                )
            })
            .map(|(i, _)| i);

        if let Some(best) = report.best() {
            log::debug!(
                "best template: {} ({} match(es))",
                label(best.index, &self.templates[best.index]),
                best.result.matches.len()
            );
        }
        Ok(report)
    }
}

fn label(index: usize, template: &Template) -> String {
    match &template.name {
        Some(name) => name.clone(),
        None => format!("#{}", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matcher(templates: &[&str]) -> TemplateMatcher {
        let mut matcher = TemplateMatcher::new();
        for content in templates {
            matcher.add(Template::compile(content).unwrap());
        }
        matcher
    }

    #[test]
    fn test_most_hints_wins() {
        let matcher = matcher(&[
            "---\nname: plain\n---\nName: {Name}\nAge: {Age}",
            "---\nname: hinted\nhint?: Registry\n---\nName: {Name}",
        ]);
        let report = matcher.match_input("Registry\nName: Ann\nAge: 3", &[] as &[&str]).unwrap();
        assert_eq!(report.results.len(), 2);
        let best = report.best().unwrap();
        assert_eq!(best.name.as_deref(), Some("hinted"));
        assert_eq!(best.value, json!({"Name": "Ann\nAge: 3"}));
    }

    #[test]
    fn test_most_matches_wins_without_hints() {
        let matcher = matcher(&["Name: {Name$}", "Name: {Name$}\nAge: {Age$}"]);
        let report = matcher.match_input("Name: Ann\nAge: 3\n", &[] as &[&str]).unwrap();
        let best = report.best().unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.value, json!({"Name": "Ann", "Age": "3"}));
        assert_eq!(report.successes().count(), 2);
    }

    #[test]
    fn test_required_hint_excludes_template() {
        let matcher = matcher(&["---\nhint: Registry\n---\nName: {Name}"]);
        let report = matcher.match_input("Name: Ann", &[] as &[&str]).unwrap();
        assert!(report.best().is_none());
        assert!(!report.results[0].result.success);
    }

    #[test]
    fn test_tag_filter() {
        let matcher = matcher(&[
            "---\ntag: whois\ntag: com\n---\nName: {Name}",
            "---\ntag: dns\n---\nName: {Name}",
        ]);
        let report = matcher.match_input("Name: Ann", &["WHOIS"]).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].index, 0);

        let report = matcher.match_input("Name: Ann", &["whois", "dns"]).unwrap();
        assert!(report.results.is_empty());
        assert!(report.best().is_none());
    }

    #[test]
    fn test_errors_stop_the_run() {
        let matcher = matcher(&[
            "---\nname: strict\nIgnoreMissingProperties: false\n---\nX: {A..B}",
            "X: {X}",
        ]);
        let err = matcher.match_input("X: 1", &[] as &[&str]).unwrap_err();
        let MatcherError::Template { template, .. } = err;
        assert_eq!(template, "strict");
    }

    #[test]
    fn test_shared_across_threads() {
        let matcher = matcher(&["Name: {Name}"]);
        std::thread::scope(|scope| {
            let handles: Vec<_> = ["Ann", "Bob"]
                .iter()
                .map(|name| {
                    let matcher = &matcher;
                    scope.spawn(move || {
                        let input = format!("Name: {}", name);
                        matcher.match_input(&input, &[] as &[&str]).unwrap()
                    })
                })
                .collect();
            for (handle, name) in handles.into_iter().zip(["Ann", "Bob"]) {
                let report = handle.join().unwrap();
                assert_eq!(report.best().unwrap().value, json!({"Name": name}));
            }
        });
    }
}
