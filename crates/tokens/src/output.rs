use crate::runner::InputResult;
use serde_json::{json, Value as Json};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tokens_match::{to_json, MatchReport, TemplateResult, TokenizeResult};

pub struct Output {
    stdout: StandardStream,
}

impl Output {
    pub fn new(color: bool) -> Self {
        let color_choice = if color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            stdout: StandardStream::stdout(color_choice),
        }
    }

    fn set_color(&mut self, color: Color) -> io::Result<()> {
        self.stdout.set_color(ColorSpec::new().set_fg(Some(color)))
    }

    fn set_bold(&mut self) -> io::Result<()> {
        self.stdout.set_color(ColorSpec::new().set_bold(true))
    }

    fn set_dim(&mut self) -> io::Result<()> {
        self.stdout.set_color(ColorSpec::new().set_dimmed(true))
    }

    fn reset(&mut self) -> io::Result<()> {
        self.stdout.reset()
    }

    pub fn print_results(&mut self, results: &[InputResult], all: bool) -> io::Result<()> {
        for result in results {
            self.print_input(result, all)?;
        }

        let matched = results.iter().filter(|r| r.matched()).count();
        writeln!(self.stdout)?;
        if matched == results.len() {
            self.set_color(Color::Green)?;
            self.set_bold()?;
            writeln!(self.stdout, "All {} input(s) matched", matched)?;
        } else {
            self.set_bold()?;
            write!(self.stdout, "Summary:")?;
            self.reset()?;
            writeln!(
                self.stdout,
                " {} matched, {} unmatched",
                matched,
                results.len() - matched
            )?;
        }
        self.reset()?;
        self.stdout.flush()
    }

    fn print_input(&mut self, result: &InputResult, all: bool) -> io::Result<()> {
        let report = match &result.report {
            Ok(report) => report,
            Err(message) => {
                self.set_color(Color::Red)?;
                write!(self.stdout, "✗")?;
                self.reset()?;
                writeln!(self.stdout, " {}: {}", result.label, message)?;
                return Ok(());
            }
        };

        match report.best() {
            Some(best) => {
                self.set_color(Color::Green)?;
                write!(self.stdout, "✓")?;
                self.reset()?;
                write!(self.stdout, " {}: ", result.label)?;
                self.set_bold()?;
                write!(self.stdout, "{}", template_label(best))?;
                self.reset()?;
                self.set_dim()?;
                writeln!(
                    self.stdout,
                    " ({} match(es) in {:.3}s)",
                    best.result.matches.len(),
                    result.elapsed.as_secs_f64()
                )?;
                self.reset()?;
                self.print_value(&best.value)?;
            }
            None => {
                self.set_color(Color::Red)?;
                write!(self.stdout, "✗")?;
                self.reset()?;
                writeln!(self.stdout, " {}: no template matched", result.label)?;
                if !all {
                    for candidate in &report.results {
                        self.print_diagnosis(candidate)?;
                    }
                }
            }
        }

        if all {
            for candidate in &report.results {
                self.print_template_result(report, candidate)?;
            }
        }
        Ok(())
    }

    fn print_value(&mut self, value: &Json) -> io::Result<()> {
        let pretty = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
        for line in pretty.lines() {
            writeln!(self.stdout, "  {}", line)?;
        }
        Ok(())
    }

    fn print_template_result(
        &mut self,
        report: &MatchReport,
        candidate: &TemplateResult,
    ) -> io::Result<()> {
        let is_best = report.best().map(|b| b.index) == Some(candidate.index);
        let (mark, color) = match (is_best, candidate.result.success) {
            (true, _) => ("★", Color::Green),
            (false, true) => ("✓", Color::Cyan),
            (false, false) => ("✗", Color::Red),
        };
        write!(self.stdout, "  ")?;
        self.set_color(color)?;
        write!(self.stdout, "{}", mark)?;
        self.reset()?;
        writeln!(
            self.stdout,
            " {}: {} match(es), {} hint(s)",
            template_label(candidate),
            candidate.result.matches.len(),
            candidate.result.hints.matches.len()
        )?;
        if !is_best && candidate.result.success {
            self.print_value(&candidate.value)?;
        }
        if !candidate.result.success {
            self.print_diagnosis(candidate)?;
        }
        Ok(())
    }

    /// Why a template did not succeed.
    fn print_diagnosis(&mut self, candidate: &TemplateResult) -> io::Result<()> {
        let result = &candidate.result;
        self.set_dim()?;
        write!(self.stdout, "    {}:", template_label(candidate))?;
        self.reset()?;

        let missing_hints: Vec<_> = result
            .hints
            .misses
            .iter()
            .filter(|h| !h.optional)
            .map(|h| format!("'{}'", h.text))
            .collect();
        if !missing_hints.is_empty() {
            writeln!(self.stdout, " missing hint {}", missing_hints.join(", "))?;
            return Ok(());
        }
        if result.matches.is_empty() {
            writeln!(self.stdout, " nothing matched")?;
        } else {
            let required: Vec<_> = result
                .misses
                .iter()
                .filter(|m| m.required)
                .map(|m| m.name.as_str())
                .collect();
            writeln!(self.stdout, " missing required {}", required.join(", "))?;
        }
        for exception in &result.exceptions {
            self.set_color(Color::Yellow)?;
            writeln!(self.stdout, "      ⚠ {}", exception)?;
            self.reset()?;
        }
        Ok(())
    }

    /// One JSON document per input.
    pub fn print_json(&mut self, results: &[InputResult], all: bool) -> io::Result<()> {
        for result in results {
            let document = json_document(result, all);
            let text = serde_json::to_string_pretty(&document).map_err(io::Error::from)?;
            writeln!(self.stdout, "{}", text)?;
        }
        self.stdout.flush()
    }
}

fn template_label(result: &TemplateResult) -> String {
    match &result.name {
        Some(name) => name.clone(),
        None => format!("#{}", result.index),
    }
}

pub fn json_document(result: &InputResult, all: bool) -> Json {
    let report = match &result.report {
        Ok(report) => report,
        Err(message) => {
            return json!({
                "input": result.label,
                "success": false,
                "error": message,
            })
        }
    };

    let mut document = match report.best() {
        Some(best) => json!({
            "input": result.label,
            "success": true,
            "template": template_label(best),
            "value": best.value,
            "matches": matches_json(&best.result),
        }),
        None => json!({
            "input": result.label,
            "success": false,
            "template": Json::Null,
        }),
    };

    if all {
        let results: Vec<Json> = report.results.iter().map(template_json).collect();
        document["results"] = Json::Array(results);
    }
    document
}

fn matches_json(result: &TokenizeResult) -> Json {
    result
        .matches
        .iter()
        .map(|m| {
            json!({
                "name": m.name,
                "value": to_json(&m.value),
                "location": m.location,
            })
        })
        .collect()
}

fn template_json(result: &TemplateResult) -> Json {
    let outcome = &result.result;
    json!({
        "template": template_label(result),
        "success": outcome.success,
        "value": result.value,
        "matches": matches_json(outcome),
        "misses": outcome
            .misses
            .iter()
            .map(|m| json!({"name": m.name, "required": m.required}))
            .collect::<Vec<_>>(),
        "hints": {
            "matched": outcome.hints.matches.iter().map(|h| h.text.as_str()).collect::<Vec<_>>(),
            "missed": outcome.hints.misses.iter().map(|h| h.text.as_str()).collect::<Vec<_>>(),
        },
        "exceptions": outcome
            .exceptions
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokens_match::TemplateMatcher;
    use tokens_template::Template;

    fn run(templates: &[&str], input: &str) -> InputResult {
        let mut matcher = TemplateMatcher::new();
        for content in templates {
            matcher.add(Template::compile(content).unwrap());
        }
        InputResult {
            label: "in.txt".to_string(),
            report: matcher
                .match_input(input, &[] as &[&str])
                .map_err(|e| e.to_string()),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_json_document_for_best_match() {
        let result = run(&["---\nname: person\n---\nName: {Name}"], "Name: Ann");
        let document = json_document(&result, false);
        assert_eq!(document["template"], "person");
        assert_eq!(document["value"], json!({"Name": "Ann"}));
        assert_eq!(
            document["matches"],
            json!([{"name": "Name", "value": "Ann", "location": {"line": 1, "column": 7, "paragraph": 1}}])
        );
        assert!(document.get("results").is_none());
    }

    #[test]
    fn test_json_document_lists_all_templates() {
        let result = run(&["Name: {Name!}", "Age: {Age!}"], "Name: Ann");
        let document = json_document(&result, true);
        assert_eq!(document["template"], "#0");
        let results = document["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1]["success"], false);
        assert_eq!(results[1]["misses"], json!([{"name": "Age", "required": true}]));
    }

    #[test]
    fn test_json_document_without_match() {
        let result = run(&["Name: {Name}"], "nothing");
        let document = json_document(&result, false);
        assert_eq!(document["success"], false);
        assert_eq!(document["template"], Json::Null);
    }
}
