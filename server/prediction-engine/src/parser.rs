//! CI configuration parsing: detect the provider dialect and extract raw signals.
//!
//! Detection is a static rule table walked in priority order. Filename conventions
//! are consulted first, then structural markers; the first match wins. Parsing never
//! fails: unreadable input degrades to `Provider::Unknown` with the literal text kept
//! as `job_text`.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::types::{EnvironmentType, Provider, RawPipelineSignals, TriggerType};

/// Nesting depth past which structure complexity stops counting.
const MAX_COMPLEXITY_DEPTH: usize = 10;

const PRODUCTION_KEYWORDS: &[&str] = &["prod", "production", "main", "master"];
const STAGING_KEYWORDS: &[&str] = &["staging", "stage", "test"];
const DEVELOPMENT_KEYWORDS: &[&str] = &["dev", "development", "feature"];
const TEST_KEYWORDS: &[&str] = &["test", "jest", "pytest", "junit", "rspec", "mocha"];
const DEPLOY_KEYWORDS: &[&str] = &["deploy", "deployment", "release", "publish"];
const DEPENDENCY_MARKERS: &[&str] = &[
  "npm install",
  "pip install",
  "yarn install",
  "composer install",
  "bundle install",
  "go get",
  "requirements.txt",
  "package.json",
  "pom.xml",
  "build.gradle",
];

const TRAVIS_PHASES: &[&str] = &[
  "before_install",
  "install",
  "before_script",
  "script",
  "after_success",
  "deploy",
];

const GITLAB_RESERVED: &[&str] = &[
  "stages",
  "variables",
  "default",
  "include",
  "workflow",
  "image",
  "services",
  "cache",
  "before_script",
  "after_script",
];

/// Provider-specific extraction state.
#[derive(Debug, Default)]
struct Extraction {
  step_count: u32,
  text: Vec<String>,
  trigger: TriggerType,
}

impl Extraction {
  fn push(&mut self, value: Option<&Value>) {
    if let Some(s) = value.and_then(scalar_text) {
      let s = s.trim();
      if !s.is_empty() {
        self.text.push(s.to_string());
      }
    }
  }

  fn add_steps(&mut self, n: usize) {
    self.step_count = self.step_count.saturating_add(count(n));
  }
}

/// One row of the dispatch table.
struct ProviderRule {
  provider: Provider,
  filename_hint: fn(&str) -> bool,
  detect: fn(&Mapping) -> bool,
  extract: fn(&Mapping, &mut Extraction),
}

static RULES: [ProviderRule; 5] = [
  ProviderRule {
    provider: Provider::GithubActions,
    filename_hint: |p| p.contains(".github/workflows/"),
    detect: |doc| doc.contains_key("jobs") && on_key(doc).is_some(),
    extract: extract_github,
  },
  ProviderRule {
    provider: Provider::GitlabCi,
    filename_hint: |p| p.ends_with(".gitlab-ci.yml") || p.ends_with(".gitlab-ci.yaml"),
    detect: |doc| {
      doc.contains_key("before_script")
        || matches!(doc.get("stages"), Some(Value::Sequence(s)) if !s.iter().any(Value::is_mapping))
    },
    extract: extract_gitlab,
  },
  ProviderRule {
    provider: Provider::AzureDevops,
    filename_hint: |p| file_name(p).starts_with("azure-pipelines"),
    detect: |doc| {
      doc.contains_key("pipeline")
        || doc.contains_key("steps")
        || (doc.contains_key("trigger") && doc.contains_key("pool"))
        || matches!(doc.get("stages"), Some(Value::Sequence(s)) if s.iter().any(Value::is_mapping))
    },
    extract: extract_azure,
  },
  ProviderRule {
    provider: Provider::Circleci,
    filename_hint: |p| p.contains(".circleci/"),
    detect: |doc| matches!(doc.get("version"), Some(Value::Number(_))),
    extract: extract_circleci,
  },
  ProviderRule {
    provider: Provider::TravisCi,
    filename_hint: |p| p.ends_with(".travis.yml") || p.ends_with(".travis.yaml"),
    detect: |doc| doc.contains_key("language") || doc.contains_key("script"),
    extract: extract_travis,
  },
];

/// Parse one configuration document into provider-agnostic signals. Total.
pub fn parse(content: &[u8], filename: Option<&str>) -> RawPipelineSignals {
  let text = String::from_utf8_lossy(content);
  if text.trim().is_empty() {
    return RawPipelineSignals::default();
  }

  let doc = match load_root(&text) {
    Ok(Value::Mapping(map)) => map,
    Ok(Value::Null) => return RawPipelineSignals::default(),
    Ok(other) => {
      return degraded(
        &text,
        format!("expected a mapping at document root, found {}", value_kind(&other)),
      )
    }
    Err(e) => return degraded(&text, format!("yaml: {}", e)),
  };

  let rule = detect(&doc, filename);
  let mut extraction = Extraction::default();
  let provider = match rule {
    Some(rule) => {
      (rule.extract)(&doc, &mut extraction);
      rule.provider
    }
    None => Provider::Unknown,
  };

  let job_text = if provider == Provider::Unknown {
    text.to_string()
  } else {
    extraction.text.join("\n")
  };

  let lowered = serde_yaml::to_string(&doc)
    .unwrap_or_else(|_| text.to_string())
    .to_lowercase();

  let signals = RawPipelineSignals {
    provider,
    step_count: extraction.step_count,
    job_text,
    trigger_type: extraction.trigger,
    environment_type: detect_environment(&lowered),
    dependency_count: count_dependencies(&lowered),
    structure_complexity: structure_complexity(&Value::Mapping(doc), 0),
    has_test_stage: contains_any(&lowered, TEST_KEYWORDS),
    has_deploy_stage: contains_any(&lowered, DEPLOY_KEYWORDS),
    parse_error: None,
  };

  tracing::debug!(
    provider = provider.as_str(),
    steps = signals.step_count,
    trigger = ?signals.trigger_type,
    environment = ?signals.environment_type,
    "parsed pipeline configuration"
  );
  signals
}

/// Pick the provider rule: filename convention first, then structure in priority order.
fn detect(doc: &Mapping, filename: Option<&str>) -> Option<&'static ProviderRule> {
  if let Some(name) = filename {
    let path = name.replace('\\', "/").to_ascii_lowercase();
    if let Some(rule) = RULES.iter().find(|r| (r.filename_hint)(&path)) {
      return Some(rule);
    }
  }
  RULES.iter().find(|r| (r.detect)(doc))
}

fn degraded(text: &str, reason: String) -> RawPipelineSignals {
  tracing::warn!(reason = %reason, "configuration not parseable; scoring as unknown provider");
  RawPipelineSignals {
    job_text: text.to_string(),
    parse_error: Some(reason),
    ..RawPipelineSignals::default()
  }
}

/// First non-empty document of a (possibly multi-document) YAML stream.
fn load_root(text: &str) -> Result<Value, serde_yaml::Error> {
  for document in serde_yaml::Deserializer::from_str(text) {
    let value = Value::deserialize(document)?;
    if !value.is_null() {
      return Ok(value);
    }
  }
  Ok(Value::Null)
}

// ---------------------------------------------------------------------------
// Provider extraction
// ---------------------------------------------------------------------------

fn extract_github(doc: &Mapping, out: &mut Extraction) {
  if let Some(Value::Mapping(jobs)) = doc.get("jobs") {
    for (id, job) in jobs {
      out.push(Some(id));
      let Value::Mapping(job) = job else { continue };
      out.push(job.get("name"));
      if let Some(Value::Sequence(steps)) = job.get("steps") {
        out.add_steps(steps.len());
        for step in steps.iter().filter_map(Value::as_mapping) {
          out.push(step.get("name"));
          out.push(step.get("uses"));
          out.push(step.get("run"));
        }
      }
    }
  }

  out.trigger = match on_key(doc) {
    Some(Value::String(event)) => TriggerType::from_str_loose(event),
    Some(Value::Sequence(events)) => {
      trigger_from_events(events.iter().filter_map(Value::as_str))
    }
    Some(Value::Mapping(events)) => {
      trigger_from_events(events.keys().filter_map(Value::as_str))
    }
    _ => TriggerType::Manual,
  };
}

fn extract_gitlab(doc: &Mapping, out: &mut Extraction) {
  let mut jobs = 0usize;
  let mut rule_text = String::new();

  if let Some(Value::Sequence(stages)) = doc.get("stages") {
    for stage in stages {
      out.push(Some(stage));
    }
  }
  collect_commands(doc.get("before_script"), out);
  collect_commands(doc.get("after_script"), out);
  if let Some(workflow) = doc.get("workflow") {
    rule_text.push_str(&serde_yaml::to_string(workflow).unwrap_or_default());
  }

  for (name, job) in doc {
    let Some(name) = name.as_str() else { continue };
    if GITLAB_RESERVED.contains(&name) {
      continue;
    }
    let Value::Mapping(job) = job else { continue };
    if !job.contains_key("script") && !job.contains_key("trigger") {
      continue;
    }
    jobs += 1;
    out.text.push(name.to_string());
    for key in ["before_script", "script", "after_script"] {
      collect_commands(job.get(key), out);
    }
    for key in ["rules", "only"] {
      if let Some(v) = job.get(key) {
        rule_text.push_str(&serde_yaml::to_string(v).unwrap_or_default());
      }
    }
  }

  out.step_count = match doc.get("stages") {
    Some(Value::Sequence(stages)) => count(stages.len()),
    _ => count(jobs),
  };

  let rule_text = rule_text.to_lowercase();
  out.trigger = if rule_text.contains("merge_request") {
    TriggerType::PullRequest
  } else if rule_text.contains("schedule") {
    TriggerType::Scheduled
  } else {
    TriggerType::Manual
  };
}

fn extract_azure(doc: &Mapping, out: &mut Extraction) {
  azure_steps(doc.get("steps"), out);
  azure_jobs(doc.get("jobs"), out);
  if let Some(Value::Sequence(stages)) = doc.get("stages") {
    for stage in stages.iter().filter_map(Value::as_mapping) {
      out.push(stage.get("stage"));
      out.push(stage.get("displayName"));
      azure_jobs(stage.get("jobs"), out);
    }
  }

  let enabled = |key: &str| match doc.get(key) {
    None => false,
    Some(Value::String(s)) => !s.eq_ignore_ascii_case("none"),
    Some(_) => true,
  };
  out.trigger = if enabled("trigger") {
    TriggerType::Push
  } else if enabled("pr") {
    TriggerType::PullRequest
  } else if doc.contains_key("schedules") {
    TriggerType::Scheduled
  } else {
    TriggerType::Manual
  };
}

fn azure_jobs(jobs: Option<&Value>, out: &mut Extraction) {
  if let Some(Value::Sequence(jobs)) = jobs {
    for job in jobs.iter().filter_map(Value::as_mapping) {
      out.push(job.get("job"));
      out.push(job.get("deployment"));
      out.push(job.get("displayName"));
      azure_steps(job.get("steps"), out);
    }
  }
}

fn azure_steps(steps: Option<&Value>, out: &mut Extraction) {
  if let Some(Value::Sequence(steps)) = steps {
    out.add_steps(steps.len());
    for step in steps.iter().filter_map(Value::as_mapping) {
      for key in ["displayName", "task", "script", "bash", "powershell", "pwsh"] {
        out.push(step.get(key));
      }
    }
  }
}

fn extract_circleci(doc: &Mapping, out: &mut Extraction) {
  if let Some(Value::Mapping(jobs)) = doc.get("jobs") {
    for (name, job) in jobs {
      out.push(Some(name));
      let Some(Value::Sequence(steps)) = job.as_mapping().and_then(|j| j.get("steps")) else {
        continue;
      };
      out.add_steps(steps.len());
      for step in steps {
        match step {
          Value::Mapping(step) => {
            for (kind, body) in step {
              out.push(Some(kind));
              match body {
                Value::Mapping(body) => {
                  out.push(body.get("name"));
                  out.push(body.get("command"));
                }
                other => out.push(Some(other)),
              }
            }
          }
          other => out.push(Some(other)),
        }
      }
    }
  }

  let scheduled = match doc.get("workflows") {
    Some(Value::Mapping(workflows)) => workflows
      .values()
      .filter_map(Value::as_mapping)
      .any(|w| w.contains_key("triggers")),
    _ => false,
  };
  out.trigger = if scheduled {
    TriggerType::Scheduled
  } else {
    TriggerType::Push
  };
}

fn extract_travis(doc: &Mapping, out: &mut Extraction) {
  out.push(doc.get("language"));
  for phase in TRAVIS_PHASES {
    let before = out.text.len();
    match doc.get(*phase) {
      Some(Value::Mapping(deploy)) => {
        out.push(deploy.get("provider"));
        out.add_steps(1);
      }
      other => {
        collect_commands(other, out);
        out.add_steps(out.text.len() - before);
      }
    }
  }
  out.trigger = TriggerType::Manual;
}

/// Push every scalar command in a string-or-(nested-)sequence value.
fn collect_commands(value: Option<&Value>, out: &mut Extraction) {
  match value {
    Some(Value::Sequence(items)) => {
      for item in items {
        collect_commands(Some(item), out);
      }
    }
    Some(Value::Tagged(tagged)) => collect_commands(Some(&tagged.value), out),
    Some(v) => out.push(Some(v)),
    None => {}
  }
}

/// GitHub's `on:` key; YAML 1.1 loaders turn it into boolean `true`.
fn on_key(doc: &Mapping) -> Option<&Value> {
  doc.get("on").or_else(|| doc.get(Value::Bool(true)))
}

/// Highest-priority trigger among the declared events: push > pull_request > schedule.
fn trigger_from_events<'a>(events: impl Iterator<Item = &'a str>) -> TriggerType {
  events
    .map(TriggerType::from_str_loose)
    .filter(|t| *t != TriggerType::Manual)
    .max_by(|a, b| a.code().total_cmp(&b.code()))
    .unwrap_or(TriggerType::Manual)
}

// ---------------------------------------------------------------------------
// Generic signals
// ---------------------------------------------------------------------------

fn detect_environment(lowered: &str) -> EnvironmentType {
  if contains_any(lowered, PRODUCTION_KEYWORDS) {
    EnvironmentType::Production
  } else if contains_any(lowered, STAGING_KEYWORDS) {
    EnvironmentType::Staging
  } else if contains_any(lowered, DEVELOPMENT_KEYWORDS) {
    EnvironmentType::Development
  } else {
    EnvironmentType::Unknown
  }
}

fn count_dependencies(lowered: &str) -> u32 {
  let total: usize = DEPENDENCY_MARKERS
    .iter()
    .map(|m| lowered.matches(m).count())
    .sum();
  count(total)
}

/// Mapping entries + sequence items, recursively, up to `MAX_COMPLEXITY_DEPTH`.
fn structure_complexity(value: &Value, depth: usize) -> u32 {
  if depth > MAX_COMPLEXITY_DEPTH {
    return 0;
  }
  match value {
    Value::Mapping(map) => map.values().fold(count(map.len()), |acc, v| {
      acc.saturating_add(structure_complexity(v, depth + 1))
    }),
    Value::Sequence(items) => items.iter().fold(count(items.len()), |acc, v| {
      acc.saturating_add(structure_complexity(v, depth + 1))
    }),
    Value::Tagged(tagged) => structure_complexity(&tagged.value, depth),
    _ => 0,
  }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
  needles.iter().any(|n| haystack.contains(n))
}

fn scalar_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Sequence(_) => "sequence",
    Value::Mapping(_) => "mapping",
    Value::Tagged(_) => "tagged value",
  }
}

fn file_name(path: &str) -> &str {
  path.rsplit('/').next().unwrap_or(path)
}

fn count(n: usize) -> u32 {
  u32::try_from(n).unwrap_or(u32::MAX)
}
