use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use crate::workflow::{ClassInfo, ConfigError, Task, TaskGraph, TaskKind};

/// Sample project written by `tagflow init`
pub const SAMPLE_CONFIG: &str = r#"# tagflow project configuration

meta:
  description: |
    Sample annotation project.
    Edit this description to explain what you're annotating.

# Known annotators. Leave empty to accept any username.
auth:
  admin:
    password: change-me

# Tasks run in the order listed. Do not reorder tasks once annotation has
# started: answers are stored by task position.
tasks:
  - id: quality
    name: Is the image usable?
    short_name: Quality
    type: boolean

  - id: has_person
    name: Does the image contain a person?
    short_name: Person
    type: boolean
    if:
      quality: "true"

  - id: age
    name: How old does the person look?
    short_name: Age
    if:
      has_person: "true"
    classes:
      child:
        name: Child
      adult:
        name: Adult
      elderly:
        name: Elderly
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub description: String,
}

/// Annotator credentials; the password is carried as-is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthEntry {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    id: Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    classes: Option<Mapping>,
    #[serde(rename = "if", default)]
    dependencies: Option<Mapping>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    auth: BTreeMap<String, AuthEntry>,
    #[serde(default)]
    tasks: Vec<RawTask>,
}

/// Loaded project configuration
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub meta: Meta,
    pub auth: BTreeMap<String, AuthEntry>,
    pub graph: TaskGraph,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        log::info!("Loaded {} task(s) from {}", config.graph.len(), path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        if raw.tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(raw.tasks.len());
        for raw_task in raw.tasks {
            let task = build_task(raw_task)?;
            if !seen.insert(task.id.clone()) {
                return Err(ConfigError::DuplicateTask(task.id));
            }
            tasks.push(task);
        }

        let graph = TaskGraph::new(tasks);
        for task in graph.tasks() {
            for dep in graph.unresolved_dependencies(task) {
                log::warn!(
                    "task {} depends on unknown task {}; the condition can never be met",
                    task.id,
                    dep
                );
            }
        }

        Ok(Self {
            meta: raw.meta,
            auth: raw.auth,
            graph,
        })
    }

    /// Whether `username` may submit answers
    pub fn is_known_user(&self, username: &str) -> bool {
        self.auth.is_empty() || self.auth.contains_key(username)
    }
}

fn build_task(raw: RawTask) -> Result<Task, ConfigError> {
    let id = scalar_to_string(&raw.id).ok_or_else(|| ConfigError::InvalidTask {
        task_id: format!("{:?}", raw.id),
        message: "task id must be a scalar".to_string(),
    })?;
    if id.trim().is_empty() {
        return Err(ConfigError::InvalidTask {
            task_id: id,
            message: "task id cannot be empty".to_string(),
        });
    }

    let kind = TaskKind::parse(raw.kind.as_deref().unwrap_or(""));
    let short_name = match raw.short_name {
        Some(short) if !short.is_empty() => short,
        _ => raw.name.clone(),
    };

    let classes = match raw.classes {
        Some(mapping) => parse_classes(&id, &mapping)?,
        None => kind
            .default_classes()
            .ok_or_else(|| ConfigError::NoClasses { task_id: id.clone() })?,
    };

    let mut dependencies = BTreeMap::new();
    if let Some(mapping) = raw.dependencies {
        for (dep, value) in mapping.iter() {
            let (dep, value) = match (scalar_to_string(dep), scalar_to_string(value)) {
                (Some(dep), Some(value)) => (dep, value),
                _ => {
                    return Err(ConfigError::InvalidTask {
                        task_id: id,
                        message: "dependency conditions must map task ids to scalar values".to_string(),
                    })
                }
            };
            dependencies.insert(dep, value);
        }
    }

    Ok(Task {
        id,
        name: raw.name,
        short_name,
        kind,
        classes,
        dependencies,
    })
}

fn parse_classes(task_id: &str, mapping: &Mapping) -> Result<BTreeMap<String, ClassInfo>, ConfigError> {
    let mut classes = BTreeMap::new();
    for (key, value) in mapping.iter() {
        let class_id = scalar_to_string(key).ok_or_else(|| ConfigError::InvalidTask {
            task_id: task_id.to_string(),
            message: "class ids must be scalars".to_string(),
        })?;
        let info = if value.is_null() {
            ClassInfo::default()
        } else {
            serde_yaml::from_value::<ClassInfo>(value.clone())?
        };
        classes.insert(class_id, info);
    }
    if classes.is_empty() {
        return Err(ConfigError::NoClasses {
            task_id: task_id.to_string(),
        });
    }
    Ok(classes)
}

/// YAML reads `true` and `3` as typed scalars; answers are compared as text
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_config() {
        let config = ProjectConfig::parse(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.graph.len(), 3);
        assert!(config.meta.description.contains("Sample annotation project"));
        assert!(config.auth.contains_key("admin"));

        let age = config.graph.get_task("age").unwrap();
        assert_eq!(age.dependencies["has_person"], "true");
        assert_eq!(age.classes.len(), 3);
        assert_eq!(config.graph.find_task_index("age"), Some(2));
    }

    #[test]
    fn test_defaults_applied() {
        let config = ProjectConfig::parse(
            "tasks:\n  - id: q\n    name: Quality\n    type: boolean\n",
        )
        .unwrap();
        let task = config.graph.get_task("q").unwrap();

        assert_eq!(task.short_name, "Quality");
        assert_eq!(task.kind, TaskKind::Boolean);
        assert!(task.has_class("true"));
        assert!(task.has_class("false"));
        assert!(task.is_unconditional());
    }

    #[test]
    fn test_unquoted_boolean_condition_is_text() {
        let config = ProjectConfig::parse(
            "tasks:\n  - id: a\n    type: boolean\n  - id: b\n    type: boolean\n    if:\n      a: true\n",
        )
        .unwrap();
        assert_eq!(config.graph.get_task("b").unwrap().dependencies["a"], "true");
    }

    #[test]
    fn test_duplicate_task_rejected() {
        let result = ProjectConfig::parse(
            "tasks:\n  - id: a\n    type: boolean\n  - id: a\n    type: boolean\n",
        );
        assert!(matches!(result, Err(ConfigError::DuplicateTask(id)) if id == "a"));
    }

    #[test]
    fn test_class_task_without_classes_rejected() {
        let result = ProjectConfig::parse("tasks:\n  - id: a\n    name: Pick one\n");
        assert!(matches!(result, Err(ConfigError::NoClasses { .. })));
    }

    #[test]
    fn test_no_tasks_rejected() {
        assert!(matches!(ProjectConfig::parse("meta: {}\n"), Err(ConfigError::NoTasks)));
    }

    #[test]
    fn test_unknown_dependency_is_not_an_error() {
        let config = ProjectConfig::parse(
            "tasks:\n  - id: b\n    type: boolean\n    if:\n      ghost: \"yes\"\n",
        )
        .unwrap();
        assert_eq!(config.graph.len(), 1);
    }

    #[test]
    fn test_known_user() {
        let open = ProjectConfig::parse("tasks:\n  - id: a\n    type: boolean\n").unwrap();
        assert!(open.is_known_user("anyone"));

        let closed = ProjectConfig::parse(SAMPLE_CONFIG).unwrap();
        assert!(closed.is_known_user("admin"));
        assert!(!closed.is_known_user("mallory"));
    }

    #[test]
    fn test_class_examples_parsed() {
        let config = ProjectConfig::parse(
            "tasks:\n  - id: a\n    classes:\n      cat:\n        name: Cat\n        examples: [c1.png, c2.png]\n      dog:\n",
        )
        .unwrap();
        let task = config.graph.get_task("a").unwrap();
        assert_eq!(task.classes["cat"].examples.len(), 2);
        assert_eq!(task.classes["dog"], ClassInfo::default());
    }
}
