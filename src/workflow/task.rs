use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of answer a task asks for
///
/// `Boolean` and `Rotation` carry built-in class sets; `Class` and custom
/// kinds must declare their classes explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Class,
    Boolean,
    Rotation,
    Custom(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::Class => "class",
            TaskKind::Boolean => "boolean",
            TaskKind::Rotation => "rotation",
            TaskKind::Custom(name) => name,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "" | "class" => TaskKind::Class,
            "boolean" => TaskKind::Boolean,
            "rotation" => TaskKind::Rotation,
            other => TaskKind::Custom(other.to_string()),
        }
    }

    /// Built-in classes for this kind, if it has any
    pub fn default_classes(&self) -> Option<BTreeMap<String, ClassInfo>> {
        let entries: &[(&str, &str, &str)] = match self {
            TaskKind::Boolean => &[("true", "Yes", ""), ("false", "No", "")],
            TaskKind::Rotation => &[
                ("ok", "OK", "Not rotated"),
                ("h_inv", "Invert X", "Invert in horizontal axis"),
                ("v_inv", "Invert Y", "Invert in vertical axis"),
                ("+90", "+90deg", "Rotate 90 degrees clockwise"),
                ("-90", "-90deg", "Rotate 90 degrees counterclockwise"),
                ("180", "180deg", "Rotate 180 degrees"),
            ],
            TaskKind::Class | TaskKind::Custom(_) => return None,
        };

        Some(
            entries
                .iter()
                .map(|(id, name, description)| {
                    (
                        id.to_string(),
                        ClassInfo {
                            name: name.to_string(),
                            description: description.to_string(),
                            examples: Vec::new(),
                        },
                    )
                })
                .collect(),
        )
    }
}

/// Display metadata for one answer option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Answer option paired with its keyboard shortcut
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassButton {
    pub id: String,
    pub name: String,
    pub key: Option<char>,
}

/// One stage of the annotation workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub kind: TaskKind,
    pub classes: BTreeMap<String, ClassInfo>,
    /// Dependency conditions: task id -> required answer
    pub dependencies: BTreeMap<String, String>,
}

impl Task {
    /// Whether every image is eligible for this task
    pub fn is_unconditional(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn has_class(&self, value: &str) -> bool {
        self.classes.contains_key(value)
    }

    /// Classes sorted by id, the first nine bound to keys `1`..`9`
    pub fn class_buttons(&self) -> Vec<ClassButton> {
        // BTreeMap iteration is already sorted by id
        self.classes
            .iter()
            .enumerate()
            .map(|(i, (id, info))| ClassButton {
                id: id.clone(),
                name: if info.name.is_empty() { id.clone() } else { info.name.clone() },
                key: char::from_digit(i as u32 + 1, 10).filter(|_| i < 9),
            })
            .collect()
    }
}
