use super::Path;
use super::convert::to_text;
use crate::types::{Element, Value};
use core::fmt;

/// What happened at a path
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// Present only in the new value
    Added(Value),
    /// Present only in the old value
    Removed(Value),
    /// Present in both with different contents
    Modified {
        /// The value before
        old: Value,
        /// The value after
        new: Value,
    },
}

/// One difference between two trees
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Where the difference is
    pub path: Path,
    /// What the difference is
    pub kind: ChangeKind,
}

fn short(value: &Value) -> String {
    if value.is_complex() {
        format!("({})", value.kind())
    } else {
        to_text(value)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ChangeKind::Added(v) => write!(f, "+ {} = {}", self.path, short(v)),
            ChangeKind::Removed(v) => write!(f, "- {} = {}", self.path, short(v)),
            ChangeKind::Modified { old, new } => {
                write!(f, "~ {}: {} -> {}", self.path, short(old), short(new))
            }
        }
    }
}

/// List the differences between `old` and `new`, recursing into containers of the same kind
///
/// Members are matched by name and sequence elements by position
pub fn diff(old: &Value, new: &Value) -> Vec<Change> {
    let mut out = Vec::new();
    diff_into(&Path::root(), old, new, &mut out);
    out
}

fn diff_members(path: &Path, old: &[Element], new: &[Element], out: &mut Vec<Change>) {
    for o in old {
        let p = path.key(o.name.clone());
        match new.iter().find(|n| n.name == o.name) {
            Some(n) => diff_into(&p, &o.value, &n.value, out),
            None => out.push(Change {
                path: p,
                kind: ChangeKind::Removed(o.value.clone()),
            }),
        }
    }
    for n in new.iter().filter(|n| !old.iter().any(|o| o.name == n.name)) {
        out.push(Change {
            path: path.key(n.name.clone()),
            kind: ChangeKind::Added(n.value.clone()),
        });
    }
}

fn diff_sequence(path: &Path, old: &[Value], new: &[Value], out: &mut Vec<Change>) {
    for (i, o) in old.iter().enumerate() {
        match new.get(i) {
            Some(n) => diff_into(&path.index(i), o, n, out),
            None => out.push(Change {
                path: path.index(i),
                kind: ChangeKind::Removed(o.clone()),
            }),
        }
    }
    for (i, n) in new.iter().enumerate().skip(old.len()) {
        out.push(Change {
            path: path.index(i),
            kind: ChangeKind::Added(n.clone()),
        });
    }
}

fn diff_into(path: &Path, old: &Value, new: &Value, out: &mut Vec<Change>) {
    if old == new {
        return;
    }
    match (old.unwrapped(), new.unwrapped()) {
        (Value::Object(a, class_a), Value::Object(b, class_b)) if class_a == class_b => {
            diff_members(path, a, b, out)
        }
        (Value::ECMAArray(dense_a, assoc_a, _), Value::ECMAArray(dense_b, assoc_b, _)) => {
            diff_sequence(path, dense_a, dense_b, out);
            diff_members(path, assoc_a, assoc_b, out);
        }
        (Value::StrictArray(a), Value::StrictArray(b)) => diff_sequence(path, a, b, out),
        (Value::VectorObject(a, type_a, _), Value::VectorObject(b, type_b, _)) if type_a == type_b => {
            diff_sequence(path, a, b, out)
        }
        _ => out.push(Change {
            path: path.clone(),
            kind: ChangeKind::Modified {
                old: old.clone(),
                new: new.clone(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_values_have_no_changes() {
        let v = Value::object(vec![Element::new("a", 1)]);
        assert!(diff(&v, &v.clone()).is_empty());
    }

    #[test]
    fn nested_changes() {
        let old = Value::object(vec![
            Element::new("coins", 10.0),
            Element::new("gone", true),
            Element::new(
                "tools",
                Value::StrictArray(vec![Value::object(vec![Element::new("level", 1)])]),
            ),
        ]);
        let new = Value::object(vec![
            Element::new("coins", 99.0),
            Element::new(
                "tools",
                Value::StrictArray(vec![
                    Value::object(vec![Element::new("level", 2)]),
                    Value::Null,
                ]),
            ),
            Element::new("fresh", "x"),
        ]);

        assert_eq!(
            diff(&old, &new),
            vec![
                Change {
                    path: Path::parse("coins"),
                    kind: ChangeKind::Modified {
                        old: Value::Number(10.0),
                        new: Value::Number(99.0)
                    },
                },
                Change {
                    path: Path::parse("gone"),
                    kind: ChangeKind::Removed(Value::Bool(true)),
                },
                Change {
                    path: Path::parse("tools/[0]/level"),
                    kind: ChangeKind::Modified {
                        old: Value::Integer(1),
                        new: Value::Integer(2)
                    },
                },
                Change {
                    path: Path::parse("tools/[1]"),
                    kind: ChangeKind::Added(Value::Null),
                },
                Change {
                    path: Path::parse("fresh"),
                    kind: ChangeKind::Added(Value::from("x")),
                },
            ]
        );
    }

    #[test]
    fn kind_change_is_a_modification() {
        let changes = diff(&Value::Integer(1), &Value::from("1"));
        assert_eq!(changes.len(), 1);
        assert!(changes[0].path.is_root());
        assert_eq!(changes[0].to_string(), "~ : 1 -> 1");
    }

    #[test]
    fn display() {
        let c = Change {
            path: Path::parse("a/[0]"),
            kind: ChangeKind::Added(Value::StrictArray(vec![])),
        };
        assert_eq!(c.to_string(), "+ a/[0] = (StrictArray)");
    }
}
